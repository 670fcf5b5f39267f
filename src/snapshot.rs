//! JSON persistence of run outcomes.

use crate::exec::RunOutcome;
use crate::state::Registers;
use crate::{Result, VmError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub const OUTCOME_MAGIC: &str = "lc3.outcome";
pub const OUTCOME_VERSION: u32 = 1;

/// Serializable mirror of [`RunOutcome`]; the structured error is rendered
/// as its display string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub magic: String,
    pub version: u32,
    pub success: bool,
    pub error: Option<String>,
    pub registers: Registers,
    pub memory: Vec<i16>,
    pub output: Vec<u8>,
}

impl From<&RunOutcome> for OutcomeRecord {
    fn from(outcome: &RunOutcome) -> Self {
        Self {
            magic: OUTCOME_MAGIC.to_string(),
            version: OUTCOME_VERSION,
            success: outcome.success,
            error: outcome.error.as_ref().map(|e| e.to_string()),
            registers: outcome.registers.clone(),
            memory: outcome.memory.clone(),
            output: outcome.output.clone(),
        }
    }
}

pub fn save_outcome(path: &Path, outcome: &RunOutcome) -> Result<()> {
    let record = OutcomeRecord::from(outcome);
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &record)?;
    Ok(())
}

pub fn load_outcome(path: &Path) -> Result<OutcomeRecord> {
    let file = File::open(path)?;
    let record: OutcomeRecord = serde_json::from_reader(BufReader::new(file))?;
    if record.magic != OUTCOME_MAGIC || record.version != OUTCOME_VERSION {
        return Err(VmError::InvalidSnapshot(
            "outcome magic/version mismatch".to_string(),
        ));
    }
    Ok(record)
}
