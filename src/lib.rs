//! Encoder and execution engine for a 16-bit word-addressed virtual
//! machine.
//!
//! The two halves share one binary contract: [`asm`] packs opcodes and
//! operands into 16-bit words, [`decode`] is its exact inverse, and
//! [`exec::Vm`] fetches, decodes, and executes those words over an owned
//! register file and memory image, dispatching character I/O through traps.
//! The blocking read trap suspends cooperatively; characters are supplied
//! through [`exec::Vm::push_char`].

use thiserror::Error;

pub mod asm;
pub mod bits;
pub mod decode;
pub mod exec;
pub mod io;
pub mod memory;
pub mod snapshot;
pub mod state;

pub use decode::{decode, Instr, Opcode};
pub use exec::{RunOptions, RunOutcome, StepEvent, Vm, DEFAULT_STEP_LIMIT};
pub use io::{traps, IoChannel, OutputSink, IN_PROMPT};
pub use memory::{Memory, DEFAULT_MEMORY_WORDS, LOW_MEMORY_CAP, PROGRAM_ORIGIN};
pub use snapshot::{load_outcome, save_outcome, OutcomeRecord, OUTCOME_MAGIC, OUTCOME_VERSION};
pub use state::{CondFlag, Reg, Registers};

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Debug, Error)]
pub enum VmError {
    /// Fetched instruction's top nibble does not map to an executable
    /// opcode.
    #[error("bad opcode: {opcode:#06b}")]
    BadOpcode { opcode: u16 },
    /// TRAP instruction's low byte does not match a defined vector.
    #[error("bad trap vector: {vector:#04x}")]
    BadTrap { vector: u16 },
    /// Encoder operand outside the representable signed range for its
    /// field width.
    #[error("value {value} does not fit in a {width}-bit field")]
    FieldOverflow { width: u32, value: i64 },
    #[error("engine is already running")]
    AlreadyRunning,
    #[error("engine is not running")]
    NotRunning,
    /// Explicit caller-requested cancellation of a run.
    #[error("run aborted")]
    Aborted,
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),
    #[error("snapshot error: {0}")]
    InvalidSnapshot(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serde(#[from] serde_json::Error),
}
