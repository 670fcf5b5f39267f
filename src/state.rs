//! Register file and condition flags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// General-purpose registers. R7 doubles as the link register for
/// jump-to-subroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

pub const GENERAL_REGISTERS: usize = 8;

impl Reg {
    pub const ALL: [Reg; GENERAL_REGISTERS] = [
        Reg::R0,
        Reg::R1,
        Reg::R2,
        Reg::R3,
        Reg::R4,
        Reg::R5,
        Reg::R6,
        Reg::R7,
    ];

    /// Register selected by the low three bits of an instruction field.
    pub fn from_bits(bits: u16) -> Reg {
        Reg::ALL[(bits & 0b111) as usize]
    }

    pub fn bits(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.bits())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown register name: {0}")]
pub struct ParseRegError(String);

impl FromStr for Reg {
    type Err = ParseRegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R0" => Ok(Reg::R0),
            "R1" => Ok(Reg::R1),
            "R2" => Ok(Reg::R2),
            "R3" => Ok(Reg::R3),
            "R4" => Ok(Reg::R4),
            "R5" => Ok(Reg::R5),
            "R6" => Ok(Reg::R6),
            "R7" => Ok(Reg::R7),
            other => Err(ParseRegError(other.to_string())),
        }
    }
}

/// Condition flag recomputed after every register-writing instruction.
/// Exactly one flag is active at a time; the branch instruction tests its
/// three-bit mask against the active flag's bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CondFlag {
    Zero,
    Negative,
    Positive,
}

impl CondFlag {
    /// Flag describing a freshly written register value.
    pub fn of(value: i16) -> CondFlag {
        match value {
            0 => CondFlag::Zero,
            v if v < 0 => CondFlag::Negative,
            _ => CondFlag::Positive,
        }
    }

    pub fn mask(self) -> u16 {
        match self {
            CondFlag::Zero => 0b001,
            CondFlag::Negative => 0b010,
            CondFlag::Positive => 0b100,
        }
    }
}

/// Architectural register state for one engine instance.
///
/// The program counter is held wider than a word so the memory-exhaustion
/// boundary of a full 65,536-word store is representable; it is masked to
/// 16 bits whenever it is used as an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    general: [i16; GENERAL_REGISTERS],
    pc: u32,
    cond: CondFlag,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            general: [0; GENERAL_REGISTERS],
            pc: 0,
            cond: CondFlag::Zero,
        }
    }
}

impl Registers {
    pub fn get(&self, reg: Reg) -> i16 {
        self.general[reg as usize]
    }

    /// Writes a general register without touching the condition flag.
    pub fn set(&mut self, reg: Reg, value: i16) {
        self.general[reg as usize] = value;
    }

    /// Writes a general register and recomputes the condition flag from the
    /// written value.
    pub fn set_flagged(&mut self, reg: Reg, value: i16) {
        self.general[reg as usize] = value;
        self.cond = CondFlag::of(value);
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// Program counter as a 16-bit address.
    pub fn pc_addr(&self) -> u16 {
        self.pc as u16
    }

    pub fn cond(&self) -> CondFlag {
        self.cond
    }

    pub fn set_cond(&mut self, cond: CondFlag) {
        self.cond = cond;
    }
}
