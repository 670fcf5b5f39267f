//! Instruction decoding: the exact inverse of the encoder in [`crate::asm`].

use crate::bits::unpack_signed;
use crate::state::Reg;
use crate::{Result, VmError};

/// The sixteen opcode values, in architectural order (top nibble of the
/// instruction word). RTI and RES are reserved and never execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Opcode {
    Br = 0,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    Rti,
    Not,
    Ldi,
    Sti,
    Jmp,
    Res,
    Lea,
    Trap,
}

impl TryFrom<u16> for Opcode {
    type Error = VmError;

    fn try_from(value: u16) -> Result<Self> {
        Ok(match value {
            0 => Opcode::Br,
            1 => Opcode::Add,
            2 => Opcode::Ld,
            3 => Opcode::St,
            4 => Opcode::Jsr,
            5 => Opcode::And,
            6 => Opcode::Ldr,
            7 => Opcode::Str,
            8 => Opcode::Rti,
            9 => Opcode::Not,
            10 => Opcode::Ldi,
            11 => Opcode::Sti,
            12 => Opcode::Jmp,
            13 => Opcode::Res,
            14 => Opcode::Lea,
            15 => Opcode::Trap,
            other => return Err(VmError::BadOpcode { opcode: other }),
        })
    }
}

/// A decoded, executable instruction. Mode-bit instructions (ADD/AND bit 5,
/// JSR bit 11) split into one variant per form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    Br { mask: u16, offset: i16 },
    AddImm { dr: Reg, sr1: Reg, imm: i16 },
    AddReg { dr: Reg, sr1: Reg, sr2: Reg },
    AndImm { dr: Reg, sr1: Reg, imm: i16 },
    AndReg { dr: Reg, sr1: Reg, sr2: Reg },
    Not { dr: Reg, sr: Reg },
    Jmp { base: Reg },
    Jsr { offset: i16 },
    Jsrr { base: Reg },
    Ld { dr: Reg, offset: i16 },
    Ldi { dr: Reg, offset: i16 },
    Ldr { dr: Reg, base: Reg, offset: i16 },
    Lea { dr: Reg, offset: i16 },
    St { sr: Reg, offset: i16 },
    Sti { sr: Reg, offset: i16 },
    Str { sr: Reg, base: Reg, offset: i16 },
    Trap { vector: u16 },
}

fn field_signed(word: u16, width: u32) -> i16 {
    // Field widths here are at most 11 bits; unpack cannot fail.
    unpack_signed(word as u64, width).unwrap_or(0) as i16
}

fn reg_field(word: u16, shift: u32) -> Reg {
    Reg::from_bits(word >> shift)
}

/// Decodes one raw instruction word. Reserved opcodes (RTI, RES) fail with
/// `BadOpcode` carrying the raw opcode nibble.
pub fn decode(word: u16) -> Result<Instr> {
    let opcode = Opcode::try_from(word >> 12)?;
    Ok(match opcode {
        Opcode::Br => Instr::Br {
            mask: (word >> 9) & 0b111,
            offset: field_signed(word, 9),
        },
        Opcode::Add | Opcode::And => {
            let dr = reg_field(word, 9);
            let sr1 = reg_field(word, 6);
            let imm_mode = word & (1 << 5) != 0;
            match (opcode, imm_mode) {
                (Opcode::Add, true) => Instr::AddImm {
                    dr,
                    sr1,
                    imm: field_signed(word, 5),
                },
                (Opcode::Add, false) => Instr::AddReg {
                    dr,
                    sr1,
                    sr2: reg_field(word, 0),
                },
                (Opcode::And, true) => Instr::AndImm {
                    dr,
                    sr1,
                    imm: field_signed(word, 5),
                },
                _ => Instr::AndReg {
                    dr,
                    sr1,
                    sr2: reg_field(word, 0),
                },
            }
        }
        Opcode::Not => Instr::Not {
            dr: reg_field(word, 9),
            sr: reg_field(word, 6),
        },
        Opcode::Jmp => Instr::Jmp {
            base: reg_field(word, 6),
        },
        Opcode::Jsr => {
            if word & (1 << 11) != 0 {
                Instr::Jsr {
                    offset: field_signed(word, 11),
                }
            } else {
                Instr::Jsrr {
                    base: reg_field(word, 6),
                }
            }
        }
        Opcode::Ld => Instr::Ld {
            dr: reg_field(word, 9),
            offset: field_signed(word, 9),
        },
        Opcode::Ldi => Instr::Ldi {
            dr: reg_field(word, 9),
            offset: field_signed(word, 9),
        },
        Opcode::Ldr => Instr::Ldr {
            dr: reg_field(word, 9),
            base: reg_field(word, 6),
            offset: field_signed(word, 6),
        },
        Opcode::Lea => Instr::Lea {
            dr: reg_field(word, 9),
            offset: field_signed(word, 9),
        },
        Opcode::St => Instr::St {
            sr: reg_field(word, 9),
            offset: field_signed(word, 9),
        },
        Opcode::Sti => Instr::Sti {
            sr: reg_field(word, 9),
            offset: field_signed(word, 9),
        },
        Opcode::Str => Instr::Str {
            sr: reg_field(word, 9),
            base: reg_field(word, 6),
            offset: field_signed(word, 6),
        },
        Opcode::Trap => Instr::Trap {
            vector: word & 0xFF,
        },
        Opcode::Rti | Opcode::Res => {
            return Err(VmError::BadOpcode {
                opcode: opcode as u16,
            })
        }
    })
}
