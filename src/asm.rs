//! Instruction encoder: one pure function per mnemonic.
//!
//! Each function composes the 4-bit opcode with operand fields through the
//! codec in [`crate::bits`] and returns the finished 16-bit word. Operand
//! ranges are validated, never truncated; out-of-range immediates and
//! offsets fail with `FieldOverflow`.

use crate::bits::pack_signed;
use crate::decode::Opcode;
use crate::state::Reg;
use crate::{Result, VmError};

fn op(opcode: Opcode) -> u16 {
    (opcode as u16) << 12
}

fn signed_field(value: i16, width: u32) -> Result<u16> {
    Ok(pack_signed(value as i64, width)? as u16)
}

fn unsigned_field(value: u16, width: u32) -> Result<u16> {
    if u32::from(value) >> width != 0 {
        return Err(VmError::FieldOverflow {
            width,
            value: value as i64,
        });
    }
    Ok(value)
}

/// `ADD dr, sr1, #imm`: layout `0001 dr sr1 1 imm5`.
pub fn add_imm(dr: Reg, sr1: Reg, imm: i16) -> Result<u16> {
    Ok(op(Opcode::Add) | dr.bits() << 9 | sr1.bits() << 6 | 1 << 5 | signed_field(imm, 5)?)
}

/// `ADD dr, sr1, sr2`: layout `0001 dr sr1 0 00 sr2`.
pub fn add_reg(dr: Reg, sr1: Reg, sr2: Reg) -> Result<u16> {
    Ok(op(Opcode::Add) | dr.bits() << 9 | sr1.bits() << 6 | sr2.bits())
}

/// `AND dr, sr1, #imm`: layout `0101 dr sr1 1 imm5`.
pub fn and_imm(dr: Reg, sr1: Reg, imm: i16) -> Result<u16> {
    Ok(op(Opcode::And) | dr.bits() << 9 | sr1.bits() << 6 | 1 << 5 | signed_field(imm, 5)?)
}

/// `AND dr, sr1, sr2`: layout `0101 dr sr1 0 00 sr2`.
pub fn and_reg(dr: Reg, sr1: Reg, sr2: Reg) -> Result<u16> {
    Ok(op(Opcode::And) | dr.bits() << 9 | sr1.bits() << 6 | sr2.bits())
}

/// `NOT dr, sr`: layout `1001 dr sr 111111`.
pub fn not(dr: Reg, sr: Reg) -> Result<u16> {
    Ok(op(Opcode::Not) | dr.bits() << 9 | sr.bits() << 6 | 0b111111)
}

/// `BR[nzp] #offset`: layout `0000 mask offset9`. The three mask bits test
/// the condition flag (zero, negative, positive from low to high).
pub fn br(mask: u16, offset: i16) -> Result<u16> {
    Ok(op(Opcode::Br) | unsigned_field(mask, 3)? << 9 | signed_field(offset, 9)?)
}

/// `JMP base`: layout `1100 000 base 000000`.
pub fn jmp(base: Reg) -> Result<u16> {
    Ok(op(Opcode::Jmp) | base.bits() << 6)
}

/// `JSR #offset`: long PC-relative form, layout `0100 1 offset11`.
pub fn jsr(offset: i16) -> Result<u16> {
    Ok(op(Opcode::Jsr) | 1 << 11 | signed_field(offset, 11)?)
}

/// `JSRR base`: register form, layout `0100 0 00 base 000000`.
pub fn jsrr(base: Reg) -> Result<u16> {
    Ok(op(Opcode::Jsr) | base.bits() << 6)
}

/// `LD dr, #offset`: layout `0010 dr offset9`.
pub fn ld(dr: Reg, offset: i16) -> Result<u16> {
    Ok(op(Opcode::Ld) | dr.bits() << 9 | signed_field(offset, 9)?)
}

/// `LDI dr, #offset`: layout `1010 dr offset9`.
pub fn ldi(dr: Reg, offset: i16) -> Result<u16> {
    Ok(op(Opcode::Ldi) | dr.bits() << 9 | signed_field(offset, 9)?)
}

/// `LDR dr, base, #offset`: layout `0110 dr base offset6`.
pub fn ldr(dr: Reg, base: Reg, offset: i16) -> Result<u16> {
    Ok(op(Opcode::Ldr) | dr.bits() << 9 | base.bits() << 6 | signed_field(offset, 6)?)
}

/// `LEA dr, #offset`: layout `1110 dr offset9`.
pub fn lea(dr: Reg, offset: i16) -> Result<u16> {
    Ok(op(Opcode::Lea) | dr.bits() << 9 | signed_field(offset, 9)?)
}

/// `ST sr, #offset`: layout `0011 sr offset9`.
pub fn st(sr: Reg, offset: i16) -> Result<u16> {
    Ok(op(Opcode::St) | sr.bits() << 9 | signed_field(offset, 9)?)
}

/// `STI sr, #offset`: layout `1011 sr offset9`.
pub fn sti(sr: Reg, offset: i16) -> Result<u16> {
    Ok(op(Opcode::Sti) | sr.bits() << 9 | signed_field(offset, 9)?)
}

/// `STR sr, base, #offset`: layout `0111 sr base offset6`.
pub fn str(sr: Reg, base: Reg, offset: i16) -> Result<u16> {
    Ok(op(Opcode::Str) | sr.bits() << 9 | base.bits() << 6 | signed_field(offset, 6)?)
}

/// `TRAP vector`: layout `1111 0000 vector8`.
pub fn trap(vector: u16) -> Result<u16> {
    Ok(op(Opcode::Trap) | unsigned_field(vector, 8)?)
}
