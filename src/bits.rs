//! Signed bit-field codec shared by the encoder and the decoder.

use crate::{Result, VmError};

pub const MIN_FIELD_WIDTH: u32 = 2;
pub const MAX_FIELD_WIDTH: u32 = 64;

fn check_width(width: u32, value: i64) -> Result<()> {
    if !(MIN_FIELD_WIDTH..=MAX_FIELD_WIDTH).contains(&width) {
        return Err(VmError::FieldOverflow { width, value });
    }
    Ok(())
}

/// Two's-complement encoding of `value` into the low `width` bits.
///
/// Fails with `FieldOverflow` when `value` falls outside
/// `[-2^(width-1), 2^(width-1) - 1]` or `width` is outside `[2, 64]`.
pub fn pack_signed(value: i64, width: u32) -> Result<u64> {
    check_width(width, value)?;
    if width == 64 {
        return Ok(value as u64);
    }
    let min = -(1i64 << (width - 1));
    let max = (1i64 << (width - 1)) - 1;
    if value < min || value > max {
        return Err(VmError::FieldOverflow { width, value });
    }
    Ok((value as u64) & ((1u64 << width) - 1))
}

/// Exact inverse of [`pack_signed`]: reads the low `width` bits of `bits`,
/// tests the sign bit, and subtracts `2^width` when it is set.
pub fn unpack_signed(bits: u64, width: u32) -> Result<i64> {
    check_width(width, bits as i64)?;
    if width == 64 {
        return Ok(bits as i64);
    }
    let shift = 64 - width;
    Ok(((bits << shift) as i64) >> shift)
}
