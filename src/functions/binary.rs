//! Byte-string built-ins
//!
//! Bit index 0 is the most significant bit of the first byte.

use super::Params;
use crate::contract::Contract;
use crate::error::Result;
use crate::number::Number;
use crate::value::Value;

/// CONCAT(a, b, ..): joins Hex values, or Script values
pub(super) fn concat(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let max = contract.limits().max_data_size;
    match p.value(0, contract)? {
        Value::Hex(mut data) => {
            for i in 1..p.len() {
                data.extend(p.hex(i, contract)?);
                if data.len() > max {
                    return Err(p.limit_error(format!("result exceeds {} bytes", max)));
                }
            }
            Ok(Value::Hex(data))
        }
        Value::Script(mut text) => {
            for i in 1..p.len() {
                text.push_str(&p.script(i, contract)?);
                if text.len() > max {
                    return Err(p.limit_error(format!("result exceeds {} bytes", max)));
                }
            }
            Ok(Value::Script(text))
        }
        other => Err(hex_or_script(p, &other)),
    }
}

/// LEN(x): bytes of a Hex value or characters of a Script value
pub(super) fn len(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let len = match p.value(0, contract)? {
        Value::Hex(data) => data.len(),
        Value::Script(text) => text.chars().count(),
        other => return Err(hex_or_script(p, &other)),
    };
    Ok(Value::Number(Number::from(len)))
}

pub(super) fn rev(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let mut data = p.hex(0, contract)?;
    data.reverse();
    Ok(Value::Hex(data))
}

/// SUBSET(start, end, hex): bytes in `[start, end)`
pub(super) fn subset(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let start = p.index(0, contract)?;
    let end = p.index(1, contract)?;
    let data = p.hex(2, contract)?;
    let range = checked_range(p, start, end, data.len())?;
    Ok(Value::Hex(data[range].to_vec()))
}

/// OVERWRITE(src, src_pos, dst, dst_pos, len): copy `len` bytes of `src` into `dst`
pub(super) fn overwrite(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let source = p.hex(0, contract)?;
    let source_pos = p.index(1, contract)?;
    let mut target = p.hex(2, contract)?;
    let target_pos = p.index(3, contract)?;
    let len = p.index(4, contract)?;

    let from = checked_range(p, source_pos, source_pos.saturating_add(len), source.len())?;
    let to = checked_range(p, target_pos, target_pos.saturating_add(len), target.len())?;
    target[to].copy_from_slice(&source[from]);
    Ok(Value::Hex(target))
}

/// SETLEN(hex, len): pad with leading zeros or drop leading bytes
pub(super) fn set_len(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.hex(0, contract)?;
    let len = p.index(1, contract)?;
    if len > contract.limits().max_data_size {
        return Err(p.limit_error(format!("length {} exceeds {} bytes", len, contract.limits().max_data_size)));
    }
    let result = if len >= data.len() {
        let mut padded = vec![0u8; len - data.len()];
        padded.extend_from_slice(&data);
        padded
    } else {
        data[data.len() - len..].to_vec()
    };
    Ok(Value::Hex(result))
}

/// BITSET(hex, bit, value)
pub(super) fn bit_set(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let mut data = p.hex(0, contract)?;
    let bit = p.index(1, contract)?;
    let set = p.boolean(2, contract)?;
    let (byte, mask) = bit_position(p, bit, data.len())?;
    if set {
        data[byte] |= mask;
    } else {
        data[byte] &= !mask;
    }
    Ok(Value::Hex(data))
}

/// BITGET(hex, bit)
pub(super) fn bit_get(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.hex(0, contract)?;
    let bit = p.index(1, contract)?;
    let (byte, mask) = bit_position(p, bit, data.len())?;
    Ok(Value::Boolean(data[byte] & mask != 0))
}

pub(super) fn bit_count(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.hex(0, contract)?;
    let count: u32 = data.iter().map(|b| b.count_ones()).sum();
    Ok(Value::Number(Number::from(u64::from(count))))
}

fn hex_or_script(p: &Params<'_>, value: &Value) -> crate::error::ScriptError {
    p.error(format!("expected HEX or SCRIPT but found {}", value.value_type()))
}

fn bit_position(p: &Params<'_>, bit: usize, len: usize) -> Result<(usize, u8)> {
    let byte = bit / 8;
    if byte >= len {
        return Err(p.error(format!("bit {} out of range for {} bytes", bit, len)));
    }
    Ok((byte, 0x80 >> (bit % 8)))
}

/// Validate `[start, end)` against a length
pub(super) fn checked_range(p: &Params<'_>, start: usize, end: usize, len: usize) -> Result<std::ops::Range<usize>> {
    if end < start {
        return Err(p.error(format!("end {} before start {}", end, start)));
    }
    if end > len {
        return Err(p.error(format!("range {}..{} exceeds length {}", start, end, len)));
    }
    Ok(start..end)
}
