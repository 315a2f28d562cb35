//! Conversions between value types

use super::Params;
use crate::address::Address;
use crate::contract::Contract;
use crate::error::Result;
use crate::number::Number;
use crate::value::Value;
use num_bigint::BigUint;

pub(super) fn to_bool(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let result = match p.value(0, contract)? {
        Value::Boolean(b) => b,
        Value::Number(n) => !n.is_zero(),
        Value::Hex(data) => data.iter().any(|b| *b != 0),
        Value::Script(text) => {
            if text.trim().eq_ignore_ascii_case("TRUE") {
                true
            } else if text.trim().eq_ignore_ascii_case("FALSE") {
                false
            } else {
                return Err(p.error(format!("cannot convert [{}] to BOOLEAN", text)));
            }
        }
    };
    Ok(Value::Boolean(result))
}

/// HEX(x): whole non-negative numbers become big-endian bytes
pub(super) fn to_hex(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = match p.value(0, contract)? {
        Value::Boolean(b) => vec![u8::from(b)],
        Value::Hex(data) => data,
        Value::Number(n) => {
            let integer = n
                .to_biguint()
                .map_err(|_| p.error(format!("can only convert whole non-negative numbers, found {}", n)))?;
            integer.to_bytes_be()
        }
        Value::Script(text) => text.into_bytes(),
    };
    Ok(Value::Hex(data))
}

/// NUMBER(x): hex is read as an unsigned big-endian integer
pub(super) fn to_number(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let number = match p.value(0, contract)? {
        Value::Boolean(b) => Number::from(i64::from(b)),
        Value::Number(n) => n,
        Value::Hex(data) => Number::from_biguint(BigUint::from_bytes_be(&data))?,
        Value::Script(text) => text
            .trim()
            .parse()
            .map_err(|_| p.error(format!("cannot convert [{}] to NUMBER", text)))?,
    };
    Ok(Value::Number(number))
}

pub(super) fn to_string(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let value = p.value(0, contract)?;
    Ok(Value::Script(value.to_string()))
}

pub(super) fn ascii(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.hex(0, contract)?;
    if !data.is_ascii() {
        return Err(p.error("data is not ASCII"));
    }
    Ok(Value::Script(data.iter().map(|b| char::from(*b)).collect()))
}

pub(super) fn utf8(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.hex(0, contract)?;
    String::from_utf8(data)
        .map(Value::Script)
        .map_err(|e| p.error(e))
}

/// ADDRESS(script): address of the cleaned script
pub(super) fn address(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let script = p.script(0, contract)?;
    let limits = *contract.limits();
    let address = Address::from_script(&script, &limits)?;
    Ok(Value::Hex(address.hash().to_vec()))
}
