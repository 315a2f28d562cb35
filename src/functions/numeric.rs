//! Arithmetic built-ins

use super::{Function, Params};
use crate::contract::Contract;
use crate::error::Result;
use crate::value::Value;

pub(super) fn unary(function: Function, p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let n = p.number(0, contract)?;
    let result = match function {
        Function::Abs => n.abs(),
        Function::Ceil => n.ceil(),
        Function::Floor => n.floor(),
        Function::Dec => n.decrement()?,
        Function::Inc => n.increment()?,
        _ => n.sqrt()?,
    };
    Ok(Value::Number(result))
}

/// MAX / MIN over two or more numbers
pub(super) fn extreme(function: Function, p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let mut best = p.number(0, contract)?;
    for i in 1..p.len() {
        let n = p.number(i, contract)?;
        let replace = match function {
            Function::Max => n > best,
            _ => n < best,
        };
        if replace {
            best = n;
        }
    }
    Ok(Value::Number(best))
}

/// SIGDIG(digits, number)
pub(super) fn sig_dig(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let digits = p.index(0, contract)?;
    let n = p.number(1, contract)?;
    Ok(Value::Number(n.significant_digits(digits)?))
}

/// POW(exponent, value)
pub(super) fn pow(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let exponent = p.number(0, contract)?;
    let base = p.number(1, contract)?;
    Ok(Value::Number(base.pow(&exponent)?))
}
