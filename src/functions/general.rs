//! Array lookups and user functions

use super::Params;
use crate::constants::MAX_FUNCTION_REPLACEMENTS;
use crate::contract::Contract;
use crate::error::{Result, ScriptError};
use crate::value::Value;

/// Variable name of an array entry: each Number key followed by a comma
pub(crate) fn composite_key(keys: Vec<Value>, context: &str) -> Result<String> {
    let mut name = String::new();
    for key in keys {
        let number = key.into_number(context)?;
        name.push_str(number.to_string().trim());
        name.push(',');
    }
    Ok(name)
}

fn key_of(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<String> {
    let keys = p.values(contract)?;
    composite_key(keys, p.name())
}

pub(super) fn get(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let key = key_of(p, contract)?;
    contract
        .variable(&key)
        .map_err(|_| p.error(format!("no value stored at ({})", key)))
}

pub(super) fn exists(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let key = key_of(p, contract)?;
    Ok(Value::Boolean(contract.has_variable(&key)))
}

/// FUNCTION(script, p1, .., pn): substitute `$1..$n` and run the script
pub(super) fn function(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let mut script = p.script(0, contract)?;
    check_replacements(p, &script)?;

    // Highest index first so that `$1` never rewrites part of `$10`
    for i in (1..p.len()).rev() {
        let replacement = p.value(i, contract)?.to_literal();
        script = script.replace(&format!("${}", i), &replacement);
        check_replacements(p, &script)?;
        if script.len() > contract.limits().max_data_size {
            return Err(p.limit_error(format!("script exceeds {} bytes", contract.limits().max_data_size)));
        }
    }

    contract.trace(|| format!("FUNCTION [{}]", script));
    contract.run_function(&script)
}

fn check_replacements(p: &Params<'_>, script: &str) -> Result<()> {
    let markers = script.matches('$').count();
    if markers > MAX_FUNCTION_REPLACEMENTS {
        return Err(ScriptError::Execution(format!(
            "{}: {} replacements exceed maximum {}",
            p.name(),
            markers,
            MAX_FUNCTION_REPLACEMENTS
        )));
    }
    Ok(())
}
