//! Substring and replacement over Script and Hex values

use super::binary::checked_range;
use super::Params;
use crate::contract::Contract;
use crate::error::Result;
use crate::value::{Value, ValueType};

/// SUBSTR(start, end, value): characters of a Script or bytes of a Hex in `[start, end)`
pub(super) fn substr(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let start = p.index(0, contract)?;
    let end = p.index(1, contract)?;
    match p.value(2, contract)? {
        Value::Script(text) => {
            let chars: Vec<char> = text.chars().collect();
            let range = checked_range(p, start, end, chars.len())?;
            Ok(Value::Script(chars[range].iter().collect()))
        }
        Value::Hex(data) => {
            let range = checked_range(p, start, end, data.len())?;
            Ok(Value::Hex(data[range].to_vec()))
        }
        other => {
            other.expect_type(&[ValueType::Script, ValueType::Hex], p.name())?;
            Ok(other)
        }
    }
}

/// REPLACE / REPLACEFIRST(value, find, replacement)
pub(super) fn replace(p: &Params<'_>, contract: &mut Contract<'_>, all: bool) -> Result<Value> {
    let value = p.value(0, contract)?;
    value.expect_type(&[ValueType::Script, ValueType::Hex], p.name())?;
    let value_type = value.value_type();
    let find = p.value(1, contract)?;
    let replacement = p.value(2, contract)?;
    find.expect_type(&[value_type], p.name())?;
    replacement.expect_type(&[value_type], p.name())?;

    let (value, find, replacement) = (
        value.into_bytes(p.name())?,
        find.into_bytes(p.name())?,
        replacement.into_bytes(p.name())?,
    );
    if find.is_empty() {
        return Err(p.error("search value is empty"));
    }
    let max = contract.limits().max_data_size;
    let result = replace_bytes(&value, &find, &replacement, all, max).ok_or_else(|| p.limit_error(format!("result exceeds {} bytes", max)))?;

    if value_type == ValueType::Hex {
        return Ok(Value::Hex(result));
    }
    // Whole UTF-8 sequences were swapped, so the result is still valid text
    String::from_utf8(result).map(Value::Script).map_err(|e| p.error(e))
}

/// Replace occurrences of `find`; `None` when the result would exceed `max` bytes
fn replace_bytes(data: &[u8], find: &[u8], replacement: &[u8], all: bool, max: usize) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    let mut replaced = false;
    while i < data.len() {
        if (all || !replaced) && data[i..].starts_with(find) {
            out.extend_from_slice(replacement);
            i += find.len();
            replaced = true;
        } else {
            out.push(data[i]);
            i += 1;
        }
        if out.len() > max {
            return None;
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::replace_bytes;
    use crate::functions::test_support::{eval, hex, text};

    #[test]
    fn test_substr_bounds() {
        assert_eq!(eval("SUBSTR(1 3 [abcdef])").unwrap(), text("bc"));
        assert!(eval("SUBSTR(3 1 [abcdef])").is_err());
        assert!(eval("SUBSTR(0 10 [abc])").is_err());
        assert_eq!(eval("SUBSTR(0 0 [abc])").unwrap(), text(""));
        assert_eq!(eval("SUBSTR(1 2 [héllo])").unwrap(), text("é"));
        assert_eq!(eval("SUBSTR(1 2 0xAABBCC)").unwrap(), hex("0xBB"));
        assert!(eval("SUBSTR(0 1 5)").is_err());
    }

    #[test]
    fn test_replace() {
        assert_eq!(eval("REPLACE([a-b-c] [-] [+])").unwrap(), text("a+b+c"));
        assert_eq!(eval("REPLACEFIRST([a-b-c] [-] [])").unwrap(), text("ab-c"));
        assert_eq!(eval("REPLACE(0x010201 0x01 0xFFFF)").unwrap(), hex("0xFFFF02FFFF"));
        assert!(eval("REPLACE([abc] [] [x])").is_err());
        assert!(eval("REPLACE([abc] 0x61 [x])").is_err());
    }

    #[test]
    fn test_replace_size_limit() {
        assert_eq!(replace_bytes(b"aaaa", b"a", b"bb", true, 8), Some(b"bbbbbbbb".to_vec()));
        assert_eq!(replace_bytes(b"aaaa", b"a", b"bb", true, 7), None);
        assert_eq!(replace_bytes(b"aaaa", b"a", b"bb", false, 7), Some(b"bbaaa".to_vec()));
    }
}
