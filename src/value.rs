//! Runtime values of the script language

use crate::error::{Result, ScriptError};
use crate::number::Number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Number,
    Hex,
    Script,
}

impl ValueType {
    /// Byte tag used by the binary codec
    pub fn tag(self) -> u8 {
        match self {
            ValueType::Hex => 1,
            ValueType::Number => 2,
            ValueType::Script => 4,
            ValueType::Boolean => 8,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ValueType::Hex),
            2 => Some(ValueType::Number),
            4 => Some(ValueType::Script),
            8 => Some(ValueType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Boolean => "BOOLEAN",
            ValueType::Number => "NUMBER",
            ValueType::Hex => "HEX",
            ValueType::Script => "SCRIPT",
        };
        f.write_str(name)
    }
}

/// A typed script value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Number(Number),
    Hex(Vec<u8>),
    Script(String),
}

impl Value {
    pub const TRUE: Value = Value::Boolean(true);
    pub const FALSE: Value = Value::Boolean(false);

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::Hex(_) => ValueType::Hex,
            Value::Script(_) => ValueType::Script,
        }
    }

    /// Fail unless the value is one of `allowed`
    pub fn expect_type(&self, allowed: &[ValueType], context: &str) -> Result<()> {
        if allowed.contains(&self.value_type()) {
            Ok(())
        } else {
            Err(self.mismatch(allowed, context))
        }
    }

    fn mismatch(&self, allowed: &[ValueType], context: &str) -> ScriptError {
        let expected: Vec<String> = allowed.iter().map(ValueType::to_string).collect();
        ScriptError::Execution(format!(
            "{}: expected {} but found {} {}",
            context,
            expected.join(" or "),
            self.value_type(),
            self.to_literal()
        ))
    }

    pub fn into_bool(self, context: &str) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(b),
            other => Err(other.mismatch(&[ValueType::Boolean], context)),
        }
    }

    pub fn into_number(self, context: &str) -> Result<Number> {
        match self {
            Value::Number(n) => Ok(n),
            other => Err(other.mismatch(&[ValueType::Number], context)),
        }
    }

    pub fn into_hex(self, context: &str) -> Result<Vec<u8>> {
        match self {
            Value::Hex(data) => Ok(data),
            other => Err(other.mismatch(&[ValueType::Hex], context)),
        }
    }

    pub fn into_script(self, context: &str) -> Result<String> {
        match self {
            Value::Script(text) => Ok(text),
            other => Err(other.mismatch(&[ValueType::Script], context)),
        }
    }

    /// Bytes of a Hex or Script value
    pub fn into_bytes(self, context: &str) -> Result<Vec<u8>> {
        match self {
            Value::Hex(data) => Ok(data),
            Value::Script(text) => Ok(text.into_bytes()),
            other => Err(other.mismatch(&[ValueType::Hex, ValueType::Script], context)),
        }
    }

    /// Size in bytes of the underlying data
    pub fn data_len(&self) -> usize {
        match self {
            Value::Boolean(_) => 1,
            Value::Number(n) => n.to_string().len(),
            Value::Hex(data) => data.len(),
            Value::Script(text) => text.len(),
        }
    }

    /// Form of the value as it would appear in script text
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::value::Value;
    ///
    /// assert_eq!(Value::Script("hi".to_string()).to_literal(), "[hi]");
    /// assert_eq!(Value::Hex(vec![0xab, 0x01]).to_literal(), "0xAB01");
    /// ```
    pub fn to_literal(&self) -> String {
        match self {
            Value::Script(text) => format!("[{}]", text),
            other => other.to_string(),
        }
    }
}

/// Decode `0x`-prefixed hex; odd-length input gets a leading zero nibble
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let padded = if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    };
    hex::decode(&padded).map_err(|e| ScriptError::Parse(format!("Invalid hex {}: {}", text, e)))
}

/// Uppercase `0x`-prefixed rendering of bytes
pub fn format_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode_upper(data))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Hex(data) => f.write_str(&format_hex(data)),
            Value::Script(text) => f.write_str(text),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Hex(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::TRUE.to_string(), "TRUE");
        assert_eq!(Value::Number("1.50".parse().unwrap()).to_string(), "1.5");
        assert_eq!(Value::Hex(vec![0x0a, 0xff]).to_string(), "0x0AFF");
        assert_eq!(Value::Hex(vec![]).to_string(), "0x");
        assert_eq!(Value::Script("hello".to_string()).to_string(), "hello");
        assert_eq!(Value::Script("hello".to_string()).to_literal(), "[hello]");
    }

    #[test]
    fn test_type_checks() {
        let value = Value::Hex(vec![1]);
        assert!(value.expect_type(&[ValueType::Hex, ValueType::Script], "LEN").is_ok());
        assert!(value.clone().into_number("ABS").is_err());
        assert_eq!(value.into_bytes("SHA3").unwrap(), vec![1]);
        assert_eq!(Value::Script("ab".to_string()).into_bytes("SHA3").unwrap(), b"ab".to_vec());
        assert!(Value::TRUE.into_bytes("SHA3").is_err());
    }

    #[test]
    fn test_type_tags() {
        for t in [ValueType::Boolean, ValueType::Number, ValueType::Hex, ValueType::Script] {
            assert_eq!(ValueType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(ValueType::from_tag(3), None);
    }
}
