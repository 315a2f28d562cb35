//! Error types for script parsing and contract execution

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),
}

impl ScriptError {
    /// True for instruction or stack-depth ceiling failures
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, ScriptError::ResourceLimit(_))
    }

    /// True for failures raised before execution began
    pub fn is_parse(&self) -> bool {
        matches!(self, ScriptError::Parse(_))
    }
}

impl From<serde_json::Error> for ScriptError {
    fn from(err: serde_json::Error) -> Self {
        ScriptError::Config(err.to_string())
    }
}

impl From<crate::number::NumberError> for ScriptError {
    fn from(err: crate::number::NumberError) -> Self {
        ScriptError::Execution(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
