//! Configurable execution limits
//!
//! Defaults match the consensus constants. A node may load a different set
//! from JSON for testing or for a private network.

use crate::constants::*;
use crate::error::{Result, ScriptError};
use serde::{Deserialize, Serialize};

/// Resource ceilings applied to parsing and execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    pub max_instructions: usize,
    pub max_stack_depth: usize,
    pub max_function_params: usize,
    pub max_data_size: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_instructions: MAX_INSTRUCTIONS,
            max_stack_depth: MAX_STACK_DEPTH,
            max_function_params: MAX_FUNCTION_PARAMS,
            max_data_size: MAX_DATA_SIZE,
        }
    }
}

impl ScriptLimits {
    /// Parse limits from JSON; missing fields take their default
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::config::ScriptLimits;
    ///
    /// let limits = ScriptLimits::from_json(r#"{"max_instructions": 50}"#).unwrap();
    /// assert_eq!(limits.max_instructions, 50);
    /// assert_eq!(limits.max_stack_depth, selfscript::MAX_STACK_DEPTH);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let limits: ScriptLimits = serde_json::from_str(json)?;
        limits.validate()?;
        Ok(limits)
    }

    /// Serialize limits to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject ceilings that would make every script fail
    pub fn validate(&self) -> Result<()> {
        if self.max_instructions == 0 {
            return Err(ScriptError::Config("max_instructions must be positive".to_string()));
        }
        if self.max_stack_depth == 0 {
            return Err(ScriptError::Config("max_stack_depth must be positive".to_string()));
        }
        if self.max_function_params == 0 {
            return Err(ScriptError::Config("max_function_params must be positive".to_string()));
        }
        if self.max_data_size == 0 {
            return Err(ScriptError::Config("max_data_size must be positive".to_string()));
        }
        Ok(())
    }
}
