//! Script addresses
//!
//! An address is the SHA3-256 hash of a script's canonical text, so scripts
//! differing only in whitespace or case share an address.

use crate::canonical::clean;
use crate::config::ScriptLimits;
use crate::crypto::sha3_256;
use crate::error::Result;
use crate::types::Hash;
use crate::value::format_hex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cleaned script and the hash that identifies it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    script: String,
    hash: Hash,
}

impl Address {
    /// Address of a script, cleaning it first
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::address::Address;
    /// use selfscript::config::ScriptLimits;
    ///
    /// let limits = ScriptLimits::default();
    /// let a = Address::from_script("RETURN TRUE", &limits).unwrap();
    /// let b = Address::from_script("return   true", &limits).unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(a.script(), "RETURN TRUE");
    /// ```
    pub fn from_script(script: &str, limits: &ScriptLimits) -> Result<Self> {
        let cleaned = clean(script, limits)?;
        Ok(Self::from_clean_script(cleaned))
    }

    /// Address of text already in canonical form
    pub fn from_clean_script(script: impl Into<String>) -> Self {
        let script = script.into();
        let hash = sha3_256(script.as_bytes());
        Self { script, hash }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hex(&self.hash))
    }
}
