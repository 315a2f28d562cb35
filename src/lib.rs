//! # Selfscript
//!
//! Deterministic contract scripting engine for authorizing coin spends.
//!
//! Every node must evaluate a script identically, so this crate provides
//! side-effect-free parsing and evaluation bounded by an instruction budget
//! and a stack-depth ceiling.
//!
//! ## Architecture
//!
//! The engine follows a layered architecture:
//! - Tokenizer (script text to typed tokens)
//! - Parser (tokens to statements and expression trees)
//! - Contract (one evaluation: variables, globals, state, budget, witness)
//! - Built-in functions (signatures, hashing, state, arithmetic, strings)
//! - Canonical form and addresses (`clean` and SHA3-256 of the result)
//!
//! ## Design Principles
//!
//! 1. **Determinism**: no floating point, no clocks, no randomness
//! 2. **Bounded Cost**: every step is charged against the instruction budget
//! 3. **Exact Version Pinning**: consensus-critical dependencies pinned to exact versions
//! 4. **No Partial Acceptance**: any error rejects the whole evaluation
//!
//! ## Usage
//!
//! ```rust
//! use selfscript::ScriptEngine;
//! use selfscript::types::*;
//!
//! let engine = ScriptEngine::new();
//! let transaction = Transaction::default();
//! let witness = Witness::default();
//!
//! let outcome = engine
//!     .execute("LET x = 3 * 4 RETURN x EQ 12", &transaction, &witness, &[])
//!     .unwrap();
//! assert_eq!(outcome, ExecutionOutcome::Accepted);
//! ```

pub mod address;
pub mod canonical;
pub mod config;
pub mod constants;
pub mod contract;
pub mod crypto;
pub mod error;
pub mod expression;
pub mod functions;
pub mod mmr;
pub mod number;
pub mod parser;
pub mod serialization;
pub mod statement;
pub mod tokenizer;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use address::Address;
pub use config::ScriptLimits;
pub use constants::*;
pub use contract::{Contract, ContractPhase};
pub use error::{Result, ScriptError};
pub use expression::Expression;
pub use number::Number;
pub use serialization::TxnRow;
pub use statement::StatementBlock;
pub use types::*;
pub use value::Value;

/// Main scripting engine entry point
///
/// Holds the limits applied to every parse and contract it creates.
///
/// # Examples
///
/// ```
/// use selfscript::ScriptEngine;
///
/// let engine = ScriptEngine::new();
/// assert_eq!(engine.clean("return   signedby( 0xaa )").unwrap(), "RETURN SIGNEDBY(0xAA)");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptEngine {
    limits: ScriptLimits,
}

impl ScriptEngine {
    /// Create an engine with the consensus limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom limits
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::{ScriptEngine, ScriptLimits};
    ///
    /// let limits = ScriptLimits { max_instructions: 10, ..ScriptLimits::default() };
    /// let engine = ScriptEngine::with_limits(limits).unwrap();
    /// assert_eq!(engine.limits().max_instructions, 10);
    ///
    /// let broken = ScriptLimits { max_stack_depth: 0, ..ScriptLimits::default() };
    /// assert!(ScriptEngine::with_limits(broken).is_err());
    /// ```
    pub fn with_limits(limits: ScriptLimits) -> Result<Self> {
        limits.validate()?;
        Ok(Self { limits })
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }

    /// Parse a script into its statement block
    pub fn parse(&self, script: &str) -> Result<StatementBlock> {
        parser::parse_script(script, &self.limits)
    }

    /// Parse a single expression
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::ScriptEngine;
    ///
    /// let engine = ScriptEngine::new();
    /// let expression = engine.parse_expression("1 + 2 * 3").unwrap();
    /// assert_eq!(expression.to_string(), "1 + 2 * 3");
    /// assert!(engine.parse_expression("1 +").is_err());
    /// ```
    pub fn parse_expression(&self, text: &str) -> Result<Expression> {
        parser::parse_expression(text, &self.limits)
    }

    /// Canonical form of a script
    pub fn clean(&self, script: &str) -> Result<String> {
        canonical::clean(script, &self.limits)
    }

    /// Address of a script
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::ScriptEngine;
    ///
    /// let engine = ScriptEngine::new();
    /// let a = engine.address("RETURN TRUE").unwrap();
    /// let b = engine.address("return true").unwrap();
    /// assert_eq!(a.hash(), b.hash());
    /// ```
    pub fn address(&self, script: &str) -> Result<Address> {
        Address::from_script(script, &self.limits)
    }

    /// Contract for one evaluation of `script`, carrying this engine's limits
    ///
    /// Use this when globals, a custom verifier or tracing are needed
    /// before execution.
    pub fn contract<'a>(
        &self,
        script: &str,
        transaction: &'a Transaction,
        witness: &'a Witness,
        prev_state: &[StateVariable],
    ) -> Contract<'a> {
        Contract::new(script, transaction, witness, prev_state).with_limits(self.limits)
    }

    /// Parse and run a script once
    pub fn execute(
        &self,
        script: &str,
        transaction: &Transaction,
        witness: &Witness,
        prev_state: &[StateVariable],
    ) -> Result<ExecutionOutcome> {
        self.contract(script, transaction, witness, prev_state).execute()
    }

    /// Run a traced evaluation and package it for the command layer
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::ScriptEngine;
    /// use selfscript::types::*;
    ///
    /// let engine = ScriptEngine::new();
    /// let tx = Transaction::default();
    /// let witness = Witness::default();
    ///
    /// let reply = engine.reply("RETURN 1 EQ 2", &tx, &witness, &[]);
    /// assert!(!reply.status);
    /// assert!(!reply.trace.is_empty());
    /// ```
    pub fn reply(
        &self,
        script: &str,
        transaction: &Transaction,
        witness: &Witness,
        prev_state: &[StateVariable],
    ) -> ScriptReply {
        let mut contract = self.contract(script, transaction, witness, prev_state).with_trace(true);
        let outcome = contract.execute();
        ScriptReply::from_outcome(&outcome, contract.trace_log())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_limits_apply_to_contracts() {
        let limits = ScriptLimits { max_instructions: 3, ..ScriptLimits::default() };
        let engine = ScriptEngine::with_limits(limits).unwrap();
        let tx = Transaction::default();
        let witness = Witness::default();
        let err = engine.execute("LET a = 1 LET b = 2 LET c = 3 RETURN TRUE", &tx, &witness, &[]).unwrap_err();
        assert!(err.is_resource_limit());
        assert_eq!(
            ScriptEngine::new().execute("LET a = 1 LET b = 2 LET c = 3 RETURN TRUE", &tx, &witness, &[]),
            Ok(ExecutionOutcome::Accepted)
        );
    }

    #[test]
    fn test_reply_carries_errors() {
        let engine = ScriptEngine::new();
        let tx = Transaction::default();
        let witness = Witness::default();
        let reply = engine.reply("RETURN SIGNEDBY()", &tx, &witness, &[]);
        assert!(!reply.status);
        assert!(reply.error.unwrap().starts_with("Parse error"));
        assert!(engine.reply("RETURN TRUE", &tx, &witness, &[]).status);
    }
}
