//! Contract execution context
//!
//! A [`Contract`] binds one script to the transaction, witness and previous
//! state it validates. It is executed once: parsing, running and the final
//! outcome are tracked by [`ContractPhase`].

use crate::config::ScriptLimits;
use crate::constants::FUNCTION_RETURN_VARIABLE;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use crate::error::{Result, ScriptError};
use crate::number::Number;
use crate::parser::parse_script;
use crate::statement::run_nested;
use crate::types::{state_map, ExecutionOutcome, Hash, StateVariable, Transaction, Witness};
use crate::value::{Value, ValueType};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static DEFAULT_VERIFIER: Secp256k1Verifier = Secp256k1Verifier;

/// Lifecycle of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractPhase {
    Constructed,
    Parsing,
    Executing,
    Accepted,
    Rejected,
    ParseFailed,
}

/// Execution context for one script against one transaction
pub struct Contract<'a> {
    script: String,
    transaction: &'a Transaction,
    witness: &'a Witness,
    state: BTreeMap<u8, Value>,
    prev_state: BTreeMap<u8, Value>,
    globals: BTreeMap<String, Value>,
    variables: BTreeMap<String, Value>,
    limits: ScriptLimits,
    verifier: &'a dyn SignatureVerifier,
    instructions: usize,
    stack_depth: usize,
    trace_enabled: bool,
    trace_log: Vec<String>,
    phase: ContractPhase,
    result: Option<bool>,
    signing_hash: Option<Hash>,
}

impl<'a> Contract<'a> {
    /// Bind `script` to a transaction, its witness and the spent coin's state
    pub fn new(script: &str, transaction: &'a Transaction, witness: &'a Witness, prev_state: &[StateVariable]) -> Self {
        Self {
            script: script.to_string(),
            transaction,
            witness,
            state: transaction.state_map(),
            prev_state: state_map(prev_state),
            globals: BTreeMap::new(),
            variables: BTreeMap::new(),
            limits: ScriptLimits::default(),
            verifier: &DEFAULT_VERIFIER,
            instructions: 0,
            stack_depth: 0,
            trace_enabled: false,
            trace_log: Vec::new(),
            phase: ContractPhase::Constructed,
            result: None,
            signing_hash: None,
        }
    }

    pub fn with_limits(mut self, limits: ScriptLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the signature check used by SIGNEDBY, MULTISIG and CHECKSIG
    pub fn with_verifier(mut self, verifier: &'a dyn SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace_enabled = enabled;
        self
    }

    /// Bind a global; the name is stored as `@NAME`
    pub fn set_global(&mut self, name: &str, value: Value) {
        let name = name.trim_start_matches('@').to_ascii_uppercase();
        self.globals.insert(format!("@{}", name), value);
    }

    /// Bind the globals describing input `input` of the transaction at `block`
    pub fn set_standard_globals(&mut self, input: usize, block: Number) -> Result<()> {
        let (transaction, witness) = (self.transaction, self.witness);
        let total_inputs = witness.input_count(transaction);
        let coin = witness.input_coin(transaction, input)?.ok_or_else(|| {
            ScriptError::Execution(format!("Input {} out of range for {} inputs", input, total_inputs))
        })?;

        let coin_age = block.sub(&coin.created)?;
        let script = self.script.clone();

        let globals = [
            ("BLOCK", Value::Number(block)),
            ("INPUT", Value::Number(Number::from(input))),
            ("AMOUNT", Value::Number(coin.amount.clone())),
            ("ADDRESS", Value::Hex(coin.address.clone())),
            ("TOKENID", Value::Hex(coin.token_id.clone())),
            ("COINID", Value::Hex(coin.coin_id.clone())),
            ("SCRIPT", Value::Script(script)),
            ("TOTIN", Value::Number(Number::from(total_inputs))),
            ("TOTOUT", Value::Number(Number::from(transaction.outputs.len()))),
            ("CREATED", Value::Number(coin.created.clone())),
            ("COINAGE", Value::Number(coin_age)),
        ];
        for (name, value) in globals {
            self.set_global(name, value);
        }
        debug!("Globals set for input {} of {}", input, total_inputs);
        Ok(())
    }

    /// Parse and run the script
    ///
    /// Parse errors leave the contract in [`ContractPhase::ParseFailed`];
    /// execution errors and a missing or false `RETURN` leave it rejected.
    pub fn execute(&mut self) -> Result<ExecutionOutcome> {
        if self.phase != ContractPhase::Constructed {
            return Err(ScriptError::Execution(format!("Contract already executed ({:?})", self.phase)));
        }

        // 1. Parse
        self.phase = ContractPhase::Parsing;
        let script = self.script.clone();
        self.trace(|| format!("Script: {}", script));
        let block = match parse_script(&self.script, &self.limits) {
            Ok(block) => block,
            Err(e) => {
                self.phase = ContractPhase::ParseFailed;
                debug!("Contract parse failed: {}", e);
                return Err(e);
            }
        };

        // 2. Run
        self.phase = ContractPhase::Executing;
        if let Err(e) = block.run(self) {
            self.phase = ContractPhase::Rejected;
            if e.is_resource_limit() {
                warn!("Contract hit a resource limit after {} instructions: {}", self.instructions, e);
            } else {
                debug!("Contract failed after {} instructions: {}", self.instructions, e);
            }
            return Err(e);
        }

        // 3. Outcome
        let outcome = if self.result == Some(true) {
            ExecutionOutcome::Accepted
        } else {
            if self.result.is_none() {
                self.trace(|| "No RETURN statement".to_string());
            }
            ExecutionOutcome::Rejected
        };
        self.phase = match outcome {
            ExecutionOutcome::Accepted => ContractPhase::Accepted,
            ExecutionOutcome::Rejected => ContractPhase::Rejected,
        };
        debug!("Contract {:?} after {} instructions", outcome, self.instructions);
        Ok(outcome)
    }

    pub fn phase(&self) -> ContractPhase {
        self.phase
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn instructions(&self) -> usize {
        self.instructions
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_depth
    }

    pub fn trace_log(&self) -> &[String] {
        &self.trace_log
    }

    /// Value of the first `RETURN` reached, or FALSE after a failed `ASSERT`
    pub fn result(&self) -> Option<bool> {
        self.result
    }

    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn set_result(&mut self, result: bool) {
        self.result = Some(result);
    }

    /// Charge `cost` instructions against the budget
    pub fn increment_instructions(&mut self, cost: usize) -> Result<()> {
        self.instructions += cost;
        if self.instructions > self.limits.max_instructions {
            return Err(ScriptError::ResourceLimit(format!(
                "Instruction count {} exceeds maximum {}",
                self.instructions, self.limits.max_instructions
            )));
        }
        Ok(())
    }

    pub fn enter_stack(&mut self) -> Result<()> {
        self.stack_depth += 1;
        if self.stack_depth > self.limits.max_stack_depth {
            let depth = self.stack_depth;
            self.stack_depth -= 1;
            return Err(ScriptError::ResourceLimit(format!(
                "Stack depth {} exceeds maximum {}",
                depth, self.limits.max_stack_depth
            )));
        }
        Ok(())
    }

    pub fn exit_stack(&mut self) {
        self.stack_depth = self.stack_depth.saturating_sub(1);
    }

    pub fn variable(&self, name: &str) -> Result<Value> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::Execution(format!("Variable not defined: {}", name)))
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn global(&self, name: &str) -> Result<Value> {
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::Execution(format!("Global not set: {}", name)))
    }

    /// Current state variable at `port`
    pub fn state(&self, port: u8) -> Option<&Value> {
        self.state.get(&port)
    }

    /// State variable at `port` of the coin being spent
    pub fn prev_state(&self, port: u8) -> Option<&Value> {
        self.prev_state.get(&port)
    }

    pub fn transaction(&self) -> &'a Transaction {
        self.transaction
    }

    pub fn witness(&self) -> &'a Witness {
        self.witness
    }

    pub fn verifier(&self) -> &'a dyn SignatureVerifier {
        self.verifier
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }

    /// Fail when a Hex or Script value is larger than the data limit
    pub fn check_data_size(&self, value: &Value) -> Result<()> {
        if !matches!(value.value_type(), ValueType::Hex | ValueType::Script) {
            return Ok(());
        }
        if value.data_len() > self.limits.max_data_size {
            return Err(ScriptError::ResourceLimit(format!(
                "Value of {} bytes exceeds maximum {}",
                value.data_len(),
                self.limits.max_data_size
            )));
        }
        Ok(())
    }

    /// Append a line to the trace log when tracing is enabled
    pub fn trace(&mut self, line: impl FnOnce() -> String) {
        if self.trace_enabled {
            let line = line();
            trace!("{}", line);
            self.trace_log.push(line);
        }
    }

    /// Hash the witness signatures commit to, computed once
    pub fn signing_hash(&mut self) -> Hash {
        if let Some(hash) = self.signing_hash {
            return hash;
        }
        let hash = self.transaction.signing_hash();
        self.signing_hash = Some(hash);
        hash
    }

    /// Run a FUNCTION body in this contract and collect `returnvalue`
    pub(crate) fn run_function(&mut self, script: &str) -> Result<Value> {
        self.variables.remove(FUNCTION_RETURN_VARIABLE);
        run_nested(script, self)?;
        Ok(self
            .variables
            .get(FUNCTION_RETURN_VARIABLE)
            .cloned()
            .unwrap_or(Value::TRUE))
    }
}
