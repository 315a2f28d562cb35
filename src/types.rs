//! Transaction, coin and witness types consumed by contracts

use crate::address::Address;
use crate::config::ScriptLimits;
use crate::constants::NATIVE_TOKEN_ID;
use crate::crypto::sha3_256;
use crate::error::{Result, ScriptError};
use crate::mmr::{MmrData, MmrProof};
use crate::number::Number;
use crate::serialization::Encode;
use crate::value::{format_hex, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Token definition: amounts are multiplied by `10^scale`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: Vec<u8>,
    pub name: String,
    pub script: String,
    pub scale: u32,
    pub total: Number,
}

impl Token {
    pub fn scale_factor(&self) -> Result<Number> {
        Ok(Number::from(10i64).pow(&Number::from(u64::from(self.scale)))?)
    }
}

/// State variable: a value stored in a numbered port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVariable {
    pub port: u8,
    pub value: Value,
}

impl StateVariable {
    pub fn new(port: u8, value: Value) -> Self {
        Self { port, value }
    }
}

/// A spendable output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub coin_id: Vec<u8>,
    pub address: Vec<u8>,
    pub amount: Number,
    pub token_id: Vec<u8>,
    pub token: Option<Token>,
    pub store_state: bool,
    pub state: Vec<StateVariable>,
    pub created: Number,
}

impl Coin {
    /// Native coin with no state
    pub fn new(coin_id: Vec<u8>, address: Vec<u8>, amount: Number) -> Self {
        Self {
            coin_id,
            address,
            amount,
            token_id: NATIVE_TOKEN_ID.to_vec(),
            token: None,
            store_state: false,
            state: Vec::new(),
            created: Number::zero(),
        }
    }

    /// Coin of a non-native token
    pub fn with_token(mut self, token: Token) -> Self {
        self.token_id = token.token_id.clone();
        self.token = Some(token);
        self
    }

    pub fn is_native(&self) -> bool {
        self.token_id == NATIVE_TOKEN_ID
    }

    /// Amount in token units; native coins are not scaled
    pub fn token_amount(&self) -> Result<Number> {
        if self.is_native() {
            return Ok(self.amount.clone());
        }
        let token = self.token.as_ref().ok_or_else(|| {
            ScriptError::Execution(format!("Token details missing for {}", format_hex(&self.token_id)))
        })?;
        Ok(self.amount.mul(&token.scale_factor()?)?)
    }
}

/// Transaction under validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<Coin>,
    pub outputs: Vec<Coin>,
    pub state: Vec<StateVariable>,
    pub link_hash: Vec<u8>,
}

impl Transaction {
    /// Hash that witness signatures commit to
    pub fn signing_hash(&self) -> Hash {
        sha3_256(&self.encode())
    }

    /// State variables keyed by port; later entries win
    pub fn state_map(&self) -> BTreeMap<u8, Value> {
        state_map(&self.state)
    }
}

pub(crate) fn state_map(state: &[StateVariable]) -> BTreeMap<u8, Value> {
    state.iter().map(|sv| (sv.port, sv.value.clone())).collect()
}

/// A public key and its signature over the transaction signing hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureProof {
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Input coin with its inclusion proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinProof {
    pub coin: Coin,
    pub proof: MmrProof,
}

/// Script revealed in the witness; the proof root is the script's address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptProof {
    pub script: String,
    pub proof: MmrProof,
}

impl ScriptProof {
    /// Script proved as a plain address
    pub fn new(script: impl Into<String>) -> Self {
        Self { script: script.into(), proof: MmrProof::default() }
    }

    /// Root reached from the cleaned script's leaf
    pub fn root(&self, limits: &ScriptLimits) -> Result<Vec<u8>> {
        let address = Address::from_script(&self.script, limits)?;
        let leaf = MmrData::new(address.hash().to_vec(), Number::zero());
        Ok(self.proof.calculate_root(leaf)?.data)
    }
}

/// Signatures and proofs accompanying a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub signatures: Vec<SignatureProof>,
    pub coin_proofs: Vec<CoinProof>,
    pub scripts: Vec<ScriptProof>,
}

impl Witness {
    pub fn add_signature(&mut self, public_key: Vec<u8>, signature: Vec<u8>) {
        self.signatures.push(SignatureProof { public_key, signature });
    }

    pub fn add_script(&mut self, proof: ScriptProof) {
        self.scripts.push(proof);
    }

    /// Signatures made with `public_key`
    pub fn signatures_for<'w>(&'w self, public_key: &'w [u8]) -> impl Iterator<Item = &'w SignatureProof> + 'w {
        self.signatures.iter().filter(move |sig| sig.public_key == public_key)
    }

    /// First witness script whose proof root equals `root`
    ///
    /// Scripts whose root cannot be computed never match.
    pub fn script_for_root(&self, root: &[u8], limits: &ScriptLimits) -> Option<&ScriptProof> {
        self.scripts.iter().find(|proof| proof.root(limits).map_or(false, |r| r == root))
    }

    /// Number of inputs, counting coins carried only by a coin proof
    pub fn input_count(&self, transaction: &Transaction) -> usize {
        transaction.inputs.len().max(self.coin_proofs.len())
    }

    /// Input coin `index`, taken from its coin proof when the witness has one
    ///
    /// A transaction input listed beside a proof must carry the proved coin id.
    pub fn input_coin<'c>(&'c self, transaction: &'c Transaction, index: usize) -> Result<Option<&'c Coin>> {
        let listed = transaction.inputs.get(index);
        let Some(proof) = self.coin_proofs.get(index) else {
            return Ok(listed);
        };
        match listed {
            Some(coin) if coin.coin_id != proof.coin.coin_id => Err(ScriptError::Execution(format!(
                "Input {} coin {} does not match proved coin {}",
                index,
                format_hex(&coin.coin_id),
                format_hex(&proof.coin.coin_id)
            ))),
            _ => Ok(Some(&proof.coin)),
        }
    }
}

/// Final result of a contract that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionOutcome {
    Accepted,
    Rejected,
}

/// Structured reply for the command layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReply {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl ScriptReply {
    pub fn from_outcome(outcome: &Result<ExecutionOutcome>, trace: &[String]) -> Self {
        let (status, error) = match outcome {
            Ok(ExecutionOutcome::Accepted) => (true, None),
            Ok(ExecutionOutcome::Rejected) => (false, Some("Contract returned FALSE".to_string())),
            Err(e) => (false, Some(e.to_string())),
        };
        Self { status, error, trace: trace.to_vec() }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ScriptError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(scale: u32) -> Token {
        Token {
            token_id: vec![0xab],
            name: "test".to_string(),
            script: "RETURN TRUE".to_string(),
            scale,
            total: Number::from(1_000_000i64),
        }
    }

    #[test]
    fn test_token_amount_scaling() {
        let native = Coin::new(vec![1], vec![2], Number::from(10i64));
        assert_eq!(native.token_amount().unwrap(), Number::from(10i64));

        let scaled = Coin::new(vec![1], vec![2], Number::from(10i64)).with_token(token(2));
        assert_eq!(scaled.token_amount().unwrap(), Number::from(1000i64));

        let mut missing = scaled.clone();
        missing.token = None;
        assert!(missing.token_amount().is_err());
    }

    #[test]
    fn test_signing_hash_changes_with_outputs() {
        let mut tx = Transaction::default();
        let before = tx.signing_hash();
        tx.outputs.push(Coin::new(vec![], vec![0xaa], Number::one()));
        assert_ne!(before, tx.signing_hash());
    }

    #[test]
    fn test_state_map_last_entry_wins() {
        let tx = Transaction {
            state: vec![
                StateVariable::new(1, Value::TRUE),
                StateVariable::new(1, Value::FALSE),
            ],
            ..Transaction::default()
        };
        assert_eq!(tx.state_map().get(&1), Some(&Value::FALSE));
    }

    #[test]
    fn test_script_proof_root_is_address() {
        let limits = ScriptLimits::default();
        let proof = ScriptProof::new("return  true");
        let address = Address::from_script("RETURN TRUE", &limits).unwrap();
        assert_eq!(proof.root(&limits).unwrap(), address.hash().to_vec());

        let mut witness = Witness::default();
        witness.add_script(ScriptProof::new("RETURN ("));
        witness.add_script(proof);
        assert_eq!(witness.script_for_root(address.hash(), &limits).map(|p| p.script.as_str()), Some("return  true"));
        assert!(witness.script_for_root(&[0u8; 32], &limits).is_none());
    }

    #[test]
    fn test_input_coin_prefers_proof() {
        let listed = Coin::new(vec![0x42], vec![0xaa], Number::from(5i64));
        let mut proved = listed.clone();
        proved.created = Number::from(9i64);
        let mut witness = Witness::default();
        witness.coin_proofs.push(CoinProof { coin: proved.clone(), proof: MmrProof::default() });

        let empty = Transaction::default();
        assert_eq!(witness.input_count(&empty), 1);
        assert_eq!(witness.input_coin(&empty, 0).unwrap(), Some(&proved));
        assert_eq!(witness.input_coin(&empty, 1).unwrap(), None);

        let tx = Transaction { inputs: vec![listed.clone(), listed.clone()], ..Transaction::default() };
        assert_eq!(witness.input_count(&tx), 2);
        assert_eq!(witness.input_coin(&tx, 0).unwrap(), Some(&proved));
        assert_eq!(witness.input_coin(&tx, 1).unwrap(), Some(&listed));

        let other = Transaction { inputs: vec![Coin::new(vec![0x43], vec![0xaa], Number::from(5i64))], ..Transaction::default() };
        assert!(witness.input_coin(&other, 0).is_err());
    }

    #[test]
    fn test_reply_json() {
        let reply = ScriptReply::from_outcome(&Err(ScriptError::Parse("bad".to_string())), &[]);
        assert!(!reply.status);
        assert_eq!(reply.to_json().unwrap(), r#"{"status":false,"error":"Parse error: bad"}"#);

        let reply = ScriptReply::from_outcome(&Ok(ExecutionOutcome::Accepted), &["RETURN true".to_string()]);
        assert_eq!(reply.to_json().unwrap(), r#"{"status":true,"trace":["RETURN true"]}"#);
    }
}
