//! Binary encoding of values, transactions, witnesses and stored rows
//!
//! Lengths and counts are little-endian varints. Decoding accepts only the
//! exact bytes encoding would produce, so stored rows round-trip byte for byte.

use crate::error::{Result, ScriptError};
use crate::mmr::{MmrData, MmrProof, MmrProofChunk};
use crate::number::Number;
use crate::types::{CoinProof, Coin, ScriptProof, SignatureProof, StateVariable, Token, Transaction, Witness};
use crate::value::{Value, ValueType};
use serde::{Deserialize, Serialize};

pub trait Encode {
    fn encode_to(&self, out: &mut Vec<u8>);

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }
}

pub trait Decode: Sized {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self>;

    /// Decode a complete buffer; trailing bytes are an error
    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let value = Self::decode_from(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

/// Encode a variable-length integer
pub fn encode_varint(value: u64, out: &mut Vec<u8>) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn encode_bytes(data: &[u8], out: &mut Vec<u8>) {
    encode_varint(data.len() as u64, out);
    out.extend_from_slice(data);
}

pub fn encode_string(text: &str, out: &mut Vec<u8>) {
    encode_bytes(text.as_bytes(), out);
}

fn encode_list<T: Encode>(items: &[T], out: &mut Vec<u8>) {
    encode_varint(items.len() as u64, out);
    for item in items {
        item.encode_to(out);
    }
}

/// Cursor over encoded bytes
#[derive(Debug)]
pub struct Reader<'b> {
    bytes: &'b [u8],
    position: usize,
}

impl<'b> Reader<'b> {
    pub fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn take(&mut self, len: usize) -> Result<&'b [u8]> {
        if len > self.remaining() {
            return Err(ScriptError::Serialization(format!(
                "Need {} bytes at offset {} but only {} remain",
                len,
                self.position,
                self.remaining()
            )));
        }
        let bytes = self.bytes;
        let slice = &bytes[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ScriptError::Serialization(format!("Invalid boolean byte {}", other))),
        }
    }

    /// Read a varint, rejecting non-minimal encodings
    pub fn read_varint(&mut self) -> Result<u64> {
        let prefix = self.read_u8()?;
        let (value, minimum) = match prefix {
            0xfd => {
                let raw: [u8; 2] = self.take(2)?.try_into().map_err(|_| truncated())?;
                (u64::from(u16::from_le_bytes(raw)), 0xfd)
            }
            0xfe => {
                let raw: [u8; 4] = self.take(4)?.try_into().map_err(|_| truncated())?;
                (u64::from(u32::from_le_bytes(raw)), 0x1_0000)
            }
            0xff => {
                let raw: [u8; 8] = self.take(8)?.try_into().map_err(|_| truncated())?;
                (u64::from_le_bytes(raw), 0x1_0000_0000)
            }
            small => return Ok(u64::from(small)),
        };
        if value < minimum {
            return Err(ScriptError::Serialization(format!("Non-minimal varint {}", value)));
        }
        Ok(value)
    }

    /// Read a length that must fit in the remaining input
    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_varint()?;
        usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.remaining())
            .ok_or_else(|| ScriptError::Serialization(format!("Length {} exceeds input", len)))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|e| ScriptError::Serialization(e.to_string()))
    }

    fn read_list<T: Decode>(&mut self) -> Result<Vec<T>> {
        let count = self.read_len()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode_from(self)?);
        }
        Ok(items)
    }

    /// Fail if any input is left unread
    pub fn finish(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(ScriptError::Serialization(format!("{} trailing bytes", self.remaining())));
        }
        Ok(())
    }
}

fn truncated() -> ScriptError {
    ScriptError::Serialization("Truncated input".to_string())
}

impl Encode for Number {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_string(&self.to_string(), out);
    }
}

impl Decode for Number {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let text = reader.read_string()?;
        let number: Number = text
            .parse()
            .map_err(|e| ScriptError::Serialization(format!("{}", e)))?;
        if number.to_string() != text {
            return Err(ScriptError::Serialization(format!("Non-canonical number {}", text)));
        }
        Ok(number)
    }
}

impl Encode for Value {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.value_type().tag());
        match self {
            Value::Boolean(b) => out.push(u8::from(*b)),
            Value::Number(n) => n.encode_to(out),
            Value::Hex(data) => encode_bytes(data, out),
            Value::Script(text) => encode_string(text, out),
        }
    }
}

impl Decode for Value {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let tag = reader.read_u8()?;
        match ValueType::from_tag(tag) {
            Some(ValueType::Boolean) => Ok(Value::Boolean(reader.read_bool()?)),
            Some(ValueType::Number) => Ok(Value::Number(Number::decode_from(reader)?)),
            Some(ValueType::Hex) => Ok(Value::Hex(reader.read_bytes()?)),
            Some(ValueType::Script) => Ok(Value::Script(reader.read_string()?)),
            None => Err(ScriptError::Serialization(format!("Unknown value type {}", tag))),
        }
    }
}

impl Encode for StateVariable {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.port);
        self.value.encode_to(out);
    }
}

impl Decode for StateVariable {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let port = reader.read_u8()?;
        let value = Value::decode_from(reader)?;
        Ok(StateVariable { port, value })
    }
}

impl Encode for Token {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_bytes(&self.token_id, out);
        encode_string(&self.name, out);
        encode_string(&self.script, out);
        encode_varint(u64::from(self.scale), out);
        self.total.encode_to(out);
    }
}

impl Decode for Token {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let token_id = reader.read_bytes()?;
        let name = reader.read_string()?;
        let script = reader.read_string()?;
        let scale = u32::try_from(reader.read_varint()?)
            .map_err(|_| ScriptError::Serialization("Token scale too large".to_string()))?;
        let total = Number::decode_from(reader)?;
        Ok(Token { token_id, name, script, scale, total })
    }
}

impl Encode for Coin {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_bytes(&self.coin_id, out);
        encode_bytes(&self.address, out);
        self.amount.encode_to(out);
        encode_bytes(&self.token_id, out);
        match &self.token {
            Some(token) => {
                out.push(1);
                token.encode_to(out);
            }
            None => out.push(0),
        }
        out.push(u8::from(self.store_state));
        encode_list(&self.state, out);
        self.created.encode_to(out);
    }
}

impl Decode for Coin {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let coin_id = reader.read_bytes()?;
        let address = reader.read_bytes()?;
        let amount = Number::decode_from(reader)?;
        let token_id = reader.read_bytes()?;
        let token = if reader.read_bool()? {
            Some(Token::decode_from(reader)?)
        } else {
            None
        };
        let store_state = reader.read_bool()?;
        let state = reader.read_list()?;
        let created = Number::decode_from(reader)?;
        Ok(Coin { coin_id, address, amount, token_id, token, store_state, state, created })
    }
}

impl Encode for Transaction {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_list(&self.inputs, out);
        encode_list(&self.outputs, out);
        encode_list(&self.state, out);
        encode_bytes(&self.link_hash, out);
    }
}

impl Decode for Transaction {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Transaction {
            inputs: reader.read_list()?,
            outputs: reader.read_list()?,
            state: reader.read_list()?,
            link_hash: reader.read_bytes()?,
        })
    }
}

impl Encode for MmrData {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_bytes(&self.data, out);
        self.value.encode_to(out);
    }
}

impl Decode for MmrData {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let data = reader.read_bytes()?;
        let value = Number::decode_from(reader)?;
        Ok(MmrData { data, value })
    }
}

impl Encode for MmrProofChunk {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(u8::from(self.left));
        self.data.encode_to(out);
    }
}

impl Decode for MmrProofChunk {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let left = reader.read_bool()?;
        let data = MmrData::decode_from(reader)?;
        Ok(MmrProofChunk { left, data })
    }
}

impl Encode for MmrProof {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_list(&self.chunks, out);
    }
}

impl Decode for MmrProof {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(MmrProof { chunks: reader.read_list()? })
    }
}

impl Encode for SignatureProof {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_bytes(&self.public_key, out);
        encode_bytes(&self.signature, out);
    }
}

impl Decode for SignatureProof {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let public_key = reader.read_bytes()?;
        let signature = reader.read_bytes()?;
        Ok(SignatureProof { public_key, signature })
    }
}

impl Encode for CoinProof {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.coin.encode_to(out);
        self.proof.encode_to(out);
    }
}

impl Decode for CoinProof {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let coin = Coin::decode_from(reader)?;
        let proof = MmrProof::decode_from(reader)?;
        Ok(CoinProof { coin, proof })
    }
}

impl Encode for ScriptProof {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_string(&self.script, out);
        self.proof.encode_to(out);
    }
}

impl Decode for ScriptProof {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let script = reader.read_string()?;
        let proof = MmrProof::decode_from(reader)?;
        Ok(ScriptProof { script, proof })
    }
}

impl Encode for Witness {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_list(&self.signatures, out);
        encode_list(&self.coin_proofs, out);
        encode_list(&self.scripts, out);
    }
}

impl Decode for Witness {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Witness {
            signatures: reader.read_list()?,
            coin_proofs: reader.read_list()?,
            scripts: reader.read_list()?,
        })
    }
}

/// Stored transaction and witness keyed by an identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRow {
    pub id: String,
    pub transaction: Transaction,
    pub witness: Witness,
}

impl TxnRow {
    pub fn new(id: impl Into<String>, transaction: Transaction, witness: Witness) -> Self {
        Self { id: id.into(), transaction, witness }
    }
}

impl Encode for TxnRow {
    fn encode_to(&self, out: &mut Vec<u8>) {
        encode_string(&self.id, out);
        self.transaction.encode_to(out);
        self.witness.encode_to(out);
    }
}

impl Decode for TxnRow {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let id = reader.read_string()?;
        let transaction = Transaction::decode_from(reader)?;
        let witness = Witness::decode_from(reader)?;
        Ok(TxnRow { id, transaction, witness })
    }
}
