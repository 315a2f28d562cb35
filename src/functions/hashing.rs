//! Hash built-ins

use super::Params;
use crate::contract::Contract;
use crate::crypto::{sha2_256, sha3_256};
use crate::error::Result;
use crate::mmr::{MmrData, MmrProof};
use crate::serialization::Decode;
use crate::value::Value;

pub(super) fn sha2(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.value(0, contract)?.into_bytes(p.name())?;
    Ok(Value::Hex(sha2_256(&data).to_vec()))
}

pub(super) fn sha3(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.value(0, contract)?.into_bytes(p.name())?;
    Ok(Value::Hex(sha3_256(&data).to_vec()))
}

/// PROOF(data, sum, root, rootsum, chain): does the encoded proof `chain`
/// lead from the leaf of `data` to the given root?
pub(super) fn proof(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let data = p.value(0, contract)?.into_bytes(p.name())?;
    let sum = p.number(1, contract)?;
    let root = MmrData::new(p.hex(2, contract)?, p.number(3, contract)?);
    let chain = p.hex(4, contract)?;

    let proof = MmrProof::decode(&chain).map_err(|e| p.error(format!("invalid proof: {}", e)))?;
    let calculated = proof.calculate_root(MmrData::leaf(&data, sum))?;
    Ok(Value::Boolean(calculated == root))
}

#[cfg(test)]
mod tests {
    use crate::crypto::sha3_256;
    use crate::functions::test_support::{eval, hex};
    use crate::mmr::{MmrData, MmrProof};
    use crate::number::Number;
    use crate::serialization::Encode;
    use crate::value::{format_hex, Value};

    #[test]
    fn test_sha3_of_hex_and_script() {
        let expected = Value::Hex(sha3_256(b"abc").to_vec());
        assert_eq!(eval("SHA3([abc])").unwrap(), expected);
        assert_eq!(eval("SHA3(0x616263)").unwrap(), expected);
        assert!(eval("SHA3(1)").is_err());
    }

    #[test]
    fn test_sha2_vector() {
        assert_eq!(
            eval("SHA2([abc])").unwrap(),
            hex("0xBA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD")
        );
    }

    #[test]
    fn test_proof() {
        let leaves: Vec<MmrData> = (0u8..3)
            .map(|i| MmrData::leaf(&[i], Number::from(u64::from(i) * 10)))
            .collect();
        let (root, proof) = MmrProof::build(&leaves, 2).unwrap();
        let chain = format_hex(&proof.encode());
        let root_hex = format_hex(&root.data);

        let script = format!("PROOF(0x02 20 {} {} {})", root_hex, root.value, chain);
        assert_eq!(eval(&script).unwrap(), Value::TRUE);
        let script = format!("PROOF(0x02 21 {} {} {})", root_hex, root.value, chain);
        assert_eq!(eval(&script).unwrap(), Value::FALSE);
        let script = format!("PROOF(0x02 20 {} {} 0xFF)", root_hex, root.value);
        assert!(eval(&script).is_err());
    }
}
