//! Signature built-ins
//!
//! SIGNEDBY and MULTISIG check witness signatures over the transaction
//! signing hash. CHECKSIG checks a signature over caller-supplied data.

use super::Params;
use crate::contract::Contract;
use crate::error::Result;
use crate::value::Value;

/// Does the witness hold a valid signature by `public_key`?
fn witness_signed(contract: &mut Contract<'_>, public_key: &[u8]) -> bool {
    let hash = contract.signing_hash();
    let verifier = contract.verifier();
    contract
        .witness()
        .signatures_for(public_key)
        .any(|sig| verifier.verify(&hash, &sig.signature, public_key))
}

pub(super) fn signed_by(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let public_key = p.hex(0, contract)?;
    let signed = witness_signed(contract, &public_key);
    contract.trace(|| format!("SIGNEDBY {} = {}", crate::value::format_hex(&public_key), signed));
    Ok(Value::Boolean(signed))
}

/// MULTISIG(n, key1, .., keyk): at least `n` keys signed
pub(super) fn multi_sig(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let required = p.number(0, contract)?;
    if required.is_negative() {
        return Err(p.error(format!("negative signature count {}", required)));
    }
    let required = required.to_index().map_err(|e| p.error(e))?;

    let mut found = 0;
    for i in 1..p.len() {
        if found >= required {
            break;
        }
        let public_key = p.hex(i, contract)?;
        if witness_signed(contract, &public_key) {
            found += 1;
        }
    }
    Ok(Value::Boolean(found >= required))
}

/// CHECKSIG(public_key, data, signature)
pub(super) fn check_sig(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let public_key = p.hex(0, contract)?;
    let data = p.hex(1, contract)?;
    let signature = p.hex(2, contract)?;
    if public_key.is_empty() || signature.is_empty() {
        return Err(p.error("public key and signature must not be empty"));
    }
    Ok(Value::Boolean(contract.verifier().verify(&data, &signature, &public_key)))
}
