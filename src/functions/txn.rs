//! Transaction introspection built-ins
//!
//! Amounts of non-native coins are reported in token units, scaled by the
//! token's factor.

use super::{Function, Params};
use crate::contract::Contract;
use crate::error::Result;
use crate::number::Number;
use crate::types::Coin;
use crate::value::{format_hex, Value};

fn output_at<'c>(p: &Params<'_>, coins: &'c [Coin], index: usize) -> Result<&'c Coin> {
    coins
        .get(index)
        .ok_or_else(|| p.error(format!("Output {} out of range for {} coins", index, coins.len())))
}

fn coin_field(function: Function, coin: &Coin) -> Result<Value> {
    let value = match function {
        Function::GetInAddr | Function::GetOutAddr => Value::Hex(coin.address.clone()),
        Function::GetInAmt | Function::GetOutAmt => Value::Number(coin.token_amount()?),
        Function::GetInId => Value::Hex(coin.coin_id.clone()),
        Function::GetOutKeepState => Value::Boolean(coin.store_state),
        _ => Value::Hex(coin.token_id.clone()),
    };
    Ok(value)
}

/// Input coin `index` as resolved through the witness coin proofs
fn input_at<'c>(p: &Params<'_>, contract: &Contract<'c>, index: usize) -> Result<&'c Coin> {
    let (transaction, witness) = (contract.transaction(), contract.witness());
    witness.input_coin(transaction, index)?.ok_or_else(|| {
        p.error(format!("Input {} out of range for {} coins", index, witness.input_count(transaction)))
    })
}

pub(super) fn input_field(function: Function, p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let index = p.index(0, contract)?;
    let coin = input_at(p, contract, index)?;
    coin_field(function, coin)
}

pub(super) fn output_field(function: Function, p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let index = p.index(0, contract)?;
    let coin = output_at(p, &contract.transaction().outputs, index)?;
    coin_field(function, coin)
}

/// Address, exact amount and token of a coin match
fn coin_matches(coin: &Coin, address: &[u8], amount: &Number, token_id: &[u8]) -> Result<bool> {
    Ok(coin.address == address && coin.token_id == token_id && coin.token_amount()? == *amount)
}

/// VERIFYIN(index, address, amount, tokenid)
pub(super) fn verify_in(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let index = p.index(0, contract)?;
    let address = p.hex(1, contract)?;
    let amount = p.number(2, contract)?;
    let token_id = p.hex(3, contract)?;
    let coin = input_at(p, contract, index)?;
    Ok(Value::Boolean(coin_matches(coin, &address, &amount, &token_id)?))
}

/// VERIFYOUT(index, address, amount, tokenid [, keepstate])
pub(super) fn verify_out(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let index = p.index(0, contract)?;
    let address = p.hex(1, contract)?;
    let amount = p.number(2, contract)?;
    let token_id = p.hex(3, contract)?;
    let keep_state = if p.len() == 5 { Some(p.boolean(4, contract)?) } else { None };

    let coin = output_at(p, &contract.transaction().outputs, index)?;
    let state_ok = keep_state.map_or(true, |keep| coin.store_state == keep);
    let verified = state_ok && coin_matches(coin, &address, &amount, &token_id)?;
    if !verified {
        let found = format!(
            "address {} amount {} token {} keepstate {}",
            format_hex(&coin.address),
            coin.token_amount().map(|n| n.to_string()).unwrap_or_default(),
            format_hex(&coin.token_id),
            coin.store_state
        );
        contract.trace(|| format!("VERIFYOUT failed at output {}: found {}", index, found));
    }
    Ok(Value::Boolean(verified))
}

fn sum_matching<'c>(coins: impl IntoIterator<Item = &'c Coin>, token_id: &[u8]) -> Result<Number> {
    let mut total = Number::zero();
    for coin in coins.into_iter().filter(|coin| coin.token_id == token_id) {
        total = total.add(&coin.token_amount()?)?;
    }
    Ok(total)
}

pub(super) fn sum_inputs(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let token_id = p.hex(0, contract)?;
    let (transaction, witness) = (contract.transaction(), contract.witness());
    let mut inputs = Vec::with_capacity(witness.input_count(transaction));
    for index in 0..witness.input_count(transaction) {
        inputs.extend(witness.input_coin(transaction, index)?);
    }
    Ok(Value::Number(sum_matching(inputs, &token_id)?))
}

pub(super) fn sum_outputs(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let token_id = p.hex(0, contract)?;
    Ok(Value::Number(sum_matching(&contract.transaction().outputs, &token_id)?))
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{eval_with, hex, num};
    use crate::number::Number;
    use crate::mmr::MmrProof;
    use crate::types::{Coin, CoinProof, Token, Transaction, Witness};
    use crate::value::Value;

    fn token() -> Token {
        Token {
            token_id: vec![0xcc; 32],
            name: "points".to_string(),
            script: "RETURN TRUE".to_string(),
            scale: 2,
            total: Number::from(1_000_000i64),
        }
    }

    fn transaction() -> Transaction {
        let mut kept = Coin::new(vec![0x02], vec![0xbb], Number::from(7i64));
        kept.store_state = true;
        Transaction {
            inputs: vec![
                Coin::new(vec![0x01], vec![0xaa], Number::from(20i64)),
                Coin::new(vec![0x03], vec![0xaa], Number::from(3i64)).with_token(token()),
            ],
            outputs: vec![
                Coin::new(vec![], vec![0xbb], Number::from(5i64)),
                kept,
                Coin::new(vec![], vec![0xdd], Number::from(10i64)).with_token(token()),
            ],
            ..Transaction::default()
        }
    }

    fn eval(expression: &str) -> crate::error::Result<Value> {
        eval_with(expression, &transaction(), &Witness::default(), &[])
    }

    #[test]
    fn test_input_fields() {
        assert_eq!(eval("GETINADDR(0)").unwrap(), hex("0xAA"));
        assert_eq!(eval("GETINAMT(0)").unwrap(), num(20));
        assert_eq!(eval("GETINAMT(1)").unwrap(), num(300));
        assert_eq!(eval("GETINID(1)").unwrap(), hex("0x03"));
        assert_eq!(eval("GETINTOK(0)").unwrap(), hex("0x00"));
        assert!(eval("GETINID(2)").is_err());
        assert!(eval("GETINID(-1)").is_err());
    }

    #[test]
    fn test_output_fields() {
        assert_eq!(eval("GETOUTADDR(2)").unwrap(), hex("0xDD"));
        assert_eq!(eval("GETOUTAMT(2)").unwrap(), num(1000));
        assert_eq!(eval("GETOUTTOK(2)").unwrap(), Value::Hex(vec![0xcc; 32]));
        assert_eq!(eval("GETOUTKEEPSTATE(1)").unwrap(), Value::TRUE);
        assert!(eval("GETOUTTOK(3)").is_err());
    }

    #[test]
    fn test_sums() {
        assert_eq!(eval("SUMOUTPUTS(0x00)").unwrap(), num(12));
        let script = format!("SUMOUTPUTS({})", crate::value::format_hex(&[0xcc; 32]));
        assert_eq!(eval(&script).unwrap(), num(1000));
        assert_eq!(eval("SUMINPUTS(0x00)").unwrap(), num(20));
        assert_eq!(eval("SUMINPUTS(0xEE)").unwrap(), num(0));
    }

    #[test]
    fn test_verify() {
        assert_eq!(eval("VERIFYOUT(0 0xBB 5 0x00)").unwrap(), Value::TRUE);
        assert_eq!(eval("VERIFYOUT(0 0xBB 6 0x00)").unwrap(), Value::FALSE);
        assert_eq!(eval("VERIFYOUT(1 0xBB 7 0x00 TRUE)").unwrap(), Value::TRUE);
        assert_eq!(eval("VERIFYOUT(1 0xBB 7 0x00 FALSE)").unwrap(), Value::FALSE);
        assert_eq!(eval("VERIFYIN(0 0xAA 20 0x00)").unwrap(), Value::TRUE);
        assert_eq!(eval("VERIFYIN(0 0xAA 20 0x01)").unwrap(), Value::FALSE);
        assert!(eval("VERIFYIN(5 0xAA 20 0x00)").is_err());
    }

    #[test]
    fn test_inputs_resolve_through_coin_proofs() {
        let proved = Coin::new(vec![0x42], vec![0xee], Number::from(9i64));
        let mut witness = Witness::default();
        witness.coin_proofs.push(CoinProof { coin: proved.clone(), proof: MmrProof::default() });

        let empty = Transaction::default();
        assert_eq!(eval_with("GETINID(0)", &empty, &witness, &[]).unwrap(), hex("0x42"));
        assert_eq!(eval_with("GETINADDR(0)", &empty, &witness, &[]).unwrap(), hex("0xEE"));
        assert_eq!(eval_with("VERIFYIN(0 0xEE 9 0x00)", &empty, &witness, &[]).unwrap(), Value::TRUE);
        assert_eq!(eval_with("SUMINPUTS(0x00)", &empty, &witness, &[]).unwrap(), num(9));
        assert!(eval_with("GETINID(1)", &empty, &witness, &[]).is_err());

        // Listed inputs beyond the proofs still resolve; a conflicting coin id fails
        let listed = Transaction { inputs: vec![proved.clone(), transaction().inputs[0].clone()], ..Transaction::default() };
        assert_eq!(eval_with("SUMINPUTS(0x00)", &listed, &witness, &[]).unwrap(), num(29));
        assert!(eval_with("GETINAMT(0)", &transaction(), &witness, &[]).is_err());
    }
}
