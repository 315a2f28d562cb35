//! State variable built-ins

use super::Params;
use crate::contract::Contract;
use crate::error::Result;
use crate::value::Value;

pub(super) fn state(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let port = p.port(0, contract)?;
    contract
        .state(port)
        .cloned()
        .ok_or_else(|| p.error(format!("no state variable at port {}", port)))
}

pub(super) fn prev_state(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let port = p.port(0, contract)?;
    contract
        .prev_state(port)
        .cloned()
        .ok_or_else(|| p.error(format!("no previous state variable at port {}", port)))
}

/// SAMESTATE(start, end): ports `start..=end` are unchanged
///
/// Values compare by their canonical text. A port set on only one side
/// is a change.
pub(super) fn same_state(p: &Params<'_>, contract: &mut Contract<'_>) -> Result<Value> {
    let start = p.number(0, contract)?;
    let end = p.number(1, contract)?;
    if start.is_negative() {
        return Err(p.error(format!("negative start port {}", start)));
    }
    if end < start {
        return Err(p.error(format!("end port {} before start port {}", end, start)));
    }
    let start = p.port_of(&start)?;
    let end = p.port_of(&end)?;

    for port in start..=end {
        let previous = contract.prev_state(port).map(Value::to_literal);
        let current = contract.state(port).map(Value::to_literal);
        if previous != current {
            contract.trace(|| format!("SAMESTATE differs at port {}", port));
            return Ok(Value::FALSE);
        }
    }
    Ok(Value::TRUE)
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{eval_with, num};
    use crate::types::{StateVariable, Transaction, Witness};
    use crate::value::Value;

    fn fixture() -> (Transaction, Vec<StateVariable>) {
        let tx = Transaction {
            state: vec![
                StateVariable::new(0, Value::Number(1i64.into())),
                StateVariable::new(1, Value::Hex(vec![0xab])),
                StateVariable::new(2, Value::Script("same".to_string())),
            ],
            ..Transaction::default()
        };
        let prev = vec![
            StateVariable::new(0, Value::Number(2i64.into())),
            StateVariable::new(1, Value::Hex(vec![0xab])),
            StateVariable::new(2, Value::Script("same".to_string())),
        ];
        (tx, prev)
    }

    #[test]
    fn test_state_and_prevstate() {
        let (tx, prev) = fixture();
        let witness = Witness::default();
        assert_eq!(eval_with("STATE(0)", &tx, &witness, &prev).unwrap(), num(1));
        assert_eq!(eval_with("PREVSTATE(0)", &tx, &witness, &prev).unwrap(), num(2));
        assert!(eval_with("STATE(9)", &tx, &witness, &prev).is_err());
        assert!(eval_with("PREVSTATE(256)", &tx, &witness, &prev).is_err());
        assert!(eval_with("STATE(-1)", &tx, &witness, &prev).is_err());
    }

    #[test]
    fn test_samestate_ranges() {
        let (tx, prev) = fixture();
        let witness = Witness::default();
        assert_eq!(eval_with("SAMESTATE(2 2)", &tx, &witness, &prev).unwrap(), Value::TRUE);
        assert_eq!(eval_with("SAMESTATE(1 2)", &tx, &witness, &prev).unwrap(), Value::TRUE);
        assert_eq!(eval_with("SAMESTATE(0 2)", &tx, &witness, &prev).unwrap(), Value::FALSE);
        assert!(eval_with("SAMESTATE(0 -1)", &tx, &witness, &prev).is_err());
        assert!(eval_with("SAMESTATE(-1 2)", &tx, &witness, &prev).is_err());
        assert!(eval_with("SAMESTATE(2 1)", &tx, &witness, &prev).is_err());
    }

    #[test]
    fn test_samestate_missing_port() {
        let (tx, mut prev) = fixture();
        prev.push(StateVariable::new(3, Value::TRUE));
        let witness = Witness::default();
        assert_eq!(eval_with("SAMESTATE(3 3)", &tx, &witness, &prev).unwrap(), Value::FALSE);
        assert_eq!(eval_with("SAMESTATE(4 5)", &tx, &witness, &prev).unwrap(), Value::TRUE);
    }
}
