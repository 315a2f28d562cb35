//! Statements and their execution

use crate::contract::Contract;
use crate::error::{Result, ScriptError};
use crate::expression::Expression;
use crate::functions::composite_key;
use crate::parser::parse_script_at;
use crate::value::format_hex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Let { name: String, value: Expression },
    LetArray { keys: Vec<Expression>, value: Expression },
    If { branches: Vec<(Expression, StatementBlock)>, otherwise: Option<StatementBlock> },
    While { condition: Expression, body: StatementBlock },
    Assert(Expression),
    Return(Expression),
    Exec(Expression),
    Mast(Expression),
}

/// Ordered list of statements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementBlock {
    statements: Vec<Statement>,
}

impl StatementBlock {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Run statements in order until one ends the contract
    pub fn run(&self, contract: &mut Contract<'_>) -> Result<()> {
        for statement in &self.statements {
            if contract.is_finished() {
                break;
            }
            contract.increment_instructions(1)?;
            statement.execute(contract)?;
        }
        Ok(())
    }
}

impl Statement {
    pub fn execute(&self, contract: &mut Contract<'_>) -> Result<()> {
        match self {
            Statement::Let { name, value } => {
                let value = value.evaluate(contract)?;
                contract.trace(|| format!("LET {} = {}", name, value.to_literal()));
                contract.set_variable(name, value);
            }
            Statement::LetArray { keys, value } => {
                let mut key_values = Vec::with_capacity(keys.len());
                for key in keys {
                    key_values.push(key.evaluate(contract)?);
                }
                let key = composite_key(key_values, "LET")?;
                let value = value.evaluate(contract)?;
                contract.trace(|| format!("LET ({}) = {}", key, value.to_literal()));
                contract.set_variable(&key, value);
            }
            Statement::If { branches, otherwise } => {
                for (condition, body) in branches {
                    let taken = condition.evaluate(contract)?.into_bool("IF")?;
                    contract.trace(|| format!("IF {} = {}", condition, taken));
                    if taken {
                        return body.run(contract);
                    }
                }
                if let Some(body) = otherwise {
                    contract.trace(|| "ELSE".to_string());
                    return body.run(contract);
                }
            }
            Statement::While { condition, body } => loop {
                if contract.is_finished() {
                    break;
                }
                let running = condition.evaluate(contract)?.into_bool("WHILE")?;
                contract.trace(|| format!("WHILE {} = {}", condition, running));
                if !running {
                    break;
                }
                body.run(contract)?;
            },
            Statement::Assert(expression) => {
                let holds = expression.evaluate(contract)?.into_bool("ASSERT")?;
                contract.trace(|| format!("ASSERT {} = {}", expression, holds));
                if !holds {
                    contract.set_result(false);
                }
            }
            Statement::Return(expression) => {
                let result = expression.evaluate(contract)?.into_bool("RETURN")?;
                contract.trace(|| format!("RETURN {}", result));
                contract.set_result(result);
            }
            Statement::Exec(expression) => {
                let script = expression.evaluate(contract)?.into_script("EXEC")?;
                contract.trace(|| format!("EXEC [{}]", script));
                run_nested(&script, contract)?;
            }
            Statement::Mast(expression) => {
                let root = expression.evaluate(contract)?.into_hex("MAST")?;
                let limits = *contract.limits();
                let script = contract
                    .witness()
                    .script_for_root(&root, &limits)
                    .map(|proof| proof.script.clone())
                    .ok_or_else(|| {
                        ScriptError::Execution(format!("MAST: no script in witness with root {}", format_hex(&root)))
                    })?;
                contract.trace(|| format!("MAST {} = [{}]", format_hex(&root), script));
                run_nested(&script, contract)?;
            }
        }
        Ok(())
    }
}

/// Parse and run a script one level below the current stack depth
pub(crate) fn run_nested(script: &str, contract: &mut Contract<'_>) -> Result<()> {
    contract.enter_stack()?;
    let limits = *contract.limits();
    let result = parse_script_at(script, contract.stack_depth(), &limits).and_then(|block| block.run(contract));
    contract.exit_stack();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Transaction, Witness};

    fn run(script: &str) -> Result<Option<bool>> {
        let transaction = Transaction::default();
        let witness = Witness::default();
        let mut contract = Contract::new(script, &transaction, &witness, &[]);
        contract.execute()?;
        Ok(contract.result())
    }

    #[test]
    fn test_let_and_return() {
        assert_eq!(run("LET x = 2 LET y = x * 3 RETURN y EQ 6").unwrap(), Some(true));
    }

    #[test]
    fn test_if_branches() {
        let script = "LET a = 2 IF a EQ 1 THEN RETURN FALSE ELSEIF a EQ 2 THEN RETURN TRUE ELSE RETURN FALSE ENDIF";
        assert_eq!(run(script).unwrap(), Some(true));
        let script = "LET a = 9 IF a EQ 1 THEN RETURN FALSE ELSE LET a = 1 ENDIF RETURN a EQ 1";
        assert_eq!(run(script).unwrap(), Some(true));
    }

    #[test]
    fn test_while_loop() {
        let script = "LET i = 0 LET total = 0 WHILE i LT 5 DO LET i = i + 1 LET total = total + i ENDWHILE RETURN total EQ 15";
        assert_eq!(run(script).unwrap(), Some(true));
    }

    #[test]
    fn test_unbounded_loop_hits_instruction_limit() {
        let err = run("WHILE TRUE DO LET x = 1 ENDWHILE").unwrap_err();
        assert!(err.is_resource_limit());
    }

    #[test]
    fn test_return_inside_loop_stops_execution() {
        assert_eq!(run("WHILE TRUE DO RETURN TRUE ENDWHILE").unwrap(), Some(true));
    }

    #[test]
    fn test_assert() {
        assert_eq!(run("ASSERT 1 EQ 2 RETURN TRUE").unwrap(), Some(false));
        assert_eq!(run("ASSERT 1 EQ 1 RETURN TRUE").unwrap(), Some(true));
        assert!(run("ASSERT 1").is_err());
    }

    #[test]
    fn test_let_array() {
        assert_eq!(run("LET (0 1) = 5 RETURN GET(0 1) EQ 5").unwrap(), Some(true));
        assert!(run("LET ([a]) = 5 RETURN TRUE").is_err());
    }

    #[test]
    fn test_exec() {
        assert_eq!(run("LET x = 3 EXEC [LET x = x + 1] RETURN x EQ 4").unwrap(), Some(true));
        assert_eq!(run("EXEC [RETURN TRUE] RETURN FALSE").unwrap(), Some(true));
        assert!(run("EXEC [RETURN (] RETURN TRUE").unwrap_err().is_parse());
        assert!(run("EXEC 0x01").is_err());
    }

    #[test]
    fn test_missing_return_rejects() {
        assert_eq!(run("LET x = 1").unwrap(), None);
    }
}
