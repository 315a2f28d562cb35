//! Canonical rendering of parsed scripts
//!
//! Rendering rules:
//! 1. Keywords, operators, functions and globals are uppercase; variables lowercase
//! 2. One space between tokens and around binary operators
//! 3. Function parameters and array keys are separated by `, `
//! 4. Brackets appear only where precedence requires them
//!
//! Parsing the rendered text yields the same tree, so cleaning is idempotent.

use crate::config::ScriptLimits;
use crate::error::Result;
use crate::expression::{Expression, FunctionCall};
use crate::parser::parse_script;
use crate::statement::{Statement, StatementBlock};
use std::fmt;

/// Canonical form of a script
///
/// Fails with the same errors as parsing.
///
/// # Examples
///
/// ```
/// use selfscript::canonical::clean;
/// use selfscript::config::ScriptLimits;
///
/// let limits = ScriptLimits::default();
/// assert_eq!(clean("return  signedby( 0xaa )", &limits).unwrap(), "RETURN SIGNEDBY(0xAA)");
/// assert_eq!(clean("LET x = (1 + 2) * 3", &limits).unwrap(), "LET x = (1 + 2) * 3");
/// assert_eq!(clean("LET x = 1 + (2 * 3)", &limits).unwrap(), "LET x = 1 + 2 * 3");
/// ```
pub fn clean(script: &str, limits: &ScriptLimits) -> Result<String> {
    Ok(parse_script(script, limits)?.to_string())
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expression, bracket: bool) -> fmt::Result {
    if bracket {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function.name())?;
        write_list(f, &self.params)?;
        f.write_str(")")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => f.write_str(&value.to_literal()),
            Expression::Variable(name) | Expression::Global(name) => f.write_str(name),
            Expression::Function(call) => write!(f, "{}", call),
            Expression::Unary { op, operand } => {
                let bracket = matches!(**operand, Expression::Binary { .. });
                let symbol = op.symbol();
                if symbol.chars().all(|c| c.is_ascii_alphabetic()) {
                    write!(f, "{} ", symbol)?;
                } else {
                    f.write_str(symbol)?;
                }
                write_operand(f, operand, bracket)
            }
            Expression::Binary { .. } => write_chain(f, self),
        }
    }
}

/// Render a run of binary nodes down the left side without recursing into it
fn write_chain(f: &mut fmt::Formatter<'_>, expression: &Expression) -> fmt::Result {
    let mut spine = Vec::new();
    let mut node = expression;
    while let Expression::Binary { op, left, right } = node {
        spine.push((*op, right.as_ref()));
        node = left.as_ref();
        // Levels are left-associative: only a looser level on the left needs brackets
        if matches!(node, Expression::Binary { op: inner, .. } if inner.precedence() < op.precedence()) {
            break;
        }
    }

    write_operand(f, node, matches!(node, Expression::Binary { .. }))?;
    for (op, right) in spine.into_iter().rev() {
        let bracket = matches!(right, Expression::Binary { op: inner, .. } if inner.precedence() <= op.precedence());
        write!(f, " {} ", op.symbol())?;
        write_operand(f, right, bracket)?;
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Let { name, value } => write!(f, "LET {} = {}", name, value),
            Statement::LetArray { keys, value } => {
                f.write_str("LET (")?;
                write_list(f, keys)?;
                write!(f, ") = {}", value)
            }
            Statement::If { branches, otherwise } => {
                for (i, (condition, body)) in branches.iter().enumerate() {
                    let keyword = if i == 0 { "IF" } else { " ELSEIF" };
                    write!(f, "{} {} THEN", keyword, condition)?;
                    write_body(f, body)?;
                }
                if let Some(body) = otherwise {
                    f.write_str(" ELSE")?;
                    write_body(f, body)?;
                }
                f.write_str(" ENDIF")
            }
            Statement::While { condition, body } => {
                write!(f, "WHILE {} DO", condition)?;
                write_body(f, body)?;
                f.write_str(" ENDWHILE")
            }
            Statement::Assert(expression) => write!(f, "ASSERT {}", expression),
            Statement::Return(expression) => write!(f, "RETURN {}", expression),
            Statement::Exec(expression) => write!(f, "EXEC {}", expression),
            Statement::Mast(expression) => write!(f, "MAST {}", expression),
        }
    }
}

/// A nested block preceded by a space, or nothing when empty
fn write_body(f: &mut fmt::Formatter<'_>, body: &StatementBlock) -> fmt::Result {
    if body.is_empty() {
        return Ok(());
    }
    write!(f, " {}", body)
}

impl fmt::Display for StatementBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, statement) in self.statements().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(script: &str) -> String {
        clean(script, &ScriptLimits::default()).unwrap()
    }

    #[test]
    fn test_whitespace_and_case() {
        assert_eq!(c("RETURN SIGNEDBY(0xAA)"), c("RETURN  SIGNEDBY( 0xAA )"));
        assert_eq!(c("let X=1 return x eq 1"), "LET x = 1 RETURN x EQ 1");
        assert_eq!(c("return @block gt 5"), "RETURN @BLOCK GT 5");
    }

    #[test]
    fn test_minimal_brackets() {
        assert_eq!(c("RETURN (1 - 2) - 3 EQ 0"), "RETURN 1 - 2 - 3 EQ 0");
        assert_eq!(c("RETURN 1 - (2 - 3) EQ 0"), "RETURN 1 - (2 - 3) EQ 0");
        assert_eq!(c("RETURN NOT (TRUE AND FALSE)"), "RETURN NOT (TRUE AND FALSE)");
        assert_eq!(c("RETURN ((TRUE))"), "RETURN TRUE");
        assert_eq!(c("RETURN ~0x0F EQ 0xF0"), "RETURN ~0x0F EQ 0xF0");
    }

    #[test]
    fn test_literals_and_params() {
        assert_eq!(c("LET a = 1.50 LET b = -2"), "LET a = 1.5 LET b = -2");
        assert_eq!(c("RETURN MAX(1 -2) EQ -1"), "RETURN MAX(1 - 2) EQ -1");
        assert_eq!(c("RETURN MAX(1, -2) EQ 1"), "RETURN MAX(1, -2) EQ 1");
        assert_eq!(c("EXEC [let  x = 1] RETURN TRUE"), "EXEC [let  x = 1] RETURN TRUE");
        assert_eq!(c("LET (0 1) = 0xab RETURN TRUE"), "LET (0, 1) = 0xAB RETURN TRUE");
    }

    #[test]
    fn test_blocks() {
        let script = "if a then let b = 1 elseif c then else let b = 2 endif while b lt 3 do let b = b + 1 endwhile return true";
        assert_eq!(
            c(script),
            "IF a THEN LET b = 1 ELSEIF c THEN ELSE LET b = 2 ENDIF WHILE b LT 3 DO LET b = b + 1 ENDWHILE RETURN TRUE"
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        for script in [
            "RETURN (1 + 2) * 3 EQ 9",
            "LET x = NEG (2 - 5) RETURN x GT 0 OR FALSE",
            "IF SIGNEDBY(0xAA) THEN RETURN TRUE ENDIF RETURN MULTISIG(1, 0xBB, 0xCC)",
            "RETURN 2 * 3 % 4 << 1 & 7 NEQ 0",
        ] {
            let once = c(script);
            assert_eq!(c(&once), once);
        }
    }

    #[test]
    fn test_clean_fails_like_parse() {
        assert!(clean("RETURN SIGNEDBY()", &ScriptLimits::default()).unwrap_err().is_parse());
        assert!(clean("RETURN (", &ScriptLimits::default()).is_err());
    }
}
