//! Recursive-descent parser for expressions and statement blocks
//!
//! Expression levels, loosest first:
//! 1. `AND OR XOR NAND NOR NXOR`
//! 2. `EQ NEQ GT GTE LT LTE`
//! 3. `& | ^`
//! 4. `+ - % << >>`
//! 5. `* /`
//! 6. unary `NOT NEG ~`
//! 7. literals, globals, variables, function calls and brackets

use crate::config::ScriptLimits;
use crate::error::{Result, ScriptError};
use crate::expression::{BinaryOp, Expression, FunctionCall, UnaryOp};
use crate::number::Number;
use crate::statement::{Statement, StatementBlock};
use crate::tokenizer::{tokenize, LexicalTokenizer, ScriptToken, TokenKind};
use crate::value::{parse_hex, Value};

/// An expression together with the height of its tree
type Parsed = (Expression, usize);

/// Parse a complete script into a statement block
///
/// # Examples
///
/// ```
/// use selfscript::config::ScriptLimits;
/// use selfscript::parser::parse_script;
///
/// let block = parse_script("LET x = 1 RETURN x EQ 1", &ScriptLimits::default()).unwrap();
/// assert_eq!(block.len(), 2);
/// ```
pub fn parse_script(script: &str, limits: &ScriptLimits) -> Result<StatementBlock> {
    parse_script_at(script, 0, limits)
}

/// Parse a script nested `stack_depth` levels deep
pub fn parse_script_at(script: &str, stack_depth: usize, limits: &ScriptLimits) -> Result<StatementBlock> {
    let tokens = tokenize(script)?;
    parse_block(&tokens, stack_depth, limits)
}

/// Parse a single expression; every token must be consumed
pub fn parse_expression(script: &str, limits: &ScriptLimits) -> Result<Expression> {
    let tokens = tokenize(script)?;
    parse_expression_tokens(&tokens, 0, limits)
}

fn parse_expression_tokens(tokens: &[ScriptToken], stack_depth: usize, limits: &ScriptLimits) -> Result<Expression> {
    if tokens.is_empty() {
        return Err(ScriptError::Parse("Empty expression".to_string()));
    }
    let mut parser = ExpressionParser::new(tokens, stack_depth, limits);
    let (expression, _) = parser.expression()?;
    if !parser.lexer.check_all_tokens_used() {
        let token = parser.lexer.peek_token().map(|t| t.text().to_string()).unwrap_or_default();
        return Err(ScriptError::Parse(format!("Unexpected token {} after expression", token)));
    }
    Ok(expression)
}

struct ExpressionParser<'t> {
    lexer: LexicalTokenizer<'t>,
    limits: &'t ScriptLimits,
}

impl<'t> ExpressionParser<'t> {
    fn new(tokens: &'t [ScriptToken], stack_depth: usize, limits: &'t ScriptLimits) -> Self {
        Self { lexer: LexicalTokenizer::new(tokens, stack_depth, limits.max_stack_depth), limits }
    }

    fn expression(&mut self) -> Result<Parsed> {
        if self.lexer.stack_depth() > self.lexer.max_stack_depth() {
            return Err(ScriptError::ResourceLimit(format!(
                "Stack depth {} exceeds maximum {}",
                self.lexer.stack_depth(),
                self.lexer.max_stack_depth()
            )));
        }
        self.level(1)
    }

    /// Left-associative binary level
    fn level(&mut self, precedence: u8) -> Result<Parsed> {
        if precedence > 5 {
            return self.primary();
        }
        let (mut left, mut height) = self.level(precedence + 1)?;
        while let Some(token) = self.lexer.peek_token() {
            let op = match token.kind() {
                TokenKind::Operator => BinaryOp::from_symbol(token.text(), precedence),
                _ => None,
            };
            let Some(op) = op else { break };
            self.lexer.next_token()?;
            let (right, right_height) = self.level(precedence + 1)?;
            height = height.max(right_height) + 1;
            if height > self.limits.max_instructions {
                return Err(ScriptError::ResourceLimit(format!(
                    "Expression deeper than instruction limit {}",
                    self.limits.max_instructions
                )));
            }
            left = Expression::binary(op, left, right);
        }
        Ok((left, height))
    }

    fn primary(&mut self) -> Result<Parsed> {
        let token = self.lexer.next_token()?;
        if token.kind() == TokenKind::Operator {
            if let Some(op) = UnaryOp::from_symbol(token.text()) {
                self.lexer.increment_stack_depth()?;
                let (operand, height) = self.primary()?;
                self.lexer.decrement_stack_depth();
                return Ok((Expression::unary(op, operand), height + 1));
            }
        }
        self.lexer.go_back_token()?;
        self.base_unit()
    }

    fn base_unit(&mut self) -> Result<Parsed> {
        let token = self.lexer.next_token()?;
        let expression = match token.kind() {
            TokenKind::Number => Expression::Constant(Value::Number(parse_number(token)?)),
            TokenKind::Hex => Expression::Constant(Value::Hex(parse_hex(token.text())?)),
            TokenKind::String => Expression::Constant(Value::Script(token.text().to_string())),
            TokenKind::Boolean => Expression::Constant(Value::Boolean(token.text() == "TRUE")),
            TokenKind::Global => Expression::Global(token.text().to_string()),
            TokenKind::Operator if token.text() == "-" => {
                // A minus directly before a number literal is a negative constant
                let next = self.lexer.next_token()?;
                if next.kind() != TokenKind::Number {
                    return Err(unexpected(next));
                }
                Expression::Constant(Value::Number(parse_number(next)?.neg()))
            }
            TokenKind::Variable => {
                if self.lexer.peek_token().map(|t| t.kind()) == Some(TokenKind::OpenBracket) {
                    return Err(ScriptError::Parse(format!(
                        "Unknown function {} at position {}",
                        token.text(),
                        token.position()
                    )));
                }
                Expression::Variable(token.text().to_string())
            }
            TokenKind::Function => return self.function_call(token),
            TokenKind::OpenBracket => {
                self.lexer.increment_stack_depth()?;
                let (inner, height) = self.expression()?;
                let close = self.lexer.next_token()?;
                if close.kind() != TokenKind::CloseBracket {
                    return Err(unexpected(close));
                }
                self.lexer.decrement_stack_depth();
                return Ok((inner, height));
            }
            _ => return Err(unexpected(token)),
        };
        Ok((expression, 1))
    }

    fn function_call(&mut self, name: &ScriptToken) -> Result<Parsed> {
        let function = crate::functions::Function::from_name(name.text())
            .ok_or_else(|| ScriptError::Parse(format!("Unknown function {}", name.text())))?;
        let open = self.lexer.next_token()?;
        if open.kind() != TokenKind::OpenBracket {
            return Err(ScriptError::Parse(format!(
                "Function {} must be followed by ( at position {}",
                function.name(),
                open.position()
            )));
        }

        self.lexer.increment_stack_depth()?;
        let mut params = Vec::new();
        let mut height = 0;
        loop {
            let token = self.lexer.next_token()?;
            match token.kind() {
                TokenKind::CloseBracket => break,
                TokenKind::Comma => {
                    // Commas only separate parameters
                    let after = self.lexer.peek_token().map(|t| t.kind());
                    if params.is_empty() || after == Some(TokenKind::Comma) || after == Some(TokenKind::CloseBracket) {
                        return Err(unexpected(token));
                    }
                }
                _ => {
                    self.lexer.go_back_token()?;
                    let (param, param_height) = self.expression()?;
                    height = height.max(param_height);
                    params.push(param);
                    if params.len() > self.limits.max_function_params {
                        return Err(ScriptError::Parse(format!(
                            "{} has more than {} parameters",
                            function.name(),
                            self.limits.max_function_params
                        )));
                    }
                }
            }
        }
        self.lexer.decrement_stack_depth();

        if !function.arity().accepts(params.len()) {
            return Err(ScriptError::Parse(format!(
                "{} requires {} parameters but found {}",
                function.name(),
                function.arity(),
                params.len()
            )));
        }
        Ok((Expression::Function(FunctionCall { function, params }), height + 1))
    }
}

fn parse_number(token: &ScriptToken) -> Result<Number> {
    token
        .text()
        .parse()
        .map_err(|e| ScriptError::Parse(format!("{} at position {}", e, token.position())))
}

fn unexpected(token: &ScriptToken) -> ScriptError {
    ScriptError::Parse(format!("Unexpected token {} at position {}", token.text(), token.position()))
}

/// Parse statements from a token slice one level below `stack_depth`
pub(crate) fn parse_block(tokens: &[ScriptToken], stack_depth: usize, limits: &ScriptLimits) -> Result<StatementBlock> {
    let depth = stack_depth + 1;
    if depth > limits.max_stack_depth {
        return Err(ScriptError::ResourceLimit(format!(
            "Stack depth {} exceeds maximum {}",
            depth, limits.max_stack_depth
        )));
    }

    let mut statements = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let command = &tokens[pos];
        if command.kind() != TokenKind::Command {
            return Err(ScriptError::Parse(format!(
                "Expected a command but found {} at position {}",
                command.text(),
                command.position()
            )));
        }
        pos += 1;

        match command.text() {
            "LET" => {
                let target = tokens
                    .get(pos)
                    .ok_or_else(|| ScriptError::Parse("LET without a variable".to_string()))?;
                match target.kind() {
                    TokenKind::Variable => {
                        let equals = tokens.get(pos + 1);
                        if !equals.map(|t| t.is_operator("=")).unwrap_or(false) {
                            return Err(ScriptError::Parse(format!(
                                "LET {} must be followed by =",
                                target.text()
                            )));
                        }
                        let end = next_command(tokens, pos + 2);
                        let value = parse_expression_tokens(&tokens[pos + 2..end], depth, limits)?;
                        statements.push(Statement::Let { name: target.text().to_string(), value });
                        pos = end;
                    }
                    TokenKind::OpenBracket => {
                        let equals = (pos..tokens.len())
                            .find(|i| tokens[*i].is_operator("="))
                            .ok_or_else(|| ScriptError::Parse("LET array without =".to_string()))?;
                        let close = equals - 1;
                        if close <= pos + 1 || tokens[close].kind() != TokenKind::CloseBracket {
                            return Err(ScriptError::Parse("Invalid LET array keys".to_string()));
                        }
                        let keys = parse_expression_list(&tokens[pos + 1..close], depth, limits)?;
                        let end = next_command(tokens, equals + 1);
                        let value = parse_expression_tokens(&tokens[equals + 1..end], depth, limits)?;
                        statements.push(Statement::LetArray { keys, value });
                        pos = end;
                    }
                    _ => return Err(unexpected(target)),
                }
            }
            "RETURN" | "ASSERT" | "EXEC" | "MAST" => {
                let end = next_command(tokens, pos);
                let expression = parse_expression_tokens(&tokens[pos..end], depth, limits)?;
                statements.push(match command.text() {
                    "RETURN" => Statement::Return(expression),
                    "ASSERT" => Statement::Assert(expression),
                    "EXEC" => Statement::Exec(expression),
                    _ => Statement::Mast(expression),
                });
                pos = end;
            }
            "IF" => {
                let (statement, end) = parse_if(tokens, pos, depth, limits)?;
                statements.push(statement);
                pos = end;
            }
            "WHILE" => {
                let condition_end = find_command(tokens, pos, "DO")?;
                let condition = parse_expression_tokens(&tokens[pos..condition_end], depth, limits)?;
                let body_end = find_block_end(tokens, condition_end + 1, "WHILE", &["ENDWHILE"])?;
                let body = parse_block(&tokens[condition_end + 1..body_end], depth, limits)?;
                statements.push(Statement::While { condition, body });
                pos = body_end + 1;
            }
            _ => return Err(unexpected(command)),
        }
    }

    Ok(StatementBlock::new(statements))
}

/// Parse `IF c THEN .. [ELSEIF c THEN ..]* [ELSE ..] ENDIF` starting after `IF`
fn parse_if(tokens: &[ScriptToken], start: usize, depth: usize, limits: &ScriptLimits) -> Result<(Statement, usize)> {
    let mut branches = Vec::new();
    let mut otherwise = None;
    let mut pos = start;

    loop {
        let condition_end = find_command(tokens, pos, "THEN")?;
        let condition = parse_expression_tokens(&tokens[pos..condition_end], depth, limits)?;
        let body_start = condition_end + 1;
        let body_end = find_block_end(tokens, body_start, "IF", &["ELSEIF", "ELSE", "ENDIF"])?;
        let body = parse_block(&tokens[body_start..body_end], depth, limits)?;
        branches.push((condition, body));
        pos = body_end + 1;

        match tokens[body_end].text() {
            "ELSEIF" => continue,
            "ELSE" => {
                let else_end = find_block_end(tokens, pos, "IF", &["ELSEIF", "ELSE", "ENDIF"])?;
                if tokens[else_end].text() != "ENDIF" {
                    return Err(unexpected(&tokens[else_end]));
                }
                otherwise = Some(parse_block(&tokens[pos..else_end], depth, limits)?);
                pos = else_end + 1;
                break;
            }
            _ => break,
        }
    }

    Ok((Statement::If { branches, otherwise }, pos))
}

/// Split a token slice into expressions, with optional separating commas
fn parse_expression_list(tokens: &[ScriptToken], stack_depth: usize, limits: &ScriptLimits) -> Result<Vec<Expression>> {
    let mut parser = ExpressionParser::new(tokens, stack_depth, limits);
    let mut expressions = Vec::new();
    while parser.lexer.has_more_elements() {
        if let Some(token) = parser.lexer.peek_token() {
            if token.kind() == TokenKind::Comma {
                if expressions.is_empty() {
                    return Err(unexpected(token));
                }
                parser.lexer.next_token()?;
                if !parser.lexer.has_more_elements() {
                    return Err(unexpected(token));
                }
            }
        }
        let (expression, _) = parser.expression()?;
        expressions.push(expression);
    }
    Ok(expressions)
}

/// Index of the next command token at or after `start`, or the end
fn next_command(tokens: &[ScriptToken], start: usize) -> usize {
    (start..tokens.len())
        .find(|i| tokens[*i].kind() == TokenKind::Command)
        .unwrap_or(tokens.len())
}

fn find_command(tokens: &[ScriptToken], start: usize, name: &str) -> Result<usize> {
    (start..tokens.len())
        .find(|i| tokens[*i].is_command(name))
        .ok_or_else(|| ScriptError::Parse(format!("Missing {}", name)))
}

/// Index of the first terminator at nesting level zero
///
/// `opener` starts a nested construct which closes at the last terminator.
fn find_block_end(tokens: &[ScriptToken], start: usize, opener: &str, terminators: &[&str]) -> Result<usize> {
    let closer = terminators[terminators.len() - 1];
    let mut nesting = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        if token.kind() != TokenKind::Command {
            continue;
        }
        if token.text() == opener {
            nesting += 1;
        } else if nesting > 0 {
            if token.text() == closer {
                nesting -= 1;
            }
        } else if terminators.contains(&token.text()) {
            return Ok(i);
        }
    }
    Err(ScriptError::Parse(format!("Missing {}", closer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::Function;

    fn limits() -> ScriptLimits {
        ScriptLimits::default()
    }

    fn expr(text: &str) -> Expression {
        parse_expression(text, &limits()).unwrap()
    }

    fn num(n: i64) -> Expression {
        Expression::Constant(Value::Number(Number::from(n)))
    }

    #[test]
    fn test_precedence() {
        let parsed = expr("1 + 2 * 3");
        let expected = Expression::binary(BinaryOp::Add, num(1), Expression::binary(BinaryOp::Mul, num(2), num(3)));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_left_associativity() {
        let parsed = expr("10 - 4 - 3");
        let expected = Expression::binary(BinaryOp::Sub, Expression::binary(BinaryOp::Sub, num(10), num(4)), num(3));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_brackets_override_precedence() {
        let parsed = expr("(1 + 2) * 3");
        let expected = Expression::binary(BinaryOp::Mul, Expression::binary(BinaryOp::Add, num(1), num(2)), num(3));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_negative_constant() {
        assert_eq!(expr("-5"), num(-5));
        let parsed = expr("3 - -5");
        assert_eq!(parsed, Expression::binary(BinaryOp::Sub, num(3), num(-5)));
    }

    #[test]
    fn test_boolean_binds_loosest() {
        let parsed = expr("1 LT 2 AND TRUE");
        match &parsed {
            Expression::Binary { op: BinaryOp::And, left, .. } => {
                assert!(matches!(**left, Expression::Binary { op: BinaryOp::Lt, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_function_parameters() {
        let parsed = expr("MULTISIG(2, 0xAA 0xBB, 0xCC)");
        match &parsed {
            Expression::Function(call) => {
                assert_eq!(call.function, Function::MultiSig);
                assert_eq!(call.params.len(), 4);
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_arity_enforced() {
        assert!(parse_expression("SIGNEDBY()", &limits()).is_err());
        assert!(parse_expression("SIGNEDBY(0xAA)", &limits()).is_ok());
        assert!(parse_expression("SIGNEDBY(0xAA 0xBB)", &limits()).is_err());
        assert!(parse_expression("CONCAT(0xAA)", &limits()).is_err());
        assert!(parse_expression("VERIFYOUT(0 0xAA 1 0x00 TRUE)", &limits()).is_ok());
        assert!(parse_expression("VERIFYOUT(0 0xAA 1 0x00 TRUE FALSE)", &limits()).is_err());
    }

    #[test]
    fn test_misplaced_commas() {
        assert!(parse_expression("CONCAT(, 0xAA 0xBB)", &limits()).is_err());
        assert!(parse_expression("CONCAT(0xAA,, 0xBB)", &limits()).is_err());
        assert!(parse_expression("CONCAT(0xAA 0xBB,)", &limits()).is_err());
    }

    #[test]
    fn test_unknown_function_and_trailing_tokens() {
        assert!(parse_expression("FOO(1)", &limits()).is_err());
        assert!(parse_expression("1 2", &limits()).is_err());
        assert!(parse_expression("SHA3 0xAA", &limits()).is_err());
        assert!(parse_expression("", &limits()).is_err());
    }

    #[test]
    fn test_too_many_parameters() {
        let params = vec!["1"; limits().max_function_params + 1].join(" ");
        let result = parse_expression(&format!("MAX({})", params), &limits());
        assert!(result.unwrap_err().is_parse());
    }

    #[test]
    fn test_nesting_limit() {
        let depth = limits().max_stack_depth + 1;
        let script = format!("{}1{}", "ABS(".repeat(depth), ")".repeat(depth));
        let err = parse_expression(&script, &limits()).unwrap_err();
        assert!(err.is_resource_limit());

        let script = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert!(parse_expression(&script, &limits()).unwrap_err().is_resource_limit());

        let script = format!("{}TRUE", "NOT ".repeat(depth));
        assert!(parse_expression(&script, &limits()).unwrap_err().is_resource_limit());
    }

    #[test]
    fn test_expression_height_limit() {
        let small = ScriptLimits { max_instructions: 10, ..limits() };
        let script = vec!["1"; 20].join(" + ");
        assert!(parse_expression(&script, &small).unwrap_err().is_resource_limit());
        assert!(parse_expression(&script, &limits()).is_ok());
    }

    #[test]
    fn test_statements() {
        let block = parse_script("LET x = 1 LET (1 2) = 3 ASSERT TRUE RETURN x EQ 1", &limits()).unwrap();
        assert_eq!(block.len(), 4);
        assert!(matches!(block.statements()[1], Statement::LetArray { ref keys, .. } if keys.len() == 2));
    }

    #[test]
    fn test_if_chain() {
        let block = parse_script(
            "IF a EQ 1 THEN RETURN TRUE ELSEIF a EQ 2 THEN IF TRUE THEN LET b = 1 ENDIF ELSE RETURN FALSE ENDIF",
            &limits(),
        )
        .unwrap();
        assert_eq!(block.len(), 1);
        match &block.statements()[0] {
            Statement::If { branches, otherwise } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].1.len(), 1);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_while_loop() {
        let block = parse_script("LET i = 0 WHILE i LT 3 DO LET i = i + 1 ENDWHILE RETURN TRUE", &limits()).unwrap();
        assert_eq!(block.len(), 3);
        assert!(matches!(block.statements()[1], Statement::While { .. }));
    }

    #[test]
    fn test_malformed_statements() {
        for script in [
            "RETURN",
            "LET x 1",
            "LET = 1",
            "LET () = 1",
            "IF TRUE RETURN TRUE ENDIF",
            "IF TRUE THEN RETURN TRUE",
            "IF TRUE THEN RETURN TRUE ELSE RETURN FALSE ELSE RETURN TRUE ENDIF",
            "WHILE TRUE DO LET x = 1",
            "TRUE",
            "ENDIF",
            "RETURN TRUE FALSE",
        ] {
            assert!(parse_script(script, &limits()).is_err(), "{} should not parse", script);
        }
    }

    #[test]
    fn test_block_nesting_limit() {
        let small = ScriptLimits { max_stack_depth: 3, ..limits() };
        let nested = "IF TRUE THEN IF TRUE THEN IF TRUE THEN RETURN TRUE ENDIF ENDIF ENDIF";
        assert!(parse_script(nested, &small).unwrap_err().is_resource_limit());
        assert!(parse_script(nested, &limits()).is_ok());
    }
}
