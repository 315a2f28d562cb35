//! Script tokenizer and the token cursor used by the parser
//!
//! Tokenizing:
//! 1. Skip whitespace
//! 2. `[` starts a string literal that runs to its matching `]`
//! 3. Brackets, commas and symbol operators are single tokens
//! 4. `@NAME` is a global, `0x..` a hex literal, `digits(.digits)?` a number
//! 5. Words are classified as command, word operator, boolean, function or variable

use crate::error::{Result, ScriptError};
use crate::functions::Function;

/// Statement keywords
pub const COMMANDS: [&str; 13] = [
    "LET", "IF", "THEN", "ELSEIF", "ELSE", "ENDIF", "WHILE", "DO", "ENDWHILE", "RETURN",
    "ASSERT", "EXEC", "MAST",
];

/// Operators spelled as words
pub const WORD_OPERATORS: [&str; 14] = [
    "AND", "OR", "XOR", "NAND", "NOR", "NXOR", "EQ", "NEQ", "GT", "GTE", "LT", "LTE", "NOT", "NEG",
];

/// Operators spelled as symbols; two-character ones first
pub const SYMBOL_OPERATORS: [&str; 12] = ["<<", ">>", "+", "-", "*", "/", "%", "&", "|", "^", "~", "="];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Command,
    Operator,
    Function,
    Variable,
    Global,
    Number,
    Hex,
    String,
    Boolean,
    OpenBracket,
    CloseBracket,
    Comma,
}

/// One lexical unit with its byte offset in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptToken {
    text: String,
    kind: TokenKind,
    position: usize,
}

impl ScriptToken {
    pub fn new(text: impl Into<String>, kind: TokenKind, position: usize) -> Self {
        Self { text: text.into(), kind, position }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.kind == TokenKind::Command && self.text == name
    }

    pub fn is_operator(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == symbol
    }
}

fn parse_error(message: impl std::fmt::Display, position: usize) -> ScriptError {
    ScriptError::Parse(format!("{} at position {}", message, position))
}

/// Split script text into tokens
///
/// # Examples
///
/// ```
/// use selfscript::tokenizer::{tokenize, TokenKind};
///
/// let tokens = tokenize("return signedby( 0xaa )").unwrap();
/// assert_eq!(tokens.len(), 5);
/// assert_eq!(tokens[0].text(), "RETURN");
/// assert_eq!(tokens[1].kind(), TokenKind::Function);
/// ```
pub fn tokenize(script: &str) -> Result<Vec<ScriptToken>> {
    let bytes = script.as_bytes();
    let mut tokens = Vec::new();
    let mut bracket_depth: usize = 0;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        match c {
            b'[' => {
                let end = string_literal_end(bytes, i)?;
                tokens.push(ScriptToken::new(&script[start + 1..end], TokenKind::String, start));
                i = end + 1;
            }
            b']' => return Err(parse_error("Unexpected ]", start)),
            b'(' => {
                bracket_depth += 1;
                tokens.push(ScriptToken::new("(", TokenKind::OpenBracket, start));
                i += 1;
            }
            b')' => {
                bracket_depth = bracket_depth
                    .checked_sub(1)
                    .ok_or_else(|| parse_error("Unbalanced brackets", start))?;
                tokens.push(ScriptToken::new(")", TokenKind::CloseBracket, start));
                i += 1;
            }
            b',' => {
                tokens.push(ScriptToken::new(",", TokenKind::Comma, start));
                i += 1;
            }
            b'@' => {
                i += 1;
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                if i == start + 1 {
                    return Err(parse_error("Empty global name", start));
                }
                let name = script[start..i].to_ascii_uppercase();
                tokens.push(ScriptToken::new(name, TokenKind::Global, start));
            }
            b'0' if matches!(bytes.get(i + 1), Some(b'x') | Some(b'X')) => {
                i += 2;
                while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
                    i += 1;
                }
                if i < bytes.len() && is_word_byte(bytes[i]) {
                    return Err(parse_error("Invalid hex literal", start));
                }
                let digits = script[start + 2..i].to_ascii_uppercase();
                tokens.push(ScriptToken::new(format!("0x{}", digits), TokenKind::Hex, start));
            }
            b'0'..=b'9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < bytes.len() && (is_word_byte(bytes[i]) || bytes[i] == b'.') {
                    return Err(parse_error("Invalid number literal", start));
                }
                tokens.push(ScriptToken::new(&script[start..i], TokenKind::Number, start));
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                tokens.push(classify_word(&script[start..i], start)?);
            }
            _ => {
                let rest = &script[start..];
                let symbol = SYMBOL_OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| {
                        let found = rest.chars().next().unwrap_or(' ');
                        parse_error(format!("Unexpected character '{}'", found), start)
                    })?;
                tokens.push(ScriptToken::new(*symbol, TokenKind::Operator, start));
                i += symbol.len();
            }
        }
    }

    if bracket_depth != 0 {
        return Err(parse_error("Unbalanced brackets", script.len()));
    }
    Ok(tokens)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index of the `]` closing the string literal opened at `open`
fn string_literal_end(bytes: &[u8], open: usize) -> Result<usize> {
    let mut depth = 0usize;
    for (offset, b) in bytes[open..].iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + offset);
                }
            }
            _ => {}
        }
    }
    Err(parse_error("Unterminated string literal", open))
}

fn classify_word(word: &str, position: usize) -> Result<ScriptToken> {
    let upper = word.to_ascii_uppercase();
    if COMMANDS.contains(&upper.as_str()) {
        return Ok(ScriptToken::new(upper, TokenKind::Command, position));
    }
    if WORD_OPERATORS.contains(&upper.as_str()) {
        return Ok(ScriptToken::new(upper, TokenKind::Operator, position));
    }
    if upper == "TRUE" || upper == "FALSE" {
        return Ok(ScriptToken::new(upper, TokenKind::Boolean, position));
    }
    if let Some(function) = Function::from_name(&upper) {
        return Ok(ScriptToken::new(function.name(), TokenKind::Function, position));
    }
    if !word.as_bytes()[0].is_ascii_alphabetic() {
        return Err(parse_error(format!("Invalid variable name {}", word), position));
    }
    Ok(ScriptToken::new(word.to_ascii_lowercase(), TokenKind::Variable, position))
}

/// Cursor over a token sequence with one-token backtracking
///
/// Also carries the nesting depth the parser has reached so that bracket
/// and call nesting can be bounded.
#[derive(Debug)]
pub struct LexicalTokenizer<'t> {
    tokens: &'t [ScriptToken],
    position: usize,
    stack_depth: usize,
    max_stack_depth: usize,
}

impl<'t> LexicalTokenizer<'t> {
    pub fn new(tokens: &'t [ScriptToken], stack_depth: usize, max_stack_depth: usize) -> Self {
        Self { tokens, position: 0, stack_depth, max_stack_depth }
    }

    /// Return the token at the cursor and advance
    pub fn next_token(&mut self) -> Result<&'t ScriptToken> {
        let tokens = self.tokens;
        let token = tokens.get(self.position).ok_or_else(|| {
            ScriptError::Parse("Unexpected end of script".to_string())
        })?;
        self.position += 1;
        Ok(token)
    }

    /// Token at the cursor without advancing
    pub fn peek_token(&self) -> Option<&'t ScriptToken> {
        let tokens = self.tokens;
        tokens.get(self.position)
    }

    /// Step back one token
    pub fn go_back_token(&mut self) -> Result<()> {
        if self.position == 0 {
            return Err(ScriptError::Parse("Cannot go back before the first token".to_string()));
        }
        self.position -= 1;
        Ok(())
    }

    pub fn has_more_elements(&self) -> bool {
        self.position < self.tokens.len()
    }

    pub fn check_all_tokens_used(&self) -> bool {
        self.position == self.tokens.len()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_depth
    }

    pub fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    pub fn increment_stack_depth(&mut self) -> Result<()> {
        self.stack_depth += 1;
        if self.stack_depth > self.max_stack_depth {
            return Err(ScriptError::ResourceLimit(format!(
                "Stack depth {} exceeds maximum {}",
                self.stack_depth, self.max_stack_depth
            )));
        }
        Ok(())
    }

    pub fn decrement_stack_depth(&mut self) {
        self.stack_depth = self.stack_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(script: &str) -> Vec<TokenKind> {
        tokenize(script).unwrap().iter().map(|t| t.kind()).collect()
    }

    #[test]
    fn test_tokenize_statement() {
        let tokens = tokenize("LET x = 5 + 0xab").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["LET", "x", "=", "5", "+", "0xAB"]);
        assert_eq!(
            kinds("LET x = 5 + 0xab"),
            vec![
                TokenKind::Command,
                TokenKind::Variable,
                TokenKind::Operator,
                TokenKind::Number,
                TokenKind::Operator,
                TokenKind::Hex
            ]
        );
    }

    #[test]
    fn test_case_normalization() {
        let tokens = tokenize("if Flag and true then return sha3(@Block) endif").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text()).collect();
        assert_eq!(
            texts,
            vec!["IF", "flag", "AND", "TRUE", "THEN", "RETURN", "SHA3", "(", "@BLOCK", ")", "ENDIF"]
        );
    }

    #[test]
    fn test_nested_string_literal() {
        let tokens = tokenize("EXEC [RETURN [a] EQ [a]]").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind(), TokenKind::String);
        assert_eq!(tokens[1].text(), "RETURN [a] EQ [a]");
        assert_eq!(tokens[1].position(), 5);
    }

    #[test]
    fn test_shift_operators() {
        let tokens = tokenize("1<<2>>3").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["1", "<<", "2", ">>", "3"]);
    }

    #[test]
    fn test_decimal_numbers() {
        let tokens = tokenize("1.25 - 3").unwrap();
        assert_eq!(tokens[0].text(), "1.25");
        assert_eq!(tokens[1].text(), "-");
    }

    #[test]
    fn test_malformed_input() {
        assert!(tokenize("RETURN (TRUE").is_err());
        assert!(tokenize("RETURN TRUE)").is_err());
        assert!(tokenize("RETURN [abc").is_err());
        assert!(tokenize("RETURN abc]").is_err());
        assert!(tokenize("RETURN 12abc").is_err());
        assert!(tokenize("RETURN 0xZZ").is_err());
        assert!(tokenize("RETURN 1.2.3").is_err());
        assert!(tokenize("RETURN a < b").is_err());
        assert!(tokenize("RETURN @").is_err());
        assert!(tokenize("LET _x = 1").is_err());
        assert!(tokenize("RETURN $1").is_err());
    }

    #[test]
    fn test_cursor_navigation() {
        let tokens = tokenize("RETURN TRUE").unwrap();
        let mut cursor = LexicalTokenizer::new(&tokens, 0, 4);
        assert!(cursor.go_back_token().is_err());
        assert_eq!(cursor.next_token().unwrap().text(), "RETURN");
        assert_eq!(cursor.peek_token().map(|t| t.text()), Some("TRUE"));
        cursor.go_back_token().unwrap();
        assert_eq!(cursor.peek_token().map(|t| t.text()), Some("RETURN"));
        cursor.next_token().unwrap();
        cursor.next_token().unwrap();
        assert!(cursor.check_all_tokens_used());
        assert!(!cursor.has_more_elements());
        assert!(cursor.next_token().is_err());
    }

    #[test]
    fn test_cursor_stack_depth() {
        let tokens = tokenize("TRUE").unwrap();
        let mut cursor = LexicalTokenizer::new(&tokens, 1, 2);
        cursor.increment_stack_depth().unwrap();
        let err = cursor.increment_stack_depth().unwrap_err();
        assert!(err.is_resource_limit());
        cursor.decrement_stack_depth();
        assert_eq!(cursor.stack_depth(), 2);
    }
}
