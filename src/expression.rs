//! Expression tree and its evaluation against a contract

use crate::contract::Contract;
use crate::error::{Result, ScriptError};
use crate::functions::Function;
use crate::number::Number;
use crate::value::{Value, ValueType};
use std::cmp::Ordering;

/// Binary operators, grouped by precedence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Nand,
    Nor,
    Nxor,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    BitAnd,
    BitOr,
    BitXor,
    Add,
    Sub,
    Rem,
    Shl,
    Shr,
    Mul,
    Div,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            And | Or | Xor | Nand | Nor | Nxor => 1,
            Eq | Neq | Gt | Gte | Lt | Lte => 2,
            BitAnd | BitOr | BitXor => 3,
            Add | Sub | Rem | Shl | Shr => 4,
            Mul | Div => 5,
        }
    }

    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Nand => "NAND",
            Nor => "NOR",
            Nxor => "NXOR",
            Eq => "EQ",
            Neq => "NEQ",
            Gt => "GT",
            Gte => "GTE",
            Lt => "LT",
            Lte => "LTE",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Add => "+",
            Sub => "-",
            Rem => "%",
            Shl => "<<",
            Shr => ">>",
            Mul => "*",
            Div => "/",
        }
    }

    /// Operator spelled by `symbol` at the given precedence level
    pub fn from_symbol(symbol: &str, precedence: u8) -> Option<Self> {
        use BinaryOp::*;
        [
            And, Or, Xor, Nand, Nor, Nxor, Eq, Neq, Gt, Gte, Lt, Lte, BitAnd, BitOr, BitXor, Add,
            Sub, Rem, Shl, Shr, Mul, Div,
        ]
        .into_iter()
        .find(|op| op.symbol() == symbol && op.precedence() == precedence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "NOT",
            UnaryOp::Neg => "NEG",
            UnaryOp::BitNot => "~",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "NOT" => Some(UnaryOp::Not),
            "NEG" => Some(UnaryOp::Neg),
            "~" => Some(UnaryOp::BitNot),
            _ => None,
        }
    }

    fn apply(self, value: Value) -> Result<Value> {
        match self {
            UnaryOp::Not => Ok(Value::Boolean(!value.into_bool("NOT")?)),
            UnaryOp::Neg => Ok(Value::Number(value.into_number("NEG")?.neg())),
            UnaryOp::BitNot => {
                let data = value.into_hex("~")?;
                Ok(Value::Hex(data.iter().map(|b| !b).collect()))
            }
        }
    }
}

/// A function bound to the parameter expressions of one call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    pub function: Function,
    pub params: Vec<Expression>,
}

impl FunctionCall {
    fn evaluate(&self, contract: &mut Contract<'_>) -> Result<Value> {
        contract.increment_instructions(self.function.extra_cost())?;
        contract.enter_stack()?;
        let result = self.function.run(&self.params, contract);
        contract.exit_stack();
        result
    }
}

/// Parsed expression; each node owns its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Constant(Value),
    Variable(String),
    Global(String),
    Function(FunctionCall),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Expression::Unary { op, operand: Box::new(operand) }
    }

    /// Evaluate this node, charging one instruction
    pub fn evaluate(&self, contract: &mut Contract<'_>) -> Result<Value> {
        contract.increment_instructions(1)?;
        let value = match self {
            Expression::Constant(value) => value.clone(),
            Expression::Variable(name) => contract.variable(name)?,
            Expression::Global(name) => contract.global(name)?,
            Expression::Function(call) => call.evaluate(contract)?,
            Expression::Unary { op, operand } => op.apply(operand.evaluate(contract)?)?,
            Expression::Binary { op, left, right } => evaluate_chain(*op, left, right, contract)?,
        };
        contract.check_data_size(&value)?;
        Ok(value)
    }

    /// Move nested subtrees into `pending` so they are dropped one at a time
    fn take_subtrees(&mut self, pending: &mut Vec<Expression>) {
        let mut take = |child: &mut Expression| {
            if matches!(child, Expression::Function(_) | Expression::Unary { .. } | Expression::Binary { .. }) {
                pending.push(std::mem::replace(child, Expression::Constant(Value::FALSE)));
            }
        };
        match self {
            Expression::Function(call) => call.params.iter_mut().for_each(&mut take),
            Expression::Unary { operand, .. } => take(&mut **operand),
            Expression::Binary { left, right, .. } => {
                take(&mut **left);
                take(&mut **right);
            }
            _ => {}
        }
    }
}

impl Drop for Expression {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_subtrees(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.take_subtrees(&mut pending);
        }
    }
}

/// Evaluate a binary node whose own instruction is already charged
///
/// A flat chain such as `a - b - c` nests once per operator on the left side,
/// so that side is walked with an explicit stack. Right operands only nest
/// through brackets, unary operators and calls, all of which are depth limited.
fn evaluate_chain(
    op: BinaryOp,
    left: &Expression,
    right: &Expression,
    contract: &mut Contract<'_>,
) -> Result<Value> {
    // 1. Charge each node on the way down, outermost first
    let mut spine = vec![(op, right)];
    let mut node = left;
    while let Expression::Binary { op, left, right } = node {
        contract.increment_instructions(1)?;
        spine.push((*op, right.as_ref()));
        node = left.as_ref();
    }

    // 2. Innermost left operand
    let mut value = node.evaluate(contract)?;

    // 3. Fold the right operands back out; the caller checks the outermost result
    for (i, (op, right)) in spine.into_iter().enumerate().rev() {
        value = evaluate_binary(op, value, right, contract)?;
        if i > 0 {
            contract.check_data_size(&value)?;
        }
    }
    Ok(value)
}

/// Apply `op` to an evaluated left operand, evaluating the right one as needed
fn evaluate_binary(
    op: BinaryOp,
    lhs: Value,
    right: &Expression,
    contract: &mut Contract<'_>,
) -> Result<Value> {
    use BinaryOp::*;
    let name = op.symbol();

    if op.precedence() == 1 {
        let lhs = lhs.into_bool(name)?;
        // AND and OR do not evaluate the right side once decided
        match (op, lhs) {
            (And, false) => return Ok(Value::FALSE),
            (Or, true) => return Ok(Value::TRUE),
            _ => {}
        }
        let rhs = right.evaluate(contract)?.into_bool(name)?;
        let result = match op {
            And => lhs && rhs,
            Or => lhs || rhs,
            Xor => lhs != rhs,
            Nand => !(lhs && rhs),
            Nor => !(lhs || rhs),
            _ => lhs == rhs,
        };
        return Ok(Value::Boolean(result));
    }

    let rhs = right.evaluate(contract)?;

    match op {
        Eq | Neq => {
            if lhs.value_type() != rhs.value_type() {
                return Err(ScriptError::Execution(format!(
                    "{}: cannot compare {} with {}",
                    name,
                    lhs.value_type(),
                    rhs.value_type()
                )));
            }
            Ok(Value::Boolean((lhs == rhs) == (op == Eq)))
        }
        Gt | Gte | Lt | Lte => {
            let ordering = compare_ordered(lhs, rhs, name)?;
            let result = match op {
                Gt => ordering == Ordering::Greater,
                Gte => ordering != Ordering::Less,
                Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            };
            Ok(Value::Boolean(result))
        }
        BitAnd | BitOr | BitXor => match (lhs, rhs) {
            (Value::Hex(a), Value::Hex(b)) => Ok(Value::Hex(bitwise_bytes(&a, &b, op))),
            (Value::Number(a), Value::Number(b)) => {
                let result = match op {
                    BitAnd => a.bit_and(&b)?,
                    BitOr => a.bit_or(&b)?,
                    _ => a.bit_xor(&b)?,
                };
                Ok(Value::Number(result))
            }
            (a, b) => Err(mixed_operands(name, &a, &b)),
        },
        Add => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.add(&b)?)),
            (Value::Script(a), Value::Script(b)) => Ok(Value::Script(a + &b)),
            (a, b) => Err(mixed_operands(name, &a, &b)),
        },
        _ => {
            let a = lhs.into_number(name)?;
            let b = rhs.into_number(name)?;
            let result = match op {
                Sub => a.sub(&b)?,
                Mul => a.mul(&b)?,
                Div => a.div(&b)?,
                Rem => a.rem(&b)?,
                Shl => a.shift_left(&b)?,
                _ => a.shift_right(&b)?,
            };
            Ok(Value::Number(result))
        }
    }
}

fn mixed_operands(name: &str, a: &Value, b: &Value) -> ScriptError {
    ScriptError::Execution(format!(
        "{}: unsupported operands {} and {}",
        name,
        a.value_type(),
        b.value_type()
    ))
}

/// Order two Numbers, or two Hex values as unsigned big-endian integers
fn compare_ordered(lhs: Value, rhs: Value, name: &str) -> Result<Ordering> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(a.cmp(&b)),
        (Value::Hex(a), Value::Hex(b)) => {
            let a = strip_leading_zeros(&a);
            let b = strip_leading_zeros(&b);
            Ok(a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        }
        (a, b) => {
            a.expect_type(&[ValueType::Number, ValueType::Hex], name)?;
            Err(mixed_operands(name, &a, &b))
        }
    }
}

fn strip_leading_zeros(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| *b != 0).unwrap_or(data.len());
    &data[start..]
}

/// Right-aligned bytewise operation; the result has the longer length
fn bitwise_bytes(a: &[u8], b: &[u8], op: BinaryOp) -> Vec<u8> {
    let len = a.len().max(b.len());
    let byte_at = |data: &[u8], i: usize| {
        let offset = len - data.len();
        if i < offset {
            0
        } else {
            data[i - offset]
        }
    };
    (0..len)
        .map(|i| {
            let (x, y) = (byte_at(a, i), byte_at(b, i));
            match op {
                BinaryOp::BitAnd => x & y,
                BinaryOp::BitOr => x | y,
                _ => x ^ y,
            }
        })
        .collect()
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Constant(value)
    }
}

impl From<Number> for Expression {
    fn from(number: Number) -> Self {
        Expression::Constant(Value::Number(number))
    }
}
