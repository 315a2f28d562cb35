//! Built-in function catalogue
//!
//! Every built-in is one [`Function`] variant. Names are resolved once at
//! parse time; evaluation dispatches through [`Function::run`] with the
//! parameter expressions of the call site.

mod binary;
mod cast;
mod general;
mod hashing;
mod numeric;
mod signatures;
mod state;
mod strings;
mod txn;

use crate::constants::CHECKSIG_EXTRA_COST;
use crate::contract::Contract;
use crate::error::{Result, ScriptError};
use crate::expression::Expression;
use crate::number::Number;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

pub(crate) use general::composite_key;

/// Number of parameters a function accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Between(min, max) => write!(f, "{} to {}", min, max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr, EnumIter, Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Function {
    // Hex
    Concat,
    Len,
    Rev,
    Subset,
    Overwrite,
    SetLen,
    BitSet,
    BitGet,
    BitCount,
    // Casts
    Bool,
    Hex,
    Number,
    String,
    Ascii,
    Utf8,
    Address,
    // Numbers
    Abs,
    Ceil,
    Floor,
    Max,
    Min,
    Dec,
    Inc,
    SigDig,
    Pow,
    Sqrt,
    // Strings
    SubStr,
    Replace,
    ReplaceFirst,
    // Hashing
    Sha2,
    Sha3,
    Proof,
    // Signatures
    SignedBy,
    MultiSig,
    CheckSig,
    // State
    State,
    PrevState,
    SameState,
    // Transaction inputs
    GetInAddr,
    GetInAmt,
    GetInId,
    GetInTok,
    VerifyIn,
    // Transaction outputs
    GetOutAddr,
    GetOutAmt,
    GetOutTok,
    GetOutKeepState,
    VerifyOut,
    SumInputs,
    SumOutputs,
    // General
    Get,
    Exists,
    #[strum(serialize = "FUNCTION")]
    UserFunction,
}

impl Function {
    /// Look up a built-in by name, ignoring case
    ///
    /// # Examples
    ///
    /// ```
    /// use selfscript::functions::Function;
    ///
    /// assert_eq!(Function::from_name("signedby"), Some(Function::SignedBy));
    /// assert_eq!(Function::from_name("SIGNEDBY").unwrap().name(), "SIGNEDBY");
    /// assert_eq!(Function::from_name("NOPE"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        Function::from_str(name).ok()
    }

    /// Canonical uppercase name
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn arity(self) -> Arity {
        use Function::*;
        match self {
            Concat | Max | Min | MultiSig => Arity::AtLeast(2),
            Get | Exists | UserFunction => Arity::AtLeast(1),
            VerifyOut => Arity::Between(4, 5),
            VerifyIn => Arity::Exact(4),
            Overwrite | Proof => Arity::Exact(5),
            Subset | BitSet | SubStr | Replace | ReplaceFirst | CheckSig => Arity::Exact(3),
            SetLen | BitGet | SigDig | Pow | SameState => Arity::Exact(2),
            Len | Rev | BitCount | Bool | Hex | Number | String | Ascii | Utf8 | Address | Abs | Ceil
            | Floor | Dec | Inc | Sqrt | Sha2 | Sha3 | SignedBy | State | PrevState | GetInAddr
            | GetInAmt | GetInId | GetInTok | GetOutAddr | GetOutAmt | GetOutTok | GetOutKeepState
            | SumInputs | SumOutputs => Arity::Exact(1),
        }
    }

    /// Instructions charged on top of the call's own node
    pub fn extra_cost(self) -> usize {
        match self {
            Function::CheckSig => CHECKSIG_EXTRA_COST,
            _ => 0,
        }
    }

    /// Evaluate the function over the parameter expressions of a call site
    pub fn run(self, params: &[Expression], contract: &mut Contract<'_>) -> Result<Value> {
        use Function::*;
        let p = Params::new(self, params);
        match self {
            Concat => binary::concat(&p, contract),
            Len => binary::len(&p, contract),
            Rev => binary::rev(&p, contract),
            Subset => binary::subset(&p, contract),
            Overwrite => binary::overwrite(&p, contract),
            SetLen => binary::set_len(&p, contract),
            BitSet => binary::bit_set(&p, contract),
            BitGet => binary::bit_get(&p, contract),
            BitCount => binary::bit_count(&p, contract),
            Bool => cast::to_bool(&p, contract),
            Hex => cast::to_hex(&p, contract),
            Number => cast::to_number(&p, contract),
            String => cast::to_string(&p, contract),
            Ascii => cast::ascii(&p, contract),
            Utf8 => cast::utf8(&p, contract),
            Address => cast::address(&p, contract),
            Abs | Ceil | Floor | Dec | Inc | Sqrt => numeric::unary(self, &p, contract),
            Max | Min => numeric::extreme(self, &p, contract),
            SigDig => numeric::sig_dig(&p, contract),
            Pow => numeric::pow(&p, contract),
            SubStr => strings::substr(&p, contract),
            Replace => strings::replace(&p, contract, true),
            ReplaceFirst => strings::replace(&p, contract, false),
            Sha2 => hashing::sha2(&p, contract),
            Sha3 => hashing::sha3(&p, contract),
            Proof => hashing::proof(&p, contract),
            SignedBy => signatures::signed_by(&p, contract),
            MultiSig => signatures::multi_sig(&p, contract),
            CheckSig => signatures::check_sig(&p, contract),
            State => state::state(&p, contract),
            PrevState => state::prev_state(&p, contract),
            SameState => state::same_state(&p, contract),
            GetInAddr | GetInAmt | GetInId | GetInTok => txn::input_field(self, &p, contract),
            GetOutAddr | GetOutAmt | GetOutTok | GetOutKeepState => txn::output_field(self, &p, contract),
            VerifyIn => txn::verify_in(&p, contract),
            VerifyOut => txn::verify_out(&p, contract),
            SumInputs => txn::sum_inputs(&p, contract),
            SumOutputs => txn::sum_outputs(&p, contract),
            Get => general::get(&p, contract),
            Exists => general::exists(&p, contract),
            UserFunction => general::function(&p, contract),
        }
    }
}

/// Typed access to the parameters of one call
pub(crate) struct Params<'p> {
    function: Function,
    exprs: &'p [Expression],
}

impl<'p> Params<'p> {
    fn new(function: Function, exprs: &'p [Expression]) -> Self {
        Self { function, exprs }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.function.name()
    }

    pub(crate) fn len(&self) -> usize {
        self.exprs.len()
    }

    pub(crate) fn value(&self, index: usize, contract: &mut Contract<'_>) -> Result<Value> {
        let expression = self.exprs.get(index).ok_or_else(|| {
            ScriptError::Execution(format!("{}: missing parameter {}", self.name(), index))
        })?;
        expression.evaluate(contract)
    }

    pub(crate) fn values(&self, contract: &mut Contract<'_>) -> Result<Vec<Value>> {
        (0..self.len()).map(|i| self.value(i, contract)).collect()
    }

    pub(crate) fn number(&self, index: usize, contract: &mut Contract<'_>) -> Result<Number> {
        self.value(index, contract)?.into_number(self.name())
    }

    pub(crate) fn hex(&self, index: usize, contract: &mut Contract<'_>) -> Result<Vec<u8>> {
        self.value(index, contract)?.into_hex(self.name())
    }

    pub(crate) fn script(&self, index: usize, contract: &mut Contract<'_>) -> Result<String> {
        self.value(index, contract)?.into_script(self.name())
    }

    pub(crate) fn boolean(&self, index: usize, contract: &mut Contract<'_>) -> Result<bool> {
        self.value(index, contract)?.into_bool(self.name())
    }

    /// Non-negative whole number usable as an index
    pub(crate) fn index(&self, index: usize, contract: &mut Contract<'_>) -> Result<usize> {
        let number = self.number(index, contract)?;
        number
            .to_index()
            .map_err(|e| ScriptError::Execution(format!("{}: {}", self.name(), e)))
    }

    /// Port number of a state variable
    pub(crate) fn port(&self, index: usize, contract: &mut Contract<'_>) -> Result<u8> {
        let number = self.number(index, contract)?;
        self.port_of(&number)
    }

    pub(crate) fn port_of(&self, number: &Number) -> Result<u8> {
        number
            .to_index()
            .ok()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| ScriptError::Execution(format!("{}: invalid state port {}", self.name(), number)))
    }

    pub(crate) fn error(&self, message: impl fmt::Display) -> ScriptError {
        ScriptError::Execution(format!("{}: {}", self.name(), message))
    }

    /// A result grew past the data size ceiling
    pub(crate) fn limit_error(&self, message: impl fmt::Display) -> ScriptError {
        ScriptError::ResourceLimit(format!("{}: {}", self.name(), message))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::contract::Contract;
    use crate::error::Result;
    use crate::parser::parse_expression;
    use crate::types::{StateVariable, Transaction, Witness};
    use crate::value::Value;

    /// Evaluate a single expression against a transaction and witness
    pub fn eval_with(expression: &str, transaction: &Transaction, witness: &Witness, prev: &[StateVariable]) -> Result<Value> {
        let mut contract = Contract::new("", transaction, witness, prev);
        let limits = *contract.limits();
        let expression = parse_expression(expression, &limits)?;
        expression.evaluate(&mut contract)
    }

    pub fn eval(expression: &str) -> Result<Value> {
        eval_with(expression, &Transaction::default(), &Witness::default(), &[])
    }

    pub fn hex(text: &str) -> Value {
        Value::Hex(crate::value::parse_hex(text).unwrap())
    }

    pub fn num(n: i64) -> Value {
        Value::Number(n.into())
    }

    pub fn text(s: &str) -> Value {
        Value::Script(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_name_resolves() {
        for function in Function::iter() {
            assert_eq!(Function::from_name(function.name()), Some(function));
            assert_eq!(Function::from_name(&function.name().to_lowercase()), Some(function));
            assert_eq!(function.name(), function.name().to_uppercase());
        }
        assert_eq!(Function::iter().count(), 53);
    }

    #[test]
    fn test_multiword_names() {
        assert_eq!(Function::SetLen.name(), "SETLEN");
        assert_eq!(Function::GetOutKeepState.name(), "GETOUTKEEPSTATE");
        assert_eq!(Function::ReplaceFirst.to_string(), "REPLACEFIRST");
        assert_eq!(Function::from_name("function"), Some(Function::UserFunction));
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exact(1).accepts(1));
        assert!(!Arity::Exact(1).accepts(0));
        assert!(Arity::AtLeast(2).accepts(7));
        assert!(!Arity::AtLeast(2).accepts(1));
        assert!(Arity::Between(4, 5).accepts(5));
        assert!(!Arity::Between(4, 5).accepts(6));
        assert_eq!(Arity::AtLeast(2).to_string(), "at least 2");
    }

    #[test]
    fn test_only_checksig_costs_extra() {
        for function in Function::iter() {
            let expected = if function == Function::CheckSig { 31 } else { 0 };
            assert_eq!(function.extra_cost(), expected);
        }
    }
}
