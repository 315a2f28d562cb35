//! Exact decimal numbers for consensus arithmetic
//!
//! A number is an arbitrary-precision integer mantissa with a decimal scale.
//! Values are kept normalized (no trailing fractional zeros, zero has scale
//! zero) so that equality, hashing and the canonical string all agree.
//! Results are truncated toward zero at [`MAX_DECIMAL_PLACES`] fractional
//! digits and may hold at most [`MAX_NUMBER_DIGITS`] integer digits.

use crate::constants::{MAX_DECIMAL_PLACES, MAX_NUMBER_DIGITS};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumberError {
    #[error("Invalid number: {0}")]
    InvalidFormat(String),

    #[error("Number too large")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Number must be a whole number: {0}")]
    NotWhole(String),

    #[error("Number must not be negative: {0}")]
    Negative(String),
}

fn pow10(exponent: u32) -> BigInt {
    BigInt::from(10u32).pow(exponent)
}

/// Arbitrary-precision decimal
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Number {
    mantissa: BigInt,
    scale: u32,
}

impl Number {
    pub fn zero() -> Self {
        Self { mantissa: BigInt::zero(), scale: 0 }
    }

    pub fn one() -> Self {
        Self { mantissa: BigInt::one(), scale: 0 }
    }

    /// Build `mantissa / 10^scale`, truncating and normalizing
    pub fn from_parts(mantissa: BigInt, scale: u32) -> Result<Self, NumberError> {
        let mut mantissa = mantissa;
        let mut scale = scale;

        // 1. Truncate toward zero to the supported precision
        if scale > MAX_DECIMAL_PLACES {
            mantissa /= pow10(scale - MAX_DECIMAL_PLACES);
            scale = MAX_DECIMAL_PLACES;
        }

        // 2. Strip trailing fractional zeros
        let ten = BigInt::from(10u32);
        while scale > 0 && (&mantissa % &ten).is_zero() {
            mantissa /= &ten;
            scale -= 1;
        }
        if mantissa.is_zero() {
            scale = 0;
        }

        // 3. Bound the integer part
        let number = Self { mantissa, scale };
        if number.integer_digits() > MAX_NUMBER_DIGITS {
            return Err(NumberError::Overflow);
        }
        Ok(number)
    }

    pub fn from_biguint(value: BigUint) -> Result<Self, NumberError> {
        Self::from_parts(BigInt::from_biguint(Sign::Plus, value), 0)
    }

    fn integer_digits(&self) -> usize {
        let integer = self.mantissa.abs() / pow10(self.scale);
        if integer.is_zero() {
            0
        } else {
            integer.to_string().len()
        }
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn is_whole(&self) -> bool {
        self.scale == 0
    }

    /// Interpret as a non-negative whole index
    pub fn to_index(&self) -> Result<usize, NumberError> {
        if !self.is_whole() {
            return Err(NumberError::NotWhole(self.to_string()));
        }
        if self.is_negative() {
            return Err(NumberError::Negative(self.to_string()));
        }
        self.mantissa.to_usize().ok_or(NumberError::Overflow)
    }

    /// Interpret as a non-negative whole integer for bit operations
    pub fn to_biguint(&self) -> Result<BigUint, NumberError> {
        if !self.is_whole() {
            return Err(NumberError::NotWhole(self.to_string()));
        }
        self.mantissa
            .to_biguint()
            .ok_or_else(|| NumberError::Negative(self.to_string()))
    }

    fn aligned(&self, other: &Number) -> (BigInt, BigInt, u32) {
        let scale = self.scale.max(other.scale);
        let left = &self.mantissa * pow10(scale - self.scale);
        let right = &other.mantissa * pow10(scale - other.scale);
        (left, right, scale)
    }

    pub fn add(&self, other: &Number) -> Result<Number, NumberError> {
        let (left, right, scale) = self.aligned(other);
        Self::from_parts(left + right, scale)
    }

    pub fn sub(&self, other: &Number) -> Result<Number, NumberError> {
        let (left, right, scale) = self.aligned(other);
        Self::from_parts(left - right, scale)
    }

    pub fn mul(&self, other: &Number) -> Result<Number, NumberError> {
        Self::from_parts(&self.mantissa * &other.mantissa, self.scale + other.scale)
    }

    /// Quotient truncated toward zero at the supported precision
    pub fn div(&self, other: &Number) -> Result<Number, NumberError> {
        if other.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        let numerator = &self.mantissa * pow10(other.scale + MAX_DECIMAL_PLACES);
        let denominator = &other.mantissa * pow10(self.scale);
        Self::from_parts(numerator / denominator, MAX_DECIMAL_PLACES)
    }

    /// Remainder with the sign of the dividend
    pub fn rem(&self, other: &Number) -> Result<Number, NumberError> {
        if other.is_zero() {
            return Err(NumberError::DivisionByZero);
        }
        let (left, right, scale) = self.aligned(other);
        Self::from_parts(left % right, scale)
    }

    pub fn neg(&self) -> Number {
        Self { mantissa: -&self.mantissa, scale: self.scale }
    }

    pub fn abs(&self) -> Number {
        Self { mantissa: self.mantissa.abs(), scale: self.scale }
    }

    pub fn increment(&self) -> Result<Number, NumberError> {
        self.add(&Number::one())
    }

    pub fn decrement(&self) -> Result<Number, NumberError> {
        self.sub(&Number::one())
    }

    pub fn floor(&self) -> Number {
        self.round_integer(false)
    }

    pub fn ceil(&self) -> Number {
        self.round_integer(true)
    }

    fn round_integer(&self, up: bool) -> Number {
        if self.is_whole() {
            return self.clone();
        }
        // Truncation moves toward zero; step once away for the other side
        let mut integer = &self.mantissa / pow10(self.scale);
        if up && self.mantissa.is_positive() {
            integer += BigInt::one();
        } else if !up && self.mantissa.is_negative() {
            integer -= BigInt::one();
        }
        Self { mantissa: integer, scale: 0 }
    }

    /// Raise to a non-negative whole power
    pub fn pow(&self, exponent: &Number) -> Result<Number, NumberError> {
        let exponent = exponent.to_index()?;
        let mut remaining = exponent;
        let mut base = self.clone();
        let mut result = Number::one();
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul(&base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.mul(&base)?;
            }
        }
        Ok(result)
    }

    /// Square root truncated at the supported precision
    pub fn sqrt(&self) -> Result<Number, NumberError> {
        if self.is_negative() {
            return Err(NumberError::Negative(self.to_string()));
        }
        let widened = &self.mantissa * pow10(2 * MAX_DECIMAL_PLACES - self.scale);
        Self::from_parts(widened.sqrt(), MAX_DECIMAL_PLACES)
    }

    /// Keep only the first `digits` significant digits, rounding toward zero
    pub fn significant_digits(&self, digits: usize) -> Result<Number, NumberError> {
        if digits == 0 {
            return Err(NumberError::InvalidFormat("significant digits must be positive".to_string()));
        }
        let total = self.mantissa.abs().to_string().len();
        if self.is_zero() || total <= digits {
            return Ok(self.clone());
        }
        let dropped = (total - digits) as u32;
        let kept = &self.mantissa / pow10(dropped);
        if dropped <= self.scale {
            Self::from_parts(kept, self.scale - dropped)
        } else {
            Self::from_parts(kept * pow10(dropped - self.scale), 0)
        }
    }

    pub fn shift_left(&self, bits: &Number) -> Result<Number, NumberError> {
        let value = self.whole_mantissa()?;
        let bits = bits.to_index()?;
        if bits > MAX_NUMBER_DIGITS * 4 && !value.is_zero() {
            return Err(NumberError::Overflow);
        }
        Self::from_parts(value << bits, 0)
    }

    pub fn shift_right(&self, bits: &Number) -> Result<Number, NumberError> {
        let value = self.whole_mantissa()?;
        let bits = bits.to_index()?;
        Self::from_parts(value >> bits, 0)
    }

    fn whole_mantissa(&self) -> Result<BigInt, NumberError> {
        if !self.is_whole() {
            return Err(NumberError::NotWhole(self.to_string()));
        }
        Ok(self.mantissa.clone())
    }

    pub fn bit_and(&self, other: &Number) -> Result<Number, NumberError> {
        Self::from_biguint(self.to_biguint()? & other.to_biguint()?)
    }

    pub fn bit_or(&self, other: &Number) -> Result<Number, NumberError> {
        Self::from_biguint(self.to_biguint()? | other.to_biguint()?)
    }

    pub fn bit_xor(&self, other: &Number) -> Result<Number, NumberError> {
        Self::from_biguint(self.to_biguint()? ^ other.to_biguint()?)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self { mantissa: BigInt::from(value), scale: 0 }
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Self { mantissa: BigInt::from(value), scale: 0 }
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Self { mantissa: BigInt::from(value), scale: 0 }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        let (left, right, _) = self.aligned(other);
        left.cmp(&right)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let digits = self.mantissa.abs().to_string();
        if self.scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, integer, fraction)
    }
}

impl FromStr for Number {
    type Err = NumberError;

    /// Accepts `-?digits(.digits)?`
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || NumberError::InvalidFormat(text.to_string());
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (integer, fraction) = match body.split_once('.') {
            Some((integer, fraction)) => {
                if fraction.is_empty() {
                    return Err(invalid());
                }
                (integer, fraction)
            }
            None => (body, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if integer.is_empty() || !all_digits(integer) || !all_digits(fraction) {
            return Err(invalid());
        }

        let mut mantissa: BigInt = format!("{}{}", integer, fraction)
            .parse()
            .map_err(|_| invalid())?;
        if negative {
            mantissa = -mantissa;
        }
        let scale = u32::try_from(fraction.len()).map_err(|_| invalid())?;
        Self::from_parts(mantissa, scale)
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
