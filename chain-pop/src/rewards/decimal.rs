//! Fixed point decimal numbers used by the reward curve.
//!
//! Values carry 8 fractional digits. Every operation that loses
//! precision rounds toward negative infinity.

use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, ops, str::FromStr};

pub const DECIMAL_DIGITS: usize = 8;

fn scale() -> BigInt {
    BigInt::from(100_000_000u64)
}

fn div_floor(numerator: BigInt, denominator: &BigInt) -> BigInt {
    let quotient = &numerator / denominator;
    let remainder = &numerator % denominator;
    if !remainder.is_zero() && (remainder.is_negative() != denominator.is_negative()) {
        quotient - BigInt::one()
    } else {
        quotient
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("invalid decimal number `{0}'")]
pub struct ParseDecimalError(String);

/// `Decimal(n)` is the value `n / 10^8`
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(BigInt);

impl Decimal {
    pub fn zero() -> Self {
        Decimal(BigInt::zero())
    }

    pub fn one() -> Self {
        Decimal(scale())
    }

    pub fn from_integer<I: Into<BigInt>>(i: I) -> Self {
        Decimal(i.into() * scale())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// largest integer not above the value
    pub fn floor(&self) -> BigInt {
        div_floor(self.0.clone(), &scale())
    }

    /// the integer part, `None` if negative or beyond a `u64`
    pub fn to_u64_floor(&self) -> Option<u64> {
        self.floor().to_u64()
    }

    /// `self / rhs`, `None` on division by zero
    pub fn checked_div(&self, rhs: &Decimal) -> Option<Decimal> {
        if rhs.is_zero() {
            return None;
        }
        Some(Decimal(div_floor(&self.0 * scale(), &rhs.0)))
    }
}

impl<'a> ops::Add<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn add(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 + &rhs.0)
    }
}

impl<'a> ops::Sub<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn sub(self, rhs: &'a Decimal) -> Decimal {
        Decimal(&self.0 - &rhs.0)
    }
}

impl<'a> ops::Mul<&'a Decimal> for &'a Decimal {
    type Output = Decimal;

    fn mul(self, rhs: &'a Decimal) -> Decimal {
        Decimal(div_floor(&self.0 * &rhs.0, &scale()))
    }
}

impl From<u64> for Decimal {
    fn from(v: u64) -> Self {
        Decimal::from_integer(v)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Parse `[-]digits[.digits]`, fractional digits past the 8th are
    /// rounded down.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_owned());
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = unsigned.splitn(2, '.');
        let integer = parts.next().unwrap_or("");
        let fraction = parts.next().unwrap_or("");
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (integer.is_empty() && fraction.is_empty()) || !is_digits(integer) || !is_digits(fraction) {
            return Err(err());
        }

        let mut digits = String::with_capacity(integer.len() + DECIMAL_DIGITS);
        digits.push_str(integer);
        let kept = &fraction[..std::cmp::min(fraction.len(), DECIMAL_DIGITS)];
        digits.push_str(kept);
        digits.extend(std::iter::repeat('0').take(DECIMAL_DIGITS - kept.len()));

        let mut raw = BigInt::from_str(&digits).map_err(|_| err())?;
        let dropped = &fraction[kept.len()..];
        if negative {
            raw = -raw;
            if dropped.bytes().any(|b| b != b'0') {
                raw -= BigInt::one();
            }
        }
        Ok(Decimal(raw))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let magnitude = self.0.abs();
        let integer = &magnitude / scale();
        let fraction = (&magnitude % scale()).to_u64().unwrap_or(0);
        if self.0.sign() == Sign::Minus {
            write!(f, "-")?;
        }
        if fraction == 0 {
            write!(f, "{}", integer)
        } else {
            let fraction = format!("{:08}", fraction);
            write!(f, "{}.{}", integer, fraction.trim_end_matches('0'))
        }
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Decimal({})", self)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DecimalVisitor;

        impl<'de> de::Visitor<'de> for DecimalVisitor {
            type Value = Decimal;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                write!(fmt, "a decimal number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Decimal::from_integer(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Decimal::from_integer(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                // the shortest representation of the float is the written one
                self.visit_str(&v.to_string())
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }
}
