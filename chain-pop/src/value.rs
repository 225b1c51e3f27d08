use chain_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use chain_core::property;
use std::{fmt, ops};

/// Reward amount, in the smallest unit of the altchain currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Value(pub u64);

impl Value {
    pub fn zero() -> Self {
        Value(0)
    }

    /// sum of the payouts of a round, failing on overflow
    pub fn sum<I>(values: I) -> Result<Self, ValueError>
    where
        I: Iterator<Item = Self>,
    {
        values.fold(Ok(Value::zero()), |acc, v| acc? + v)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("reward amount overflow")]
    Overflow,
}

impl ops::Add for Value {
    type Output = Result<Value, ValueError>;

    fn add(self, other: Value) -> Self::Output {
        self.0
            .checked_add(other.0)
            .map(Value)
            .ok_or(ValueError::Overflow)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl property::Serialize for Value {
    fn serialize(&self, buf: &mut WriteBuf) {
        buf.put_u64(self.0)
    }
}

impl Readable for Value {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        buf.get_u64().map(Value)
    }
}
