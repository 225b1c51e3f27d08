//! Properties a chain needs for its blocks to be indexed by the block
//! stores.
//!
//! A `Block` only exposes its identifier, the identifier of its parent
//! and its height: the stores walk the chain backward from parent to
//! parent until they reach the origin block, whose parent identifier is
//! `BlockId::zero`.
//!
//! Some chains (VeriBlock) reference their ancestors with truncated
//! hashes. The identifier decides under which key a block is indexed
//! and whether a (possibly shorter) identifier designates a stored one.

use crate::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Identifier of a block.
///
/// In bitcoin this is a double SHA2 256bits. For VeriBlock it is a
/// 24 bytes hash that is referenced by its 12 or 9 last bytes.
pub trait BlockId: Clone + Eq + Hash + Debug + Display {
    /// the identifier of the parent of the origin block
    fn zero() -> Self;

    fn is_zero(&self) -> bool;

    /// the key the stores index a block under.
    ///
    /// Distinct identifiers may share the same key, stores must then
    /// use `matches` to tell the candidates apart.
    fn store_key(&self) -> Self {
        self.clone()
    }

    /// check `self` designates the block identified by `stored`
    fn matches(&self, stored: &Self) -> bool {
        self == stored
    }
}

/// A block of an indexed chain, linked to its parent by identifier.
pub trait Block: Clone {
    /// distinct for any two blocks
    type Id: BlockId;

    fn id(&self) -> Self::Id;

    /// `BlockId::zero()` for the origin block
    fn parent_id(&self) -> Self::Id;

    /// absolute position of the block in the chain
    fn height(&self) -> u32;
}

/// A value the change journal and the stores can pack.
pub trait Serialize {
    fn serialize(&self, buf: &mut WriteBuf);

    /// pack into a new byte vector
    fn serialize_as_vec(&self) -> Vec<u8> {
        let mut buf = WriteBuf::new();
        self.serialize(&mut buf);
        buf.into()
    }
}

/// read a value out of `bytes`, refusing any trailing byte
pub fn deserialize_from_slice<T: Readable>(bytes: &[u8]) -> Result<T, ReadError> {
    let mut buf = ReadBuf::from(bytes);
    let t = T::read(&mut buf)?;
    buf.expect_end()?;
    Ok(t)
}

#[cfg(feature = "property-test-api")]
pub mod testing {
    use super::*;
    use quickcheck::Arbitrary;

    /// packing then reading back any value gives the same value
    pub fn serialization_bijection<T>(t: T) -> bool
    where
        T: Arbitrary + Serialize + Readable + Eq,
    {
        let bytes = t.serialize_as_vec();
        deserialize_from_slice::<T>(&bytes).map_or(false, |decoded| decoded == t)
    }
}
