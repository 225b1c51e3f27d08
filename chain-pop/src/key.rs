//! Hashes and identifiers of the VeriBlock and Bitcoin blocks.
//!
//! VeriBlock headers reference their ancestors by truncated hashes: the
//! previous block by its last 12 bytes and the keystones by their last
//! 9 bytes. Every comparison between VeriBlock hashes of different
//! lengths is done on the common suffix.

use chain_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use chain_core::property::{self, BlockId};
use cryptoxide::blake2b::Blake2b;
use cryptoxide::digest::Digest as _;
use cryptoxide::sha2::Sha256;
use std::fmt;
use std::str::FromStr;

pub const VBLAKE_HASH_LENGTH: usize = 24;
pub const PREVIOUS_BLOCK_LENGTH: usize = 12;
pub const PREVIOUS_KEYSTONE_LENGTH: usize = 9;
pub const SHA256_HASH_LENGTH: usize = 32;
pub const VERIBLOCK_MERKLE_ROOT_LENGTH: usize = 16;
pub const BLOCK_IDENTIFIER_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HashError {
    #[error("invalid hash size, expected {expected} bytes but received {got}")]
    InvalidSize { got: usize, expected: usize },

    #[error("invalid hex encoding for hash value")]
    InvalidHexEncoding(#[from] hex::FromHexError),
}

/// VeriBlock header hash, possibly truncated.
///
/// The bytes are kept in order, `len` of them being significant. The
/// unused tail is always zeroed so the derived comparisons hold.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VBlakeHash {
    len: u8,
    bytes: [u8; VBLAKE_HASH_LENGTH],
}

impl VBlakeHash {
    /// hash of a serialized VeriBlock header
    pub fn hash(data: &[u8]) -> Self {
        let mut bytes = [0; VBLAKE_HASH_LENGTH];
        let mut ctx = Blake2b::new(VBLAKE_HASH_LENGTH);
        ctx.input(data);
        ctx.result(&mut bytes);
        VBlakeHash {
            len: VBLAKE_HASH_LENGTH as u8,
            bytes,
        }
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, HashError> {
        if slice.is_empty() || slice.len() > VBLAKE_HASH_LENGTH {
            return Err(HashError::InvalidSize {
                got: slice.len(),
                expected: VBLAKE_HASH_LENGTH,
            });
        }
        let mut bytes = [0; VBLAKE_HASH_LENGTH];
        bytes[..slice.len()].copy_from_slice(slice);
        Ok(VBlakeHash {
            len: slice.len() as u8,
            bytes,
        })
    }

    /// a hash of `len` zero bytes
    ///
    /// # Panics
    ///
    /// if `len` is 0 or above the full hash length
    pub fn zero_of_size(len: usize) -> Self {
        assert!(len > 0 && len <= VBLAKE_HASH_LENGTH);
        VBlakeHash {
            len: len as u8,
            bytes: [0; VBLAKE_HASH_LENGTH],
        }
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// keep the last `size` bytes of the hash
    pub fn trim_to(&self, size: usize) -> Self {
        if size >= self.len() || size == 0 {
            return *self;
        }
        let bytes = self.as_bytes();
        let mut trimmed = [0; VBLAKE_HASH_LENGTH];
        trimmed[..size].copy_from_slice(&bytes[bytes.len() - size..]);
        VBlakeHash {
            len: size as u8,
            bytes: trimmed,
        }
    }

    pub fn trim_to_previous_block_size(&self) -> Self {
        self.trim_to(PREVIOUS_BLOCK_LENGTH)
    }

    pub fn trim_to_previous_keystone_size(&self) -> Self {
        self.trim_to(PREVIOUS_KEYSTONE_LENGTH)
    }

    pub fn ends_with(&self, suffix: &VBlakeHash) -> bool {
        self.as_bytes().ends_with(suffix.as_bytes())
    }

    /// compare the two hashes on their common length
    pub fn probably_equals(&self, other: &VBlakeHash) -> bool {
        let common = std::cmp::min(self.len(), other.len());
        self.trim_to(common) == other.trim_to(common)
    }

    pub fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }
}

impl BlockId for VBlakeHash {
    fn zero() -> Self {
        VBlakeHash::zero_of_size(VBLAKE_HASH_LENGTH)
    }

    fn is_zero(&self) -> bool {
        VBlakeHash::is_zero(self)
    }

    fn store_key(&self) -> Self {
        self.trim_to_previous_keystone_size()
    }

    fn matches(&self, stored: &Self) -> bool {
        self.probably_equals(stored)
    }
}

impl property::Serialize for VBlakeHash {
    fn serialize(&self, buf: &mut WriteBuf) {
        buf.put_sized_bytes(self.as_bytes())
    }
}

impl Readable for VBlakeHash {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        VBlakeHash::from_slice(buf.get_sized_slice()?)
            .map_err(|e| ReadError::StructureInvalid(e.to_string()))
    }
}

impl AsRef<[u8]> for VBlakeHash {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Display for VBlakeHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}

impl fmt::Debug for VBlakeHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "VBlakeHash({})", self)
    }
}

impl FromStr for VBlakeHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VBlakeHash::from_slice(&hex::decode(s)?)
    }
}

/// Bitcoin header hash, also used for VeriBlock merkle roots.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sha256Hash([u8; SHA256_HASH_LENGTH]);

impl Sha256Hash {
    /// the "no proof" sentinel
    pub const ZERO_HASH: Sha256Hash = Sha256Hash([0; SHA256_HASH_LENGTH]);

    pub fn hash(data: &[u8]) -> Self {
        let mut bytes = [0; SHA256_HASH_LENGTH];
        let mut ctx = Sha256::new();
        ctx.input(data);
        ctx.result(&mut bytes);
        Sha256Hash(bytes)
    }

    pub fn double_hash(data: &[u8]) -> Self {
        Self::hash(Self::hash(data).as_bytes())
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, HashError> {
        if slice.len() != SHA256_HASH_LENGTH {
            return Err(HashError::InvalidSize {
                got: slice.len(),
                expected: SHA256_HASH_LENGTH,
            });
        }
        let mut bytes = [0; SHA256_HASH_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Sha256Hash(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO_HASH
    }

    /// the leading bytes VeriBlock headers keep of their merkle root
    pub fn trim_to_veriblock_merkle_root(&self) -> VeriBlockMerkleRoot {
        let mut root = [0; VERIBLOCK_MERKLE_ROOT_LENGTH];
        root.copy_from_slice(&self.0[..VERIBLOCK_MERKLE_ROOT_LENGTH]);
        VeriBlockMerkleRoot(root)
    }
}

impl From<[u8; SHA256_HASH_LENGTH]> for Sha256Hash {
    fn from(bytes: [u8; SHA256_HASH_LENGTH]) -> Self {
        Sha256Hash(bytes)
    }
}

impl BlockId for Sha256Hash {
    fn zero() -> Self {
        Self::ZERO_HASH
    }

    fn is_zero(&self) -> bool {
        Sha256Hash::is_zero(self)
    }
}

impl property::Serialize for Sha256Hash {
    fn serialize(&self, buf: &mut WriteBuf) {
        buf.put_bytes(&self.0)
    }
}

impl Readable for Sha256Hash {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        <[u8; SHA256_HASH_LENGTH]>::read(buf).map(Sha256Hash)
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Sha256Hash({})", self)
    }
}

impl FromStr for Sha256Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sha256Hash::from_slice(&hex::decode(s)?)
    }
}

/// Merkle root as carried in VeriBlock headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VeriBlockMerkleRoot(pub [u8; VERIBLOCK_MERKLE_ROOT_LENGTH]);

impl VeriBlockMerkleRoot {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for VeriBlockMerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Identifier of an altchain block, left padded with zeros to 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockIdentifier([u8; BLOCK_IDENTIFIER_LENGTH]);

impl BlockIdentifier {
    pub fn wrap(value: &[u8]) -> Result<Self, HashError> {
        if value.len() > BLOCK_IDENTIFIER_LENGTH {
            return Err(HashError::InvalidSize {
                got: value.len(),
                expected: BLOCK_IDENTIFIER_LENGTH,
            });
        }
        let mut padded = [0; BLOCK_IDENTIFIER_LENGTH];
        padded[BLOCK_IDENTIFIER_LENGTH - value.len()..].copy_from_slice(value);
        Ok(BlockIdentifier(padded))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for BlockIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..]))
    }
}

impl fmt::Debug for BlockIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BlockIdentifier({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::property::testing::serialization_bijection;
    use quickcheck_macros::quickcheck;

    #[test]
    fn trimming_keeps_the_tail() {
        let hash = VBlakeHash::hash(b"veriblock");
        let keystone = hash.trim_to_previous_keystone_size();
        assert_eq!(keystone.len(), PREVIOUS_KEYSTONE_LENGTH);
        assert_eq!(keystone.as_bytes(), &hash.as_bytes()[15..]);
        assert!(hash.ends_with(&keystone));
        assert!(hash.ends_with(&hash.trim_to_previous_block_size()));
        // trimming never extends
        assert_eq!(keystone.trim_to(VBLAKE_HASH_LENGTH), keystone);
    }

    #[test]
    fn probable_equality_uses_the_common_suffix() {
        let hash = VBlakeHash::hash(b"a");
        let other = VBlakeHash::hash(b"b");
        assert!(hash.probably_equals(&hash.trim_to_previous_keystone_size()));
        assert!(hash
            .trim_to_previous_block_size()
            .probably_equals(&hash.trim_to_previous_keystone_size()));
        assert!(!hash.probably_equals(&other.trim_to_previous_keystone_size()));
    }

    #[test]
    fn store_key_is_keystone_sized() {
        let hash = VBlakeHash::hash(b"key");
        assert_eq!(hash.store_key(), hash.trim_to_previous_keystone_size());
        assert_eq!(
            hash.trim_to_previous_block_size().store_key(),
            hash.store_key()
        );
    }

    #[test]
    fn zero_hashes_of_any_size() {
        assert!(VBlakeHash::zero_of_size(PREVIOUS_BLOCK_LENGTH).is_zero());
        assert!(<VBlakeHash as BlockId>::zero().is_zero());
        assert!(!VBlakeHash::hash(b"").is_zero());
        assert!(Sha256Hash::ZERO_HASH.is_zero());
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert!(VBlakeHash::from_slice(&[]).is_err());
        assert!(VBlakeHash::from_slice(&[1; 25]).is_err());
        assert!(Sha256Hash::from_slice(&[1; 31]).is_err());
        assert!(BlockIdentifier::wrap(&[1; 65]).is_err());
    }

    #[test]
    fn hex_round_trip() {
        let hash = VBlakeHash::hash(b"hex");
        assert_eq!(hash.to_string().parse::<VBlakeHash>().unwrap(), hash);
        let sha = Sha256Hash::double_hash(b"hex");
        assert_eq!(sha.to_string().parse::<Sha256Hash>().unwrap(), sha);
    }

    #[test]
    fn block_identifier_is_left_padded() {
        let id = BlockIdentifier::wrap(&[1, 2, 3]).unwrap();
        assert_eq!(&id.as_bytes()[61..], &[1, 2, 3]);
        assert!(id.as_bytes()[..61].iter().all(|b| *b == 0));
        assert_eq!(id, BlockIdentifier::wrap(&[0, 1, 2, 3]).unwrap());
    }

    #[quickcheck]
    fn vblake_hash_serialization_bijection(hash: VBlakeHash) -> bool {
        serialization_bijection(hash)
    }
}
