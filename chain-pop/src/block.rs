//! VeriBlock and Bitcoin headers.
//!
//! Headers are immutable values. Their hash is computed once, at
//! construction, from the serialized form.

use crate::difficulty;
use crate::key::{
    Sha256Hash, VBlakeHash, VeriBlockMerkleRoot, PREVIOUS_BLOCK_LENGTH, PREVIOUS_KEYSTONE_LENGTH,
};
use chain_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use chain_core::property::{self, Serialize as _};

/// every `KEYSTONE_INTERVAL` block is a keystone
pub const KEYSTONE_INTERVAL: u32 = 20;

pub const VERIBLOCK_HEADER_SIZE: usize = 64;
pub const BITCOIN_HEADER_SIZE: usize = 80;

/// Structural defects of a header, found without any chain context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("previous block hash must be at least 12 bytes, got {0}")]
    PreviousBlockTooShort(usize),

    #[error("previous keystone hash must be at least 9 bytes, got {0}")]
    PreviousKeystoneTooShort(usize),

    #[error("second previous keystone hash must be at least 9 bytes, got {0}")]
    SecondPreviousKeystoneTooShort(usize),

    #[error("difficulty {0:#010x} encodes a negative value")]
    NegativeDifficulty(u32),

    #[error("difficulty {0:#010x} encodes zero")]
    ZeroDifficulty(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VeriBlockBlock {
    height: u32,
    version: u16,
    previous_block: VBlakeHash,
    previous_keystone: VBlakeHash,
    second_previous_keystone: VBlakeHash,
    merkle_root: VeriBlockMerkleRoot,
    timestamp: u32,
    difficulty: u32,
    nonce: u32,
    hash: VBlakeHash,
}

impl VeriBlockBlock {
    /// Build a header, trimming the ancestor references to their
    /// canonical sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        height: u32,
        version: u16,
        previous_block: VBlakeHash,
        previous_keystone: VBlakeHash,
        second_previous_keystone: VBlakeHash,
        merkle_root: VeriBlockMerkleRoot,
        timestamp: u32,
        difficulty: u32,
        nonce: u32,
    ) -> Result<Self, ValidationError> {
        if previous_block.len() < PREVIOUS_BLOCK_LENGTH {
            return Err(ValidationError::PreviousBlockTooShort(previous_block.len()));
        }
        if previous_keystone.len() < PREVIOUS_KEYSTONE_LENGTH {
            return Err(ValidationError::PreviousKeystoneTooShort(
                previous_keystone.len(),
            ));
        }
        if second_previous_keystone.len() < PREVIOUS_KEYSTONE_LENGTH {
            return Err(ValidationError::SecondPreviousKeystoneTooShort(
                second_previous_keystone.len(),
            ));
        }

        let mut block = VeriBlockBlock {
            height,
            version,
            previous_block: previous_block.trim_to_previous_block_size(),
            previous_keystone: previous_keystone.trim_to_previous_keystone_size(),
            second_previous_keystone: second_previous_keystone.trim_to_previous_keystone_size(),
            merkle_root,
            timestamp,
            difficulty,
            nonce,
            hash: VBlakeHash::zero_of_size(PREVIOUS_BLOCK_LENGTH),
        };
        block.hash = VBlakeHash::hash(&block.serialize_as_vec());
        Ok(block)
    }

    pub fn hash(&self) -> VBlakeHash {
        self.hash
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn previous_block(&self) -> &VBlakeHash {
        &self.previous_block
    }

    pub fn previous_keystone(&self) -> &VBlakeHash {
        &self.previous_keystone
    }

    pub fn second_previous_keystone(&self) -> &VBlakeHash {
        &self.second_previous_keystone
    }

    pub fn merkle_root(&self) -> &VeriBlockMerkleRoot {
        &self.merkle_root
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// compact encoded difficulty
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    /// position of the block within its keystone period
    pub fn round_index(&self) -> u32 {
        self.height % KEYSTONE_INTERVAL
    }

    pub fn is_keystone(&self) -> bool {
        self.round_index() == 0
    }

    pub fn keystone_index(&self) -> u32 {
        self.height / KEYSTONE_INTERVAL
    }

    /// The ancestor fork resolution aligns on.
    ///
    /// Right after a keystone this is the keystone itself, which is then
    /// the previous block.
    pub fn effective_previous_keystone(&self) -> VBlakeHash {
        if self.round_index() == 1 {
            self.previous_block.trim_to_previous_keystone_size()
        } else {
            self.previous_keystone
        }
    }

    /// lightweight, context free, checks of the header
    pub fn validate(&self) -> Result<(), ValidationError> {
        difficulty::decode_compact_bits(self.difficulty).map(|_| ())
    }
}

impl property::Block for VeriBlockBlock {
    type Id = VBlakeHash;

    fn id(&self) -> Self::Id {
        self.hash
    }

    fn parent_id(&self) -> Self::Id {
        self.previous_block
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl property::Serialize for VeriBlockBlock {
    fn serialize(&self, buf: &mut WriteBuf) {
        buf.put_u32(self.height);
        buf.put_u16(self.version);
        buf.put_bytes(self.previous_block.as_bytes());
        buf.put_bytes(self.previous_keystone.as_bytes());
        buf.put_bytes(self.second_previous_keystone.as_bytes());
        buf.put_bytes(self.merkle_root.as_bytes());
        buf.put_u32(self.timestamp);
        buf.put_u32(self.difficulty);
        buf.put_u32(self.nonce);
    }
}

impl Readable for VeriBlockBlock {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        let height = buf.get_u32()?;
        let version = buf.get_u16()?;
        let previous_block = read_vblake(buf, PREVIOUS_BLOCK_LENGTH)?;
        let previous_keystone = read_vblake(buf, PREVIOUS_KEYSTONE_LENGTH)?;
        let second_previous_keystone = read_vblake(buf, PREVIOUS_KEYSTONE_LENGTH)?;
        let merkle_root = VeriBlockMerkleRoot(<[u8; 16]>::read(buf)?);
        let timestamp = buf.get_u32()?;
        let difficulty = buf.get_u32()?;
        let nonce = buf.get_u32()?;

        VeriBlockBlock::new(
            height,
            version,
            previous_block,
            previous_keystone,
            second_previous_keystone,
            merkle_root,
            timestamp,
            difficulty,
            nonce,
        )
        .map_err(|e| ReadError::StructureInvalid(e.to_string()))
    }
}

fn read_vblake(buf: &mut ReadBuf, size: usize) -> Result<VBlakeHash, ReadError> {
    VBlakeHash::from_slice(buf.get_slice(size)?)
        .map_err(|e| ReadError::StructureInvalid(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinBlock {
    version: u32,
    previous_block: Sha256Hash,
    merkle_root: Sha256Hash,
    timestamp: u32,
    bits: u32,
    nonce: u32,
    hash: Sha256Hash,
}

impl BitcoinBlock {
    pub fn new(
        version: u32,
        previous_block: Sha256Hash,
        merkle_root: Sha256Hash,
        timestamp: u32,
        bits: u32,
        nonce: u32,
    ) -> Self {
        let mut block = BitcoinBlock {
            version,
            previous_block,
            merkle_root,
            timestamp,
            bits,
            nonce,
            hash: Sha256Hash::ZERO_HASH,
        };
        block.hash = Sha256Hash::double_hash(&block.serialize_as_vec());
        block
    }

    pub fn hash(&self) -> Sha256Hash {
        self.hash
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn previous_block(&self) -> &Sha256Hash {
        &self.previous_block
    }

    pub fn merkle_root(&self) -> &Sha256Hash {
        &self.merkle_root
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }
}

impl property::Serialize for BitcoinBlock {
    fn serialize(&self, buf: &mut WriteBuf) {
        buf.put_u32(self.version);
        buf.put_bytes(self.previous_block.as_bytes());
        buf.put_bytes(self.merkle_root.as_bytes());
        buf.put_u32(self.timestamp);
        buf.put_u32(self.bits);
        buf.put_u32(self.nonce);
    }
}

impl Readable for BitcoinBlock {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        let version = buf.get_u32()?;
        let previous_block = Sha256Hash::read(buf)?;
        let merkle_root = Sha256Hash::read(buf)?;
        let timestamp = buf.get_u32()?;
        let bits = buf.get_u32()?;
        let nonce = buf.get_u32()?;
        Ok(BitcoinBlock::new(
            version,
            previous_block,
            merkle_root,
            timestamp,
            bits,
            nonce,
        ))
    }
}
