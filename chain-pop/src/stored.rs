//! Headers as kept by the block stores, along with their chain work.

use crate::block::{BitcoinBlock, VeriBlockBlock};
use crate::key::{Sha256Hash, VBlakeHash};
use chain_core::mempack::{ReadBuf, ReadError, Readable, WriteBuf};
use chain_core::property::{self, Serialize as _};
use num_bigint::BigUint;

fn put_work(buf: &mut WriteBuf, work: &BigUint) {
    buf.put_sized_bytes(&work.to_bytes_be())
}

fn get_work(buf: &mut ReadBuf) -> Result<BigUint, ReadError> {
    Ok(BigUint::from_bytes_be(buf.get_sized_slice()?))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVeriBlockBlock {
    pub block: VeriBlockBlock,
    /// cumulated difficulty from the origin block, this one included
    pub work: BigUint,
    /// Bitcoin block holding the best known endorsement of this block,
    /// `Sha256Hash::ZERO_HASH` when not endorsed yet
    pub block_of_proof: Sha256Hash,
}

impl StoredVeriBlockBlock {
    pub fn new(block: VeriBlockBlock, work: BigUint, block_of_proof: Sha256Hash) -> Self {
        StoredVeriBlockBlock {
            block,
            work,
            block_of_proof,
        }
    }

    pub fn hash(&self) -> VBlakeHash {
        self.block.hash()
    }

    pub fn height(&self) -> u32 {
        self.block.height()
    }

    pub fn keystone_index(&self) -> u32 {
        self.block.keystone_index()
    }

    pub fn has_proof(&self) -> bool {
        !self.block_of_proof.is_zero()
    }
}

impl property::Block for StoredVeriBlockBlock {
    type Id = VBlakeHash;

    fn id(&self) -> Self::Id {
        self.block.hash()
    }

    fn parent_id(&self) -> Self::Id {
        *self.block.previous_block()
    }

    fn height(&self) -> u32 {
        self.block.height()
    }
}

impl property::Serialize for StoredVeriBlockBlock {
    fn serialize(&self, buf: &mut WriteBuf) {
        self.block.serialize(buf);
        put_work(buf, &self.work);
        self.block_of_proof.serialize(buf);
    }
}

impl Readable for StoredVeriBlockBlock {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        let block = VeriBlockBlock::read(buf)?;
        let work = get_work(buf)?;
        let block_of_proof = Sha256Hash::read(buf)?;
        Ok(StoredVeriBlockBlock::new(block, work, block_of_proof))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBitcoinBlock {
    pub block: BitcoinBlock,
    pub work: BigUint,
    pub height: u32,
}

impl StoredBitcoinBlock {
    pub fn new(block: BitcoinBlock, work: BigUint, height: u32) -> Self {
        StoredBitcoinBlock {
            block,
            work,
            height,
        }
    }

    pub fn hash(&self) -> Sha256Hash {
        self.block.hash()
    }
}

impl property::Block for StoredBitcoinBlock {
    type Id = Sha256Hash;

    fn id(&self) -> Self::Id {
        self.block.hash()
    }

    fn parent_id(&self) -> Self::Id {
        *self.block.previous_block()
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl property::Serialize for StoredBitcoinBlock {
    fn serialize(&self, buf: &mut WriteBuf) {
        self.block.serialize(buf);
        put_work(buf, &self.work);
        buf.put_u32(self.height);
    }
}

impl Readable for StoredBitcoinBlock {
    fn read<'a>(buf: &mut ReadBuf<'a>) -> Result<Self, ReadError> {
        let block = BitcoinBlock::read(buf)?;
        let work = get_work(buf)?;
        let height = buf.get_u32()?;
        Ok(StoredBitcoinBlock::new(block, work, height))
    }
}
