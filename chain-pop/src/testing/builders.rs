use crate::block::{BitcoinBlock, VeriBlockBlock, KEYSTONE_INTERVAL};
use crate::difficulty::{decode_compact_bits, TARGET_BLOCK_TIME};
use crate::key::{Sha256Hash, VBlakeHash, PREVIOUS_BLOCK_LENGTH, PREVIOUS_KEYSTONE_LENGTH};
use crate::stored::{StoredBitcoinBlock, StoredVeriBlockBlock};
use num_bigint::BigUint;
use num_traits::Zero;

/// 100_000_000, the testnet minimum difficulty
pub const DEFAULT_DIFFICULTY: u32 = 0x0405_f5e1;
pub const BITCOIN_BITS: u32 = 0x1d00_ffff;
pub const GENESIS_TIMESTAMP: u32 = 1_553_699_059;

/// height of the previous keystone a block at `height` references
pub fn previous_keystone_height(height: u32) -> Option<u32> {
    if height < 2 {
        None
    } else {
        Some(((height - 2) / KEYSTONE_INTERVAL) * KEYSTONE_INTERVAL)
    }
}

/// Build a linear VeriBlock chain starting from an origin block at
/// height 0.
///
/// Cloning the builder, then changing its salt with `fork`, gives a
/// competing branch from the current tip.
#[derive(Debug, Clone)]
pub struct VeriBlockChainBuilder {
    blocks: Vec<VeriBlockBlock>,
    work: BigUint,
    spacing: u32,
    difficulty: u32,
    salt: u32,
}

impl VeriBlockChainBuilder {
    pub fn new() -> Self {
        VeriBlockChainBuilder {
            blocks: Vec::new(),
            work: BigUint::zero(),
            spacing: TARGET_BLOCK_TIME as u32,
            difficulty: DEFAULT_DIFFICULTY,
            salt: 0,
        }
    }

    pub fn with_spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// a branch from the current tip, its blocks differing by their nonce
    pub fn fork(&self, salt: u32) -> Self {
        let mut fork = self.clone();
        fork.salt = salt;
        fork
    }

    pub fn blocks(&self) -> &[VeriBlockBlock] {
        &self.blocks
    }

    pub fn tip(&self) -> Option<&VeriBlockBlock> {
        self.blocks.last()
    }

    pub fn at(&self, height: u32) -> &VeriBlockBlock {
        &self.blocks[height as usize]
    }

    fn next_height(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn keystone_hash(&self, height: Option<u32>) -> VBlakeHash {
        match height {
            Some(height) => self.at(height).hash(),
            None => VBlakeHash::zero_of_size(PREVIOUS_KEYSTONE_LENGTH),
        }
    }

    /// the next header, not appended to the chain
    pub fn peek_with_timestamp(&self, timestamp: u32) -> VeriBlockBlock {
        let height = self.next_height();
        let previous = self
            .tip()
            .map(VeriBlockBlock::hash)
            .unwrap_or_else(|| VBlakeHash::zero_of_size(PREVIOUS_BLOCK_LENGTH));
        let keystone = previous_keystone_height(height);
        let second_keystone = keystone.and_then(|height| height.checked_sub(KEYSTONE_INTERVAL));

        VeriBlockBlock::new(
            height,
            2,
            previous,
            self.keystone_hash(keystone),
            self.keystone_hash(second_keystone),
            Sha256Hash::hash(&height.to_be_bytes()).trim_to_veriblock_merkle_root(),
            timestamp,
            self.difficulty,
            self.salt,
        )
        .expect("builder produces well formed headers")
    }

    pub fn peek(&self) -> VeriBlockBlock {
        self.peek_with_timestamp(self.next_timestamp())
    }

    fn next_timestamp(&self) -> u32 {
        GENESIS_TIMESTAMP + self.next_height() * self.spacing
    }

    pub fn next_with_timestamp(&mut self, timestamp: u32) -> VeriBlockBlock {
        let block = self.peek_with_timestamp(timestamp);
        self.work += decode_compact_bits(block.difficulty()).expect("valid difficulty");
        self.blocks.push(block.clone());
        block
    }

    pub fn next(&mut self) -> VeriBlockBlock {
        self.next_with_timestamp(self.next_timestamp())
    }

    /// the next block with the work a blockchain would compute for it
    pub fn next_stored(&mut self) -> StoredVeriBlockBlock {
        let block = self.next();
        StoredVeriBlockBlock::new(block, self.work.clone(), Sha256Hash::ZERO_HASH)
    }

    pub fn chain(&mut self, count: usize) -> Vec<VeriBlockBlock> {
        (0..count).map(|_| self.next()).collect()
    }
}

impl Default for VeriBlockChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a linear Bitcoin chain from an arbitrary start height.
#[derive(Debug, Clone)]
pub struct BitcoinChainBuilder {
    blocks: Vec<StoredBitcoinBlock>,
    start_height: u32,
}

impl BitcoinChainBuilder {
    pub fn new(start_height: u32) -> Self {
        BitcoinChainBuilder {
            blocks: Vec::new(),
            start_height,
        }
    }

    pub fn blocks(&self) -> &[StoredBitcoinBlock] {
        &self.blocks
    }

    pub fn next(&mut self) -> StoredBitcoinBlock {
        let height = self.start_height + self.blocks.len() as u32;
        let (previous, work) = match self.blocks.last() {
            None => (Sha256Hash::ZERO_HASH, BigUint::zero()),
            Some(tip) => (tip.hash(), tip.work.clone()),
        };
        let block = BitcoinBlock::new(
            0x2000_0000,
            previous,
            Sha256Hash::hash(&height.to_be_bytes()),
            GENESIS_TIMESTAMP + height * 600,
            BITCOIN_BITS,
            height,
        );
        let work = work + decode_compact_bits(BITCOIN_BITS).expect("valid difficulty");
        let stored = StoredBitcoinBlock::new(block, work, height);
        self.blocks.push(stored.clone());
        stored
    }

    pub fn chain(&mut self, count: usize) -> Vec<StoredBitcoinBlock> {
        (0..count).map(|_| self.next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::property::BlockId;

    #[test]
    fn keystone_references() {
        let mut builder = VeriBlockChainBuilder::new();
        let blocks = builder.chain(45);

        assert!(blocks[1].previous_keystone().is_zero());
        assert!(blocks[21].previous_keystone().probably_equals(&blocks[0].hash()));
        assert!(blocks[21].second_previous_keystone().is_zero());
        assert!(blocks[42].previous_keystone().probably_equals(&blocks[40].hash()));
        assert!(blocks[42]
            .second_previous_keystone()
            .probably_equals(&blocks[20].hash()));
        assert!(blocks[41]
            .effective_previous_keystone()
            .probably_equals(&blocks[40].hash()));
    }

    #[test]
    fn forks_differ_from_the_main_chain() {
        let mut builder = VeriBlockChainBuilder::new();
        builder.chain(3);
        let mut fork = builder.fork(1);
        let main = builder.next();
        let other = fork.next();
        assert_eq!(main.previous_block(), other.previous_block());
        assert_ne!(main.hash(), other.hash());
        assert!(!main.hash().store_key().is_zero());
    }
}
