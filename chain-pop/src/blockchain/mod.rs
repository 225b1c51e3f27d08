//! VeriBlock blockchain
//!
//! Validates VeriBlock headers, indexes them in a `BlockStore` with their
//! chain work and keeps the chain head on the best chain. The best chain
//! is decided by the Bitcoin blocks holding the proof of proof
//! endorsements of the keystones (see `fork`).
//!
//! Every persistent mutation returns the list of `Change`s it made so
//! that the caller may later `rewind` it.
//!
//! Headers may also be added temporarily: they then live in a
//! `TemporalStore` overlaid on the persistent store until
//! `clear_temporary_modifications` is called. No persistent mutation is
//! accepted while temporary modifications are pending.

mod fork;
mod validation;

#[cfg(test)]
mod tests;

pub use fork::{proof_score, BITCOIN_FINALITY, FORK_WEIGHTS};
pub use validation::{check_difficulty, check_timestamp, MEDIAN_TIME_PAST_WINDOW};

use crate::block::{ValidationError, VeriBlockBlock, KEYSTONE_INTERVAL};
use crate::change::{ChainIdentifier, Change, Operation};
use crate::difficulty::{decode_compact_bits, RETARGET_PERIOD};
use crate::key::{
    Sha256Hash, VBlakeHash, VeriBlockMerkleRoot, PREVIOUS_BLOCK_LENGTH, PREVIOUS_KEYSTONE_LENGTH,
    VERIBLOCK_MERKLE_ROOT_LENGTH,
};
use crate::params::NetworkParameters;
use crate::stored::{StoredBitcoinBlock, StoredVeriBlockBlock};
use crate::temporal::{Mode, TemporalStore};
use chain_core::mempack::ReadError;
use chain_core::property::deserialize_from_slice;
use chain_storage::{BlockStore, MemoryBlockStore};
use num_bigint::BigUint;
use num_traits::One;

/// Consensus rule violation depending on the already known chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("block {block} does not fit, previous block {previous} is unknown")]
    BlockDoesNotFit {
        block: VBlakeHash,
        previous: VBlakeHash,
    },
    #[error("previous keystone {keystone} of block {block} is not found")]
    PreviousKeystoneNotFound {
        block: VBlakeHash,
        keystone: VBlakeHash,
    },
    #[error("second previous keystone {keystone} of block {block} is not found")]
    SecondPreviousKeystoneNotFound {
        block: VBlakeHash,
        keystone: VBlakeHash,
    },
    #[error("block timestamp {timestamp} is not after the median time past {median}")]
    TimestampTooOld { timestamp: u32, median: u32 },
    #[error("block difficulty {found:#010x} does not match the expected {expected:#010x}")]
    UnexpectedDifficulty { expected: u32, found: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid block header")]
    Validation(#[from] ValidationError),

    #[error("block verification failed")]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Store(#[from] chain_storage::Error),

    #[error("cannot {0} while having temporary modifications")]
    Precondition(&'static str),

    #[error("cannot decode the block of a change")]
    Codec(#[from] ReadError),
}

pub type Result<T> = core::result::Result<T, Error>;

/// blockchain over in-memory stores
pub type MemoryVeriBlockBlockchain = VeriBlockBlockchain<
    MemoryBlockStore<StoredVeriBlockBlock>,
    MemoryBlockStore<StoredBitcoinBlock>,
>;

/// The head change journaled the first time a chain head is set: its
/// prior value is this block, which is never stored.
fn placeholder_head() -> Result<StoredVeriBlockBlock> {
    let block = VeriBlockBlock::new(
        0,
        0,
        VBlakeHash::zero_of_size(PREVIOUS_BLOCK_LENGTH),
        VBlakeHash::zero_of_size(PREVIOUS_KEYSTONE_LENGTH),
        VBlakeHash::zero_of_size(PREVIOUS_KEYSTONE_LENGTH),
        VeriBlockMerkleRoot([0; VERIBLOCK_MERKLE_ROOT_LENGTH]),
        0,
        0,
        0,
    )?;
    Ok(StoredVeriBlockBlock::new(
        block,
        BigUint::one(),
        Sha256Hash::ZERO_HASH,
    ))
}

pub struct VeriBlockBlockchain<S, B> {
    store: S,
    bitcoin_store: B,
    params: NetworkParameters,
    mode: Mode,
}

impl<S, B> VeriBlockBlockchain<S, B>
where
    S: BlockStore<Block = StoredVeriBlockBlock>,
    B: BlockStore<Block = StoredBitcoinBlock>,
{
    pub fn new(params: NetworkParameters, store: S, bitcoin_store: B) -> Self {
        VeriBlockBlockchain {
            store,
            bitcoin_store,
            params,
            mode: Mode::Idle,
        }
    }

    pub fn params(&self) -> &NetworkParameters {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// the Bitcoin blocks the proofs are looked up in
    pub fn bitcoin_store(&self) -> &B {
        &self.bitcoin_store
    }

    pub fn bitcoin_store_mut(&mut self) -> &mut B {
        &mut self.bitcoin_store
    }

    pub fn has_temporary_modifications(&self) -> bool {
        self.mode.is_speculating()
    }

    fn ensure_no_temporary_modifications(&self, operation: &'static str) -> Result<()> {
        if self.has_temporary_modifications() {
            return Err(Error::Precondition(operation));
        }
        Ok(())
    }

    /// lookup a header, temporary ones included
    pub fn get(&self, hash: &VBlakeHash) -> Result<Option<VeriBlockBlock>> {
        Ok(self.get_internal(hash)?.map(|stored| stored.block))
    }

    /// lookup a header along with its work and proof, temporary ones included
    pub fn get_stored(&self, hash: &VBlakeHash) -> Result<Option<StoredVeriBlockBlock>> {
        self.get_internal(hash)
    }

    /// the persistent chain head
    pub fn chain_head(&self) -> Result<Option<StoredVeriBlockBlock>> {
        Ok(self.store.chain_head()?)
    }

    /// Look for `hash` on the best chain. While speculating the best
    /// chain starts at the temporary chain head.
    pub fn search_best_chain(&self, hash: &VBlakeHash) -> Result<Option<VeriBlockBlock>> {
        if !self.has_temporary_modifications() {
            return Ok(self.store.scan_best_chain(hash)?.map(|stored| stored.block));
        }

        let mut cursor = self.get_chain_head_internal()?;
        while let Some(current) = cursor {
            if hash.probably_equals(&current.hash()) {
                return Ok(Some(current.block));
            }
            let previous = current.block.previous_block();
            if previous.is_zero() {
                break;
            }
            cursor = self.get_internal(previous)?;
        }
        Ok(None)
    }

    pub fn add(&mut self, block: VeriBlockBlock) -> Result<Vec<Change>> {
        self.add_with_proof(block, Sha256Hash::ZERO_HASH)
    }

    /// Add a header endorsed in the Bitcoin block `block_of_proof`.
    ///
    /// Returns no change if the header is already known.
    pub fn add_with_proof(
        &mut self,
        block: VeriBlockBlock,
        block_of_proof: Sha256Hash,
    ) -> Result<Vec<Change>> {
        self.ensure_no_temporary_modifications("add a block")?;
        block.validate()?;

        let head = self.store.chain_head()?;
        let (work, previous_hash) = match head {
            None => (decode_compact_bits(block.difficulty())?, None),
            Some(_) => {
                if self.is_duplicate(&block)? {
                    return Ok(Vec::new());
                }
                let previous = self.check_connectivity(&block)?;
                self.verify_block(&block)?;
                (
                    &previous.work + decode_compact_bits(block.difficulty())?,
                    Some(previous.hash()),
                )
            }
        };

        let stored = StoredVeriBlockBlock::new(block, work, block_of_proof);
        self.store.put(stored.clone())?;
        let mut changes = vec![Change::add_veriblock_block(&stored)];

        let keystone = stored.block.effective_previous_keystone();
        changes.extend(self.try_set_block_proof(&keystone, &block_of_proof)?);
        if stored.block.round_index() == 1 {
            let keystone = *stored.block.previous_keystone();
            changes.extend(self.try_set_block_proof(&keystone, &block_of_proof)?);
        }

        let chain_head = self.store.chain_head()?;
        let promote = match &chain_head {
            None => true,
            Some(chain_head) => {
                Some(chain_head.hash()) == previous_hash
                    || self.resolve_to_fork(chain_head, &stored)?
            }
        };
        if promote {
            let prior = match self.store.set_chain_head(&stored)? {
                None => placeholder_head()?,
                Some(prior) => prior,
            };
            tracing::debug!(
                "chain head moved from {} to {} at height {}",
                prior.hash(),
                stored.hash(),
                stored.height()
            );
            changes.push(Change::set_veriblock_head(&prior, &stored));
        }

        Ok(changes)
    }

    /// Add the headers in height order. The changes of the headers
    /// added before a failure are not rewound.
    pub fn add_all(&mut self, mut blocks: Vec<VeriBlockBlock>) -> Result<Vec<Change>> {
        self.ensure_no_temporary_modifications("add blocks")?;
        blocks.sort_by_key(VeriBlockBlock::height);

        let mut changes = Vec::new();
        for block in blocks {
            changes.extend(self.add(block)?);
        }
        Ok(changes)
    }

    /// Attach the proof `block_of_proof` to a stored header and its
    /// keystones.
    pub fn set_block_of_proof(
        &mut self,
        block: &VeriBlockBlock,
        block_of_proof: &Sha256Hash,
    ) -> Result<Vec<Change>> {
        self.ensure_no_temporary_modifications("set a block of proof")?;

        let mut changes = Vec::new();
        changes.extend(self.try_set_block_proof(&block.hash(), block_of_proof)?);
        changes.extend(
            self.try_set_block_proof(&block.effective_previous_keystone(), block_of_proof)?,
        );
        if block.round_index() == 1 {
            changes.extend(self.try_set_block_proof(block.previous_keystone(), block_of_proof)?);
        }
        Ok(changes)
    }

    pub fn add_temporarily(&mut self, block: VeriBlockBlock) -> Result<()> {
        self.add_temporarily_with_proof(block, Sha256Hash::ZERO_HASH)
    }

    /// Add a header to the temporary overlay, leaving the store untouched.
    pub fn add_temporarily_with_proof(
        &mut self,
        block: VeriBlockBlock,
        block_of_proof: Sha256Hash,
    ) -> Result<()> {
        block.validate()?;

        let head = self.get_chain_head_internal()?;
        let (work, previous_hash) = match head {
            None => (decode_compact_bits(block.difficulty())?, None),
            Some(_) => {
                if self.is_duplicate(&block)? {
                    return Ok(());
                }
                let previous = self.check_connectivity(&block)?;
                self.verify_block(&block)?;
                (
                    &previous.work + decode_compact_bits(block.difficulty())?,
                    Some(previous.hash()),
                )
            }
        };

        let stored = StoredVeriBlockBlock::new(block, work, block_of_proof);
        self.mode.overlay_mut().put(stored.clone());

        self.try_set_block_proof_temporarily(
            &stored.block.effective_previous_keystone(),
            &block_of_proof,
        )?;
        if stored.block.round_index() == 1 {
            self.try_set_block_proof_temporarily(stored.block.previous_keystone(), &block_of_proof)?;
        }

        let promote = match self.get_chain_head_internal()? {
            None => true,
            Some(chain_head) => {
                Some(chain_head.hash()) == previous_hash
                    || self.resolve_to_fork(&chain_head, &stored)?
            }
        };
        if promote {
            self.mode.overlay_mut().set_head(stored);
        }
        Ok(())
    }

    /// Add the headers temporarily, in the given order.
    pub fn add_all_temporarily(&mut self, blocks: Vec<VeriBlockBlock>) -> Result<()> {
        for block in blocks {
            self.add_temporarily(block)?;
        }
        Ok(())
    }

    /// Attach the proof `block_of_proof` to a header and its keystones in
    /// the temporary overlay only.
    pub fn set_block_of_proof_temporarily(
        &mut self,
        block: &VeriBlockBlock,
        block_of_proof: &Sha256Hash,
    ) -> Result<()> {
        self.try_set_block_proof_temporarily(&block.hash(), block_of_proof)?;
        self.try_set_block_proof_temporarily(&block.effective_previous_keystone(), block_of_proof)?;
        if block.round_index() == 1 {
            self.try_set_block_proof_temporarily(block.previous_keystone(), block_of_proof)?;
        }
        Ok(())
    }

    pub fn clear_temporary_modifications(&mut self) {
        self.mode = Mode::Idle;
    }

    /// Undo the changes returned by the mutating operations, the last
    /// change first so the concatenated changes of `add_all` rewind too.
    ///
    /// Changes of other chains than VeriBlock are skipped.
    pub fn rewind(&mut self, changes: &[Change]) -> Result<()> {
        self.ensure_no_temporary_modifications("rewind changes")?;

        for change in changes.iter().rev() {
            if change.chain() != ChainIdentifier::VeriBlock {
                continue;
            }
            match change.operation() {
                Operation::AddBlock => {
                    let added: StoredVeriBlockBlock = deserialize_from_slice(change.new_value())?;
                    self.store.remove(&added.hash())?;
                    if !change.old_value().is_empty() {
                        let old: StoredVeriBlockBlock = deserialize_from_slice(change.old_value())?;
                        self.store.put(old)?;
                    }
                }
                Operation::SetHead => {
                    let prior: StoredVeriBlockBlock = deserialize_from_slice(change.old_value())?;
                    if prior == placeholder_head()? {
                        self.store.unset_chain_head()?;
                    } else {
                        self.store.set_chain_head(&prior)?;
                    }
                }
                Operation::SetProof => {
                    let prior: StoredVeriBlockBlock = deserialize_from_slice(change.old_value())?;
                    self.store.remove(&prior.hash())?;
                    self.store.put(prior)?;
                }
            }
        }
        Ok(())
    }

    fn get_internal(&self, hash: &VBlakeHash) -> Result<Option<StoredVeriBlockBlock>> {
        if let Some(stored) = self.mode.overlay().and_then(|overlay| overlay.get(hash)) {
            return Ok(Some(stored.clone()));
        }
        Ok(self.store.get(hash)?)
    }

    fn get_chain_head_internal(&self) -> Result<Option<StoredVeriBlockBlock>> {
        if let Some(head) = self.mode.overlay().and_then(TemporalStore::head) {
            return Ok(Some(head.clone()));
        }
        Ok(self.store.chain_head()?)
    }

    /// `count` blocks back from `hash`, through the overlay then the store
    fn get_chain_internal(&self, hash: &VBlakeHash, count: usize) -> Result<Vec<StoredVeriBlockBlock>> {
        let mut chain = Vec::new();
        let mut cursor = *hash;

        if let Some(overlay) = self.mode.overlay() {
            while chain.len() < count {
                let stored = match overlay.get(&cursor) {
                    None => break,
                    Some(stored) => stored.clone(),
                };
                cursor = *stored.block.previous_block();
                chain.push(stored);
                if cursor.is_zero() {
                    return Ok(chain);
                }
            }
        }

        if chain.len() < count {
            let remaining = count - chain.len();
            chain.extend(self.store.get_chain(&cursor, remaining)?);
        }
        Ok(chain)
    }

    fn is_duplicate(&self, block: &VeriBlockBlock) -> Result<bool> {
        if self.get_internal(&block.hash())?.is_some() {
            tracing::info!("block {} has already been added", block.hash());
            return Ok(true);
        }
        Ok(false)
    }

    /// Check the references of `block` resolve, or that the known chain
    /// is too short to tell. Returns the previous block.
    fn check_connectivity(&self, block: &VeriBlockBlock) -> Result<StoredVeriBlockBlock> {
        let previous = match self.get_internal(block.previous_block())? {
            None => {
                return Err(VerificationError::BlockDoesNotFit {
                    block: block.hash(),
                    previous: *block.previous_block(),
                }
                .into())
            }
            Some(previous) => previous,
        };

        let keystone_blocks_ago = match block.round_index() {
            0 => KEYSTONE_INTERVAL,
            1 => KEYSTONE_INTERVAL + 1,
            index => index,
        } as usize;

        if self.get_internal(block.previous_keystone())?.is_none()
            && self.knows_blocks_ago(block, keystone_blocks_ago)?
        {
            return Err(VerificationError::PreviousKeystoneNotFound {
                block: block.hash(),
                keystone: *block.previous_keystone(),
            }
            .into());
        }

        let second_keystone_blocks_ago = keystone_blocks_ago + KEYSTONE_INTERVAL as usize;
        if self.get_internal(block.second_previous_keystone())?.is_none()
            && self.knows_blocks_ago(block, second_keystone_blocks_ago)?
        {
            return Err(VerificationError::SecondPreviousKeystoneNotFound {
                block: block.hash(),
                keystone: *block.second_previous_keystone(),
            }
            .into());
        }

        Ok(previous)
    }

    /// whether the chain before `block` is known at least `blocks_ago` deep
    fn knows_blocks_ago(&self, block: &VeriBlockBlock, blocks_ago: usize) -> Result<bool> {
        Ok(self.get_chain_internal(block.previous_block(), blocks_ago)?.len() == blocks_ago)
    }

    fn verify_block(&self, block: &VeriBlockBlock) -> Result<()> {
        let context = self.get_chain_internal(block.previous_block(), RETARGET_PERIOD)?;
        check_timestamp(block, &context)?;
        check_difficulty(&self.params, block, &context)
    }

    /// Whether the Bitcoin block `candidate` is a better proof than the
    /// one `stored` already has: one earlier on the best Bitcoin chain.
    fn is_better_proof(&self, stored: &StoredVeriBlockBlock, candidate: &Sha256Hash) -> Result<bool> {
        if !stored.has_proof() {
            return Ok(true);
        }
        let candidate = match self.bitcoin_store.get(candidate)? {
            None => {
                tracing::debug!("block of proof {} is not a known Bitcoin block", candidate);
                return Ok(false);
            }
            Some(candidate) => candidate,
        };
        match self.bitcoin_store.scan_best_chain(&stored.block_of_proof)? {
            None => Ok(true),
            Some(incumbent) => Ok(incumbent.height > candidate.height),
        }
    }

    fn try_set_block_proof(
        &mut self,
        hash: &VBlakeHash,
        block_of_proof: &Sha256Hash,
    ) -> Result<Option<Change>> {
        if block_of_proof.is_zero() {
            return Ok(None);
        }
        let mut stored = match self.store.get(hash)? {
            None => return Ok(None),
            Some(stored) => stored,
        };
        if !self.is_better_proof(&stored, block_of_proof)? {
            return Ok(None);
        }

        stored.block_of_proof = *block_of_proof;
        let prior = match self.store.remove(&stored.hash())? {
            None => return Ok(None),
            Some(prior) => prior,
        };
        self.store.put(stored.clone())?;
        tracing::debug!("block {} proven in {}", stored.hash(), block_of_proof);
        Ok(Some(Change::set_veriblock_proof(&prior, &stored)))
    }

    fn try_set_block_proof_temporarily(
        &mut self,
        hash: &VBlakeHash,
        block_of_proof: &Sha256Hash,
    ) -> Result<()> {
        if block_of_proof.is_zero() {
            return Ok(());
        }
        let mut stored = match self.get_internal(hash)? {
            None => return Ok(()),
            Some(stored) => stored,
        };
        if self.is_better_proof(&stored, block_of_proof)? {
            stored.block_of_proof = *block_of_proof;
            self.mode.overlay_mut().put(stored);
        }
        Ok(())
    }
}
