//! Fork resolution between the current chain head and a candidate block.
//!
//! Both chains are walked back keystone by keystone down to their common
//! keystone. The keystones collected on each side are then compared by
//! the Bitcoin blocks their endorsements were published in:
//!
//! ```text
//!                 k'--------k'----c   [candidate]
//!                /
//! o----k----k---k-------k-------k---h [chain head]
//! ```
//!
//! the earlier a keystone was endorsed on Bitcoin relative to its
//! competitor, the more it scores.

use super::{Result, VeriBlockBlockchain};
use crate::stored::{StoredBitcoinBlock, StoredVeriBlockBlock};
use chain_storage::BlockStore;
use std::cmp::Ordering;

/// number of Bitcoin blocks past the previous proof a proof may be
/// published at and still count
pub const BITCOIN_FINALITY: u32 = 11;

/// score of a proof, by how many Bitcoin blocks it trails the proof of
/// the competing chain
pub const FORK_WEIGHTS: [u32; 9] = [100, 100, 95, 89, 80, 69, 56, 40, 21];

/// score of `proof` against the proof of the competing chain at the same
/// position
pub fn proof_score(proof: Option<&StoredBitcoinBlock>, other: Option<&StoredBitcoinBlock>) -> u32 {
    match (proof, other) {
        (None, _) => 0,
        (Some(_), None) => FORK_WEIGHTS[0],
        (Some(proof), Some(other)) => {
            let offset = std::cmp::min(proof.height, other.height);
            FORK_WEIGHTS
                .get((proof.height - offset) as usize)
                .copied()
                .unwrap_or(0)
        }
    }
}

impl<S, B> VeriBlockBlockchain<S, B>
where
    S: BlockStore<Block = StoredVeriBlockBlock>,
    B: BlockStore<Block = StoredBitcoinBlock>,
{
    /// check whether `candidate` should replace `chain_head`
    pub(super) fn resolve_to_fork(
        &self,
        chain_head: &StoredVeriBlockBlock,
        candidate: &StoredVeriBlockBlock,
    ) -> Result<bool> {
        if chain_head
            .block
            .effective_previous_keystone()
            .probably_equals(&candidate.block.effective_previous_keystone())
            && candidate.work > chain_head.work
        {
            return Ok(true);
        }

        let mut best_cursor = chain_head.clone();
        let mut candidate_cursor = candidate.clone();
        let mut best_chain = Vec::new();
        let mut candidate_chain = Vec::new();
        if best_cursor.block.is_keystone() {
            best_chain.push(best_cursor.clone());
        }
        if candidate_cursor.block.is_keystone() {
            candidate_chain.push(candidate_cursor.clone());
        }

        while best_cursor.hash() != candidate_cursor.hash() {
            let best_index = best_cursor.keystone_index();
            let candidate_index = candidate_cursor.keystone_index();

            if best_index >= candidate_index {
                best_cursor = match self.get_internal(&best_cursor.block.effective_previous_keystone())? {
                    None => return Ok(false),
                    Some(block) => block,
                };
                best_chain.push(best_cursor.clone());
            }
            if candidate_index >= best_index {
                candidate_cursor =
                    match self.get_internal(&candidate_cursor.block.effective_previous_keystone())? {
                        None => return Ok(false),
                        Some(block) => block,
                    };
                candidate_chain.push(candidate_cursor.clone());
            }
        }

        Ok(self.compare_chains(candidate_chain, best_chain)? == Ordering::Greater)
    }

    /// Score two keystone chains of the same fork against each other,
    /// `Ordering::Greater` when the candidate wins.
    pub(super) fn compare_chains(
        &self,
        mut candidate: Vec<StoredVeriBlockBlock>,
        mut incumbent: Vec<StoredVeriBlockBlock>,
    ) -> Result<Ordering> {
        incumbent.sort_by_key(StoredVeriBlockBlock::height);
        candidate.sort_by_key(StoredVeriBlockBlock::height);

        let mut incumbent_score = 0;
        let mut candidate_score = 0;
        let mut last_incumbent_proof = None;
        let mut last_candidate_proof = None;

        for i in 0..std::cmp::max(incumbent.len(), candidate.len()) {
            let incumbent_proof = match incumbent.get(i) {
                None => None,
                Some(block) => self.keystone_proof(block, last_incumbent_proof.as_ref())?,
            };
            let candidate_proof = match candidate.get(i) {
                None => None,
                Some(block) => self.keystone_proof(block, last_candidate_proof.as_ref())?,
            };

            incumbent_score += proof_score(incumbent_proof.as_ref(), candidate_proof.as_ref());
            candidate_score += proof_score(candidate_proof.as_ref(), incumbent_proof.as_ref());

            last_incumbent_proof = incumbent_proof;
            last_candidate_proof = candidate_proof;
        }

        tracing::debug!(
            candidate_score,
            incumbent_score,
            "compared keystone chains"
        );
        Ok(candidate_score.cmp(&incumbent_score))
    }

    /// The Bitcoin block on the best Bitcoin chain holding the proof of
    /// `keystone`. A proof published too long after the previous one of
    /// the same chain is ignored.
    fn keystone_proof(
        &self,
        keystone: &StoredVeriBlockBlock,
        last_proof: Option<&StoredBitcoinBlock>,
    ) -> Result<Option<StoredBitcoinBlock>> {
        let stored = match self.get_internal(&keystone.hash())? {
            None => return Ok(None),
            Some(stored) => stored,
        };
        if !stored.has_proof() {
            return Ok(None);
        }

        let proof = self.bitcoin_store.scan_best_chain(&stored.block_of_proof)?;
        match (proof, last_proof) {
            (Some(proof), Some(last))
                if last.height.saturating_add(BITCOIN_FINALITY) < proof.height =>
            {
                Ok(None)
            }
            (proof, _) => Ok(proof),
        }
    }
}
