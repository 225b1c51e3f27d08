//! Temporal store
//!
//! Speculative blocks layered over the persistent VeriBlock store. The
//! overlay is keyed, like the store, by the keystone sized suffix of the
//! block hashes and may carry its own chain head.
//!
//! ```text
//!                      ,-t-t [temporary head]
//!                     /
//! o----o----o--o--o--o-o [store head]
//! ```
//!
//! Nothing in the overlay is ever written to the store: it is dropped as
//! a whole once the speculation is over.

use crate::key::VBlakeHash;
use crate::stored::StoredVeriBlockBlock;
use chain_core::property::BlockId;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct TemporalStore {
    blocks: HashMap<VBlakeHash, StoredVeriBlockBlock>,
    head: Option<StoredVeriBlockBlock>,
}

impl TemporalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// insert or overwrite a block
    pub fn put(&mut self, block: StoredVeriBlockBlock) {
        self.blocks.insert(block.hash().store_key(), block);
    }

    pub fn get(&self, hash: &VBlakeHash) -> Option<&StoredVeriBlockBlock> {
        self.blocks
            .get(&hash.store_key())
            .filter(|stored| hash.matches(&stored.hash()))
    }

    pub fn head(&self) -> Option<&StoredVeriBlockBlock> {
        self.head.as_ref()
    }

    pub fn set_head(&mut self, head: StoredVeriBlockBlock) {
        self.head = Some(head);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.head.is_none()
    }
}

/// Whether the blockchain is speculating.
///
/// Persistent mutations are refused while `Speculating`.
#[derive(Debug, Clone)]
pub enum Mode {
    Idle,
    Speculating(TemporalStore),
}

impl Mode {
    pub fn is_speculating(&self) -> bool {
        match self {
            Mode::Idle => false,
            Mode::Speculating(overlay) => !overlay.is_empty(),
        }
    }

    pub fn overlay(&self) -> Option<&TemporalStore> {
        match self {
            Mode::Idle => None,
            Mode::Speculating(overlay) => Some(overlay),
        }
    }

    /// the overlay, starting a speculation if needed
    pub fn overlay_mut(&mut self) -> &mut TemporalStore {
        if let Mode::Idle = self {
            *self = Mode::Speculating(TemporalStore::new());
        }
        match self {
            Mode::Speculating(overlay) => overlay,
            Mode::Idle => unreachable!(),
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Idle
    }
}
