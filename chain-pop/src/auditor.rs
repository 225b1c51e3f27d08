//! Record of the changes applied on behalf of each altchain block.
//!
//! When an altchain block carrying VeriBlock and Bitcoin context is
//! accepted, the changes it caused are recorded under its identifier.
//! Disconnecting the altchain block takes them back for rewinding.

use crate::change::Change;
use crate::key::BlockIdentifier;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditedChange {
    /// position of the change among all the recorded ones
    pub sequence: u64,
    pub change: Change,
}

#[derive(Debug, Default)]
pub struct Auditor {
    journal: BTreeMap<BlockIdentifier, Vec<AuditedChange>>,
    next_sequence: u64,
}

impl Auditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// append `changes` to the ones already recorded for `block`
    pub fn record<I>(&mut self, block: BlockIdentifier, changes: I)
    where
        I: IntoIterator<Item = Change>,
    {
        let entries = self.journal.entry(block).or_insert_with(Vec::new);
        for change in changes {
            entries.push(AuditedChange {
                sequence: self.next_sequence,
                change,
            });
            self.next_sequence += 1;
        }
        tracing::debug!(
            "{} changes recorded for block {}",
            entries.len(),
            block
        );
    }

    pub fn changes(&self, block: &BlockIdentifier) -> &[AuditedChange] {
        self.journal
            .get(block)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Forget the changes recorded for `block` and return them in the
    /// order they were applied, ready to be rewound.
    pub fn take(&mut self, block: &BlockIdentifier) -> Vec<Change> {
        self.journal
            .remove(block)
            .unwrap_or_default()
            .into_iter()
            .map(|audited| audited.change)
            .collect()
    }

    pub fn contains(&self, block: &BlockIdentifier) -> bool {
        self.journal.contains_key(block)
    }

    pub fn clear(&mut self) {
        self.journal.clear();
    }
}
