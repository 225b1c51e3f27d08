use super::error::Error;
use super::store::BlockStore;
use chain_core::property::{Block, BlockId};
use std::collections::HashMap;

/// Block store keeping everything in memory.
///
/// Blocks sharing the same `BlockId::store_key` are kept in insertion
/// order in the same bucket.
pub struct MemoryBlockStore<B>
where
    B: Block,
{
    blocks: HashMap<B::Id, Vec<B>>,
    chain_head: Option<B::Id>,
}

impl<B> MemoryBlockStore<B>
where
    B: Block,
{
    pub fn new() -> Self {
        MemoryBlockStore {
            blocks: HashMap::new(),
            chain_head: None,
        }
    }

    /// number of blocks stored
    pub fn len(&self) -> usize {
        self.blocks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<B> Default for MemoryBlockStore<B>
where
    B: Block,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<B> BlockStore for MemoryBlockStore<B>
where
    B: Block,
{
    type Block = B;

    fn get(&self, id: &B::Id) -> Result<Option<B>, Error> {
        let bucket = match self.blocks.get(&id.store_key()) {
            None => return Ok(None),
            Some(bucket) => bucket,
        };

        let mut candidates = bucket.iter().filter(|block| id.matches(&block.id()));
        let found = candidates.next();
        if found.is_some() && candidates.next().is_some() {
            tracing::warn!(
                "identifier {} matches more than one stored block, using the first one stored",
                id
            );
        }
        Ok(found.cloned())
    }

    fn put(&mut self, block: B) -> Result<(), Error> {
        let id = block.id();
        let bucket = self.blocks.entry(id.store_key()).or_insert_with(Vec::new);
        match bucket.iter_mut().find(|stored| stored.id() == id) {
            Some(stored) => *stored = block,
            None => bucket.push(block),
        }
        Ok(())
    }

    fn remove(&mut self, id: &B::Id) -> Result<Option<B>, Error> {
        let key = id.store_key();
        let bucket = match self.blocks.get_mut(&key) {
            None => return Ok(None),
            Some(bucket) => bucket,
        };

        let removed = bucket
            .iter()
            .position(|block| id.matches(&block.id()))
            .map(|index| bucket.remove(index));
        if bucket.is_empty() {
            self.blocks.remove(&key);
        }
        Ok(removed)
    }

    fn chain_head_id(&self) -> Result<Option<B::Id>, Error> {
        Ok(self.chain_head.clone())
    }

    fn put_chain_head_internal(&mut self, id: B::Id) -> Result<(), Error> {
        self.chain_head = Some(id);
        Ok(())
    }

    fn remove_chain_head_internal(&mut self) -> Result<(), Error> {
        self.chain_head = None;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.blocks.clear();
        self.chain_head = None;
        Ok(())
    }
}
