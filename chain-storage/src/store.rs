use super::error::Error;
use chain_core::property::{Block, BlockId};

/// Persisted index over the blocks of one chain.
///
/// Blocks are keyed by their identifier, see `BlockId::store_key` for
/// chains that reference their ancestors by truncated hashes. On top of
/// the blocks the store keeps a pointer to the current chain head.
///
/// The store does not validate anything about the blocks it is given,
/// this is the job of the blockchain owning it.
pub trait BlockStore {
    type Block: Block;

    /// lookup the block designated by `id`, returns `None` if absent.
    fn get(&self, id: &<Self::Block as Block>::Id) -> Result<Option<Self::Block>, Error>;

    /// Write a block to the store, replacing any block stored with the
    /// same identifier.
    fn put(&mut self, block: Self::Block) -> Result<(), Error>;

    /// Delete the block designated by `id` and return it.
    ///
    /// This is the primitive the change journal calls "replace": the
    /// rewinding of a change first deletes the entry and then puts back
    /// the prior value, if there was one.
    fn remove(&mut self, id: &<Self::Block as Block>::Id)
        -> Result<Option<Self::Block>, Error>;

    /// identifier of the current chain head, as recorded by the backend
    fn chain_head_id(&self) -> Result<Option<<Self::Block as Block>::Id>, Error>;

    /// record the chain head pointer, the block is known to be stored
    fn put_chain_head_internal(&mut self, id: <Self::Block as Block>::Id) -> Result<(), Error>;

    /// forget the chain head pointer
    fn remove_chain_head_internal(&mut self) -> Result<(), Error>;

    /// remove all blocks and the chain head
    fn clear(&mut self) -> Result<(), Error>;

    fn contains(&self, id: &<Self::Block as Block>::Id) -> Result<bool, Error> {
        Ok(self.get(id)?.is_some())
    }

    /// the current chain head. `None` if never set, or if the block it
    /// points to has been removed since.
    fn chain_head(&self) -> Result<Option<Self::Block>, Error> {
        match self.chain_head_id()? {
            None => Ok(None),
            Some(id) => self.get(&id),
        }
    }

    /// Move the chain head to `block` and return the previous one.
    ///
    /// The block must have been `put` before.
    fn set_chain_head(&mut self, block: &Self::Block) -> Result<Option<Self::Block>, Error> {
        let id = block.id();
        if !self.contains(&id)? {
            return Err(Error::ChainHeadNotStored(id.to_string()));
        }

        let previous = self.chain_head()?;
        self.put_chain_head_internal(id)?;
        Ok(previous)
    }

    /// Reset the store to the state where no chain head was ever set and
    /// return the previous one.
    fn unset_chain_head(&mut self) -> Result<Option<Self::Block>, Error> {
        let previous = self.chain_head()?;
        self.remove_chain_head_internal()?;
        Ok(previous)
    }

    /// Walk the chain backward from `id`, newest first.
    ///
    /// Stops once `count` blocks are collected, at the origin block or at
    /// the first missing ancestor. The returned list may be shorter than
    /// `count`, callers must check its length.
    fn get_chain(
        &self,
        id: &<Self::Block as Block>::Id,
        count: usize,
    ) -> Result<Vec<Self::Block>, Error> {
        let mut blocks = Vec::new();
        let mut cursor = id.clone();

        while blocks.len() < count {
            let current = match self.get(&cursor)? {
                None => break,
                Some(current) => current,
            };
            let parent = current.parent_id();
            blocks.push(current);

            if parent.is_zero() {
                break;
            }
            cursor = parent;
        }

        Ok(blocks)
    }

    /// the block `blocks_ago` blocks before the block `id`, `None` if the
    /// known chain is not long enough
    fn get_from_chain(
        &self,
        id: &<Self::Block as Block>::Id,
        blocks_ago: usize,
    ) -> Result<Option<Self::Block>, Error> {
        let mut blocks = self.get_chain(id, blocks_ago + 1)?;
        if blocks.len() < blocks_ago + 1 {
            return Ok(None);
        }
        Ok(Some(blocks.swap_remove(blocks_ago)))
    }

    /// Look for `id` on the path from the chain head back to the origin
    /// block.
    fn scan_best_chain(
        &self,
        id: &<Self::Block as Block>::Id,
    ) -> Result<Option<Self::Block>, Error> {
        let mut current = match self.chain_head()? {
            None => return Ok(None),
            Some(head) => head,
        };

        loop {
            if id.matches(&current.id()) {
                return Ok(Some(current));
            }

            let parent = current.parent_id();
            if parent.is_zero() {
                return Ok(None);
            }

            current = match self.get(&parent)? {
                None => return Ok(None),
                Some(block) => block,
            };
        }
    }
}
