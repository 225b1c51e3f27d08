pub mod error;
pub mod memory;
pub mod store;

pub use error::Error;
pub use memory::MemoryBlockStore;
pub use store::BlockStore;
