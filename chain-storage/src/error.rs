#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("chain head should reference existing block, `{0}` is not stored")]
    ChainHeadNotStored(String),

    /// failure of the underlying storage engine
    #[error(transparent)]
    BackendError(Box<dyn std::error::Error + Send + Sync>),
}
