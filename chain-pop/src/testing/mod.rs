pub mod arbitrary;
pub mod builders;

pub use arbitrary::*;
pub use builders::*;
