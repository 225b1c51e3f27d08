//! VeriBlock proof of proof header index.
//!
//! Keeps the VeriBlock headers an altchain learned about, decides the
//! best VeriBlock chain from the Bitcoin blocks their keystones were
//! endorsed in, and computes the PoP rewards owed to the miners of the
//! endorsements.

pub mod auditor;
pub mod block;
pub mod blockchain;
pub mod change;
pub mod difficulty;
pub mod key;
pub mod params;
pub mod rewards;
pub mod stored;
pub mod temporal;
pub mod value;

#[cfg(any(test, feature = "property-test-api"))]
pub mod testing;
