//! Context dependent checks of a VeriBlock header.
//!
//! `context` is always the chain ending at the parent of the checked
//! block, newest first. A check that needs more context than is known
//! is skipped: the chain simply does not have enough history yet.

use super::{Error, VerificationError};
use crate::block::VeriBlockBlock;
use crate::difficulty::{calculate_next_difficulty, encode_compact_bits, RETARGET_PERIOD};
use crate::params::NetworkParameters;
use crate::stored::StoredVeriBlockBlock;

/// number of ancestors the median time past is taken over
pub const MEDIAN_TIME_PAST_WINDOW: usize = 20;

pub fn check_timestamp(
    block: &VeriBlockBlock,
    context: &[StoredVeriBlockBlock],
) -> Result<(), VerificationError> {
    if context.len() < MEDIAN_TIME_PAST_WINDOW {
        tracing::debug!(
            "not enough context blocks to check the timestamp of block {}",
            block.hash()
        );
        return Ok(());
    }

    let mut window: Vec<&StoredVeriBlockBlock> = context.iter().collect();
    window.sort_by(|a, b| b.height().cmp(&a.height()));
    let mut timestamps: Vec<u32> = window
        .into_iter()
        .take(MEDIAN_TIME_PAST_WINDOW)
        .map(|stored| stored.block.timestamp())
        .collect();
    timestamps.sort_unstable();
    let median = timestamps[MEDIAN_TIME_PAST_WINDOW / 2 - 1];

    if block.timestamp() <= median {
        return Err(VerificationError::TimestampTooOld {
            timestamp: block.timestamp(),
            median,
        });
    }
    Ok(())
}

pub fn check_difficulty(
    params: &NetworkParameters,
    block: &VeriBlockBlock,
    context: &[StoredVeriBlockBlock],
) -> Result<(), Error> {
    if context.len() < RETARGET_PERIOD {
        tracing::debug!(
            "not enough context blocks to check the difficulty of block {}",
            block.hash()
        );
        return Ok(());
    }

    let headers: Vec<VeriBlockBlock> = context
        .iter()
        .take(RETARGET_PERIOD)
        .map(|stored| stored.block.clone())
        .collect();
    let expected = encode_compact_bits(&calculate_next_difficulty(params, &headers)?);
    if block.difficulty() != expected {
        return Err(VerificationError::UnexpectedDifficulty {
            expected,
            found: block.difficulty(),
        }
        .into());
    }
    Ok(())
}
