//! Compact difficulty encoding and VeriBlock difficulty retargeting.
//!
//! The compact form is the Bitcoin `nBits` one: the high byte is the size
//! in bytes of the value, the low 3 bytes its most significant bytes. Bit
//! 23 is a sign bit and must not be set.

use crate::block::{ValidationError, VeriBlockBlock};
use crate::params::NetworkParameters;
use num_bigint::BigUint;
use num_traits::Zero;

/// number of blocks the retarget calculation looks back
pub const RETARGET_PERIOD: usize = 100;

/// intended time between two VeriBlock blocks, in seconds
pub const TARGET_BLOCK_TIME: i64 = 30;

/// solve times are clamped to this many target block times
const MAX_SOLVE_TIME_FACTOR: i64 = 6;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

pub fn decode_compact_bits(compact: u32) -> Result<BigUint, ValidationError> {
    if compact & SIGN_BIT != 0 {
        return Err(ValidationError::NegativeDifficulty(compact));
    }

    let size = (compact >> 24) as usize;
    let word = compact & MANTISSA_MASK;
    let value = if size <= 3 {
        BigUint::from(word >> (8 * (3 - size)))
    } else {
        BigUint::from(word) << (8 * (size - 3))
    };

    if value.is_zero() {
        return Err(ValidationError::ZeroDifficulty(compact));
    }
    Ok(value)
}

pub fn encode_compact_bits(value: &BigUint) -> u32 {
    if value.is_zero() {
        return 0;
    }

    let bytes = value.to_bytes_be();
    let mut size = bytes.len() as u32;
    let mut word = bytes
        .iter()
        .take(3)
        .fold(0u32, |word, byte| (word << 8) | u32::from(*byte));
    if size < 3 {
        word <<= 8 * (3 - size);
    }

    // keep the sign bit clear
    if word & SIGN_BIT != 0 {
        word >>= 8;
        size += 1;
    }
    (size << 24) | word
}

/// Difficulty expected for the block following `context`.
///
/// `context` is the chain before the new block, newest first. The
/// calculation is a linearly weighted moving average of the difficulty
/// over the solve times, recent blocks weighting more.
pub fn calculate_next_difficulty(
    params: &NetworkParameters,
    context: &[VeriBlockBlock],
) -> Result<BigUint, ValidationError> {
    let minimum = BigUint::from(params.minimum_difficulty);
    if context.len() < 2 {
        return match context.first() {
            None => Ok(minimum),
            Some(block) => decode_compact_bits(block.difficulty()),
        };
    }

    let oldest_first: Vec<&VeriBlockBlock> = context.iter().rev().collect();
    let n = (oldest_first.len() - 1) as i64;
    let max_solve_time = MAX_SOLVE_TIME_FACTOR * TARGET_BLOCK_TIME;

    let mut weighted_solve_time: i64 = 0;
    let mut difficulty_sum = BigUint::zero();
    for (j, pair) in oldest_first.windows(2).enumerate() {
        let solve_time = i64::from(pair[1].timestamp()) - i64::from(pair[0].timestamp());
        let solve_time = solve_time.max(-max_solve_time).min(max_solve_time);
        weighted_solve_time += solve_time * (j as i64 + 1);
        difficulty_sum += decode_compact_bits(pair[1].difficulty())?;
    }

    let k = n * (n + 1) * TARGET_BLOCK_TIME / 2;
    let weighted_solve_time = weighted_solve_time.max(k / 10).max(1);

    let next = difficulty_sum * BigUint::from(k as u64)
        / (BigUint::from(n as u64) * BigUint::from(weighted_solve_time as u64));
    Ok(std::cmp::max(next, minimum))
}
