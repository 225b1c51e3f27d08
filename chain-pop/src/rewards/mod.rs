//! Proof of proof rewards of an altchain.
//!
//! The altchain blocks are grouped in rounds: every keystone block is in
//! the keystone round, the blocks in between cycle through the other
//! rounds. The reward of a block grows with the score of its
//! endorsements relative to the difficulty, up to a threshold past which
//! every additional point of score pays less.
//!
//! ```text
//!  reward per point
//!        ^
//!   ratio|________
//!        |        \__________
//!        |                   \______ mult * ratio
//!        +--------+-----------------+------> normalized score
//!               start         start + width
//! ```

mod config;
mod decimal;
mod endorsement;

pub use config::{PopRewardConfig, PopRewardCurveConfig};
pub use decimal::{Decimal, ParseDecimalError};
pub use endorsement::{Iter, PopEndorsement, PopEndorsements};

use crate::value::Value;
use std::cmp;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid reward configuration: {0}")]
    Config(String),
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("reward computation is inconsistent: {0}")]
    Invariant(String),
}

/// Reward of one PoP miner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopRewardOutput {
    pub miner: String,
    pub reward: Value,
}

/// Distribution of the PoP reward of one altchain block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopPayoutRound {
    /// the reward of the block
    pub pop_block_reward: Value,
    /// sum of the outputs, never above `pop_block_reward`
    pub total_reward_paid_out: Value,
    pub outputs: Vec<PopRewardOutput>,
}

#[derive(Debug, Clone)]
pub struct PopRewardCalculator {
    config: PopRewardConfig,
}

impl PopRewardCalculator {
    pub fn new(config: PopRewardConfig) -> Result<Self, Error> {
        config.check().map_err(Error::Config)?;
        Ok(PopRewardCalculator { config })
    }

    pub fn config(&self) -> &PopRewardConfig {
        &self.config
    }

    pub fn is_keystone_round(&self, round: u32) -> bool {
        round == self.config.keystone_round
    }

    /// whether the block is paid in the keystone round, which with a
    /// single payout round and a keystone round of 0 is every block
    pub fn is_keystone_height(&self, block_number: u32) -> bool {
        self.is_keystone_round(self.round_for_block_number(block_number))
    }

    pub fn round_for_block_number(&self, block_number: u32) -> u32 {
        if block_number % self.config.keystone_interval == 0 {
            return self.config.keystone_round;
        }
        if self.config.payout_rounds <= 1 {
            return 0;
        }
        // block_number is not 0, it would be a keystone
        let round = (block_number - 1) % self.config.keystone_interval;
        round % (self.config.payout_rounds - 1)
    }

    /// Position of the block among the blocks of `round` since the last
    /// keystone, starting at 1. `None` if the block is not in that round.
    pub fn index_of_round(&self, block_number: u32, round: u32) -> Option<u32> {
        if self.round_for_block_number(block_number) != round {
            return None;
        }
        let index = block_number % self.config.keystone_interval;
        if index == 0 {
            return Some(1);
        }
        match self.config.payout_rounds {
            0 => None,
            1 => Some(index),
            rounds => Some(index / (rounds - 1)),
        }
    }

    pub fn round_ratio(&self, round: u32) -> Result<&Decimal, Error> {
        self.config
            .round_ratios
            .get(round as usize)
            .ok_or_else(|| Error::Argument(format!("no ratio for round {}", round)))
    }

    fn max_reward_threshold(&self, round: u32) -> &Decimal {
        if self.is_keystone_round(round) {
            &self.config.max_reward_threshold_keystone
        } else {
            &self.config.max_reward_threshold_normal
        }
    }

    /// slope of the decreasing part of the reward curve
    pub fn round_slope(&self, round: u32) -> Result<Decimal, Error> {
        let curve = &self.config.curve;
        let (multiplier, width) = if self.is_keystone_round(round) {
            (
                &curve.above_intended_payout_multiplier_keystone,
                &curve.width_of_decreasing_line_keystone,
            )
        } else {
            (
                &curve.above_intended_payout_multiplier_normal,
                &curve.width_of_decreasing_line_normal,
            )
        };
        let ratio = self.round_ratio(round)?;
        (&(multiplier * ratio) - ratio)
            .checked_div(width)
            .ok_or_else(|| Error::Config("the decreasing line cannot have a zero width".to_owned()))
    }

    /// weight of an endorsement `relative_height` VeriBlock blocks after
    /// the earliest one, 0 past the end of the lookup table
    pub fn score_multiplier(&self, relative_height: u32) -> Decimal {
        self.config
            .relative_score_lookup_table
            .get(relative_height as usize)
            .cloned()
            .unwrap_or_else(Decimal::zero)
    }

    pub fn calculate_pop_score(&self, endorsements: &PopEndorsements) -> Decimal {
        let lowest = match endorsements.lowest_height() {
            None => return Decimal::zero(),
            Some(lowest) => lowest,
        };
        endorsements
            .iter()
            .fold(Decimal::zero(), |score, (height, endorsed)| {
                let weight = self.score_multiplier(height - lowest);
                &score + &(&weight * &Decimal::from(endorsed.len() as u64))
            })
    }

    /// Reward of a block from its PoP score and the PoP difficulty, before
    /// the flat round rule applies.
    pub fn calculate_total_pop_block_reward(
        &self,
        block_number: u32,
        difficulty: &Decimal,
        score: &Decimal,
    ) -> Result<Decimal, Error> {
        if difficulty.is_negative() {
            return Err(Error::Argument(format!(
                "difficulty cannot be negative, got {}",
                difficulty
            )));
        }
        if score.is_negative() {
            return Err(Error::Argument(format!(
                "score cannot be negative, got {}",
                score
            )));
        }
        if score.is_zero() {
            return Ok(Decimal::zero());
        }

        let one = Decimal::one();
        let difficulty = cmp::max(difficulty, &one);
        let divide = |lhs: &Decimal| {
            lhs.checked_div(difficulty)
                .ok_or_else(|| Error::Invariant("difficulty is 0".to_owned()))
        };

        let round = self.round_for_block_number(block_number);
        let ratio = self.round_ratio(round)?;
        let hundred = Decimal::from(100u64);
        let budget = Decimal::from(self.config.basic_reward / 100);
        let score_to_difficulty = divide(score)?;
        let normalized_score = divide(&(score * &hundred))?;
        let start = &self.config.curve.start_of_decreasing_line;

        if &(&score_to_difficulty * &hundred) <= start {
            let reward = &(&budget * &score_to_difficulty) * &hundred;
            return Ok(&reward * ratio);
        }

        let chopped = cmp::min(&normalized_score, self.max_reward_threshold(round));
        let slope = self.round_slope(round)?;
        let per_point = &(&slope * &(chopped - start)) + ratio;
        Ok(&(&budget * chopped) * &per_point)
    }

    /// Reward of the block at `block_number`.
    ///
    /// The first block of the flat score round after each keystone is paid
    /// as if endorsed exactly at the difficulty.
    pub fn calculate_pop_reward_for_block(
        &self,
        block_number: u32,
        score: &Decimal,
        difficulty: &Decimal,
    ) -> Result<Decimal, Error> {
        if score.is_zero() {
            return Ok(Decimal::zero());
        }
        if self.config.flat_score_round_use
            && self.index_of_round(block_number, self.config.flat_score_round) == Some(1)
        {
            let one = Decimal::one();
            return self.calculate_total_pop_block_reward(block_number, &one, &one);
        }
        self.calculate_total_pop_block_reward(block_number, difficulty, score)
    }

    /// Split the reward of a block between the miners of its
    /// endorsements, in proportion to their weight.
    pub fn calculate_pop_payout_round(
        &self,
        block_number: u32,
        endorsements: &PopEndorsements,
        difficulty: &Decimal,
    ) -> Result<PopPayoutRound, Error> {
        let score = self.calculate_pop_score(endorsements);
        let reward = self.calculate_pop_reward_for_block(block_number, &score, difficulty)?;
        let pop_block_reward = Value(reward.to_u64_floor().ok_or_else(|| {
            Error::Invariant(format!("block reward {} is not a valid amount", reward))
        })?);

        let mut outputs = Vec::new();
        let mut paid = Value::zero();
        if let Some(lowest) = endorsements.lowest_height().filter(|_| !score.is_zero()) {
            let block_reward = Decimal::from(pop_block_reward.0);
            for (height, endorsed) in endorsements.iter() {
                let weight = self.score_multiplier(height - lowest);
                let share = (&block_reward * &weight)
                    .checked_div(&score)
                    .ok_or_else(|| Error::Invariant("score is 0".to_owned()))?;
                let share = Value(share.to_u64_floor().ok_or_else(|| {
                    Error::Invariant(format!("reward share {} is not a valid amount", share))
                })?);
                if share == Value::zero() {
                    continue;
                }
                for endorsement in endorsed {
                    outputs.push(PopRewardOutput {
                        miner: endorsement.miner().to_owned(),
                        reward: share,
                    });
                    paid = (paid + share).map_err(|e| Error::Invariant(e.to_string()))?;
                }
            }
        }

        if paid > pop_block_reward {
            return Err(Error::Invariant(format!(
                "paid out {} for a block reward of {}",
                paid, pop_block_reward
            )));
        }

        tracing::debug!(
            block_number,
            reward = %pop_block_reward,
            outputs = outputs.len(),
            "PoP payout round computed"
        );

        Ok(PopPayoutRound {
            pop_block_reward,
            total_reward_paid_out: paid,
            outputs,
        })
    }
}

impl Default for PopRewardCalculator {
    fn default() -> Self {
        PopRewardCalculator {
            config: PopRewardConfig::default(),
        }
    }
}
