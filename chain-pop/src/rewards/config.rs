use super::decimal::Decimal;
use crate::params::ConfigError;
use serde::{Deserialize, Serialize};

fn decimal(s: &str) -> Decimal {
    s.parse().unwrap_or_default()
}

/// Shape of the reward curve above the intended payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopRewardCurveConfig {
    /// normalized score from which the reward per point decreases
    pub start_of_decreasing_line: Decimal,
    pub width_of_decreasing_line_normal: Decimal,
    pub width_of_decreasing_line_keystone: Decimal,
    /// fraction of the round ratio still paid at the end of the decreasing line
    pub above_intended_payout_multiplier_normal: Decimal,
    pub above_intended_payout_multiplier_keystone: Decimal,
}

impl Default for PopRewardCurveConfig {
    fn default() -> Self {
        PopRewardCurveConfig {
            start_of_decreasing_line: Decimal::from(100),
            width_of_decreasing_line_normal: Decimal::from(100),
            width_of_decreasing_line_keystone: Decimal::from(200),
            above_intended_payout_multiplier_normal: decimal("0.8"),
            above_intended_payout_multiplier_keystone: decimal("0.57142857"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopRewardConfig {
    pub keystone_interval: u32,
    /// round of the keystone blocks
    pub keystone_round: u32,
    /// number of rounds, the keystone one included
    pub payout_rounds: u32,
    /// the first block of this round after a keystone gets a flat reward
    pub flat_score_round: u32,
    pub flat_score_round_use: bool,
    /// reward multiplier of each round, indexed by round
    pub round_ratios: Vec<Decimal>,
    pub max_reward_threshold_normal: Decimal,
    pub max_reward_threshold_keystone: Decimal,
    /// reward of a block endorsed exactly at the intended difficulty,
    /// times 100
    pub basic_reward: u64,
    /// weight of an endorsement by its distance, in VeriBlock blocks, to
    /// the earliest endorsement of the same block
    pub relative_score_lookup_table: Vec<Decimal>,
    pub curve: PopRewardCurveConfig,
}

const RELATIVE_SCORE_LOOKUP_TABLE: [&str; 49] = [
    "1.00000000", "1.00000000", "1.00000000", "1.00000000", "1.00000000", "1.00000000",
    "1.00000000", "1.00000000", "1.00000000", "1.00000000", "1.00000000", "1.00000000",
    "0.48296816", "0.31551694", "0.23325824", "0.18453616", "0.15238463", "0.12961255",
    "0.11265630", "0.09955094", "0.08912509", "0.08063761", "0.07359692", "0.06766428",
    "0.06259873", "0.05822428", "0.05440941", "0.05105386", "0.04807993", "0.04542644",
    "0.04304458", "0.04089495", "0.03894540", "0.03716941", "0.03554497", "0.03405359",
    "0.03267969", "0.03141000", "0.03023319", "0.02913950", "0.02812047", "0.02716878",
    "0.02627801", "0.02544253", "0.02465739", "0.02391820", "0.02322107", "0.02256254",
    "0.01813947",
];

impl Default for PopRewardConfig {
    fn default() -> Self {
        PopRewardConfig {
            keystone_interval: 20,
            keystone_round: 3,
            payout_rounds: 4,
            flat_score_round: 2,
            flat_score_round_use: true,
            round_ratios: ["0.97", "1.03", "1.07", "3.00"]
                .iter()
                .map(|s| decimal(s))
                .collect(),
            max_reward_threshold_normal: Decimal::from(200),
            max_reward_threshold_keystone: Decimal::from(300),
            basic_reward: 4_000_000_000,
            relative_score_lookup_table: RELATIVE_SCORE_LOOKUP_TABLE
                .iter()
                .map(|s| decimal(s))
                .collect(),
            curve: PopRewardCurveConfig::default(),
        }
    }
}

impl PopRewardConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::from)
    }

    /// check the rounds the configuration produces all have a ratio
    pub fn check(&self) -> Result<(), String> {
        if self.keystone_interval == 0 {
            return Err("keystone interval cannot be 0".to_owned());
        }
        let normal_rounds = self.payout_rounds.saturating_sub(1).max(1);
        let highest_round = std::cmp::max(self.keystone_round, normal_rounds - 1);
        if self.round_ratios.len() <= highest_round as usize {
            return Err(format!(
                "{} round ratios configured, round {} needs one",
                self.round_ratios.len(),
                highest_round
            ));
        }
        if self.curve.width_of_decreasing_line_normal.is_zero()
            || self.curve.width_of_decreasing_line_keystone.is_zero()
        {
            return Err("the decreasing line cannot have a zero width".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_consistent() {
        let config = PopRewardConfig::default();
        assert_eq!(config.check(), Ok(()));
        assert_eq!(config.relative_score_lookup_table.len(), 49);
        assert_eq!(config.round_ratios[3], Decimal::from(3));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = PopRewardConfig::from_yaml(
            "basic_reward: 1000\nround_ratios: [1, 1, 1, 2]\ncurve:\n  start_of_decreasing_line: 50\n",
        )
        .unwrap();
        assert_eq!(config.basic_reward, 1000);
        assert_eq!(config.keystone_interval, 20);
        assert_eq!(config.round_ratios[3], Decimal::from(2));
        assert_eq!(config.curve.start_of_decreasing_line, Decimal::from(50));
        assert_eq!(
            config.curve.width_of_decreasing_line_keystone,
            Decimal::from(200)
        );
    }

    #[test]
    fn missing_round_ratio_is_reported() {
        let mut config = PopRewardConfig::default();
        config.round_ratios.truncate(3);
        assert!(config.check().is_err());
    }

    #[test]
    fn yaml_round_trip() {
        let config = PopRewardConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(PopRewardConfig::from_yaml(&yaml).unwrap(), config);
    }
}
