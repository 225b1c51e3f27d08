//! Network parameters and the loading of configuration documents.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs::File, io::Read, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Format(#[from] serde_yaml::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Read a YAML configuration document.
pub fn from_yaml_reader<T: DeserializeOwned, R: Read>(reader: R) -> Result<T, ConfigError> {
    serde_yaml::from_reader(reader).map_err(ConfigError::from)
}

pub fn from_yaml_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    from_yaml_reader(File::open(path)?)
}

/// Parameters of the VeriBlock network the index follows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkParameters {
    /// the retargeted difficulty never goes below this value
    pub minimum_difficulty: u64,
    /// `None` on the main network
    #[serde(default)]
    pub transaction_magic_byte: Option<u8>,
}

impl NetworkParameters {
    pub fn mainnet() -> Self {
        NetworkParameters {
            minimum_difficulty: 900_000_000_000,
            transaction_magic_byte: None,
        }
    }

    pub fn testnet() -> Self {
        NetworkParameters {
            minimum_difficulty: 100_000_000,
            transaction_magic_byte: Some(0xAA),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::from)
    }
}

impl Default for NetworkParameters {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_yaml() {
        let params = NetworkParameters::from_yaml(
            "---\nminimum_difficulty: 100000000\ntransaction_magic_byte: 170\n",
        )
        .unwrap();
        assert_eq!(params, NetworkParameters::testnet());
    }

    #[test]
    fn magic_byte_is_optional() {
        let params = NetworkParameters::from_yaml("minimum_difficulty: 900000000000").unwrap();
        assert_eq!(params, NetworkParameters::mainnet());
    }

    #[test]
    fn unknown_fields_are_refused() {
        assert!(NetworkParameters::from_yaml("minimum_difficulty: 1\nmagic: 3").is_err());
    }

    #[test]
    fn yaml_reader_accepts_any_document() {
        let yaml = serde_yaml::to_string(&NetworkParameters::testnet()).unwrap();
        let params: NetworkParameters = from_yaml_reader(yaml.as_bytes()).unwrap();
        assert_eq!(params, NetworkParameters::testnet());
    }
}
