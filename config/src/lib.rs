//! Configuration of an Arkona node. Loaded from a JSON file, with a small
//! set of environment overrides applied on top.

pub mod chain;
pub mod forging;

use std::{fmt::Debug, fs::File, io::BufReader, path::Path};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

/// Aggregated node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct Configuration {
    /// Consensus constants.
    pub chain: chain::Configuration,
    /// Forging secrets and switches.
    pub forging: forging::Configuration,
}

impl Configuration {
    /// Load configuration from a JSON file and apply environment overrides.
    ///
    /// # Errors
    /// - File not found
    /// - File is not valid JSON
    /// - File is valid JSON, but configuration options don't match
    pub fn from_path<P: AsRef<Path> + Debug>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .wrap_err_with(|| format!("Failed to open configuration file {:?}", &path))?;
        let reader = BufReader::new(file);
        let mut configuration: Self = serde_json::from_reader(reader)
            .wrap_err("Failed to deserialize configuration from reader")?;
        configuration.forging.load_environment();
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let configuration = Configuration::default();
        assert_eq!(configuration.chain.block_slot_window, chain::DEFAULT_BLOCK_SLOT_WINDOW);
        assert_eq!(
            configuration.chain.reward_milestones,
            chain::DEFAULT_REWARD_MILESTONES.to_vec()
        );
        assert!(!configuration.forging.force);
        assert!(configuration.forging.secrets.is_none());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let configuration: Configuration =
            serde_json::from_str(r#"{"CHAIN": {"SLOT_INTERVAL": 4}}"#).expect("Valid");
        assert_eq!(configuration.chain.slot_interval, 4);
        assert_eq!(configuration.chain.epoch_time, chain::DEFAULT_EPOCH_TIME);
    }

    #[test]
    fn forging_entries_deserialize_from_wire_form() {
        let json = r#"{
            "FORGING": {
                "FORCE": true,
                "SECRETS": [{
                    "publicKey": "9d3058175acab969f41ad9b86f7a2926c74258670fe56b37c429c01fca9f2f0f",
                    "encryptedSecret": "aabbcc",
                    "iv": "000102030405060708090a0b",
                    "salt": "000102030405060708090a0b0c0d0e0f",
                    "tag": "000102030405060708090a0b0c0d0e0f",
                    "version": 1
                }]
            }
        }"#;
        let configuration: Configuration = serde_json::from_str(json).expect("Valid");
        let secrets = configuration.forging.secrets.expect("Valid");
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].version, 1);
    }
}
