// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
#![warn(missing_docs)]
//! # Relayer Configuration Module 🕸️
//!
//! A module for configuring the relayer.
//!
//! ## Overview
//!
//! The relayer configuration module is responsible for configuring the relayer.
//! Possible configuration include:
//! * `chains`: every bridged chain, keyed by name. See [config/kusama-alaya](../../config/kusama-alaya)
//! for an example.
//! * `currencies`: replaces the built-in currency table.
//! * `whitelist`: the `(source, destination, resource)` routes batch deposits may take.

/// Chain configuration
pub mod chain;
/// Default values of the configuration
pub mod defaults;
/// Logger setup
pub mod logger;
/// Utils for processing configuration
pub mod utils;

use std::collections::HashMap;

use ferry_chains_info::CurrencyTable;
use ferry_relayer_types::{ChainId, ResourceId};
use serde::{Deserialize, Serialize};

pub use chain::{
    ChainConfig, ListenerConfig, MultiSigConfig, RelayerIdentityConfig,
    WriterConfig,
};

/// RelayerConfig is the configuration for the ferry relayer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerConfig {
    /// Bridged chains and their configuration.
    ///
    /// a map between chain name and its configuration, re-keyed by chain id
    /// once loaded.
    #[serde(default)]
    pub chains: HashMap<String, ChainConfig>,
    /// Replaces the built-in currency table.
    #[serde(default)]
    pub currencies: Option<CurrencyTable>,
    /// Routes batch deposits are allowed to take.
    #[serde(default = "defaults::whitelist")]
    pub whitelist: Vec<WhitelistEntry>,
}

impl RelayerConfig {
    /// The configured currency table, or the built-in one.
    pub fn currency_table(&self) -> CurrencyTable {
        self.currencies.clone().unwrap_or_default()
    }

    /// The configuration of the chain with `chain_id`.
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }

    /// Whether batch deposits may go from `source` to `destination` with
    /// `resource_id`.
    pub fn is_whitelisted(
        &self,
        source: ChainId,
        destination: ChainId,
        resource_id: &ResourceId,
    ) -> bool {
        self.whitelist.iter().any(|w| {
            w.source == source
                && w.destination == destination
                && w.resource_id == *resource_id
        })
    }
}

/// An allowed `(source, destination, resource)` route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WhitelistEntry {
    /// Chain the deposit is made on.
    pub source: ChainId,
    /// Chain the deposit is redeemed on.
    pub destination: ChainId,
    /// The bridged resource.
    pub resource_id: ResourceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_config_files_are_correct() {
        // This walks all the directories inside the root of the config
        // directory and tries to parse the config file(s) inside it.
        let config_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config");
        let config_dirs = std::fs::read_dir(&config_dir)
            .expect("Failed to read config directory")
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();
        assert!(
            !config_dirs.is_empty(),
            "No config directories found in the config directory"
        );
        for config_subdir in config_dirs {
            if let Err(e) = utils::load(&config_subdir) {
                panic!("Failed to parse config file in directory: {config_subdir:?} with error: {e}");
            }
        }
    }

    #[test]
    fn default_whitelist() {
        let config = RelayerConfig {
            whitelist: defaults::whitelist(),
            ..Default::default()
        };
        assert!(config.is_whitelisted(
            ChainId(1),
            ChainId(2),
            &ResourceId::AKSM
        ));
        assert!(config.is_whitelisted(
            ChainId(3),
            ChainId(4),
            &ResourceId::PDOT
        ));
        assert!(!config.is_whitelisted(
            ChainId(1),
            ChainId(4),
            &ResourceId::AKSM
        ));
        assert!(!config.is_whitelisted(
            ChainId(1),
            ChainId(2),
            &ResourceId::PDOT
        ));
    }
}
