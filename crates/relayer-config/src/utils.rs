use config::{Config, File};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ferry_chains_info::{chain_info_by_name, is_multisig_transfer};
use ferry_relayer_utils::Error;

use super::*;

/// A helper function that will search for all config files in the given directory and return them as a vec
/// of the paths.
///
/// Supported file extensions are:
/// - `.toml`.
/// - `.json`.
pub fn search_config_files<P: AsRef<Path>>(
    base_dir: P,
) -> ferry_relayer_utils::Result<Vec<PathBuf>> {
    // A pattern that covers all toml or json files in the config directory and subdirectories.
    let toml_pattern = format!("{}/**/*.toml", base_dir.as_ref().display());
    let json_pattern = format!("{}/**/*.json", base_dir.as_ref().display());
    tracing::trace!(
        "Loading config files from {} and {}",
        toml_pattern,
        json_pattern
    );
    let toml_files = glob::glob(&toml_pattern)?;
    let json_files = glob::glob(&json_pattern)?;
    toml_files
        .chain(json_files)
        .map(|v| v.map_err(Error::from))
        .collect()
}

/// Try to parse the [`RelayerConfig`] from the given config file(s).
pub fn parse_from_files(
    files: &[PathBuf],
) -> ferry_relayer_utils::Result<RelayerConfig> {
    let mut builder = Config::builder();
    for config_file in files {
        tracing::trace!("Loading config file: {}", config_file.display());
        let ext = config_file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let format = match ext {
            "toml" => config::FileFormat::Toml,
            "json" => config::FileFormat::Json,
            _ => {
                tracing::warn!("Unknown file extension: {}", ext);
                continue;
            }
        };
        builder = builder
            .add_source(File::from(config_file.as_path()).format(format));
    }

    // also merge in the environment (with a prefix of FERRY).
    let builder = builder
        .add_source(config::Environment::with_prefix("FERRY").separator("_"));
    let cfg = builder.build()?;
    // and finally deserialize the config and post-process it
    let config: Result<
        RelayerConfig,
        serde_path_to_error::Error<config::ConfigError>,
    > = serde_path_to_error::deserialize(cfg);
    match config {
        Ok(c) => postloading_process(c),
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

/// Load the configuration files found under `path`.
///
/// it is the same as using the [`search_config_files`] and [`parse_from_files`] functions combined.
pub fn load<P: AsRef<Path>>(
    path: P,
) -> ferry_relayer_utils::Result<RelayerConfig> {
    parse_from_files(&search_config_files(path)?)
}

/// The postloading_process exists to validate configuration and standardize
/// the format of the configuration
pub fn postloading_process(
    mut config: RelayerConfig,
) -> ferry_relayer_utils::Result<RelayerConfig> {
    tracing::trace!("Checking configration sanity ...");

    // 1. drain everything, and take enabled chains.
    let enabled = config
        .chains
        .drain()
        .filter(|(_, chain)| chain.enabled)
        .collect::<HashMap<_, _>>();
    // 2. insert them again, keyed by chain id.
    for (_, mut chain) in enabled {
        if chain.native_token.is_none() {
            chain.native_token = chain_info_by_name(&chain.name)
                .map(|info| info.native_token.to_string());
        }
        validate_chain(&chain)?;
        let key = chain.chain_id.to_string();
        if config.chains.insert(key, chain).is_some() {
            return Err(Error::Validation(
                "two enabled chains share the same chain id".into(),
            ));
        }
    }

    if let Some(currencies) = &config.currencies {
        currencies.validate()?;
    }

    let chain_ids: HashSet<_> =
        config.chains.values().map(|c| c.chain_id).collect();
    for route in &config.whitelist {
        if !chain_ids.contains(&route.destination) {
            tracing::warn!(
                "!!WARNING!!: whitelist route {} -> {} ({}) targets a chain that is not configured.",
                route.source,
                route.destination,
                route.resource_id,
            );
        }
    }

    tracing::trace!(
        "postloaded config: {}",
        serde_json::to_string_pretty(&config)?
    );

    Ok(config)
}

fn validate_chain(chain: &ChainConfig) -> ferry_relayer_utils::Result<()> {
    let relayer = &chain.relayer;
    if chain.endpoints.is_empty() {
        return Err(Error::Validation(format!(
            "chain {} has no endpoints",
            chain.name
        )));
    }
    if relayer.threshold == 0
        || u32::from(relayer.threshold) > relayer.total_relayers
    {
        return Err(Error::Validation(format!(
            "chain {}: threshold {} must be between 1 and total-relayers {}",
            chain.name, relayer.threshold, relayer.total_relayers
        )));
    }
    if relayer.relayer_index == 0 || relayer.relayer_index > relayer.total_relayers
    {
        return Err(Error::Validation(format!(
            "chain {}: relayer-index {} is out of range",
            chain.name, relayer.relayer_index
        )));
    }
    if chain.native_token.is_none() {
        tracing::warn!(
            "!!WARNING!!: chain {} has no native-token, native transfers will be dropped.",
            chain.name
        );
    }
    if chain.is_multisig() && !is_multisig_transfer(chain.chain_id) {
        tracing::warn!(
            "!!WARNING!!: chain {} has a multisig vault but its id {} is above the multisig limit.",
            chain.name,
            chain.chain_id
        );
    }
    Ok(())
}
