//! Known chains, their bridge ids and native tokens.

use ferry_relayer_types::ChainId;

/// BNB smart chain.
pub const BSC: ChainId = ChainId(22);
/// Kovan test network.
pub const KOVAN: ChainId = ChainId(23);
/// Heco.
pub const HECO: ChainId = ChainId(24);
/// Kusama.
pub const KUSAMA: ChainId = ChainId(11);
/// Polkadot.
pub const POLKADOT: ChainId = ChainId(12);
/// ChainX, PCX on the v1 runtime.
pub const CHAINX_PCX_V1: ChainId = ChainId(6);
/// ChainX, PCX on the v2 runtime.
pub const CHAINX_PCX_V2: ChainId = ChainId(7);
/// ChainX, XBTC on the v1 runtime.
pub const CHAINX_XBTC_V1: ChainId = ChainId(8);
/// ChainX, XBTC on the v2 runtime.
pub const CHAINX_XBTC_V2: ChainId = ChainId(9);

/// Destinations with an id up to this one receive multisig transfers.
pub const MULTISIG_LIMIT: ChainId = ChainId(100);

/// Whether a transfer to `destination` goes through a multisig.
pub fn is_multisig_transfer(destination: ChainId) -> bool {
    destination <= MULTISIG_LIMIT
}

/// Static facts about a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainInfo {
    /// Name prefix, matched against the configured chain name.
    pub prefix: &'static str,
    /// Symbol of the native token, e.g. `KSM`.
    pub native_token: &'static str,
}

/// Native token symbols.
pub mod tokens {
    pub const ATP: &str = "ATP";
    pub const LAT: &str = "LAT";
    pub const DOT: &str = "DOT";
    pub const KSM: &str = "KSM";
    pub const PCX: &str = "PCX";
    pub const XBTC: &str = "XBTC";
    pub const XASSET: &str = "XASSET";
}

static CHAINS_INFO: [ChainInfo; 5] = [
    ChainInfo {
        prefix: "alaya",
        native_token: tokens::ATP,
    },
    ChainInfo {
        prefix: "platon",
        native_token: tokens::LAT,
    },
    ChainInfo {
        prefix: "kusama",
        native_token: tokens::KSM,
    },
    ChainInfo {
        prefix: "polkadot",
        native_token: tokens::DOT,
    },
    ChainInfo {
        prefix: "chainx",
        native_token: tokens::PCX,
    },
];

/// Get the chain information by the configured chain name.
///
/// The name only has to start with one of the known prefixes, so
/// `kusama-relay` resolves to Kusama.
#[must_use]
pub fn chain_info_by_name(name: &str) -> Option<&'static ChainInfo> {
    let name = name.to_ascii_lowercase();
    CHAINS_INFO
        .iter()
        .find(|info| name.starts_with(info.prefix))
}
