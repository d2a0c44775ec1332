use std::collections::BTreeSet;
use std::time::Duration;

use ferry_relayer_types::{AccountId32, ChainId, RelayerIdentity, RpcUrl};
use ferry_relayer_utils::retry::RetryPolicy;

use super::*;

/// ChainConfig is the relayer configuration of one chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    /// String that groups configuration for this chain on a human-readable name.
    pub name: String,
    /// Bridge level id of the chain.
    #[serde(rename(serialize = "chainId"))]
    pub chain_id: ChainId,
    /// Boolean indicating the chain is enabled or not.
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
    /// Endpoints of the chain, tried in order when one of them breaks.
    #[serde(skip_serializing)]
    pub endpoints: Vec<RpcUrl>,
    /// Symbol of the native currency.
    ///
    /// Optional, resolved from the chain name when it is a known chain.
    pub native_token: Option<String>,
    /// The multisig identity of this relayer.
    pub relayer: RelayerIdentityConfig,
    /// The vault deposits are sent to. Chains with this section redeem
    /// through a multisig rather than through bridge proposals.
    #[serde(default)]
    pub multisig: Option<MultiSigConfig>,
    /// Block polling configuration.
    #[serde(default)]
    pub listener: ListenerConfig,
    /// Redemption configuration.
    #[serde(default)]
    pub writer: WriterConfig,
}

impl ChainConfig {
    /// The native token, or an empty string if it is unknown.
    pub fn native_token(&self) -> &str {
        self.native_token.as_deref().unwrap_or_default()
    }

    /// Whether redemptions on this chain go through a multisig.
    pub fn is_multisig(&self) -> bool {
        self.multisig.is_some()
    }
}

/// RelayerIdentityConfig is the configuration of the multisig this relayer
/// is part of.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerIdentityConfig {
    /// The account this relayer signs with.
    pub own_address: AccountId32,
    /// The other members of the multisig.
    #[serde(default)]
    pub other_signatories: BTreeSet<AccountId32>,
    /// Number of relayers. Defaults to 3.
    #[serde(default = "defaults::total_relayers")]
    pub total_relayers: u32,
    /// 1 based position of this relayer. Defaults to 1.
    #[serde(default = "defaults::relayer_index")]
    pub relayer_index: u32,
    /// Approvals needed to execute. Defaults to 2.
    #[serde(default = "defaults::threshold")]
    pub threshold: u16,
    /// `max_weight` of `as_multi`.
    #[serde(default = "defaults::max_call_weight")]
    pub max_call_weight: u64,
}

impl RelayerIdentityConfig {
    /// The runtime identity built from this config.
    pub fn identity(&self) -> RelayerIdentity {
        RelayerIdentity {
            own_address: self.own_address,
            other_signatories: self.other_signatories.clone(),
            total_relayers: self.total_relayers,
            relayer_index: self.relayer_index,
            threshold: self.threshold,
            max_call_weight: self.max_call_weight,
        }
    }
}

/// MultiSigConfig describes the vault of a multisig chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct MultiSigConfig {
    /// Batch deposits to this account are bridged.
    pub vault: AccountId32,
    /// Diagnostic mode: when set, no deposit is bridged and the ones sent by
    /// this account are only logged.
    #[serde(default)]
    pub lost_address: Option<AccountId32>,
}

/// ListenerConfig is the block polling configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListenerConfig {
    /// First block to process when no cursor is stored.
    ///
    /// Defaults to the finalized head at startup.
    pub start_block: Option<u64>,
    /// Stop after this block.
    pub end_block: Option<u64>,
    /// Polling retries before failing over to the next endpoint.
    #[serde(default = "defaults::block_retry_limit")]
    pub block_retry_limit: usize,
    /// Milliseconds between polling retries.
    #[serde(default = "defaults::block_retry_interval")]
    pub block_retry_interval: u64,
    /// print sync progress frequency in milliseconds
    /// if it is zero, means no progress will be printed.
    #[serde(skip_serializing, default = "defaults::print_progress_interval")]
    pub print_progress_interval: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            start_block: None,
            end_block: None,
            block_retry_limit: defaults::block_retry_limit(),
            block_retry_interval: defaults::block_retry_interval(),
            print_progress_interval: defaults::print_progress_interval(),
        }
    }
}

impl ListenerConfig {
    /// The interval between two polling retries.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.block_retry_interval)
    }
}

/// WriterConfig is the redemption configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WriterConfig {
    /// Attempts per redemption.
    #[serde(default = "defaults::redeem_retry_limit")]
    pub redeem_retry_limit: usize,
    /// Milliseconds of a voting round.
    #[serde(default = "defaults::round_interval")]
    pub round_interval: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            redeem_retry_limit: defaults::redeem_retry_limit(),
            round_interval: defaults::round_interval(),
        }
    }
}

impl WriterConfig {
    /// The redemption policy: `redeem-retry-limit` attempts, one every
    /// `round-interval * total_relayers / 2`.
    pub fn retry_policy(&self, total_relayers: u32) -> RetryPolicy {
        RetryPolicy::new(
            self.redeem_retry_limit,
            Duration::from_millis(self.round_interval),
        )
        .scaled(total_relayers, 2)
    }
}
