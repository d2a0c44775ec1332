use ferry_relayer_types::{ChainId, ResourceId};

use crate::WhitelistEntry;

/// Chains are enabled unless said otherwise.
pub const fn enabled() -> bool {
    true
}
/// Number of relayers sharing the multisig, `3` by default.
pub const fn total_relayers() -> u32 {
    3
}
/// Position of this relayer among them, `1` by default.
pub const fn relayer_index() -> u32 {
    1
}
/// Approvals needed to execute a multisig, `2` by default.
pub const fn threshold() -> u16 {
    2
}
/// `max_weight` of `as_multi` calls.
pub const fn max_call_weight() -> u64 {
    2_269_800_000
}
/// A block is retried `15` times before the endpoint is considered broken.
pub const fn block_retry_limit() -> usize {
    15
}
/// Milliseconds between two polling retries.
pub const fn block_retry_interval() -> u64 {
    5_000
}
/// The print progress interval is set to `7_000` by default.
pub const fn print_progress_interval() -> u64 {
    7_000
}
/// A redemption gets `15` attempts.
pub const fn redeem_retry_limit() -> usize {
    15
}
/// Milliseconds a voting round lasts on the destination chain.
pub const fn round_interval() -> u64 {
    6_000
}

/// The routes relayed when no whitelist is configured.
pub fn whitelist() -> Vec<WhitelistEntry> {
    vec![
        WhitelistEntry {
            source: ChainId(1),
            destination: ChainId(2),
            resource_id: ResourceId::AKSM,
        },
        WhitelistEntry {
            source: ChainId(3),
            destination: ChainId(4),
            resource_id: ResourceId::PDOT,
        },
    ]
}
