// Copyright (C) 2022-2024 Webb Technologies Inc.
//
// Tangle is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Tangle is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should receive a copy of the GNU General Public License
// If not, see <http://www.gnu.org/licenses/>.

use prometheus::{
    register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry, Encoder, IntCounterVec,
    IntGaugeVec, Registry, TextEncoder,
};

/// A struct definition for collecting metrics in the relayer.
///
/// Every metric is labeled with the chain it belongs to. Metrics live in
/// their own [`Registry`], so several relayer instances can coexist in one
/// process (tests do exactly that).
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Blocks fully processed by a listener.
    pub blocks_processed: IntCounterVec,
    /// Most recent finalized height seen by a listener.
    pub latest_known_block: IntGaugeVec,
    /// Most recent block processed by a listener.
    pub latest_processed_block: IntGaugeVec,
    /// Listener back off, incremented each time polling retries run out.
    pub listener_back_off: IntCounterVec,
    /// Messages handed to the router.
    pub messages_routed: IntCounterVec,
    /// Extrinsics submitted by a writer.
    pub submissions: IntCounterVec,
    /// Redemptions that reached the executed state.
    pub redemptions_executed: IntCounterVec,
    /// Redemptions abandoned, either permanently failed or out of retries.
    pub redemptions_failed: IntCounterVec,
    /// Messages skipped because the same redemption is already in flight.
    pub duplicate_messages: IntCounterVec,
}

impl Metrics {
    /// Instantiates the various metrics and their counters, also creates a registry for the counters and
    /// registers the counters
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("ferry".into()), None)?;
        let blocks_processed = register_int_counter_vec_with_registry!(
            "blocks_processed",
            "The total number of blocks processed by the listener",
            &["chain"],
            registry
        )?;
        let latest_known_block = register_int_gauge_vec_with_registry!(
            "latest_known_block",
            "The most recent finalized block number seen by the listener",
            &["chain"],
            registry
        )?;
        let latest_processed_block = register_int_gauge_vec_with_registry!(
            "latest_processed_block",
            "The most recent block number processed by the listener",
            &["chain"],
            registry
        )?;
        let listener_back_off = register_int_counter_vec_with_registry!(
            "listener_back_off",
            "specifies how many times the listener ran out of polling retries",
            &["chain"],
            registry
        )?;
        let messages_routed = register_int_counter_vec_with_registry!(
            "messages_routed",
            "The total number of cross-chain messages sent to the router",
            &["chain"],
            registry
        )?;
        let submissions = register_int_counter_vec_with_registry!(
            "submissions",
            "The total number of extrinsics submitted by the writer",
            &["chain"],
            registry
        )?;
        let redemptions_executed = register_int_counter_vec_with_registry!(
            "redemptions_executed",
            "The total number of redemptions executed on chain",
            &["chain"],
            registry
        )?;
        let redemptions_failed = register_int_counter_vec_with_registry!(
            "redemptions_failed",
            "The total number of redemptions abandoned by the writer",
            &["chain"],
            registry
        )?;
        let duplicate_messages = register_int_counter_vec_with_registry!(
            "duplicate_messages",
            "The total number of duplicate messages skipped by the writer",
            &["chain"],
            registry
        )?;
        Ok(Self {
            registry,
            blocks_processed,
            latest_known_block,
            latest_processed_block,
            listener_back_off,
            messages_routed,
            submissions,
            redemptions_executed,
            redemptions_failed,
            duplicate_messages,
        })
    }

    /// Gathers all the metrics in the prometheus text format.
    pub fn gather_metrics(&self) -> crate::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|_| crate::Error::Generic("metrics are not valid utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_instances_do_not_collide() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.blocks_processed.with_label_values(&["1"]).inc();
        assert_eq!(a.blocks_processed.with_label_values(&["1"]).get(), 1);
        assert_eq!(b.blocks_processed.with_label_values(&["1"]).get(), 0);
        let text = a.gather_metrics().unwrap();
        assert!(text.contains("ferry_blocks_processed"));
    }
}
