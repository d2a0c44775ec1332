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
//! # Redemption Writer 🕸️
//!
//! Drives the messages routed to a chain until they are executed there.
//!
//! ## Overview
//!
//! Every message gets its own task. Chains with a multisig vault redeem
//! native and multisig payloads through `Multisig.as_multi`, everything else
//! goes through the votes of the bridge pallet. Either way the writer only
//! casts its own vote and then watches the chain until the transfer executes,
//! one attempt per voting round.

use std::sync::Arc;

use backoff::backoff::Backoff;
use num_traits::ToPrimitive;

use ferry_chain_connection::Submitter;
use ferry_chains_info::AmountConverter;
use ferry_relayer_context::{RelayerContext, Shutdown};
use ferry_relayer_router::MessageReceiver;
use ferry_relayer_store::{ActiveRedemptions, MultiSigTracker};
use ferry_relayer_types::{
    BigUint, ChainId, CrossChainMessage, MessageType, RelayerIdentity,
};
use ferry_relayer_utils::{probe, retry::RetryPolicy, Error, Result};

mod multisig;
mod proposal;
mod state;

pub use proposal::{resources_key, votes_key};
pub use state::{RedemptionOutcome, RedemptionState};
use state::{Redemption, Step};

#[cfg(test)]
mod tests;

/// Redeems the messages of one destination chain.
#[derive(typed_builder::TypedBuilder)]
pub struct RedemptionWriter {
    chain_id: ChainId,
    ctx: RelayerContext,
    submitter: Arc<Submitter>,
    identity: RelayerIdentity,
    /// Resolves the asset of a resource on this chain.
    converter: AmountConverter,
    tracker: Arc<MultiSigTracker>,
    active: Arc<ActiveRedemptions>,
    /// Whether the chain redeems through a multisig vault.
    #[builder(default)]
    multisig: bool,
    policy: RetryPolicy,
}

impl RedemptionWriter {
    /// Consumes `inbox`, spawning one redemption task per message.
    ///
    /// Returns when the inbox closes, or with
    /// [`Error::Terminated`] on shutdown.
    #[tracing::instrument(skip_all, fields(chain_id = %self.chain_id))]
    pub async fn run(self: Arc<Self>, mut inbox: MessageReceiver) -> Result<()> {
        let mut shutdown = self.ctx.shutdown_signal();
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            chain_id = %self.chain_id,
            writer = true,
            starting = true,
        );
        while let Some(msg) = shutdown.race(inbox.recv()).await? {
            let writer = Arc::clone(&self);
            let task = async move {
                // failures are reported by `redeem` itself.
                let _ = writer.redeem(msg).await;
            };
            tokio::task::spawn(task);
        }
        tracing::warn!("Inbox of chain {} closed", self.chain_id);
        Ok(())
    }

    /// Redeems `msg`, retrying once per round until it executes, fails
    /// permanently or runs out of attempts.
    #[tracing::instrument(
        skip_all,
        fields(chain_id = %self.chain_id, nonce = %msg.deposit_nonce()),
    )]
    pub async fn redeem(
        &self,
        msg: CrossChainMessage,
    ) -> Result<RedemptionOutcome> {
        let label = self.chain_id.to_string();
        if msg.destination() != self.chain_id {
            let err = Error::Validation(format!(
                "{msg} routed to the writer of chain {}",
                self.chain_id
            ));
            tracing::error!("{err}");
            return Err(err);
        }
        let Some(_guard) = self.active.begin(msg.redemption_key()) else {
            self.ctx
                .metrics
                .duplicate_messages
                .with_label_values(&[&label])
                .inc();
            tracing::debug!(%msg, "Redemption already in flight, skipping");
            return Ok(RedemptionOutcome::Duplicate);
        };

        let mut shutdown = self.ctx.shutdown_signal();
        let mut redemption = Redemption::new(self.chain_id, msg);
        let result = self.drive(&mut redemption, &mut shutdown).await;
        match &result {
            Ok(_) => {
                redemption.transition(RedemptionState::Executed);
                self.ctx
                    .metrics
                    .redemptions_executed
                    .with_label_values(&[&label])
                    .inc();
                tracing::info!("✅ {} executed", redemption.msg);
            }
            Err(Error::Terminated) => {
                tracing::debug!("{} interrupted by shutdown", redemption.msg);
            }
            Err(e) => {
                redemption.transition(RedemptionState::Failed);
                self.ctx
                    .metrics
                    .redemptions_failed
                    .with_label_values(&[&label])
                    .inc();
                tracing::error!("❌ {} failed: {e}", redemption.msg);
            }
        }
        // a shutdown leaves the multisig to the next run.
        if !matches!(result, Err(Error::Terminated)) {
            if let Some(coordinate) = redemption.coordinate {
                self.tracker.remove(&coordinate);
            }
        }
        result
    }

    async fn drive(
        &self,
        redemption: &mut Redemption,
        shutdown: &mut Shutdown,
    ) -> Result<RedemptionOutcome> {
        let multisig_style = self.multisig
            && matches!(
                redemption.msg.message_type(),
                MessageType::MultiSig | MessageType::Native
            );
        let mut backoff = self.policy.backoff();
        let mut attempts = 0;
        redemption.transition(RedemptionState::Processing);
        loop {
            attempts += 1;
            let step = if multisig_style {
                self.multisig_step(redemption, shutdown).await
            } else {
                self.proposal_step(redemption, shutdown).await
            };
            match step {
                Ok(Step::Executed) => return Ok(RedemptionOutcome::Executed),
                Ok(Step::Voted) => {
                    redemption.transition(RedemptionState::Voted)
                }
                Ok(Step::Waiting) => {}
                Err(e) if e.is_transient() => {
                    tracing::warn!(attempts, "Redemption attempt failed: {e}");
                }
                Err(e) => return Err(e),
            }
            let Some(delay) = backoff.next_backoff() else {
                return Err(Error::RetryBudgetExhausted { attempts });
            };
            let left = backoff.retries_left();
            if left < self.policy.warn_threshold() {
                tracing::warn!(
                    "{} not executed after {} attempts, {} retries left",
                    redemption.msg,
                    attempts,
                    left,
                );
            }
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Retry,
                chain_id = %self.chain_id,
                state = %redemption.state,
                attempts,
                wait = ?delay,
            );
            shutdown.sleep(delay).await?;
        }
    }
}

impl std::fmt::Debug for RedemptionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedemptionWriter")
            .field("chain_id", &self.chain_id)
            .field("multisig", &self.multisig)
            .field("policy", &self.policy)
            .finish()
    }
}

fn to_u128(amount: &BigUint) -> Result<u128> {
    amount.to_u128().ok_or_else(|| {
        Error::Validation(format!("amount {amount} does not fit in 128 bits"))
    })
}
