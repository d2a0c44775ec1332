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

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;

use ferry_chain_connection::{ChainConnection, Submitter};
use ferry_chains_info::AmountConverter;
use ferry_event_watcher_traits::BlockWatcher;
use ferry_ew_substrate::{deposit_handlers, DepositListener};
use ferry_redemption_writer::RedemptionWriter;
use ferry_relayer_config::ChainConfig;
use ferry_relayer_context::RelayerContext;
use ferry_relayer_router::{ChannelRouter, MessageReceiver};
use ferry_relayer_store::{ActiveRedemptions, MultiSigTracker, SledStore};
use ferry_relayer_types::ChainId;
use ferry_relayer_utils::probe;

/// Type alias for the [Sled](https://sled.rs)-based store of the listener
/// cursors.
pub type Store = SledStore;

/// The state one chain's listener and writer share.
#[derive(Debug, Clone)]
pub struct ChainHandle {
    /// The chain.
    pub chain_id: ChainId,
    /// Multisigs seen on the chain, fed by its listener.
    pub tracker: Arc<MultiSigTracker>,
    /// Redemptions in flight on the chain.
    pub active: Arc<ActiveRedemptions>,
}

impl ChainHandle {
    fn new(chain: &ChainConfig) -> Self {
        Self {
            chain_id: chain.chain_id,
            tracker: Arc::new(MultiSigTracker::new(chain.relayer.own_address)),
            active: Arc::new(ActiveRedemptions::new()),
        }
    }
}

/// Starts the deposit listener and the redemption writer of every enabled
/// chain.
///
/// Returns the shared state of every started chain, ordered by chain id.
///
/// # Arguments
///
/// * `ctx` - RelayContext that holds the configuration
/// * `store` - [Sled](https://sled.rs)-based database store
/// * `connections` - The connection of every chain, by chain id
pub async fn ignite(
    ctx: RelayerContext,
    store: Arc<Store>,
    connections: HashMap<ChainId, Arc<dyn ChainConnection>>,
) -> anyhow::Result<Vec<ChainHandle>> {
    tracing::event!(
        target: probe::TARGET,
        tracing::Level::DEBUG,
        kind = %probe::Kind::Lifecycle,
        starting = true,
        chains = ctx.config.chains.len(),
    );
    let router = Arc::new(ChannelRouter::new(ctx.metrics.clone()));
    let mut chains: Vec<_> = ctx
        .config
        .chains
        .values()
        .filter(|chain| chain.enabled)
        .cloned()
        .collect();
    chains.sort_by_key(|chain| chain.chain_id);

    // every inbox is registered before a listener may route to it.
    let mut wired = Vec::with_capacity(chains.len());
    for chain in &chains {
        let connection = connections
            .get(&chain.chain_id)
            .cloned()
            .with_context(|| {
                format!(
                    "no connection for chain {} ({})",
                    chain.name, chain.chain_id
                )
            })?;
        connection
            .verify_chain_id(chain.chain_id)
            .await
            .with_context(|| format!("node of chain {}", chain.name))?;
        let inbox = router.register(chain.chain_id);
        wired.push((chain, connection, inbox));
    }

    let mut handles = Vec::with_capacity(wired.len());
    for (chain, connection, inbox) in wired {
        let handle = ChainHandle::new(chain);
        start_redemption_writer(
            ctx.clone(),
            chain,
            connection.clone(),
            &handle,
            inbox,
        );
        start_deposit_listener(
            ctx.clone(),
            chain,
            store.clone(),
            connection,
            &handle,
            router.clone(),
        );
        handles.push(handle);
    }
    Ok(handles)
}

/// Starts the redemption writer of a chain.
///
/// # Arguments
///
/// * `ctx` - RelayContext that holds the configuration
/// * `chain` - The chain the writer redeems on
/// * `connection` - The connection to that chain
/// * `handle` - The state shared with the listener of the chain
/// * `inbox` - The messages routed to the chain
pub fn start_redemption_writer(
    ctx: RelayerContext,
    chain: &ChainConfig,
    connection: Arc<dyn ChainConnection>,
    handle: &ChainHandle,
    inbox: MessageReceiver,
) {
    let chain_id = chain.chain_id;
    let identity = chain.relayer.identity();
    let policy = chain.writer.retry_policy(identity.total_relayers);
    let submitter = Submitter::new(
        connection,
        identity.own_address,
        chain_id,
        ctx.metrics.clone(),
    );
    let writer = RedemptionWriter::builder()
        .chain_id(chain_id)
        .ctx(ctx.clone())
        .submitter(Arc::new(submitter))
        .identity(identity)
        .converter(AmountConverter::new(
            ctx.config.currency_table(),
            chain.native_token(),
        ))
        .tracker(handle.tracker.clone())
        .active(handle.active.clone())
        .multisig(chain.is_multisig())
        .policy(policy)
        .build();
    tracing::debug!("Redemption writer for {} ({}) started.", chain.name, chain_id);
    let mut shutdown_signal = ctx.shutdown_signal();
    let task = async move {
        tokio::select! {
            result = Arc::new(writer).run(inbox) => match result {
                Ok(()) => tracing::warn!(
                    "Redemption writer stopped for ({})",
                    chain_id,
                ),
                Err(e) => tracing::error!(
                    "Redemption writer for ({}) stopped: {}",
                    chain_id,
                    e,
                ),
            },
            _ = shutdown_signal.recv() => {
                tracing::trace!(
                    "Stopping redemption writer for ({})",
                    chain_id,
                );
            },
        }
    };
    // kick off the writer.
    tokio::task::spawn(task);
}

/// Starts the deposit listener of a chain.
///
/// # Arguments
///
/// * `ctx` - RelayContext that holds the configuration
/// * `chain` - The chain to follow
/// * `store` - [Sled](https://sled.rs)-based database store
/// * `connection` - The connection to that chain
/// * `handle` - The state shared with the writer of the chain
/// * `router` - Where found messages are sent
pub fn start_deposit_listener(
    ctx: RelayerContext,
    chain: &ChainConfig,
    store: Arc<Store>,
    connection: Arc<dyn ChainConnection>,
    handle: &ChainHandle,
    router: Arc<ChannelRouter>,
) {
    let chain_id = chain.chain_id;
    let handlers =
        deposit_handlers(&ctx, chain, handle.tracker.clone(), router);
    let endpoints = chain.endpoints.clone();
    let listener_config = chain.listener;
    tracing::debug!("Deposit listener for {} ({}) started.", chain.name, chain_id);
    let mut shutdown_signal = ctx.shutdown_signal();
    let task = async move {
        let listener_task = DepositListener.run(
            chain_id,
            ctx.clone(),
            store,
            connection,
            endpoints,
            listener_config,
            handlers,
        );
        tokio::select! {
            result = listener_task => match result {
                Ok(()) => tracing::warn!(
                    "Deposit listener stopped for ({})",
                    chain_id,
                ),
                Err(e) => tracing::error!(
                    "Deposit listener for ({}) stopped: {}",
                    chain_id,
                    e,
                ),
            },
            _ = shutdown_signal.recv() => {
                tracing::trace!(
                    "Stopping deposit listener for ({})",
                    chain_id,
                );
            },
        }
    };
    // kick off the listener.
    tokio::task::spawn(task);
}
