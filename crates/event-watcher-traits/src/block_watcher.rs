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

use backoff::backoff::Backoff;

use ferry_chain_connection::EndpointRotation;
use ferry_relayer_config::ListenerConfig;
use ferry_relayer_context::{RelayerContext, Shutdown};
use ferry_relayer_store::HistoryStoreKey;
use ferry_relayer_types::{Block, ChainId, RpcUrl};
use ferry_relayer_utils::{probe, retry, Error};

use super::*;

/// A type alias for the handlers a block watcher runs.
pub type BlockHandlerFor = Box<dyn BlockHandler + Send + Sync>;

/// Retries of a single handler on a single block.
const HANDLER_MAX_RETRY_COUNT: usize = 5;
/// Delay between two retries of a handler.
const HANDLER_RETRY_INTERVAL: Duration = Duration::from_millis(100);
/// Blocks between two info level sync logs.
const INFO_LOG_EVERY: u64 = 1000;

/// A trait that defines a handler for the content of a block.
///
/// The handlers are implemented separately from the watcher, so that we can have
/// one block watcher and many handlers that will run in parallel.
#[async_trait::async_trait]
pub trait BlockHandler: Send + Sync {
    /// a method to be called with every finalized block,
    /// it is up to the handler to decide what to do with its content.
    ///
    /// If this method returned an error, the handler will be considered as failed for
    /// this block. to have a retry mechanism, use the
    /// [`BlockHandlerWithRetry::handle_block_with_retry`] method.
    async fn handle_block(
        &self,
        connection: Arc<dyn ChainConnection>,
        block: &Block,
    ) -> ferry_relayer_utils::Result<()>;

    /// Whether anything in the block could be handled by the handler.
    async fn can_handle_block(
        &self,
        block: &Block,
    ) -> ferry_relayer_utils::Result<bool>;
}

/// An Auxiliary trait to handle blocks with retry logic.
///
/// this trait is automatically implemented for all the block handlers.
#[async_trait::async_trait]
pub trait BlockHandlerWithRetry: BlockHandler {
    /// Same as [`BlockHandler::handle_block`], retried on transient errors
    /// following `backoff`.
    ///
    /// **Note**: this method is automatically implemented for all the block handlers.
    async fn handle_block_with_retry(
        &self,
        connection: Arc<dyn ChainConnection>,
        block: &Block,
        backoff: impl Backoff + Send + Sync + 'static,
    ) -> ferry_relayer_utils::Result<()> {
        if !self.can_handle_block(block).await? {
            return Ok(());
        };
        retry::retry_transient(backoff, || {
            self.handle_block(connection.clone(), block)
        })
        .await
    }
}

impl<T> BlockHandlerWithRetry for T where T: BlockHandler + ?Sized {}

/// What a single poll of the finalized head ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Poll {
    /// Nothing to do yet.
    Wait,
    /// The configured end block was passed.
    Finished,
    /// `block` was handled while the finalized head was at `finalized`.
    Processed { block: u64, finalized: u64 },
}

/// Represents a watcher of finalized blocks.
#[async_trait::async_trait]
pub trait BlockWatcher {
    /// A helper unique tag to help identify the block watcher in the tracing logs.
    const TAG: &'static str;

    /// The Storage backend, used by the block watcher to store its cursor.
    type Store: HistoryStore + 'static;

    /// Returns a task that should be running in the background
    /// that will watch blocks.
    ///
    /// It returns `Ok` once `end-block` is passed, [`Error::Terminated`] on
    /// shutdown and [`Error::EndpointExhausted`] when no endpoint works.
    #[tracing::instrument(
        skip_all,
        fields(
            chain_id = %chain_id,
            tag = %Self::TAG
        )
    )]
    async fn run(
        &self,
        chain_id: ChainId,
        ctx: RelayerContext,
        store: Arc<Self::Store>,
        connection: Arc<dyn ChainConnection>,
        endpoints: Vec<RpcUrl>,
        listener_config: ListenerConfig,
        handlers: Vec<BlockHandlerFor>,
    ) -> ferry_relayer_utils::Result<()> {
        let mut shutdown = ctx.shutdown_signal();
        let mut rotation = EndpointRotation::new(endpoints);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            started = true,
            chain_id = %chain_id,
        );
        loop {
            let poller = Poller {
                chain_id,
                ctx: &ctx,
                store: store.as_ref(),
                connection: &connection,
                config: &listener_config,
                handlers: &handlers,
            };
            match poller.poll_blocks(&mut shutdown).await {
                Err(Error::PollingExhausted { .. }) => {
                    ctx.metrics
                        .listener_back_off
                        .with_label_values(&[&chain_id.to_string()])
                        .inc();
                    tracing::warn!(
                        "Polling retries exhausted on {}, failing over",
                        rotation
                            .current()
                            .map(ToString::to_string)
                            .unwrap_or_default()
                    );
                    rotation
                        .failover(connection.as_ref(), &mut shutdown, chain_id)
                        .await?;
                }
                result => {
                    tracing::event!(
                        target: probe::TARGET,
                        tracing::Level::DEBUG,
                        kind = %probe::Kind::Lifecycle,
                        stopped = true,
                        chain_id = %chain_id,
                        ok = result.is_ok(),
                    );
                    return result;
                }
            }
        }
    }
}

/// One run of the polling loop, between two failovers.
struct Poller<'a, S> {
    chain_id: ChainId,
    ctx: &'a RelayerContext,
    store: &'a S,
    connection: &'a Arc<dyn ChainConnection>,
    config: &'a ListenerConfig,
    handlers: &'a [BlockHandlerFor],
}

impl<'a, S: HistoryStore> Poller<'a, S> {
    /// Polls until the end block, shutdown or the retry budget runs out
    /// ([`Error::PollingExhausted`]).
    async fn poll_blocks(
        &self,
        shutdown: &mut Shutdown,
    ) -> ferry_relayer_utils::Result<()> {
        let key = HistoryStoreKey::from(self.chain_id);
        let interval = self.config.retry_interval();
        let mut budget = retry::ConstantWithMaxRetryCount::new(
            interval,
            self.config.block_retry_limit,
        );
        let warn_below = self.config.block_retry_limit / 2;
        let print_progress_interval =
            Duration::from_millis(self.config.print_progress_interval);
        let mut instant = std::time::Instant::now();
        // resume right after the last processed block.
        let mut cursor = match self.store.last_block_number(key)? {
            Some(n) => Some(n + 1),
            None => self.config.start_block,
        };
        tracing::debug!("Starting to poll from {:?}", cursor);

        loop {
            let result = self.poll_once(&mut cursor, key, shutdown).await;
            match result {
                Ok(Poll::Wait) => {
                    tracing::trace!("Cooldown a bit for {}ms", interval.as_millis());
                    shutdown.sleep(interval).await?;
                }
                Ok(Poll::Finished) => {
                    tracing::info!("Reached the end block, stopping");
                    return Ok(());
                }
                Ok(Poll::Processed { block, finalized }) => {
                    cursor = Some(block + 1);
                    budget.reset();
                    self.record_progress(block, finalized);
                    if block % INFO_LOG_EVERY == 0 {
                        tracing::info!("Processed block #{}", block);
                    } else {
                        tracing::debug!("Processed block #{}", block);
                    }
                    if print_progress_interval != Duration::from_millis(0)
                        && instant.elapsed() > print_progress_interval
                    {
                        let sync_progress =
                            block as f64 / finalized.max(1) as f64 * 100.0;
                        tracing::info!(
                            "🔄 #{} of #{} ({:.4}%)",
                            block,
                            finalized,
                            sync_progress
                        );
                        instant = std::time::Instant::now();
                    }
                }
                Err(Error::Terminated) => return Err(Error::Terminated),
                Err(e) => match budget.next_backoff() {
                    Some(delay) => {
                        let left = budget.retries_left();
                        if left < warn_below {
                            tracing::warn!(
                                "Polling failed ({} retries left): {}",
                                left,
                                e
                            );
                        } else {
                            tracing::debug!(
                                "Polling failed ({} retries left): {}",
                                left,
                                e
                            );
                        }
                        tracing::event!(
                            target: probe::TARGET,
                            tracing::Level::DEBUG,
                            kind = %probe::Kind::Retry,
                            chain_id = %self.chain_id,
                            retries_left = left,
                            error = %e,
                        );
                        shutdown.sleep(delay).await?;
                    }
                    None => {
                        tracing::error!("Polling failed, giving up: {}", e);
                        return Err(Error::PollingExhausted {
                            chain_id: self.chain_id.0,
                        });
                    }
                },
            }
        }
    }

    async fn poll_once(
        &self,
        cursor: &mut Option<u64>,
        key: HistoryStoreKey,
        shutdown: &mut Shutdown,
    ) -> ferry_relayer_utils::Result<Poll> {
        let head = shutdown.race(self.connection.finalized_head()).await??;
        let finalized = shutdown
            .race(self.connection.header(head))
            .await??
            .ok_or_else(|| {
                Error::TransientRpc(format!("no header for finalized {head}"))
            })?
            .number;
        self.ctx
            .metrics
            .latest_known_block
            .with_label_values(&[&self.chain_id.to_string()])
            .set(i64::try_from(finalized).unwrap_or(i64::MAX));

        let current = *cursor.get_or_insert(finalized);
        tracing::trace!(%current, %finalized);
        if current > finalized {
            return Ok(Poll::Wait);
        }
        if matches!(self.config.end_block, Some(end) if current > end) {
            return Ok(Poll::Finished);
        }

        let Some(hash) =
            shutdown.race(self.connection.block_hash(current)).await??
        else {
            return Ok(Poll::Wait);
        };
        let Some(block) = shutdown.race(self.connection.block(hash)).await??
        else {
            return Ok(Poll::Wait);
        };
        tracing::trace!(
            "Block #{} has {} extrinsics and {} events",
            current,
            block.extrinsics.len(),
            block.events.len()
        );

        // wraps each handler future in a retry logic, that will retry the handler
        // if it fails, up to `HANDLER_MAX_RETRY_COUNT`, after this it will give up
        // on this block for that specific handler.
        let tasks = self.handlers.iter().map(|handler| {
            let backoff = retry::ConstantWithMaxRetryCount::new(
                HANDLER_RETRY_INTERVAL,
                HANDLER_MAX_RETRY_COUNT,
            );
            handler.handle_block_with_retry(
                self.connection.clone(),
                &block,
                backoff,
            )
        });
        let result = shutdown.race(futures::future::join_all(tasks)).await?;

        // the block is marked as handled if at least one handler succeeded.
        let mark_as_handled =
            result.is_empty() || result.iter().any(Result::is_ok);
        result.iter().for_each(|r| {
            if let Err(e) = r {
                tracing::error!("{}", e);
            }
        });
        if !mark_as_handled {
            tracing::error!(
                "Error while handling block #{}, all handlers failed.",
                current
            );
            return Err(Error::ForceRestart);
        }

        self.store.set_last_block_number(key, current)?;
        Ok(Poll::Processed {
            block: current,
            finalized,
        })
    }

    fn record_progress(&self, block: u64, finalized: u64) {
        let label = self.chain_id.to_string();
        let metrics = &self.ctx.metrics;
        metrics.blocks_processed.with_label_values(&[&label]).inc();
        metrics
            .latest_processed_block
            .with_label_values(&[&label])
            .set(i64::try_from(block).unwrap_or(i64::MAX));
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::TRACE,
            kind = %probe::Kind::Sync,
            chain_id = %self.chain_id,
            block,
            finalized,
        );
    }
}
