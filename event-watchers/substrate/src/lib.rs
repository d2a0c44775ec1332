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

//! # Deposit Listener 🕸️
//!
//! The block handlers that turn chain activity into cross-chain messages,
//! and the [`DepositListener`] that drives them.

use std::sync::Arc;

use ferry_chains_info::{AmountConverter, Direction};
use ferry_event_watcher_traits::{BlockHandlerFor, BlockWatcher};
use ferry_relayer_config::{ChainConfig, RelayerConfig};
use ferry_relayer_context::RelayerContext;
use ferry_relayer_router::Router;
use ferry_relayer_store::{MultiSigTracker, SledStore};
use ferry_relayer_types::ChainId;

mod batch_deposit_handler;
mod multisig_lifecycle_handler;
mod transfer_event_handler;

#[doc(hidden)]
pub use batch_deposit_handler::*;
#[doc(hidden)]
pub use multisig_lifecycle_handler::*;
#[doc(hidden)]
pub use transfer_event_handler::*;

/// Follows the finalized blocks of a chain and reports its deposits.
#[derive(Copy, Clone, Debug, Default)]
pub struct DepositListener;

#[async_trait::async_trait]
impl BlockWatcher for DepositListener {
    const TAG: &'static str = "Deposit Listener";

    type Store = SledStore;
}

/// The handlers of the deposit listener of `chain`.
///
/// Every chain reports its bridge transfer events. Chains with a multisig
/// vault also track the multisig lifecycle and the batch deposits made to
/// the vault.
pub fn deposit_handlers(
    ctx: &RelayerContext,
    chain: &ChainConfig,
    tracker: Arc<MultiSigTracker>,
    router: Arc<dyn Router>,
) -> Vec<BlockHandlerFor> {
    let converter =
        AmountConverter::new(ctx.config.currency_table(), chain.native_token());
    let mut handlers: Vec<BlockHandlerFor> = vec![Box::new(
        TransferEventHandler::builder()
            .chain_id(chain.chain_id)
            .converter(converter.clone())
            .config(ctx.config.clone())
            .router(router.clone())
            .build(),
    )];
    if let Some(multisig) = &chain.multisig {
        handlers.push(Box::new(
            MultiSigLifecycleHandler::builder()
                .chain_id(chain.chain_id)
                .identity(chain.relayer.identity())
                .tracker(tracker)
                .build(),
        ));
        handlers.push(Box::new(
            BatchDepositHandler::builder()
                .chain_id(chain.chain_id)
                .vault(multisig.vault)
                .lost_address(multisig.lost_address)
                .converter(converter)
                .config(ctx.config.clone())
                .router(router)
                .build(),
        ));
    }
    handlers
}

/// How an amount sent to `destination` is converted.
pub(crate) fn direction_to(
    config: &RelayerConfig,
    destination: ChainId,
) -> Direction {
    let multisig = config
        .chain(destination)
        .map(ChainConfig::is_multisig)
        .unwrap_or_default();
    Direction::for_destination(multisig)
}
