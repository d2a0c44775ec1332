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

use std::sync::Arc;

use ferry_chain_connection::ChainConnection;
use ferry_chains_info::AmountConverter;
use ferry_event_watcher_traits::BlockHandler;
use ferry_relayer_config::RelayerConfig;
use ferry_relayer_router::Router;
use ferry_relayer_types::{
    AccountId32, Address, BatchTransfer, Block, ChainId, CrossChainMessage,
    DepositNonce, Extrinsic, ExtrinsicCall, Payload, ResourceId,
};
use ferry_relayer_utils::{probe, Error, Result};
use num_traits::Zero;

use crate::direction_to;

/// The parts of a batch deposit remark, `"destId,suffix,recipient"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remark {
    pub destination: ChainId,
    pub resource_id: ResourceId,
    pub recipient: Address,
}

/// Parses the remark attached to a batch deposit.
///
/// A recipient starting with `hex` is a hex encoded 32 bytes account, with
/// or without `0x`. Any other recipient is taken as raw bytes.
pub fn parse_remark(remark: &str) -> Result<Remark> {
    let parts: Vec<&str> = remark.split(',').collect();
    let [destination, suffix, recipient] = parts[..] else {
        return Err(Error::Parse(format!(
            "remark {remark:?} must have 3 comma separated parts"
        )));
    };
    let destination = destination.trim().parse::<u8>().map_err(|e| {
        Error::Parse(format!("bad destination {destination:?}: {e}"))
    })?;
    let resource_id = ResourceId::from_suffix(suffix.trim()).map_err(|e| {
        Error::Parse(format!("bad resource suffix {suffix:?}: {e}"))
    })?;
    let recipient = recipient.trim();
    if recipient.is_empty() {
        return Err(Error::Parse("empty recipient".into()));
    }
    let recipient = match recipient.strip_prefix("hex") {
        Some(encoded) => encoded
            .parse::<AccountId32>()
            .map(Address::from)
            .map_err(|e| {
                Error::Parse(format!("bad hex recipient {recipient:?}: {e}"))
            })?,
        None => Address(recipient.as_bytes().to_vec()),
    };
    Ok(Remark {
        destination: ChainId(destination),
        resource_id,
        recipient,
    })
}

/// BatchDepositHandler turns `Utility.batch` deposits to the vault into
/// multisig messages.
#[derive(typed_builder::TypedBuilder)]
pub struct BatchDepositHandler {
    chain_id: ChainId,
    vault: AccountId32,
    /// Diagnostic mode, see [`ferry_relayer_config::MultiSigConfig`].
    #[builder(default)]
    lost_address: Option<AccountId32>,
    converter: AmountConverter,
    config: RelayerConfig,
    router: Arc<dyn Router>,
}

impl BatchDepositHandler {
    fn deposit_of<'a>(
        &self,
        extrinsic: &'a Extrinsic,
    ) -> Option<&'a BatchTransfer> {
        match &extrinsic.call {
            ExtrinsicCall::Batch(batch)
                if extrinsic.success && batch.to == self.vault =>
            {
                Some(batch)
            }
            _ => None,
        }
    }

    fn to_message(
        &self,
        height: u64,
        index: u32,
        batch: &BatchTransfer,
    ) -> Result<CrossChainMessage> {
        if batch.amount.is_zero() {
            return Err(Error::Validation("zero amount deposit".into()));
        }
        let remark = match batch.remark.as_deref() {
            Some(r) if !r.is_empty() => parse_remark(r)?,
            _ => return Err(Error::Parse("deposit without remark".into())),
        };
        if !self.config.is_whitelisted(
            self.chain_id,
            remark.destination,
            &remark.resource_id,
        ) {
            return Err(Error::Validation(format!(
                "route {} -> {} ({}) is not whitelisted",
                self.chain_id, remark.destination, remark.resource_id
            )));
        }
        let amount = self.converter.convert(
            direction_to(&self.config, remark.destination),
            &batch.amount,
            batch.asset_id,
        )?;
        let nonce = format!("{height}{index}").parse::<u64>().map_err(|e| {
            Error::Validation(format!("deposit nonce of {height}-{index}: {e}"))
        })?;
        Ok(CrossChainMessage::new(
            self.chain_id,
            remark.destination,
            DepositNonce(nonce),
            remark.resource_id,
            Payload::MultiSig {
                amount,
                recipient: remark.recipient,
            },
        ))
    }
}

#[async_trait::async_trait]
impl BlockHandler for BatchDepositHandler {
    async fn can_handle_block(&self, block: &Block) -> Result<bool> {
        Ok(block.extrinsics.iter().any(|e| self.deposit_of(e).is_some()))
    }

    #[tracing::instrument(skip_all, fields(block = block.number()))]
    async fn handle_block(
        &self,
        _connection: Arc<dyn ChainConnection>,
        block: &Block,
    ) -> Result<()> {
        for extrinsic in &block.extrinsics {
            let Some(batch) = self.deposit_of(extrinsic) else {
                continue;
            };
            if let Some(lost) = &self.lost_address {
                if extrinsic.signer.as_ref() == Some(lost) {
                    tracing::info!(
                        block = block.number(),
                        index = extrinsic.index,
                        amount = %batch.amount,
                        remark = ?batch.remark,
                        "found lost batch deposit",
                    );
                }
                continue;
            }
            let msg =
                match self.to_message(block.number(), extrinsic.index, batch) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!(
                            index = extrinsic.index,
                            "dropping batch deposit: {e}"
                        );
                        continue;
                    }
                };
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Listener,
                chain_id = %self.chain_id,
                %msg,
            );
            if let Err(e) = self.router.send(msg) {
                tracing::error!("failed to route batch deposit: {e}");
            }
        }
        Ok(())
    }
}
