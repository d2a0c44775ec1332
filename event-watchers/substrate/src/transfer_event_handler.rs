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
    Block, ChainEvent, ChainId, CrossChainMessage, FungibleTransfer, Payload,
};
use ferry_relayer_utils::{probe, Result};

use crate::direction_to;

/// TransferEventHandler reports the transfer events of the bridge pallet.
#[derive(typed_builder::TypedBuilder)]
pub struct TransferEventHandler {
    chain_id: ChainId,
    converter: AmountConverter,
    config: RelayerConfig,
    router: Arc<dyn Router>,
}

impl TransferEventHandler {
    fn convert(&self, transfer: &FungibleTransfer) -> Result<FungibleTransfer> {
        let asset_id =
            self.converter.asset_id_for_resource(&transfer.resource_id)?;
        let amount = self.converter.convert(
            direction_to(&self.config, transfer.destination),
            &transfer.amount,
            asset_id,
        )?;
        Ok(FungibleTransfer {
            amount,
            ..transfer.clone()
        })
    }

    fn to_message(&self, event: &ChainEvent) -> Option<Result<CrossChainMessage>> {
        let msg = match event {
            ChainEvent::NativeTransfer(t) => self.convert(t).map(|t| {
                CrossChainMessage::new(
                    self.chain_id,
                    t.destination,
                    t.deposit_nonce,
                    t.resource_id,
                    Payload::Native {
                        amount: t.amount,
                        recipient: t.recipient,
                    },
                )
            }),
            ChainEvent::FungibleTransfer(t) => self.convert(t).map(|t| {
                CrossChainMessage::new(
                    self.chain_id,
                    t.destination,
                    t.deposit_nonce,
                    t.resource_id,
                    Payload::Fungible {
                        amount: t.amount,
                        recipient: t.recipient,
                    },
                )
            }),
            ChainEvent::NonFungibleTransfer(t) => Ok(CrossChainMessage::new(
                self.chain_id,
                t.destination,
                t.deposit_nonce,
                t.resource_id,
                Payload::NonFungible {
                    token_id: t.token_id.clone(),
                    recipient: t.recipient.clone(),
                    metadata: t.metadata.clone(),
                },
            )),
            ChainEvent::GenericTransfer(t) => Ok(CrossChainMessage::new(
                self.chain_id,
                t.destination,
                t.deposit_nonce,
                t.resource_id,
                Payload::Generic {
                    metadata: t.metadata.clone(),
                },
            )),
            ChainEvent::CodeUpdated | ChainEvent::Other => return None,
        };
        Some(msg)
    }
}

#[async_trait::async_trait]
impl BlockHandler for TransferEventHandler {
    async fn can_handle_block(&self, block: &Block) -> Result<bool> {
        Ok(block
            .events
            .iter()
            .any(|e| !matches!(e, ChainEvent::Other)))
    }

    #[tracing::instrument(skip_all, fields(block = block.number()))]
    async fn handle_block(
        &self,
        connection: Arc<dyn ChainConnection>,
        block: &Block,
    ) -> Result<()> {
        for event in &block.events {
            if matches!(event, ChainEvent::CodeUpdated) {
                tracing::info!("runtime upgraded, refreshing metadata");
                if let Err(e) = connection.refresh_metadata().await {
                    tracing::error!("failed to refresh metadata: {e}");
                }
                continue;
            }
            let msg = match self.to_message(event) {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    tracing::warn!("dropping transfer event: {e}");
                    continue;
                }
                None => continue,
            };
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Listener,
                chain_id = %self.chain_id,
                %msg,
            );
            if let Err(e) = self.router.send(msg) {
                tracing::error!("failed to route transfer event: {e}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config, CollectingRouter};
    use ferry_chain_connection::mock::MockConnection;
    use ferry_relayer_types::{
        Address, BigUint, DepositNonce, GenericTransfer, Header,
        NonFungibleTransfer, ResourceId,
    };

    fn handler(router: Arc<CollectingRouter>) -> TransferEventHandler {
        let config = config();
        TransferEventHandler::builder()
            .chain_id(ChainId(2))
            .converter(AmountConverter::new(config.currency_table(), "KSM"))
            .config(config)
            .router(router)
            .build()
    }

    fn block(events: Vec<ChainEvent>) -> Block {
        Block {
            header: Header {
                number: 5,
                hash: MockConnection::hash_of(5),
                parent_hash: MockConnection::hash_of(4),
            },
            extrinsics: vec![],
            events,
        }
    }

    fn fungible(destination: u8, amount: u64) -> FungibleTransfer {
        FungibleTransfer {
            destination: ChainId(destination),
            deposit_nonce: DepositNonce(42),
            resource_id: ResourceId::AKSM,
            amount: BigUint::from(amount),
            recipient: Address(vec![5; 32]),
        }
    }

    #[tokio::test]
    async fn converts_transfers_to_a_multisig_chain() {
        let router = Arc::new(CollectingRouter::default());
        let handler = handler(router.clone());
        let conn: Arc<dyn ChainConnection> =
            Arc::new(MockConnection::builder().build());
        // kusama redeems through its vault: rescale first, then the fee.
        let b = block(vec![
            ChainEvent::FungibleTransfer(fungible(1, 100_000_000_000_000_000)),
            ChainEvent::Other,
        ]);
        assert!(handler.can_handle_block(&b).await.unwrap());
        handler.handle_block(conn, &b).await.unwrap();
        let messages = router.messages();
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.source(), ChainId(2));
        assert_eq!(msg.destination(), ChainId(1));
        assert_eq!(msg.deposit_nonce(), DepositNonce(42));
        // 1e17 / 1e6 = 1e11, minus 1e10 fixed and 1e8 proportional.
        assert_eq!(
            msg.payload(),
            &Payload::Fungible {
                amount: BigUint::from(89_900_000_000u64),
                recipient: Address(vec![5; 32]),
            }
        );
    }

    #[tokio::test]
    async fn passes_non_fungible_and_generic_through() {
        let router = Arc::new(CollectingRouter::default());
        let handler = handler(router.clone());
        let conn: Arc<dyn ChainConnection> =
            Arc::new(MockConnection::builder().build());
        let b = block(vec![
            ChainEvent::NonFungibleTransfer(NonFungibleTransfer {
                destination: ChainId(1),
                deposit_nonce: DepositNonce(1),
                resource_id: ResourceId::XASSET,
                token_id: BigUint::from(7u8),
                recipient: Address(vec![5; 32]),
                metadata: b"meta".to_vec(),
            }),
            ChainEvent::GenericTransfer(GenericTransfer {
                destination: ChainId(1),
                deposit_nonce: DepositNonce(2),
                resource_id: ResourceId::XASSET,
                metadata: b"blob".to_vec(),
            }),
        ]);
        handler.handle_block(conn, &b).await.unwrap();
        let types: Vec<_> = router
            .messages()
            .iter()
            .map(|m| m.message_type().to_string())
            .collect();
        assert_eq!(types, vec!["nonfungible", "generic"]);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn drops_transfers_below_the_fee() {
        let router = Arc::new(CollectingRouter::default());
        let handler = handler(router.clone());
        let conn: Arc<dyn ChainConnection> =
            Arc::new(MockConnection::builder().build());
        let b = block(vec![ChainEvent::NativeTransfer(fungible(1, 1_000))]);
        handler.handle_block(conn, &b).await.unwrap();
        assert!(router.messages().is_empty());
        assert!(logs_contain("dropping transfer event"));
    }

    #[tokio::test]
    async fn code_update_refreshes_metadata() {
        let router = Arc::new(CollectingRouter::default());
        let handler = handler(router.clone());
        let mock = Arc::new(MockConnection::builder().build());
        let b = block(vec![ChainEvent::CodeUpdated]);
        assert!(handler.can_handle_block(&b).await.unwrap());
        handler.handle_block(mock.clone(), &b).await.unwrap();
        assert_eq!(mock.metadata_refreshes(), 1);
        assert!(router.messages().is_empty());
    }
}
