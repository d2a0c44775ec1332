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
//! # Relayer Router 🕸️
//!
//! Hands the messages found by listeners to the writer of their
//! destination chain.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use ferry_relayer_types::{ChainId, CrossChainMessage};
use ferry_relayer_utils::{metric::Metrics, probe, Error, Result};

/// The sending half of a writer inbox.
pub type MessageSender = mpsc::UnboundedSender<CrossChainMessage>;
/// The receiving half of a writer inbox.
pub type MessageReceiver = mpsc::UnboundedReceiver<CrossChainMessage>;

/// Delivers a message to the writer of its destination chain.
pub trait Router: Send + Sync {
    /// Queues `msg` for its destination. Delivery is fire and forget: once
    /// this returns `Ok` the message belongs to the writer.
    fn send(&self, msg: CrossChainMessage) -> Result<()>;
}

/// A [`Router`] with one unbounded channel per destination chain.
///
/// Writers [`register`](ChannelRouter::register) their chain and consume the
/// returned receiver.
#[derive(Debug)]
pub struct ChannelRouter {
    registry: RwLock<HashMap<ChainId, MessageSender>>,
    metrics: Arc<Metrics>,
}

impl ChannelRouter {
    /// Creates a router with no destination.
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            registry: RwLock::default(),
            metrics,
        }
    }

    /// Registers `chain_id` as a destination.
    ///
    /// Registering a chain again replaces its previous inbox.
    pub fn register(&self, chain_id: ChainId) -> MessageReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.registry.write().insert(chain_id, tx).is_some() {
            tracing::warn!("Chain {} registered twice in the router", chain_id);
        }
        rx
    }

    /// Removes `chain_id`, closing its inbox.
    pub fn unregister(&self, chain_id: ChainId) {
        self.registry.write().remove(&chain_id);
    }

    /// The inbox of `chain_id`.
    pub fn lookup(&self, chain_id: ChainId) -> Option<MessageSender> {
        self.registry.read().get(&chain_id).cloned()
    }
}

impl Router for ChannelRouter {
    fn send(&self, msg: CrossChainMessage) -> Result<()> {
        let destination = msg.destination();
        let not_found = || Error::ChainNotFound {
            chain_id: destination.to_string(),
        };
        let inbox = self.lookup(destination).ok_or_else(not_found)?;
        let source = msg.source();
        let nonce = msg.deposit_nonce();
        tracing::debug!("Routing {}", msg);
        // a closed inbox means the writer is gone.
        inbox.send(msg).map_err(|_| not_found())?;
        self.metrics
            .messages_routed
            .with_label_values(&[&source.to_string()])
            .inc();
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Listener,
            routed = true,
            source = %source,
            destination = %destination,
            nonce = %nonce,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_relayer_types::{
        Address, BigUint, DepositNonce, Payload, ResourceId,
    };

    fn message(destination: u8) -> CrossChainMessage {
        CrossChainMessage::new(
            ChainId(1),
            ChainId(destination),
            DepositNonce(1),
            ResourceId::AKSM,
            Payload::MultiSig {
                amount: BigUint::from(10u32),
                recipient: Address(vec![1; 32]),
            },
        )
    }

    #[tokio::test]
    async fn routes_by_destination() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let router = ChannelRouter::new(metrics.clone());
        let mut two = router.register(ChainId(2));
        let mut three = router.register(ChainId(3));
        router.send(message(3)).unwrap();
        router.send(message(2)).unwrap();
        assert_eq!(two.recv().await.unwrap().destination(), ChainId(2));
        assert_eq!(three.recv().await.unwrap().destination(), ChainId(3));
        assert!(two.try_recv().is_err());
        assert_eq!(metrics.messages_routed.with_label_values(&["1"]).get(), 2);
    }

    #[test]
    fn unknown_or_closed_destination() {
        let router = ChannelRouter::new(Arc::new(Metrics::new().unwrap()));
        assert!(matches!(
            router.send(message(9)),
            Err(Error::ChainNotFound { .. })
        ));
        drop(router.register(ChainId(2)));
        assert!(matches!(
            router.send(message(2)),
            Err(Error::ChainNotFound { .. })
        ));
        router.unregister(ChainId(2));
        assert!(router.lookup(ChainId(2)).is_none());
    }
}
