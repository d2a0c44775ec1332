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

use derive_more::Display;
use num_bigint::BigUint;

use crate::{Address, ChainId, DepositNonce, ResourceId};

/// The kind of a [`CrossChainMessage`], derived from its payload.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Native currency transfer.
    #[display(fmt = "native")]
    Native,
    /// Fungible token transfer.
    #[display(fmt = "fungible")]
    Fungible,
    /// Non fungible token transfer.
    #[display(fmt = "nonfungible")]
    NonFungible,
    /// Arbitrary metadata for a generic handler.
    #[display(fmt = "generic")]
    Generic,
    /// A batch deposit that is redeemed through a multisig.
    #[display(fmt = "multisig")]
    MultiSig,
}

/// What a message carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Native currency transfer.
    Native {
        /// Amount, already converted to the destination precision.
        amount: BigUint,
        /// Who receives it.
        recipient: Address,
    },
    /// Fungible token transfer.
    Fungible {
        /// Amount, already converted to the destination precision.
        amount: BigUint,
        /// Who receives it.
        recipient: Address,
    },
    /// Non fungible token transfer.
    NonFungible {
        /// The token.
        token_id: BigUint,
        /// Who receives it.
        recipient: Address,
        /// Token metadata.
        metadata: Vec<u8>,
    },
    /// Arbitrary metadata.
    Generic {
        /// The metadata, hashed before it is proposed.
        metadata: Vec<u8>,
    },
    /// A vault deposit redeemed through a multisig.
    MultiSig {
        /// Amount, already converted to the destination precision.
        amount: BigUint,
        /// Who receives it.
        recipient: Address,
    },
}

impl Payload {
    /// The kind of this payload.
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::Native { .. } => MessageType::Native,
            Payload::Fungible { .. } => MessageType::Fungible,
            Payload::NonFungible { .. } => MessageType::NonFungible,
            Payload::Generic { .. } => MessageType::Generic,
            Payload::MultiSig { .. } => MessageType::MultiSig,
        }
    }

    /// The transferred amount, if the payload moves value.
    pub fn amount(&self) -> Option<&BigUint> {
        match self {
            Payload::Native { amount, .. }
            | Payload::Fungible { amount, .. }
            | Payload::MultiSig { amount, .. } => Some(amount),
            _ => None,
        }
    }

    /// The recipient, if the payload has one.
    pub fn recipient(&self) -> Option<&Address> {
        match self {
            Payload::Native { recipient, .. }
            | Payload::Fungible { recipient, .. }
            | Payload::NonFungible { recipient, .. }
            | Payload::MultiSig { recipient, .. } => Some(recipient),
            Payload::Generic { .. } => None,
        }
    }
}

/// Identifies an in-flight redemption.
///
/// Two messages with the same key are never redeemed concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedemptionKey {
    /// Recipient bytes, empty for generic payloads.
    pub recipient: Vec<u8>,
    /// Big endian amount, token id or metadata.
    pub amount: Vec<u8>,
}

/// A deposit observed on a source chain, on its way to a destination chain.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossChainMessage {
    source: ChainId,
    destination: ChainId,
    deposit_nonce: DepositNonce,
    resource_id: ResourceId,
    payload: Payload,
}

impl CrossChainMessage {
    /// Creates a new message.
    pub fn new(
        source: ChainId,
        destination: ChainId,
        deposit_nonce: DepositNonce,
        resource_id: ResourceId,
        payload: Payload,
    ) -> Self {
        Self {
            source,
            destination,
            deposit_nonce,
            resource_id,
            payload,
        }
    }

    pub fn source(&self) -> ChainId {
        self.source
    }

    pub fn destination(&self) -> ChainId {
        self.destination
    }

    pub fn deposit_nonce(&self) -> DepositNonce {
        self.deposit_nonce
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    /// The key used to deduplicate redemptions of this message.
    pub fn redemption_key(&self) -> RedemptionKey {
        match &self.payload {
            Payload::Native { amount, recipient }
            | Payload::Fungible { amount, recipient }
            | Payload::MultiSig { amount, recipient } => RedemptionKey {
                recipient: recipient.0.clone(),
                amount: amount.to_bytes_be(),
            },
            Payload::NonFungible {
                token_id,
                recipient,
                ..
            } => RedemptionKey {
                recipient: recipient.0.clone(),
                amount: token_id.to_bytes_be(),
            },
            Payload::Generic { metadata } => RedemptionKey {
                recipient: Vec::new(),
                amount: metadata.clone(),
            },
        }
    }
}

impl std::fmt::Display for CrossChainMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} -> {} nonce={} resource={}",
            self.message_type(),
            self.source,
            self.destination,
            self.deposit_nonce,
            self.resource_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fungible(amount: u64, recipient: &[u8]) -> CrossChainMessage {
        CrossChainMessage::new(
            ChainId(1),
            ChainId(2),
            DepositNonce(7),
            ResourceId::AKSM,
            Payload::Fungible {
                amount: BigUint::from(amount),
                recipient: Address(recipient.to_vec()),
            },
        )
    }

    #[test]
    fn redemption_key_ignores_nonce_and_source() {
        let a = fungible(10, b"bob");
        let b = CrossChainMessage::new(
            ChainId(9),
            ChainId(2),
            DepositNonce(8),
            ResourceId::AKSM,
            a.payload().clone(),
        );
        assert_eq!(a.redemption_key(), b.redemption_key());
        assert_ne!(a.redemption_key(), fungible(11, b"bob").redemption_key());
    }

    #[test]
    fn generic_key_uses_metadata() {
        let msg = CrossChainMessage::new(
            ChainId(1),
            ChainId(2),
            DepositNonce(1),
            ResourceId::XASSET,
            Payload::Generic {
                metadata: vec![1, 2, 3],
            },
        );
        let key = msg.redemption_key();
        assert!(key.recipient.is_empty());
        assert_eq!(key.amount, vec![1, 2, 3]);
        assert_eq!(msg.message_type(), MessageType::Generic);
        assert!(msg.payload().amount().is_none());
    }
}
