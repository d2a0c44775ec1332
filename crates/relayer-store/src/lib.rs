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

//! # Relayer Store Module 🕸️
//!
//! A module for managing the storage of the relayer.
//!
//! ## Overview
//!
//! The relayer store keeps the block cursor of every listener, so a restart
//! resumes right after the last processed block. It also holds the two
//! in-memory registries shared by the listener and the writer of a chain:
//! the [`MultiSigTracker`] and the [`ActiveRedemptions`] set.
use std::fmt::{Debug, Display};

use ferry_relayer_types::ChainId;
use ferry_relayer_utils::Result;

/// Redemptions currently being driven by a writer.
pub mod active;
/// A module for managing in-memory storage of the relayer.
pub mod mem;
/// Pending multisig transactions observed on chain.
pub mod multisig;
/// A module for setting up and managing a [Sled](https://sled.rs)-based database.
#[cfg(feature = "sled")]
pub mod sled;

/// A store that uses [`sled`](https://sled.rs) as the backend.
#[cfg(feature = "sled")]
pub use self::sled::SledStore;
pub use active::{ActiveRedemptions, RedemptionGuard};
/// A store that uses in memory data structures as the backend.
pub use mem::InMemoryStore;
pub use multisig::{MultiSigStatus, MultiSigTracker, PendingSignatureTx};

/// HistoryStoreKey contains the keys used to store the history of events.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HistoryStoreKey {
    /// Block cursor of a chain listener.
    Block { chain_id: ChainId },
}

impl HistoryStoreKey {
    /// Returns the chain id of the chain this key is for.
    pub fn chain_id(&self) -> ChainId {
        match self {
            HistoryStoreKey::Block { chain_id } => *chain_id,
        }
    }

    /// Returns the bytes of the key.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Block { chain_id } => vec![b'b', chain_id.0],
        }
    }
}

impl Display for HistoryStoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Block { chain_id } => write!(f, "Block(ChainId {chain_id})"),
        }
    }
}

impl From<ChainId> for HistoryStoreKey {
    fn from(chain_id: ChainId) -> Self {
        Self::Block { chain_id }
    }
}

/// HistoryStore is a simple trait for storing and retrieving history
/// of block numbers.
pub trait HistoryStore: Clone + Send + Sync {
    /// Sets the new block number for that chain and returns the old one.
    /// When there was none, the new one is returned.
    fn set_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        block_number: u64,
    ) -> Result<u64>;

    /// Get the last processed block number, if any was ever stored.
    fn last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
    ) -> Result<Option<u64>>;

    /// Get the last block number for that chain.
    /// if not found, returns the `default_block_number`.
    fn get_last_block_number<K: Into<HistoryStoreKey> + Debug>(
        &self,
        key: K,
        default_block_number: u64,
    ) -> Result<u64> {
        Ok(self.last_block_number(key)?.unwrap_or(default_block_number))
    }
}
