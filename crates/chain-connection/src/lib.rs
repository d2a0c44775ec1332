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
//! # Chain Connection Module 🕸️
//!
//! The boundary between the relayer and a chain node.
//!
//! ## Overview
//!
//! The relayer never talks to a node directly. Listeners and writers go
//! through a [`ChainConnection`], which hands out blocks already decoded
//! into [`ferry_relayer_types::Block`] and accepts [`ferry_relayer_types::Call`]s
//! to sign and submit. On top of it this crate provides:
//!
//! * [`Submitter`]: nonce-locked submission and status watching.
//! * [`EndpointRotation`]: failover between the configured endpoints.
//! * `MockConnection` (feature `mocks`): an in-memory chain for tests.

use futures::stream::BoxStream;
use parity_scale_codec::Decode;

use ferry_relayer_types::{
    AccountId32, Block, BlockHash, Call, ChainId, Header, RpcUrl, StorageKey,
    TxHandle, TxStatus,
};
use ferry_relayer_utils::{Error, Result};

/// Failover between endpoints.
pub mod endpoints;
/// Nonce-locked submission.
pub mod submitter;

/// An in-memory chain.
#[cfg(any(test, feature = "mocks"))]
pub mod mock;

pub use endpoints::EndpointRotation;
pub use submitter::Submitter;

/// A connection to a chain node.
///
/// Implementations sign what they submit with the relayer key and decode
/// blocks into the relayer data model. Errors that may go away on their own
/// (timeouts, a node restarting) must be reported as
/// [`ferry_relayer_utils::Error::TransientRpc`], callers retry on them.
#[async_trait::async_trait]
pub trait ChainConnection: Send + Sync {
    /// Height of the best block.
    async fn latest_block(&self) -> Result<u64>;

    /// Hash of the last finalized block.
    async fn finalized_head(&self) -> Result<BlockHash>;

    /// The header of the block with `hash`, if the node knows it.
    async fn header(&self, hash: BlockHash) -> Result<Option<Header>>;

    /// The hash of the canonical block at `height`, `None` if it is not
    /// produced yet.
    async fn block_hash(&self, height: u64) -> Result<Option<BlockHash>>;

    /// The header of the canonical block at `height`.
    async fn header_at(&self, height: u64) -> Result<Option<Header>> {
        match self.block_hash(height).await? {
            Some(hash) => self.header(hash).await,
            None => Ok(None),
        }
    }

    /// The block with `hash`, with its extrinsics and events decoded.
    async fn block(&self, hash: BlockHash) -> Result<Option<Block>>;

    /// Raw SCALE encoded value stored under `key` at the best block.
    async fn query_storage(&self, key: &StorageKey) -> Result<Option<Vec<u8>>>;

    /// The next nonce of `account`, read from `System.Account`.
    async fn account_nonce(&self, account: &AccountId32) -> Result<u64> {
        let key = StorageKey::new("System", "Account").with_key(account);
        match self.query_storage(&key).await? {
            // AccountInfo starts with the nonce.
            Some(raw) => Ok(u32::decode(&mut &raw[..])?.into()),
            None => Ok(0),
        }
    }

    /// Raw SCALE encoded runtime constant `pallet.name`, `None` if the
    /// runtime does not declare it.
    async fn constant(&self, pallet: &str, name: &str) -> Result<Option<Vec<u8>>>;

    /// Checks that the node runs the chain known to the bridge as
    /// `expected`, read from the `ChainBridge.ChainIdentity` constant.
    async fn verify_chain_id(&self, expected: ChainId) -> Result<()> {
        let raw = self
            .constant("ChainBridge", "ChainIdentity")
            .await?
            .ok_or_else(|| {
                Error::Validation(
                    "ChainBridge.ChainIdentity is not declared".into(),
                )
            })?;
        let actual = ChainId::decode(&mut &raw[..])?;
        if actual != expected {
            return Err(Error::Validation(format!(
                "chain id is incorrect, expected {expected}, got {actual}"
            )));
        }
        Ok(())
    }

    /// Signs `call` with `nonce` and submits it.
    ///
    /// A submission the node refuses outright is reported as
    /// [`ferry_relayer_utils::Error::UnknownSubmission`] or
    /// [`ferry_relayer_utils::Error::ExtrinsicInvalid`].
    async fn submit(&self, call: &Call, nonce: u64) -> Result<TxHandle>;

    /// Status updates of a submitted extrinsic.
    async fn subscribe_status(
        &self,
        handle: &TxHandle,
    ) -> Result<BoxStream<'static, Result<TxStatus>>>;

    /// Drops the current node connection and connects to `endpoint`.
    async fn reconnect(&self, endpoint: &RpcUrl) -> Result<()>;

    /// Reloads the runtime metadata, called after a runtime upgrade.
    async fn refresh_metadata(&self) -> Result<()> {
        Ok(())
    }
}
