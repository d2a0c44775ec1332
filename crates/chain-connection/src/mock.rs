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

//! A chain that lives in memory, driven by the test that owns it.
//!
//! Blocks are appended with [`MockConnection::push_block`] and become visible
//! to listeners once [`MockConnection::finalize_to`] reaches them. Submitted
//! calls are recorded and, through the `on_submit` hook, a test can react to
//! them the way the real chain would (for example by producing a block with
//! the matching multisig extrinsic).

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use parity_scale_codec::Encode;
use parking_lot::Mutex;
use typed_builder::TypedBuilder;

use ferry_relayer_types::{
    Block, BlockHash, Call, ChainEvent, ChainId, Extrinsic, Header, RpcUrl,
    StorageKey, TxHandle, TxStatus,
};
use ferry_relayer_utils::{Error, Result};

use crate::ChainConnection;

/// Called after every accepted submission, with the call and its nonce.
pub type SubmitHook =
    Arc<dyn Fn(&MockConnection, &Call, u64) + Send + Sync + 'static>;

/// An in-memory [`ChainConnection`].
#[derive(TypedBuilder)]
pub struct MockConnection {
    /// Reacts to submissions.
    #[builder(default, setter(strip_option))]
    on_submit: Option<SubmitHook>,
    /// Declared as `ChainBridge.ChainIdentity`.
    #[builder(default, setter(strip_option))]
    chain_id: Option<ChainId>,
    #[builder(setter(skip), default = Mutex::new(MockState::genesis()))]
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    blocks: BTreeMap<u64, Block>,
    finalized: u64,
    storage: HashMap<StorageKey, Vec<u8>>,
    submitted: Vec<(Call, u64)>,
    statuses: VecDeque<TxStatus>,
    rejections: usize,
    poll_failures: usize,
    down: bool,
    failing_endpoints: HashSet<RpcUrl>,
    reconnects: Vec<RpcUrl>,
    metadata_refreshes: usize,
}

impl MockState {
    fn genesis() -> Self {
        let mut state = Self::default();
        state.blocks.insert(0, MockConnection::make_block(0, vec![], vec![]));
        state
    }

    fn tip(&self) -> u64 {
        self.blocks.keys().next_back().copied().unwrap_or_default()
    }

    fn ensure_up(&self) -> Result<()> {
        if self.down {
            Err(Error::TransientRpc("mock node is down".into()))
        } else {
            Ok(())
        }
    }
}

impl MockConnection {
    /// The hash the mock gives to the block at `height`.
    pub fn hash_of(height: u64) -> BlockHash {
        let mut hash = [0xab; 32];
        hash[..8].copy_from_slice(&height.to_be_bytes());
        BlockHash(hash)
    }

    fn make_block(
        number: u64,
        extrinsics: Vec<Extrinsic>,
        events: Vec<ChainEvent>,
    ) -> Block {
        Block {
            header: Header {
                number,
                hash: Self::hash_of(number),
                parent_hash: Self::hash_of(number.saturating_sub(1)),
            },
            extrinsics,
            events,
        }
    }

    /// Appends a block on top of the best one, returns its height.
    pub fn push_block(
        &self,
        extrinsics: Vec<Extrinsic>,
        events: Vec<ChainEvent>,
    ) -> u64 {
        let mut state = self.state.lock();
        let number = state.tip() + 1;
        state
            .blocks
            .insert(number, Self::make_block(number, extrinsics, events));
        number
    }

    /// Appends `count` empty blocks, returns the new best height.
    pub fn push_empty_blocks(&self, count: u64) -> u64 {
        let mut tip = self.tip();
        for _ in 0..count {
            tip = self.push_block(vec![], vec![]);
        }
        tip
    }

    /// Finalizes up to `height`, capped at the best block.
    pub fn finalize_to(&self, height: u64) {
        let mut state = self.state.lock();
        state.finalized = height.min(state.tip());
    }

    /// Finalizes every block produced so far.
    pub fn finalize_all(&self) {
        let mut state = self.state.lock();
        state.finalized = state.tip();
    }

    /// Height of the best block.
    pub fn tip(&self) -> u64 {
        self.state.lock().tip()
    }

    /// Stores `value` under `key`.
    pub fn set_storage<V: Encode>(&self, key: StorageKey, value: V) {
        self.state.lock().storage.insert(key, value.encode());
    }

    /// Removes the value under `key`.
    pub fn remove_storage(&self, key: &StorageKey) {
        self.state.lock().storage.remove(key);
    }

    /// Every accepted submission so far, with its nonce.
    pub fn submitted(&self) -> Vec<(Call, u64)> {
        self.state.lock().submitted.clone()
    }

    /// The next subscriptions report these statuses, one per subscription.
    /// Once the script runs out extrinsics are included in the best block.
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = TxStatus>) {
        self.state.lock().statuses.extend(statuses);
    }

    /// The next `count` submissions are refused.
    pub fn reject_submissions(&self, count: usize) {
        self.state.lock().rejections = count;
    }

    /// The next `count` calls to `finalized_head` fail.
    pub fn fail_polls(&self, count: usize) {
        self.state.lock().poll_failures = count;
    }

    /// While down every call fails, until a reconnect to a healthy endpoint.
    pub fn set_down(&self, down: bool) {
        self.state.lock().down = down;
    }

    /// Reconnecting to `endpoint` fails.
    pub fn fail_endpoint(&self, endpoint: &RpcUrl) {
        self.state.lock().failing_endpoints.insert(endpoint.clone());
    }

    /// Every endpoint reconnected to, in order.
    pub fn reconnects(&self) -> Vec<RpcUrl> {
        self.state.lock().reconnects.clone()
    }

    /// How many times the metadata was refreshed.
    pub fn metadata_refreshes(&self) -> usize {
        self.state.lock().metadata_refreshes
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockConnection")
            .field("tip", &state.tip())
            .field("finalized", &state.finalized)
            .field("submitted", &state.submitted.len())
            .finish()
    }
}

#[async_trait::async_trait]
impl ChainConnection for MockConnection {
    async fn latest_block(&self) -> Result<u64> {
        let state = self.state.lock();
        state.ensure_up()?;
        Ok(state.tip())
    }

    async fn finalized_head(&self) -> Result<BlockHash> {
        let mut state = self.state.lock();
        state.ensure_up()?;
        if state.poll_failures > 0 {
            state.poll_failures -= 1;
            return Err(Error::TransientRpc("mock poll failure".into()));
        }
        Ok(Self::hash_of(state.finalized))
    }

    async fn header(&self, hash: BlockHash) -> Result<Option<Header>> {
        let state = self.state.lock();
        state.ensure_up()?;
        Ok(state
            .blocks
            .values()
            .find(|b| b.header.hash == hash)
            .map(|b| b.header.clone()))
    }

    async fn block_hash(&self, height: u64) -> Result<Option<BlockHash>> {
        let state = self.state.lock();
        state.ensure_up()?;
        Ok(state.blocks.get(&height).map(|b| b.header.hash))
    }

    async fn block(&self, hash: BlockHash) -> Result<Option<Block>> {
        let state = self.state.lock();
        state.ensure_up()?;
        Ok(state
            .blocks
            .values()
            .find(|b| b.header.hash == hash)
            .cloned())
    }

    async fn query_storage(&self, key: &StorageKey) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock();
        state.ensure_up()?;
        Ok(state.storage.get(key).cloned())
    }

    async fn constant(&self, pallet: &str, name: &str) -> Result<Option<Vec<u8>>> {
        self.state.lock().ensure_up()?;
        Ok(match (pallet, name) {
            ("ChainBridge", "ChainIdentity") => {
                self.chain_id.map(|id| id.encode())
            }
            _ => None,
        })
    }

    async fn submit(&self, call: &Call, nonce: u64) -> Result<TxHandle> {
        {
            let mut state = self.state.lock();
            state.ensure_up()?;
            if state.rejections > 0 {
                state.rejections -= 1;
                return Err(Error::UnknownSubmission(format!(
                    "{} rejected by mock node",
                    call.name()
                )));
            }
            state.submitted.push((call.clone(), nonce));
        }
        if let Some(hook) = &self.on_submit {
            hook(self, call, nonce);
        }
        Ok(TxHandle {
            hash: call.hash(),
            nonce,
        })
    }

    async fn subscribe_status(
        &self,
        _handle: &TxHandle,
    ) -> Result<BoxStream<'static, Result<TxStatus>>> {
        let mut state = self.state.lock();
        state.ensure_up()?;
        let status = state
            .statuses
            .pop_front()
            .unwrap_or_else(|| TxStatus::Included(Self::hash_of(state.tip())));
        Ok(stream::iter(vec![Ok(status)]).boxed())
    }

    async fn reconnect(&self, endpoint: &RpcUrl) -> Result<()> {
        let mut state = self.state.lock();
        state.reconnects.push(endpoint.clone());
        if state.failing_endpoints.contains(endpoint) {
            return Err(Error::TransientRpc(format!(
                "can not connect to {endpoint}"
            )));
        }
        state.down = false;
        Ok(())
    }

    async fn refresh_metadata(&self) -> Result<()> {
        self.state.lock().metadata_refreshes += 1;
        Ok(())
    }
}
