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

//! Calls submitted by the writer, storage queries and submission status.

use parity_scale_codec::{Decode, Encode};

use crate::{
    AccountId32, Address, BlockHash, ChainId, DepositNonce, ResourceId,
    Timepoint,
};

/// An unsigned call the relayer wants on chain.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum Call {
    /// `Balances.transfer_keep_alive`
    TransferKeepAlive {
        dest: Address,
        #[codec(compact)]
        value: u128,
    },
    /// `XAssets.transfer`
    AssetTransfer {
        dest: Address,
        #[codec(compact)]
        asset_id: u32,
        #[codec(compact)]
        value: u128,
    },
    /// `Multisig.as_multi`
    AsMulti {
        threshold: u16,
        other_signatories: Vec<AccountId32>,
        maybe_timepoint: Option<Timepoint>,
        call: Box<Call>,
        store_call: bool,
        max_weight: u64,
    },
    /// `ChainBridge.acknowledge_proposal`
    AcknowledgeProposal {
        nonce: DepositNonce,
        src_id: ChainId,
        resource_id: ResourceId,
        call: Box<Call>,
    },
    /// A bridge handler call, resolved from `ChainBridge.Resources`.
    Proposal(ProposalCall),
}

impl Call {
    /// `Pallet.method` of the call, for logs.
    pub fn name(&self) -> &str {
        match self {
            Call::TransferKeepAlive { .. } => "Balances.transfer_keep_alive",
            Call::AssetTransfer { .. } => "XAssets.transfer",
            Call::AsMulti { .. } => "Multisig.as_multi",
            Call::AcknowledgeProposal { .. } => {
                "ChainBridge.acknowledge_proposal"
            }
            Call::Proposal(p) => &p.method,
        }
    }

    /// `blake2_256` of the SCALE encoded call.
    pub fn hash(&self) -> [u8; 32] {
        sp_core_hashing::blake2_256(&self.encode())
    }
}

/// A handler call of the bridge, e.g. `Example.transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ProposalCall {
    pub method: String,
    pub args: ProposalArgs,
}

/// Arguments of a [`ProposalCall`].
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum ProposalArgs {
    Fungible {
        recipient: Address,
        #[codec(compact)]
        amount: u128,
        resource_id: ResourceId,
    },
    NonFungible {
        recipient: Address,
        /// Big endian token id.
        token_id: Vec<u8>,
        metadata: Vec<u8>,
    },
    Generic {
        /// `blake2_256` of the metadata.
        hash: [u8; 32],
    },
}

/// Status of a bridge proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum ProposalStatus {
    Initiated,
    Approved,
    Rejected,
}

/// The `ChainBridge.Votes` entry of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct VoteState {
    pub votes_for: Vec<AccountId32>,
    pub votes_against: Vec<AccountId32>,
    pub status: ProposalStatus,
}

impl VoteState {
    /// Whether `who` already voted, either way.
    pub fn has_voted(&self, who: &AccountId32) -> bool {
        self.votes_for.contains(who) || self.votes_against.contains(who)
    }
}

/// A storage entry, addressed by pallet, item and the SCALE encoded keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub pallet: &'static str,
    pub item: &'static str,
    pub keys: Vec<Vec<u8>>,
}

impl StorageKey {
    pub fn new(pallet: &'static str, item: &'static str) -> Self {
        Self {
            pallet,
            item,
            keys: Vec::new(),
        }
    }

    /// Appends a key, SCALE encoded.
    #[must_use]
    pub fn with_key<K: Encode>(mut self, key: &K) -> Self {
        self.keys.push(key.encode());
        self
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.pallet, self.item)
    }
}

/// Handle to a submitted extrinsic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHandle {
    /// Extrinsic hash.
    pub hash: [u8; 32],
    pub nonce: u64,
}

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{} (nonce={})", hex::encode(self.hash), self.nonce)
    }
}

/// Pool status updates of a submitted extrinsic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Included in the given block.
    Included(BlockHash),
    /// The block that included it was retracted.
    Retracted(BlockHash),
    Dropped,
    Invalid,
}
