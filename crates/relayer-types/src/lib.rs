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

mod account;
pub mod block;
pub mod call;
mod ids;
mod message;
pub mod rpc_url;

pub use account::{AccountId32, Address, RelayerIdentity};
pub use block::{
    BatchTransfer, Block, BlockHash, ChainEvent, Extrinsic, ExtrinsicCall,
    FungibleTransfer, GenericTransfer, Header, MultiSigCall,
    NonFungibleTransfer, Timepoint,
};
pub use call::{
    Call, ProposalArgs, ProposalCall, ProposalStatus, StorageKey, TxHandle,
    TxStatus, VoteState,
};
pub use ids::{ChainId, DepositNonce, ResourceId, RESOURCE_ID_PREFIX};
pub use message::{CrossChainMessage, MessageType, Payload, RedemptionKey};
pub use rpc_url::RpcUrl;

/// Re-exported so downstream crates agree on the amount type.
pub use num_bigint::BigUint;
