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

//! Blocks as the relayer sees them: extrinsics and events already decoded
//! into the few shapes the listeners care about.

use num_bigint::BigUint;
use parity_scale_codec::{Decode, Encode};

use crate::{AccountId32, Address, ChainId, DepositNonce, ResourceId};

/// A 32 bytes block hash.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode,
)]
pub struct BlockHash(pub [u8; 32]);

impl std::fmt::Display for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockHash({self})")
    }
}

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub number: u64,
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
}

/// Position of an extrinsic on chain, `(block height, extrinsic index)`.
///
/// It identifies a pending multisig from the moment it is created and is
/// what an approving `as_multi` has to quote.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
)]
pub struct Timepoint {
    pub height: u64,
    pub index: u32,
}

impl Timepoint {
    pub const fn new(height: u64, index: u32) -> Self {
        Self { height, index }
    }
}

impl std::fmt::Display for Timepoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}

/// The decoded arguments of a `Multisig.as_multi` extrinsic wrapping a
/// transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSigCall {
    pub threshold: u16,
    pub other_signatories: Vec<AccountId32>,
    pub maybe_timepoint: Option<Timepoint>,
    /// Recipient of the wrapped transfer.
    pub dest: Address,
    /// Amount of the wrapped transfer.
    pub amount: BigUint,
    pub store_call: bool,
    pub max_weight: u64,
}

/// A `Utility.batch` holding a transfer and a `System.remark`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTransfer {
    /// Recipient of the transfer, the vault for a deposit.
    pub to: AccountId32,
    pub amount: BigUint,
    /// `0` for the native currency.
    pub asset_id: u32,
    /// `"destId,suffix,recipient"`
    pub remark: Option<String>,
}

/// What an extrinsic did, as far as the relayer is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtrinsicCall {
    /// First `as_multi`, opening a new pending multisig.
    AsMultiNew(MultiSigCall),
    /// An `as_multi` approving an existing one.
    AsMultiApprove(MultiSigCall),
    /// The `as_multi` that reached the threshold and executed the call.
    AsMultiExecuted(MultiSigCall),
    /// A batch deposit.
    Batch(BatchTransfer),
    /// Anything else.
    Other,
}

/// A signed extrinsic inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extrinsic {
    pub index: u32,
    pub signer: Option<AccountId32>,
    /// Whether the extrinsic dispatched successfully.
    pub success: bool,
    pub call: ExtrinsicCall,
}

/// A fungible or native transfer event emitted by a bridge pallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FungibleTransfer {
    pub destination: ChainId,
    pub deposit_nonce: DepositNonce,
    pub resource_id: ResourceId,
    pub amount: BigUint,
    pub recipient: Address,
}

/// A non fungible transfer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonFungibleTransfer {
    pub destination: ChainId,
    pub deposit_nonce: DepositNonce,
    pub resource_id: ResourceId,
    pub token_id: BigUint,
    pub recipient: Address,
    pub metadata: Vec<u8>,
}

/// A generic transfer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTransfer {
    pub destination: ChainId,
    pub deposit_nonce: DepositNonce,
    pub resource_id: ResourceId,
    pub metadata: Vec<u8>,
}

/// The events the relayer reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    NativeTransfer(FungibleTransfer),
    FungibleTransfer(FungibleTransfer),
    NonFungibleTransfer(NonFungibleTransfer),
    GenericTransfer(GenericTransfer),
    /// The runtime was upgraded, metadata has to be refreshed.
    CodeUpdated,
    Other,
}

/// A finalized block with its decoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub extrinsics: Vec<Extrinsic>,
    pub events: Vec<ChainEvent>,
}

impl Block {
    pub fn number(&self) -> u64 {
        self.header.number
    }
}
