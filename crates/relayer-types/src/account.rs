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

use std::collections::BTreeSet;
use std::str::FromStr;

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A 32 bytes substrate account.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode,
)]
pub struct AccountId32(pub [u8; 32]);

impl AccountId32 {
    /// Raw bytes of the account.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for AccountId32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for AccountId32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountId32({self})")
    }
}

impl From<[u8; 32]> for AccountId32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for AccountId32 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for AccountId32 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountId32 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e| {
            serde::de::Error::custom(format!(
                "invalid account {s}: {e}, expected 64 hex chars"
            ))
        })
    }
}

/// A recipient on any chain. EVM addresses, substrate accounts and raw
/// address strings taken from a remark all end up here as bytes.
#[derive(
    Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode,
)]
pub struct Address(pub Vec<u8>);

impl Address {
    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the address has no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({self})")
    }
}

impl From<AccountId32> for Address {
    fn from(account: AccountId32) -> Self {
        Self(account.0.to_vec())
    }
}

impl From<Vec<u8>> for Address {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// The signing identity of this relayer on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayerIdentity {
    /// The account this relayer signs with.
    pub own_address: AccountId32,
    /// Every other member of the multisig.
    pub other_signatories: BTreeSet<AccountId32>,
    /// Number of relayers sharing the multisig.
    pub total_relayers: u32,
    /// Position of this relayer, 1 based.
    pub relayer_index: u32,
    /// Approvals needed to execute.
    pub threshold: u16,
    /// `max_weight` passed to `as_multi`.
    pub max_call_weight: u64,
}

impl RelayerIdentity {
    /// Whether `who` is this relayer or one of the other signatories.
    pub fn is_member(&self, who: &AccountId32) -> bool {
        *who == self.own_address || self.other_signatories.contains(who)
    }

    /// The other signatories in ascending order, as `as_multi` expects them.
    pub fn sorted_other_signatories(&self) -> Vec<AccountId32> {
        self.other_signatories.iter().copied().collect()
    }
}
