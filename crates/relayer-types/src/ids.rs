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

use std::str::FromStr;

use derive_more::{Display, From, Into};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Bridge-level chain identifier.
#[derive(
    Debug,
    Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ChainId(pub u8);

/// Per-source monotonically increasing deposit counter.
#[derive(
    Debug,
    Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    From,
    Into,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct DepositNonce(pub u64);

/// Every resource id shares this hex prefix, the last three hex characters
/// tell the resources apart.
pub const RESOURCE_ID_PREFIX: &str =
    "0000000000000000000000000000000000000000000000000000000000000";

/// A 32 bytes bridge identifier for an asset or a generic handler.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode,
)]
pub struct ResourceId(pub [u8; 32]);

impl ResourceId {
    /// `…000`, the native currency of the chain doing the lookup.
    pub const ORIGIN: Self = Self::with_tail(0x00, 0x00);
    /// `…000`, KSM wrapped on the EVM side.
    pub const AKSM: Self = Self::with_tail(0x00, 0x00);
    /// `…001`
    pub const XBTC: Self = Self::with_tail(0x00, 0x01);
    /// `…002`, DOT wrapped on the EVM side.
    pub const PDOT: Self = Self::with_tail(0x00, 0x02);
    /// `…999`
    pub const XASSET: Self = Self::with_tail(0x09, 0x99);

    const fn with_tail(hi: u8, lo: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[30] = hi;
        bytes[31] = lo;
        Self(bytes)
    }

    /// Builds the id from its three character suffix, e.g. `"001"`.
    pub fn from_suffix(suffix: &str) -> Result<Self, hex::FromHexError> {
        if suffix.len() != 3 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Self::from_hex(&format!("{RESOURCE_ID_PREFIX}{suffix}"))
    }

    /// Parses 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The full hex form, without `0x`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl std::fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceId({self})")
    }
}

impl FromStr for ResourceId {
    type Err = hex::FromHexError;

    /// Accepts either the full id or only its three character suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 3 {
            Self::from_suffix(s)
        } else {
            Self::from_hex(s)
        }
    }
}

impl Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|e| {
            serde::de::Error::custom(format!("invalid resource id {s}: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_ids_match_their_suffix() {
        assert_eq!(RESOURCE_ID_PREFIX.len(), 61);
        assert_eq!(ResourceId::from_suffix("000").unwrap(), ResourceId::ORIGIN);
        assert_eq!(ResourceId::from_suffix("001").unwrap(), ResourceId::XBTC);
        assert_eq!(ResourceId::from_suffix("002").unwrap(), ResourceId::PDOT);
        assert_eq!(
            ResourceId::from_suffix("999").unwrap(),
            ResourceId::XASSET
        );
        assert_eq!(ResourceId::AKSM, ResourceId::ORIGIN);
    }

    #[test]
    fn bad_suffix_is_rejected() {
        assert!(ResourceId::from_suffix("0g1").is_err());
        assert!(ResourceId::from_suffix("01").is_err());
    }

    #[test]
    fn serde_accepts_suffix_or_full_id() {
        let a: ResourceId = serde_json::from_str("\"002\"").unwrap();
        let full = format!("\"0x{}\"", ResourceId::PDOT.to_hex());
        let b: ResourceId = serde_json::from_str(&full).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&b).unwrap(), full);
    }
}
