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

#![deny(unsafe_code)]
#![warn(missing_docs)]
//! # Ferry Relayer 🕸️
//!
//! Relays deposits between substrate chains.
//!
//! The embedding process loads the configuration, opens a connection to every
//! chain and hands both to [`service::ignite`], which starts one deposit
//! listener and one redemption writer per chain. Messages flow from the
//! listener of the source chain, through a channel router, to the writer of
//! the destination chain.

/// The per-chain tasks of the relayer.
pub mod service;

pub use service::{ignite, ChainHandle, Store};
