// Copyright (C) 2022-2024 Webb Technologies Inc.
//
// Tangle is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Tangle is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should receive a copy of the GNU General Public License
// If not, see <http://www.gnu.org/licenses/>.

#![warn(missing_docs)]
//! # Relayer Events Watcher Module 🕸️
//!
//! A module that listens for finalized blocks on a given chain.
//!
//! ## Overview
//!
//! The block watcher follows the finalized head of a chain one block at a
//! time and hands every block to a set of [`BlockHandler`]s. The last
//! processed height is kept in a [`ferry_relayer_store::HistoryStore`], so a
//! restarted watcher resumes right after it. When polling keeps failing the
//! watcher moves to the next configured endpoint.

use std::sync::Arc;
use std::time::Duration;

use ferry_chain_connection::ChainConnection;
use ferry_relayer_store::HistoryStore;

/// The block watcher and its handlers.
mod block_watcher;
pub use block_watcher::*;

#[cfg(test)]
mod tests;
