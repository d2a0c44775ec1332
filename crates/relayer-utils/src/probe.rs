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

use derive_more::Display;
/// Target for logger
pub const TARGET: &str = "ferry_probe";

/// The Kind of the Probe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// When the Lifecycle of the Relayer changes, like starting or shutting down.
    #[display(fmt = "lifecycle")]
    Lifecycle,
    /// Relayer Sync state on a specific chain.
    #[display(fmt = "sync")]
    Sync,
    /// A deposit found by a listener and handed to the router.
    #[display(fmt = "listener")]
    Listener,
    /// Multisig lifecycle extrinsics observed on chain.
    #[display(fmt = "multisig")]
    MultiSig,
    /// Redemption state changes of a writer.
    #[display(fmt = "redemption")]
    Redemption,
    /// Extrinsic submission and its status updates.
    #[display(fmt = "submission")]
    Submission,
    /// When the relayer will retry to do something.
    #[display(fmt = "retry")]
    Retry,
}
