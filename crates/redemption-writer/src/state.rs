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

use derive_more::Display;
use ferry_relayer_types::{ChainId, CrossChainMessage, Timepoint};
use ferry_relayer_utils::probe;

/// Where a redemption stands.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionState {
    /// Received, not worked on yet.
    #[display(fmt = "idle")]
    Idle,
    /// Checking the destination chain and submitting.
    #[display(fmt = "processing")]
    Processing,
    /// This relayer voted, waiting for the others.
    #[display(fmt = "voted")]
    Voted,
    /// Executed on the destination chain.
    #[display(fmt = "executed")]
    Executed,
    /// Abandoned.
    #[display(fmt = "failed")]
    Failed,
}

/// How a redemption ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// The transfer executed on the destination chain.
    Executed,
    /// The same redemption was already in flight; nothing was done.
    Duplicate,
}

/// The result of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Executed,
    /// Our vote is in, or was just submitted.
    Voted,
    /// Nothing to do this round.
    Waiting,
}

/// A message being redeemed.
#[derive(Debug)]
pub(crate) struct Redemption {
    chain_id: ChainId,
    pub msg: CrossChainMessage,
    pub state: RedemptionState,
    /// The multisig backing this redemption, once seen.
    pub coordinate: Option<Timepoint>,
    /// This redemption opened a new multisig, which the listener may not
    /// have seen yet.
    pub opened: bool,
}

impl Redemption {
    pub fn new(chain_id: ChainId, msg: CrossChainMessage) -> Self {
        Self {
            chain_id,
            msg,
            state: RedemptionState::Idle,
            coordinate: None,
            opened: false,
        }
    }

    pub fn transition(&mut self, to: RedemptionState) {
        if self.state == to {
            return;
        }
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Redemption,
            chain_id = %self.chain_id,
            msg = %self.msg,
            from = %self.state,
            to = %to,
        );
        self.state = to;
    }
}
