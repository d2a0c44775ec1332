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

#![warn(missing_docs)]
//! # Relayer Utils 🕸️
//!
//! Shared error type, retry policies, probes and metrics used by every
//! other crate of the relayer.

/// Metrics functionality
pub mod metric;
/// A module used for debugging relayer lifecycle, sync state, or other relayer state.
pub mod probe;
/// Retry functionality
pub mod retry;

/// An enum of all possible errors that could be encountered during the execution of the
/// Ferry Relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while iterating over a glob pattern.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),
    /// Error from Glob Iterator.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Sled database error.
    #[error(transparent)]
    Sled(#[from] sled::Error),
    /// Hex decoding error.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// SCALE Codec error.
    #[error(transparent)]
    Codec(#[from] parity_scale_codec::Error),
    /// Prometheus registry error.
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// Chain not found in the configuration or in the router.
    #[error("Chain Not Found: {}", chain_id)]
    ChainNotFound {
        /// The chain id of the chain.
        chain_id: String,
    },
    /// A malformed remark or payload. The transaction is dropped.
    #[error("Parse error: {}", _0)]
    Parse(String),
    /// Unauthorized sender, wrong vault or a non-whitelisted route.
    #[error("Validation error: {}", _0)]
    Validation(String),
    /// The fee is larger than the transferred value.
    #[error("amount {amount} is too low to pay the handling fee {fee}")]
    InsufficientAmount {
        /// The amount before fee deduction.
        amount: String,
        /// The fee that should have been deducted.
        fee: String,
    },
    /// No currency matches the given asset or resource id.
    #[error("Currency not found for {}", _0)]
    CurrencyNotFound(String),
    /// A chain RPC call failed in a way that may succeed later.
    #[error("Transient RPC error: {}", _0)]
    TransientRpc(String),
    /// Polling retries exceeded on the current endpoint.
    #[error("polling retries exceeded (chain={chain_id})")]
    PollingExhausted {
        /// The chain being polled.
        chain_id: u8,
    },
    /// Every configured endpoint failed to reconnect.
    #[error("all endpoints exhausted (chain={chain_id})")]
    EndpointExhausted {
        /// The chain that lost connectivity.
        chain_id: u8,
    },
    /// The chain refused a submission for a reason we can not recover from.
    #[error("Unknown submission error: {}", _0)]
    UnknownSubmission(String),
    /// The extrinsic was reported invalid by the node.
    #[error("extrinsic invalid")]
    ExtrinsicInvalid,
    /// The extrinsic was dropped from the transaction pool.
    #[error("extrinsic dropped from network")]
    ExtrinsicDropped,
    /// The block including the extrinsic was retracted.
    #[error("extrinsic retracted: {}", _0)]
    ExtrinsicRetracted(String),
    /// The destination chain rejected a bridge proposal.
    #[error("proposal {nonce} from chain {source_chain} was rejected")]
    ProposalRejected {
        /// The chain the deposit was made on.
        source_chain: u8,
        /// The deposit nonce of the proposal.
        nonce: u64,
    },
    /// The redemption retry budget ran out before a terminal state.
    #[error("redemption retries exceeded after {attempts} attempts")]
    RetryBudgetExhausted {
        /// Number of attempts made.
        attempts: usize,
    },
    /// a backgorund task failed and force restarted.
    #[error("Task Force Restarted from an error")]
    ForceRestart,
    /// The shutdown signal fired.
    #[error("terminated")]
    Terminated,
}

impl Error {
    /// Whether retrying the same operation might succeed.
    ///
    /// This is the terminal-condition predicate used by every retry loop:
    /// anything that is not transient stops the loop immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::TransientRpc(_)
                | Error::ExtrinsicDropped
                | Error::ExtrinsicRetracted(_)
                | Error::ForceRestart
        )
    }

    /// Whether the error means the message should be abandoned right away.
    pub fn is_permanent_for_message(&self) -> bool {
        matches!(
            self,
            Error::UnknownSubmission(_)
                | Error::ExtrinsicInvalid
                | Error::Parse(_)
                | Error::Validation(_)
                | Error::InsufficientAmount { .. }
                | Error::CurrencyNotFound(_)
                | Error::ProposalRejected { .. }
        )
    }
}

/// A type alias for the result for ferry relayer, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_and_permanent_are_disjoint() {
        let errors = [
            Error::TransientRpc("timeout".into()),
            Error::ExtrinsicDropped,
            Error::ExtrinsicRetracted("0x01".into()),
            Error::ExtrinsicInvalid,
            Error::UnknownSubmission("bad origin".into()),
            Error::Parse("remark".into()),
            Error::ProposalRejected {
                source_chain: 1,
                nonce: 7,
            },
            Error::Terminated,
        ];
        for e in errors {
            assert!(!(e.is_transient() && e.is_permanent_for_message()), "{e}");
        }
        assert!(!Error::Terminated.is_transient());
        assert!(!Error::Terminated.is_permanent_for_message());
    }
}
