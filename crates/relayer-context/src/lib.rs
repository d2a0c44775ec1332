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
//! # Relayer Context Module 🕸️
//!
//! A module for managing the context of the relayer.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use ferry_relayer_config::{ChainConfig, RelayerConfig};
use ferry_relayer_types::ChainId;
use ferry_relayer_utils::metric::Metrics;

/// RelayerContext contains Relayer's configuration and shutdown signal.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: RelayerConfig,
    /// Broadcasts a shutdown signal to all running tasks.
    ///
    /// Every listener, writer and redemption task holds a receiver (through
    /// [`Shutdown`]). When a graceful shutdown is initiated, a `()` value is
    /// sent via the broadcast::Sender. Each task receives it, reaches a safe
    /// terminal state, and completes.
    notify_shutdown: broadcast::Sender<()>,
    /// Represents the metrics for the relayer
    pub metrics: Arc<Metrics>,
}

impl RelayerContext {
    /// Creates a new RelayerContext.
    pub fn new(config: RelayerConfig) -> ferry_relayer_utils::Result<Self> {
        let (notify_shutdown, _) = broadcast::channel(2);
        let metrics = Arc::new(Metrics::new()?);
        Ok(Self {
            config,
            notify_shutdown,
            metrics,
        })
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Sends a shutdown signal to all subscribed tasks.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }

    /// The configuration of the chain with `chain_id`.
    pub fn chain_config(
        &self,
        chain_id: ChainId,
    ) -> ferry_relayer_utils::Result<&ChainConfig> {
        self.config.chain(chain_id).ok_or_else(|| {
            ferry_relayer_utils::Error::ChainNotFound {
                chain_id: chain_id.to_string(),
            }
        })
    }
}

impl std::fmt::Debug for RelayerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayerContext")
            .field("chains", &self.config.chains.len())
            .finish()
    }
}

/// Listens for the relayer shutdown signal.
///
/// Shutdown is signalled using a `broadcast::Receiver`. Only a single value is
/// ever sent. Once a value has been sent via the broadcast channel, the relayer
/// should shutdown.
///
/// The `Shutdown` struct listens for the signal and tracks that the signal has
/// been received. Callers may query for whether the shutdown signal has been
/// received or not.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received
    shutdown: bool,

    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Returns `true` if the shutdown signal has been received.
    pub fn is_shutdown(&mut self) -> bool {
        if !self.shutdown {
            // a dropped sender means nobody can ask us to keep running.
            self.shutdown = !matches!(
                self.notify.try_recv(),
                Err(broadcast::error::TryRecvError::Empty)
            );
        }
        self.shutdown
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        // If the shutdown signal has already been received, then return
        // immediately.
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        // Remember that the signal has been received.
        self.shutdown = true;
    }

    /// Runs `fut` to completion unless the shutdown signal fires first, in
    /// which case [`ferry_relayer_utils::Error::Terminated`] is returned.
    pub async fn race<F: Future>(
        &mut self,
        fut: F,
    ) -> ferry_relayer_utils::Result<F::Output> {
        if self.shutdown {
            return Err(ferry_relayer_utils::Error::Terminated);
        }
        tokio::select! {
            biased;
            _ = self.recv() => Err(ferry_relayer_utils::Error::Terminated),
            out = fut => Ok(out),
        }
    }

    /// Sleeps for `duration`, or until the shutdown signal fires.
    pub async fn sleep(
        &mut self,
        duration: Duration,
    ) -> ferry_relayer_utils::Result<()> {
        self.race(tokio::time::sleep(duration)).await
    }
}
