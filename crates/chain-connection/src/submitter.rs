use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;

use ferry_relayer_context::Shutdown;
use ferry_relayer_types::{
    AccountId32, BlockHash, Call, ChainId, TxHandle, TxStatus,
};
use ferry_relayer_utils::{metric::Metrics, probe, Error, Result};

use crate::ChainConnection;

/// Submits calls for one account, one at a time.
///
/// Nonces are assigned under an async lock: the next nonce is the larger of
/// the on-chain account nonce and the last nonce used locally plus one, so
/// two submissions in the same block never collide.
pub struct Submitter {
    connection: Arc<dyn ChainConnection>,
    account: AccountId32,
    chain_id: ChainId,
    local_nonce: Mutex<u64>,
    metrics: Arc<Metrics>,
}

impl Submitter {
    /// Creates a submitter signing as `account` on `chain_id`.
    pub fn new(
        connection: Arc<dyn ChainConnection>,
        account: AccountId32,
        chain_id: ChainId,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            connection,
            account,
            chain_id,
            local_nonce: Mutex::new(0),
            metrics,
        }
    }

    /// The connection calls are submitted through.
    pub fn connection(&self) -> &Arc<dyn ChainConnection> {
        &self.connection
    }

    /// Submits `call` with the next free nonce.
    ///
    /// The nonce is consumed even if the submission fails.
    pub async fn submit(&self, call: &Call) -> Result<TxHandle> {
        let mut local_nonce = self.local_nonce.lock().await;
        let chain_nonce = self.connection.account_nonce(&self.account).await?;
        let nonce = chain_nonce.max(*local_nonce);
        let result = self.connection.submit(call, nonce).await;
        *local_nonce = nonce + 1;
        drop(local_nonce);

        self.metrics
            .submissions
            .with_label_values(&[&self.chain_id.to_string()])
            .inc();
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Submission,
            chain_id = %self.chain_id,
            call = call.name(),
            nonce,
            ok = result.is_ok(),
        );
        result
    }

    /// Waits for the first conclusive status of `handle`.
    pub async fn watch(
        &self,
        handle: TxHandle,
        shutdown: &mut Shutdown,
    ) -> Result<BlockHash> {
        let mut statuses =
            shutdown.race(self.connection.subscribe_status(&handle)).await??;
        let status = shutdown.race(statuses.next()).await?;
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Submission,
            chain_id = %self.chain_id,
            tx = %handle,
            status = ?status,
        );
        match status {
            Some(Ok(TxStatus::Included(block))) => {
                tracing::debug!("{} included in block {}", handle, block);
                Ok(block)
            }
            Some(Ok(TxStatus::Retracted(block))) => {
                Err(Error::ExtrinsicRetracted(block.to_string()))
            }
            Some(Ok(TxStatus::Dropped)) => Err(Error::ExtrinsicDropped),
            Some(Ok(TxStatus::Invalid)) => Err(Error::ExtrinsicInvalid),
            Some(Err(e)) => Err(e),
            None => Err(Error::TransientRpc(format!(
                "status stream of {handle} closed"
            ))),
        }
    }

    /// Submits `call` and waits for it to be included.
    pub async fn submit_and_watch(
        &self,
        call: &Call,
        shutdown: &mut Shutdown,
    ) -> Result<BlockHash> {
        let handle = shutdown.race(self.submit(call)).await??;
        self.watch(handle, shutdown).await
    }
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
