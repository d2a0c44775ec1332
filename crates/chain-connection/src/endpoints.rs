use std::time::Duration;

use ferry_relayer_context::Shutdown;
use ferry_relayer_types::{ChainId, RpcUrl};
use ferry_relayer_utils::retry::{retry_transient, RetryPolicy};
use ferry_relayer_utils::{probe, Error, Result};

use crate::ChainConnection;

/// Attempts of the health check of a freshly connected endpoint.
const HEALTH_CHECK_POLICY: RetryPolicy =
    RetryPolicy::new(3, Duration::from_secs(1));

/// The endpoints of a chain, and the one currently in use.
#[derive(Debug, Clone)]
pub struct EndpointRotation {
    endpoints: Vec<RpcUrl>,
    current: usize,
}

impl EndpointRotation {
    /// Starts on the first of `endpoints`.
    pub fn new(endpoints: Vec<RpcUrl>) -> Self {
        Self {
            endpoints,
            current: 0,
        }
    }

    /// The endpoint in use.
    pub fn current(&self) -> Option<&RpcUrl> {
        self.endpoints.get(self.current)
    }

    /// Moves `connection` to the next endpoint that passes a health check.
    ///
    /// Every endpoint is tried once, starting after the current one and
    /// ending with the current one. A health check is a successful
    /// `latest_block` and `finalized_head` right after reconnecting, on a
    /// node of the chain known as `chain_id`.
    pub async fn failover(
        &mut self,
        connection: &dyn ChainConnection,
        shutdown: &mut Shutdown,
        chain_id: ChainId,
    ) -> Result<()> {
        let total = self.endpoints.len();
        for step in 1..=total {
            let index = (self.current + step) % total;
            let endpoint = &self.endpoints[index];
            tracing::event!(
                target: probe::TARGET,
                tracing::Level::DEBUG,
                kind = %probe::Kind::Lifecycle,
                chain_id = %chain_id,
                reconnecting = true,
                endpoint = %endpoint,
            );
            let attempt = async {
                connection.reconnect(endpoint).await?;
                retry_transient(HEALTH_CHECK_POLICY.backoff(), move || async move {
                    let latest = connection.latest_block().await?;
                    connection.finalized_head().await?;
                    connection.verify_chain_id(chain_id).await?;
                    Ok::<_, Error>(latest)
                })
                .await
            };
            match shutdown.race(attempt).await? {
                Ok(latest) => {
                    tracing::info!(
                        %chain_id,
                        "Switched to endpoint {} (best block #{})",
                        endpoint,
                        latest
                    );
                    self.current = index;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        %chain_id,
                        "Endpoint {} is unhealthy: {}",
                        endpoint,
                        e
                    );
                }
            }
        }
        tracing::error!(%chain_id, "All {} endpoints failed", total);
        Err(Error::EndpointExhausted { chain_id: chain_id.0 })
    }
}
