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

use std::sync::Mutex;

use ferry_chain_connection::mock::MockConnection;
use ferry_relayer_config::{ListenerConfig, RelayerConfig};
use ferry_relayer_context::RelayerContext;
use ferry_relayer_store::{HistoryStoreKey, InMemoryStore};
use ferry_relayer_types::{Block, ChainId, RpcUrl};
use ferry_relayer_utils::Error;

use crate::{BlockHandler, BlockWatcher};

use super::*;

const CHAIN: ChainId = ChainId(1);

#[derive(Debug, Clone, Default)]
struct TestBlockWatcher;

#[async_trait::async_trait]
impl BlockWatcher for TestBlockWatcher {
    const TAG: &'static str = "Test Block Watcher";

    type Store = InMemoryStore;
}

#[derive(Debug, Default)]
struct RecordingHandler {
    seen: Arc<Mutex<Vec<u64>>>,
}

#[async_trait::async_trait]
impl BlockHandler for RecordingHandler {
    async fn handle_block(
        &self,
        _connection: Arc<dyn ChainConnection>,
        block: &Block,
    ) -> ferry_relayer_utils::Result<()> {
        self.seen.lock().unwrap().push(block.number());
        Ok(())
    }

    async fn can_handle_block(
        &self,
        _block: &Block,
    ) -> ferry_relayer_utils::Result<bool> {
        Ok(true)
    }
}

fn listener(start: Option<u64>, end: Option<u64>) -> ListenerConfig {
    ListenerConfig {
        start_block: start,
        end_block: end,
        block_retry_limit: 2,
        block_retry_interval: 10,
        ..Default::default()
    }
}

fn endpoints() -> Vec<RpcUrl> {
    vec![
        "ws://a.example:9944".parse().unwrap(),
        "ws://b.example:9944".parse().unwrap(),
    ]
}

struct Harness {
    ctx: RelayerContext,
    store: Arc<InMemoryStore>,
    conn: Arc<MockConnection>,
    seen: Arc<Mutex<Vec<u64>>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            ctx: RelayerContext::new(RelayerConfig::default()).unwrap(),
            store: Arc::new(InMemoryStore::default()),
            conn: Arc::new(MockConnection::builder().chain_id(CHAIN).build()),
            seen: Arc::default(),
        }
    }

    async fn run(
        &self,
        config: ListenerConfig,
    ) -> ferry_relayer_utils::Result<()> {
        let handler = RecordingHandler {
            seen: self.seen.clone(),
        };
        TestBlockWatcher
            .run(
                CHAIN,
                self.ctx.clone(),
                self.store.clone(),
                self.conn.clone(),
                endpoints(),
                config,
                vec![Box::new(handler)],
            )
            .await
    }

    fn seen(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn processes_finalized_blocks_until_end_block() {
    let h = Harness::new();
    h.conn.push_empty_blocks(10);
    h.conn.finalize_to(8);
    h.run(listener(Some(3), Some(6))).await.unwrap();
    assert_eq!(h.seen(), vec![3, 4, 5, 6]);
    assert_eq!(h.store.last_block_number(CHAIN).unwrap(), Some(6));
    let label = CHAIN.to_string();
    assert_eq!(
        h.ctx.metrics.blocks_processed.with_label_values(&[&label]).get(),
        4
    );
    assert_eq!(
        h.ctx
            .metrics
            .latest_known_block
            .with_label_values(&[&label])
            .get(),
        8
    );
}

#[tokio::test(start_paused = true)]
async fn resumes_after_the_stored_cursor() {
    let h = Harness::new();
    h.conn.push_empty_blocks(10);
    h.conn.finalize_all();
    h.store
        .set_last_block_number(HistoryStoreKey::from(CHAIN), 5)
        .unwrap();
    // start-block is ignored once a cursor exists.
    h.run(listener(Some(1), Some(8))).await.unwrap();
    assert_eq!(h.seen(), vec![6, 7, 8]);
}

#[tokio::test(start_paused = true)]
async fn waits_for_finality() {
    let h = Harness::new();
    h.conn.push_empty_blocks(5);
    h.conn.finalize_to(2);
    let conn = h.conn.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        conn.finalize_all();
    });
    h.run(listener(Some(1), Some(4))).await.unwrap();
    assert_eq!(h.seen(), vec![1, 2, 3, 4]);
    // waiting never counts as a failure.
    assert_eq!(
        h.ctx
            .metrics
            .listener_back_off
            .with_label_values(&[&CHAIN.to_string()])
            .get(),
        0
    );
}

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn fails_over_when_polling_is_exhausted() {
    let h = Harness::new();
    h.conn.push_empty_blocks(4);
    h.conn.finalize_all();
    h.conn.set_down(true);
    h.run(listener(Some(1), Some(4))).await.unwrap();
    assert_eq!(h.seen(), vec![1, 2, 3, 4]);
    // rotation starts after the current endpoint.
    assert_eq!(h.conn.reconnects(), vec![endpoints()[1].clone()]);
    assert_eq!(
        h.ctx
            .metrics
            .listener_back_off
            .with_label_values(&[&CHAIN.to_string()])
            .get(),
        1
    );
    assert!(logs_contain("failing over"));
}

#[tokio::test(start_paused = true)]
async fn transient_poll_failures_within_budget_do_not_fail_over() {
    let h = Harness::new();
    h.conn.push_empty_blocks(3);
    h.conn.finalize_all();
    // the budget is reset after every processed block.
    h.conn.fail_polls(2);
    h.run(listener(Some(1), Some(3))).await.unwrap();
    assert_eq!(h.seen(), vec![1, 2, 3]);
    assert!(h.conn.reconnects().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stops_when_every_endpoint_fails() {
    let h = Harness::new();
    h.conn.set_down(true);
    for endpoint in endpoints() {
        h.conn.fail_endpoint(&endpoint);
    }
    let err = h.run(listener(Some(1), None)).await.unwrap_err();
    assert!(matches!(err, Error::EndpointExhausted { chain_id: 1 }));
    assert_eq!(h.conn.reconnects().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_terminates_the_watcher() {
    let h = Arc::new(Harness::new());
    h.conn.push_empty_blocks(2);
    h.conn.finalize_all();
    let task = tokio::spawn({
        let h = h.clone();
        async move { h.run(listener(None, None)).await }
    });
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    h.ctx.shutdown();
    let res = task.await.unwrap();
    assert!(matches!(res, Err(Error::Terminated)));
    // no start-block: the finalized head at startup.
    assert_eq!(h.seen(), vec![2]);
}

/// Fails with `error` until `failures` runs out.
struct FlakyHandler {
    failures: std::sync::atomic::AtomicUsize,
    error: fn() -> Error,
    calls: std::sync::atomic::AtomicUsize,
}

impl FlakyHandler {
    fn new(failures: usize, error: fn() -> Error) -> Self {
        Self {
            failures: failures.into(),
            error,
            calls: 0.into(),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BlockHandler for FlakyHandler {
    async fn handle_block(
        &self,
        _connection: Arc<dyn ChainConnection>,
        _block: &Block,
    ) -> ferry_relayer_utils::Result<()> {
        use std::sync::atomic::Ordering;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left == 0 {
            return Ok(());
        }
        self.failures.store(left - 1, Ordering::SeqCst);
        Err((self.error)())
    }

    async fn can_handle_block(
        &self,
        _block: &Block,
    ) -> ferry_relayer_utils::Result<bool> {
        Ok(true)
    }
}

async fn genesis(conn: &MockConnection) -> Block {
    conn.block(MockConnection::hash_of(0))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn handlers_are_retried_on_transient_errors() {
    use crate::BlockHandlerWithRetry;
    let conn = Arc::new(MockConnection::builder().build());
    let block = genesis(&conn).await;
    let handler =
        FlakyHandler::new(2, || Error::TransientRpc("node busy".into()));
    let backoff = ferry_relayer_utils::retry::ConstantWithMaxRetryCount::new(
        std::time::Duration::from_millis(100),
        5,
    );
    handler
        .handle_block_with_retry(conn.clone(), &block, backoff)
        .await
        .unwrap();
    assert_eq!(handler.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn handlers_are_not_retried_on_permanent_errors() {
    use crate::BlockHandlerWithRetry;
    let conn = Arc::new(MockConnection::builder().build());
    let block = genesis(&conn).await;
    let handler =
        FlakyHandler::new(2, || Error::Validation("bad deposit".into()));
    let backoff = ferry_relayer_utils::retry::ConstantWithMaxRetryCount::new(
        std::time::Duration::from_millis(100),
        5,
    );
    let err = handler
        .handle_block_with_retry(conn.clone(), &block, backoff)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(handler.calls(), 1);
}
