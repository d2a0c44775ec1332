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

use std::collections::BTreeSet;
use std::time::Duration;

use ferry_chain_connection::mock::{MockConnection, SubmitHook};
use ferry_chains_info::CurrencyTable;
use ferry_relayer_config::RelayerConfig;
use ferry_relayer_types::{
    AccountId32, Address, Call, DepositNonce, Payload, ProposalArgs,
    ProposalCall, ProposalStatus, ResourceId, Timepoint, TxStatus, VoteState,
};

use super::*;

const CHAIN: ChainId = ChainId(1);
const ME: AccountId32 = AccountId32([1; 32]);
const OTHER: AccountId32 = AccountId32([2; 32]);
const THIRD: AccountId32 = AccountId32([3; 32]);
const METHOD: &str = "Example.transfer";

fn identity() -> RelayerIdentity {
    RelayerIdentity {
        own_address: ME,
        other_signatories: BTreeSet::from([THIRD, OTHER]),
        total_relayers: 3,
        relayer_index: 1,
        threshold: 2,
        max_call_weight: 1_000,
    }
}

fn recipient() -> Address {
    Address(vec![5; 32])
}

fn message(resource_id: ResourceId, payload: Payload) -> CrossChainMessage {
    CrossChainMessage::new(
        ChainId(2),
        CHAIN,
        DepositNonce(7),
        resource_id,
        payload,
    )
}

fn multisig_msg(amount: u64) -> CrossChainMessage {
    message(
        ResourceId::AKSM,
        Payload::MultiSig {
            amount: BigUint::from(amount),
            recipient: recipient(),
        },
    )
}

fn fungible_msg(amount: u64) -> CrossChainMessage {
    message(
        ResourceId::AKSM,
        Payload::Fungible {
            amount: BigUint::from(amount),
            recipient: recipient(),
        },
    )
}

/// `(timepoint, dest, amount)` of an `as_multi` call.
fn as_multi_of(call: &Call) -> Option<(Option<Timepoint>, Address, BigUint)> {
    let Call::AsMulti {
        maybe_timepoint,
        call,
        ..
    } = call
    else {
        return None;
    };
    match call.as_ref() {
        Call::TransferKeepAlive { dest, value }
        | Call::AssetTransfer { dest, value, .. } => {
            Some((*maybe_timepoint, dest.clone(), BigUint::from(*value)))
        }
        _ => None,
    }
}

struct Harness {
    ctx: RelayerContext,
    conn: Arc<MockConnection>,
    tracker: Arc<MultiSigTracker>,
    active: Arc<ActiveRedemptions>,
    writer: Arc<RedemptionWriter>,
}

impl Harness {
    fn new(multisig: bool, attempts: usize) -> Self {
        Self::build(multisig, attempts, |_| None)
    }

    fn build(
        multisig: bool,
        attempts: usize,
        hook: impl FnOnce(Arc<MultiSigTracker>) -> Option<SubmitHook>,
    ) -> Self {
        let ctx = RelayerContext::new(RelayerConfig::default()).unwrap();
        let tracker = Arc::new(MultiSigTracker::new(ME));
        let active = Arc::new(ActiveRedemptions::new());
        let conn = Arc::new(match hook(tracker.clone()) {
            Some(hook) => MockConnection::builder().on_submit(hook).build(),
            None => MockConnection::builder().build(),
        });
        let submitter = Arc::new(Submitter::new(
            conn.clone(),
            ME,
            CHAIN,
            ctx.metrics.clone(),
        ));
        let writer = RedemptionWriter::builder()
            .chain_id(CHAIN)
            .ctx(ctx.clone())
            .submitter(submitter)
            .identity(identity())
            .converter(AmountConverter::new(CurrencyTable::default(), "KSM"))
            .tracker(tracker.clone())
            .active(active.clone())
            .multisig(multisig)
            .policy(RetryPolicy::new(attempts, Duration::from_secs(9)))
            .build();
        Self {
            ctx,
            conn,
            tracker,
            active,
            writer: Arc::new(writer),
        }
    }
}

fn label() -> String {
    CHAIN.to_string()
}

#[tokio::test(start_paused = true)]
async fn opens_a_new_multisig_and_waits_for_execution() {
    let h = Harness::build(true, 10, |tracker| {
        Some(Arc::new(move |_: &MockConnection, call: &Call, _nonce: u64| {
            if let Some((None, dest, amount)) = as_multi_of(call) {
                // the listener sees our as_multi at 50-1.
                tracker.on_new(Timepoint::new(50, 1), dest, amount, 2, ME);
            }
        }))
    });
    let tracker = h.tracker.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(20)).await;
        tracker.on_executed(&recipient(), &BigUint::from(1_000u32), OTHER);
    });

    let outcome = h.writer.redeem(multisig_msg(1_000)).await.unwrap();
    assert_eq!(outcome, RedemptionOutcome::Executed);

    let submitted = h.conn.submitted();
    assert_eq!(submitted.len(), 1);
    let Call::AsMulti {
        threshold,
        other_signatories,
        maybe_timepoint,
        call,
        store_call,
        max_weight,
    } = &submitted[0].0
    else {
        panic!("expected as_multi, got {:?}", submitted[0].0);
    };
    assert_eq!(*threshold, 2);
    assert_eq!(other_signatories, &vec![OTHER, THIRD]);
    assert_eq!(*maybe_timepoint, None);
    assert!(!store_call);
    assert_eq!(*max_weight, 1_000);
    assert_eq!(
        call.as_ref(),
        &Call::TransferKeepAlive {
            dest: recipient(),
            value: 1_000,
        }
    );
    assert!(h.tracker.is_empty());
    assert!(h.active.is_empty());
    assert_eq!(
        h.ctx
            .metrics
            .redemptions_executed
            .with_label_values(&[&label()])
            .get(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn approves_a_multisig_opened_by_another_relayer() {
    let tp = Timepoint::new(40, 2);
    let h = Harness::build(true, 10, |tracker| {
        Some(Arc::new(move |_: &MockConnection, call: &Call, _nonce: u64| {
            if let Some((Some(_), dest, amount)) = as_multi_of(call) {
                tracker.on_executed(&dest, &amount, ME);
            }
        }))
    });
    h.tracker
        .on_new(tp, recipient(), BigUint::from(500u32), 2, OTHER);
    let msg = message(
        ResourceId::XBTC,
        Payload::MultiSig {
            amount: BigUint::from(500u32),
            recipient: recipient(),
        },
    );

    let outcome = h.writer.redeem(msg).await.unwrap();
    assert_eq!(outcome, RedemptionOutcome::Executed);
    let submitted = h.conn.submitted();
    assert_eq!(submitted.len(), 1);
    let Call::AsMulti {
        maybe_timepoint,
        call,
        ..
    } = &submitted[0].0
    else {
        panic!("expected as_multi");
    };
    assert_eq!(*maybe_timepoint, Some(tp));
    // XBTC is an XAssets asset.
    assert_eq!(
        call.as_ref(),
        &Call::AssetTransfer {
            dest: recipient(),
            asset_id: 1,
            value: 500,
        }
    );
    assert!(h.tracker.get(&tp).is_none());
}

#[tokio::test(start_paused = true)]
async fn rejected_new_multisig_is_a_permanent_failure() {
    let h = Harness::new(true, 10);
    h.conn.reject_submissions(1);
    let err = h.writer.redeem(multisig_msg(1_000)).await.unwrap_err();
    assert!(matches!(err, Error::UnknownSubmission(_)));
    assert!(h.conn.submitted().is_empty());
    assert!(h.active.is_empty());
    assert_eq!(
        h.ctx
            .metrics
            .redemptions_failed
            .with_label_values(&[&label()])
            .get(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn duplicate_messages_are_submitted_once() {
    let h = Harness::build(true, 10, |tracker| {
        Some(Arc::new(move |_: &MockConnection, call: &Call, _nonce: u64| {
            if let Some((None, dest, amount)) = as_multi_of(call) {
                let tp = Timepoint::new(9, 0);
                tracker.on_new(tp, dest.clone(), amount.clone(), 2, ME);
                tracker.on_executed(&dest, &amount, OTHER);
            }
        }))
    });
    let (first, second) = tokio::join!(
        h.writer.redeem(multisig_msg(1_000)),
        h.writer.redeem(multisig_msg(1_000)),
    );
    assert_eq!(first.unwrap(), RedemptionOutcome::Executed);
    assert_eq!(second.unwrap(), RedemptionOutcome::Duplicate);
    assert_eq!(h.conn.submitted().len(), 1);
    assert_eq!(
        h.ctx
            .metrics
            .duplicate_messages
            .with_label_values(&[&label()])
            .get(),
        1
    );
}

#[tokio::test(start_paused = true)]
#[tracing_test::traced_test]
async fn gives_up_when_the_budget_runs_out() {
    let h = Harness::new(true, 5);
    let tp = Timepoint::new(3, 1);
    // signed by us, never executed.
    h.tracker.on_new(tp, recipient(), BigUint::from(1_000u32), 2, ME);
    let err = h.writer.redeem(multisig_msg(1_000)).await.unwrap_err();
    assert!(matches!(err, Error::RetryBudgetExhausted { attempts: 5 }));
    assert!(h.conn.submitted().is_empty());
    assert!(h.active.is_empty());
    assert!(h.tracker.get(&tp).is_none());
    assert!(logs_contain("retries left"));
}

#[tokio::test(start_paused = true)]
async fn exhausted_redemption_does_not_shadow_the_next_deposit() {
    let h = Harness::build(true, 3, |tracker| {
        Some(Arc::new(move |_: &MockConnection, call: &Call, _nonce: u64| {
            if let Some((None, dest, amount)) = as_multi_of(call) {
                let tp = Timepoint::new(60, 0);
                tracker.on_new(tp, dest.clone(), amount.clone(), 2, ME);
                tracker.on_executed(&dest, &amount, OTHER);
            }
        }))
    });
    let stale = Timepoint::new(3, 1);
    h.tracker
        .on_new(stale, recipient(), BigUint::from(1_000u32), 2, ME);
    let err = h.writer.redeem(multisig_msg(1_000)).await.unwrap_err();
    assert!(matches!(err, Error::RetryBudgetExhausted { attempts: 3 }));
    assert!(h.tracker.is_empty());
    // the abandoned multisig executes late.
    assert_eq!(
        h.tracker
            .on_executed(&recipient(), &BigUint::from(1_000u32), OTHER),
        0
    );

    let next = CrossChainMessage::new(
        ChainId(2),
        CHAIN,
        DepositNonce(8),
        ResourceId::AKSM,
        Payload::MultiSig {
            amount: BigUint::from(1_000u32),
            recipient: recipient(),
        },
    );
    let outcome = h.writer.redeem(next).await.unwrap();
    assert_eq!(outcome, RedemptionOutcome::Executed);
    let submitted = h.conn.submitted();
    assert_eq!(submitted.len(), 1);
    assert!(matches!(as_multi_of(&submitted[0].0), Some((None, _, _))));
}

#[tokio::test(start_paused = true)]
async fn opened_multisig_is_not_reopened_while_the_listener_lags() {
    let h = Harness::build(true, 10, |tracker| {
        Some(Arc::new(move |conn: &MockConnection, call: &Call, _nonce: u64| {
            let Some((None, dest, amount)) = as_multi_of(call) else {
                return;
            };
            // the multisig exists now, opening it again fails.
            conn.reject_submissions(usize::MAX);
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(20)).await;
                let tp = Timepoint::new(50, 1);
                tracker.on_new(tp, dest.clone(), amount.clone(), 2, ME);
                tokio::time::sleep(Duration::from_secs(20)).await;
                tracker.on_executed(&dest, &amount, OTHER);
            });
        }))
    });

    let outcome = h.writer.redeem(multisig_msg(1_000)).await.unwrap();
    assert_eq!(outcome, RedemptionOutcome::Executed);
    assert_eq!(h.conn.submitted().len(), 1);
    assert!(h.tracker.is_empty());
    assert!(h.active.is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_new_multisig_is_a_permanent_failure() {
    let h = Harness::new(true, 10);
    h.conn.script_statuses([TxStatus::Invalid]);
    let err = h.writer.redeem(multisig_msg(1_000)).await.unwrap_err();
    assert!(matches!(err, Error::UnknownSubmission(_)));
    // accepted by the pool, then dropped as invalid.
    assert_eq!(h.conn.submitted().len(), 1);
    assert!(h.active.is_empty());
    assert_eq!(
        h.ctx
            .metrics
            .redemptions_failed
            .with_label_values(&[&label()])
            .get(),
        1
    );
}

#[tokio::test]
async fn rejects_messages_for_other_chains() {
    let h = Harness::new(true, 5);
    let msg = CrossChainMessage::new(
        ChainId(2),
        ChainId(3),
        DepositNonce(1),
        ResourceId::AKSM,
        Payload::Native {
            amount: BigUint::from(1u8),
            recipient: recipient(),
        },
    );
    let err = h.writer.redeem(msg).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(h.active.is_empty());
}

fn register_resource(conn: &MockConnection) {
    conn.set_storage(
        resources_key(&ResourceId::AKSM),
        METHOD.as_bytes().to_vec(),
    );
}

fn votes(status: ProposalStatus, votes_for: Vec<AccountId32>) -> VoteState {
    VoteState {
        votes_for,
        votes_against: vec![],
        status,
    }
}

fn proposal(amount: u128) -> Call {
    Call::Proposal(ProposalCall {
        method: METHOD.into(),
        args: ProposalArgs::Fungible {
            recipient: recipient(),
            amount,
            resource_id: ResourceId::AKSM,
        },
    })
}

#[tokio::test(start_paused = true)]
async fn proposal_is_acknowledged_until_approved() {
    let h = Harness::build(true, 10, |_| {
        Some(Arc::new(|conn: &MockConnection, call: &Call, _nonce: u64| {
            if let Call::AcknowledgeProposal {
                nonce,
                src_id,
                call,
                ..
            } = call
            {
                conn.set_storage(
                    votes_key(*src_id, *nonce, call),
                    votes(ProposalStatus::Approved, vec![OTHER, ME]),
                );
            }
        }))
    });
    register_resource(&h.conn);
    // a multisig chain still votes on fungible transfers.
    let outcome = h.writer.redeem(fungible_msg(700)).await.unwrap();
    assert_eq!(outcome, RedemptionOutcome::Executed);
    let submitted = h.conn.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0].0,
        Call::AcknowledgeProposal {
            nonce: DepositNonce(7),
            src_id: ChainId(2),
            resource_id: ResourceId::AKSM,
            call: Box::new(proposal(700)),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn voted_proposal_waits_for_the_others() {
    let h = Harness::new(false, 10);
    register_resource(&h.conn);
    let key = votes_key(ChainId(2), DepositNonce(7), &proposal(700));
    h.conn
        .set_storage(key.clone(), votes(ProposalStatus::Initiated, vec![ME]));
    let conn = h.conn.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        conn.set_storage(key, votes(ProposalStatus::Approved, vec![ME, OTHER]));
    });
    let outcome = h.writer.redeem(fungible_msg(700)).await.unwrap();
    assert_eq!(outcome, RedemptionOutcome::Executed);
    assert!(h.conn.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn proposal_failures_are_permanent() {
    let h = Harness::new(false, 10);
    // no handler registered for the resource.
    let err = h.writer.redeem(fungible_msg(700)).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    register_resource(&h.conn);
    h.conn.set_storage(
        votes_key(ChainId(2), DepositNonce(7), &proposal(700)),
        votes(ProposalStatus::Rejected, vec![]),
    );
    let err = h.writer.redeem(fungible_msg(700)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::ProposalRejected {
            source_chain: 2,
            nonce: 7
        }
    ));
    assert!(h.conn.submitted().is_empty());
    assert_eq!(
        h.ctx
            .metrics
            .redemptions_failed
            .with_label_values(&[&label()])
            .get(),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn dispatcher_spawns_redemptions_until_shutdown() {
    let h = Harness::build(true, 10, |tracker| {
        Some(Arc::new(move |_: &MockConnection, call: &Call, nonce: u64| {
            if let Some((None, dest, amount)) = as_multi_of(call) {
                let tp = Timepoint::new(9, nonce as u32);
                tracker.on_new(tp, dest, amount, 2, ME);
            }
        }))
    });
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let dispatcher = tokio::spawn(h.writer.clone().run(rx));
    tx.send(multisig_msg(1_000)).unwrap();
    tx.send(multisig_msg(2_000)).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.conn.submitted().len(), 2);
    assert_eq!(h.active.len(), 2);

    h.ctx.shutdown();
    let res = dispatcher.await.unwrap();
    assert!(matches!(res, Err(Error::Terminated)));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(h.active.is_empty());
}
