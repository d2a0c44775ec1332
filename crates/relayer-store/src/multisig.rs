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

use std::collections::{BTreeMap, BTreeSet};

use ferry_relayer_types::{AccountId32, Address, BigUint, Timepoint};
use parking_lot::Mutex;

/// A multisig transfer opened on chain and not yet forgotten by the relayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSignatureTx {
    /// Where the opening `as_multi` sits on chain.
    pub coordinate: Timepoint,
    pub dest: Address,
    pub amount: BigUint,
    pub threshold: u16,
    /// Everyone who signed so far.
    pub signatories: BTreeSet<AccountId32>,
    pub executed: bool,
}

impl PendingSignatureTx {
    fn matches(&self, dest: &Address, amount: &BigUint) -> bool {
        self.dest == *dest && self.amount == *amount
    }
}

/// Where a `(dest, amount)` transfer stands from the point of view of this
/// relayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiSigStatus {
    /// Nobody opened a multisig for it yet.
    NotFound,
    /// Opened, but this relayer did not sign it.
    NotExecuted(Timepoint),
    /// Opened and already signed by this relayer.
    SelfVoted(Timepoint),
    /// Reached the threshold and executed.
    Executed(Timepoint),
}

/// Tracks the multisig transfers of one chain.
///
/// Entries are keyed by their coordinate. Approvals and executions do not
/// quote it though, so they are correlated on `(dest, amount)` among the
/// entries that did not execute yet. Two concurrent transfers of the same
/// amount to the same account are therefore indistinguishable.
#[derive(Debug)]
pub struct MultiSigTracker {
    own_address: AccountId32,
    pending: Mutex<BTreeMap<Timepoint, PendingSignatureTx>>,
}

impl MultiSigTracker {
    /// Creates an empty tracker for the relayer signing as `own_address`.
    pub fn new(own_address: AccountId32) -> Self {
        Self {
            own_address,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Records a freshly opened multisig. A known coordinate is replaced.
    pub fn on_new(
        &self,
        coordinate: Timepoint,
        dest: Address,
        amount: BigUint,
        threshold: u16,
        initial_signatory: AccountId32,
    ) {
        let tx = PendingSignatureTx {
            coordinate,
            dest,
            amount,
            threshold,
            signatories: BTreeSet::from([initial_signatory]),
            executed: false,
        };
        tracing::debug!(%coordinate, dest = %tx.dest, amount = %tx.amount, "new multisig");
        self.pending.lock().insert(coordinate, tx);
    }

    /// Adds `signatory` to every open entry for `(dest, amount)`.
    ///
    /// Returns how many entries were touched.
    pub fn on_approve(
        &self,
        dest: &Address,
        amount: &BigUint,
        signatory: AccountId32,
    ) -> usize {
        self.update(dest, amount, signatory, false)
    }

    /// Like [`Self::on_approve`], and marks the entries executed.
    pub fn on_executed(
        &self,
        dest: &Address,
        amount: &BigUint,
        signatory: AccountId32,
    ) -> usize {
        self.update(dest, amount, signatory, true)
    }

    fn update(
        &self,
        dest: &Address,
        amount: &BigUint,
        signatory: AccountId32,
        executed: bool,
    ) -> usize {
        let mut pending = self.pending.lock();
        let mut touched = 0;
        for tx in pending
            .values_mut()
            .filter(|tx| !tx.executed && tx.matches(dest, amount))
        {
            tx.signatories.insert(signatory);
            tx.executed |= executed;
            touched += 1;
        }
        touched
    }

    /// The status of the `(dest, amount)` transfer.
    ///
    /// An executed entry wins over one this relayer signed, which wins over
    /// any other open entry.
    pub fn status(&self, dest: &Address, amount: &BigUint) -> MultiSigStatus {
        let pending = self.pending.lock();
        let mut self_voted = None;
        let mut open = None;
        for tx in pending.values().filter(|tx| tx.matches(dest, amount)) {
            if tx.executed {
                return MultiSigStatus::Executed(tx.coordinate);
            }
            if tx.signatories.contains(&self.own_address) {
                self_voted.get_or_insert(tx.coordinate);
            } else {
                open.get_or_insert(tx.coordinate);
            }
        }
        match (self_voted, open) {
            (Some(tp), _) => MultiSigStatus::SelfVoted(tp),
            (None, Some(tp)) => MultiSigStatus::NotExecuted(tp),
            (None, None) => MultiSigStatus::NotFound,
        }
    }

    /// Forgets the entry at `coordinate`.
    pub fn remove(&self, coordinate: &Timepoint) -> Option<PendingSignatureTx> {
        self.pending.lock().remove(coordinate)
    }

    /// A copy of the entry at `coordinate`.
    pub fn get(&self, coordinate: &Timepoint) -> Option<PendingSignatureTx> {
        self.pending.lock().get(coordinate).cloned()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: AccountId32 = AccountId32([1; 32]);
    const ALICE: AccountId32 = AccountId32([2; 32]);
    const BOB: AccountId32 = AccountId32([3; 32]);

    fn dest() -> Address {
        Address(vec![7; 32])
    }

    fn amount(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn status_lifecycle() {
        let tracker = MultiSigTracker::new(ME);
        assert_eq!(
            tracker.status(&dest(), &amount(5)),
            MultiSigStatus::NotFound
        );
        let tp = Timepoint::new(10, 2);
        tracker.on_new(tp, dest(), amount(5), 2, ALICE);
        assert_eq!(
            tracker.status(&dest(), &amount(5)),
            MultiSigStatus::NotExecuted(tp)
        );
        assert_eq!(tracker.on_approve(&dest(), &amount(5), ME), 1);
        assert_eq!(
            tracker.status(&dest(), &amount(5)),
            MultiSigStatus::SelfVoted(tp)
        );
        assert_eq!(tracker.on_executed(&dest(), &amount(5), BOB), 1);
        assert_eq!(
            tracker.status(&dest(), &amount(5)),
            MultiSigStatus::Executed(tp)
        );
        assert!(tracker.remove(&tp).is_some());
        assert!(tracker.is_empty());
    }

    #[test]
    fn approvals_touch_only_open_matching_entries() {
        let tracker = MultiSigTracker::new(ME);
        let done = Timepoint::new(1, 0);
        let open = Timepoint::new(2, 0);
        let other = Timepoint::new(3, 0);
        tracker.on_new(done, dest(), amount(5), 2, ALICE);
        tracker.on_executed(&dest(), &amount(5), BOB);
        tracker.on_new(open, dest(), amount(5), 2, ALICE);
        tracker.on_new(other, dest(), amount(6), 2, ALICE);

        assert_eq!(tracker.on_approve(&dest(), &amount(5), BOB), 1);
        assert!(tracker.get(&open).unwrap().signatories.contains(&BOB));
        assert!(!tracker.get(&other).unwrap().signatories.contains(&BOB));
        assert_eq!(tracker.get(&done).unwrap().signatories.len(), 2);

        assert_eq!(tracker.on_executed(&dest(), &amount(5), ME), 1);
        assert!(tracker.get(&open).unwrap().executed);
        assert!(!tracker.get(&other).unwrap().executed);
        assert_eq!(tracker.on_approve(&dest(), &amount(5), ME), 0);
    }

    #[test]
    fn executed_wins_over_self_voted() {
        let tracker = MultiSigTracker::new(ME);
        let first = Timepoint::new(1, 0);
        let second = Timepoint::new(2, 0);
        tracker.on_new(first, dest(), amount(5), 2, ME);
        tracker.on_new(second, dest(), amount(5), 2, ALICE);
        assert_eq!(
            tracker.status(&dest(), &amount(5)),
            MultiSigStatus::SelfVoted(first)
        );
        // executes both open entries.
        tracker.on_executed(&dest(), &amount(5), BOB);
        assert_eq!(
            tracker.status(&dest(), &amount(5)),
            MultiSigStatus::Executed(first)
        );
    }

    #[test]
    fn duplicate_coordinate_replaces() {
        let tracker = MultiSigTracker::new(ME);
        let tp = Timepoint::new(4, 1);
        tracker.on_new(tp, dest(), amount(5), 2, ALICE);
        tracker.on_new(tp, dest(), amount(9), 2, ALICE);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get(&tp).unwrap().amount, amount(9));
    }
}
