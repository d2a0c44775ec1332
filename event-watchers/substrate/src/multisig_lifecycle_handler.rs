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

use std::sync::Arc;

use ferry_chain_connection::ChainConnection;
use ferry_event_watcher_traits::BlockHandler;
use ferry_relayer_store::MultiSigTracker;
use ferry_relayer_types::{
    Block, ChainId, Extrinsic, ExtrinsicCall, RelayerIdentity, Timepoint,
};
use ferry_relayer_utils::probe;

/// MultiSigLifecycleHandler feeds the [`MultiSigTracker`] with the `as_multi`
/// extrinsics signed by members of the relayer multisig.
#[derive(typed_builder::TypedBuilder)]
pub struct MultiSigLifecycleHandler {
    chain_id: ChainId,
    identity: RelayerIdentity,
    tracker: Arc<MultiSigTracker>,
}

impl MultiSigLifecycleHandler {
    fn apply(&self, height: u64, extrinsic: &Extrinsic) {
        if !extrinsic.success {
            return;
        }
        let Some(signer) = extrinsic.signer else {
            return;
        };
        if !self.identity.is_member(&signer) {
            return;
        }
        let coordinate = Timepoint::new(height, extrinsic.index);
        let (stage, touched) = match &extrinsic.call {
            ExtrinsicCall::AsMultiNew(call) => {
                self.tracker.on_new(
                    coordinate,
                    call.dest.clone(),
                    call.amount.clone(),
                    call.threshold,
                    signer,
                );
                ("new", 1)
            }
            ExtrinsicCall::AsMultiApprove(call) => (
                "approve",
                self.tracker.on_approve(&call.dest, &call.amount, signer),
            ),
            ExtrinsicCall::AsMultiExecuted(call) => (
                "executed",
                self.tracker.on_executed(&call.dest, &call.amount, signer),
            ),
            _ => return,
        };
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::MultiSig,
            chain_id = %self.chain_id,
            stage,
            %coordinate,
            %signer,
            touched,
        );
    }
}

#[async_trait::async_trait]
impl BlockHandler for MultiSigLifecycleHandler {
    async fn can_handle_block(
        &self,
        block: &Block,
    ) -> ferry_relayer_utils::Result<bool> {
        Ok(block.extrinsics.iter().any(|e| {
            matches!(
                e.call,
                ExtrinsicCall::AsMultiNew(_)
                    | ExtrinsicCall::AsMultiApprove(_)
                    | ExtrinsicCall::AsMultiExecuted(_)
            )
        }))
    }

    #[tracing::instrument(skip_all, fields(block = block.number()))]
    async fn handle_block(
        &self,
        _connection: Arc<dyn ChainConnection>,
        block: &Block,
    ) -> ferry_relayer_utils::Result<()> {
        for extrinsic in &block.extrinsics {
            self.apply(block.number(), extrinsic);
        }
        Ok(())
    }
}
