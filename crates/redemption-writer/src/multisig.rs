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

use ferry_relayer_context::Shutdown;
use ferry_relayer_store::MultiSigStatus;
use ferry_relayer_types::{
    Address, BigUint, Call, CrossChainMessage, Payload, Timepoint,
};
use ferry_relayer_utils::{Error, Result};

use crate::state::{Redemption, Step};
use crate::{to_u128, RedemptionWriter};

fn is_rejection(e: &Error) -> bool {
    matches!(e, Error::UnknownSubmission(_) | Error::ExtrinsicInvalid)
}

impl RedemptionWriter {
    pub(crate) async fn multisig_step(
        &self,
        redemption: &mut Redemption,
        shutdown: &mut Shutdown,
    ) -> Result<Step> {
        let (amount, recipient) = match redemption.msg.payload() {
            Payload::MultiSig { amount, recipient }
            | Payload::Native { amount, recipient } => (amount, recipient),
            _ => {
                return Err(Error::Validation(format!(
                    "{} can not be redeemed through a multisig",
                    redemption.msg
                )))
            }
        };
        match self.tracker.status(recipient, amount) {
            MultiSigStatus::Executed(tp) => {
                redemption.coordinate = Some(tp);
                Ok(Step::Executed)
            }
            MultiSigStatus::SelfVoted(tp) => {
                redemption.coordinate = Some(tp);
                Ok(Step::Voted)
            }
            MultiSigStatus::NotExecuted(tp) => {
                redemption.coordinate = Some(tp);
                let call = self.as_multi(
                    &redemption.msg,
                    recipient,
                    amount,
                    Some(tp),
                )?;
                match self.submitter.submit_and_watch(&call, shutdown).await {
                    Ok(block) => {
                        tracing::debug!("Approved multisig {tp} in {block}");
                        Ok(Step::Voted)
                    }
                    // someone may have executed it in the meantime.
                    Err(e) if is_rejection(&e) => {
                        tracing::warn!("Approval of multisig {tp} rejected: {e}");
                        Ok(Step::Waiting)
                    }
                    Err(e) => Err(e),
                }
            }
            MultiSigStatus::NotFound if redemption.opened => {
                tracing::debug!("Waiting for the listener to see our multisig");
                Ok(Step::Voted)
            }
            MultiSigStatus::NotFound => {
                let call =
                    self.as_multi(&redemption.msg, recipient, amount, None)?;
                match self.submitter.submit_and_watch(&call, shutdown).await {
                    Ok(block) => {
                        tracing::debug!("Opened multisig in {block}");
                        redemption.opened = true;
                        Ok(Step::Voted)
                    }
                    Err(e) if is_rejection(&e) => Err(
                        Error::UnknownSubmission(format!("new multisig: {e}")),
                    ),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// `Multisig.as_multi` wrapping the transfer of `amount` to `recipient`.
    fn as_multi(
        &self,
        msg: &CrossChainMessage,
        recipient: &Address,
        amount: &BigUint,
        maybe_timepoint: Option<Timepoint>,
    ) -> Result<Call> {
        let value = to_u128(amount)?;
        let asset_id = self.converter.asset_id_for_resource(&msg.resource_id())?;
        let transfer = if asset_id == 0 {
            Call::TransferKeepAlive {
                dest: recipient.clone(),
                value,
            }
        } else {
            Call::AssetTransfer {
                dest: recipient.clone(),
                asset_id,
                value,
            }
        };
        Ok(Call::AsMulti {
            threshold: self.identity.threshold,
            other_signatories: self.identity.sorted_other_signatories(),
            maybe_timepoint,
            call: Box::new(transfer),
            store_call: false,
            max_weight: self.identity.max_call_weight,
        })
    }
}
