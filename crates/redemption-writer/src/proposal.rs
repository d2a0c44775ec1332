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

use parity_scale_codec::Decode;

use ferry_relayer_context::Shutdown;
use ferry_relayer_types::{
    Call, ChainId, CrossChainMessage, DepositNonce, Payload, ProposalArgs,
    ProposalCall, ProposalStatus, ResourceId, StorageKey, VoteState,
};
use ferry_relayer_utils::{Error, Result};

use crate::state::{Redemption, Step};
use crate::{to_u128, RedemptionWriter};

/// `ChainBridge.Resources(resource_id)`, the handler method of a resource.
pub fn resources_key(resource_id: &ResourceId) -> StorageKey {
    StorageKey::new("ChainBridge", "Resources").with_key(resource_id)
}

/// `ChainBridge.Votes(source, (nonce, call))`, the votes on a proposal.
pub fn votes_key(source: ChainId, nonce: DepositNonce, call: &Call) -> StorageKey {
    StorageKey::new("ChainBridge", "Votes")
        .with_key(&source)
        .with_key(&(nonce, call))
}

fn proposal_args(msg: &CrossChainMessage) -> Result<ProposalArgs> {
    let args = match msg.payload() {
        Payload::Native { amount, recipient }
        | Payload::Fungible { amount, recipient }
        | Payload::MultiSig { amount, recipient } => ProposalArgs::Fungible {
            recipient: recipient.clone(),
            amount: to_u128(amount)?,
            resource_id: msg.resource_id(),
        },
        Payload::NonFungible {
            token_id,
            recipient,
            metadata,
        } => ProposalArgs::NonFungible {
            recipient: recipient.clone(),
            token_id: token_id.to_bytes_be(),
            metadata: metadata.clone(),
        },
        Payload::Generic { metadata } => ProposalArgs::Generic {
            hash: sp_core_hashing::blake2_256(metadata),
        },
    };
    Ok(args)
}

impl RedemptionWriter {
    pub(crate) async fn proposal_step(
        &self,
        redemption: &mut Redemption,
        shutdown: &mut Shutdown,
    ) -> Result<Step> {
        let msg = &redemption.msg;
        let connection = self.submitter.connection();
        let method = self.resolve_method(&msg.resource_id(), shutdown).await?;
        let call = Call::Proposal(ProposalCall {
            method,
            args: proposal_args(msg)?,
        });
        let key = votes_key(msg.source(), msg.deposit_nonce(), &call);
        let raw = shutdown.race(connection.query_storage(&key)).await??;
        let votes = raw
            .map(|raw| VoteState::decode(&mut &raw[..]))
            .transpose()?;
        match votes {
            Some(v) if v.status == ProposalStatus::Approved => {
                Ok(Step::Executed)
            }
            Some(v) if v.status == ProposalStatus::Rejected => {
                Err(Error::ProposalRejected {
                    source_chain: msg.source().0,
                    nonce: msg.deposit_nonce().0,
                })
            }
            Some(v) if v.has_voted(&self.identity.own_address) => Ok(Step::Voted),
            _ => {
                let ack = Call::AcknowledgeProposal {
                    nonce: msg.deposit_nonce(),
                    src_id: msg.source(),
                    resource_id: msg.resource_id(),
                    call: Box::new(call),
                };
                let block =
                    self.submitter.submit_and_watch(&ack, shutdown).await?;
                tracing::debug!("Acknowledged proposal in {block}");
                Ok(Step::Voted)
            }
        }
    }

    async fn resolve_method(
        &self,
        resource_id: &ResourceId,
        shutdown: &mut Shutdown,
    ) -> Result<String> {
        let connection = self.submitter.connection();
        let key = resources_key(resource_id);
        let Some(raw) = shutdown.race(connection.query_storage(&key)).await??
        else {
            return Err(Error::Validation(format!(
                "resource {resource_id} is not registered on chain {}",
                self.chain_id
            )));
        };
        let method = Vec::<u8>::decode(&mut &raw[..])?;
        String::from_utf8(method).map_err(|e| {
            Error::Parse(format!("method of resource {resource_id}: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_relayer_types::{Address, BigUint};

    fn msg(payload: Payload) -> CrossChainMessage {
        CrossChainMessage::new(
            ChainId(2),
            ChainId(1),
            DepositNonce(3),
            ResourceId::XASSET,
            payload,
        )
    }

    #[test]
    fn generic_proposals_carry_the_metadata_hash() {
        let args = proposal_args(&msg(Payload::Generic {
            metadata: b"hello".to_vec(),
        }))
        .unwrap();
        assert_eq!(
            args,
            ProposalArgs::Generic {
                hash: sp_core_hashing::blake2_256(b"hello"),
            }
        );
    }

    #[test]
    fn token_ids_are_big_endian() {
        let args = proposal_args(&msg(Payload::NonFungible {
            token_id: BigUint::from(0x0102u32),
            recipient: Address(vec![5; 20]),
            metadata: vec![],
        }))
        .unwrap();
        assert!(matches!(
            args,
            ProposalArgs::NonFungible { token_id, .. } if token_id == vec![1, 2]
        ));
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let res = proposal_args(&msg(Payload::Fungible {
            amount: BigUint::from(u128::MAX) + 1u8,
            recipient: Address(vec![5; 20]),
        }));
        assert!(matches!(res, Err(Error::Validation(_))));
    }

    #[test]
    fn votes_key_depends_on_the_call() {
        let call = |amount| {
            Call::Proposal(ProposalCall {
                method: "Example.transfer".into(),
                args: ProposalArgs::Fungible {
                    recipient: Address(vec![5; 20]),
                    amount,
                    resource_id: ResourceId::XASSET,
                },
            })
        };
        let a = votes_key(ChainId(2), DepositNonce(3), &call(1));
        let b = votes_key(ChainId(2), DepositNonce(3), &call(2));
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "ChainBridge.Votes");
    }
}
