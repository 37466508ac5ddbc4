// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Simulation, gas estimation and submission of built messages.

use anyhow::Context as _;
use cid::Cid;
use tracing::debug;

use super::errors::EthError;
use super::message::CallMessage;
use crate::blocks::TipsetKey;
use crate::rpc::RPCState;
use crate::shim::actors::{contract::ContractResult, init::ExecReturn};
use crate::state_manager::InvocResult;
use crate::wallet::sign_message;

/// Blocks the premium estimate looks back over.
const PREMIUM_LOOKBACK: u64 = 10;

/// Blocks a message may wait in the pool before its fee cap is exceeded.
const FEE_CAP_QUEUE_BLOCKS: i64 = 20;

/// Runs a non-mutating copy of `msg` on top of `tipset`.
pub async fn simulate(
    ctx: &RPCState,
    msg: &CallMessage,
    tipset: &TipsetKey,
) -> Result<InvocResult, EthError> {
    let probe = msg.probe()?;
    let res = ctx.state.call(&probe.message, tipset).await?;
    let exit_code = res.msg_rct.as_ref().map(|r| r.exit_code);
    if !res.error.is_empty() {
        return Err(EthError::execution_reverted(
            exit_code,
            &res.error,
            res.return_data(),
        ));
    }
    if let Some(code) = exit_code
        && !code.is_success()
    {
        return Err(EthError::execution_reverted(
            Some(code),
            "actor aborted",
            res.return_data(),
        ));
    }
    Ok(res)
}

/// Gas needed by `msg`, estimated on a non-mutating copy so repeated estimates leave no trace.
pub async fn estimate_gas(
    ctx: &RPCState,
    msg: &CallMessage,
    tipset: &TipsetKey,
) -> Result<u64, EthError> {
    let probe = msg.probe()?;
    let gas = ctx.gas.estimate_gas_limit(&probe.message, tipset).await?;
    Ok(u64::try_from(gas).with_context(|| format!("negative gas estimate {gas}"))?)
}

/// Submits `msg` to the message pool and returns its CID.
///
/// An explicit nonce means the caller picked every field: the message is signed and pushed as
/// is. Otherwise gas is estimated, the sender balance checked and the pool assigns the nonce.
pub async fn commit(ctx: &RPCState, msg: &CallMessage) -> Result<Cid, EthError> {
    if msg.message.sequence > 0 {
        debug!(
            "pushing {} message with nonce {}",
            msg.shape, msg.message.sequence
        );
        let signed = sign_message(ctx.wallet.as_ref(), msg.message.clone()).await?;
        return Ok(ctx.mpool.push(signed).await?);
    }

    let head = ctx.chain.heaviest_tipset().await?;
    let key = head.key();
    let mut message = msg.message.clone();
    if message.gas_limit == 0 {
        message.gas_limit = estimate_gas(ctx, msg, key).await?;
    }

    let premium = ctx
        .gas
        .estimate_gas_premium(PREMIUM_LOOKBACK, &message.from, message.gas_limit, key)
        .await?;
    if !message.gas_fee_cap.is_zero() && premium > message.gas_fee_cap {
        return Err(EthError::GasOverpriced {
            premium,
            fee_cap: message.gas_fee_cap,
        });
    }
    message.gas_premium = premium;
    if message.gas_fee_cap.is_zero() {
        message.gas_fee_cap = ctx
            .gas
            .estimate_fee_cap(&message, FEE_CAP_QUEUE_BLOCKS, key)
            .await?;
    }

    let balance = ctx
        .chain
        .actor(&message.from, key)
        .await?
        .map(|actor| actor.balance)
        .unwrap_or_default();
    if &balance < msg.value() {
        return Err(EthError::InsufficientBalance {
            balance,
            required: msg.value().clone(),
        });
    }

    debug!("pushing {} message from {}", msg.shape, message.from);
    let signed = ctx.mpool.push_message(message, None).await?;
    Ok(signed.cid()?)
}

/// What the return bytes of an execution turned out to hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutput {
    Created(ExecReturn),
    Contract(ContractResult),
    /// Neither envelope, as returned by plain transfers.
    Plain,
}

pub fn decode_contract_return(bytes: &[u8]) -> ExecutionOutput {
    if let Ok(created) = fvm_ipld_encoding::from_slice::<ExecReturn>(bytes) {
        return ExecutionOutput::Created(created);
    }
    match fvm_ipld_encoding::from_slice::<ContractResult>(bytes) {
        Ok(result) => ExecutionOutput::Contract(result),
        Err(_) => ExecutionOutput::Plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devnet::vm;
    use crate::rpc::methods::eth::filter::FilterConfig;
    use crate::rpc::methods::eth::message::{CallRequest, build_message};
    use crate::rpc::methods::eth::quantity::{HexString, format_bytes};
    use crate::shim::address::Address;
    use crate::shim::econ::TokenAmount;
    use crate::shim::message::Message;
    use crate::test_utils::{TestNet, test_net};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    async fn contract_call(net: &TestNet, data: Vec<u8>, mutating: bool) -> CallMessage {
        let request = CallRequest {
            from: net.account.to_string(),
            to: net.contract.to_string(),
            data: HexString(format_bytes(&data)),
            ..Default::default()
        };
        let head = net.state.chain.heaviest_tipset().await.unwrap();
        build_message(net.state.classifier.as_ref(), &request, head.key(), mutating)
            .await
            .unwrap()
    }

    async fn counter(net: &TestNet) -> Vec<u8> {
        let msg = contract_call(net, vec![vm::OP_READ], false).await;
        let head = net.state.chain.heaviest_tipset().await.unwrap();
        let res = simulate(&net.state, &msg, head.key()).await.unwrap();
        match decode_contract_return(res.return_data()) {
            ExecutionOutput::Contract(result) => result.value,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_estimates_leave_no_trace() {
        let net = test_net().await;
        let msg = contract_call(&net, vec![vm::OP_INCREMENT], true).await;
        let head = net.state.chain.heaviest_tipset().await.unwrap();
        let before = counter(&net).await;

        let first = estimate_gas(&net.state, &msg, head.key()).await.unwrap();
        let second = estimate_gas(&net.state, &msg, head.key()).await.unwrap();
        assert_eq!(first, second);
        assert!(first > 0);
        assert_eq!(counter(&net).await, before);
        // the message itself still commits
        assert!(msg.mutating());
    }

    struct NegativeEstimator;

    #[async_trait::async_trait]
    impl crate::state_manager::GasEstimator for NegativeEstimator {
        async fn estimate_gas_limit(&self, _: &Message, _: &TipsetKey) -> anyhow::Result<i64> {
            Ok(-1)
        }

        async fn estimate_gas_premium(
            &self,
            _: u64,
            _: &Address,
            _: u64,
            _: &TipsetKey,
        ) -> anyhow::Result<TokenAmount> {
            Ok(TokenAmount::default())
        }

        async fn estimate_fee_cap(
            &self,
            _: &Message,
            _: i64,
            _: &TipsetKey,
        ) -> anyhow::Result<TokenAmount> {
            Ok(TokenAmount::default())
        }
    }

    #[tokio::test]
    async fn negative_estimates_are_errors() {
        let net = test_net().await;
        let mut services = net.devnet.services();
        services.gas = Arc::new(NegativeEstimator);
        let state = RPCState::new(services, FilterConfig::default());
        let msg = contract_call(&net, vec![vm::OP_INCREMENT], true).await;
        let head = state.chain.heaviest_tipset().await.unwrap();
        match estimate_gas(&state, &msg, head.key()).await {
            Err(EthError::ChainLookupFailed(e)) => {
                assert!(e.to_string().contains("negative gas estimate"))
            }
            other => panic!("expected a lookup failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn simulation_never_commits() {
        let net = test_net().await;
        let msg = contract_call(&net, vec![vm::OP_INCREMENT], true).await;
        let head = net.state.chain.heaviest_tipset().await.unwrap();
        let before = counter(&net).await;
        simulate(&net.state, &msg, head.key()).await.unwrap();
        simulate(&net.state, &msg, head.key()).await.unwrap();
        assert_eq!(counter(&net).await, before);
    }

    #[tokio::test]
    async fn reverts_carry_return_data() {
        let net = test_net().await;
        let msg = contract_call(&net, vec![vm::OP_REVERT, 0xbe, 0xef], false).await;
        let head = net.state.chain.heaviest_tipset().await.unwrap();
        match simulate(&net.state, &msg, head.key()).await {
            Err(EthError::SimulationReverted { data, .. }) => assert_eq!(data, vec![0xbe, 0xef]),
            other => panic!("expected a revert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn commit_without_nonce_estimates_and_pushes() {
        let net = test_net().await;
        let msg = contract_call(&net, vec![vm::OP_INCREMENT], true).await;
        let calls = &net.devnet.calls;
        let estimates = calls.estimate_gas_limit.load(Ordering::SeqCst);

        let cid = commit(&net.state, &msg).await.unwrap();
        assert_eq!(
            calls.estimate_gas_limit.load(Ordering::SeqCst),
            estimates + 1
        );
        assert_eq!(calls.push_message.load(Ordering::SeqCst), 1);
        assert_eq!(calls.push.load(Ordering::SeqCst), 0);

        let pending = net.devnet.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].cid().unwrap(), cid);
        assert!(pending[0].message().gas_limit > 0);
        let params: crate::shim::actors::contract::ContractParams =
            pending[0].message().params.deserialize().unwrap();
        assert!(params.commit);
    }

    #[tokio::test]
    async fn commit_with_nonce_is_pushed_untouched() {
        let net = test_net().await;
        let mut msg = contract_call(&net, vec![vm::OP_INCREMENT], true).await;
        msg.message.sequence = 3;
        msg.message.gas_limit = 12_345;
        msg.message.gas_fee_cap = TokenAmount::from_atto(7);
        msg.message.gas_premium = TokenAmount::from_atto(7);
        let calls = &net.devnet.calls;
        let estimates = calls.estimate_gas_limit.load(Ordering::SeqCst);

        let cid = commit(&net.state, &msg).await.unwrap();
        assert_eq!(calls.estimate_gas_limit.load(Ordering::SeqCst), estimates);
        assert_eq!(calls.push.load(Ordering::SeqCst), 1);
        assert_eq!(calls.push_message.load(Ordering::SeqCst), 0);

        let pending = net.devnet.pending();
        assert_eq!(pending[0].cid().unwrap(), cid);
        assert_eq!(pending[0].message(), &msg.message);
    }

    #[tokio::test]
    async fn commit_checks_the_balance() {
        let net = test_net().await;
        let request = CallRequest {
            from: Address::new_id(4242).to_string(),
            to: net.account.to_string(),
            value: "0x10".into(),
            gas: "0x100".into(),
            ..Default::default()
        };
        let head = net.state.chain.heaviest_tipset().await.unwrap();
        let msg = build_message(net.state.classifier.as_ref(), &request, head.key(), true)
            .await
            .unwrap();
        assert!(matches!(
            commit(&net.state, &msg).await,
            Err(EthError::InsufficientBalance { .. })
        ));
        assert!(net.devnet.pending().is_empty());
    }

    #[tokio::test]
    async fn commit_rejects_a_low_fee_cap() {
        let net = test_net().await;
        let mut msg = contract_call(&net, vec![vm::OP_INCREMENT], true).await;
        msg.message.gas_fee_cap = TokenAmount::from_atto(1);
        assert!(matches!(
            commit(&net.state, &msg).await,
            Err(EthError::GasOverpriced { .. })
        ));
    }

    #[test]
    fn decodes_both_envelopes() {
        let created = ExecReturn {
            id_address: Address::new_id(1001),
            robust_address: Address::new_actor(b"robust"),
        };
        let bytes = fvm_ipld_encoding::to_vec(&created).unwrap();
        assert_eq!(
            decode_contract_return(&bytes),
            ExecutionOutput::Created(created)
        );

        let result = ContractResult {
            value: vec![1],
            gas_used: 10,
            ..Default::default()
        };
        let bytes = fvm_ipld_encoding::to_vec(&result).unwrap();
        assert_eq!(
            decode_contract_return(&bytes),
            ExecutionOutput::Contract(result)
        );

        assert_eq!(decode_contract_return(&[]), ExecutionOutput::Plain);
    }
}
