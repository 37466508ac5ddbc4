// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Execution-side collaborators: dry-run calls, gas estimation and actor classification.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use cid::Cid;

use crate::blocks::TipsetKey;
use crate::chain::ChainReader;
use crate::shim::{
    actors::contract, address::Address, econ::TokenAmount, executor::Receipt, message::Message,
};

/// Outcome of executing a message without persisting its effects.
#[derive(Clone, Debug, Default)]
pub struct InvocResult {
    pub msg: Message,
    pub msg_cid: Option<Cid>,
    pub msg_rct: Option<Receipt>,
    /// Execution failure reported by the VM, empty on success.
    pub error: String,
}

impl InvocResult {
    pub fn return_data(&self) -> &[u8] {
        self.msg_rct
            .as_ref()
            .map(|r| r.return_data.bytes())
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait StateCaller: Send + Sync {
    /// Runs `msg` on top of the state of `tipset`; must not mutate persistent state.
    async fn call(&self, msg: &Message, tipset: &TipsetKey) -> anyhow::Result<InvocResult>;

    /// Re-executes the messages included in `tipset`, returning one result per message.
    async fn replay(&self, tipset: &TipsetKey) -> anyhow::Result<Vec<InvocResult>>;
}

#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn estimate_gas_limit(&self, msg: &Message, tipset: &TipsetKey) -> anyhow::Result<i64>;

    async fn estimate_gas_premium(
        &self,
        nblocks: u64,
        sender: &Address,
        gas_limit: u64,
        tipset: &TipsetKey,
    ) -> anyhow::Result<TokenAmount>;

    async fn estimate_fee_cap(
        &self,
        msg: &Message,
        max_queue_blocks: i64,
        tipset: &TipsetKey,
    ) -> anyhow::Result<TokenAmount>;
}

/// Distinguishes plain accounts from contract actors.
#[async_trait]
pub trait ActorClassifier: Send + Sync {
    async fn is_contract_address(&self, addr: &Address, tipset: &TipsetKey)
    -> anyhow::Result<bool>;
}

/// Classifies actors by comparing their code CID with the contract actor's.
pub struct CodeClassifier {
    chain: Arc<dyn ChainReader>,
}

impl CodeClassifier {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ActorClassifier for CodeClassifier {
    async fn is_contract_address(
        &self,
        addr: &Address,
        tipset: &TipsetKey,
    ) -> anyhow::Result<bool> {
        let actor = self
            .chain
            .actor(addr, tipset)
            .await
            .with_context(|| format!("failed to load actor {addr}"))?;
        Ok(actor.is_some_and(|a| a.code == *contract::CODE_ID))
    }
}
