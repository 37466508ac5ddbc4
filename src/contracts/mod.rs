// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Side database kept by the contract actor: logs per height and contract state roots.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::shim::{actors::contract::LogsEntry, clock::ChainEpoch};

#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Logs emitted at `height`, `None` if nothing was recorded there.
    async fn height_logs(&self, height: ChainEpoch) -> anyhow::Result<Option<LogsEntry>>;

    /// Root of the contract storage trie after executing `height`.
    async fn state_root(&self, height: ChainEpoch) -> anyhow::Result<Vec<u8>>;

    /// Stream of log entries as heights get executed.
    fn subscribe_logs(&self) -> broadcast::Receiver<LogsEntry>;
}
