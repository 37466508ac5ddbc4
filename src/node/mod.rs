// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_trait::async_trait;

use crate::shim::{address::Address, clock::ChainEpoch};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub starting_block: ChainEpoch,
    pub current_block: ChainEpoch,
    pub highest_block: ChainEpoch,
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        self.current_block >= self.highest_block
    }
}

/// Node-level facts that are not part of chain state.
#[async_trait]
pub trait NodeInfo: Send + Sync {
    async fn sync_status(&self) -> anyhow::Result<SyncStatus>;

    /// Miner actors operated by this node.
    async fn miners(&self) -> anyhow::Result<Vec<Address>>;

    fn chain_id(&self) -> u64;

    async fn peer_count(&self) -> anyhow::Result<usize>;

    fn listening(&self) -> bool;

    fn client_version(&self) -> String;
}
