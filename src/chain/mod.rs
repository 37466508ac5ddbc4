// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Read access to the chain store, consumed by the bridge through [`ChainReader`].

use std::sync::Arc;

use async_trait::async_trait;
use cid::Cid;
use tokio::sync::broadcast;

use crate::blocks::{BlockHeader, Tipset, TipsetKey};
use crate::message::{ChainMessage, SignedMessage};
use crate::shim::{
    address::Address, clock::ChainEpoch, econ::TokenAmount, executor::Receipt,
    message::Message,
};

/// Head change notification emitted whenever the heaviest tipset moves.
#[derive(Clone, Debug)]
pub enum HeadChange {
    Apply(Arc<Tipset>),
    Revert(Arc<Tipset>),
}

/// Messages referenced by a block. `cids` lists BLS messages first, then the signed ones, which
/// is also the order used to number transactions inside a block.
#[derive(Clone, Debug, Default)]
pub struct BlockMessages {
    pub bls_messages: Vec<Message>,
    pub secp_messages: Vec<SignedMessage>,
    pub cids: Vec<Cid>,
}

impl BlockMessages {
    /// Index of `cid` in the combined message list.
    pub fn position(&self, cid: &Cid) -> Option<usize> {
        self.cids.iter().position(|c| c == cid)
    }

    /// Message at `index` of the combined list.
    pub fn get(&self, index: usize) -> Option<ChainMessage> {
        let bls = self.bls_messages.len();
        if index < bls {
            self.bls_messages.get(index).cloned().map(ChainMessage::Unsigned)
        } else {
            self.secp_messages
                .get(index - bls)
                .cloned()
                .map(ChainMessage::Signed)
        }
    }

    pub fn len(&self) -> usize {
        self.cids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ChainMessage> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorState {
    pub code: Cid,
    pub sequence: u64,
    pub balance: TokenAmount,
}

/// Where a message landed on chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageLookup {
    /// Tipset whose blocks include the message.
    pub tipset: TipsetKey,
    pub height: ChainEpoch,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn heaviest_tipset(&self) -> anyhow::Result<Arc<Tipset>>;

    /// Tipset at `height`, or the closest non-null one below it.
    async fn tipset_by_height(&self, height: ChainEpoch) -> anyhow::Result<Arc<Tipset>>;

    async fn load_tipset(&self, key: &TipsetKey) -> anyhow::Result<Arc<Tipset>>;

    async fn block_header(&self, cid: &Cid) -> anyhow::Result<BlockHeader>;

    async fn block_messages(&self, block: &Cid) -> anyhow::Result<BlockMessages>;

    async fn message(&self, cid: &Cid) -> anyhow::Result<ChainMessage>;

    /// Locates an included message, `None` while it is still pending or unknown.
    async fn search_message(&self, cid: &Cid) -> anyhow::Result<Option<MessageLookup>>;

    /// Actor state at `tipset`, `None` if the actor does not exist there.
    async fn actor(&self, addr: &Address, tipset: &TipsetKey)
    -> anyhow::Result<Option<ActorState>>;

    /// Receipt of a message as recorded by the tipset executing it.
    async fn receipt(&self, msg: &Cid, tipset: &TipsetKey) -> anyhow::Result<Receipt>;

    fn subscribe_head_changes(&self) -> broadcast::Receiver<HeadChange>;
}
