// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_trait::async_trait;
use cid::Cid;
use tokio::sync::broadcast;

use crate::message::SignedMessage;
use crate::shim::{econ::TokenAmount, message::Message};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum MpoolChange {
    Add,
    Remove,
}

#[derive(Clone, Debug)]
pub struct MpoolUpdate {
    pub change: MpoolChange,
    pub message: SignedMessage,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageSendSpec {
    pub max_fee: TokenAmount,
}

#[async_trait]
pub trait MessagePool: Send + Sync {
    /// Adds an already signed message.
    async fn push(&self, msg: SignedMessage) -> anyhow::Result<Cid>;

    /// Assigns the next nonce, fills unset gas fields, signs with the sender key and adds the
    /// result to the pool.
    async fn push_message(
        &self,
        msg: Message,
        spec: Option<MessageSendSpec>,
    ) -> anyhow::Result<SignedMessage>;

    fn subscribe_updates(&self) -> broadcast::Receiver<MpoolUpdate>;
}
