// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use async_trait::async_trait;

use crate::message::SignedMessage;
use crate::shim::{address::Address, crypto::Signature, message::Message};

/// Key holder able to sign on behalf of its addresses.
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn default_address(&self) -> anyhow::Result<Option<Address>>;

    async fn list_addresses(&self) -> anyhow::Result<Vec<Address>>;

    async fn sign(&self, addr: &Address, payload: &[u8]) -> anyhow::Result<Signature>;
}

/// Signs the CID bytes of `message` with the key of its sender.
pub async fn sign_message(wallet: &dyn Wallet, message: Message) -> anyhow::Result<SignedMessage> {
    let payload = message.cid()?.to_bytes();
    let signature = wallet.sign(&message.from, &payload).await?;
    Ok(SignedMessage::new_unchecked(message, signature))
}
