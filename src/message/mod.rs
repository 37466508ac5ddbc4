// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod signed_message;

use crate::shim::message::Message;
use cid::Cid;
pub use signed_message::SignedMessage;

/// A message as stored in a block: BLS messages are kept unsigned (their signatures are
/// aggregated into the block), every other scheme keeps its signature alongside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainMessage {
    Unsigned(Message),
    Signed(SignedMessage),
}

impl ChainMessage {
    pub fn message(&self) -> &Message {
        match self {
            Self::Unsigned(m) => m,
            Self::Signed(sm) => sm.message(),
        }
    }

    pub fn cid(&self) -> anyhow::Result<Cid> {
        match self {
            Self::Unsigned(m) => m.cid(),
            Self::Signed(sm) => sm.cid(),
        }
    }

    /// Raw signature bytes; empty for messages stored without a signature.
    pub fn signature_bytes(&self) -> &[u8] {
        match self {
            Self::Unsigned(_) => &[],
            Self::Signed(sm) => sm.signature().bytes(),
        }
    }
}

impl From<Message> for ChainMessage {
    fn from(m: Message) -> Self {
        Self::Unsigned(m)
    }
}

impl From<SignedMessage> for ChainMessage {
    fn from(sm: SignedMessage) -> Self {
        Self::Signed(sm)
    }
}
