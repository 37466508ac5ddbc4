// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use super::{BlockHeader, Error};
use crate::shim::clock::ChainEpoch;
use crate::utils::cid::CidCborExt as _;
use cid::Cid;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

/// A set of CIDs forming a unique key for a tipset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsetKey(Vec<Cid>);

impl TipsetKey {
    pub fn cids(&self) -> &[Cid] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// CID of the key itself.
    pub fn cid(&self) -> anyhow::Result<Cid> {
        Ok(Cid::from_cbor_blake2b256(self)?)
    }
}

impl From<Vec<Cid>> for TipsetKey {
    fn from(cids: Vec<Cid>) -> Self {
        Self(cids)
    }
}

impl fmt::Display for TipsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// An immutable set of blocks at the same height with the same parent set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tipset {
    headers: Vec<BlockHeader>,
    key: TipsetKey,
}

impl Tipset {
    /// Builds a tipset from a non-empty list of headers sharing epoch and parents.
    pub fn new(headers: Vec<BlockHeader>) -> anyhow::Result<Self> {
        let first = headers.first().ok_or(Error::NoBlocks)?;
        for header in &headers[1..] {
            if header.epoch != first.epoch {
                return Err(Error::InvalidTipset("epochs are not equal".into()).into());
            }
            if header.parents != first.parents {
                return Err(Error::InvalidTipset("parent cids are not equal".into()).into());
            }
        }
        let key = headers
            .iter()
            .map(BlockHeader::cid)
            .collect::<anyhow::Result<Vec<_>>>()?
            .into();
        Ok(Self { headers, key })
    }

    pub fn epoch(&self) -> ChainEpoch {
        self.min_ticket_block().epoch
    }

    pub fn block_headers(&self) -> &[BlockHeader] {
        &self.headers
    }

    pub fn key(&self) -> &TipsetKey {
        &self.key
    }

    pub fn parents(&self) -> &TipsetKey {
        &self.min_ticket_block().parents
    }

    /// First block of the tipset; `new` guarantees there is one.
    pub fn min_ticket_block(&self) -> &BlockHeader {
        &self.headers[0]
    }

    pub fn min_timestamp(&self) -> u64 {
        self.headers.iter().map(|h| h.timestamp).min().unwrap_or_default()
    }

    /// Position of the block with the given CID inside the tipset.
    pub fn block_index(&self, cid: &Cid) -> Option<usize> {
        self.key.cids().iter().position(|c| c == cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shim::address::Address;
    use crate::shim::econ::TokenAmount;

    fn header(epoch: ChainEpoch, miner: u64) -> BlockHeader {
        let empty = Cid::from_cbor_blake2b256(&()).unwrap();
        BlockHeader {
            miner_address: Address::new_id(miner),
            win_count: 1,
            parents: TipsetKey::default(),
            epoch,
            state_root: empty,
            message_receipts: empty,
            messages: empty,
            timestamp: 1000 + miner,
            parent_base_fee: TokenAmount::from_atto(100),
        }
    }

    #[test]
    fn rejects_empty_and_mixed_epochs() {
        assert!(Tipset::new(vec![]).is_err());
        assert!(Tipset::new(vec![header(1, 1), header(2, 2)]).is_err());
    }

    #[test]
    fn key_follows_header_order() {
        let ts = Tipset::new(vec![header(5, 1), header(5, 2)]).unwrap();
        assert_eq!(ts.epoch(), 5);
        assert_eq!(ts.key().cids().len(), 2);
        let second = ts.block_headers()[1].cid().unwrap();
        assert_eq!(ts.block_index(&second), Some(1));
        assert_eq!(ts.min_timestamp(), 1001);
    }
}
