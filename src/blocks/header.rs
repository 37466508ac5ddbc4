// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::TipsetKey;
use crate::shim::{address::Address, clock::ChainEpoch, econ::TokenAmount};
use crate::utils::cid::CidCborExt as _;
use cid::Cid;
use fvm_ipld_encoding::tuple::*;

/// Gas available to the messages of a single block.
pub const BLOCK_GAS_LIMIT: u64 = 10_000_000_000;

#[derive(Deserialize_tuple, Serialize_tuple, Clone, Eq, PartialEq, Debug)]
pub struct BlockHeader {
    /// The address of the miner actor that mined this block
    pub miner_address: Address,
    /// Number of election wins this block represents
    pub win_count: i64,
    /// The set of parents this block was based on.
    pub parents: TipsetKey,
    /// The period in which a new block is generated.
    pub epoch: ChainEpoch,
    /// The CID of the parent state root after calculating parent tipset.
    pub state_root: Cid,
    /// The CID of the root of an array of `MessageReceipts`
    pub message_receipts: Cid,
    /// The CID of the Merkle links for `bls_messages` and `secp_messages`
    pub messages: Cid,
    /// Block creation time, in seconds since the Unix epoch
    pub timestamp: u64,
    /// The base fee of the parent block
    pub parent_base_fee: TokenAmount,
}

impl BlockHeader {
    pub fn cid(&self) -> anyhow::Result<Cid> {
        Ok(Cid::from_cbor_blake2b256(self)?)
    }

    /// Size of the CBOR encoding of this header.
    pub fn encoded_len(&self) -> anyhow::Result<usize> {
        Ok(fvm_ipld_encoding::to_vec(self)?.len())
    }
}
