// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::str::FromStr;

use cid::Cid;
use ethereum_types::H256;
use serde::{Deserialize, Serialize};

use super::quantity::{hexify, hexify_bytes, hexify_vec_bytes};
use crate::shim::actors::contract::EvmLog;
use crate::shim::clock::ChainEpoch;
use crate::shim::econ::TokenAmount;
use crate::utils::cid::CidCborExt as _;

/// Keccak-256 of an RLP of an empty array.
/// There are no uncle blocks here, every block of a tipset is rewarded instead.
const EMPTY_UNCLES: &str = "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347";

/// Keccak-256 of the RLP of null.
const EMPTY_ROOT: &str = "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421";

#[derive(PartialEq, Debug, Deserialize, Serialize, Default, Clone)]
pub struct EthBigInt(#[serde(with = "hexify")] pub num_bigint::BigInt);

impl From<TokenAmount> for EthBigInt {
    fn from(amount: TokenAmount) -> Self {
        (&amount).into()
    }
}

impl From<&TokenAmount> for EthBigInt {
    fn from(amount: &TokenAmount) -> Self {
        Self(amount.atto().to_owned())
    }
}

#[derive(PartialEq, Eq, Debug, Deserialize, Serialize, Default, Clone)]
pub struct Bloom(#[serde(with = "hexify_bytes")] pub ethereum_types::Bloom);

#[derive(
    PartialEq, Eq, Debug, Deserialize, Serialize, Default, Clone, derive_more::From, derive_more::Into,
)]
pub struct Uint64(#[serde(with = "hexify")] pub u64);

#[derive(
    PartialEq, Eq, Debug, Deserialize, Serialize, Default, Clone, derive_more::From, derive_more::Into,
)]
pub struct Int64(#[serde(with = "hexify")] pub i64);

#[derive(PartialEq, Eq, Debug, Deserialize, Serialize, Default, Clone, derive_more::From)]
pub struct EthBytes(#[serde(with = "hexify_vec_bytes")] pub Vec<u8>);

/// 32-byte hash of a block, tipset or message: the BLAKE2b-256 digest of its CID.
#[derive(
    PartialEq, Eq, Hash, Debug, Deserialize, Serialize, Default, Clone, Copy, derive_more::Display,
)]
#[display("{_0:#x}")]
pub struct Hash(pub H256);

impl Hash {
    /// Rebuilds the `dag-cbor` CID this hash was derived from.
    pub fn to_cid(&self) -> anyhow::Result<Cid> {
        Cid::from_blake2b256_digest(self.0.as_bytes())
    }

    pub fn empty_uncles() -> Self {
        Self(H256::from_str(EMPTY_UNCLES).unwrap_or_default())
    }

    pub fn empty_root() -> Self {
        Self(H256::from_str(EMPTY_ROOT).unwrap_or_default())
    }
}

impl FromStr for Hash {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Hash(H256::from_str(s)?))
    }
}

impl From<Cid> for Hash {
    fn from(cid: Cid) -> Self {
        let digest = cid.hash().digest();
        let mut bytes = [0u8; 32];
        let n = digest.len().min(bytes.len());
        bytes[..n].copy_from_slice(&digest[..n]);
        Hash(H256(bytes))
    }
}

impl From<&Cid> for Hash {
    fn from(cid: &Cid) -> Self {
        (*cid).into()
    }
}

/// A contract log as seen by clients.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthLog {
    pub address: EthBytes,
    pub topics: Vec<EthBytes>,
    pub data: EthBytes,
    pub removed: bool,
    pub block_number: Uint64,
    /// Position of the log among all logs recorded at its height.
    pub log_index: Uint64,
}

impl EthLog {
    pub fn new(log: &EvmLog, height: ChainEpoch, log_index: usize) -> Self {
        Self {
            address: EthBytes(log.address.clone()),
            topics: log.topics.iter().map(|t| EthBytes(t.0.clone())).collect(),
            data: EthBytes(log.data.clone()),
            removed: log.removed,
            block_number: Uint64(u64::try_from(height).unwrap_or_default()),
            log_index: Uint64(log_index as u64),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)] // try a Vec<Hash>, then a Vec<Tx>
pub enum Transactions {
    Hash(Vec<Hash>),
    Full(Vec<Tx>),
}

impl Default for Transactions {
    fn default() -> Self {
        Self::Hash(vec![])
    }
}

impl Transactions {
    pub fn len(&self) -> usize {
        match self {
            Self::Hash(v) => v.len(),
            Self::Full(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub number: Uint64,
    /// Position of this block inside its tipset.
    pub block_index: Uint64,
    pub hash: Hash,
    pub parent_hash: Hash,
    pub nonce: EthBytes,
    pub sha3_uncles: Hash,
    pub logs_bloom: Bloom,
    pub transactions_root: Hash,
    pub state_root: Hash,
    pub receipts_root: Hash,
    pub miner: String,
    pub difficulty: Uint64,
    pub total_difficulty: Uint64,
    pub extra_data: EthBytes,
    pub size: Uint64,
    pub gas_limit: Uint64,
    pub gas_used: Uint64,
    pub timestamp: Uint64,
    // can be Vec<Tx> or Vec<Hash> depending on query params
    pub transactions: Transactions,
    pub uncles: Vec<Hash>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tx {
    pub hash: Hash,
    pub block_hash: Hash,
    pub block_number: Uint64,
    pub block_index: Uint64,
    pub transaction_index: Uint64,
    pub from: String,
    pub to: String,
    pub gas: Uint64,
    pub gas_price: EthBigInt,
    pub input: EthBytes,
    pub nonce: Uint64,
    pub value: EthBigInt,
    pub v: Uint64,
    pub r: Hash,
    pub s: Hash,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: Hash,
    pub transaction_index: Uint64,
    pub block_hash: Hash,
    pub block_number: Uint64,
    pub block_index: Uint64,
    pub from: String,
    pub to: String,
    pub cumulative_gas_used: Uint64,
    pub gas_used: Uint64,
    pub contract_address: Option<String>,
    pub logs: Vec<EthLog>,
    pub logs_bloom: Bloom,
    pub status: Uint64,
}

/// What a filter poll hands back, decided by the kind of the filter.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterChanges {
    Hashes(Vec<Hash>),
    Logs(Vec<EthLog>),
}

impl FilterChanges {
    pub fn len(&self) -> usize {
        match self {
            Self::Hashes(v) => v.len(),
            Self::Logs(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub starting_block: Int64,
    pub current_block: Int64,
    pub highest_block: Int64,
}

/// `false` once in sync, the progress object otherwise.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncingResult {
    DoneSync(bool),
    Syncing(SyncProgress),
}
