// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! A toy contract machine standing in for the contract actor.
//!
//! The first byte of the call data selects the operation:
//!
//! | byte   | operation                                                      |
//! |--------|----------------------------------------------------------------|
//! | `0x01` | increment the counter in slot zero and log the new value        |
//! | `0x02` | return the counter                                             |
//! | `0x03` | store the following 32 bytes in the slot given by the next 32  |
//! | `0xfe` | revert, returning the remaining bytes                          |
//!
//! Anything else is echoed back. Storage writes only survive when the call commits.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ethereum_types::{H160, H256};

use crate::shim::actors::contract::{ContractParams, ContractResult, EvmLog, LogTopic};
use crate::shim::error::ExitCode;

pub const OP_INCREMENT: u8 = 0x01;
pub const OP_READ: u8 = 0x02;
pub const OP_STORE: u8 = 0x03;
pub const OP_REVERT: u8 = 0xfe;

pub const BASE_GAS: u64 = 21_000;
pub const GAS_PER_BYTE: u64 = 16;
pub const GAS_PER_WRITE: u64 = 20_000;

/// `keccak256("Incremented(uint256)")`
pub static INCREMENTED_TOPIC: LazyLock<H256> =
    LazyLock::new(|| keccak_hash::keccak(b"Incremented(uint256)"));

const COUNTER_SLOT: H256 = H256::zero();

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractState {
    pub code: Vec<u8>,
    pub storage: BTreeMap<H256, H256>,
}

impl ContractState {
    pub fn new(code: Vec<u8>) -> Self {
        Self {
            code,
            storage: BTreeMap::new(),
        }
    }

    pub fn load(&self, slot: &H256) -> H256 {
        self.storage.get(slot).copied().unwrap_or_default()
    }

    fn counter(&self) -> u64 {
        let word = self.load(&COUNTER_SLOT);
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&word.as_bytes()[24..]);
        u64::from_be_bytes(bytes)
    }
}

fn word(n: u64) -> H256 {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&n.to_be_bytes());
    H256(bytes)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: ExitCode,
    pub return_data: Vec<u8>,
    pub gas_used: u64,
    pub logs: Vec<EvmLog>,
    /// Failure description, empty on success.
    pub error: String,
}

impl Outcome {
    fn success(result: ContractResult) -> anyhow::Result<Self> {
        Ok(Self {
            exit_code: ExitCode::OK,
            gas_used: result.gas_used,
            logs: result.logs.clone(),
            return_data: fvm_ipld_encoding::to_vec(&result)?,
            error: String::new(),
        })
    }
}

/// Runs `params` against the contract living at `address`.
pub fn invoke(
    state: &mut ContractState,
    address: H160,
    params: &ContractParams,
) -> anyhow::Result<Outcome> {
    let data = &params.code;
    let mut gas_used = BASE_GAS + GAS_PER_BYTE * data.len() as u64;
    let mut logs = vec![];
    let value = match data.split_first() {
        Some((&OP_INCREMENT, _)) => {
            let next = state.counter() + 1;
            gas_used += GAS_PER_WRITE;
            if params.commit {
                state.storage.insert(COUNTER_SLOT, word(next));
            }
            logs.push(EvmLog {
                address: address.as_bytes().to_vec(),
                topics: vec![LogTopic(INCREMENTED_TOPIC.as_bytes().to_vec())],
                data: word(next).as_bytes().to_vec(),
                removed: false,
            });
            word(next).as_bytes().to_vec()
        }
        Some((&OP_READ, _)) => word(state.counter()).as_bytes().to_vec(),
        Some((&OP_STORE, rest)) if rest.len() == 64 => {
            gas_used += GAS_PER_WRITE;
            if params.commit {
                state
                    .storage
                    .insert(H256::from_slice(&rest[..32]), H256::from_slice(&rest[32..]));
            }
            vec![]
        }
        Some((&OP_REVERT, rest)) => {
            return Ok(Outcome {
                exit_code: ExitCode::USR_ASSERTION_FAILED,
                return_data: rest.to_vec(),
                gas_used: BASE_GAS,
                logs: vec![],
                error: "contract reverted".into(),
            });
        }
        _ => data.clone(),
    };
    Outcome::success(ContractResult {
        value,
        logs,
        gas_used,
        address: address.as_bytes().to_vec(),
    })
}
