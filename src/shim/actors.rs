// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Parameter and return envelopes of the two built-in actors the bridge talks to: the init
//! actor (contract creation) and the contract actor (invocation and storage reads).

pub mod init {
    use cid::Cid;
    use fvm_ipld_encoding::RawBytes;
    use fvm_ipld_encoding::tuple::*;

    use crate::shim::address::Address;
    use crate::shim::message::MethodNum;

    pub const ADDRESS: Address = Address::new_id(1);

    #[repr(u64)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Method {
        Constructor = 1,
        Exec = 2,
    }

    impl From<Method> for MethodNum {
        fn from(method: Method) -> Self {
            method as MethodNum
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct ExecParams {
        pub code_cid: Cid,
        pub constructor_params: RawBytes,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct ExecReturn {
        pub id_address: Address,
        pub robust_address: Address,
    }
}

pub mod contract {
    use std::sync::LazyLock;

    use cid::Cid;
    use ethereum_types::{Bloom, BloomInput};
    use fvm_ipld_encoding::tuple::*;
    use fvm_ipld_encoding::{IPLD_RAW, strict_bytes};
    use multihash_codetable::{Code, MultihashDigest};
    use serde::{Deserialize, Serialize};

    use crate::shim::address::Address;
    use crate::shim::clock::ChainEpoch;
    use crate::shim::econ::TokenAmount;
    use crate::shim::message::MethodNum;

    /// Code CID shared by every deployed contract actor.
    pub static CODE_ID: LazyLock<Cid> =
        LazyLock::new(|| Cid::new_v1(IPLD_RAW, Code::Blake2b256.digest(b"fil/2/contract")));

    #[repr(u64)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Method {
        Constructor = 1,
        CallContract = 2,
        GetCode = 3,
        GetStorageAt = 4,
    }

    impl From<Method> for MethodNum {
        fn from(method: Method) -> Self {
            method as MethodNum
        }
    }

    /// Payload of a contract invocation or construction.
    ///
    /// `commit` decides whether the resulting state changes are persisted.
    #[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct ContractParams {
        #[serde(with = "strict_bytes")]
        pub code: Vec<u8>,
        pub value: TokenAmount,
        pub commit: bool,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct LogTopic(#[serde(with = "strict_bytes")] pub Vec<u8>);

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct EvmLog {
        #[serde(with = "strict_bytes")]
        pub address: Vec<u8>,
        pub topics: Vec<LogTopic>,
        #[serde(with = "strict_bytes")]
        pub data: Vec<u8>,
        pub removed: bool,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct ContractResult {
        #[serde(with = "strict_bytes")]
        pub value: Vec<u8>,
        pub logs: Vec<EvmLog>,
        pub gas_used: u64,
        /// 20-byte address of the contract, empty when unknown.
        #[serde(with = "strict_bytes")]
        pub address: Vec<u8>,
    }

    /// Logs emitted by all contracts at one height, with their combined bloom.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct LogsEntry {
        pub height: ChainEpoch,
        pub logs: Vec<EvmLog>,
        #[serde(with = "strict_bytes")]
        pub logs_bloom: Vec<u8>,
        pub empty: bool,
    }

    impl LogsEntry {
        pub fn new(height: ChainEpoch, logs: Vec<EvmLog>) -> Self {
            let logs_bloom = logs_bloom(&logs).as_bytes().to_vec();
            Self {
                height,
                empty: logs.is_empty(),
                logs,
                logs_bloom,
            }
        }

        /// The recorded bloom, or `None` if it is not a well-formed 256-byte bloom.
        pub fn bloom(&self) -> Option<Bloom> {
            (self.logs_bloom.len() == Bloom::len_bytes()).then(|| Bloom::from_slice(&self.logs_bloom))
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct GetStorageParams {
        pub address: Address,
        #[serde(with = "strict_bytes")]
        pub position: Vec<u8>,
        #[serde(with = "strict_bytes")]
        pub root: Vec<u8>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct GetStorageReturn {
        #[serde(with = "strict_bytes")]
        pub value: Vec<u8>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
    pub struct GetCodeReturn {
        #[serde(with = "strict_bytes")]
        pub code: Vec<u8>,
    }

    /// Bloom over every emitting address and topic of `logs`.
    pub fn logs_bloom(logs: &[EvmLog]) -> Bloom {
        let mut bloom = Bloom::zero();
        for log in logs {
            bloom.accrue(BloomInput::Raw(&log.address));
            for topic in &log.topics {
                bloom.accrue(BloomInput::Raw(&topic.0));
            }
        }
        bloom
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn bloom_contains_accrued_members() {
            let log = EvmLog {
                address: vec![0xaa; 20],
                topics: vec![LogTopic(vec![0x01; 32])],
                ..Default::default()
            };
            let bloom = logs_bloom(std::slice::from_ref(&log));
            assert!(bloom.contains_input(BloomInput::Raw(&[0xaa; 20])));
            assert!(bloom.contains_input(BloomInput::Raw(&[0x01; 32])));
            assert!(!bloom.contains_input(BloomInput::Raw(&[0xbb; 20])));
        }

        #[test]
        fn malformed_bloom_is_ignored() {
            let entry = LogsEntry {
                logs_bloom: vec![0; 3],
                ..Default::default()
            };
            assert!(entry.bloom().is_none());
            assert!(LogsEntry::new(1, vec![]).bloom().is_some());
        }

        #[test]
        fn create_and_call_envelopes_do_not_alias() {
            let created = super::super::init::ExecReturn {
                id_address: Address::new_id(1001),
                robust_address: Address::new_id(1001),
            };
            let bytes = fvm_ipld_encoding::to_vec(&created).unwrap();
            assert!(fvm_ipld_encoding::from_slice::<ContractResult>(&bytes).is_err());

            let result = ContractResult::default();
            let bytes = fvm_ipld_encoding::to_vec(&result).unwrap();
            assert!(fvm_ipld_encoding::from_slice::<super::super::init::ExecReturn>(&bytes).is_err());
        }
    }
}
