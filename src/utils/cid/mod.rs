// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use fvm_ipld_encoding::{DAG_CBOR, Error};
use multihash_codetable::{Code, MultihashDigest};

/// Extension methods for constructing `dag-cbor` [`Cid`]s.
pub trait CidCborExt {
    /// Content identifier of a CBOR-encoded object, hashed with 256 bit BLAKE2b.
    ///
    /// Blocks, messages and tipset keys are all addressed this way, which is also what lets
    /// a 32-byte hash be mapped back to a [`Cid`] (see [`CidCborExt::from_blake2b256_digest`]).
    fn from_cbor_blake2b256<S: serde::ser::Serialize>(obj: &S) -> Result<Cid, Error> {
        let bytes = fvm_ipld_encoding::to_vec(obj)?;
        Ok(Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(&bytes)))
    }

    /// Rebuilds a `dag-cbor` BLAKE2b-256 [`Cid`] from its raw digest.
    fn from_blake2b256_digest(digest: &[u8]) -> anyhow::Result<Cid> {
        let mh = Code::Blake2b256.wrap(digest)?;
        Ok(Cid::new_v1(DAG_CBOR, mh))
    }
}

impl CidCborExt for Cid {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_round_trip() {
        let cid = Cid::from_cbor_blake2b256(&("forest", 42u64)).unwrap();
        let rebuilt = Cid::from_blake2b256_digest(cid.hash().digest()).unwrap();
        assert_eq!(cid, rebuilt);
    }
}
