// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::rpc::eth::quantity::{HexString, format_bytes};
use crate::rpc::{Ctx, RpcMethod, ServerError};

macro_rules! for_each_method {
    ($callback:ident) => {
        $callback!(crate::rpc::web3::Web3ClientVersion);
        $callback!(crate::rpc::web3::Web3Sha3);
    };
}
pub(crate) use for_each_method;

pub enum Web3ClientVersion {}
impl RpcMethod<0> for Web3ClientVersion {
    const NAME: &'static str = "web3_clientVersion";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = String;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx.node.client_version())
    }
}

/// Keccak-256 of the hex-decoded input.
pub enum Web3Sha3 {}
impl RpcMethod<1> for Web3Sha3 {
    const NAME: &'static str = "web3_sha3";
    const PARAM_NAMES: [&'static str; 1] = ["data"];
    type Params = (HexString,);
    type Ok = String;

    async fn handle(_: Ctx, (data,): Self::Params) -> Result<Self::Ok, ServerError> {
        let digest = keccak_hash::keccak(data.to_bytes()?);
        Ok(format_bytes(digest.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_net;
    use rstest::rstest;

    #[rstest]
    #[case("0x", "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")]
    #[case(
        "0x68656c6c6f20776f726c64",
        "0x47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad"
    )]
    #[tokio::test]
    async fn sha3(#[case] input: &str, #[case] expected: &str) {
        let net = test_net().await;
        let digest = Web3Sha3::handle(net.state.clone(), (input.into(),))
            .await
            .unwrap();
        assert_eq!(digest, expected);
    }

    #[tokio::test]
    async fn sha3_rejects_bare_text() {
        let net = test_net().await;
        assert!(
            Web3Sha3::handle(net.state.clone(), ("hello".into(),))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn client_version_names_the_crate() {
        let net = test_net().await;
        let version = Web3ClientVersion::handle(net.state.clone(), ())
            .await
            .unwrap();
        assert!(version.starts_with("forest-web3/"));
    }
}
