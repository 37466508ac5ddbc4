// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::rpc::eth::types::Uint64;
use crate::rpc::{Ctx, RpcMethod, ServerError};

macro_rules! for_each_method {
    ($callback:ident) => {
        $callback!(crate::rpc::net::NetVersion);
        $callback!(crate::rpc::net::NetListening);
        $callback!(crate::rpc::net::NetPeerCount);
    };
}
pub(crate) use for_each_method;

/// The chain ID, in decimal.
pub enum NetVersion {}
impl RpcMethod<0> for NetVersion {
    const NAME: &'static str = "net_version";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = String;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx.node.chain_id().to_string())
    }
}

pub enum NetListening {}
impl RpcMethod<0> for NetListening {
    const NAME: &'static str = "net_listening";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = bool;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx.node.listening())
    }
}

pub enum NetPeerCount {}
impl RpcMethod<0> for NetPeerCount {
    const NAME: &'static str = "net_peerCount";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Uint64;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        let peers = ctx.node.peer_count().await?;
        Ok(Uint64(peers as u64))
    }
}
