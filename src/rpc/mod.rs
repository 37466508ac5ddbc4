// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod error;
mod log_layer;
mod metrics_layer;
mod reflect;

pub use error::ServerError;
pub use reflect::{Ctx, RpcMethod, RpcMethodExt};

/// All the methods live in their own folder
///
/// # Handling types
/// - Types only used by one namespace live next to its methods, e.g.
///   `src/rpc/methods/eth/types.rs`.
/// - Every method is a type implementing [`RpcMethod`], listed in its namespace's
///   `for_each_method!` so that [`create_module`] picks it up.
pub mod methods {
    pub mod eth;
    pub mod net;
    pub mod trace;
    pub mod web3;
}
pub use methods::*;

use std::net::SocketAddr;
use std::sync::Arc;

use jsonrpsee::RpcModule;
use jsonrpsee::server::middleware::rpc::RpcServiceBuilder;
use jsonrpsee::server::{Server, ServerConfig, ServerHandle};
use tracing::info;

use crate::chain::ChainReader;
use crate::cli_shared::cli::RpcConfig;
use crate::contracts::ContractStore;
use crate::message_pool::MessagePool;
use crate::node::NodeInfo;
use crate::rpc::log_layer::LogLayer;
use crate::rpc::metrics_layer::MetricsLayer;
use crate::rpc::methods::eth::filter::bridge::ChainEventSource;
use crate::rpc::methods::eth::filter::{FilterConfig, FilterRegistry};
use crate::state_manager::{ActorClassifier, GasEstimator, StateCaller};
use crate::wallet::Wallet;

/// The node collaborators the RPC surface is served from.
#[derive(Clone)]
pub struct Services {
    pub chain: Arc<dyn ChainReader>,
    pub mpool: Arc<dyn MessagePool>,
    pub state: Arc<dyn StateCaller>,
    pub gas: Arc<dyn GasEstimator>,
    pub classifier: Arc<dyn ActorClassifier>,
    pub wallet: Arc<dyn Wallet>,
    pub contracts: Arc<dyn ContractStore>,
    pub node: Arc<dyn NodeInfo>,
}

/// This is where you store persistent data, or at least access to stateful
/// data.
pub struct RPCState {
    pub chain: Arc<dyn ChainReader>,
    pub mpool: Arc<dyn MessagePool>,
    pub state: Arc<dyn StateCaller>,
    pub gas: Arc<dyn GasEstimator>,
    pub classifier: Arc<dyn ActorClassifier>,
    pub wallet: Arc<dyn Wallet>,
    pub contracts: Arc<dyn ContractStore>,
    pub node: Arc<dyn NodeInfo>,
    pub filters: Arc<FilterRegistry>,
}

impl RPCState {
    /// Wires `services` together with a fresh filter registry fed by their notification
    /// streams.
    pub fn new(services: Services, filter_config: FilterConfig) -> Self {
        let Services {
            chain,
            mpool,
            state,
            gas,
            classifier,
            wallet,
            contracts,
            node,
        } = services;
        let source = ChainEventSource {
            chain: chain.clone(),
            mpool: mpool.clone(),
            contracts: contracts.clone(),
        };
        Self {
            chain,
            mpool,
            state,
            gas,
            classifier,
            wallet,
            contracts,
            node,
            filters: Arc::new(FilterRegistry::new(Arc::new(source), filter_config)),
        }
    }
}

/// Binds the JSON-RPC server and starts serving. Stop it through the returned handle.
pub async fn start_rpc(
    state: Arc<RPCState>,
    config: &RpcConfig,
) -> anyhow::Result<(SocketAddr, ServerHandle)> {
    let module = create_module(state)?;

    let rpc_middleware = RpcServiceBuilder::new()
        .layer(LogLayer::default())
        .layer(MetricsLayer::default());
    let server_config = ServerConfig::builder()
        .max_request_body_size(config.max_request_body_size)
        .max_response_body_size(config.max_response_body_size)
        .max_connections(config.max_connections)
        .build();
    let server = Server::builder()
        .set_config(server_config)
        .set_rpc_middleware(rpc_middleware)
        .build(config.address)
        .await?;
    let addr = server.local_addr()?;
    let handle = server.start(module);
    info!("Ready for RPC connections at {addr}");
    Ok((addr, handle))
}

/// Registers every method of every namespace.
pub fn create_module(state: Arc<RPCState>) -> anyhow::Result<RpcModule<RPCState>> {
    let mut module = RpcModule::from_arc(state);
    macro_rules! register {
        ($ty:ty) => {
            <$ty>::register(&mut module)?;
        };
    }
    eth::for_each_method!(register);
    net::for_each_method!(register);
    trace::for_each_method!(register);
    web3::for_each_method!(register);
    Ok(module)
}

#[cfg(test)]
mod tests {
    use jsonrpsee::core::client::ClientT as _;
    use jsonrpsee::http_client::HttpClientBuilder;
    use jsonrpsee::rpc_params;

    use super::*;
    use crate::test_utils::test_net;

    #[tokio::test]
    async fn module_lists_every_namespace() {
        let net = test_net().await;
        let module = create_module(net.state.clone()).unwrap();
        let names = module.method_names().collect::<Vec<_>>();
        for name in [
            "eth_blockNumber",
            "eth_getLogs",
            "net_version",
            "web3_clientVersion",
            "trace_filter",
        ] {
            assert!(names.contains(&name), "{name} is not registered");
        }
    }

    #[tokio::test]
    async fn serves_over_http() {
        let net = test_net().await;
        let config = RpcConfig {
            address: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let (addr, handle) = start_rpc(net.state.clone(), &config).await.unwrap();
        let client = HttpClientBuilder::default()
            .build(format!("http://{addr}"))
            .unwrap();

        let chain_id: String = client
            .request("eth_chainId", rpc_params![])
            .await
            .unwrap();
        assert_eq!(chain_id, format!("{:#x}", crate::devnet::CHAIN_ID));

        let err = client
            .request::<String, _>("eth_getBalance", rpc_params!["not an address"])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid address"), "{err}");

        handle.stop().unwrap();
        handle.stopped().await;
    }
}
