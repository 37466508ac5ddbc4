// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod main;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use jsonrpsee::server::ServerHandle;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cli_shared::cli::Config;
use crate::devnet::Devnet;
use crate::rpc::{RPCState, start_rpc};

/// A running node: the devnet, the RPC server and the background tasks feeding them.
pub struct Node {
    pub devnet: Arc<Devnet>,
    pub rpc_address: SocketAddr,
    handle: ServerHandle,
    services: JoinSet<anyhow::Result<()>>,
}

impl Node {
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.handle.stop()?;
        self.handle.stopped().await;
        self.services.shutdown().await;
        Ok(())
    }
}

/// Builds the devnet, installs the filter registry and starts every server in `config`.
pub async fn start(config: Config) -> anyhow::Result<Node> {
    let devnet = Arc::new(Devnet::new(config.devnet.clone())?);
    info!(
        "devnet ready with {} funded account(s), chain id {}",
        devnet.accounts().len(),
        crate::devnet::CHAIN_ID
    );

    let mut services = JoinSet::new();
    if let Some(miner) = devnet.spawn_miner() {
        services.spawn(async move { Ok(miner.await?) });
    }

    let state = Arc::new(RPCState::new(devnet.services(), config.filters.clone()));
    let sweeper = state.filters.spawn_sweeper();
    services.spawn(async move { Ok(sweeper.await?) });

    if let Some(address) = config.rpc.metrics_address {
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("could not bind the metrics endpoint to {address}"))?;
        services.spawn(crate::metrics::init_prometheus(listener));
    }

    let (rpc_address, handle) = start_rpc(state, &config.rpc).await?;
    Ok(Node {
        devnet,
        rpc_address,
        handle,
        services,
    })
}

/// Runs until Ctrl-C, then shuts the servers down.
pub async fn start_interruptable(config: Config) -> anyhow::Result<()> {
    let node = start(config).await?;
    info!("JSON-RPC server listening on {}", node.rpc_address);
    for account in node.devnet.accounts() {
        info!("funded account {account}");
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {e}");
    }
    info!("Shutting down");
    node.stop().await
}
