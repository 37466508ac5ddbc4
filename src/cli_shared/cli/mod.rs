// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

pub use self::config::*;

/// Environment variable pointing at a configuration file, used when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "FOREST_WEB3_CONFIG_PATH";

/// CLI options
#[derive(Default, Debug, Parser)]
pub struct CliOpts {
    /// A TOML file containing relevant configurations
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address the JSON-RPC server binds to
    #[arg(long)]
    pub rpc_address: Option<SocketAddr>,
    /// Address the Prometheus endpoint binds to
    #[arg(long)]
    pub metrics_address: Option<SocketAddr>,
    /// Seconds between devnet blocks, `0` disables automatic mining
    #[arg(long)]
    pub block_time: Option<u64>,
    /// Print the effective configuration and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl CliOpts {
    /// Loads the configuration file, if any, and applies the command line overrides on top.
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let path = self
            .config
            .clone()
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        let mut config = super::read_config(path.as_ref())?;
        if let Some(address) = self.rpc_address {
            config.rpc.address = address;
        }
        if let Some(address) = self.metrics_address {
            config.rpc.metrics_address = Some(address);
        }
        if let Some(block_time) = self.block_time {
            config.devnet.block_time = block_time;
        }
        Ok(config)
    }
}
