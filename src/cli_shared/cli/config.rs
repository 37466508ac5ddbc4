// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::devnet::DevnetConfig;
use crate::rpc::methods::eth::filter::FilterConfig;

/// Port Ethereum tooling expects a node on.
pub const DEFAULT_RPC_PORT: u16 = 8545;

#[derive(
    Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone, Copy, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone)]
pub struct LogValue {
    pub module: String,
    pub level: LogLevel,
}

impl LogValue {
    pub fn new(module: &str, level: LogLevel) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub filters: Vec<LogValue>,
    /// Emit one JSON object per event instead of human readable lines.
    pub json: bool,
}

impl LogConfig {
    pub(in crate::cli_shared) fn to_filter_string(&self) -> String {
        self.filters
            .iter()
            .map(|f| format!("{}={}", f.module, f.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filters: vec![
                LogValue::new("axum", LogLevel::Warn),
                LogValue::new("hyper", LogLevel::Warn),
                LogValue::new("jsonrpsee_server", LogLevel::Warn),
                LogValue::new("tower_http", LogLevel::Warn),
            ],
            json: false,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC bind, e.g. 127.0.0.1:8545
    pub address: SocketAddr,
    pub max_request_body_size: u32,
    pub max_response_body_size: u32,
    pub max_connections: u32,
    /// Metrics bind, e.g. 127.0.0.1:6116. Metrics are not served when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_address: Option<SocketAddr>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), DEFAULT_RPC_PORT),
            max_request_body_size: 10 * 1024 * 1024,
            max_response_body_size: 64 * 1024 * 1024,
            max_connections: 100,
            metrics_address: None,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Default, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcConfig,
    pub filters: FilterConfig,
    pub log: LogConfig,
    pub devnet: DevnetConfig,
}

impl Config {
    /// Reads a TOML configuration; sections and keys left out keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let toml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&toml)
    }

    pub fn from_toml(toml: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(toml).context("invalid configuration")?;
        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(self) -> Self {
        Self {
            filters: self.filters.with_env_overrides(),
            ..self
        }
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
