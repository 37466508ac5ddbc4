// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod cli;
pub mod logger;

use std::path::PathBuf;

use tracing::info;

use crate::cli_shared::cli::Config;

/// Reads the configuration at `config_path_opt`, or the defaults when no path is given.
/// Environment overrides are applied either way.
pub fn read_config(config_path_opt: Option<&PathBuf>) -> anyhow::Result<Config> {
    match config_path_opt {
        Some(path) => {
            let config = Config::from_file(path)?;
            info!("Config loaded from {}", path.display());
            Ok(config)
        }
        None => Ok(Config::default().with_env_overrides()),
    }
}
