// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use tracing_subscriber::{EnvFilter, Registry, prelude::*};

use crate::cli_shared::cli::LogConfig;

/// Installs the global subscriber: one console layer, human readable or JSON.
pub fn setup_logger(config: &LogConfig) -> anyhow::Result<()> {
    let filter = get_env_filter(default_env_filter(config)?);
    let layer: Box<dyn tracing_subscriber::layer::Layer<Registry> + Send + Sync> = if config.json
    {
        Box::new(
            tracing_subscriber::fmt::Layer::new()
                .json()
                .with_filter(filter),
        )
    } else {
        Box::new(tracing_subscriber::fmt::Layer::new().with_filter(filter))
    };
    tracing_subscriber::registry().with(layer).try_init()?;
    Ok(())
}

/// Returns an [`EnvFilter`] according to the `RUST_LOG` environment variable, or a default
/// - see [`default_env_filter`]
///
/// Note that [`tracing_subscriber::filter::Builder`] only allows a single default directive,
/// whereas we want to provide multiple.
fn get_env_filter(def: EnvFilter) -> EnvFilter {
    use std::env::{
        self,
        VarError::{NotPresent, NotUnicode},
    };
    match env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV) {
        Ok(s) => EnvFilter::new(s),
        Err(NotPresent) => def,
        Err(NotUnicode(_)) => EnvFilter::default(),
    }
}

fn default_env_filter(config: &LogConfig) -> anyhow::Result<EnvFilter> {
    let configured = config.to_filter_string();
    let directives = if configured.is_empty() {
        "info".to_string()
    } else {
        format!("info,{configured}")
    };
    Ok(EnvFilter::try_new(directives)?)
}
