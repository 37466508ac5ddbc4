// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::ffi::OsString;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tokio::runtime::Builder as RuntimeBuilder;
use tracing::info;

use crate::cli_shared::cli::CliOpts;
use crate::cli_shared::logger;

/// CLI structure generated when interacting with the forest-web3 binary
#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), author = env!("CARGO_PKG_AUTHORS"), version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[clap(flatten)]
    pub opts: CliOpts,
}

pub fn main<ArgT>(args: impl IntoIterator<Item = ArgT>) -> anyhow::Result<()>
where
    ArgT: Into<OsString> + Clone,
{
    let Cli { opts } = Cli::parse_from(args);
    let config = opts.to_config().context("Error parsing config")?;

    if opts.dump_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    logger::setup_logger(&config.log)?;

    let rt = RuntimeBuilder::new_multi_thread().enable_all().build()?;
    let ret = rt.block_on(super::start_interruptable(config));
    info!("Shutting down tokio...");
    rt.shutdown_timeout(Duration::from_secs_f32(0.5));
    info!("forest-web3 finished shutdown");
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_config_exits_early() {
        main(["forest-web3", "--dump-config", "--block-time", "0"]).unwrap();
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }
}
