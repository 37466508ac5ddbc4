// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

#![recursion_limit = "1024"]

mod blocks;
mod chain;
mod cli_shared;
mod contracts;
mod daemon;
mod devnet;
mod message;
mod message_pool;
mod metrics;
mod node;
mod rpc;
mod shim;
mod state_manager;
#[cfg(test)]
mod test_utils;
mod utils;
mod wallet;

pub use cli_shared::cli::Config;
pub use daemon::main::main as forest_web3_main;
