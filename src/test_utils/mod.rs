// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use crate::devnet::{Devnet, DevnetConfig};
use crate::rpc::RPCState;
use crate::rpc::methods::eth::filter::FilterConfig;
use crate::shim::address::Address;

/// A devnet that only mines when told to, with one funded account and one deployed contract.
pub struct TestNet {
    pub devnet: Arc<Devnet>,
    pub state: Arc<RPCState>,
    pub account: Address,
    pub contract: Address,
    /// Code the contract was deployed with.
    pub code: Vec<u8>,
}

pub async fn test_net() -> TestNet {
    test_net_with_filters(FilterConfig::default()).await
}

pub async fn test_net_with_filters(filters: FilterConfig) -> TestNet {
    let devnet = Arc::new(
        Devnet::new(DevnetConfig {
            block_time: 0,
            ..Default::default()
        })
        .unwrap(),
    );
    let code = vec![0x60, 0x80, 0x60, 0x40];
    let contract = devnet.deploy(code.clone());
    let account = devnet.accounts()[0];
    let state = Arc::new(RPCState::new(devnet.services(), filters));
    TestNet {
        devnet,
        state,
        account,
        contract,
        code,
    }
}
