// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use fvm_ipld_encoding::RawBytes;
use fvm_ipld_encoding::tuple::*;

use crate::shim::error::ExitCode;

/// Result of applying a message, as recorded on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct Receipt {
    pub exit_code: ExitCode,
    pub return_data: RawBytes,
    pub gas_used: u64,
}

impl Default for Receipt {
    fn default() -> Self {
        Self {
            exit_code: ExitCode::OK,
            return_data: RawBytes::default(),
            gas_used: 0,
        }
    }
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.exit_code.is_success()
    }
}
