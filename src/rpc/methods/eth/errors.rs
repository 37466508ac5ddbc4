// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::rpc::error::ServerError;
use crate::shim::econ::TokenAmount;
use crate::shim::error::ExitCode;
use thiserror::Error;

/// This error indicates that the execution reverted while executing the message.
/// Code is taken from https://github.com/filecoin-project/lotus/blob/release/v1.32.1/api/api_errors.go#L27
pub const EXECUTION_REVERTED_CODE: i32 = 11;

#[derive(Debug, Error)]
pub enum EthError {
    #[error("malformed quantity {0:?}")]
    MalformedQuantity(String),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("invalid hash {0:?}")]
    InvalidHash(String),
    #[error("{0} is not a contract")]
    NotAContract(String),
    #[error("chain lookup failed: {0:#}")]
    ChainLookupFailed(#[from] anyhow::Error),
    #[error("filter {0} not found")]
    FilterNotFound(String),
    #[error("too many filters, at most {0} may be installed")]
    TooManyFilters(usize),
    #[error("block range of {requested} heights exceeds the limit of {limit}")]
    BlockRangeExceeded { requested: i64, limit: i64 },
    #[error("{message}")]
    SimulationReverted { message: String, data: Vec<u8> },
    #[error("insufficient balance: {balance} available, {required} required")]
    InsufficientBalance {
        balance: TokenAmount,
        required: TokenAmount,
    },
    #[error("gas premium {premium} exceeds the fee cap {fee_cap}")]
    GasOverpriced {
        premium: TokenAmount,
        fee_cap: TokenAmount,
    },
    #[error("index {index} out of range, only {len} available")]
    IndexOutOfRange { index: u64, len: usize },
}

impl EthError {
    /// Wraps a failed invocation, keeping whatever the VM returned as revert data.
    pub fn execution_reverted(exit_code: Option<ExitCode>, error: &str, data: &[u8]) -> Self {
        let message = match exit_code {
            Some(code) => format!("message execution failed (exit=[{code}], vm error=[{error}])"),
            None => format!("message execution failed (vm error=[{error}])"),
        };
        Self::SimulationReverted {
            message,
            data: data.to_vec(),
        }
    }

    fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::MalformedQuantity(_)
                | Self::InvalidAddress(_)
                | Self::InvalidHash(_)
                | Self::NotAContract(_)
                | Self::IndexOutOfRange { .. }
                | Self::BlockRangeExceeded { .. }
        )
    }
}

impl From<EthError> for ServerError {
    fn from(e: EthError) -> Self {
        match &e {
            EthError::SimulationReverted { data, .. } => {
                let data = (!data.is_empty())
                    .then(|| serde_json::Value::String(format!("0x{}", hex::encode(data))));
                ServerError::new(EXECUTION_REVERTED_CODE, e, data)
            }
            _ if e.is_invalid_input() => ServerError::invalid_params(e, None),
            _ => ServerError::internal_error(e, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::error::ErrorCode;

    #[test]
    fn input_errors_are_invalid_params() {
        let err: ServerError = EthError::MalformedQuantity("abc".into()).into();
        assert_eq!(err.known_code(), ErrorCode::InvalidParams);
        let err: ServerError = EthError::IndexOutOfRange { index: 3, len: 1 }.into();
        assert_eq!(err.known_code(), ErrorCode::InvalidParams);
    }

    #[test]
    fn lookup_failures_are_internal() {
        let err: ServerError = EthError::from(anyhow::anyhow!("no tipset")).into();
        assert_eq!(err.known_code(), ErrorCode::InternalError);
        assert!(err.message().contains("no tipset"));
    }

    #[test]
    fn reverts_carry_hex_data() {
        let err: ServerError = EthError::execution_reverted(None, "boom", &[0xde, 0xad]).into();
        assert_eq!(err.code(), EXECUTION_REVERTED_CODE);
        assert_eq!(err.data().map(|d| d.get()), Some("\"0xdead\""));

        let err: ServerError = EthError::execution_reverted(None, "boom", &[]).into();
        assert!(err.data().is_none());
    }
}
