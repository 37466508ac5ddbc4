// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Turns a foreign call description into a native message.

use fvm_ipld_encoding::RawBytes;
use serde::{Deserialize, Serialize};

use super::errors::EthError;
use super::quantity::HexString;
use crate::blocks::TipsetKey;
use crate::shim::actors::{contract, init};
use crate::shim::address::{Address, parse_address};
use crate::shim::econ::TokenAmount;
use crate::shim::message::{METHOD_SEND, Message};
use crate::state_manager::ActorClassifier;

/// Call object of `eth_call`, `eth_estimateGas` and `eth_sendTransaction`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallRequest {
    pub from: String,
    /// Empty when deploying a contract.
    pub to: String,
    pub gas: HexString,
    pub gas_price: HexString,
    pub value: HexString,
    #[serde(alias = "input")]
    pub data: HexString,
    pub nonce: HexString,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum CallShape {
    /// Plain value transfer.
    Transfer,
    /// Contract invocation.
    Invoke,
    /// Contract construction through the init actor.
    Create,
}

/// A native message together with the contract payload it was built from.
///
/// The payload is kept so the mutation flag can be changed without touching the original
/// message, see [`CallMessage::probe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallMessage {
    pub message: Message,
    pub shape: CallShape,
    payload: Option<contract::ContractParams>,
}

impl CallMessage {
    /// Whether executing the message persists contract state changes.
    pub fn mutating(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| p.commit)
    }

    /// Value handed over to the recipient, wherever the shape keeps it.
    pub fn value(&self) -> &TokenAmount {
        self.payload
            .as_ref()
            .map(|p| &p.value)
            .unwrap_or(&self.message.value)
    }

    /// Copy of this message with the mutation flag set to `mutating`.
    pub fn with_mutating(&self, mutating: bool) -> anyhow::Result<Self> {
        let mut copy = self.clone();
        if let Some(payload) = copy.payload.as_mut() {
            payload.commit = mutating;
            copy.message.params = encode_params(copy.shape, payload)?;
        }
        Ok(copy)
    }

    /// Copy of this message that never persists anything, for simulation and estimation.
    pub fn probe(&self) -> anyhow::Result<Self> {
        self.with_mutating(false)
    }
}

fn encode_params(
    shape: CallShape,
    payload: &contract::ContractParams,
) -> anyhow::Result<RawBytes> {
    let params = RawBytes::serialize(payload)?;
    Ok(match shape {
        CallShape::Create => RawBytes::serialize(init::ExecParams {
            code_cid: *contract::CODE_ID,
            constructor_params: params,
        })?,
        _ => params,
    })
}

/// Parses a native or 20-byte `0x` address.
pub fn resolve_address(s: &str) -> Result<Address, EthError> {
    parse_address(s).map_err(|_| EthError::InvalidAddress(s.to_owned()))
}

fn gas_units(hex: &HexString) -> Result<u64, EthError> {
    u64::try_from(hex.to_int()?).map_err(|_| EthError::MalformedQuantity(hex.to_string()))
}

/// Builds the native message for `request`.
///
/// Data sent to a contract (or to the init actor) becomes a contract invocation carrying
/// `mutating` as its commit flag; anything else is a plain transfer.
pub async fn build_message(
    classifier: &dyn ActorClassifier,
    request: &CallRequest,
    tipset: &TipsetKey,
    mutating: bool,
) -> Result<CallMessage, EthError> {
    let from = resolve_address(&request.from)?;
    let to = match request.to.trim() {
        "" => init::ADDRESS,
        to => resolve_address(to)?,
    };
    let gas_limit = gas_units(&request.gas)?;
    let gas_price = TokenAmount::from_atto(request.gas_price.to_big_int()?);
    let value = TokenAmount::from_atto(request.value.to_big_int()?);
    let sequence = gas_units(&request.nonce)?;
    let data = request.data.to_bytes()?;

    let shape = if data.is_empty() {
        CallShape::Transfer
    } else if to == init::ADDRESS {
        CallShape::Create
    } else if classifier.is_contract_address(&to, tipset).await? {
        CallShape::Invoke
    } else {
        CallShape::Transfer
    };

    if shape == CallShape::Transfer {
        return Ok(CallMessage {
            message: Message {
                from,
                to,
                sequence,
                value,
                method_num: METHOD_SEND,
                gas_limit,
                gas_fee_cap: gas_price.clone(),
                gas_premium: gas_price,
                ..Default::default()
            },
            shape,
            payload: None,
        });
    }

    let payload = contract::ContractParams {
        code: data,
        value,
        commit: mutating,
    };
    let method_num = match shape {
        CallShape::Create => init::Method::Exec.into(),
        _ => contract::Method::CallContract.into(),
    };
    Ok(CallMessage {
        message: Message {
            from,
            to,
            sequence,
            method_num,
            params: encode_params(shape, &payload)?,
            gas_limit,
            gas_fee_cap: gas_price.clone(),
            gas_premium: gas_price,
            ..Default::default()
        },
        shape,
        payload: Some(payload),
    })
}
