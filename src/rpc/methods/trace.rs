// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Execution traces of the messages included in a range of heights.

use serde::{Deserialize, Serialize};

use crate::rpc::eth::check_height_range;
use crate::rpc::eth::errors::EthError;
use crate::rpc::eth::message::resolve_address;
use crate::rpc::eth::quantity::resolve_height;
use crate::rpc::eth::types::{EthBytes, Hash, Uint64};
use crate::rpc::{Ctx, RpcMethod, ServerError};
use crate::shim::address::Address;
use crate::shim::clock::ChainEpoch;
use crate::state_manager::InvocResult;

macro_rules! for_each_method {
    ($callback:ident) => {
        $callback!(crate::rpc::trace::TraceFilter);
    };
}
pub(crate) use for_each_method;

/// Criteria of a `trace_filter` request. Unset bounds default to the head, empty address
/// lists match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceFilterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<String>,
    pub from_address: Vec<String>,
    pub to_address: Vec<String>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub gas_used: Uint64,
    pub output: EthBytes,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    pub block_number: ChainEpoch,
    pub transaction_hash: Option<Hash>,
    pub transaction_position: usize,
    pub from: String,
    pub to: String,
    pub subtraces: usize,
    /// `None` when the message failed, see `error`.
    pub result: Option<TraceResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceEntry {
    fn new(res: &InvocResult, height: ChainEpoch, position: usize) -> Self {
        let succeeded =
            res.error.is_empty() && res.msg_rct.as_ref().is_some_and(|r| r.is_success());
        let result = succeeded.then(|| TraceResult {
            gas_used: Uint64(res.msg_rct.as_ref().map(|r| r.gas_used).unwrap_or_default()),
            output: EthBytes(res.return_data().to_vec()),
        });
        let error = (!succeeded).then(|| match (&res.error, &res.msg_rct) {
            (error, _) if !error.is_empty() => error.clone(),
            (_, Some(rct)) => format!("exit code {}", rct.exit_code),
            _ => "no receipt".into(),
        });
        Self {
            block_number: height,
            transaction_hash: res.msg_cid.map(Hash::from),
            transaction_position: position,
            from: res.msg.from.to_string(),
            to: res.msg.to.to_string(),
            subtraces: 0,
            result,
            error,
        }
    }
}

fn parse_addresses(addresses: &[String]) -> Result<Vec<Address>, EthError> {
    addresses.iter().map(|a| resolve_address(a)).collect()
}

fn matches(wanted: &[Address], addr: &Address) -> bool {
    wanted.is_empty() || wanted.contains(addr)
}

pub enum TraceFilter {}
impl RpcMethod<1> for TraceFilter {
    const NAME: &'static str = "trace_filter";
    const PARAM_NAMES: [&'static str; 1] = ["filter"];
    type Params = (TraceFilterSpec,);
    type Ok = Vec<TraceEntry>;

    async fn handle(ctx: Ctx, (spec,): Self::Params) -> Result<Self::Ok, ServerError> {
        let head = ctx.chain.heaviest_tipset().await?.epoch();
        let from = resolve_height(spec.from_block.as_deref().unwrap_or_default(), head)?;
        let to = resolve_height(spec.to_block.as_deref().unwrap_or_default(), head)?;
        check_height_range(from, to, ctx.filters.config().max_filter_height_range)?;
        let senders = parse_addresses(&spec.from_address)?;
        let recipients = parse_addresses(&spec.to_address)?;

        let mut traces = vec![];
        for height in from..=to {
            let tipset = ctx.chain.tipset_by_height(height).await?;
            let results = ctx.state.replay(tipset.key()).await?;
            traces.extend(
                results
                    .iter()
                    .enumerate()
                    .filter(|(_, res)| {
                        matches(&senders, &res.msg.from) && matches(&recipients, &res.msg.to)
                    })
                    .map(|(i, res)| TraceEntry::new(res, height, i)),
            );
        }
        Ok(traces)
    }
}
