// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod assemble;
pub mod errors;
pub mod execution;
pub mod filter;
pub mod message;
pub mod quantity;
pub mod types;

use std::str::FromStr as _;
use std::sync::Arc;

use anyhow::Context as _;
use cid::Cid;
use fvm_ipld_encoding::RawBytes;
use serde::de::DeserializeOwned;

use self::assemble::{
    BlockPosition, block_view, receipt_view, tipset_view, transaction_by_cid, transaction_view,
};
use self::errors::EthError;
use self::execution::{ExecutionOutput, commit, decode_contract_return, estimate_gas, simulate};
use self::filter::criteria::{FilterCriteria, FilterSpec, entry_logs};
use self::filter::{FilterId, FilterKind};
use self::message::{CallRequest, build_message, resolve_address};
use self::quantity::{HexString, Quantity, format_bytes, format_quantity};
use self::types::{
    Block, EthBigInt, EthLog, FilterChanges, Hash, Int64, SyncProgress, SyncingResult, Tx,
    TxReceipt, Uint64,
};
use crate::blocks::{BlockHeader, Tipset};
use crate::message::SignedMessage;
use crate::rpc::error::implementation_defined_errors::UNSUPPORTED_METHOD;
use crate::rpc::{Ctx, RPCState, RpcMethod, ServerError};
use crate::shim::actors::contract;
use crate::shim::address::Address;
use crate::shim::clock::ChainEpoch;
use crate::shim::message::Message;
use crate::wallet::sign_message;

macro_rules! for_each_method {
    ($callback:ident) => {
        $callback!(crate::rpc::eth::EthProtocolVersion);
        $callback!(crate::rpc::eth::EthSyncing);
        $callback!(crate::rpc::eth::EthCoinbase);
        $callback!(crate::rpc::eth::EthMining);
        $callback!(crate::rpc::eth::EthHashrate);
        $callback!(crate::rpc::eth::EthGasPrice);
        $callback!(crate::rpc::eth::EthAccounts);
        $callback!(crate::rpc::eth::EthBlockNumber);
        $callback!(crate::rpc::eth::EthChainId);
        $callback!(crate::rpc::eth::EthGetBalance);
        $callback!(crate::rpc::eth::EthGetStorageAt);
        $callback!(crate::rpc::eth::EthGetTransactionCount);
        $callback!(crate::rpc::eth::EthGetCode);
        $callback!(crate::rpc::eth::EthGetBlockByNumber);
        $callback!(crate::rpc::eth::EthGetBlockByHash);
        $callback!(crate::rpc::eth::EthGetBlockTransactionCountByHash);
        $callback!(crate::rpc::eth::EthGetBlockTransactionCountByNumber);
        $callback!(crate::rpc::eth::EthGetTransactionByHash);
        $callback!(crate::rpc::eth::EthGetTransactionByBlockHashAndIndex);
        $callback!(crate::rpc::eth::EthGetTransactionByBlockNumberAndIndex);
        $callback!(crate::rpc::eth::EthGetTransactionReceipt);
        $callback!(crate::rpc::eth::EthCall);
        $callback!(crate::rpc::eth::EthEstimateGas);
        $callback!(crate::rpc::eth::EthSendRawTransaction);
        $callback!(crate::rpc::eth::EthSendTransaction);
        $callback!(crate::rpc::eth::EthSign);
        $callback!(crate::rpc::eth::EthSignTransaction);
        $callback!(crate::rpc::eth::EthNewFilter);
        $callback!(crate::rpc::eth::EthNewBlockFilter);
        $callback!(crate::rpc::eth::EthNewPendingTransactionFilter);
        $callback!(crate::rpc::eth::EthUninstallFilter);
        $callback!(crate::rpc::eth::EthGetFilterChanges);
        $callback!(crate::rpc::eth::EthGetFilterLogs);
        $callback!(crate::rpc::eth::EthGetLogs);
        $callback!(crate::rpc::eth::EthGetTipsetByHeight);
        $callback!(crate::rpc::eth::EthGetCompilers);
        $callback!(crate::rpc::eth::EthCompileSolidity);
        $callback!(crate::rpc::eth::EthCompileLll);
        $callback!(crate::rpc::eth::EthCompileSerpent);
        $callback!(crate::rpc::eth::EthGetUncleByBlockHashAndIndex);
        $callback!(crate::rpc::eth::EthGetUncleByBlockNumberAndIndex);
        $callback!(crate::rpc::eth::EthGetUncleCountByBlockHash);
        $callback!(crate::rpc::eth::EthGetUncleCountByBlockNumber);
        $callback!(crate::rpc::eth::EthGetWork);
        $callback!(crate::rpc::eth::EthSubmitWork);
        $callback!(crate::rpc::eth::EthSubmitHashrate);
    };
}
pub(crate) use for_each_method;

const PROTOCOL_VERSION: i64 = 65;

/// Prefix of messages signed with `eth_sign`, followed by the decimal length of the data.
const SIGNED_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// The tipset a block tag or height resolves to.
async fn tipset_at(ctx: &RPCState, block: &Quantity) -> Result<Arc<Tipset>, EthError> {
    let head = ctx.chain.heaviest_tipset().await?;
    let height = block.resolve_height(head.epoch())?;
    if height == head.epoch() {
        return Ok(head);
    }
    Ok(ctx.chain.tipset_by_height(height).await?)
}

/// Accepts both the `0x` hash form of a CID and the CID string itself.
fn parse_cid(s: &str) -> Result<Cid, EthError> {
    let invalid = || EthError::InvalidHash(s.to_owned());
    if s.starts_with("0x") {
        Hash::from_str(s)
            .and_then(|hash| hash.to_cid())
            .map_err(|_| invalid())
    } else {
        Cid::try_from(s).map_err(|_| invalid())
    }
}

fn checked_index(index: &Quantity, len: usize) -> Result<usize, EthError> {
    let index = index.to_int()?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(EthError::IndexOutOfRange {
            index: u64::try_from(index).unwrap_or_default(),
            len,
        })
}

/// The `index`th block of `tipset`, the first one when no index is given.
fn nth_block<'a>(
    tipset: &'a Tipset,
    index: Option<&Quantity>,
) -> Result<&'a BlockHeader, EthError> {
    let headers = tipset.block_headers();
    let i = match index {
        Some(index) => checked_index(index, headers.len())?,
        None => 0,
    };
    headers.get(i).ok_or(EthError::IndexOutOfRange {
        index: i as u64,
        len: headers.len(),
    })
}

/// Looks a block up by CID and finds its place among the blocks of its height.
async fn block_position(ctx: &RPCState, cid: Cid) -> Result<BlockPosition, EthError> {
    let header = ctx.chain.block_header(&cid).await?;
    let tipset = ctx.chain.tipset_by_height(header.epoch).await?;
    let block_index = tipset
        .block_index(&cid)
        .with_context(|| format!("block {cid} is not on the chain at {}", header.epoch))?;
    Ok(BlockPosition {
        cid,
        height: header.epoch,
        block_index,
    })
}

async fn transaction_at(
    ctx: &RPCState,
    position: &BlockPosition,
    index: &Quantity,
) -> Result<Tx, EthError> {
    let messages = ctx.chain.block_messages(&position.cid).await?;
    let i = checked_index(index, messages.len())?;
    match (messages.get(i), messages.cids.get(i)) {
        (Some(msg), Some(cid)) => Ok(transaction_view(&msg, cid, position, i)),
        _ => Err(EthError::IndexOutOfRange {
            index: i as u64,
            len: messages.len(),
        }),
    }
}

/// The tipset `addr` is queried at, provided it holds a contract there.
async fn contract_tipset(
    ctx: &RPCState,
    addr: &Address,
    block: &Quantity,
) -> Result<Option<Arc<Tipset>>, EthError> {
    let tipset = tipset_at(ctx, block).await?;
    let is_contract = ctx
        .classifier
        .is_contract_address(addr, tipset.key())
        .await?;
    Ok(is_contract.then_some(tipset))
}

/// Sends a read-only getter to the contract at `addr` and decodes what it returns.
async fn query_contract<T: DeserializeOwned>(
    ctx: &RPCState,
    addr: Address,
    method: contract::Method,
    params: RawBytes,
    tipset: &Tipset,
) -> Result<T, EthError> {
    let msg = Message {
        from: addr,
        to: addr,
        method_num: method.into(),
        params,
        ..Default::default()
    };
    let res = ctx.state.call(&msg, tipset.key()).await?;
    let exit_code = res.msg_rct.as_ref().map(|r| r.exit_code);
    if !res.error.is_empty() || !exit_code.is_some_and(|code| code.is_success()) {
        return Err(EthError::execution_reverted(
            exit_code,
            &res.error,
            res.return_data(),
        ));
    }
    Ok(fvm_ipld_encoding::from_slice(res.return_data())
        .context("undecodable contract getter return")?)
}

/// Digest `eth_sign` signs: the prefixed data, hashed with keccak-256.
fn signed_message_digest(data: &[u8]) -> [u8; 32] {
    let mut payload = format!("{SIGNED_MESSAGE_PREFIX}{}", data.len()).into_bytes();
    payload.extend_from_slice(data);
    keccak_hash::keccak(payload).0
}

/// Rejects inclusive ranges spanning more than `limit` heights. An inverted range is empty.
pub(crate) fn check_height_range(
    from: ChainEpoch,
    to: ChainEpoch,
    limit: i64,
) -> Result<(), EthError> {
    let requested = to.saturating_sub(from).saturating_add(1).max(0);
    if requested > limit {
        return Err(EthError::BlockRangeExceeded { requested, limit });
    }
    Ok(())
}

async fn logs_in_range(
    ctx: &RPCState,
    from: ChainEpoch,
    to: ChainEpoch,
    criteria: &FilterCriteria,
) -> Result<Vec<EthLog>, EthError> {
    let mut logs = vec![];
    for height in from..=to {
        if let Some(entry) = ctx.contracts.height_logs(height).await? {
            logs.extend(entry_logs(&entry, criteria));
        }
    }
    Ok(logs)
}

pub enum EthProtocolVersion {}
impl RpcMethod<0> for EthProtocolVersion {
    const NAME: &'static str = "eth_protocolVersion";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = String;

    async fn handle(_: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(format_quantity(PROTOCOL_VERSION))
    }
}

pub enum EthSyncing {}
impl RpcMethod<0> for EthSyncing {
    const NAME: &'static str = "eth_syncing";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = SyncingResult;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        let status = ctx.node.sync_status().await?;
        if status.is_synced() {
            return Ok(SyncingResult::DoneSync(false));
        }
        Ok(SyncingResult::Syncing(SyncProgress {
            starting_block: Int64(status.starting_block),
            current_block: Int64(status.current_block),
            highest_block: Int64(status.highest_block),
        }))
    }
}

pub enum EthCoinbase {}
impl RpcMethod<0> for EthCoinbase {
    const NAME: &'static str = "eth_coinbase";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Option<String>;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        let address = ctx.wallet.default_address().await?;
        Ok(address.as_ref().map(ToString::to_string))
    }
}

pub enum EthMining {}
impl RpcMethod<0> for EthMining {
    const NAME: &'static str = "eth_mining";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = bool;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(!ctx.node.miners().await?.is_empty())
    }
}

pub enum EthHashrate {}
impl RpcMethod<0> for EthHashrate {
    const NAME: &'static str = "eth_hashrate";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Uint64;

    async fn handle(_: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(Uint64(0))
    }
}

pub enum EthGasPrice {}
impl RpcMethod<0> for EthGasPrice {
    const NAME: &'static str = "eth_gasPrice";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = EthBigInt;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        let head = ctx.chain.heaviest_tipset().await?;
        let premium = ctx
            .gas
            .estimate_gas_premium(0, &Address::new_id(0), 0, head.key())
            .await?;
        let msg = Message {
            gas_premium: premium,
            ..Default::default()
        };
        let fee_cap = ctx.gas.estimate_fee_cap(&msg, 0, head.key()).await?;
        Ok(EthBigInt::from(fee_cap))
    }
}

pub enum EthAccounts {}
impl RpcMethod<0> for EthAccounts {
    const NAME: &'static str = "eth_accounts";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Vec<String>;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        let addresses = ctx.wallet.list_addresses().await?;
        Ok(addresses.iter().map(ToString::to_string).collect())
    }
}

pub enum EthBlockNumber {}
impl RpcMethod<0> for EthBlockNumber {
    const NAME: &'static str = "eth_blockNumber";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Uint64;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        let head = ctx.chain.heaviest_tipset().await?;
        Ok(Uint64(u64::try_from(head.epoch()).unwrap_or_default()))
    }
}

pub enum EthChainId {}
impl RpcMethod<0> for EthChainId {
    const NAME: &'static str = "eth_chainId";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Uint64;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(Uint64(ctx.node.chain_id()))
    }
}

pub enum EthGetBalance {}
impl RpcMethod<2> for EthGetBalance {
    const NAME: &'static str = "eth_getBalance";
    const PARAM_NAMES: [&'static str; 2] = ["address", "block"];
    type Params = (String, Option<Quantity>);
    type Ok = EthBigInt;

    async fn handle(ctx: Ctx, (address, block): Self::Params) -> Result<Self::Ok, ServerError> {
        let addr = resolve_address(&address)?;
        let tipset = tipset_at(&ctx, &block.unwrap_or_default()).await?;
        let balance = ctx
            .chain
            .actor(&addr, tipset.key())
            .await?
            .map(|actor| actor.balance)
            .unwrap_or_default();
        Ok(EthBigInt::from(balance))
    }
}

pub enum EthGetStorageAt {}
impl RpcMethod<3> for EthGetStorageAt {
    const NAME: &'static str = "eth_getStorageAt";
    const PARAM_NAMES: [&'static str; 3] = ["address", "position", "block"];
    type Params = (String, HexString, Option<Quantity>);
    type Ok = String;

    async fn handle(
        ctx: Ctx,
        (address, position, block): Self::Params,
    ) -> Result<Self::Ok, ServerError> {
        let addr = resolve_address(&address)?;
        let Some(tipset) = contract_tipset(&ctx, &addr, &block.unwrap_or_default()).await? else {
            return Err(EthError::NotAContract(address).into());
        };
        let params = contract::GetStorageParams {
            address: addr,
            position: position.to_bytes()?,
            root: ctx.contracts.state_root(tipset.epoch()).await?,
        };
        let ret: contract::GetStorageReturn = query_contract(
            &ctx,
            addr,
            contract::Method::GetStorageAt,
            RawBytes::serialize(params)?,
            &tipset,
        )
        .await?;
        Ok(format_bytes(&ret.value))
    }
}

pub enum EthGetTransactionCount {}
impl RpcMethod<2> for EthGetTransactionCount {
    const NAME: &'static str = "eth_getTransactionCount";
    const PARAM_NAMES: [&'static str; 2] = ["address", "block"];
    type Params = (String, Option<Quantity>);
    type Ok = Uint64;

    async fn handle(ctx: Ctx, (address, block): Self::Params) -> Result<Self::Ok, ServerError> {
        let addr = resolve_address(&address)?;
        let tipset = tipset_at(&ctx, &block.unwrap_or_default()).await?;
        let sequence = ctx
            .chain
            .actor(&addr, tipset.key())
            .await?
            .map(|actor| actor.sequence)
            .unwrap_or_default();
        Ok(Uint64(sequence))
    }
}

pub enum EthGetCode {}
impl RpcMethod<2> for EthGetCode {
    const NAME: &'static str = "eth_getCode";
    const PARAM_NAMES: [&'static str; 2] = ["address", "block"];
    type Params = (String, Option<Quantity>);
    type Ok = String;

    async fn handle(ctx: Ctx, (address, block): Self::Params) -> Result<Self::Ok, ServerError> {
        let addr = resolve_address(&address)?;
        let Some(tipset) = contract_tipset(&ctx, &addr, &block.unwrap_or_default()).await? else {
            return Ok(format_bytes(&[]));
        };
        let ret: contract::GetCodeReturn = query_contract(
            &ctx,
            addr,
            contract::Method::GetCode,
            RawBytes::default(),
            &tipset,
        )
        .await?;
        Ok(format_bytes(&ret.code))
    }
}

pub enum EthGetBlockByNumber {}
impl RpcMethod<3> for EthGetBlockByNumber {
    const NAME: &'static str = "eth_getBlockByNumber";
    const PARAM_NAMES: [&'static str; 3] = ["block", "fullTransactions", "blockIndex"];
    type Params = (Quantity, Option<bool>, Option<Quantity>);
    type Ok = Block;

    async fn handle(
        ctx: Ctx,
        (block, full, index): Self::Params,
    ) -> Result<Self::Ok, ServerError> {
        let tipset = tipset_at(&ctx, &block).await?;
        let header = nth_block(&tipset, index.as_ref())?;
        Ok(block_view(&ctx, &tipset, header, full.unwrap_or_default()).await?)
    }
}

pub enum EthGetBlockByHash {}
impl RpcMethod<2> for EthGetBlockByHash {
    const NAME: &'static str = "eth_getBlockByHash";
    const PARAM_NAMES: [&'static str; 2] = ["blockHash", "fullTransactions"];
    type Params = (String, Option<bool>);
    type Ok = Block;

    async fn handle(ctx: Ctx, (block_hash, full): Self::Params) -> Result<Self::Ok, ServerError> {
        let cid = parse_cid(&block_hash)?;
        let position = block_position(&ctx, cid).await?;
        let tipset = ctx.chain.tipset_by_height(position.height).await?;
        let header = ctx.chain.block_header(&cid).await?;
        Ok(block_view(&ctx, &tipset, &header, full.unwrap_or_default()).await?)
    }
}

pub enum EthGetBlockTransactionCountByHash {}
impl RpcMethod<1> for EthGetBlockTransactionCountByHash {
    const NAME: &'static str = "eth_getBlockTransactionCountByHash";
    const PARAM_NAMES: [&'static str; 1] = ["blockHash"];
    type Params = (String,);
    type Ok = Uint64;

    async fn handle(ctx: Ctx, (block_hash,): Self::Params) -> Result<Self::Ok, ServerError> {
        let cid = parse_cid(&block_hash)?;
        let messages = ctx.chain.block_messages(&cid).await?;
        Ok(Uint64(messages.len() as u64))
    }
}

pub enum EthGetBlockTransactionCountByNumber {}
impl RpcMethod<2> for EthGetBlockTransactionCountByNumber {
    const NAME: &'static str = "eth_getBlockTransactionCountByNumber";
    const PARAM_NAMES: [&'static str; 2] = ["block", "blockIndex"];
    type Params = (Quantity, Option<Quantity>);
    type Ok = Uint64;

    async fn handle(ctx: Ctx, (block, index): Self::Params) -> Result<Self::Ok, ServerError> {
        let tipset = tipset_at(&ctx, &block).await?;
        let header = nth_block(&tipset, index.as_ref())?;
        let messages = ctx.chain.block_messages(&header.cid()?).await?;
        Ok(Uint64(messages.len() as u64))
    }
}

pub enum EthGetTransactionByHash {}
impl RpcMethod<1> for EthGetTransactionByHash {
    const NAME: &'static str = "eth_getTransactionByHash";
    const PARAM_NAMES: [&'static str; 1] = ["txHash"];
    type Params = (String,);
    type Ok = Option<Tx>;

    async fn handle(ctx: Ctx, (tx_hash,): Self::Params) -> Result<Self::Ok, ServerError> {
        let cid = parse_cid(&tx_hash)?;
        Ok(transaction_by_cid(&ctx, &cid).await?)
    }
}

pub enum EthGetTransactionByBlockHashAndIndex {}
impl RpcMethod<2> for EthGetTransactionByBlockHashAndIndex {
    const NAME: &'static str = "eth_getTransactionByBlockHashAndIndex";
    const PARAM_NAMES: [&'static str; 2] = ["blockHash", "index"];
    type Params = (String, Quantity);
    type Ok = Tx;

    async fn handle(ctx: Ctx, (block_hash, index): Self::Params) -> Result<Self::Ok, ServerError> {
        let cid = parse_cid(&block_hash)?;
        let position = block_position(&ctx, cid).await?;
        Ok(transaction_at(&ctx, &position, &index).await?)
    }
}

pub enum EthGetTransactionByBlockNumberAndIndex {}
impl RpcMethod<3> for EthGetTransactionByBlockNumberAndIndex {
    const NAME: &'static str = "eth_getTransactionByBlockNumberAndIndex";
    const PARAM_NAMES: [&'static str; 3] = ["block", "index", "blockIndex"];
    type Params = (Quantity, Quantity, Option<Quantity>);
    type Ok = Tx;

    async fn handle(
        ctx: Ctx,
        (block, index, block_index): Self::Params,
    ) -> Result<Self::Ok, ServerError> {
        let tipset = tipset_at(&ctx, &block).await?;
        let header = nth_block(&tipset, block_index.as_ref())?;
        let cid = header.cid()?;
        let position = BlockPosition {
            cid,
            height: header.epoch,
            block_index: tipset.block_index(&cid).unwrap_or_default(),
        };
        Ok(transaction_at(&ctx, &position, &index).await?)
    }
}

pub enum EthGetTransactionReceipt {}
impl RpcMethod<1> for EthGetTransactionReceipt {
    const NAME: &'static str = "eth_getTransactionReceipt";
    const PARAM_NAMES: [&'static str; 1] = ["txHash"];
    type Params = (String,);
    type Ok = Option<TxReceipt>;

    async fn handle(ctx: Ctx, (tx_hash,): Self::Params) -> Result<Self::Ok, ServerError> {
        let cid = parse_cid(&tx_hash)?;
        Ok(receipt_view(&ctx, &cid).await?)
    }
}

pub enum EthCall {}
impl RpcMethod<2> for EthCall {
    const NAME: &'static str = "eth_call";
    const PARAM_NAMES: [&'static str; 2] = ["tx", "block"];
    type Params = (CallRequest, Option<Quantity>);
    type Ok = String;

    async fn handle(ctx: Ctx, (request, block): Self::Params) -> Result<Self::Ok, ServerError> {
        let tipset = tipset_at(&ctx, &block.unwrap_or_default()).await?;
        let msg = build_message(ctx.classifier.as_ref(), &request, tipset.key(), false).await?;
        let res = simulate(&ctx, &msg, tipset.key()).await?;
        let value = match decode_contract_return(res.return_data()) {
            ExecutionOutput::Contract(result) => result.value,
            ExecutionOutput::Created(created) => created.robust_address.to_bytes(),
            ExecutionOutput::Plain => res.return_data().to_vec(),
        };
        Ok(format_bytes(&value))
    }
}

pub enum EthEstimateGas {}
impl RpcMethod<2> for EthEstimateGas {
    const NAME: &'static str = "eth_estimateGas";
    const PARAM_NAMES: [&'static str; 2] = ["tx", "block"];
    type Params = (CallRequest, Option<Quantity>);
    type Ok = Uint64;

    async fn handle(ctx: Ctx, (request, block): Self::Params) -> Result<Self::Ok, ServerError> {
        let tipset = tipset_at(&ctx, &block.unwrap_or_default()).await?;
        let msg = build_message(ctx.classifier.as_ref(), &request, tipset.key(), true).await?;
        Ok(Uint64(estimate_gas(&ctx, &msg, tipset.key()).await?))
    }
}

pub enum EthSendRawTransaction {}
impl RpcMethod<1> for EthSendRawTransaction {
    const NAME: &'static str = "eth_sendRawTransaction";
    const PARAM_NAMES: [&'static str; 1] = ["rawTx"];
    type Params = (HexString,);
    type Ok = Hash;

    async fn handle(ctx: Ctx, (raw_tx,): Self::Params) -> Result<Self::Ok, ServerError> {
        let bytes = raw_tx.to_bytes()?;
        let signed: SignedMessage = fvm_ipld_encoding::from_slice(&bytes).map_err(|e| {
            ServerError::invalid_params(format!("undecodable signed message: {e}"), None)
        })?;
        let cid = ctx.mpool.push(signed).await?;
        Ok(cid.into())
    }
}

pub enum EthSendTransaction {}
impl RpcMethod<1> for EthSendTransaction {
    const NAME: &'static str = "eth_sendTransaction";
    const PARAM_NAMES: [&'static str; 1] = ["tx"];
    type Params = (CallRequest,);
    type Ok = Hash;

    async fn handle(ctx: Ctx, (request,): Self::Params) -> Result<Self::Ok, ServerError> {
        let head = ctx.chain.heaviest_tipset().await?;
        let msg = build_message(ctx.classifier.as_ref(), &request, head.key(), true).await?;
        Ok(commit(&ctx, &msg).await?.into())
    }
}

pub enum EthSign {}
impl RpcMethod<2> for EthSign {
    const NAME: &'static str = "eth_sign";
    const PARAM_NAMES: [&'static str; 2] = ["address", "data"];
    type Params = (String, HexString);
    type Ok = String;

    async fn handle(ctx: Ctx, (address, data): Self::Params) -> Result<Self::Ok, ServerError> {
        let addr = resolve_address(&address)?;
        let digest = signed_message_digest(&data.to_bytes()?);
        let signature = ctx.wallet.sign(&addr, &digest).await?;
        Ok(format_bytes(signature.bytes()))
    }
}

pub enum EthSignTransaction {}
impl RpcMethod<1> for EthSignTransaction {
    const NAME: &'static str = "eth_signTransaction";
    const PARAM_NAMES: [&'static str; 1] = ["tx"];
    type Params = (CallRequest,);
    type Ok = String;

    async fn handle(ctx: Ctx, (request,): Self::Params) -> Result<Self::Ok, ServerError> {
        let head = ctx.chain.heaviest_tipset().await?;
        let msg = build_message(ctx.classifier.as_ref(), &request, head.key(), true).await?;
        let mut message = msg.message.clone();
        if message.gas_limit == 0 {
            message.gas_limit = estimate_gas(&ctx, &msg, head.key()).await?;
        }
        let signed = sign_message(ctx.wallet.as_ref(), message).await?;
        Ok(format_bytes(&fvm_ipld_encoding::to_vec(&signed)?))
    }
}

pub enum EthNewFilter {}
impl RpcMethod<1> for EthNewFilter {
    const NAME: &'static str = "eth_newFilter";
    const PARAM_NAMES: [&'static str; 1] = ["filter"];
    type Params = (FilterSpec,);
    type Ok = FilterId;

    async fn handle(ctx: Ctx, (spec,): Self::Params) -> Result<Self::Ok, ServerError> {
        let head = ctx.chain.heaviest_tipset().await?;
        let criteria = spec.into_criteria(head.epoch())?;
        Ok(ctx.filters.register(FilterKind::Logs, criteria)?)
    }
}

pub enum EthNewBlockFilter {}
impl RpcMethod<0> for EthNewBlockFilter {
    const NAME: &'static str = "eth_newBlockFilter";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = FilterId;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx
            .filters
            .register(FilterKind::Blocks, FilterCriteria::default())?)
    }
}

pub enum EthNewPendingTransactionFilter {}
impl RpcMethod<0> for EthNewPendingTransactionFilter {
    const NAME: &'static str = "eth_newPendingTransactionFilter";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = FilterId;

    async fn handle(ctx: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx
            .filters
            .register(FilterKind::PendingTransactions, FilterCriteria::default())?)
    }
}

pub enum EthUninstallFilter {}
impl RpcMethod<1> for EthUninstallFilter {
    const NAME: &'static str = "eth_uninstallFilter";
    const PARAM_NAMES: [&'static str; 1] = ["filterId"];
    type Params = (FilterId,);
    type Ok = bool;

    async fn handle(ctx: Ctx, (id,): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx.filters.unregister(&id))
    }
}

pub enum EthGetFilterChanges {}
impl RpcMethod<1> for EthGetFilterChanges {
    const NAME: &'static str = "eth_getFilterChanges";
    const PARAM_NAMES: [&'static str; 1] = ["filterId"];
    type Params = (FilterId,);
    type Ok = FilterChanges;

    async fn handle(ctx: Ctx, (id,): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx.filters.changes(&id)?)
    }
}

pub enum EthGetFilterLogs {}
impl RpcMethod<1> for EthGetFilterLogs {
    const NAME: &'static str = "eth_getFilterLogs";
    const PARAM_NAMES: [&'static str; 1] = ["filterId"];
    type Params = (FilterId,);
    type Ok = Vec<EthLog>;

    async fn handle(ctx: Ctx, (id,): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(ctx.filters.logs(&id)?)
    }
}

pub enum EthGetLogs {}
impl RpcMethod<1> for EthGetLogs {
    const NAME: &'static str = "eth_getLogs";
    const PARAM_NAMES: [&'static str; 1] = ["filter"];
    type Params = (FilterSpec,);
    type Ok = Vec<EthLog>;

    async fn handle(ctx: Ctx, (spec,): Self::Params) -> Result<Self::Ok, ServerError> {
        let head = ctx.chain.heaviest_tipset().await?.epoch();
        if let Some(hash) = &spec.block_hash {
            let cid = hash
                .to_cid()
                .map_err(|_| EthError::InvalidHash(hash.to_string()))?;
            let height = ctx.chain.block_header(&cid).await?.epoch;
            let criteria = spec.into_criteria(head)?;
            return Ok(logs_in_range(&ctx, height, height, &criteria).await?);
        }

        // no lower bound means the head
        let from_unset = spec.from_block.is_none();
        let criteria = spec.into_criteria(head)?;
        let from = if from_unset {
            head
        } else {
            criteria.from_block.unwrap_or_default().max(0)
        };
        let to = criteria.to_block.map_or(head, |to| to.clamp(0, head));
        check_height_range(from, to, ctx.filters.config().max_filter_height_range)?;
        Ok(logs_in_range(&ctx, from, to, &criteria).await?)
    }
}

pub enum EthGetTipsetByHeight {}
impl RpcMethod<1> for EthGetTipsetByHeight {
    const NAME: &'static str = "eth_getTipsetByHeight";
    const PARAM_NAMES: [&'static str; 1] = ["height"];
    type Params = (Quantity,);
    type Ok = Vec<Block>;

    async fn handle(ctx: Ctx, (height,): Self::Params) -> Result<Self::Ok, ServerError> {
        let tipset = tipset_at(&ctx, &height).await?;
        Ok(tipset_view(&ctx, &tipset, true).await?)
    }
}

pub enum EthGetCompilers {}
impl RpcMethod<0> for EthGetCompilers {
    const NAME: &'static str = "eth_getCompilers";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Vec<String>;

    async fn handle(_: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(vec!["none".into()])
    }
}

fn compiler_not_allowed() -> ServerError {
    ServerError::new(UNSUPPORTED_METHOD, "compiler not allowed", None)
}

pub enum EthCompileSolidity {}
impl RpcMethod<1> for EthCompileSolidity {
    const NAME: &'static str = "eth_compileSolidity";
    const PARAM_NAMES: [&'static str; 1] = ["source"];
    type Params = (String,);
    type Ok = String;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Err(compiler_not_allowed())
    }
}

pub enum EthCompileLll {}
impl RpcMethod<1> for EthCompileLll {
    const NAME: &'static str = "eth_compileLLL";
    const PARAM_NAMES: [&'static str; 1] = ["source"];
    type Params = (String,);
    type Ok = String;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Err(compiler_not_allowed())
    }
}

pub enum EthCompileSerpent {}
impl RpcMethod<1> for EthCompileSerpent {
    const NAME: &'static str = "eth_compileSerpent";
    const PARAM_NAMES: [&'static str; 1] = ["source"];
    type Params = (String,);
    type Ok = String;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Err(compiler_not_allowed())
    }
}

// Blocks never have uncles.

pub enum EthGetUncleByBlockHashAndIndex {}
impl RpcMethod<2> for EthGetUncleByBlockHashAndIndex {
    const NAME: &'static str = "eth_getUncleByBlockHashAndIndex";
    const PARAM_NAMES: [&'static str; 2] = ["blockHash", "index"];
    type Params = (String, Quantity);
    type Ok = Option<Block>;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(None)
    }
}

pub enum EthGetUncleByBlockNumberAndIndex {}
impl RpcMethod<2> for EthGetUncleByBlockNumberAndIndex {
    const NAME: &'static str = "eth_getUncleByBlockNumberAndIndex";
    const PARAM_NAMES: [&'static str; 2] = ["block", "index"];
    type Params = (Quantity, Quantity);
    type Ok = Option<Block>;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(None)
    }
}

pub enum EthGetUncleCountByBlockHash {}
impl RpcMethod<1> for EthGetUncleCountByBlockHash {
    const NAME: &'static str = "eth_getUncleCountByBlockHash";
    const PARAM_NAMES: [&'static str; 1] = ["blockHash"];
    type Params = (String,);
    type Ok = Uint64;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(Uint64(0))
    }
}

pub enum EthGetUncleCountByBlockNumber {}
impl RpcMethod<1> for EthGetUncleCountByBlockNumber {
    const NAME: &'static str = "eth_getUncleCountByBlockNumber";
    const PARAM_NAMES: [&'static str; 1] = ["block"];
    type Params = (Quantity,);
    type Ok = Uint64;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(Uint64(0))
    }
}

pub enum EthGetWork {}
impl RpcMethod<0> for EthGetWork {
    const NAME: &'static str = "eth_getWork";
    const PARAM_NAMES: [&'static str; 0] = [];
    type Params = ();
    type Ok = Vec<String>;

    async fn handle(_: Ctx, (): Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(vec![])
    }
}

pub enum EthSubmitWork {}
impl RpcMethod<3> for EthSubmitWork {
    const NAME: &'static str = "eth_submitWork";
    const PARAM_NAMES: [&'static str; 3] = ["nonce", "powHash", "mixDigest"];
    type Params = (String, String, String);
    type Ok = bool;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(false)
    }
}

pub enum EthSubmitHashrate {}
impl RpcMethod<2> for EthSubmitHashrate {
    const NAME: &'static str = "eth_submitHashrate";
    const PARAM_NAMES: [&'static str; 2] = ["hashrate", "id"];
    type Params = (String, String);
    type Ok = bool;

    async fn handle(_: Ctx, _: Self::Params) -> Result<Self::Ok, ServerError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ethereum_types::H256;
    use jsonrpsee::types::error::ErrorCode;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::devnet::{CHAIN_ID, vm};
    use crate::rpc::RpcMethodExt as _;
    use crate::shim::address::to_eth_address;
    use crate::test_utils::{TestNet, test_net, test_net_with_filters};

    fn invoke(net: &TestNet, data: &[u8]) -> CallRequest {
        CallRequest {
            from: net.account.to_string(),
            to: net.contract.to_string(),
            gas: "0x989680".into(),
            data: HexString(format_bytes(data)),
            ..Default::default()
        }
    }

    fn store_call(slot: u8, value: u8) -> Vec<u8> {
        let mut data = vec![vm::OP_STORE];
        data.extend(H256::from_low_u64_be(slot.into()).as_bytes());
        data.extend(H256::from_low_u64_be(value.into()).as_bytes());
        data
    }

    async fn send_and_mine(net: &TestNet, data: &[u8]) -> Hash {
        let hash = EthSendTransaction::handle(net.state.clone(), (invoke(net, data),))
            .await
            .unwrap();
        net.devnet.mine().await.unwrap();
        hash
    }

    async fn counter(net: &TestNet) -> String {
        EthCall::handle(net.state.clone(), (invoke(net, &[vm::OP_READ]), None))
            .await
            .unwrap()
    }

    fn word(n: u64) -> String {
        format_bytes(H256::from_low_u64_be(n).as_bytes())
    }

    #[tokio::test]
    async fn constants() {
        let net = test_net().await;
        let ctx = net.state.clone();
        assert_eq!(
            EthProtocolVersion::handle(ctx.clone(), ()).await.unwrap(),
            "0x41"
        );
        assert_eq!(
            EthChainId::handle(ctx.clone(), ()).await.unwrap(),
            Uint64(CHAIN_ID)
        );
        assert_eq!(EthHashrate::handle(ctx.clone(), ()).await.unwrap(), Uint64(0));
        assert_eq!(
            EthGetCompilers::handle(ctx.clone(), ()).await.unwrap(),
            vec!["none".to_string()]
        );
        assert!(EthMining::handle(ctx.clone(), ()).await.unwrap());
        assert_eq!(
            EthCoinbase::handle(ctx.clone(), ()).await.unwrap(),
            Some(net.account.to_string())
        );
        assert_eq!(
            EthSyncing::handle(ctx, ()).await.unwrap(),
            SyncingResult::DoneSync(false)
        );
    }

    #[tokio::test]
    async fn block_number_follows_the_head() {
        let net = test_net().await;
        let before = EthBlockNumber::handle(net.state.clone(), ()).await.unwrap();
        net.devnet.mine().await.unwrap();
        let after = EthBlockNumber::handle(net.state.clone(), ()).await.unwrap();
        assert_eq!(after.0, before.0 + 1);
    }

    #[tokio::test]
    async fn balances_and_nonces() {
        let net = test_net().await;
        let ctx = net.state.clone();
        let balance = EthGetBalance::handle(ctx.clone(), (net.account.to_string(), None))
            .await
            .unwrap();
        assert!(balance.0 > 0.into());

        let stranger = Address::new_id(999_999).to_string();
        let none = EthGetBalance::handle(ctx.clone(), (stranger, Some("earliest".into())))
            .await
            .unwrap();
        assert_eq!(none.0, 0.into());

        let nonce = |ctx: Ctx, addr: String| async move {
            EthGetTransactionCount::handle(ctx, (addr, None))
                .await
                .unwrap()
        };
        assert_eq!(nonce(ctx.clone(), net.account.to_string()).await, Uint64(0));
        send_and_mine(&net, &[vm::OP_INCREMENT]).await;
        assert_eq!(nonce(ctx, net.account.to_string()).await, Uint64(1));
    }

    #[tokio::test]
    async fn balances_at_past_heights() {
        use crate::message_pool::MessagePool as _;
        use crate::shim::econ::TokenAmount;

        let net = test_net().await;
        let recipient = Address::new_id(4242);
        net.devnet
            .push_message(
                Message::transfer(net.account, recipient, TokenAmount::from_atto(7)),
                None,
            )
            .await
            .unwrap();
        net.devnet.mine().await.unwrap();

        let balance = |block: &str| {
            EthGetBalance::handle(
                net.state.clone(),
                (recipient.to_string(), Some(block.into())),
            )
        };
        assert_eq!(balance("latest").await.unwrap().0, 7.into());
        assert_eq!(balance("0x1").await.unwrap().0, 7.into());
        assert_eq!(balance("earliest").await.unwrap().0, 0.into());
        assert_eq!(balance("0x0").await.unwrap().0, 0.into());
    }

    #[tokio::test]
    async fn bad_address_is_invalid_params() {
        let net = test_net().await;
        let err = EthGetBalance::call_raw(net.state.clone(), Some(r#"["not an address"]"#))
            .await
            .unwrap_err();
        assert_eq!(err.known_code(), ErrorCode::InvalidParams);
        assert!(err.to_string().contains("invalid address"));
    }

    #[tokio::test]
    async fn storage_reads_committed_slots() {
        let net = test_net().await;
        send_and_mine(&net, &store_call(7, 42)).await;

        let value = EthGetStorageAt::handle(
            net.state.clone(),
            (net.contract.to_string(), "0x07".into(), None),
        )
        .await
        .unwrap();
        assert_eq!(value, word(42));

        let empty = EthGetStorageAt::handle(
            net.state.clone(),
            (net.contract.to_string(), "0x08".into(), None),
        )
        .await
        .unwrap();
        assert_eq!(empty, word(0));

        let err = EthGetStorageAt::handle(
            net.state.clone(),
            (net.account.to_string(), "0x07".into(), None),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("is not a contract"));
    }

    #[tokio::test]
    async fn code_of_contracts_and_accounts() {
        let net = test_net().await;
        let code = EthGetCode::handle(net.state.clone(), (net.contract.to_string(), None))
            .await
            .unwrap();
        assert_eq!(code, format_bytes(&net.code));

        let none = EthGetCode::handle(net.state.clone(), (net.account.to_string(), None))
            .await
            .unwrap();
        assert_eq!(none, "0x");
    }

    #[tokio::test]
    async fn blocks_by_number_and_hash_agree() {
        let net = test_net().await;
        let tx = send_and_mine(&net, &[vm::OP_INCREMENT]).await;

        let by_number = EthGetBlockByNumber::handle(net.state.clone(), ("0x1".into(), None, None))
            .await
            .unwrap();
        assert_eq!(by_number.number, Uint64(1));
        assert_eq!(by_number.transactions.len(), 1);

        let by_hash = EthGetBlockByHash::handle(
            net.state.clone(),
            (by_number.hash.to_string(), Some(true)),
        )
        .await
        .unwrap();
        assert_eq!(by_hash.hash, by_number.hash);
        match &by_hash.transactions {
            types::Transactions::Full(txs) => assert_eq!(txs[0].hash, tx),
            other => panic!("expected full transactions, got {other:?}"),
        }

        let count = EthGetBlockTransactionCountByHash::handle(
            net.state.clone(),
            (by_number.hash.to_string(),),
        )
        .await
        .unwrap();
        assert_eq!(count, Uint64(1));
        let count =
            EthGetBlockTransactionCountByNumber::handle(net.state.clone(), ("0x1".into(), None))
                .await
                .unwrap();
        assert_eq!(count, Uint64(1));
    }

    #[tokio::test]
    async fn block_index_out_of_range() {
        let net = test_net().await;
        let err = EthGetBlockByNumber::handle(
            net.state.clone(),
            ("latest".into(), None, Some(Quantity::Int(5))),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn transactions_by_position() {
        let net = test_net().await;
        let tx = send_and_mine(&net, &[vm::OP_INCREMENT]).await;
        let block = EthGetBlockByNumber::handle(net.state.clone(), ("0x1".into(), None, None))
            .await
            .unwrap();

        let by_number = EthGetTransactionByBlockNumberAndIndex::handle(
            net.state.clone(),
            ("0x1".into(), "0x0".into(), None),
        )
        .await
        .unwrap();
        assert_eq!(by_number.hash, tx);
        assert_eq!(by_number.block_hash, block.hash);

        let by_hash = EthGetTransactionByBlockHashAndIndex::handle(
            net.state.clone(),
            (block.hash.to_string(), "0x0".into()),
        )
        .await
        .unwrap();
        assert_eq!(by_hash, by_number);

        let err = EthGetTransactionByBlockHashAndIndex::handle(
            net.state.clone(),
            (block.hash.to_string(), "0x1".into()),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[tokio::test]
    async fn transaction_and_receipt_by_hash() {
        let net = test_net().await;
        let tx = send_and_mine(&net, &[vm::OP_INCREMENT]).await;

        let found = EthGetTransactionByHash::handle(net.state.clone(), (tx.to_string(),))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.hash, tx);
        assert!(
            EthGetTransactionReceipt::handle(net.state.clone(), (tx.to_string(),))
                .await
                .unwrap()
                .is_none()
        );

        // receipts appear once the next tipset executed the message
        net.devnet.mine().await.unwrap();
        let receipt = EthGetTransactionReceipt::handle(net.state.clone(), (tx.to_string(),))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.transaction_hash, tx);
        assert_eq!(receipt.status, Uint64(1));
        assert_eq!(receipt.logs.len(), 1);

        let unknown = Hash(H256::repeat_byte(7)).to_string();
        assert!(
            EthGetTransactionByHash::handle(net.state.clone(), (unknown,))
                .await
                .unwrap()
                .is_none()
        );

        let err = EthGetTransactionReceipt::handle(net.state.clone(), ("0xzz".into(),))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid hash"));
    }

    #[tokio::test]
    async fn calls_and_estimates_are_side_effect_free() {
        let net = test_net().await;
        let before = counter(&net).await;
        let request = invoke(&net, &[vm::OP_INCREMENT]);

        let first = EthEstimateGas::handle(net.state.clone(), (request.clone(), None))
            .await
            .unwrap();
        let second = EthEstimateGas::handle(net.state.clone(), (request.clone(), None))
            .await
            .unwrap();
        assert_eq!(first, second);
        let simulated = EthCall::handle(net.state.clone(), (request, None))
            .await
            .unwrap();
        assert_eq!(simulated, word(1));
        assert_eq!(counter(&net).await, before);
    }

    #[tokio::test]
    async fn reverting_calls_report_their_data() {
        let net = test_net().await;
        let err = EthCall::handle(
            net.state.clone(),
            (invoke(&net, &[vm::OP_REVERT, 0xbe, 0xef]), None),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), errors::EXECUTION_REVERTED_CODE);
        assert!(err.message().contains("execution failed"));
        assert_eq!(err.data().map(|data| data.get()), Some(r#""0xbeef""#));
    }

    #[tokio::test]
    async fn sent_transactions_execute_when_mined() {
        let net = test_net().await;
        assert_eq!(counter(&net).await, word(0));
        send_and_mine(&net, &[vm::OP_INCREMENT]).await;
        assert_eq!(counter(&net).await, word(1));
    }

    #[tokio::test]
    async fn raw_transactions_reach_the_pool() {
        let net = test_net().await;
        let signed = EthSignTransaction::handle(
            net.state.clone(),
            (invoke(&net, &[vm::OP_INCREMENT]),),
        )
        .await
        .unwrap();
        let hash = EthSendRawTransaction::handle(net.state.clone(), (signed.as_str().into(),))
            .await
            .unwrap();
        let pending = net.devnet.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(Hash::from(pending[0].cid().unwrap()), hash);

        let err = EthSendRawTransaction::handle(net.state.clone(), ("0x00".into(),))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("undecodable signed message"));
    }

    #[test]
    fn personal_message_digest() {
        assert_eq!(
            hex::encode(signed_message_digest(b"hello")),
            "50b2c43fd39106bafbba0da34fc430e1f91e3c96ea2acee2bc34119f92b37750"
        );
    }

    #[tokio::test]
    async fn sign_uses_the_wallet() {
        let net = test_net().await;
        let signature =
            EthSign::handle(net.state.clone(), (net.account.to_string(), "0x1234".into()))
                .await
                .unwrap();
        let bytes = HexString(signature).to_bytes().unwrap();
        assert_eq!(bytes.len(), 65);

        let stranger = Address::new_id(999_999).to_string();
        assert!(
            EthSign::handle(net.state.clone(), (stranger, "0x1234".into()))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn block_filter_over_rpc() {
        let net = test_net().await;
        let id = EthNewBlockFilter::handle(net.state.clone(), ())
            .await
            .unwrap();
        net.devnet.mine().await.unwrap();
        net.devnet.mine().await.unwrap();

        let mut seen = 0;
        tokio::time::timeout(Duration::from_secs(5), async {
            while seen < 2 {
                let changes = EthGetFilterChanges::handle(net.state.clone(), (id.clone(),))
                    .await
                    .unwrap();
                assert!(matches!(changes, FilterChanges::Hashes(_)));
                seen += changes.len();
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(seen, 2);

        assert!(
            EthUninstallFilter::handle(net.state.clone(), (id.clone(),))
                .await
                .unwrap()
        );
        assert!(
            !EthUninstallFilter::handle(net.state.clone(), (id.clone(),))
                .await
                .unwrap()
        );
        let err = EthGetFilterChanges::handle(net.state.clone(), (id,))
            .await
            .unwrap_err();
        assert!(err.message().contains("not found"));
    }

    #[tokio::test]
    async fn pending_filter_and_log_filter_kinds() {
        let net = test_net().await;
        let pending = EthNewPendingTransactionFilter::handle(net.state.clone(), ())
            .await
            .unwrap();
        let logs = EthNewFilter::handle(net.state.clone(), (FilterSpec::default(),))
            .await
            .unwrap();
        assert_ne!(pending, logs);
        assert!(
            EthGetFilterLogs::handle(net.state.clone(), (logs,))
                .await
                .unwrap()
                .is_empty()
        );
        // only log filters keep a log history
        assert!(
            EthGetFilterLogs::handle(net.state.clone(), (pending,))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn logs_by_range_and_by_block_hash() {
        let net = test_net().await;
        send_and_mine(&net, &[vm::OP_INCREMENT]).await;
        send_and_mine(&net, &[vm::OP_INCREMENT]).await;
        let contract = format!("{:#x}", to_eth_address(&net.contract).unwrap());

        let spec = FilterSpec {
            from_block: Some("earliest".into()),
            address: filter::criteria::OneOrMany::One(contract.clone()),
            ..Default::default()
        };
        let logs = EthGetLogs::handle(net.state.clone(), (spec,)).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].data.0, H256::from_low_u64_be(1).as_bytes());
        assert_eq!(logs[1].data.0, H256::from_low_u64_be(2).as_bytes());

        // the lower bound defaults to the head
        let latest = EthGetLogs::handle(net.state.clone(), (FilterSpec::default(),))
            .await
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].block_number, Uint64(2));

        let block = EthGetBlockByNumber::handle(net.state.clone(), ("0x1".into(), None, None))
            .await
            .unwrap();
        let spec = FilterSpec {
            block_hash: Some(block.hash),
            ..Default::default()
        };
        let by_hash = EthGetLogs::handle(net.state.clone(), (spec,)).await.unwrap();
        assert_eq!(by_hash.len(), 1);
        assert_eq!(by_hash[0].block_number, Uint64(1));
    }

    #[tokio::test]
    async fn log_range_is_capped() {
        let net = test_net_with_filters(filter::FilterConfig {
            max_filter_height_range: 1,
            ..Default::default()
        })
        .await;
        net.devnet.mine().await.unwrap();
        net.devnet.mine().await.unwrap();

        let spec = FilterSpec {
            from_block: Some("0x0".into()),
            ..Default::default()
        };
        let err = EthGetLogs::handle(net.state.clone(), (spec,))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("block range"));
    }

    #[tokio::test]
    async fn signed_log_bounds_are_rejected() {
        let net = test_net().await;
        net.devnet.mine().await.unwrap();

        for bound in ["0x-8000000000000000", "0x-1", "0x+1"] {
            let spec = FilterSpec {
                to_block: Some(bound.into()),
                ..Default::default()
            };
            let err = EthGetLogs::handle(net.state.clone(), (spec,))
                .await
                .unwrap_err();
            assert_eq!(err.known_code(), ErrorCode::InvalidParams);
        }

        // an upper bound below the default lower bound is an empty range
        let spec = FilterSpec {
            to_block: Some("0x0".into()),
            ..Default::default()
        };
        let logs = EthGetLogs::handle(net.state.clone(), (spec,)).await.unwrap();
        assert!(logs.is_empty());
    }

    #[test]
    fn height_range_arithmetic_saturates() {
        assert!(check_height_range(0, 0, 1).is_ok());
        assert!(check_height_range(5, 0, 1).is_ok());
        assert!(check_height_range(ChainEpoch::MAX, ChainEpoch::MIN, 1).is_ok());
        assert!(matches!(
            check_height_range(ChainEpoch::MIN, ChainEpoch::MAX, 2880),
            Err(EthError::BlockRangeExceeded { requested: ChainEpoch::MAX, limit: 2880 })
        ));
        assert!(check_height_range(0, 1, 1).is_err());
    }

    #[tokio::test]
    async fn tipset_by_height_is_fully_rendered() {
        let net = test_net().await;
        send_and_mine(&net, &[vm::OP_INCREMENT]).await;
        let blocks = EthGetTipsetByHeight::handle(net.state.clone(), ("0x1".into(),))
            .await
            .unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(matches!(
            blocks[0].transactions,
            types::Transactions::Full(ref txs) if txs.len() == 1
        ));
    }

    #[tokio::test]
    async fn unsupported_surface() {
        let net = test_net().await;
        let err = EthCompileSolidity::handle(net.state.clone(), ("contract C {}".into(),))
            .await
            .unwrap_err();
        assert_eq!(err.code(), UNSUPPORTED_METHOD);
        assert_eq!(err.message(), "compiler not allowed");

        assert!(
            EthGetUncleByBlockNumberAndIndex::handle(
                net.state.clone(),
                ("latest".into(), "0x0".into())
            )
            .await
            .unwrap()
            .is_none()
        );
        assert_eq!(
            EthGetUncleCountByBlockHash::handle(net.state.clone(), ("0x00".into(),))
                .await
                .unwrap(),
            Uint64(0)
        );
        assert!(EthGetWork::handle(net.state.clone(), ()).await.unwrap().is_empty());
        assert!(
            !EthSubmitHashrate::handle(net.state.clone(), ("0x1".into(), "0x2".into()))
                .await
                .unwrap()
        );
    }
}
