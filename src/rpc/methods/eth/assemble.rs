// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Builds the foreign block, transaction and receipt views out of native chain data.

use cid::Cid;
use ethereum_types::H256;

use super::errors::EthError;
use super::execution::{ExecutionOutput, decode_contract_return};
use super::types::{
    Block, Bloom, EthBigInt, EthBytes, EthLog, Hash, Transactions, Tx, TxReceipt, Uint64,
};
use crate::blocks::{BLOCK_GAS_LIMIT, BlockHeader, Tipset};
use crate::message::ChainMessage;
use crate::rpc::RPCState;
use crate::shim::actors::{contract, init};
use crate::shim::clock::ChainEpoch;

const SIGNATURE_LEN: usize = 65;

/// Splits an `R || S || V` signature. Any other length yields zeros.
pub fn parse_signature(sig: &[u8]) -> (Uint64, Hash, Hash) {
    if sig.len() != SIGNATURE_LEN {
        return Default::default();
    }
    (
        Uint64(u64::from(sig[64])),
        Hash(H256::from_slice(&sig[..32])),
        Hash(H256::from_slice(&sig[32..64])),
    )
}

fn height(epoch: ChainEpoch) -> Uint64 {
    Uint64(u64::try_from(epoch).unwrap_or_default())
}

/// Where a block sits: its CID, height and position inside its tipset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockPosition {
    pub cid: Cid,
    pub height: ChainEpoch,
    pub block_index: usize,
}

pub fn transaction_view(
    msg: &ChainMessage,
    cid: &Cid,
    block: &BlockPosition,
    transaction_index: usize,
) -> Tx {
    let message = msg.message();
    let (v, r, s) = parse_signature(msg.signature_bytes());
    Tx {
        hash: cid.into(),
        block_hash: block.cid.into(),
        block_number: height(block.height),
        block_index: Uint64(block.block_index as u64),
        transaction_index: Uint64(transaction_index as u64),
        from: message.from.to_string(),
        to: message.to.to_string(),
        gas: Uint64(message.gas_limit),
        gas_price: (&message.gas_fee_cap).into(),
        input: EthBytes(message.params.to_vec()),
        nonce: Uint64(message.sequence),
        value: EthBigInt::from(&message.value),
        v,
        r,
        s,
    }
}

pub async fn block_view(
    ctx: &RPCState,
    tipset: &Tipset,
    header: &BlockHeader,
    full_transactions: bool,
) -> Result<Block, EthError> {
    let cid = header.cid()?;
    let position = BlockPosition {
        cid,
        height: header.epoch,
        block_index: tipset.block_index(&cid).unwrap_or_default(),
    };
    let messages = ctx.chain.block_messages(&cid).await?;
    let transactions = if full_transactions {
        Transactions::Full(
            messages
                .iter()
                .zip(&messages.cids)
                .enumerate()
                .map(|(i, (msg, msg_cid))| transaction_view(&msg, msg_cid, &position, i))
                .collect(),
        )
    } else {
        Transactions::Hash(messages.cids.iter().map(Hash::from).collect())
    };
    let logs_bloom = ctx
        .contracts
        .height_logs(header.epoch)
        .await?
        .and_then(|entry| entry.bloom())
        .map(Bloom)
        .unwrap_or_default();
    let difficulty = Uint64(u64::try_from(header.win_count).unwrap_or_default());

    Ok(Block {
        number: height(header.epoch),
        block_index: Uint64(position.block_index as u64),
        hash: cid.into(),
        parent_hash: header
            .parents
            .cids()
            .first()
            .map(Hash::from)
            .unwrap_or_default(),
        nonce: EthBytes(vec![0; 8]),
        sha3_uncles: Hash::empty_uncles(),
        logs_bloom,
        transactions_root: header.messages.into(),
        state_root: header.state_root.into(),
        receipts_root: header.message_receipts.into(),
        miner: header.miner_address.to_string(),
        difficulty: difficulty.clone(),
        total_difficulty: difficulty,
        extra_data: EthBytes::default(),
        size: Uint64(header.encoded_len()? as u64),
        gas_limit: Uint64(BLOCK_GAS_LIMIT),
        gas_used: Uint64(0),
        timestamp: Uint64(header.timestamp),
        transactions,
        uncles: vec![],
    })
}

/// Views of every block of `tipset`.
pub async fn tipset_view(
    ctx: &RPCState,
    tipset: &Tipset,
    full_transactions: bool,
) -> Result<Vec<Block>, EthError> {
    let mut blocks = Vec::with_capacity(tipset.block_headers().len());
    for header in tipset.block_headers() {
        blocks.push(block_view(ctx, tipset, header, full_transactions).await?);
    }
    Ok(blocks)
}

/// An included message together with its place in the chain.
#[derive(Clone, Debug)]
pub struct MessageLocation {
    pub message: ChainMessage,
    pub block: BlockPosition,
    pub transaction_index: usize,
}

/// Finds the block including `cid`, scanning the blocks of the including tipset in order.
pub async fn locate_message(
    ctx: &RPCState,
    cid: &Cid,
) -> Result<Option<MessageLocation>, EthError> {
    let Some(lookup) = ctx.chain.search_message(cid).await? else {
        return Ok(None);
    };
    let tipset = ctx.chain.load_tipset(&lookup.tipset).await?;
    for (block_index, block_cid) in tipset.key().cids().iter().enumerate() {
        let messages = ctx.chain.block_messages(block_cid).await?;
        if let Some(transaction_index) = messages.position(cid)
            && let Some(message) = messages.get(transaction_index)
        {
            return Ok(Some(MessageLocation {
                message,
                block: BlockPosition {
                    cid: *block_cid,
                    height: lookup.height,
                    block_index,
                },
                transaction_index,
            }));
        }
    }
    Ok(None)
}

pub async fn transaction_by_cid(ctx: &RPCState, cid: &Cid) -> Result<Option<Tx>, EthError> {
    Ok(locate_message(ctx, cid)
        .await?
        .map(|loc| transaction_view(&loc.message, cid, &loc.block, loc.transaction_index)))
}

/// Receipt of `cid`, `None` until the tipset executing it is part of the chain.
pub async fn receipt_view(ctx: &RPCState, cid: &Cid) -> Result<Option<TxReceipt>, EthError> {
    let Some(loc) = locate_message(ctx, cid).await? else {
        return Ok(None);
    };
    // messages are executed by the tipset built on top of the one including them
    let head = ctx.chain.heaviest_tipset().await?;
    if head.epoch() <= loc.block.height {
        return Ok(None);
    }
    let executed = ctx.chain.tipset_by_height(loc.block.height + 1).await?;
    let receipt = ctx.chain.receipt(cid, executed.key()).await?;

    let message = loc.message.message();
    let mut view = TxReceipt {
        transaction_hash: cid.into(),
        transaction_index: Uint64(loc.transaction_index as u64),
        block_hash: loc.block.cid.into(),
        block_number: height(loc.block.height),
        block_index: Uint64(loc.block.block_index as u64),
        from: message.from.to_string(),
        to: message.to.to_string(),
        cumulative_gas_used: Uint64(receipt.gas_used),
        gas_used: Uint64(receipt.gas_used),
        status: Uint64(u64::from(receipt.is_success())),
        ..Default::default()
    };

    match decode_contract_return(receipt.return_data.bytes()) {
        ExecutionOutput::Created(created) if message.to == init::ADDRESS => {
            view.contract_address = Some(created.robust_address.to_string());
        }
        ExecutionOutput::Contract(result) if message.to != init::ADDRESS => {
            view.logs = result
                .logs
                .iter()
                .enumerate()
                .map(|(i, log)| EthLog::new(log, loc.block.height, i))
                .collect();
            view.logs_bloom = Bloom(contract::logs_bloom(&result.logs));
            view.gas_used = Uint64(result.gas_used);
            if !result.address.is_empty() {
                view.contract_address = Some(format!("0x{}", hex::encode(&result.address)));
            }
        }
        _ => {}
    }
    Ok(Some(view))
}
