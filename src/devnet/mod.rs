// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! A single-miner development chain kept entirely in memory.
//!
//! [`Devnet`] plays every collaborator the bridge needs: chain reader, message pool, state
//! caller, gas estimator, wallet, contract store and node info. Blocks are produced on demand
//! with [`Devnet::mine`] or periodically by [`Devnet::spawn_miner`].

pub mod vm;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use ahash::HashMap;
use anyhow::{Context as _, bail};
use async_trait::async_trait;
use cid::Cid;
use ethereum_types::H256;
use fvm_ipld_encoding::{IPLD_RAW, RawBytes};
use multihash_codetable::{Code, MultihashDigest};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::blocks::{BlockHeader, Tipset, TipsetKey};
use crate::chain::{ActorState, BlockMessages, ChainReader, HeadChange, MessageLookup};
use crate::contracts::ContractStore;
use crate::message::{ChainMessage, SignedMessage};
use crate::message_pool::{MessagePool, MessageSendSpec, MpoolChange, MpoolUpdate};
use crate::node::{NodeInfo, SyncStatus};
use crate::rpc::Services;
use crate::shim::actors::{contract, init};
use crate::shim::address::{Address, Protocol, to_eth_address};
use crate::shim::clock::ChainEpoch;
use crate::shim::crypto::Signature;
use crate::shim::econ::TokenAmount;
use crate::shim::error::ExitCode;
use crate::shim::executor::Receipt;
use crate::shim::message::{METHOD_SEND, Message};
use crate::state_manager::{CodeClassifier, GasEstimator, InvocResult, StateCaller};
use crate::utils::cid::CidCborExt as _;
use crate::wallet::{Wallet, sign_message};
use vm::ContractState;

/// Code CID of plain accounts.
pub static ACCOUNT_CODE_ID: LazyLock<Cid> =
    LazyLock::new(|| Cid::new_v1(IPLD_RAW, Code::Blake2b256.digest(b"fil/2/account")));

/// The only miner of the chain.
pub const MINER: Address = Address::new_id(1000);

/// ID of the first funded account; the others follow.
pub const FIRST_ACCOUNT_ID: u64 = 100;

const FIRST_CONTRACT_ID: u64 = 1001;

pub const CHAIN_ID: u64 = 31415926;

const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Premium every estimate settles on.
const DEFAULT_PREMIUM: u64 = 100_000;

const BASE_FEE: u64 = 100;

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct DevnetConfig {
    /// Seconds between blocks, zero disables automatic mining.
    pub block_time: u64,
    /// Whole coins credited to each account at genesis.
    pub genesis_balance: u64,
    pub accounts: usize,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            block_time: 5,
            genesis_balance: 1000,
            accounts: 1,
        }
    }
}

/// How often each collaborator entry point was hit.
#[derive(Debug, Default)]
pub struct CallCounters {
    pub state_call: AtomicUsize,
    pub estimate_gas_limit: AtomicUsize,
    pub push: AtomicUsize,
    pub push_message: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Clone, Debug, Default)]
struct World {
    actors: HashMap<Address, ActorState>,
    /// Robust addresses of actors created at run time, mapped to their ID addresses.
    aliases: HashMap<Address, Address>,
    contracts: HashMap<Address, ContractState>,
    next_id: u64,
}

/// Effects of executing one message.
struct Execution {
    receipt: Receipt,
    logs: Vec<contract::EvmLog>,
    error: String,
}

impl Execution {
    fn failed(exit_code: ExitCode, error: impl Into<String>) -> Self {
        Self {
            receipt: Receipt {
                exit_code,
                ..Default::default()
            },
            logs: vec![],
            error: error.into(),
        }
    }

    fn done(return_data: Vec<u8>, gas_used: u64) -> Self {
        Self {
            receipt: Receipt {
                exit_code: ExitCode::OK,
                return_data: RawBytes::new(return_data),
                gas_used,
            },
            logs: vec![],
            error: String::new(),
        }
    }
}

impl World {
    fn resolve(&self, addr: &Address) -> Option<Address> {
        match addr.protocol() {
            Protocol::ID => Some(*addr),
            _ => self.aliases.get(addr).copied(),
        }
    }

    fn actor(&self, addr: &Address) -> Option<&ActorState> {
        self.resolve(addr).and_then(|id| self.actors.get(&id))
    }

    fn new_actor(&mut self, code: Cid, balance: TokenAmount) -> Address {
        let id = Address::new_id(self.next_id);
        self.next_id += 1;
        self.actors.insert(
            id,
            ActorState {
                code,
                sequence: 0,
                balance,
            },
        );
        id
    }

    fn transfer(&mut self, from: &Address, to: &Address, value: &TokenAmount) {
        if let Some(actor) = self.actors.get_mut(from) {
            actor.balance -= value.clone();
        }
        if let Some(actor) = self.actors.get_mut(to) {
            actor.balance += value.clone();
        }
    }

    fn execute(&mut self, msg: &Message) -> anyhow::Result<Execution> {
        let Some(from) = self.resolve(&msg.from) else {
            return Ok(Execution::failed(
                ExitCode::SYS_SENDER_INVALID,
                format!("sender {} not found", msg.from),
            ));
        };
        let Some(sender) = self.actors.get_mut(&from) else {
            return Ok(Execution::failed(ExitCode::SYS_SENDER_INVALID, "sender missing"));
        };
        sender.sequence += 1;
        if sender.balance < msg.value {
            return Ok(Execution::failed(
                ExitCode::SYS_INSUFFICIENT_FUNDS,
                "insufficient funds for transfer",
            ));
        }

        if msg.to == init::ADDRESS && msg.method_num == u64::from(init::Method::Exec) {
            return self.create(&from, msg);
        }
        let known = self
            .resolve(&msg.to)
            .filter(|id| self.actors.contains_key(id));
        let to = match known {
            Some(to) => to,
            // sends create missing accounts
            None if msg.method_num == METHOD_SEND && msg.to.protocol() == Protocol::ID => {
                self.actors.insert(
                    msg.to,
                    ActorState {
                        code: *ACCOUNT_CODE_ID,
                        sequence: 0,
                        balance: TokenAmount::default(),
                    },
                );
                msg.to
            }
            None if msg.method_num == METHOD_SEND => {
                let id = self.new_actor(*ACCOUNT_CODE_ID, TokenAmount::default());
                self.aliases.insert(msg.to, id);
                id
            }
            None => {
                return Ok(Execution::failed(
                    ExitCode::SYS_INVALID_RECEIVER,
                    format!("receiver {} not found", msg.to),
                ));
            }
        };
        if msg.method_num == u64::from(contract::Method::GetCode)
            || msg.method_num == u64::from(contract::Method::GetStorageAt)
        {
            return self.query(&to, msg);
        }
        self.transfer(&from, &to, &msg.value);

        if msg.method_num == METHOD_SEND {
            return Ok(Execution::done(vec![], vm::BASE_GAS));
        }
        if msg.method_num != u64::from(contract::Method::CallContract) {
            return Ok(Execution::failed(
                ExitCode::USR_UNHANDLED_MESSAGE,
                format!("method {} not handled", msg.method_num),
            ));
        }
        let params: contract::ContractParams = match msg.params.deserialize() {
            Ok(params) => params,
            Err(e) => return Ok(Execution::failed(ExitCode::USR_SERIALIZATION, e.to_string())),
        };
        let eth_address = to_eth_address(&to).unwrap_or_default();
        let Some(state) = self.contracts.get_mut(&to) else {
            return Ok(Execution::failed(
                ExitCode::USR_UNHANDLED_MESSAGE,
                format!("{} is not a contract", msg.to),
            ));
        };
        let outcome = vm::invoke(state, eth_address, &params)?;
        if outcome.exit_code.is_success() {
            self.transfer(&from, &to, &params.value);
        }
        Ok(Execution {
            receipt: Receipt {
                exit_code: outcome.exit_code,
                return_data: RawBytes::new(outcome.return_data),
                gas_used: outcome.gas_used,
            },
            logs: outcome.logs,
            error: outcome.error,
        })
    }

    /// Read-only contract getters, they never move funds.
    fn query(&self, to: &Address, msg: &Message) -> anyhow::Result<Execution> {
        let Some(state) = self.contracts.get(to) else {
            return Ok(Execution::failed(
                ExitCode::USR_UNHANDLED_MESSAGE,
                format!("{} is not a contract", msg.to),
            ));
        };
        if msg.method_num == u64::from(contract::Method::GetCode) {
            let ret = contract::GetCodeReturn {
                code: state.code.clone(),
            };
            return Ok(Execution::done(fvm_ipld_encoding::to_vec(&ret)?, vm::BASE_GAS));
        }
        let params: contract::GetStorageParams = match msg.params.deserialize() {
            Ok(params) => params,
            Err(e) => return Ok(Execution::failed(ExitCode::USR_SERIALIZATION, e.to_string())),
        };
        if params.position.len() > 32 {
            return Ok(Execution::failed(
                ExitCode::USR_ILLEGAL_ARGUMENT,
                "storage position wider than 32 bytes",
            ));
        }
        let mut slot = [0u8; 32];
        slot[32 - params.position.len()..].copy_from_slice(&params.position);
        let ret = contract::GetStorageReturn {
            value: state.load(&H256(slot)).as_bytes().to_vec(),
        };
        Ok(Execution::done(fvm_ipld_encoding::to_vec(&ret)?, vm::BASE_GAS))
    }

    fn create(&mut self, from: &Address, msg: &Message) -> anyhow::Result<Execution> {
        let params = msg
            .params
            .deserialize::<init::ExecParams>()
            .and_then(|exec| exec.constructor_params.deserialize::<contract::ContractParams>());
        let params = match params {
            Ok(params) => params,
            Err(e) => return Ok(Execution::failed(ExitCode::USR_SERIALIZATION, e.to_string())),
        };
        let id = self.new_actor(*contract::CODE_ID, TokenAmount::default());
        let sequence = self.actors.get(from).map(|a| a.sequence).unwrap_or_default();
        let robust = Address::new_actor(&[from.to_bytes(), sequence.to_be_bytes().to_vec()].concat());
        self.aliases.insert(robust, id);
        self.transfer(from, &id, &params.value);
        let gas_used = vm::BASE_GAS + vm::GAS_PER_BYTE * params.code.len() as u64;
        self.contracts.insert(id, ContractState::new(params.code));
        let ret = init::ExecReturn {
            id_address: id,
            robust_address: robust,
        };
        Ok(Execution::done(fvm_ipld_encoding::to_vec(&ret)?, gas_used))
    }
}

#[derive(Default)]
struct Chain {
    /// Indexed by height, there are no null rounds.
    tipsets: Vec<Arc<Tipset>>,
    by_key: HashMap<TipsetKey, Arc<Tipset>>,
    headers: HashMap<Cid, BlockHeader>,
    block_messages: HashMap<Cid, BlockMessages>,
    messages: HashMap<Cid, ChainMessage>,
    included: HashMap<Cid, MessageLookup>,
    receipts: HashMap<Cid, Receipt>,
    /// Execution results keyed by the tipset including the messages.
    replays: HashMap<TipsetKey, Vec<InvocResult>>,
    logs: HashMap<ChainEpoch, contract::LogsEntry>,
    /// State after executing each tipset's messages.
    states: HashMap<TipsetKey, Arc<World>>,
}

impl Chain {
    fn head(&self) -> anyhow::Result<Arc<Tipset>> {
        self.tipsets.last().cloned().context("chain has no genesis")
    }

    fn push(&mut self, tipset: Arc<Tipset>, header: BlockHeader, messages: BlockMessages) {
        let key = tipset.key().clone();
        if let Some(cid) = key.cids().first() {
            self.headers.insert(*cid, header);
            self.block_messages.insert(*cid, messages);
        }
        self.by_key.insert(key, tipset.clone());
        self.tipsets.push(tipset);
    }
}

struct DevnetState {
    chain: Chain,
    /// Live state of the head, including contracts deployed since it was mined.
    world: World,
    pending: Vec<SignedMessage>,
}

impl DevnetState {
    fn is_head(&self, tipset: &TipsetKey) -> anyhow::Result<bool> {
        Ok(self.chain.head()?.key() == tipset)
    }

    fn world_at(&self, tipset: &TipsetKey) -> anyhow::Result<&World> {
        if self.is_head(tipset)? {
            return Ok(&self.world);
        }
        self.chain
            .states
            .get(tipset)
            .map(AsRef::as_ref)
            .with_context(|| format!("no state for tipset {tipset}"))
    }
}

pub struct Devnet {
    config: DevnetConfig,
    accounts: Vec<Address>,
    state: RwLock<DevnetState>,
    head_changes: broadcast::Sender<HeadChange>,
    mpool_updates: broadcast::Sender<MpoolUpdate>,
    logs: broadcast::Sender<contract::LogsEntry>,
    pub calls: CallCounters,
}

fn block_header(
    epoch: ChainEpoch,
    parents: TipsetKey,
    message_cids: &[Cid],
) -> anyhow::Result<BlockHeader> {
    Ok(BlockHeader {
        miner_address: MINER,
        win_count: 1,
        parents,
        epoch,
        state_root: Cid::from_cbor_blake2b256(&(epoch, "state"))?,
        message_receipts: Cid::from_cbor_blake2b256(&(epoch, "receipts"))?,
        messages: Cid::from_cbor_blake2b256(&message_cids)?,
        timestamp: GENESIS_TIMESTAMP + u64::try_from(epoch).unwrap_or_default(),
        parent_base_fee: TokenAmount::from_atto(BASE_FEE),
    })
}

impl Devnet {
    pub fn new(config: DevnetConfig) -> anyhow::Result<Self> {
        let mut world = World {
            next_id: FIRST_CONTRACT_ID,
            ..Default::default()
        };
        let accounts = (0..config.accounts as u64)
            .map(|i| Address::new_id(FIRST_ACCOUNT_ID + i))
            .collect::<Vec<_>>();
        for account in &accounts {
            world.actors.insert(
                *account,
                ActorState {
                    code: *ACCOUNT_CODE_ID,
                    sequence: 0,
                    balance: TokenAmount::from_whole(config.genesis_balance),
                },
            );
        }

        let mut chain = Chain::default();
        let genesis = block_header(0, TipsetKey::default(), &[])?;
        let tipset = Arc::new(Tipset::new(vec![genesis.clone()])?);
        chain.push(tipset.clone(), genesis, BlockMessages::default());
        chain.replays.insert(tipset.key().clone(), vec![]);
        chain
            .states
            .insert(tipset.key().clone(), Arc::new(world.clone()));

        Ok(Self {
            config,
            accounts,
            state: RwLock::new(DevnetState {
                chain,
                world,
                pending: vec![],
            }),
            head_changes: broadcast::channel(EVENT_CAPACITY).0,
            mpool_updates: broadcast::channel(EVENT_CAPACITY).0,
            logs: broadcast::channel(EVENT_CAPACITY).0,
            calls: CallCounters::default(),
        })
    }

    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    /// Funded accounts the wallet holds keys for.
    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    /// Every collaborator backed by this devnet.
    pub fn services(self: &Arc<Self>) -> Services {
        Services {
            chain: self.clone(),
            mpool: self.clone(),
            state: self.clone(),
            gas: self.clone(),
            classifier: Arc::new(CodeClassifier::new(self.clone())),
            wallet: self.clone(),
            contracts: self.clone(),
            node: self.clone(),
        }
    }

    /// Installs a contract directly into the state, outside of any block.
    pub fn deploy(&self, code: Vec<u8>) -> Address {
        let mut state = self.state.write();
        let id = state
            .world
            .new_actor(*contract::CODE_ID, TokenAmount::default());
        state.world.contracts.insert(id, ContractState::new(code));
        id
    }

    pub fn pending(&self) -> Vec<SignedMessage> {
        self.state.read().pending.clone()
    }

    fn next_sequence(state: &DevnetState, from: &Address) -> u64 {
        let on_chain = state
            .world
            .actor(from)
            .map(|a| a.sequence)
            .unwrap_or_default();
        state
            .pending
            .iter()
            .filter(|m| m.message().from == *from)
            .map(|m| m.message().sequence + 1)
            .max()
            .unwrap_or_default()
            .max(on_chain)
    }

    fn add_pending(&self, msg: SignedMessage) -> anyhow::Result<Cid> {
        msg.message().check()?;
        let cid = msg.cid()?;
        self.state.write().pending.push(msg.clone());
        debug!("message {cid} added to the pool");
        let _ = self.mpool_updates.send(MpoolUpdate {
            change: MpoolChange::Add,
            message: msg,
        });
        Ok(cid)
    }

    /// Runs `msg` on a copy of the state at `tipset`.
    ///
    /// Contract storage lives outside the state tree, so with `persist` set and on top of the
    /// head the writes of a call carrying `commit = true` survive. Estimates never persist. The write lock is held for the whole
    /// run: a block mined in between would otherwise be overwritten with stale storage.
    fn dry_run(
        &self,
        msg: &Message,
        tipset: &TipsetKey,
        persist: bool,
    ) -> anyhow::Result<Execution> {
        let mut state = self.state.write();
        let mut world = state.world_at(tipset)?.clone();
        let exec = world.execute(msg)?;
        if !persist || !state.is_head(tipset)? {
            return Ok(exec);
        }
        for (addr, contract) in world.contracts {
            if let Some(existing) = state.world.contracts.get_mut(&addr)
                && *existing != contract
            {
                *existing = contract;
            }
        }
        Ok(exec)
    }

    /// Packs every pending message into a new block on top of the head and executes it.
    pub async fn mine(&self) -> anyhow::Result<Arc<Tipset>> {
        let (tipset, entry, included) = {
            let mut state = self.state.write();
            let parent = state.chain.head()?;
            let epoch = parent.epoch() + 1;
            let included = std::mem::take(&mut state.pending);

            let mut messages = BlockMessages::default();
            let mut logs = vec![];
            let mut results = vec![];
            for msg in &included {
                let cid = msg.cid()?;
                let exec = state.world.execute(msg.message())?;
                logs.extend(exec.logs);
                state.chain.receipts.insert(cid, exec.receipt.clone());
                state
                    .chain
                    .messages
                    .insert(cid, ChainMessage::Signed(msg.clone()));
                results.push(InvocResult {
                    msg: msg.message().clone(),
                    msg_cid: Some(cid),
                    msg_rct: Some(exec.receipt),
                    error: exec.error,
                });
                messages.secp_messages.push(msg.clone());
                messages.cids.push(cid);
            }

            let header = block_header(epoch, parent.key().clone(), &messages.cids)?;
            let tipset = Arc::new(Tipset::new(vec![header.clone()])?);
            for cid in &messages.cids {
                state.chain.included.insert(
                    *cid,
                    MessageLookup {
                        tipset: tipset.key().clone(),
                        height: epoch,
                    },
                );
            }
            let entry = contract::LogsEntry::new(epoch, logs);
            state.chain.logs.insert(epoch, entry.clone());
            state.chain.replays.insert(tipset.key().clone(), results);
            let snapshot = Arc::new(state.world.clone());
            state.chain.states.insert(tipset.key().clone(), snapshot);
            state.chain.push(tipset.clone(), header, messages);
            (tipset, entry, included)
        };

        debug!(
            "mined height {} with {} messages",
            tipset.epoch(),
            included.len()
        );
        // nobody listening is fine
        let _ = self.head_changes.send(HeadChange::Apply(tipset.clone()));
        let _ = self.logs.send(entry);
        for message in included {
            let _ = self.mpool_updates.send(MpoolUpdate {
                change: MpoolChange::Remove,
                message,
            });
        }
        Ok(tipset)
    }

    /// Mines a block every `block_time` seconds until the devnet is dropped.
    pub fn spawn_miner(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.config.block_time == 0 {
            return None;
        }
        let period = Duration::from_secs(self.config.block_time);
        let devnet = Arc::downgrade(self);
        info!("mining a block every {}s", self.config.block_time);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(devnet) = devnet.upgrade() else {
                    break;
                };
                if let Err(e) = devnet.mine().await {
                    warn!("failed to mine: {e:#}");
                }
            }
        }))
    }

    fn signature(addr: &Address, payload: &[u8]) -> Signature {
        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(
            keccak_hash::keccak([addr.to_bytes().as_slice(), payload].concat()).as_bytes(),
        );
        bytes.extend_from_slice(keccak_hash::keccak(payload).as_bytes());
        bytes.push(0x1b);
        Signature::new_secp256k1(bytes)
    }
}

#[async_trait]
impl ChainReader for Devnet {
    async fn heaviest_tipset(&self) -> anyhow::Result<Arc<Tipset>> {
        self.state.read().chain.head()
    }

    async fn tipset_by_height(&self, height: ChainEpoch) -> anyhow::Result<Arc<Tipset>> {
        let state = self.state.read();
        usize::try_from(height)
            .ok()
            .and_then(|h| state.chain.tipsets.get(h).cloned())
            .with_context(|| format!("no tipset at height {height}"))
    }

    async fn load_tipset(&self, key: &TipsetKey) -> anyhow::Result<Arc<Tipset>> {
        self.state
            .read()
            .chain
            .by_key
            .get(key)
            .cloned()
            .with_context(|| format!("tipset {key} not found"))
    }

    async fn block_header(&self, cid: &Cid) -> anyhow::Result<BlockHeader> {
        self.state
            .read()
            .chain
            .headers
            .get(cid)
            .cloned()
            .with_context(|| format!("block {cid} not found"))
    }

    async fn block_messages(&self, block: &Cid) -> anyhow::Result<BlockMessages> {
        self.state
            .read()
            .chain
            .block_messages
            .get(block)
            .cloned()
            .with_context(|| format!("messages of block {block} not found"))
    }

    async fn message(&self, cid: &Cid) -> anyhow::Result<ChainMessage> {
        self.state
            .read()
            .chain
            .messages
            .get(cid)
            .cloned()
            .with_context(|| format!("message {cid} not found"))
    }

    async fn search_message(&self, cid: &Cid) -> anyhow::Result<Option<MessageLookup>> {
        Ok(self.state.read().chain.included.get(cid).cloned())
    }

    async fn actor(
        &self,
        addr: &Address,
        tipset: &TipsetKey,
    ) -> anyhow::Result<Option<ActorState>> {
        Ok(self.state.read().world_at(tipset)?.actor(addr).cloned())
    }

    async fn receipt(&self, msg: &Cid, tipset: &TipsetKey) -> anyhow::Result<Receipt> {
        let state = self.state.read();
        let executed = state
            .chain
            .by_key
            .get(tipset)
            .with_context(|| format!("tipset {tipset} not found"))?;
        let included = state
            .chain
            .included
            .get(msg)
            .with_context(|| format!("message {msg} not included"))?;
        if executed.epoch() <= included.height {
            bail!("message {msg} not executed at height {}", executed.epoch());
        }
        state
            .chain
            .receipts
            .get(msg)
            .cloned()
            .with_context(|| format!("receipt of {msg} not found"))
    }

    fn subscribe_head_changes(&self) -> broadcast::Receiver<HeadChange> {
        self.head_changes.subscribe()
    }
}

#[async_trait]
impl MessagePool for Devnet {
    async fn push(&self, msg: SignedMessage) -> anyhow::Result<Cid> {
        bump(&self.calls.push);
        self.add_pending(msg)
    }

    async fn push_message(
        &self,
        mut msg: Message,
        _spec: Option<MessageSendSpec>,
    ) -> anyhow::Result<SignedMessage> {
        bump(&self.calls.push_message);
        let head = self.heaviest_tipset().await?;
        msg.sequence = Self::next_sequence(&self.state.read(), &msg.from);
        if msg.gas_limit == 0 {
            msg.gas_limit = u64::try_from(self.estimate_gas_limit(&msg, head.key()).await?)?;
        }
        if msg.gas_premium.is_zero() {
            msg.gas_premium = self
                .estimate_gas_premium(10, &msg.from, msg.gas_limit, head.key())
                .await?;
        }
        if msg.gas_fee_cap.is_zero() {
            msg.gas_fee_cap = self.estimate_fee_cap(&msg, 20, head.key()).await?;
        }
        let signed = sign_message(self, msg).await?;
        self.add_pending(signed.clone())?;
        Ok(signed)
    }

    fn subscribe_updates(&self) -> broadcast::Receiver<MpoolUpdate> {
        self.mpool_updates.subscribe()
    }
}

#[async_trait]
impl StateCaller for Devnet {
    async fn call(&self, msg: &Message, tipset: &TipsetKey) -> anyhow::Result<InvocResult> {
        bump(&self.calls.state_call);
        let exec = self.dry_run(msg, tipset, true)?;
        Ok(InvocResult {
            msg: msg.clone(),
            msg_cid: Some(msg.cid()?),
            msg_rct: Some(exec.receipt),
            error: exec.error,
        })
    }

    async fn replay(&self, tipset: &TipsetKey) -> anyhow::Result<Vec<InvocResult>> {
        self.state
            .read()
            .chain
            .replays
            .get(tipset)
            .cloned()
            .with_context(|| format!("tipset {tipset} not found"))
    }
}

#[async_trait]
impl GasEstimator for Devnet {
    async fn estimate_gas_limit(&self, msg: &Message, tipset: &TipsetKey) -> anyhow::Result<i64> {
        bump(&self.calls.estimate_gas_limit);
        let exec = self.dry_run(msg, tipset, false)?;
        if !exec.receipt.is_success() {
            bail!(
                "estimation failed with exit code {}: {}",
                exec.receipt.exit_code,
                exec.error
            );
        }
        Ok(i64::try_from(exec.receipt.gas_used)?)
    }

    async fn estimate_gas_premium(
        &self,
        _nblocks: u64,
        _sender: &Address,
        _gas_limit: u64,
        _tipset: &TipsetKey,
    ) -> anyhow::Result<TokenAmount> {
        Ok(TokenAmount::from_atto(DEFAULT_PREMIUM))
    }

    async fn estimate_fee_cap(
        &self,
        msg: &Message,
        _max_queue_blocks: i64,
        _tipset: &TipsetKey,
    ) -> anyhow::Result<TokenAmount> {
        let head = self.heaviest_tipset().await?;
        let base_fee = &head.min_ticket_block().parent_base_fee;
        Ok(TokenAmount::from_atto(base_fee.atto() * 2) + msg.gas_premium.clone())
    }
}

#[async_trait]
impl Wallet for Devnet {
    async fn default_address(&self) -> anyhow::Result<Option<Address>> {
        Ok(self.accounts.first().copied())
    }

    async fn list_addresses(&self) -> anyhow::Result<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn sign(&self, addr: &Address, payload: &[u8]) -> anyhow::Result<Signature> {
        if !self.accounts.contains(addr) {
            bail!("no key for {addr}");
        }
        Ok(Self::signature(addr, payload))
    }
}

#[async_trait]
impl ContractStore for Devnet {
    async fn height_logs(&self, height: ChainEpoch) -> anyhow::Result<Option<contract::LogsEntry>> {
        Ok(self.state.read().chain.logs.get(&height).cloned())
    }

    async fn state_root(&self, height: ChainEpoch) -> anyhow::Result<Vec<u8>> {
        Ok(Cid::from_cbor_blake2b256(&(height, "contracts"))?.to_bytes())
    }

    fn subscribe_logs(&self) -> broadcast::Receiver<contract::LogsEntry> {
        self.logs.subscribe()
    }
}

#[async_trait]
impl NodeInfo for Devnet {
    async fn sync_status(&self) -> anyhow::Result<SyncStatus> {
        let head = self.heaviest_tipset().await?.epoch();
        Ok(SyncStatus {
            starting_block: 0,
            current_block: head,
            highest_block: head,
        })
    }

    async fn miners(&self) -> anyhow::Result<Vec<Address>> {
        Ok(vec![MINER])
    }

    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    async fn peer_count(&self) -> anyhow::Result<usize> {
        Ok(0)
    }

    fn listening(&self) -> bool {
        true
    }

    fn client_version(&self) -> String {
        format!("forest-web3/{}", env!("CARGO_PKG_VERSION"))
    }
}
