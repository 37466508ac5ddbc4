// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Server-side filters polled through `eth_getFilterChanges`/`eth_getFilterLogs`.
//!
//! Every filter subscribes to the topic of its kind on a [`Publisher`]. Topics are created on
//! first use, each fed by a bridge from the node's notification streams (see [`bridge`]). The
//! subscriber handler appends into the filter's accumulator; polls read from it. Filters that
//! are not polled for [`FilterConfig::idle_timeout`] are evicted by a periodic sweep.

pub mod bridge;
pub mod criteria;

use std::sync::Arc;
use std::time::Duration;

use ahash::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use self::bridge::EventSource;
use self::criteria::{FilterCriteria, entry_logs};
use super::errors::EthError;
use super::types::{EthLog, FilterChanges, Hash};
use crate::shim::actors::contract::LogsEntry;
use crate::shim::clock::ChainEpoch;
use crate::utils::misc::env::env_or_default;
use crate::utils::pubsub::{PubSubError, Publisher, Subscriber};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum FilterKind {
    Logs,
    Blocks,
    PendingTransactions,
}

/// What flows through the filter topics.
#[derive(Clone, Debug)]
pub enum FilterEvent {
    Logs(Arc<LogsEntry>),
    Hash(Hash),
}

pub(crate) type FilterPublisher = Publisher<FilterKind, FilterEvent>;

/// Random filter identifier, rendered as a quantity: `0x` and no leading zeros.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(transparent)]
pub struct FilterId(String);

impl FilterId {
    pub fn new() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        match raw.trim_start_matches('0') {
            "" => Self("0x0".into()),
            digits => Self(format!("0x{digits}")),
        }
    }
}

impl Default for FilterId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for FilterId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Seconds a filter may go unpolled before it is evicted.
    pub idle_timeout: u64,
    /// Seconds between two eviction sweeps.
    pub sweep_interval: u64,
    pub max_filters: usize,
    /// Accumulated entries kept per filter; the oldest are dropped beyond this.
    pub max_filter_results: usize,
    /// Widest height range a single `eth_getLogs` may scan.
    pub max_filter_height_range: ChainEpoch,
    /// Capacity of the block notification topic.
    pub block_upstream_capacity: usize,
    /// Capacity of the log and pending transaction topics, `0` for a rendezvous.
    pub upstream_capacity: usize,
    /// Capacity of every filter mailbox. With `0` a slow filter holds up its whole topic.
    pub mailbox_capacity: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            idle_timeout: 300,
            sweep_interval: 300,
            max_filters: 100,
            max_filter_results: 10_000,
            max_filter_height_range: 2880,
            block_upstream_capacity: 1024,
            upstream_capacity: 0,
            mailbox_capacity: 0,
        }
    }
}

impl FilterConfig {
    /// Applies the `FOREST_WEB3_*` limit overrides from the environment.
    pub fn with_env_overrides(self) -> Self {
        Self {
            max_filters: env_or_default("FOREST_WEB3_MAX_FILTERS", self.max_filters),
            max_filter_results: env_or_default(
                "FOREST_WEB3_MAX_FILTER_RESULTS",
                self.max_filter_results,
            ),
            max_filter_height_range: env_or_default(
                "FOREST_WEB3_MAX_FILTER_HEIGHT_RANGE",
                self.max_filter_height_range,
            ),
            ..self
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn sweep_interval(&self) -> Duration {
        // a zero period would make `interval` panic
        Duration::from_secs(self.sweep_interval.max(1))
    }

    fn upstream_capacity(&self, kind: FilterKind) -> usize {
        match kind {
            FilterKind::Blocks => self.block_upstream_capacity,
            FilterKind::Logs | FilterKind::PendingTransactions => self.upstream_capacity,
        }
    }
}

#[derive(Debug)]
enum Collected {
    Logs(Vec<EthLog>),
    Hashes(Vec<Hash>),
}

impl Collected {
    fn len(&self) -> usize {
        match self {
            Self::Logs(v) => v.len(),
            Self::Hashes(v) => v.len(),
        }
    }

    fn drop_oldest(&mut self, n: usize) {
        match self {
            Self::Logs(v) => drop(v.drain(..n)),
            Self::Hashes(v) => drop(v.drain(..n)),
        }
    }

    fn since(&self, cursor: usize) -> FilterChanges {
        match self {
            Self::Logs(v) => FilterChanges::Logs(v.get(cursor..).unwrap_or_default().to_vec()),
            Self::Hashes(v) => FilterChanges::Hashes(v.get(cursor..).unwrap_or_default().to_vec()),
        }
    }
}

#[derive(Debug)]
struct FilterState {
    collected: Collected,
    /// Entries already handed out by `eth_getFilterChanges`.
    delivered: usize,
    last_active: Instant,
}

#[derive(Debug)]
pub struct Filter {
    id: FilterId,
    kind: FilterKind,
    criteria: FilterCriteria,
    max_results: usize,
    state: Mutex<FilterState>,
}

impl Filter {
    fn new(kind: FilterKind, criteria: FilterCriteria, max_results: usize) -> Self {
        let collected = match kind {
            FilterKind::Logs => Collected::Logs(vec![]),
            FilterKind::Blocks | FilterKind::PendingTransactions => Collected::Hashes(vec![]),
        };
        Self {
            id: FilterId::new(),
            kind,
            criteria,
            max_results,
            state: Mutex::new(FilterState {
                collected,
                delivered: 0,
                last_active: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> &FilterId {
        &self.id
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    fn handle(&self, event: FilterEvent) {
        let mut state = self.state.lock();
        match (&mut state.collected, event) {
            (Collected::Logs(logs), FilterEvent::Logs(entry)) => {
                logs.extend(entry_logs(&entry, &self.criteria))
            }
            (Collected::Hashes(hashes), FilterEvent::Hash(hash)) => hashes.push(hash),
            (_, event) => {
                warn!("filter {} ignores unexpected event {event:?}", self.id);
                return;
            }
        }
        let overflow = state.collected.len().saturating_sub(self.max_results);
        if overflow > 0 {
            state.collected.drop_oldest(overflow);
            state.delivered = state.delivered.saturating_sub(overflow);
            crate::metrics::FILTER_RESULTS_DROPPED.inc_by(overflow as u64);
        }
    }

    /// Everything accumulated since the previous call, advancing the cursor.
    pub fn take_changes(&self) -> FilterChanges {
        let mut state = self.state.lock();
        let changes = state.collected.since(state.delivered);
        state.delivered = state.collected.len();
        changes
    }

    /// Every log accumulated so far; leaves the cursor alone.
    pub fn all_logs(&self) -> Option<Vec<EthLog>> {
        match &self.state.lock().collected {
            Collected::Logs(logs) => Some(logs.clone()),
            Collected::Hashes(_) => None,
        }
    }

    fn touch(&self, now: Instant) {
        self.state.lock().last_active = now;
    }

    fn idle_since(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state.lock().last_active)
    }
}

/// Owner of every live filter.
pub struct FilterRegistry {
    filters: Mutex<HashMap<FilterId, Arc<Filter>>>,
    publisher: Arc<FilterPublisher>,
    source: Arc<dyn EventSource>,
    config: FilterConfig,
}

impl FilterRegistry {
    pub fn new(source: Arc<dyn EventSource>, config: FilterConfig) -> Self {
        Self {
            filters: Mutex::new(HashMap::default()),
            publisher: Arc::new(Publisher::new()),
            source,
            config,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.filters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Installs a filter of `kind` and subscribes it to its topic, creating the topic on first
    /// use. `criteria` only matters for log filters.
    pub fn register(
        &self,
        kind: FilterKind,
        criteria: FilterCriteria,
    ) -> Result<FilterId, EthError> {
        let filter = Arc::new(Filter::new(kind, criteria, self.config.max_filter_results));
        let id = filter.id().clone();
        {
            let mut filters = self.filters.lock();
            if filters.len() >= self.config.max_filters {
                return Err(EthError::TooManyFilters(self.config.max_filters));
            }
            filters.insert(id.clone(), filter.clone());
            crate::metrics::FILTERS_ACTIVE.set(filters.len() as i64);
        }
        if let Err(e) = self.subscribe(filter) {
            self.unregister(&id);
            return Err(anyhow::Error::from(e).into());
        }
        debug!("installed {kind} filter {id}");
        Ok(id)
    }

    fn subscribe(&self, filter: Arc<Filter>) -> Result<(), PubSubError> {
        let kind = filter.kind();
        self.ensure_channel(kind)?;
        let id = filter.id().to_string();
        let subscriber = Subscriber::spawn(id, self.config.mailbox_capacity, move |event| {
            filter.handle(event)
        });
        self.publisher.add_subscriber(&kind, subscriber)
    }

    fn ensure_channel(&self, kind: FilterKind) -> Result<(), PubSubError> {
        if self.publisher.has_channel(&kind) {
            return Ok(());
        }
        let upstream = flume::bounded(self.config.upstream_capacity(kind));
        match self.publisher.add_channel(kind, upstream) {
            Ok(()) => {
                bridge::spawn(kind, self.source.as_ref(), self.publisher.clone());
                debug!("opened {kind} topic");
                Ok(())
            }
            // another caller got there first
            Err(PubSubError::TopicExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Looks up a filter and marks it active.
    pub fn get(&self, id: &FilterId) -> Result<Arc<Filter>, EthError> {
        let filters = self.filters.lock();
        let filter = filters
            .get(id)
            .ok_or_else(|| EthError::FilterNotFound(id.to_string()))?;
        filter.touch(Instant::now());
        Ok(filter.clone())
    }

    /// Removes a filter and its subscription; `false` if it was not installed.
    pub fn unregister(&self, id: &FilterId) -> bool {
        let removed = {
            let mut filters = self.filters.lock();
            let removed = filters.remove(id);
            crate::metrics::FILTERS_ACTIVE.set(filters.len() as i64);
            removed
        };
        match removed {
            Some(filter) => {
                self.unsubscribe(&filter);
                true
            }
            None => false,
        }
    }

    fn unsubscribe(&self, filter: &Filter) {
        if let Err(e) = self
            .publisher
            .remove_subscriber(&filter.kind(), filter.id().as_ref())
        {
            debug!("filter {} had no live subscription: {e}", filter.id());
        }
    }

    pub fn changes(&self, id: &FilterId) -> Result<FilterChanges, EthError> {
        Ok(self.get(id)?.take_changes())
    }

    pub fn logs(&self, id: &FilterId) -> Result<Vec<EthLog>, EthError> {
        self.get(id)?
            .all_logs()
            .ok_or_else(|| EthError::FilterNotFound(id.to_string()))
    }

    /// Evicts every filter idle for at least the configured timeout, returning how many went.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let timeout = self.config.idle_timeout();
        let evicted = {
            let mut filters = self.filters.lock();
            let idle = filters
                .iter()
                .filter(|(_, f)| f.idle_since(now) >= timeout)
                .map(|(id, _)| id.clone())
                .collect::<Vec<_>>();
            let evicted = idle
                .iter()
                .filter_map(|id| filters.remove(id))
                .collect::<Vec<_>>();
            crate::metrics::FILTERS_ACTIVE.set(filters.len() as i64);
            evicted
        };
        for filter in &evicted {
            debug!("evicting idle filter {}", filter.id());
            self.unsubscribe(filter);
        }
        evicted.len()
    }

    /// Spawns the periodic eviction sweep. It stops once the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let period = self.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.evict_idle(Instant::now());
                if evicted > 0 {
                    debug!("evicted {evicted} idle filters");
                }
            }
        })
    }
}

impl AsRef<str> for FilterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
