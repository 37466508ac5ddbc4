// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Bridges from the node's notification streams into filter topics.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::{FilterEvent, FilterKind, FilterPublisher};
use crate::chain::{ChainReader, HeadChange};
use crate::contracts::ContractStore;
use crate::message_pool::{MessagePool, MpoolChange, MpoolUpdate};
use crate::rpc::methods::eth::types::Hash;
use crate::shim::actors::contract::LogsEntry;

/// Streams feeding the filter topics.
pub trait EventSource: Send + Sync {
    fn head_changes(&self) -> broadcast::Receiver<HeadChange>;

    fn mpool_updates(&self) -> broadcast::Receiver<MpoolUpdate>;

    fn logs(&self) -> broadcast::Receiver<LogsEntry>;
}

/// [`EventSource`] backed by the node's collaborators.
pub struct ChainEventSource {
    pub chain: Arc<dyn ChainReader>,
    pub mpool: Arc<dyn MessagePool>,
    pub contracts: Arc<dyn ContractStore>,
}

impl EventSource for ChainEventSource {
    fn head_changes(&self) -> broadcast::Receiver<HeadChange> {
        self.chain.subscribe_head_changes()
    }

    fn mpool_updates(&self) -> broadcast::Receiver<MpoolUpdate> {
        self.mpool.subscribe_updates()
    }

    fn logs(&self) -> broadcast::Receiver<LogsEntry> {
        self.contracts.subscribe_logs()
    }
}

/// Subscribes to the stream behind `kind` and spawns the task forwarding it into the topic.
///
/// The subscription is taken before returning so nothing emitted afterwards is missed.
pub(super) fn spawn(kind: FilterKind, source: &dyn EventSource, publisher: Arc<FilterPublisher>) {
    match kind {
        FilterKind::Logs => forward(kind, source.logs(), publisher, |entry| {
            vec![FilterEvent::Logs(Arc::new(entry))]
        }),
        FilterKind::Blocks => forward(kind, source.head_changes(), publisher, block_hashes),
        FilterKind::PendingTransactions => {
            forward(kind, source.mpool_updates(), publisher, pending_hashes)
        }
    }
}

fn block_hashes(change: HeadChange) -> Vec<FilterEvent> {
    match change {
        HeadChange::Apply(ts) => ts
            .key()
            .cids()
            .first()
            .map(|cid| FilterEvent::Hash(Hash::from(cid)))
            .into_iter()
            .collect(),
        HeadChange::Revert(_) => vec![],
    }
}

fn pending_hashes(update: MpoolUpdate) -> Vec<FilterEvent> {
    if update.change != MpoolChange::Add {
        return vec![];
    }
    match update.message.cid() {
        Ok(cid) => vec![FilterEvent::Hash(cid.into())],
        Err(e) => {
            warn!("skipping pending message without a CID: {e:#}");
            vec![]
        }
    }
}

fn forward<T, F>(
    kind: FilterKind,
    mut upstream: broadcast::Receiver<T>,
    publisher: Arc<FilterPublisher>,
    mut convert: F,
) where
    T: Clone + Send + 'static,
    F: FnMut(T) -> Vec<FilterEvent> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match upstream.recv().await {
                Ok(item) => {
                    for event in convert(item) {
                        if let Err(e) = publisher.publish(&kind, event).await {
                            debug!("{kind} bridge stopped: {e}");
                            return;
                        }
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("{kind} bridge lagged behind, {n} events lost"),
                Err(RecvError::Closed) => break,
            }
        }
        debug!("{kind} notifications closed");
        if let Err(e) = publisher.remove_channel(&kind) {
            debug!("{kind} topic already gone: {e}");
        }
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::utils::pubsub::PubSubError;

    /// Every stream is closed from the start.
    struct Closed;

    impl EventSource for Closed {
        fn head_changes(&self) -> broadcast::Receiver<HeadChange> {
            broadcast::channel(1).1
        }

        fn mpool_updates(&self) -> broadcast::Receiver<MpoolUpdate> {
            broadcast::channel(1).1
        }

        fn logs(&self) -> broadcast::Receiver<LogsEntry> {
            broadcast::channel(1).1
        }
    }

    async fn wait_for_removal(publisher: &FilterPublisher, kind: FilterKind) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while publisher.has_channel(&kind) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn closed_upstream_removes_the_topic() {
        let publisher = Arc::new(FilterPublisher::new());
        for kind in [
            FilterKind::Logs,
            FilterKind::Blocks,
            FilterKind::PendingTransactions,
        ] {
            publisher.add_channel(kind, flume::bounded(0)).unwrap();
            spawn(kind, &Closed, publisher.clone());
            wait_for_removal(&publisher, kind).await;
            assert_eq!(
                publisher.remove_channel(&kind),
                Err(PubSubError::TopicNotFound(kind.to_string()))
            );
        }
    }
}
