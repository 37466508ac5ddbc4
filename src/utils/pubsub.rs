// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Topic-keyed publish/subscribe fabric.
//!
//! Every topic owns one upstream channel drained by a dedicated fan-out task, which forwards
//! each message to the mailbox of every live subscriber of the topic, one subscriber after the
//! other. Each subscriber drains its mailbox on its own task and runs its handler there, so a
//! handler never runs concurrently with itself and sees messages in publication order.
//!
//! Mailbox capacity is chosen per subscriber. With small capacities a slow handler stalls the
//! fan-out of its whole topic; the registry relies on this to keep producers in step with the
//! slowest consumer.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::HashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

pub type SubscriberId = String;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PubSubError {
    #[error("topic {0} is already registered")]
    TopicExists(String),
    #[error("topic {0} not found")]
    TopicNotFound(String),
    #[error("subscriber {id} is already registered on topic {topic}")]
    SubscriberExists { topic: String, id: SubscriberId },
    #[error("subscriber {id} not found on topic {topic}")]
    SubscriberNotFound { topic: String, id: SubscriberId },
    #[error("topic {0} is closed")]
    TopicClosed(String),
}

/// A mailbox plus the task invoking a handler for everything delivered into it.
pub struct Subscriber<M> {
    id: SubscriberId,
    alive: Arc<AtomicBool>,
    mailbox: flume::Sender<M>,
}

impl<M: Send + 'static> Subscriber<M> {
    /// Creates a subscriber and spawns its delivery loop. A `capacity` of zero turns every
    /// delivery into a rendezvous with the handler.
    ///
    /// The loop ends once the subscriber is dropped and its mailbox is drained.
    pub fn spawn<F>(id: impl Into<SubscriberId>, capacity: usize, mut handler: F) -> Self
    where
        F: FnMut(M) + Send + 'static,
    {
        let id = id.into();
        let (mailbox, inbox) = flume::bounded::<M>(capacity);
        let loop_id = id.clone();
        tokio::spawn(async move {
            while let Ok(msg) = inbox.recv_async().await {
                handler(msg);
            }
            debug!("delivery loop of subscriber {loop_id} finished");
        });
        Self {
            id,
            alive: Arc::new(AtomicBool::new(true)),
            mailbox,
        }
    }
}

impl<M> Subscriber<M> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Asks the fan-out to stop delivering to this subscriber. Messages already sitting in the
    /// mailbox are still handled.
    pub fn unsubscribe(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

type Subscribers<M> = Arc<Mutex<HashMap<SubscriberId, Subscriber<M>>>>;

struct Channel<M> {
    upstream: flume::Sender<M>,
    subscribers: Subscribers<M>,
}

pub struct Publisher<K, M> {
    channels: Mutex<HashMap<K, Channel<M>>>,
}

impl<K, M> Default for Publisher<K, M> {
    fn default() -> Self {
        Self {
            channels: Mutex::new(HashMap::default()),
        }
    }
}

impl<K, M> Publisher<K, M>
where
    K: Clone + Eq + Hash + Display,
    M: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `topic` on top of `upstream` and spawns its fan-out task.
    ///
    /// The publisher takes over the sending half; the fan-out ends after the topic is removed
    /// and whatever was already queued has been forwarded.
    pub fn add_channel(
        &self,
        topic: K,
        upstream: (flume::Sender<M>, flume::Receiver<M>),
    ) -> Result<(), PubSubError> {
        let mut channels = self.channels.lock();
        if channels.contains_key(&topic) {
            return Err(PubSubError::TopicExists(topic.to_string()));
        }
        let (sender, receiver) = upstream;
        let subscribers = Subscribers::<M>::default();
        tokio::spawn(fan_out(topic.to_string(), receiver, subscribers.clone()));
        channels.insert(
            topic,
            Channel {
                upstream: sender,
                subscribers,
            },
        );
        Ok(())
    }

    /// Drops the publisher's sending half of `topic` and forgets the topic.
    ///
    /// Subscribers stay attached until the fan-out has forwarded what was already queued, then
    /// the fan-out drops them, closing their mailboxes.
    pub fn remove_channel(&self, topic: &K) -> Result<(), PubSubError> {
        self.channels
            .lock()
            .remove(topic)
            .map(drop)
            .ok_or_else(|| PubSubError::TopicNotFound(topic.to_string()))
    }

    pub fn has_channel(&self, topic: &K) -> bool {
        self.channels.lock().contains_key(topic)
    }

    pub fn add_subscriber(&self, topic: &K, subscriber: Subscriber<M>) -> Result<(), PubSubError> {
        let subscribers = self.subscribers(topic)?;
        let mut subscribers = subscribers.lock();
        if subscribers.contains_key(subscriber.id()) {
            return Err(PubSubError::SubscriberExists {
                topic: topic.to_string(),
                id: subscriber.id().to_owned(),
            });
        }
        subscribers.insert(subscriber.id().to_owned(), subscriber);
        Ok(())
    }

    /// Unsubscribes and drops the subscriber `id` of `topic`.
    pub fn remove_subscriber(&self, topic: &K, id: &str) -> Result<(), PubSubError> {
        let subscribers = self.subscribers(topic)?;
        let mut subscribers = subscribers.lock();
        let not_found = || PubSubError::SubscriberNotFound {
            topic: topic.to_string(),
            id: id.to_owned(),
        };
        subscribers.get(id).ok_or_else(not_found)?.unsubscribe();
        subscribers.remove(id).ok_or_else(not_found)?;
        Ok(())
    }

    pub fn subscriber_count(&self, topic: &K) -> usize {
        self.subscribers(topic)
            .map(|s| s.lock().len())
            .unwrap_or_default()
    }

    /// Sends `msg` onto the upstream channel of `topic`, waiting while it is full.
    pub async fn publish(&self, topic: &K, msg: M) -> Result<(), PubSubError> {
        let upstream = self
            .channels
            .lock()
            .get(topic)
            .map(|c| c.upstream.clone())
            .ok_or_else(|| PubSubError::TopicNotFound(topic.to_string()))?;
        upstream
            .send_async(msg)
            .await
            .map_err(|_| PubSubError::TopicClosed(topic.to_string()))
    }

    fn subscribers(&self, topic: &K) -> Result<Subscribers<M>, PubSubError> {
        self.channels
            .lock()
            .get(topic)
            .map(|c| c.subscribers.clone())
            .ok_or_else(|| PubSubError::TopicNotFound(topic.to_string()))
    }
}

async fn fan_out<M: Clone + Send + 'static>(
    topic: String,
    upstream: flume::Receiver<M>,
    subscribers: Subscribers<M>,
) {
    while let Ok(msg) = upstream.recv_async().await {
        let mailboxes = subscribers
            .lock()
            .values()
            .filter(|s| s.is_alive())
            .map(|s| s.mailbox.clone())
            .collect::<Vec<_>>();
        for mailbox in mailboxes {
            if mailbox.send_async(msg.clone()).await.is_err() {
                debug!("dropping message for a closed mailbox on topic {topic}");
            }
        }
    }
    subscribers.lock().clear();
    debug!("fan-out of topic {topic} finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TOPIC: &str = "blocks";

    fn collecting(id: &str, capacity: usize) -> (Subscriber<u32>, flume::Receiver<u32>) {
        let (tx, rx) = flume::unbounded();
        let sub = Subscriber::spawn(id, capacity, move |m| {
            let _ = tx.send(m);
        });
        (sub, rx)
    }

    async fn next(rx: &flume::Receiver<u32>) -> Option<u32> {
        tokio::time::timeout(Duration::from_secs(5), rx.recv_async())
            .await
            .ok()?
            .ok()
    }

    #[tokio::test]
    async fn topic_registration_errors() {
        let publisher = Publisher::<&str, u32>::new();
        assert_eq!(
            publisher.publish(&TOPIC, 1).await,
            Err(PubSubError::TopicNotFound(TOPIC.into()))
        );
        publisher.add_channel(TOPIC, flume::bounded(1)).unwrap();
        assert_eq!(
            publisher.add_channel(TOPIC, flume::bounded(1)),
            Err(PubSubError::TopicExists(TOPIC.into()))
        );
        assert!(publisher.remove_channel(&TOPIC).is_ok());
        assert_eq!(
            publisher.remove_channel(&TOPIC),
            Err(PubSubError::TopicNotFound(TOPIC.into()))
        );
    }

    #[tokio::test]
    async fn every_subscriber_sees_messages_in_order() {
        let publisher = Publisher::<&str, u32>::new();
        publisher.add_channel(TOPIC, flume::bounded(0)).unwrap();
        let (a, rx_a) = collecting("a", 0);
        let (b, rx_b) = collecting("b", 4);
        publisher.add_subscriber(&TOPIC, a).unwrap();
        publisher.add_subscriber(&TOPIC, b).unwrap();
        assert_eq!(publisher.subscriber_count(&TOPIC), 2);

        for i in 0..10 {
            publisher.publish(&TOPIC, i).await.unwrap();
        }
        for i in 0..10 {
            assert_eq!(next(&rx_a).await, Some(i));
            assert_eq!(next(&rx_b).await, Some(i));
        }
    }

    #[tokio::test]
    async fn duplicate_subscriber_is_rejected() {
        let publisher = Publisher::<&str, u32>::new();
        publisher.add_channel(TOPIC, flume::bounded(0)).unwrap();
        let (a, _rx) = collecting("a", 0);
        let (again, _rx2) = collecting("a", 0);
        publisher.add_subscriber(&TOPIC, a).unwrap();
        assert!(matches!(
            publisher.add_subscriber(&TOPIC, again),
            Err(PubSubError::SubscriberExists { .. })
        ));
    }

    #[tokio::test]
    async fn removed_subscriber_stops_receiving() {
        let publisher = Publisher::<&str, u32>::new();
        publisher.add_channel(TOPIC, flume::bounded(0)).unwrap();
        let (a, rx_a) = collecting("a", 0);
        let (b, rx_b) = collecting("b", 0);
        publisher.add_subscriber(&TOPIC, a).unwrap();
        publisher.add_subscriber(&TOPIC, b).unwrap();

        publisher.publish(&TOPIC, 1).await.unwrap();
        assert_eq!(next(&rx_a).await, Some(1));
        assert_eq!(next(&rx_b).await, Some(1));

        publisher.remove_subscriber(&TOPIC, "a").unwrap();
        assert!(publisher.remove_subscriber(&TOPIC, "a").is_err());
        publisher.publish(&TOPIC, 2).await.unwrap();
        assert_eq!(next(&rx_b).await, Some(2));
        // the delivery loop of `a` is gone, and with it the handler's sender
        assert_eq!(next(&rx_a).await, None);
    }

    #[tokio::test]
    async fn removing_topic_closes_subscribers() {
        let publisher = Publisher::<&str, u32>::new();
        publisher.add_channel(TOPIC, flume::bounded(8)).unwrap();
        let (a, rx_a) = collecting("a", 0);
        publisher.add_subscriber(&TOPIC, a).unwrap();
        publisher.publish(&TOPIC, 7).await.unwrap();
        publisher.remove_channel(&TOPIC).unwrap();

        // queued message still drains, then the loop ends
        assert_eq!(next(&rx_a).await, Some(7));
        assert_eq!(next(&rx_a).await, None);
        assert!(!publisher.has_channel(&TOPIC));
    }

    #[tokio::test]
    async fn removing_topic_drains_every_queued_message() {
        let publisher = Publisher::<&str, u32>::new();
        let (tx, rx) = flume::bounded(8);
        publisher.add_channel(TOPIC, (tx.clone(), rx)).unwrap();
        let (a, rx_a) = collecting("a", 0);
        let (b, rx_b) = collecting("b", 2);
        publisher.add_subscriber(&TOPIC, a).unwrap();
        publisher.add_subscriber(&TOPIC, b).unwrap();
        for i in 0..5 {
            publisher.publish(&TOPIC, i).await.unwrap();
        }
        publisher.remove_channel(&TOPIC).unwrap();
        // producers outside the publisher can still feed the closing topic
        tx.send_async(5).await.unwrap();
        drop(tx);

        for i in 0..6 {
            assert_eq!(next(&rx_a).await, Some(i));
            assert_eq!(next(&rx_b).await, Some(i));
        }
        assert_eq!(next(&rx_a).await, None);
        assert_eq!(next(&rx_b).await, None);
    }
}
