//! Bounded utterance FIFO between capture and the controller
//!
//! The producer never waits: when full, the oldest entry is evicted. The
//! single consumer waits with an optional timeout.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// One unit of recognized speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Recognizer confidence in `[0, 1]`, when the recognizer reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

/// Result of offering an utterance to the queue
#[derive(Debug, Clone, PartialEq)]
pub enum Offer<R> {
    Queued,
    /// Queued, and the oldest entry was evicted to make room
    Evicted(Utterance),
    /// The admission check refused it
    Refused(R),
}

#[derive(Debug)]
pub struct UtteranceQueue {
    items: Mutex<VecDeque<Utterance>>,
    notify: Notify,
    capacity: usize,
}

impl UtteranceQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    fn items(&self) -> MutexGuard<'_, VecDeque<Utterance>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Enqueue if `admit` allows it. `admit` runs under the queue lock, so
    /// its verdict holds at the instant of insertion.
    pub fn offer<R>(&self, utterance: Utterance, admit: impl FnOnce() -> Result<(), R>) -> Offer<R> {
        let mut items = self.items();
        if let Err(reason) = admit() {
            return Offer::Refused(reason);
        }

        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(utterance);
        drop(items);

        self.notify.notify_one();
        match evicted {
            Some(old) => Offer::Evicted(old),
            None => Offer::Queued,
        }
    }

    /// Enqueue unconditionally; returns the evicted entry, if any
    pub fn push(&self, utterance: Utterance) -> Option<Utterance> {
        match self.offer::<()>(utterance, || Ok(())) {
            Offer::Evicted(old) => Some(old),
            _ => None,
        }
    }

    pub fn try_pop(&self) -> Option<Utterance> {
        self.items().pop_front()
    }

    /// Wait for the next utterance
    pub async fn pop(&self) -> Utterance {
        loop {
            if let Some(utterance) = self.try_pop() {
                return utterance;
            }
            self.notify.notified().await;
        }
    }

    /// Wait up to `timeout` for the next utterance
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<Utterance> {
        tokio::time::timeout(timeout, self.pop()).await.ok()
    }

    /// Drop everything queued; returns how many were dropped
    pub fn clear(&self) -> usize {
        let mut items = self.items();
        let n = items.len();
        items.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = UtteranceQueue::new(4);
        queue.push(Utterance::new("one"));
        queue.push(Utterance::new("two"));
        assert_eq!(queue.try_pop().unwrap().text, "one");
        assert_eq!(queue.try_pop().unwrap().text, "two");
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let queue = UtteranceQueue::new(2);
        assert!(queue.push(Utterance::new("a")).is_none());
        assert!(queue.push(Utterance::new("b")).is_none());
        assert_eq!(queue.push(Utterance::new("c")).unwrap().text, "a");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().text, "b");
    }

    #[test]
    fn test_refused_offer_leaves_queue_untouched() {
        let queue = UtteranceQueue::new(2);
        let offer = queue.offer(Utterance::new("echo"), || Err("speaking"));
        assert_eq!(offer, Offer::Refused("speaking"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let queue = UtteranceQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push(Utterance::new("a"));
        queue.push(Utterance::new("b"));
        assert_eq!(queue.try_pop().unwrap().text, "b");
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = std::sync::Arc::new(UtteranceQueue::new(4));
        let producer = std::sync::Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.push(Utterance::new("late"));
        });
        assert_eq!(queue.pop().await.text, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_timeout_expires() {
        let queue = UtteranceQueue::new(4);
        assert!(queue.pop_timeout(Duration::from_secs(5)).await.is_none());
        queue.push(Utterance::new("now"));
        assert_eq!(queue.pop_timeout(Duration::from_secs(5)).await.unwrap().text, "now");
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Utterance::new("x").with_confidence(1.7).confidence, Some(1.0));
    }
}
