//! Bounded, shutdown-aware producer/consumer queue (§4.3), grounded in the
//! original `utils/ts_queue.c` mutex + two-condition-variable ring buffer;
//! here a `tokio::sync::Mutex<VecDeque<T>>` plays the role of the mutex and
//! a pair of `tokio::sync::Notify` play the role of `cond_not_empty` /
//! `cond_not_full`. `Notify::notify_one` stores a permit for a future
//! waiter when nobody is currently waiting, which is what makes the
//! check-then-wait loop below race-free without an extra generation counter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

/// Returned when an operation could not complete because the queue has
/// been shut down, per §4.3's invariant: "after shutdown, no successful
/// enqueues; after shutdown AND empty, all dequeues fail."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

pub struct Queue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
    shutdown: AtomicBool,
}

impl<T> Queue<T> {
    pub fn new(capacity: usize) -> Arc<Queue<T>> {
        Arc::new(Queue {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Blocks while full and not shut down; fails once shut down.
    pub async fn enqueue(&self, item: T) -> Result<(), QueueClosed> {
        let mut item = Some(item);
        loop {
            {
                let mut guard = self.items.lock().await;
                if self.shutdown.load(Ordering::SeqCst) {
                    return Err(QueueClosed);
                }
                if guard.len() < self.capacity {
                    guard.push_back(item.take().expect("enqueue item consumed twice"));
                    drop(guard);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }
            self.not_full.notified().await;
        }
    }

    /// Blocks while empty and not shut down; drains remaining items even
    /// after shutdown, only failing once shut down AND empty.
    pub async fn dequeue(&self) -> Result<T, QueueClosed> {
        loop {
            {
                let mut guard = self.items.lock().await;
                if let Some(item) = guard.pop_front() {
                    drop(guard);
                    self.not_full.notify_one();
                    return Ok(item);
                }
                if self.shutdown.load(Ordering::SeqCst) {
                    return Err(QueueClosed);
                }
            }
            self.not_empty.notified().await;
        }
    }

    /// Idempotent; wakes every waiter so blocked enqueues/dequeues can
    /// observe the new state and return.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn enqueue_dequeue_fifo() {
        let q: Arc<Queue<i32>> = Queue::new(4);
        q.enqueue(1).await.unwrap();
        q.enqueue(2).await.unwrap();
        assert_eq!(q.dequeue().await.unwrap(), 1);
        assert_eq!(q.dequeue().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn dequeue_blocks_until_item_arrives() {
        let q: Arc<Queue<i32>> = Queue::new(4);
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.dequeue().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.enqueue(42).await.unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), 42);
    }

    #[tokio::test]
    async fn enqueue_blocks_while_full() {
        let q: Arc<Queue<i32>> = Queue::new(1);
        q.enqueue(1).await.unwrap();
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.enqueue(2).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(q.len().await, 1);
        q.dequeue().await.unwrap();
        handle.await.unwrap().unwrap();
        assert_eq!(q.len().await, 1);
    }

    #[tokio::test]
    async fn shutdown_fails_enqueue_and_drains_then_fails_dequeue() {
        let q: Arc<Queue<i32>> = Queue::new(4);
        q.enqueue(1).await.unwrap();
        q.shutdown();
        assert_eq!(q.enqueue(2).await, Err(QueueClosed));
        assert_eq!(q.dequeue().await, Ok(1));
        assert_eq!(q.dequeue().await, Err(QueueClosed));
    }

    #[tokio::test]
    async fn shutdown_wakes_blocked_dequeue() {
        let q: Arc<Queue<i32>> = Queue::new(4);
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.dequeue().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.shutdown();
        assert_eq!(handle.await.unwrap(), Err(QueueClosed));
    }
}
