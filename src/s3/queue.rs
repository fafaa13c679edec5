use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::{Mutex, Notify, mpsc};

/// Default number of pending paths buffered between the walk and the workers
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("work queue is closed")]
pub struct QueueClosed;

struct Shared<T> {
    rx: Mutex<mpsc::Receiver<T>>,
    /// Items put but not yet marked done: queued plus in flight
    unfinished: AtomicUsize,
    drained: Notify,
}

impl<T> Shared<T> {
    fn task_done(&self) {
        if self.unfinished.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Bounded multi-consumer FIFO with a join barrier
///
/// The owner is the single producer. `put` waits while the queue is full,
/// which keeps memory flat no matter how many files the walk yields.
/// Consumers pull through cloned [`WorkReceiver`]s and every item stays
/// "unfinished" until the [`Task`] guard handed out by `get` is dropped, so
/// [`WorkQueue::join`] only returns once all work has been queued, dequeued
/// and completed.
pub struct WorkQueue<T> {
    tx: Option<mpsc::Sender<T>>,
    shared: Arc<Shared<T>>,
}

impl<T> WorkQueue<T> {
    /// Create a queue holding at most `capacity` pending items
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: Some(tx),
            shared: Arc::new(Shared {
                rx: Mutex::new(rx),
                unfinished: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    pub fn receiver(&self) -> WorkReceiver<T> {
        WorkReceiver {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Enqueue an item, waiting for a free slot if the queue is full
    ///
    /// Cancel safe: if the future is dropped before it completes, nothing is
    /// enqueued and the unfinished count is untouched.
    pub async fn put(&self, item: T) -> Result<(), QueueClosed> {
        let tx = self.tx.as_ref().ok_or(QueueClosed)?;
        let permit = tx.reserve().await.map_err(|_| QueueClosed)?;
        self.shared.unfinished.fetch_add(1, Ordering::AcqRel);
        permit.send(item);
        Ok(())
    }

    /// Stop accepting work. Consumers drain what is left, then `get` yields `None`.
    pub fn close(&mut self) {
        self.tx = None;
    }

    pub fn unfinished(&self) -> usize {
        self.shared.unfinished.load(Ordering::Acquire)
    }

    /// Wait until every item put so far has been marked done
    pub async fn join(&self) {
        loop {
            // Register before checking so a concurrent final `task_done`
            // cannot slip between the check and the wait.
            let notified = self.shared.drained.notified();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Consumer side of a [`WorkQueue`]
pub struct WorkReceiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for WorkReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> WorkReceiver<T> {
    /// Wait for the next item; `None` once the queue is closed and empty
    pub async fn get(&self) -> Option<Task<T>> {
        let item = {
            let mut rx = self.shared.rx.lock().await;
            rx.recv().await
        }?;

        Some(Task {
            item,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// An in-flight item. Dropping it marks the item done.
pub struct Task<T> {
    item: T,
    shared: Arc<Shared<T>>,
}

impl<T> Task<T> {
    pub fn item(&self) -> &T {
        &self.item
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        self.shared.task_done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_put_blocks_when_full() {
        let queue = WorkQueue::new(1);
        let rx = queue.receiver();

        queue.put(1).await.unwrap();
        let blocked = timeout(Duration::from_millis(50), queue.put(2)).await;
        assert!(blocked.is_err(), "put should wait while the queue is full");
        assert_eq!(queue.unfinished(), 1);

        let task = rx.get().await.unwrap();
        assert_eq!(*task.item(), 1);
        queue.put(2).await.unwrap();
        assert_eq!(queue.unfinished(), 2);
    }

    #[tokio::test]
    async fn test_join_waits_for_in_flight_tasks() {
        let queue = WorkQueue::new(4);
        let rx = queue.receiver();

        queue.put("a").await.unwrap();
        let task = rx.get().await.unwrap();

        // Dequeued but not done: the barrier must still hold
        assert!(timeout(Duration::from_millis(50), queue.join()).await.is_err());

        drop(task);
        timeout(Duration::from_secs(1), queue.join())
            .await
            .expect("join should return once the task is done");
    }

    #[tokio::test]
    async fn test_join_on_empty_queue_returns_immediately() {
        let queue: WorkQueue<u32> = WorkQueue::new(4);
        timeout(Duration::from_millis(50), queue.join())
            .await
            .expect("nothing was put");
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let mut queue = WorkQueue::new(4);
        let rx = queue.receiver();

        queue.put(1).await.unwrap();
        queue.put(2).await.unwrap();
        queue.close();

        assert_eq!(queue.put(3).await, Err(QueueClosed));
        assert_eq!(*rx.get().await.unwrap().item(), 1);
        assert_eq!(*rx.get().await.unwrap().item(), 2);
        assert!(rx.get().await.is_none());
        assert_eq!(queue.unfinished(), 0);
    }

    #[tokio::test]
    async fn test_every_item_delivered_once_across_consumers() {
        let mut queue = WorkQueue::new(3);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut consumers = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let rx = queue.receiver();
            let seen = Arc::clone(&seen);
            consumers.spawn(async move {
                while let Some(task) = rx.get().await {
                    seen.lock().unwrap().push(*task.item());
                    tokio::task::yield_now().await;
                }
            });
        }

        for i in 0..100 {
            queue.put(i).await.unwrap();
        }
        queue.close();
        queue.join().await;
        while consumers.join_next().await.is_some() {}

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }
}
