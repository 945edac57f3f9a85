//! Bounded concurrent FIFO queues
//!
//! A small hand-off primitive: a fixed-capacity first-in-first-out queue
//! that any number of producers and consumers may use concurrently
//! without external locking. Both operations are non-blocking (`push`
//! hands the item back when the queue is full, `pop` returns `None` when
//! it is empty) so callers decide their own waiting/backoff policy.
//!
//! Built on a bounded crossbeam channel where both ends are held by the
//! queue itself, which keeps the channel permanently connected for the
//! queue's lifetime.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

/// A bounded multi-producer/multi-consumer FIFO queue.
///
/// FIFO order is preserved: items pop in the order they were pushed.
/// With several concurrent consumers each item is delivered to exactly
/// one of them.
pub struct TaskQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> TaskQueue<T> {
    /// Create a queue that holds at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; a zero-capacity channel is a
    /// rendezvous, not a queue.
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Attempt to enqueue an item without blocking.
    ///
    /// Returns `Err(item)` when the queue is at capacity so the caller
    /// keeps ownership and may retry.
    pub fn push(&self, item: T) -> Result<(), T> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) => Err(item),
            // Both ends live in self, so the channel cannot disconnect.
            Err(TrySendError::Disconnected(item)) => Err(item),
        }
    }

    /// Attempt to dequeue the oldest item without blocking.
    pub fn pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Whether the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Maximum number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::bounded(8);
        for i in 0..5 {
            queue.push(i).unwrap();
        }

        for i in 0..5 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_push_full_returns_item() {
        let queue = TaskQueue::bounded(2);
        queue.push("a").unwrap();
        queue.push("b").unwrap();

        // Third push must hand ownership back
        assert_eq!(queue.push("c"), Err("c"));
        assert_eq!(queue.len(), 2);

        // Draining one slot makes the retry succeed
        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.push("c"), Ok(()));
    }

    #[test]
    fn test_empty_and_len() {
        let queue = TaskQueue::bounded(4);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);

        queue.push(1).unwrap();
        assert!(!queue.is_empty());
        assert_eq!(queue.len(), 1);

        queue.pop();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity() {
        let queue = TaskQueue::<u32>::bounded(16);
        assert_eq!(queue.capacity(), 16);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_capacity_panics() {
        let _ = TaskQueue::<u32>::bounded(0);
    }

    #[test]
    fn test_concurrent_producers_single_consumer() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;

        let queue = TaskQueue::bounded(64);
        let mut handles = Vec::new();

        for p in 0..PRODUCERS {
            let queue = queue.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    let mut item = (p, i);
                    loop {
                        match queue.push(item) {
                            Ok(()) => break,
                            Err(back) => {
                                item = back;
                                std::thread::yield_now();
                            }
                        }
                    }
                }
            }));
        }

        let mut received = Vec::new();
        while received.len() < PRODUCERS * PER_PRODUCER {
            if let Some(item) = queue.pop() {
                received.push(item);
            } else {
                std::thread::yield_now();
            }
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // Every item arrives exactly once, and per-producer order holds
        assert_eq!(received.len(), PRODUCERS * PER_PRODUCER);
        for p in 0..PRODUCERS {
            let seq: Vec<usize> = received.iter().filter(|(who, _)| *who == p).map(|(_, i)| *i).collect();
            assert_eq!(seq, (0..PER_PRODUCER).collect::<Vec<_>>());
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u32),
        Pop,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![any::<u32>().prop_map(Op::Push), Just(Op::Pop)]
    }

    proptest! {
        #[test]
        fn test_behaves_like_bounded_vecdeque(
            capacity in 1usize..16,
            ops in proptest::collection::vec(op_strategy(), 0..64),
        ) {
            let queue = TaskQueue::bounded(capacity);
            let mut model: VecDeque<u32> = VecDeque::new();

            for op in ops {
                match op {
                    Op::Push(value) => {
                        let accepted = queue.push(value).is_ok();
                        if model.len() < capacity {
                            prop_assert!(accepted);
                            model.push_back(value);
                        } else {
                            prop_assert!(!accepted);
                        }
                    }
                    Op::Pop => {
                        prop_assert_eq!(queue.pop(), model.pop_front());
                    }
                }
                prop_assert_eq!(queue.len(), model.len());
                prop_assert_eq!(queue.is_empty(), model.is_empty());
            }
        }
    }
}
