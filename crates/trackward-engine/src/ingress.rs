//! Bounded ingress queue for interactive train commands.
//!
//! [`IngressQueue`] buffers commands between submission and the start of
//! the next tick. It enforces a capacity limit, assigns monotonic arrival
//! sequence numbers, and hands commands to the tick engine in a
//! deterministic order.
//!
//! # Ordering
//!
//! Commands are sorted by the composite key
//! `(priority_class, train, arrival_seq)`:
//! - lower priority class values execute first (0 = host, 1 = driver);
//! - within a class, commands are grouped by train in id order;
//! - commands for the same train execute in arrival order.

use std::collections::VecDeque;

use trackward_core::{Command, CommandRejection, Receipt};

/// A command paired with its batch-local index from `submit()`.
///
/// The tick engine uses the index to build receipts after reordering.
#[derive(Debug)]
pub struct DrainedCommand {
    /// The command to execute.
    pub command: Command,
    /// The original batch-local index from the `submit()` call.
    pub command_index: usize,
}

struct QueueEntry {
    command: Command,
    command_index: usize,
}

/// Bounded command queue.
pub struct IngressQueue {
    queue: VecDeque<QueueEntry>,
    capacity: usize,
    next_arrival_seq: u64,
}

impl IngressQueue {
    /// Create a new queue with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "IngressQueue capacity must be at least 1");
        Self {
            queue: VecDeque::with_capacity(capacity),
            capacity,
            next_arrival_seq: 0,
        }
    }

    /// Submit a batch of commands.
    ///
    /// Returns one [`Receipt`] per input command. Commands are accepted in
    /// order until the queue is full; the rest receive `QueueFull`
    /// receipts. Arrival sequence numbers come from a counter that
    /// persists across calls and overwrite whatever the caller set.
    pub fn submit(&mut self, commands: Vec<Command>) -> Vec<Receipt> {
        let mut receipts = Vec::with_capacity(commands.len());

        for (i, mut cmd) in commands.into_iter().enumerate() {
            if self.queue.len() >= self.capacity {
                receipts.push(Receipt::rejected(i, CommandRejection::QueueFull));
                continue;
            }

            cmd.arrival_seq = self.next_arrival_seq;
            self.next_arrival_seq += 1;
            self.queue.push_back(QueueEntry {
                command: cmd,
                command_index: i,
            });

            receipts.push(Receipt {
                accepted: true,
                applied_tick_id: None,
                rejection: None,
                command_index: i,
            });
        }

        receipts
    }

    /// Drain the queue in execution order.
    pub fn drain(&mut self) -> Vec<DrainedCommand> {
        let mut commands: Vec<DrainedCommand> = self
            .queue
            .drain(..)
            .map(|e| DrainedCommand {
                command: e.command,
                command_index: e.command_index,
            })
            .collect();
        commands.sort_unstable_by_key(|dc| {
            (
                dc.command.priority_class,
                dc.command.train,
                dc.command.arrival_seq,
            )
        });
        commands
    }

    /// Number of commands currently buffered.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Maximum number of commands this queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all pending commands.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
