//! A cooperative, single-threaded message queue backed by a fixed-capacity
//! ring. Deferred work (PIT sweeps, retransmissions, posted callbacks) is
//! represented as `(callback, inline parameter bytes)` pairs that occupy a
//! slot in a 4096-byte logical ring; a padding record is spliced in when a
//! message would otherwise have to straddle the wrap point.
//!
//! Unlike the reference forwarder, which stores `(void*, fn ptr, length,
//! bytes)` directly in one memory block, slots here hold a boxed `FnMut`
//! closure plus its parameter bytes, and `front`/`tail` track logical byte
//! occupancy rather than real pointers — the capacity bookkeeping and
//! wrap/padding/cancel semantics are kept exactly as described, but nothing
//! here does raw pointer arithmetic.

use crate::error::Error;
use std::collections::VecDeque;

/// Ring capacity in bytes.
pub const QUEUE_CAPACITY: usize = 4096;

/// Fixed per-message accounting overhead, standing in for the reference
/// forwarder's `sizeof(ndn_msg_t)` header (target pointer, callback pointer,
/// length).
const HEADER_LEN: usize = 16;

pub type Callback = Box<dyn FnMut(&[u8])>;

/// Opaque reference to a posted message, usable with [`MessageQueue::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

enum Body {
    Padding,
    Message { callback: Callback, param: Vec<u8> },
}

struct Slot {
    id: u64,
    length: usize,
    body: Body,
}

/// A cooperative message queue with the capacity and wrap semantics of the
/// reference forwarder's `msg-queue.c`.
pub struct MessageQueue {
    entries: VecDeque<Slot>,
    front: usize,
    tail: usize,
    next_id: u64,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            front: 0,
            tail: 0,
            next_id: 0,
        }
    }

    /// Bytes of ring capacity not currently occupied by live messages or padding.
    pub fn free_bytes(&self) -> usize {
        if self.entries.is_empty() {
            QUEUE_CAPACITY
        } else if self.front > self.tail {
            self.front - self.tail - 1
        } else {
            QUEUE_CAPACITY - self.tail + self.front
        }
        .min(QUEUE_CAPACITY)
    }

    /// Drops any leading padding record and, if the queue has fully drained,
    /// rewinds front/tail to the buffer base. Mirrors the reference
    /// forwarder calling this at the top of both `post` and `dispatch`.
    pub fn empty(&mut self) -> bool {
        if let Some(front_slot) = self.entries.front() {
            if matches!(front_slot.body, Body::Padding) && self.entries.len() > 1 {
                let slot = self.entries.pop_front().unwrap();
                self.front = (self.front + slot.length) % QUEUE_CAPACITY;
            }
        }

        if self.entries.is_empty() {
            self.front = 0;
            self.tail = 0;
            true
        } else {
            false
        }
    }

    /// Enqueues `callback` with `param` as its inline argument bytes.
    /// Returns `MsgQueueFull` if there is no room even after inserting a
    /// padding record to skip a too-small tail region.
    pub fn post(&mut self, param: &[u8], callback: Callback) -> Result<Handle, Error> {
        self.empty();

        let len = HEADER_LEN + param.len();
        if len > QUEUE_CAPACITY {
            return Err(Error::MsgQueueFull);
        }

        let wrapped = self.front > self.tail;
        let space = if wrapped {
            self.front - self.tail - 1
        } else {
            QUEUE_CAPACITY - self.tail
        };

        if !wrapped || space >= len {
            if space < len || (space == len && self.front == 0) {
                return Err(Error::MsgQueueFull);
            }
        } else {
            if self.front <= len {
                return Err(Error::MsgQueueFull);
            }
            self.entries.push_back(Slot {
                id: u64::MAX,
                length: space,
                body: Body::Padding,
            });
            self.tail = 0;
        }

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        self.entries.push_back(Slot {
            id,
            length: len,
            body: Body::Message {
                callback,
                param: param.to_vec(),
            },
        });
        self.tail = (self.tail + len) % QUEUE_CAPACITY;

        Ok(Handle(id))
    }

    /// Converts a still-pending message into a padding record in place.
    /// Safe to call even if the message has already been dispatched (a
    /// no-op in that case).
    pub fn cancel(&mut self, handle: Handle) {
        for slot in self.entries.iter_mut() {
            if slot.id == handle.0 {
                slot.body = Body::Padding;
                return;
            }
        }
    }

    /// Runs the next pending message's callback, if any. Returns `false`
    /// when the queue has nothing left to dispatch.
    pub fn dispatch(&mut self) -> bool {
        if self.empty() {
            return false;
        }

        let slot = self.entries.pop_front().expect("checked non-empty above");
        self.front = (self.front + slot.length) % QUEUE_CAPACITY;

        match slot.body {
            Body::Padding => self.dispatch(),
            Body::Message { mut callback, param } => {
                callback(&param);
                true
            }
        }
    }

    /// Drains messages queued as of this call, running each callback once.
    /// Messages posted by a callback during this call run on a later
    /// `process()`, never the same one. Returns the number of real
    /// messages (excluding padding) that were executed.
    pub fn process(&mut self) -> usize {
        let snapshot = self.entries.len();
        let mut dispatched = 0;
        let mut steps = 0;
        while steps < snapshot {
            if self.entries.is_empty() {
                break;
            }
            let was_padding = matches!(self.entries.front().unwrap().body, Body::Padding);
            if !self.dispatch() {
                break;
            }
            if !was_padding {
                dispatched += 1;
            }
            steps += 1;
        }
        dispatched
    }

    pub fn is_empty(&mut self) -> bool {
        self.empty()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    #[test]
    fn post_and_dispatch_runs_callback() {
        let mut queue = MessageQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        queue
            .post(b"hi", Box::new(move |param| seen2.lock().unwrap().push(param.to_vec())))
            .unwrap();
        assert!(queue.dispatch());
        assert_eq!(seen.lock().unwrap()[0], b"hi");
    }

    #[test]
    fn cancel_prevents_dispatch() {
        let mut queue = MessageQueue::new();
        let ran = Arc::new(Mutex::new(false));
        let ran2 = ran.clone();
        let handle = queue.post(b"", Box::new(move |_| *ran2.lock().unwrap() = true)).unwrap();
        queue.cancel(handle);
        queue.dispatch();
        assert!(!*ran.lock().unwrap());
    }

    #[test]
    fn process_does_not_run_messages_posted_during_itself() {
        let mut queue = MessageQueue::new();
        let count = Rc::new(RefCell::new(0));
        let count_in_closure = count.clone();
        queue
            .post(b"", Box::new(move |_| *count_in_closure.borrow_mut() += 1))
            .unwrap();
        let dispatched = queue.process();
        assert_eq!(dispatched, 1);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn empty_resets_to_base_when_drained() {
        let mut queue = MessageQueue::new();
        queue.post(b"x", Box::new(|_| {})).unwrap();
        queue.dispatch();
        assert!(queue.is_empty());
        assert_eq!(queue.free_bytes(), QUEUE_CAPACITY);
    }

    #[test]
    fn fills_up_and_reports_full() {
        let mut queue = MessageQueue::new();
        let mut posted = 0;
        loop {
            match queue.post(&[0u8; 32], Box::new(|_| {})) {
                Ok(_) => posted += 1,
                Err(Error::MsgQueueFull) => break,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert!(posted > 0);
    }
}
