//! Per-member exclusion for incremental updates.
//!
//! Each locked key maps to a FIFO of batch tokens; the front token owns the
//! key and the rest wait their turn. A batch enqueues its token on all of its
//! keys in one critical section, so every queue agrees on arrival order and
//! a batch only ever waits on batches that arrived before it.
//!
//! A batch runs once it is at the front of every one of its queues. Entries
//! disappear when their queue drains.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use autolist_core::MemberKey;

/// Opaque identity of one incremental batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockToken(u64);

impl LockToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct Slots {
    next_token: u64,
    queues: HashMap<MemberKey, VecDeque<LockToken>>,
}

impl Slots {
    fn owns_all(&self, token: LockToken, keys: &[MemberKey]) -> bool {
        keys.iter().all(|key| {
            self.queues
                .get(key)
                .and_then(|queue| queue.front())
                .is_some_and(|front| *front == token)
        })
    }

    fn withdraw(&mut self, token: LockToken, keys: &[MemberKey]) {
        for key in keys {
            if let Some(queue) = self.queues.get_mut(key) {
                queue.retain(|queued| *queued != token);
                if queue.is_empty() {
                    self.queues.remove(key);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct KeyLockTable {
    slots: Mutex<Slots>,
    released: Condvar,
}

/// Ownership of a batch's keys. Dropping it releases every key and wakes
/// whoever waits on them.
#[must_use = "keys are released as soon as the lease is dropped"]
#[derive(Debug)]
pub struct KeyLease<'a> {
    table: &'a KeyLockTable,
    token: LockToken,
    keys: Vec<MemberKey>,
}

impl KeyLease<'_> {
    pub fn token(&self) -> LockToken {
        self.token
    }

    pub fn keys(&self) -> &[MemberKey] {
        &self.keys
    }
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        self.table.release(self.token, &self.keys);
    }
}

impl KeyLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn enqueue(
        &self,
        keys: &BTreeSet<MemberKey>,
    ) -> (MutexGuard<'_, Slots>, LockToken, Vec<MemberKey>) {
        let mut slots = self.slots.lock();
        slots.next_token += 1;
        let token = LockToken(slots.next_token);
        let keys: Vec<MemberKey> = keys.iter().cloned().collect();
        for key in &keys {
            let queue = slots.queues.entry(key.clone()).or_default();
            if let Some(holder) = queue.front() {
                tracing::debug!(
                    key = %key,
                    holder = holder.0,
                    waiter = token.0,
                    "key busy, queueing",
                );
            }
            queue.push_back(token);
        }
        (slots, token, keys)
    }

    /// Take every key in `keys` for one batch, waiting behind older batches.
    pub fn acquire(&self, keys: &BTreeSet<MemberKey>) -> KeyLease<'_> {
        let (mut slots, token, keys) = self.enqueue(keys);
        while !slots.owns_all(token, &keys) {
            self.released.wait(&mut slots);
        }
        KeyLease {
            table: self,
            token,
            keys,
        }
    }

    /// Like [`acquire`](Self::acquire), but withdraws from every queue and
    /// returns `None` once `timeout` elapses.
    pub fn acquire_timeout(
        &self,
        keys: &BTreeSet<MemberKey>,
        timeout: Duration,
    ) -> Option<KeyLease<'_>> {
        // A timeout too large to represent means no deadline at all.
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.acquire(keys));
        };
        let (mut slots, token, keys) = self.enqueue(keys);
        while !slots.owns_all(token, &keys) {
            if self.released.wait_until(&mut slots, deadline).timed_out()
                && !slots.owns_all(token, &keys)
            {
                slots.withdraw(token, &keys);
                drop(slots);
                // Withdrawing may have moved another batch to the front.
                self.released.notify_all();
                return None;
            }
        }
        Some(KeyLease {
            table: self,
            token,
            keys,
        })
    }

    fn release(&self, token: LockToken, keys: &[MemberKey]) {
        let mut slots = self.slots.lock();
        slots.withdraw(token, keys);
        drop(slots);
        self.released.notify_all();
    }

    /// Block until no batch holds or waits for `key`.
    pub fn wait_released(&self, key: &MemberKey) {
        let mut slots = self.slots.lock();
        while slots.queues.contains_key(key) {
            self.released.wait(&mut slots);
        }
    }

    /// Returns `false` if `key` was still locked after `timeout`.
    pub fn wait_released_timeout(&self, key: &MemberKey, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait_released(key);
            return true;
        };
        let mut slots = self.slots.lock();
        while slots.queues.contains_key(key) {
            if self.released.wait_until(&mut slots, deadline).timed_out() {
                return !slots.queues.contains_key(key);
            }
        }
        true
    }

    /// The batch currently owning `key`, if any.
    pub fn holder(&self, key: &MemberKey) -> Option<LockToken> {
        self.slots
            .lock()
            .queues
            .get(key)
            .and_then(|queue| queue.front().copied())
    }

    /// Number of keys with an active or queued batch.
    pub fn locked_keys(&self) -> usize {
        self.slots.lock().queues.len()
    }
}
