//! Idempotency ledger.

use std::collections::{HashSet, VecDeque};
use warden_core::{Action, MessageId};

/// Idempotency key of an enforcement action.
pub type ActionKey = (MessageId, Action);

/// Bounded record of applied and in-flight actions.
#[derive(Debug)]
pub(crate) struct Ledger {
    capacity: usize,
    applied: HashSet<ActionKey>,
    order: VecDeque<ActionKey>,
    in_flight: HashSet<ActionKey>,
}

impl Ledger {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            applied: HashSet::new(),
            order: VecDeque::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Whether `key` was applied, or an applied action already covers it.
    /// Timeout and Ban both delete, so they cover a later Delete.
    pub(crate) fn covers(&self, key: &ActionKey) -> bool {
        let (message, action) = *key;
        if self.applied.contains(key) {
            return true;
        }
        action == Action::Delete
            && [Action::Timeout, Action::Ban]
                .iter()
                .any(|stronger| self.applied.contains(&(message, *stronger)))
    }

    pub(crate) fn is_in_flight(&self, key: &ActionKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Claim `key` for execution. False when already claimed.
    pub(crate) fn begin(&mut self, key: ActionKey) -> bool {
        self.in_flight.insert(key)
    }

    /// Release a claim, recording success.
    pub(crate) fn finish(&mut self, key: ActionKey, applied: bool) {
        self.in_flight.remove(&key);
        if applied && self.applied.insert(key) {
            self.order.push_back(key);
            while self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.applied.remove(&evicted);
                }
            }
        }
    }

    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}
