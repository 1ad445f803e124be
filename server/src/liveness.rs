//! Per-session inactivity deadlines.
//!
//! A deadline is armed when a session registers, pushed back on every valid
//! message, and released when the session is purged or its deadline fires.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a session may stay silent before it is disconnected.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(2);

/// Who a deadline belongs to. Players are tracked by name, which survives
/// reconnection under a new session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Player(String),
    Observer(u64),
}

#[derive(Debug)]
pub struct LivenessTimers {
    deadlines: HashMap<Identity, Instant>,
    timeout: Duration,
}

impl LivenessTimers {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadlines: HashMap::new(),
            timeout,
        }
    }

    /// Creates or refreshes the deadline for `identity`.
    pub fn arm(&mut self, identity: Identity, now: Instant) {
        self.deadlines.insert(identity, now + self.timeout);
    }

    pub fn release(&mut self, identity: &Identity) -> bool {
        self.deadlines.remove(identity).is_some()
    }

    pub fn is_armed(&self, identity: &Identity) -> bool {
        self.deadlines.contains_key(identity)
    }

    /// The earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Removes and returns every identity whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<Identity> {
        let expired: Vec<Identity> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(identity, _)| identity.clone())
            .collect();

        for identity in &expired {
            self.deadlines.remove(identity);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_fires_after_timeout() {
        let mut timers = LivenessTimers::new(LIVENESS_TIMEOUT);
        let start = Instant::now();
        timers.arm(Identity::Observer(1), start);

        assert_eq!(timers.next_deadline(), Some(start + LIVENESS_TIMEOUT));
        assert!(timers.expire(start + Duration::from_millis(1999)).is_empty());

        let expired = timers.expire(start + LIVENESS_TIMEOUT);
        assert_eq!(expired, vec![Identity::Observer(1)]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_rearm_pushes_deadline_back() {
        let mut timers = LivenessTimers::new(LIVENESS_TIMEOUT);
        let start = Instant::now();
        let player = Identity::Player("Ala".to_string());

        timers.arm(player.clone(), start);
        timers.arm(player.clone(), start + Duration::from_secs(1));

        assert!(timers.expire(start + Duration::from_millis(2500)).is_empty());
        assert_eq!(timers.expire(start + Duration::from_secs(3)), vec![player]);
    }

    #[test]
    fn test_release() {
        let mut timers = LivenessTimers::new(LIVENESS_TIMEOUT);
        let now = Instant::now();
        timers.arm(Identity::Observer(5), now);

        assert!(timers.is_armed(&Identity::Observer(5)));
        assert!(timers.release(&Identity::Observer(5)));
        assert!(!timers.release(&Identity::Observer(5)));
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn test_next_deadline_is_earliest() {
        let mut timers = LivenessTimers::new(LIVENESS_TIMEOUT);
        let now = Instant::now();
        timers.arm(Identity::Observer(1), now + Duration::from_secs(1));
        timers.arm(Identity::Observer(2), now);

        assert_eq!(timers.next_deadline(), Some(now + LIVENESS_TIMEOUT));
        assert_eq!(timers.len(), 2);
    }
}
