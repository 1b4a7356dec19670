//! Per-client connection tracking.
//!
//! # Responsibilities
//! - Count live sessions per client address
//! - Enforce the per-client session cap
//! - Release a slot when its session ends, however it ends

use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;

/// Tracks live sessions per client address.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<DashMap<IpAddr, usize>>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for `client` unless it already holds `limit` sessions.
    /// The slot is released when the returned guard drops.
    pub fn try_track(&self, client: IpAddr, limit: usize) -> Option<ConnectionGuard> {
        let mut count = self.active.entry(client).or_insert(0);
        if *count >= limit {
            return None;
        }
        *count += 1;
        drop(count);

        Some(ConnectionGuard {
            active: Arc::clone(&self.active),
            client,
        })
    }

    /// Live sessions held by `client`.
    pub fn active_count(&self, client: IpAddr) -> usize {
        self.active.get(&client).map(|c| *c).unwrap_or(0)
    }

    /// Live sessions across all clients.
    pub fn total(&self) -> usize {
        self.active.iter().map(|entry| *entry.value()).sum()
    }
}

/// Guard that holds a client's session slot.
/// Decrements the client's count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active: Arc<DashMap<IpAddr, usize>>,
    client: IpAddr,
}

impl ConnectionGuard {
    pub fn client(&self) -> IpAddr {
        self.client
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active.remove_if_mut(&self.client, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
        tracing::trace!(client = %self.client, "Session slot released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        let client: IpAddr = "192.0.2.7".parse().unwrap();
        assert_eq!(tracker.active_count(client), 0);

        let guard1 = tracker.try_track(client, 2).unwrap();
        assert_eq!(tracker.active_count(client), 1);

        let guard2 = tracker.try_track(client, 2).unwrap();
        assert_eq!(tracker.active_count(client), 2);
        assert!(tracker.try_track(client, 2).is_none());

        drop(guard1);
        assert_eq!(tracker.active_count(client), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(client), 0);
        assert_eq!(tracker.total(), 0);
    }

    #[test]
    fn clients_are_counted_separately() {
        let tracker = ConnectionTracker::new();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        let _a = tracker.try_track(a, 1).unwrap();
        assert!(tracker.try_track(a, 1).is_none());
        let guard_b = tracker.try_track(b, 1).unwrap();
        assert_eq!(guard_b.client(), b);
        assert_eq!(tracker.total(), 2);
    }
}
