//! Pending sessions: connected channels waiting for their websocket.
//!
//! A successful connect request parks its channel here under a fresh id.
//! The browser then opens `/ws?id=...` from the same client address to
//! claim it. Unclaimed sessions are dropped once their delay runs out.

use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use dashmap::DashMap;
use uuid::Uuid;

use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::plugins::BoxedStream;

struct PendingSession {
    // Mutex only to make the table shareable; never contended.
    stream: Mutex<BoxedStream>,
    client: IpAddr,
    guard: ConnectionGuard,
    created: Instant,
}

/// A session handed over to its websocket.
pub struct ClaimedSession {
    pub id: Uuid,
    pub stream: BoxedStream,
    /// Holds the client's connection slot until dropped.
    pub guard: ConnectionGuard,
}

/// Table of pending sessions plus the per-client connection counts.
#[derive(Clone, Default)]
pub struct SessionStore {
    pending: Arc<DashMap<Uuid, PendingSession>>,
    tracker: ConnectionTracker,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Park a connected channel and return its session id.
    pub fn insert(&self, stream: BoxedStream, guard: ConnectionGuard) -> Uuid {
        let id = Uuid::new_v4();
        let client = guard.client();
        self.pending.insert(
            id,
            PendingSession {
                stream: Mutex::new(stream),
                client,
                guard,
                created: Instant::now(),
            },
        );
        tracing::debug!(session = %id, client = %client, "Session pending");
        id
    }

    /// Take the session `id` if it was opened by `client`.
    pub fn claim(&self, id: Uuid, client: IpAddr) -> Option<ClaimedSession> {
        let (id, session) = self.pending.remove_if(&id, |_, s| s.client == client)?;
        tracing::debug!(
            session = %id,
            waited_ms = session.created.elapsed().as_millis() as u64,
            "Session claimed"
        );
        Some(ClaimedSession {
            id,
            stream: session.stream.into_inner().unwrap_or_else(PoisonError::into_inner),
            guard: session.guard,
        })
    }

    /// Drop the session `id` if still unclaimed. Returns whether it was.
    pub fn expire(&self, id: Uuid) -> bool {
        match self.pending.remove(&id) {
            Some((id, session)) => {
                tracing::info!(session = %id, client = %session.client, "Pending session expired");
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("pending", &self.pending.len())
            .field("active", &self.tracker.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> BoxedStream {
        let (near, _far) = tokio::io::duplex(64);
        Box::new(near)
    }

    #[test]
    fn claim_requires_same_client() {
        let store = SessionStore::new();
        let owner: IpAddr = "10.0.0.7".parse().unwrap();
        let other: IpAddr = "10.0.0.8".parse().unwrap();

        let guard = store.tracker().try_track(owner, 2).unwrap();
        let id = store.insert(channel(), guard);

        assert!(store.claim(id, other).is_none());
        assert_eq!(store.pending_count(), 1);

        let claimed = store.claim(id, owner).unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(store.pending_count(), 0);
        assert!(store.claim(id, owner).is_none());

        assert_eq!(store.tracker().active_count(owner), 1);
        drop(claimed);
        assert_eq!(store.tracker().active_count(owner), 0);
    }

    #[test]
    fn expiry_releases_the_slot() {
        let store = SessionStore::new();
        let client: IpAddr = "127.0.0.1".parse().unwrap();
        let id = store.insert(channel(), store.tracker().try_track(client, 1).unwrap());

        assert!(store.tracker().try_track(client, 1).is_none());
        assert!(store.expire(id));
        assert!(!store.expire(id));
        assert!(store.tracker().try_track(client, 1).is_some());
    }
}
