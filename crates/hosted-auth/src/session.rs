//! Server-side session storage
//!
//! A session maps a server-issued identifier (never a token) to the
//! `IdentityClaims` established at callback time. The store is injected as
//! `Arc<dyn SessionStore>` so other backends can replace the in-memory one.
//!
//! `InMemorySessionStore` shards its map: all operations on one identifier
//! serialize on that identifier's shard lock, while unrelated identifiers
//! usually land on different shards and do not contend.

use std::collections::HashMap;
use std::collections::hash_map::{DefaultHasher, Entry};
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::claims::IdentityClaims;
use crate::constants::SESSION_ID_BYTES;
use crate::error::{Error, Result};

const SHARD_COUNT: usize = 16;

/// A live session. Owned by the store; callers receive clones.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: String,
    pub user: IdentityClaims,
    pub created_at: Instant,
}

impl SessionRecord {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Storage contract for sessions.
///
/// `get` returning `None` is the normal unauthenticated answer, not an
/// error. `destroy` is idempotent.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn SessionStore>`).
pub trait SessionStore: Send + Sync {
    /// Store a record for `user` under a fresh, unguessable identifier.
    fn create(
        &self,
        user: IdentityClaims,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;

    fn get<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>>;

    fn destroy<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Process-local session store with a fixed time-to-live.
pub struct InMemorySessionStore {
    shards: Vec<RwLock<HashMap<String, SessionRecord>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        info!(ttl_secs = ttl.as_secs(), "session store initialized");
        Self { shards, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn shard(&self, session_id: &str) -> &RwLock<HashMap<String, SessionRecord>> {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    async fn insert_new(&self, user: IdentityClaims) -> Result<String> {
        if user.subject.trim().is_empty() {
            return Err(Error::SessionStore(
                "refusing to create a session without a subject".into(),
            ));
        }

        loop {
            let session_id = generate_session_id();
            let mut shard = self.shard(&session_id).write().await;
            match shard.entry(session_id.clone()) {
                Entry::Occupied(_) => {
                    warn!("session identifier collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    slot.insert(SessionRecord {
                        session_id: session_id.clone(),
                        user,
                        created_at: Instant::now(),
                    });
                    return Ok(session_id);
                }
            }
        }
    }

    async fn lookup(&self, session_id: &str) -> Option<SessionRecord> {
        let lock = self.shard(session_id);
        {
            let shard = lock.read().await;
            match shard.get(session_id) {
                None => return None,
                Some(record) if !record.is_expired(self.ttl) => return Some(record.clone()),
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock before evicting
        let mut shard = lock.write().await;
        if shard
            .get(session_id)
            .is_some_and(|record| record.is_expired(self.ttl))
        {
            shard.remove(session_id);
            debug!("evicted expired session on read");
        }
        None
    }

    async fn remove(&self, session_id: &str) {
        let mut shard = self.shard(session_id).write().await;
        if shard.remove(session_id).is_some() {
            debug!("session destroyed");
        }
    }

    /// Drop every expired record. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut removed = 0;
        for lock in &self.shards {
            let mut shard = lock.write().await;
            let before = shard.len();
            shard.retain(|_, record| !record.is_expired(self.ttl));
            removed += before - shard.len();
        }
        removed
    }

    /// Number of unexpired sessions.
    pub async fn len(&self) -> usize {
        let mut live = 0;
        for lock in &self.shards {
            let shard = lock.read().await;
            live += shard
                .values()
                .filter(|record| !record.is_expired(self.ttl))
                .count();
        }
        live
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(
        &self,
        user: IdentityClaims,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(self.insert_new(user))
    }

    fn get<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.lookup(session_id).await) })
    }

    fn destroy<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.remove(session_id).await;
            Ok(())
        })
    }
}

/// 256 random bits, URL-safe base64 without padding (43 chars).
fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Spawn a background task that periodically evicts expired sessions.
///
/// Reads already treat expired records as absent; the sweep only bounds
/// memory held by sessions nobody comes back for.
pub fn spawn_sweep_task(
    store: Arc<InMemorySessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately and the store is empty at startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = store.purge_expired().await;
            if removed > 0 {
                info!(removed, "swept expired sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn claims(subject: &str) -> IdentityClaims {
        IdentityClaims {
            subject: subject.into(),
            email: format!("{subject}@example.com"),
            name: None,
        }
    }

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn create_then_get_returns_same_claims() {
        let store = store();
        let id = store.create(claims("abc123")).await.unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.session_id, id);
        assert_eq!(record.user, claims("abc123"));
    }

    #[tokio::test]
    async fn unknown_session_is_absent_not_error() {
        let store = store();
        assert!(store.get("no-such-session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = store();
        let id = store.create(claims("u1")).await.unwrap();

        store.destroy(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        store.destroy(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        store.destroy("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let store = store();
        let err = store.create(claims(" ")).await.unwrap_err();
        assert!(matches!(err, Error::SessionStore(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn session_ids_are_url_safe_and_distinct() {
        let store = store();
        let a = store.create(claims("u1")).await.unwrap();
        let b = store.create(claims("u1")).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "session id must be URL-safe: {a}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_reads_as_absent() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let id = store.create(claims("u1")).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get(&id).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get(&id).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await, 0, "read already evicted it");
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_expired() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        store.create(claims("old-1")).await.unwrap();
        store.create(claims("old-2")).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        let fresh = store.create(claims("fresh")).await.unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired().await, 2);
        assert_eq!(store.get(&fresh).await.unwrap().unwrap().user.subject, "fresh");
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_task_evicts_in_background() {
        let store = Arc::new(InMemorySessionStore::new(Duration::from_secs(10)));
        store.create(claims("u1")).await.unwrap();
        let handle = spawn_sweep_task(store.clone(), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(16)).await;

        let remaining: usize = {
            let mut total = 0;
            for lock in &store.shards {
                total += lock.read().await.len();
            }
            total
        };
        assert_eq!(remaining, 0);
        handle.abort();
    }

    #[tokio::test]
    async fn concurrent_creates_never_collide() {
        let store = Arc::new(store());
        let mut handles = vec![];
        for i in 0..64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create(claims(&format!("user-{i}"))).await.unwrap()
            }));
        }

        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await.unwrap());
        }
        assert_eq!(ids.len(), 64);
        assert_eq!(store.len().await, 64);
    }

    #[tokio::test]
    async fn concurrent_reads_observe_identical_records() {
        let store = Arc::new(store());
        let id = store.create(claims("shared")).await.unwrap();

        let mut handles = vec![];
        for _ in 0..16 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                store.get(&id).await.unwrap().unwrap().user
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), claims("shared"));
        }
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let store: Arc<dyn SessionStore> = Arc::new(store());
        let id = store.create(claims("dyn")).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().unwrap().user.subject, "dyn");
    }
}
