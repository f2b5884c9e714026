//! Persisted authentication session and resume marker.
//!
//! [`SessionStore`] owns the session: it reads and writes the two storage
//! scopes and publishes every change on a `watch` channel. Any number of
//! subscribers can observe it; dropping a receiver unsubscribes.

use std::sync::Arc;

use keyfeed_types::{AccessToken, AuthSession, EventId, Persistence, StoredSession};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::storage::{KeyValueStore, StorageError, StorageWatcher};

/// Storage key of the session record.
pub const AUTH_KEY: &str = "keyfeed:auth";

/// Storage key of the notification resume marker.
pub const LAST_EVENT_ID_KEY: &str = "notification:lastEventId";

/// The signed-in session, shared by every client handle.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    durable: Arc<dyn KeyValueStore>,
    tab: Arc<dyn KeyValueStore>,
    tx: watch::Sender<Option<AuthSession>>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("signed_in", &self.inner.tx.borrow().is_some())
            .finish()
    }
}

impl SessionStore {
    /// Open the store over a durable and a tab scope.
    pub fn new(durable: Arc<dyn KeyValueStore>, tab: Arc<dyn KeyValueStore>) -> Self {
        let initial = read_session(tab.as_ref(), Persistence::Tab)
            .or_else(|| read_session(durable.as_ref(), Persistence::Durable));
        let (tx, _rx) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner { durable, tab, tx }),
        }
    }

    /// The current session: tab scope first, then durable.
    pub fn current(&self) -> Option<AuthSession> {
        self.inner.tx.borrow().clone()
    }

    /// Current access token.
    pub fn token(&self) -> Option<AccessToken> {
        self.inner.tx.borrow().as_ref().map(|s| s.token.clone())
    }

    /// Save a session into its scope and remove any copy from the other.
    pub fn save(&self, session: AuthSession) -> Result<(), StorageError> {
        let (target, other) = self.scopes(session.persistence);
        let record = serde_json::to_string(&session.to_stored())?;
        target.set(AUTH_KEY, &record)?;
        other.remove(AUTH_KEY)?;
        tracing::debug!("Session saved ({:?} scope)", session.persistence);
        self.publish(Some(session));
        Ok(())
    }

    /// Replace the token, keeping the user and scope.
    ///
    /// Returns `false` when no session exists (e.g. it was cleared meanwhile).
    pub fn update_token(&self, token: AccessToken) -> Result<bool, StorageError> {
        match self.current() {
            Some(session) => {
                self.save(session.with_token(token))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove the session from both scopes.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.inner.durable.remove(AUTH_KEY)?;
        self.inner.tab.remove(AUTH_KEY)?;
        tracing::debug!("Session cleared");
        self.publish(None);
        Ok(())
    }

    /// Observe session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.inner.tx.subscribe()
    }

    /// Re-read storage and publish if the session changed.
    pub fn reload(&self) {
        let fresh = read_session(self.inner.tab.as_ref(), Persistence::Tab)
            .or_else(|| read_session(self.inner.durable.as_ref(), Persistence::Durable));
        self.publish(fresh);
    }

    /// Follow changes made by other processes.
    ///
    /// Changes to the session key trigger [`Self::reload`]. Following stops
    /// when the returned guard is dropped or the watcher ends.
    pub fn follow_external<W>(&self, mut watcher: W) -> FollowGuard
    where
        W: StorageWatcher + 'static,
    {
        let store = self.clone();
        let task = tokio::spawn(async move {
            while let Some(change) = watcher.next_change().await {
                if change.key == AUTH_KEY {
                    tracing::debug!("Session changed externally, reloading");
                    store.reload();
                }
            }
        });
        FollowGuard { task }
    }

    fn scopes(&self, persistence: Persistence) -> (&dyn KeyValueStore, &dyn KeyValueStore) {
        match persistence {
            Persistence::Durable => (self.inner.durable.as_ref(), self.inner.tab.as_ref()),
            Persistence::Tab => (self.inner.tab.as_ref(), self.inner.durable.as_ref()),
        }
    }

    fn publish(&self, session: Option<AuthSession>) {
        self.inner.tx.send_if_modified(|current| {
            if *current == session {
                false
            } else {
                *current = session;
                true
            }
        });
    }
}

/// Stops [`SessionStore::follow_external`] when dropped.
#[derive(Debug)]
pub struct FollowGuard {
    task: JoinHandle<()>,
}

impl Drop for FollowGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read a scope; corrupt records are removed and treated as absent.
fn read_session(store: &dyn KeyValueStore, persistence: Persistence) -> Option<AuthSession> {
    let raw = match store.get(AUTH_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Failed to read stored session: {}", e);
            return None;
        }
    };
    match serde_json::from_str::<StoredSession>(&raw) {
        Ok(stored) if !stored.token.expose().is_empty() => Some(stored.into_session(persistence)),
        Ok(_) | Err(_) => {
            tracing::warn!("Discarding corrupt stored session ({:?} scope)", persistence);
            if let Err(e) = store.remove(AUTH_KEY) {
                tracing::warn!("Failed to remove corrupt session: {}", e);
            }
            None
        }
    }
}

/// Durable storage of the notification resume marker.
#[derive(Clone)]
pub struct MarkerStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for MarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerStore").finish_non_exhaustive()
    }
}

impl MarkerStore {
    /// Marker store over a durable scope.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored marker.
    pub fn load(&self) -> Option<EventId> {
        match self.store.get(LAST_EVENT_ID_KEY) {
            Ok(value) => value.and_then(EventId::new),
            Err(e) => {
                tracing::warn!("Failed to read resume marker: {}", e);
                None
            }
        }
    }

    /// Persist the marker.
    pub fn save(&self, id: &EventId) -> Result<(), StorageError> {
        self.store.set(LAST_EVENT_ID_KEY, id.as_str())
    }

    /// Forget the marker.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(LAST_EVENT_ID_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore, NoopWatcher, PollingWatcher};
    use keyfeed_types::{UserId, UserProfile};
    use std::time::Duration;
    use tempfile::TempDir;

    fn session(token: &str, persistence: Persistence) -> AuthSession {
        AuthSession {
            token: AccessToken::new(token),
            user: UserProfile {
                id: UserId::new(7),
                email: "kim@example.com".into(),
                name: "Kim".into(),
                role: "USER".into(),
            },
            persistence,
        }
    }

    fn stores() -> (MemoryStore, MemoryStore, SessionStore) {
        let durable = MemoryStore::new();
        let tab = MemoryStore::new();
        let store = SessionStore::new(Arc::new(durable.clone()), Arc::new(tab.clone()));
        (durable, tab, store)
    }

    #[test]
    fn starts_empty() {
        let (_, _, store) = stores();
        assert!(store.current().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn save_durable_removes_tab_copy() {
        let (durable, tab, store) = stores();
        store.save(session("t1", Persistence::Tab)).unwrap();
        assert!(tab.get(AUTH_KEY).unwrap().is_some());

        store.save(session("t2", Persistence::Durable)).unwrap();
        assert!(tab.get(AUTH_KEY).unwrap().is_none());
        assert!(durable.get(AUTH_KEY).unwrap().is_some());
        assert_eq!(store.current().unwrap().persistence, Persistence::Durable);
    }

    #[test]
    fn tab_scope_wins_on_load() {
        let durable = MemoryStore::new();
        let tab = MemoryStore::new();
        let d = serde_json::to_string(&session("durable", Persistence::Durable).to_stored()).unwrap();
        let t = serde_json::to_string(&session("tab", Persistence::Tab).to_stored()).unwrap();
        durable.set(AUTH_KEY, &d).unwrap();
        tab.set(AUTH_KEY, &t).unwrap();

        let store = SessionStore::new(Arc::new(durable), Arc::new(tab));
        let current = store.current().unwrap();
        assert_eq!(current.token.expose(), "tab");
        assert_eq!(current.persistence, Persistence::Tab);
    }

    #[test]
    fn corrupt_record_is_removed() {
        let durable = MemoryStore::new();
        durable.set(AUTH_KEY, "{not json").unwrap();
        let store = SessionStore::new(Arc::new(durable.clone()), Arc::new(MemoryStore::new()));
        assert!(store.current().is_none());
        assert!(durable.get(AUTH_KEY).unwrap().is_none());
    }

    #[test]
    fn update_token_keeps_scope() {
        let (durable, _, store) = stores();
        store.save(session("old", Persistence::Durable)).unwrap();
        assert!(store.update_token(AccessToken::new("new")).unwrap());

        let current = store.current().unwrap();
        assert_eq!(current.token.expose(), "new");
        assert_eq!(current.persistence, Persistence::Durable);
        assert!(durable.get(AUTH_KEY).unwrap().unwrap().contains("new"));
    }

    #[test]
    fn update_token_without_session() {
        let (_, _, store) = stores();
        assert!(!store.update_token(AccessToken::new("x")).unwrap());
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let (_, _, store) = stores();
        let mut rx = store.subscribe();

        store.save(session("t", Persistence::Tab)).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().token.expose(), "t");

        store.clear().unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn noop_follow_ends_quietly() {
        let (_, _, store) = stores();
        let guard = store.follow_external(NoopWatcher);
        tokio::task::yield_now().await;
        drop(guard);
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn external_write_is_republished() {
        let temp = TempDir::new().unwrap();
        let durable = FileStore::new(temp.path());
        let store = SessionStore::new(Arc::new(durable.clone()), Arc::new(MemoryStore::new()));
        let mut rx = store.subscribe();
        let watcher = PollingWatcher::new(durable.clone(), &[AUTH_KEY], Duration::from_millis(10));
        let _guard = store.follow_external(watcher);

        // Another process signs in.
        let record = serde_json::to_string(&session("other", Persistence::Durable).to_stored()).unwrap();
        FileStore::new(temp.path()).set(AUTH_KEY, &record).unwrap();

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.current().unwrap().token.expose(), "other");
    }

    #[test]
    fn marker_store_round_trip() {
        let markers = MarkerStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(markers.load(), None);
        markers.save(&EventId::new("41").unwrap()).unwrap();
        assert_eq!(markers.load(), EventId::new("41"));
        markers.clear().unwrap();
        assert_eq!(markers.load(), None);
    }
}
