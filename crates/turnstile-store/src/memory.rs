//! In-memory coordination ensemble
//!
//! `MemoryEnsemble` is a single shared namespace. Every `MemorySession`
//! obtained from [`MemoryEnsemble::connect`] behaves like one client session
//! against it: ephemeral nodes belong to the session, sequence counters belong
//! to the parent node, and watches fire exactly once.
//!
//! The ensemble also exposes the failure knobs tests need: session expiry,
//! connection blips, and positioning a parent's sequence counter so wrap-around
//! can be exercised. A session that stays disconnected longer than its session
//! timeout is expired, as the real service would do.
//!
//! Watch bookkeeping is observable too: [`MemoryEnsemble::watchers`] and
//! [`MemoryEnsemble::watch_registrations`] show who waits on which node.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::debug;
use turnstile_common::path::{join_path, node_name, normalize_path, parent_path};
use turnstile_common::{PATH_SEPARATOR, ROOT_PATH, SEQUENCE_WIDTH};

use crate::error::{Result, StoreError};
use crate::model::{CreateMode, EventType, SessionState, Watch, WatchEvent};
use crate::traits::CoordinationStore;

struct ZNode {
    data: Vec<u8>,
    ephemeral_owner: Option<i64>,
    children: BTreeSet<String>,
    /// Next sequence handed to a sequential child
    next_sequence: i32,
    version: i32,
}

impl ZNode {
    fn new(data: Vec<u8>, ephemeral_owner: Option<i64>) -> Self {
        Self {
            data,
            ephemeral_owner,
            children: BTreeSet::new(),
            next_sequence: 0,
            version: 0,
        }
    }
}

#[derive(Default)]
struct Namespace {
    nodes: HashMap<String, ZNode>,
    watches: HashMap<String, Vec<oneshot::Sender<WatchEvent>>>,
    /// Every watch ever set, per path
    watch_registrations: HashMap<String, u64>,
}

impl Namespace {
    fn fire(&mut self, path: &str, event_type: EventType) {
        if let Some(senders) = self.watches.remove(path) {
            for tx in senders {
                let _ = tx.send(WatchEvent {
                    event_type,
                    path: path.to_string(),
                });
            }
        }
    }

    fn remove_leaf(&mut self, path: &str) {
        self.nodes.remove(path);
        if let Some(parent) = parent_path(path)
            && let Some(parent_node) = self.nodes.get_mut(parent)
        {
            parent_node.children.remove(node_name(path));
        }
        self.fire(path, EventType::NodeDeleted);
    }
}

/// Session timeout used by [`MemoryEnsemble::connect`]
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared in-process namespace
pub struct MemoryEnsemble {
    namespace: Mutex<Namespace>,
    sessions: DashMap<i64, watch::Sender<SessionState>>,
    next_session_id: AtomicI64,
}

impl MemoryEnsemble {
    pub fn new() -> Arc<Self> {
        let mut namespace = Namespace::default();
        namespace
            .nodes
            .insert(ROOT_PATH.to_string(), ZNode::new(Vec::new(), None));

        Arc::new(Self {
            namespace: Mutex::new(namespace),
            sessions: DashMap::new(),
            next_session_id: AtomicI64::new(0x1000),
        })
    }

    /// Open a new session against this ensemble.
    pub fn connect(self: &Arc<Self>) -> MemorySession {
        self.connect_with_timeout(DEFAULT_SESSION_TIMEOUT)
    }

    /// Open a new session that expires after staying disconnected for `session_timeout`.
    pub fn connect_with_timeout(self: &Arc<Self>, session_timeout: Duration) -> MemorySession {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(SessionState::Connected);
        self.sessions.insert(session_id, tx);
        debug!(session_id, ?session_timeout, "Memory session connected");

        MemorySession {
            ensemble: self.clone(),
            session_id,
            session_timeout,
            connection_epoch: Arc::new(AtomicU64::new(0)),
            state: rx,
        }
    }

    /// Expire a session: its ephemerals vanish and it reports `SessionExpired`.
    pub fn expire_session(&self, session_id: i64) {
        self.end_session(session_id, SessionState::SessionExpired);
    }

    /// Position the sequence counter of `parent` for its next sequential child.
    pub fn set_sequence(&self, parent: &str, next: i32) -> Result<()> {
        let parent = normalize_path(parent)?;
        let mut ns = self.namespace.lock();
        let node = ns
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| StoreError::NoNode(parent.clone()))?;
        node.next_sequence = next;
        Ok(())
    }

    /// Whether `path` currently exists (no watch is left).
    pub fn exists(&self, path: &str) -> bool {
        normalize_path(path)
            .map(|p| self.namespace.lock().nodes.contains_key(&p))
            .unwrap_or(false)
    }

    /// Sorted child names of `path`, empty if it does not exist.
    pub fn children_of(&self, path: &str) -> Vec<String> {
        let Ok(path) = normalize_path(path) else {
            return Vec::new();
        };
        self.namespace
            .lock()
            .nodes
            .get(&path)
            .map(|n| n.children.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Owning session of an ephemeral node.
    pub fn ephemeral_owner(&self, path: &str) -> Option<i64> {
        let path = normalize_path(path).ok()?;
        self.namespace
            .lock()
            .nodes
            .get(&path)
            .and_then(|n| n.ephemeral_owner)
    }

    /// Watches on `path` that have not fired and whose receiver is still alive.
    pub fn watchers(&self, path: &str) -> usize {
        let Ok(path) = normalize_path(path) else {
            return 0;
        };
        self.namespace
            .lock()
            .watches
            .get(&path)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// How many watches were ever set on `path`.
    pub fn watch_registrations(&self, path: &str) -> u64 {
        let Ok(path) = normalize_path(path) else {
            return 0;
        };
        self.namespace
            .lock()
            .watch_registrations
            .get(&path)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.namespace.lock().nodes.len()
    }

    /// Number of sessions that are still alive.
    pub fn live_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn end_session(&self, session_id: i64, terminal: SessionState) {
        let Some((_, state_tx)) = self.sessions.remove(&session_id) else {
            return;
        };

        let removed = {
            let mut ns = self.namespace.lock();
            let owned: Vec<String> = ns
                .nodes
                .iter()
                .filter(|(_, node)| node.ephemeral_owner == Some(session_id))
                .map(|(path, _)| path.clone())
                .collect();
            for path in &owned {
                ns.remove_leaf(path);
            }
            owned.len()
        };

        debug!(
            session_id,
            removed_ephemerals = removed,
            state = %terminal,
            "Memory session ended"
        );
        state_tx.send_replace(terminal);
    }

    fn expire_if_disconnected(&self, session_id: i64) {
        let disconnected = self
            .sessions
            .get(&session_id)
            .is_some_and(|state| *state.borrow() == SessionState::Disconnected);
        if disconnected {
            debug!(session_id, "Session timeout elapsed while disconnected");
            self.end_session(session_id, SessionState::SessionExpired);
        }
    }

    fn check_session(&self, session_id: i64) -> Result<()> {
        let Some(state) = self.sessions.get(&session_id) else {
            return Err(StoreError::SessionExpired(session_id));
        };
        match *state.borrow() {
            SessionState::Connected => Ok(()),
            SessionState::Disconnected => Err(StoreError::ConnectionLoss),
            SessionState::SessionExpired | SessionState::Closed => {
                Err(StoreError::SessionExpired(session_id))
            }
        }
    }

    fn set_connection(&self, session_id: i64, from: SessionState, to: SessionState) {
        if let Some(state) = self.sessions.get(&session_id) {
            state.send_if_modified(|current| {
                if *current == from {
                    *current = to;
                    true
                } else {
                    false
                }
            });
        }
    }

    fn create(&self, session_id: i64, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        self.check_session(session_id)?;

        // A sequential create keeps a trailing separator: "/a/" yields "/a/0000000001".
        let (parent, name) = if mode.is_sequential() {
            let idx = path
                .rfind(PATH_SEPARATOR)
                .ok_or_else(|| StoreError::BadArguments(format!("path '{}' must be absolute", path)))?;
            let parent = normalize_path(if idx == 0 { ROOT_PATH } else { &path[..idx] })?;
            (parent, path[idx + 1..].to_string())
        } else {
            let full = normalize_path(path)?;
            let parent = parent_path(&full)
                .ok_or_else(|| StoreError::NodeExists(full.clone()))?
                .to_string();
            let name = node_name(&full).to_string();
            (parent, name)
        };

        let mut ns = self.namespace.lock();
        let parent_node = ns
            .nodes
            .get_mut(&parent)
            .ok_or_else(|| StoreError::NoNode(parent.clone()))?;
        if parent_node.ephemeral_owner.is_some() {
            return Err(StoreError::NoChildrenForEphemerals(parent));
        }

        let name = if mode.is_sequential() {
            let sequence = parent_node.next_sequence;
            parent_node.next_sequence = sequence.wrapping_add(1);
            format!("{}{:0width$}", name, sequence, width = SEQUENCE_WIDTH)
        } else {
            name
        };
        let full_path = join_path(&parent, &name);

        if parent_node.children.contains(&name) {
            return Err(StoreError::NodeExists(full_path));
        }
        parent_node.children.insert(name);

        let owner = mode.is_ephemeral().then_some(session_id);
        ns.nodes
            .insert(full_path.clone(), ZNode::new(data.to_vec(), owner));
        ns.fire(&full_path, EventType::NodeCreated);

        Ok(full_path)
    }

    fn delete(&self, session_id: i64, path: &str) -> Result<()> {
        self.check_session(session_id)?;
        let path = normalize_path(path)?;
        if path == ROOT_PATH {
            return Err(StoreError::BadArguments("cannot delete the root".to_string()));
        }

        let mut ns = self.namespace.lock();
        let node = ns
            .nodes
            .get(&path)
            .ok_or_else(|| StoreError::NoNode(path.clone()))?;
        if !node.children.is_empty() {
            return Err(StoreError::NotEmpty(path));
        }
        ns.remove_leaf(&path);
        Ok(())
    }

    fn children(&self, session_id: i64, path: &str) -> Result<Vec<String>> {
        self.check_session(session_id)?;
        let path = normalize_path(path)?;
        let ns = self.namespace.lock();
        ns.nodes
            .get(&path)
            .map(|n| n.children.iter().cloned().collect())
            .ok_or(StoreError::NoNode(path))
    }

    fn exists_watch(&self, session_id: i64, path: &str) -> Result<(bool, Watch)> {
        self.check_session(session_id)?;
        let path = normalize_path(path)?;
        let (tx, watch) = Watch::channel();

        let mut ns = self.namespace.lock();
        let exists = ns.nodes.contains_key(&path);
        *ns.watch_registrations.entry(path.clone()).or_default() += 1;
        let senders = ns.watches.entry(path).or_default();
        senders.retain(|s| !s.is_closed());
        senders.push(tx);
        Ok((exists, watch))
    }

    fn get_data(&self, session_id: i64, path: &str) -> Result<Vec<u8>> {
        self.check_session(session_id)?;
        let path = normalize_path(path)?;
        let ns = self.namespace.lock();
        ns.nodes
            .get(&path)
            .map(|n| n.data.clone())
            .ok_or(StoreError::NoNode(path))
    }

    fn set_data(&self, session_id: i64, path: &str, data: &[u8]) -> Result<i32> {
        self.check_session(session_id)?;
        let path = normalize_path(path)?;
        let mut ns = self.namespace.lock();
        let node = ns
            .nodes
            .get_mut(&path)
            .ok_or_else(|| StoreError::NoNode(path.clone()))?;
        node.data = data.to_vec();
        node.version += 1;
        let version = node.version;
        ns.fire(&path, EventType::NodeDataChanged);
        Ok(version)
    }
}

/// One client session against a [`MemoryEnsemble`]
pub struct MemorySession {
    ensemble: Arc<MemoryEnsemble>,
    session_id: i64,
    session_timeout: Duration,
    /// Bumped on every disconnect/reconnect so a stale expiry timer does nothing
    connection_epoch: Arc<AtomicU64>,
    state: watch::Receiver<SessionState>,
}

impl MemorySession {
    pub fn ensemble(&self) -> &Arc<MemoryEnsemble> {
        &self.ensemble
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Simulate a dropped connection; the session and its ephemerals survive
    /// unless it stays down for the session timeout.
    ///
    /// The expiry timer needs a tokio runtime; without one the session only
    /// ends through [`MemorySession::expire`].
    pub fn disconnect(&self) {
        let epoch = self.connection_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.ensemble.set_connection(
            self.session_id,
            SessionState::Connected,
            SessionState::Disconnected,
        );

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let ensemble = self.ensemble.clone();
            let connection_epoch = self.connection_epoch.clone();
            let session_id = self.session_id;
            let session_timeout = self.session_timeout;
            runtime.spawn(async move {
                tokio::time::sleep(session_timeout).await;
                if connection_epoch.load(Ordering::SeqCst) == epoch {
                    ensemble.expire_if_disconnected(session_id);
                }
            });
        }
    }

    /// Recover from [`MemorySession::disconnect`] within the session timeout.
    pub fn reconnect(&self) {
        self.connection_epoch.fetch_add(1, Ordering::SeqCst);
        self.ensemble.set_connection(
            self.session_id,
            SessionState::Disconnected,
            SessionState::Connected,
        );
    }

    /// Expire this session as the ensemble would after a long partition.
    pub fn expire(&self) {
        self.ensemble.expire_session(self.session_id);
    }

    /// Close the session, removing its ephemeral nodes.
    pub fn close(&self) {
        self.ensemble.end_session(self.session_id, SessionState::Closed);
    }

    /// Replace the payload of `path`, firing its watches. Returns the new version.
    pub fn set_data(&self, path: &str, data: &[u8]) -> Result<i32> {
        self.ensemble.set_data(self.session_id, path, data)
    }
}

#[async_trait]
impl CoordinationStore for MemorySession {
    async fn create(&self, path: &str, data: &[u8], mode: CreateMode) -> Result<String> {
        self.ensemble.create(self.session_id, path, data, mode)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.ensemble.delete(self.session_id, path)
    }

    async fn children(&self, path: &str) -> Result<Vec<String>> {
        self.ensemble.children(self.session_id, path)
    }

    async fn exists_watch(&self, path: &str) -> Result<(bool, Watch)> {
        self.ensemble.exists_watch(self.session_id, path)
    }

    async fn get_data(&self, path: &str) -> Result<Vec<u8>> {
        self.ensemble.get_data(self.session_id, path)
    }

    fn session_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    fn session_id(&self) -> i64 {
        self.session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_requires_parent() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();

        let err = session
            .create("/a/b", b"", CreateMode::Persistent)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NoNode("/a".to_string()));

        session.create("/a", b"", CreateMode::Persistent).await.unwrap();
        let path = session.create("/a/b", b"x", CreateMode::Persistent).await.unwrap();
        assert_eq!(path, "/a/b");
        assert_eq!(session.get_data("/a/b").await.unwrap(), b"x".to_vec());
    }

    #[tokio::test]
    async fn test_create_existing_node_fails() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();

        session.create("/a", b"", CreateMode::Persistent).await.unwrap();
        let err = session
            .create("/a", b"", CreateMode::Persistent)
            .await
            .unwrap_err();
        assert!(err.is_node_exists());
        assert!(session
            .create("/", b"", CreateMode::Persistent)
            .await
            .unwrap_err()
            .is_node_exists());
    }

    #[tokio::test]
    async fn test_sequential_names_are_zero_padded_per_parent() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/q", b"", CreateMode::Persistent).await.unwrap();
        session.create("/r", b"", CreateMode::Persistent).await.unwrap();

        let p0 = session
            .create("/q/lock-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        let p1 = session
            .create("/q/lock-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        let r0 = session
            .create("/r/", b"", CreateMode::PersistentSequential)
            .await
            .unwrap();

        assert_eq!(p0, "/q/lock-0000000000");
        assert_eq!(p1, "/q/lock-0000000001");
        assert_eq!(r0, "/r/0000000000");
    }

    #[tokio::test]
    async fn test_sequence_wraps_negative() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/w", b"", CreateMode::Persistent).await.unwrap();
        ensemble.set_sequence("/w", i32::MAX).unwrap();

        let last = session
            .create("/w/n-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        let wrapped = session
            .create("/w/n-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        assert_eq!(last, "/w/n-2147483647");
        assert_eq!(wrapped, "/w/n--2147483648");
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/a", b"", CreateMode::Persistent).await.unwrap();
        session.create("/a/b", b"", CreateMode::Persistent).await.unwrap();

        assert_eq!(
            session.delete("/a").await.unwrap_err(),
            StoreError::NotEmpty("/a".to_string())
        );
        session.delete("/a/b").await.unwrap();
        session.delete("/a").await.unwrap();
        assert!(session.delete("/a").await.unwrap_err().is_no_node());
        assert!(matches!(
            session.delete("/").await.unwrap_err(),
            StoreError::BadArguments(_)
        ));
    }

    #[tokio::test]
    async fn test_ephemeral_cannot_have_children() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/e", b"", CreateMode::Ephemeral).await.unwrap();
        assert_eq!(
            session
                .create("/e/child", b"", CreateMode::Persistent)
                .await
                .unwrap_err(),
            StoreError::NoChildrenForEphemerals("/e".to_string())
        );
    }

    #[tokio::test]
    async fn test_exists_watch_fires_on_delete() {
        let ensemble = MemoryEnsemble::new();
        let owner = ensemble.connect();
        let watcher = ensemble.connect();
        owner.create("/n", b"", CreateMode::Ephemeral).await.unwrap();

        let (exists, watch) = watcher.exists_watch("/n").await.unwrap();
        assert!(exists);
        owner.delete("/n").await.unwrap();

        let event = watch.await.unwrap();
        assert_eq!(event.event_type, EventType::NodeDeleted);
        assert_eq!(event.path, "/n");
    }

    #[tokio::test]
    async fn test_exists_watch_on_missing_node_fires_on_create() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();

        let (exists, watch) = session.exists_watch("/later").await.unwrap();
        assert!(!exists);
        session.create("/later", b"", CreateMode::Persistent).await.unwrap();
        assert_eq!(watch.await.unwrap().event_type, EventType::NodeCreated);
    }

    #[tokio::test]
    async fn test_watch_fires_on_data_change() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/d", b"v0", CreateMode::Persistent).await.unwrap();

        let (_, watch) = session.exists_watch("/d").await.unwrap();
        assert_eq!(session.set_data("/d", b"v1").unwrap(), 1);
        assert_eq!(watch.await.unwrap().event_type, EventType::NodeDataChanged);
        assert_eq!(session.get_data("/d").await.unwrap(), b"v1".to_vec());
    }

    #[tokio::test]
    async fn test_expire_session_removes_ephemerals() {
        let ensemble = MemoryEnsemble::new();
        let doomed = ensemble.connect();
        let observer = ensemble.connect();

        doomed.create("/p", b"", CreateMode::Persistent).await.unwrap();
        let eph = doomed
            .create("/p/e-", b"", CreateMode::EphemeralSequential)
            .await
            .unwrap();
        assert_eq!(ensemble.ephemeral_owner(&eph), Some(doomed.session_id()));

        let (_, watch) = observer.exists_watch(&eph).await.unwrap();
        let mut state = doomed.session_state();
        doomed.expire();

        assert_eq!(watch.await.unwrap().event_type, EventType::NodeDeleted);
        assert!(!ensemble.exists(&eph));
        assert!(ensemble.exists("/p"));
        assert_eq!(*state.borrow_and_update(), SessionState::SessionExpired);
        assert!(doomed.children("/p").await.unwrap_err().is_session_expired());
        assert_eq!(ensemble.live_sessions(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_and_reconnect() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/eph", b"", CreateMode::Ephemeral).await.unwrap();

        session.disconnect();
        assert_eq!(*session.session_state().borrow(), SessionState::Disconnected);
        assert_eq!(
            session.children("/").await.unwrap_err(),
            StoreError::ConnectionLoss
        );
        assert!(ensemble.exists("/eph"));

        session.reconnect();
        assert_eq!(*session.session_state().borrow(), SessionState::Connected);
        assert_eq!(session.children("/").await.unwrap(), vec!["eph".to_string()]);
    }

    #[tokio::test]
    async fn test_disconnect_past_session_timeout_expires() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect_with_timeout(Duration::from_millis(20));
        session.create("/eph", b"", CreateMode::Ephemeral).await.unwrap();
        let mut state = session.session_state();

        session.disconnect();
        tokio::time::timeout(Duration::from_secs(1), state.wait_for(|s| s.is_terminal()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*session.session_state().borrow(), SessionState::SessionExpired);
        assert!(!ensemble.exists("/eph"));
    }

    #[tokio::test]
    async fn test_reconnect_within_session_timeout_survives() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect_with_timeout(Duration::from_millis(40));
        session.create("/eph", b"", CreateMode::Ephemeral).await.unwrap();

        session.disconnect();
        session.reconnect();
        // A second blip restarts the clock; the first timer must not end it early
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.disconnect();
        tokio::time::sleep(Duration::from_millis(25)).await;
        session.reconnect();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(*session.session_state().borrow(), SessionState::Connected);
        assert!(ensemble.exists("/eph"));
        assert_eq!(session.session_timeout(), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_watch_bookkeeping() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/w", b"", CreateMode::Persistent).await.unwrap();

        let (_, first) = session.exists_watch("/w").await.unwrap();
        let (_, second) = session.exists_watch("/w").await.unwrap();
        assert_eq!(ensemble.watchers("/w"), 2);
        assert_eq!(ensemble.watch_registrations("/w"), 2);

        drop(first);
        assert_eq!(ensemble.watchers("/w"), 1);

        session.delete("/w").await.unwrap();
        assert_eq!(second.await.unwrap().event_type, EventType::NodeDeleted);
        assert_eq!(ensemble.watchers("/w"), 0);
        assert_eq!(ensemble.watch_registrations("/w"), 2);
        assert_eq!(ensemble.watchers("/never"), 0);
    }

    #[tokio::test]
    async fn test_close_session() {
        let ensemble = MemoryEnsemble::new();
        let session = ensemble.connect();
        session.create("/eph", b"", CreateMode::Ephemeral).await.unwrap();
        session.create("/keep", b"", CreateMode::Persistent).await.unwrap();

        session.close();
        assert_eq!(*session.session_state().borrow(), SessionState::Closed);
        assert!(!ensemble.exists("/eph"));
        assert!(ensemble.exists("/keep"));
        assert_eq!(ensemble.node_count(), 2);
    }
}
