//! Election/Lock engine
//!
//! Every contender registers an ephemeral sequential node under the contention
//! path. The contender with the lowest sequence wins; everyone else watches
//! only the sibling immediately ahead of it, so a release wakes exactly one
//! waiter.
//!
//! Local state is tracked per normalized path:
//! - absent: idle
//! - `Contending`: a node is registered and the caller is waiting
//! - `Held(node)`: the caller is leader / lock holder
//! - `Releasing(node)`: resign/unlock is deleting the node
//!
//! A second acquire on a path with any entry fails with
//! [`CoordinationError::AlreadyHeld`] without touching the store.
//!
//! Acquire and release futures may be dropped at any await point. A dropped
//! acquire forgets its reservation and deletes its node in the background; a
//! dropped release puts the entry back to `Held` so unlock can be retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use turnstile_common::path::{join_path, node_name, normalize_path};
use turnstile_common::{ContentionKind, local_ip};
use turnstile_store::{CoordinationStore, SessionState, StoreError};

use crate::config::CoordinationConfig;
use crate::error::{CoordinationError, Result};
use crate::metrics;
use crate::path::{delete_path, ensure_path};
use crate::registrar::{register_plain, register_sequential_with_prefix};
use crate::sequence::{min_sequence, parse_sequence, predecessor};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Contending,
    Held(String),
    Releasing(String),
}

/// What this client owns under one contention path
#[derive(Debug, Clone)]
struct LocalLockState {
    /// Distinguishes successive acquires of the same path
    token: u64,
    kind: ContentionKind,
    phase: Phase,
}

impl LocalLockState {
    fn held_node(&self) -> Option<&str> {
        match &self.phase {
            Phase::Held(node) => Some(node),
            Phase::Contending | Phase::Releasing(_) => None,
        }
    }

    /// Counted by the held-paths gauge
    fn owns_node(&self) -> bool {
        matches!(self.phase, Phase::Held(_) | Phase::Releasing(_))
    }
}

/// Reservation of one in-flight acquire.
///
/// Dropped without [`Reservation::promote`], it removes the entry it created
/// and deletes the registered node in the background.
struct Reservation {
    states: Arc<DashMap<String, LocalLockState>>,
    store: Arc<dyn CoordinationStore>,
    path: String,
    token: u64,
    node: Option<String>,
}

impl Reservation {
    /// Turn the reservation into a hold. Fails if the entry was invalidated meanwhile.
    fn promote(mut self, node: String) -> Result<String> {
        self.node = None;
        let promoted = match self.states.get_mut(&self.path) {
            Some(mut state) if state.token == self.token => {
                state.phase = Phase::Held(node.clone());
                true
            }
            // Invalidated by a session loss while the last evaluation was in flight
            _ => false,
        };

        if !promoted {
            return Err(CoordinationError::SessionLoss(self.path.clone()));
        }
        metrics::increment_held_paths();
        Ok(node)
    }

    /// The node is gone or already cleaned up; only the local entry remains.
    fn disown_node(&mut self) {
        self.node = None;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let token = self.token;
        self.states.remove_if(&self.path, |_, state| {
            state.token == token && !state.owns_node()
        });

        let Some(node) = self.node.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(runtime) => {
                let store = self.store.clone();
                runtime.spawn(async move {
                    match store.delete(&node).await {
                        Ok(()) => debug!(node = %node, "Removed contender node of a cancelled acquire"),
                        Err(e) if e.is_no_node() => {}
                        Err(e) => warn!(node = %node, error = %e, "Failed to remove contender node of a cancelled acquire"),
                    }
                });
            }
            Err(_) => warn!(node = %node, "No runtime to remove contender node of a cancelled acquire"),
        }
    }
}

/// Restores a `Releasing` entry to `Held` unless the release completed.
struct Release<'a> {
    states: &'a DashMap<String, LocalLockState>,
    path: String,
    token: u64,
    node: String,
    done: bool,
}

impl Release<'_> {
    /// The node is gone: drop the entry.
    fn complete(mut self) {
        self.done = true;
        let token = self.token;
        if self
            .states
            .remove_if(&self.path, |_, state| state.token == token)
            .is_some()
        {
            metrics::decrement_held_paths(1);
        }
    }
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(mut state) = self.states.get_mut(&self.path)
            && state.token == self.token
        {
            state.phase = Phase::Held(self.node.clone());
        }
    }
}

/// Election and locking client bound to one coordination session
pub struct CoordinationClient {
    store: Arc<dyn CoordinationStore>,
    config: CoordinationConfig,
    identity: String,
    states: Arc<DashMap<String, LocalLockState>>,
    next_token: AtomicU64,
    /// Session monitor task handle
    monitor_handle: Option<JoinHandle<()>>,
}

impl CoordinationClient {
    pub fn new(store: Arc<dyn CoordinationStore>, config: CoordinationConfig) -> Result<Self> {
        config.validate()?;

        let identity = if config.identity.is_empty() {
            format!("{}#{:#x}", local_ip(), store.session_id())
        } else {
            config.identity.clone()
        };

        Ok(Self {
            store,
            config,
            identity,
            states: Arc::new(DashMap::new()),
            next_token: AtomicU64::new(1),
            monitor_handle: None,
        })
    }

    /// Clear all local state as soon as the session ends, instead of on the
    /// next operation. Must be called inside a tokio runtime.
    pub fn with_session_monitor(mut self) -> Self {
        let states = self.states.clone();
        let mut session = self.store.session_state();
        let session_id = self.store.session_id();

        let handle = tokio::spawn(async move {
            let state = session
                .wait_for(|s| s.is_terminal())
                .await
                .map(|state| *state)
                .unwrap_or(SessionState::Closed);
            Self::invalidate_states(&states, session_id, state);
        });

        self.monitor_handle = Some(handle);
        self
    }

    pub fn store(&self) -> &Arc<dyn CoordinationStore> {
        &self.store
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    /// Payload written into every contender node
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub async fn ensure_path(&self, path: &str) -> Result<()> {
        ensure_path(self.store.as_ref(), path).await
    }

    pub async fn delete_path(&self, path: &str) -> Result<()> {
        delete_path(self.store.as_ref(), path).await
    }

    /// Register an ephemeral sequential node with the configured prefix.
    pub async fn register_sequential(&self, parent_path: &str, payload: &[u8]) -> Result<String> {
        self.register_sequential_with_prefix(parent_path, &self.config.sequence_prefix, payload)
            .await
    }

    pub async fn register_sequential_with_prefix(
        &self,
        parent_path: &str,
        prefix: &str,
        payload: &[u8],
    ) -> Result<String> {
        register_sequential_with_prefix(self.store.as_ref(), parent_path, prefix, payload).await
    }

    pub async fn register_plain(&self, full_path: &str, payload: &[u8]) -> Result<String> {
        register_plain(self.store.as_ref(), full_path, payload).await
    }

    /// Campaign for leadership of `path`, waiting at most `timeout`.
    ///
    /// A zero timeout is a single attempt. Returns the full path of the
    /// winning node.
    pub async fn campaign(&self, path: &str, timeout: Duration) -> Result<String> {
        self.acquire(path, ContentionKind::Election, Some(timeout))
            .await
    }

    /// Give up leadership of `path`.
    pub async fn resign(&self, path: &str) -> Result<()> {
        self.release(path, ContentionKind::Election).await
    }

    /// Acquire the lock at `path`, waiting as long as it takes.
    pub async fn lock(&self, path: &str) -> Result<String> {
        self.acquire(path, ContentionKind::Lock, None).await
    }

    /// Acquire the lock at `path`, waiting at most `timeout`.
    pub async fn lock_with_timeout(&self, path: &str, timeout: Duration) -> Result<String> {
        self.acquire(path, ContentionKind::Lock, Some(timeout))
            .await
    }

    pub async fn unlock(&self, path: &str) -> Result<()> {
        self.release(path, ContentionKind::Lock).await
    }

    /// Whether this client currently holds `path`, as leader or lock holder
    pub fn is_held(&self, path: &str) -> bool {
        self.held_node(path).is_some()
    }

    /// Full path of the node through which this client holds `path`
    pub fn held_node(&self, path: &str) -> Option<String> {
        let path = normalize_path(path).ok()?;
        self.states
            .get(&path)
            .and_then(|state| state.held_node().map(str::to_string))
    }

    /// Every contention path this client holds, sorted
    pub fn held_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .states
            .iter()
            .filter(|entry| entry.held_node().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        paths.sort();
        paths
    }

    /// Identity stored in the current minimum node of `path`, if any.
    ///
    /// Works for any client, contender or not.
    pub async fn leader(&self, path: &str) -> Result<Option<String>> {
        let path = normalize_path(path)?;
        let prefix = &self.config.sequence_prefix;

        let siblings = match self.store.children(&path).await {
            Ok(children) => children,
            Err(e) if e.is_no_node() => return Ok(None),
            Err(e) => return Err(CoordinationError::store("children", path, e)),
        };
        let index = match min_sequence(&siblings, prefix) {
            Ok((_, index)) => index,
            Err(CoordinationError::EmptyInput | CoordinationError::NoValidSequence { .. }) => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let node = join_path(&path, &siblings[index]);
        match self.store.get_data(&node).await {
            Ok(data) => Ok(Some(String::from_utf8_lossy(&data).into_owned())),
            Err(e) if e.is_no_node() => Ok(None),
            Err(e) => Err(CoordinationError::store("get_data", node, e)),
        }
    }

    async fn acquire(
        &self,
        path: &str,
        kind: ContentionKind,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let path = normalize_path(path)?;
        let started = Instant::now();

        let result = self.acquire_inner(&path, kind, timeout).await;
        let waited = started.elapsed();

        match &result {
            Ok(node) => {
                metrics::record_acquire(kind, "acquired", waited);
                info!(%kind, path = %path, node = %node, ?waited, "Acquired");
            }
            Err(e) => {
                metrics::record_acquire(kind, e.outcome(), waited);
                debug!(%kind, path = %path, error = %e, "Acquire failed");
            }
        }
        result
    }

    async fn acquire_inner(
        &self,
        path: &str,
        kind: ContentionKind,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let mut session = self.store.session_state();
        let state = *session.borrow();
        if state.is_terminal() {
            Self::invalidate_states(&self.states, self.store.session_id(), state);
            return Err(CoordinationError::SessionLoss(path.to_string()));
        }

        let mut reservation = self.reserve(path, kind)?;

        let node = match register_sequential_with_prefix(
            self.store.as_ref(),
            path,
            &self.config.sequence_prefix,
            self.identity.as_bytes(),
        )
        .await
        {
            Ok(node) => node,
            Err(e) => return Err(self.classify(path, e)),
        };
        reservation.node = Some(node.clone());
        debug!(%kind, node = %node, "Registered contender");

        match self
            .wait_until_minimum(path, &node, timeout, &mut session)
            .await
        {
            Ok(()) => reservation.promote(node),
            Err(e) => {
                let own_node_gone = matches!(e, CoordinationError::SessionLoss(_));
                let e = self.classify(path, e);
                if !own_node_gone {
                    self.abandon(&node).await;
                }
                reservation.disown_node();
                Err(e)
            }
        }
    }

    /// Re-evaluate the sibling list until `node` is the minimum.
    async fn wait_until_minimum(
        &self,
        path: &str,
        node: &str,
        timeout: Option<Duration>,
        session: &mut watch::Receiver<SessionState>,
    ) -> Result<()> {
        let prefix = &self.config.sequence_prefix;
        let own_name = node_name(node);
        let own_sequence = parse_sequence(own_name, prefix)?;
        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);

        loop {
            let siblings = self
                .store
                .children(path)
                .await
                .map_err(|e| CoordinationError::store("children", path, e))?;
            if !siblings.iter().any(|name| name == own_name) {
                warn!(node = %node, "Own contender node disappeared");
                return Err(CoordinationError::SessionLoss(path.to_string()));
            }

            let (minimum, _) = min_sequence(&siblings, prefix)?;
            if minimum == own_sequence {
                return Ok(());
            }
            let Some((ahead, index)) = predecessor(&siblings, prefix, own_sequence) else {
                return Ok(());
            };

            let watched = join_path(path, &siblings[index]);
            let (exists, predecessor_gone) = self
                .store
                .exists_watch(&watched)
                .await
                .map_err(|e| CoordinationError::store("exists", watched.clone(), e))?;
            metrics::record_watch_rearm();
            if !exists {
                continue;
            }
            debug!(node = %node, watching = %watched, ahead, "Waiting for predecessor");

            let expired = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = session_ended(session) => {
                    return Err(CoordinationError::SessionLoss(path.to_string()));
                }
                // A cancelled watch also means re-evaluate
                _ = predecessor_gone => {}
                _ = expired => {
                    return Err(CoordinationError::Timeout {
                        path: path.to_string(),
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }

    async fn release(&self, path: &str, kind: ContentionKind) -> Result<()> {
        let path = normalize_path(path)?;

        let release = {
            let Some(mut state) = self.states.get_mut(&path) else {
                return Err(CoordinationError::NotHeld(path));
            };
            let node = match state.held_node() {
                Some(node) if state.kind == kind => node.to_string(),
                _ => return Err(CoordinationError::NotHeld(path.clone())),
            };
            state.phase = Phase::Releasing(node.clone());
            Release {
                states: &self.states,
                path: path.clone(),
                token: state.token,
                node,
                done: false,
            }
        };
        let node = release.node.clone();

        match self.store.delete(&node).await {
            Ok(()) => {}
            Err(e) if e.is_no_node() => {
                debug!(node = %node, "Held node already gone on release");
            }
            Err(e) if e.is_session_expired() => {
                drop(release);
                Self::invalidate_states(
                    &self.states,
                    self.store.session_id(),
                    SessionState::SessionExpired,
                );
                return Err(CoordinationError::SessionLoss(path));
            }
            Err(e) => {
                // Dropping the guard puts the entry back to Held
                return Err(CoordinationError::store("delete", node, e));
            }
        }

        release.complete();
        metrics::record_release(kind);
        info!(%kind, path = %path, node = %node, "Released");
        Ok(())
    }

    fn reserve(&self, path: &str, kind: ContentionKind) -> Result<Reservation> {
        match self.states.entry(path.to_string()) {
            Entry::Occupied(_) => Err(CoordinationError::AlreadyHeld(path.to_string())),
            Entry::Vacant(vacant) => {
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                vacant.insert(LocalLockState {
                    token,
                    kind,
                    phase: Phase::Contending,
                });
                Ok(Reservation {
                    states: self.states.clone(),
                    store: self.store.clone(),
                    path: path.to_string(),
                    token,
                    node: None,
                })
            }
        }
    }

    /// Best-effort removal of a node this client gave up on
    async fn abandon(&self, node: &str) {
        match self.store.delete(node).await {
            Ok(()) => debug!(node = %node, "Removed abandoned contender node"),
            Err(e) if e.is_no_node() => {}
            Err(e) => warn!(node = %node, error = %e, "Failed to remove abandoned contender node"),
        }
    }

    /// Map session-expired store failures to `SessionLoss`.
    ///
    /// Local state is cleared only when the session itself ended. A contender
    /// node that vanished under a live session fails just its own path.
    fn classify(&self, path: &str, err: CoordinationError) -> CoordinationError {
        let expired = match &err {
            CoordinationError::SessionLoss(_) => self.store.session_state().borrow().is_terminal(),
            CoordinationError::Store { source, .. } => matches!(source, StoreError::SessionExpired(_)),
            _ => false,
        };
        if !expired {
            return err;
        }

        Self::invalidate_states(
            &self.states,
            self.store.session_id(),
            SessionState::SessionExpired,
        );
        CoordinationError::SessionLoss(path.to_string())
    }

    fn invalidate_states(
        states: &DashMap<String, LocalLockState>,
        session_id: i64,
        state: SessionState,
    ) {
        let mut dropped = 0;
        let mut held = 0;
        states.retain(|_, state| {
            dropped += 1;
            if state.owns_node() {
                held += 1;
            }
            false
        });
        metrics::decrement_held_paths(held);
        if dropped > 0 {
            warn!(
                session_id,
                state = %state,
                dropped,
                "Session lost, cleared local election/lock state"
            );
        }
    }
}

/// Resolves once the session can no longer be used
async fn session_ended(session: &mut watch::Receiver<SessionState>) {
    // A dropped sender means the store is gone with the session
    let _ = session.wait_for(|s| s.is_terminal()).await;
}

impl Drop for CoordinationClient {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor_handle.take() {
            handle.abort();
        }
    }
}
