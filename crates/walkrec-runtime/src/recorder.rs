#![forbid(unsafe_code)]

//! The shared recorder handle.
//!
//! A [`Recorder`] owns the current [`StoreState`] and funnels every mutation
//! through a single-consumer queue. `dispatch` enqueues a transition and then
//! drains the queue under the consumer lock, so transitions are applied one
//! at a time, in enqueue order, each against the state the previous one
//! produced. Readers take an `Arc` snapshot and never block writers for
//! longer than a pointer swap.
//!
//! Overlapping interactions are not serialized end to end: two handlers that
//! await concurrently may capture their states in either order. Only the
//! store transitions themselves are ordered.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};
use web_time::{SystemTime, UNIX_EPOCH};

use walkrec_core::{NodeRef, PathId};
use walkrec_widgets::{GuiState, capture_tree};

use crate::config::RecorderConfig;
#[cfg(feature = "state-persistence")]
use crate::state_persistence::FileStorage;
use crate::state_persistence::{MemoryStorage, SessionStore, StorageBackend};
use crate::store::{StoreState, Transition};

/// Source of action timestamps.
#[derive(Debug)]
pub enum Clock {
    /// Wall-clock milliseconds since the Unix epoch.
    Wall,
    /// `seq * 1000`, starting at 1000.
    Deterministic(AtomicI64),
}

impl Clock {
    #[must_use]
    pub fn deterministic() -> Self {
        Clock::Deterministic(AtomicI64::new(0))
    }

    pub fn now(&self) -> i64 {
        match self {
            Clock::Wall => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0),
            Clock::Deterministic(seq) => (seq.fetch_add(1, Ordering::Relaxed) + 1) * 1000,
        }
    }
}

struct Inner {
    state: RwLock<Arc<StoreState>>,
    queue: Sender<Transition>,
    consumer: Mutex<Receiver<Transition>>,
    session: Option<SessionStore>,
    clock: Clock,
}

/// Cloneable handle to the global store.
#[derive(Clone)]
pub struct Recorder {
    inner: Arc<Inner>,
}

impl Recorder {
    /// Build a recorder from configuration, restoring any persisted session.
    pub fn new(config: &RecorderConfig) -> Self {
        let session = config
            .persist
            .then(|| SessionStore::new(backend_for(config), config.storage_key.clone()));
        Self::build(session, clock_for(config))
    }

    /// Recorder persisting to `backend`, restoring any stored session.
    pub fn with_backend(config: &RecorderConfig, backend: Arc<dyn StorageBackend>) -> Self {
        let session = SessionStore::new(backend, config.storage_key.clone());
        Self::build(Some(session), clock_for(config))
    }

    /// Non-persisting recorder with a deterministic clock.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::build(None, Clock::deterministic())
    }

    fn build(session: Option<SessionStore>, clock: Clock) -> Self {
        let initial = session
            .as_ref()
            .map(SessionStore::restore)
            .unwrap_or_default();
        let (queue, consumer) = mpsc::channel();
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(Arc::new(initial)),
                queue,
                consumer: Mutex::new(consumer),
                session,
                clock,
            }),
        }
    }

    /// Current state.
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.inner
            .state
            .read()
            .map(|s| Arc::clone(&*s))
            .unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        self.snapshot().walkthrough_active
    }

    /// Timestamp for a new action.
    pub fn now(&self) -> i64 {
        self.inner.clock.now()
    }

    /// Enqueue `transition` and drain the queue.
    pub fn dispatch(&self, transition: Transition) {
        if self.inner.queue.send(transition).is_err() {
            warn!("dispatch queue closed; transition dropped");
            return;
        }
        let Ok(consumer) = self.inner.consumer.lock() else {
            warn!("dispatch consumer poisoned; transition dropped");
            return;
        };
        while let Ok(next) = consumer.try_recv() {
            self.apply(next);
        }
    }

    fn apply(&self, transition: Transition) {
        let persist = transition.touches_persisted();
        let next = Arc::new(self.snapshot().apply(transition));
        match self.inner.state.write() {
            Ok(mut guard) => *guard = Arc::clone(&next),
            Err(_) => {
                warn!("store lock poisoned; transition dropped");
                return;
            }
        }
        if persist && let Some(session) = &self.inner.session {
            if let Err(e) = session.persist(&next) {
                warn!(backend = session.backend_name(), error = %e, "failed to persist session");
            }
        }
    }

    /// Record the live node mounted under `id`.
    pub fn register_ref(&self, id: PathId, node: NodeRef) {
        self.dispatch(Transition::RegisterRef { id, node });
    }

    /// Capture the subtree registered under `root_id`.
    ///
    /// The state id is the one the table has (or would assign) for this
    /// content; the store re-interns on dispatch.
    pub fn capture_state(&self, root_id: &PathId, route: &str) -> GuiState {
        let snapshot = self.snapshot();
        let widgets = capture_tree(snapshot.node(root_id), root_id, route);
        if widgets.is_none() {
            debug!(root = %root_id, "capture root missing or unmounted");
        }
        let state_id = snapshot.gui_states.peek_id(widgets.as_ref(), route);
        GuiState {
            widgets,
            state_id,
            current_route: route.to_string(),
        }
    }

    /// The session store, when persistence is enabled.
    pub fn session(&self) -> Option<&SessionStore> {
        self.inner.session.as_ref()
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("state", &self.snapshot())
            .field("session", &self.inner.session)
            .finish()
    }
}

fn clock_for(config: &RecorderConfig) -> Clock {
    if config.deterministic {
        Clock::deterministic()
    } else {
        Clock::Wall
    }
}

fn backend_for(config: &RecorderConfig) -> Arc<dyn StorageBackend> {
    let backend: Arc<dyn StorageBackend> = match &config.state_file {
        #[cfg(feature = "state-persistence")]
        Some(path) => Arc::new(FileStorage::new(path)),
        #[cfg(not(feature = "state-persistence"))]
        Some(_) => {
            warn!("state file configured without the state-persistence feature; using memory storage");
            Arc::new(MemoryStorage::new())
        }
        None => Arc::new(MemoryStorage::new()),
    };
    debug!(backend = backend.name(), "session backend selected");
    backend
}
