#![forbid(unsafe_code)]

//! walkrec public facade crate.
//!
//! Re-exports the recording surface from the internal crates and offers a
//! prelude for instrumenting an app:
//!
//! ```ignore
//! use walkrec::prelude::*;
//!
//! let provider = Provider::from_config(&RecorderConfig::from_env(), location);
//! let Instrumented { root, controls } = provider.instrument(&app_children);
//! // mount `root`; call `controls.start()` / `controls.end()`
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use walkrec_core::{
    Bounds, Element, ElementKind, EventKind, GeometryError, Handler, Location, MountedNode,
    NodeKey, NodeRef, PathId, Props, SharedLocation, StyleMap, TypeMap, UiEvent, ViewNode,
    async_handler, handler,
};

// --- Snapshot re-exports ---------------------------------------------------

pub use walkrec_widgets::{GuiState, StateTable, UNCAPTURED_STATE_ID, Widget, capture_tree};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "state-persistence")]
pub use walkrec_runtime::FileStorage;
pub use walkrec_runtime::{
    Action, ActionType, Instrumented, MemoryStorage, PersistedSession, Provider, Recorder,
    RecorderConfig, RecordingControls, SessionDump, SessionStore, StorageBackend, StorageError,
    StoreState, Walkthrough, instrument,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for walkrec APIs.
#[derive(Debug)]
pub enum Error {
    /// Session storage failed.
    Storage(StorageError),
    /// A mounted node could not report its geometry.
    Geometry(GeometryError),
    /// JSON encoding failed.
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Geometry(err) => write!(f, "{err}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Geometry(err) => Some(err),
            Self::Serialization(_) => None,
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<GeometryError> for Error {
    fn from(err: GeometryError) -> Self {
        Self::Geometry(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Standard result type for walkrec APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Archived walkthroughs of `recorder` as a JSON array.
pub fn walkthroughs_json(recorder: &Recorder) -> Result<String> {
    let state = recorder.snapshot();
    let walkthroughs: Vec<&Walkthrough> = state.previous_walkthroughs.iter().collect();
    Ok(serde_json::to_string(&walkthroughs)?)
}

/// The session currently stored for `recorder`, if it persists at all.
pub fn stored_session(recorder: &Recorder) -> Result<Option<PersistedSession>> {
    match recorder.session() {
        Some(session) => Ok(session.load()?),
        None => Ok(None),
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Action, ActionType, Element, Error, GuiState, Instrumented, Location, PathId, Provider,
        Recorder, RecorderConfig, RecordingControls, Result, SharedLocation, Walkthrough, Widget,
        handler,
    };

    pub use crate::{core, runtime, widgets};
}

pub use walkrec_core as core;
pub use walkrec_runtime as runtime;
pub use walkrec_widgets as widgets;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn errors_convert_and_display() {
        let err: Error = GeometryError::Detached.into();
        assert_eq!(err.to_string(), "node is detached");
        assert!(std::error::Error::source(&err).is_some());

        let err: Error = StorageError::Unavailable("offline".into()).into();
        assert!(err.to_string().contains("offline"));

        let bad = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let err: Error = bad.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn walkthroughs_json_lists_archives() {
        let recorder = Recorder::in_memory();
        let controls = RecordingControls::new(
            recorder.clone(),
            Arc::new(SharedLocation::new("/")),
            PathId::from("/html/body/div"),
        );
        assert_eq!(walkthroughs_json(&recorder).expect("json"), "[]");

        controls.start();
        controls.end();
        let json: serde_json::Value =
            serde_json::from_str(&walkthroughs_json(&recorder).expect("json")).expect("parse");
        assert_eq!(json.as_array().map(Vec::len), Some(1));
        assert_eq!(json[0]["withPropagatedActions"][0]["actionType"], "START_RECORDING");
    }

    #[test]
    fn stored_session_follows_backend() {
        assert!(stored_session(&Recorder::in_memory()).expect("no session").is_none());

        let recorder = Recorder::with_backend(
            &RecorderConfig::default().with_deterministic(true),
            Arc::new(MemoryStorage::new()),
        );
        RecordingControls::new(
            recorder.clone(),
            Arc::new(SharedLocation::new("/")),
            PathId::from("/html/body/div"),
        )
        .start();
        let stored = stored_session(&recorder).expect("load").expect("stored");
        assert!(stored.walkthrough_active);
        assert_eq!(stored.actions.len(), 1);
    }
}
