#![forbid(unsafe_code)]

//! Navigation collaborator.
//!
//! walkrec never navigates; it only tags captures with the current location.

use std::sync::{Arc, RwLock};

/// Source of the current location path (e.g. `"/home"`).
pub trait Location: Send + Sync {
    fn pathname(&self) -> String;
}

impl<F> Location for F
where
    F: Fn() -> String + Send + Sync,
{
    fn pathname(&self) -> String {
        self()
    }
}

/// A mutable location cell shared between a router and walkrec.
#[derive(Debug, Clone, Default)]
pub struct SharedLocation {
    path: Arc<RwLock<String>>,
}

impl SharedLocation {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Arc::new(RwLock::new(path.into())),
        }
    }

    /// Replace the current path.
    pub fn set(&self, path: impl Into<String>) {
        if let Ok(mut guard) = self.path.write() {
            *guard = path.into();
        }
    }
}

impl Location for SharedLocation {
    fn pathname(&self) -> String {
        self.path.read().map(|p| p.clone()).unwrap_or_default()
    }
}
