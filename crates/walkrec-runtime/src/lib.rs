#![forbid(unsafe_code)]

//! Runtime: the recorder store, relay instrumentation, and persistence.
//!
//! # Role in walkrec
//! `walkrec-runtime` connects the element model from `walkrec-core` with the
//! snapshots of `walkrec-widgets`. A [`Provider`] instruments an element
//! tree; the relays it installs capture before/after states around every
//! intercepted interaction and dispatch them into a shared [`Recorder`].
//!
//! # Flow
//! ```text
//! host event ─▶ relay ─▶ capture prev ─▶ original handler ─▶ capture next
//!                                                              │
//!                                Recorder::dispatch ◀──────────┘
//!                                   │
//!                      StoreState::apply ─▶ SessionStore::persist
//! ```

pub mod action;
pub mod config;
pub mod controls;
pub mod instrument;
pub mod provider;
pub mod recorder;
pub mod state_persistence;
pub mod store;

pub use action::{Action, ActionType, END_ELEMENT_ID, START_ELEMENT_ID, Walkthrough};
pub use config::RecorderConfig;
pub use controls::{RecordingControls, SessionDump};
pub use instrument::{InstrumentContext, instrument_children};
pub use provider::{Instrumented, Provider, instrument};
pub use recorder::{Clock, Recorder};
#[cfg(feature = "state-persistence")]
pub use state_persistence::FileStorage;
pub use state_persistence::{
    MemoryStorage, PersistedSession, SESSION_SCHEMA_VERSION, SessionStore, StorageBackend,
    StorageError, StorageResult, StoredEntry,
};
pub use store::{StoreState, Transition};
