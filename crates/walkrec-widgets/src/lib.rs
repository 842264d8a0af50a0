#![forbid(unsafe_code)]

//! Snapshot records, capture, and state interning for walkrec.

pub mod intern;
pub mod snapshot;

pub use intern::StateTable;
pub use snapshot::{GuiState, UNCAPTURED_STATE_ID, UNKNOWN_GEOMETRY, Widget, capture_tree};
