#![forbid(unsafe_code)]

//! Test harness for walkrec: a mock host, recording sessions, and outline
//! snapshots.
//!
//! - **Mock host**: [`MockDom`] mounts element trees, routes, and delivers
//!   bubbling events with deterministic layout.
//! - **Sessions**: [`RecordingSession`] wires a provider into the host so a
//!   test can click through a walkthrough.
//! - **Outline snapshots**: [`widget_outline`] renders a captured widget tree
//!   as text and [`assert_outline_snapshot`] compares it with a stored file.
//!
//! # Updating Snapshots
//!
//! Run tests with `BLESS=1` to create or update snapshot files:
//!
//! ```sh
//! BLESS=1 cargo test
//! ```
//!
//! Snapshot files are stored under `tests/snapshots/` relative to the
//! crate's `CARGO_MANIFEST_DIR`.

pub mod dom;
pub mod session;

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use walkrec_widgets::Widget;

pub use dom::{EventOutcome, MockDom, MockNode, RenderHandle, StateCell};
pub use session::{RecordingSession, control_bar};

/// Install a `tracing` subscriber filtered by `RUST_LOG`, once per process.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Outline
// ============================================================================

/// Render a widget tree as one line per node, indented two spaces per level.
///
/// Element lines read `id @ x,y wxh`; text leaves read `id "text"`. Only
/// the root line carries the route.
pub fn widget_outline(root: &Widget) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "route {}", root.route);
    outline_into(root, 0, &mut out);
    out
}

fn outline_into(widget: &Widget, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match &widget.text {
        Some(text) => {
            let _ = writeln!(out, "{indent}{} {text:?}", widget.id);
        }
        None => {
            let _ = writeln!(
                out,
                "{indent}{} @ {},{} {}x{}",
                widget.id, widget.xpos, widget.ypos, widget.bounding_width, widget.bounding_height
            );
        }
    }
    for child in &widget.children {
        outline_into(child, depth + 1, out);
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Lines that differ between two outlines, as `-expected` / `+actual` pairs.
///
/// Trailing whitespace is ignored; the result is empty when the outlines
/// match.
pub fn diff_text(expected: &str, actual: &str) -> String {
    let expected: Vec<&str> = expected.lines().map(str::trim_end).collect();
    let actual: Vec<&str> = actual.lines().map(str::trim_end).collect();
    let mut out = String::new();
    for row in 0..expected.len().max(actual.len()) {
        let (old, new) = (expected.get(row), actual.get(row));
        if old == new {
            continue;
        }
        if let Some(old) = old {
            let _ = writeln!(out, "{:>4} -{old}", row + 1);
        }
        if let Some(new) = new {
            let _ = writeln!(out, "{:>4} +{new}", row + 1);
        }
    }
    out
}

/// `<crate>/tests/snapshots/<name>.snap`
pub fn snapshot_path(crate_dir: &Path, name: &str) -> PathBuf {
    crate_dir.join("tests/snapshots").join(format!("{name}.snap"))
}

fn blessing() -> bool {
    matches!(std::env::var("BLESS").as_deref(), Ok("1") | Ok("true"))
}

/// Compare `outline` with the stored snapshot, rewriting it under `BLESS=1`.
pub fn check_outline(path: &Path, outline: &str) -> Result<(), String> {
    if blessing() {
        return path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::write(path, outline))
            .map_err(|e| format!("cannot bless {}: {e}", path.display()));
    }
    let stored = match std::fs::read_to_string(path) {
        Ok(stored) => stored,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(format!(
                "no snapshot at {} (run with BLESS=1)\n{outline}",
                path.display()
            ));
        }
        Err(e) => return Err(format!("cannot read {}: {e}", path.display())),
    };
    let diff = diff_text(&stored, outline);
    if diff.is_empty() {
        Ok(())
    } else {
        Err(format!("outline differs from {} (BLESS=1 updates it)\n{diff}", path.display()))
    }
}

/// Assert that a widget outline matches `<crate_dir>/tests/snapshots/<name>.snap`.
///
/// # Panics
///
/// When the snapshot is missing or differs, unless `BLESS=1` is set.
pub fn assert_outline_snapshot(name: &str, root: &Widget, crate_dir: &str) {
    let path = snapshot_path(Path::new(crate_dir), name);
    if let Err(report) = check_outline(&path, &widget_outline(root)) {
        panic!("snapshot '{name}': {report}");
    }
}

/// Assert a widget outline against a snapshot of the calling crate.
#[macro_export]
macro_rules! assert_outline {
    ($name:expr, $widget:expr) => {
        $crate::assert_outline_snapshot($name, $widget, env!("CARGO_MANIFEST_DIR"))
    };
}
