#![forbid(unsafe_code)]

//! Instrumentation entry point.
//!
//! A [`Provider`] wraps an application's children in a root container
//! registered under the first path id, instruments everything below it, and
//! hands out the [`RecordingControls`] for that tree. Call
//! [`Provider::instrument`] on every render; ids are recomputed each time.

use std::sync::Arc;

use tracing::debug;

use walkrec_core::{Element, Location, NodeRef, PathId, TypeMap};

use crate::config::RecorderConfig;
use crate::controls::RecordingControls;
use crate::instrument::{InstrumentContext, instrument_children};
use crate::recorder::Recorder;

/// Tag of the container the provider mounts at the root id.
pub const ROOT_CONTAINER_TAG: &str = "div";

/// An instrumented subtree and its control surface.
pub struct Instrumented {
    pub root: Element,
    pub controls: RecordingControls,
}

#[derive(Clone)]
pub struct Provider {
    recorder: Recorder,
    location: Arc<dyn Location>,
    root_id: PathId,
}

impl Provider {
    #[must_use]
    pub fn new(
        recorder: Recorder,
        location: impl Location + 'static,
        first_path_id: impl Into<PathId>,
    ) -> Self {
        Self {
            recorder,
            location: Arc::new(location),
            root_id: first_path_id.into(),
        }
    }

    /// Provider with a recorder built from `config`.
    #[must_use]
    pub fn from_config(config: &RecorderConfig, location: impl Location + 'static) -> Self {
        Self::new(Recorder::new(config), location, config.root_path.clone())
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn root_id(&self) -> &PathId {
        &self.root_id
    }

    pub fn controls(&self) -> RecordingControls {
        RecordingControls::new(
            self.recorder.clone(),
            Arc::clone(&self.location),
            self.root_id.clone(),
        )
    }

    /// Instrument `children` under the root container.
    pub fn instrument(&self, children: &[Element]) -> Instrumented {
        let types = TypeMap::build(children);
        if types.collisions().next().is_some() {
            debug!(
                collisions = types.collisions().count(),
                "instrumenting with ambiguous composite names"
            );
        }
        let ctx = InstrumentContext {
            recorder: self.recorder.clone(),
            location: Arc::clone(&self.location),
            root_id: self.root_id.clone(),
            types: Arc::new(types),
        };
        let wrapped = instrument_children(children, &self.root_id, false, &ctx);

        let recorder = self.recorder.clone();
        let root_id = self.root_id.clone();
        let root = Element::host(ROOT_CONTAINER_TAG)
            .children(wrapped)
            .on_mount(Arc::new(move |node: NodeRef| {
                recorder.register_ref(root_id.clone(), node);
            }));

        Instrumented {
            root,
            controls: self.controls(),
        }
    }
}

/// Instrument `children` with a shared recorder.
pub fn instrument(
    recorder: &Recorder,
    children: &[Element],
    location: impl Location + 'static,
    first_path_id: impl Into<PathId>,
) -> Instrumented {
    Provider::new(recorder.clone(), location, first_path_id).instrument(children)
}
