#![forbid(unsafe_code)]

//! A mock host wired to a provider.
//!
//! [`RecordingSession`] mounts an app through [`Provider::instrument`] on
//! every render, next to a control bar holding the start and end buttons,
//! so tests drive a recording exactly the way a user would.

use std::sync::Arc;

use tracing::debug;

use walkrec_core::{Element, NodeKey, PathId, SharedLocation, handler};
use walkrec_runtime::{
    END_ELEMENT_ID, Provider, Recorder, RecorderConfig, RecordingControls, START_ELEMENT_ID,
    Walkthrough,
};

use crate::dom::{EventOutcome, MockDom, MockNode, RenderHandle};

/// Control bar with the start and end buttons.
pub fn control_bar(controls: &RecordingControls) -> Element {
    let start = controls.clone();
    let end = controls.clone();
    Element::host("div")
        .attr("id", "walkthrough-controls")
        .child(
            Element::host("button")
                .attr("id", START_ELEMENT_ID)
                .on_click(handler(move |_| {
                    start.start();
                }))
                .child(Element::text("Start")),
        )
        .child(
            Element::host("button")
                .attr("id", END_ELEMENT_ID)
                .on_click(handler(move |_| {
                    end.end();
                }))
                .child(Element::text("End")),
        )
}

pub struct RecordingSession {
    dom: MockDom,
    provider: Provider,
}

impl RecordingSession {
    /// Session at `path` with an in-memory recorder.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self::with_recorder(Recorder::in_memory(), path, RecorderConfig::default().root_path)
    }

    #[must_use]
    pub fn with_recorder(
        recorder: Recorder,
        path: &str,
        root_id: impl Into<PathId>,
    ) -> Self {
        let location = SharedLocation::new(path);
        let dom = MockDom::new(location.clone());
        let provider = Provider::new(recorder, location, root_id);
        Self { dom, provider }
    }

    /// Session built from `config`, starting at `path`.
    #[must_use]
    pub fn from_config(config: &RecorderConfig, path: &str) -> Self {
        Self::with_recorder(Recorder::new(config), path, config.root_path.clone())
    }

    /// Mount `app`, re-instrumenting its output on every render.
    pub fn mount<F>(&self, app: F)
    where
        F: Fn() -> Vec<Element> + Send + Sync + 'static,
    {
        let provider = self.provider.clone();
        let controls = provider.controls();
        self.dom.mount(move || {
            let instrumented = provider.instrument(&app());
            Element::host("main")
                .attr("id", "walkrec-host")
                .child(instrumented.root)
                .child(control_bar(&controls))
        });
        debug!(nodes = self.dom.nodes().len(), "session mounted");
    }

    pub fn dom(&self) -> &MockDom {
        &self.dom
    }

    pub fn handle(&self) -> RenderHandle {
        self.dom.handle()
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn recorder(&self) -> &Recorder {
        self.provider.recorder()
    }

    pub fn controls(&self) -> RecordingControls {
        self.provider.controls()
    }

    /// Click the start button.
    pub fn start(&self) -> EventOutcome {
        self.click_id(START_ELEMENT_ID)
    }

    /// Click the end button and return the archived walkthrough.
    pub fn end(&self) -> Option<Walkthrough> {
        self.click_id(END_ELEMENT_ID);
        self.recorder()
            .snapshot()
            .previous_walkthroughs
            .last()
            .cloned()
    }

    /// Click the deepest element whose text is `text`.
    pub fn click_text(&self, text: &str) -> Option<EventOutcome> {
        let node = self.dom.find_by_text(text)?;
        Some(self.dom.click(node.key()))
    }

    pub fn click(&self, key: NodeKey) -> EventOutcome {
        self.dom.click(key)
    }

    /// First element with the given `id` attribute.
    pub fn by_id(&self, id: &str) -> Option<Arc<MockNode>> {
        self.dom.nodes().into_iter().find(|n| n.attr("id") == Some(id))
    }

    fn click_id(&self, id: &str) -> EventOutcome {
        match self.by_id(id) {
            Some(node) => self.dom.click(node.key()),
            None => EventOutcome::default(),
        }
    }
}
