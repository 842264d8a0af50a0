#![forbid(unsafe_code)]

//! Walkthrough recording reference application.
//!
//! Mounts a small two-page app in the mock host, scripts a walkthrough
//! through it, and prints the archived walkthrough as JSON on stdout.
//!
//! # Running
//!
//! ```sh
//! cargo run -p walkrec-harness
//! RUST_LOG=walkrec_runtime=debug cargo run -p walkrec-harness
//! WALKREC_STATE_FILE=/tmp/walkrec.json cargo run -p walkrec-harness
//! ```
//!
//! Configuration comes from the `WALKREC_*` environment variables; the
//! clock is always deterministic so repeated runs print the same output.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use walkrec_core::{Element, handler};
use walkrec_harness::{RecordingSession, RenderHandle, StateCell};
use walkrec_runtime::RecorderConfig;

fn home_page(width: StateCell<u32>) -> Element {
    let grow = width.clone();
    Element::host("section")
        .child(Element::host("h1").child(Element::text("Home")))
        .child(Element::host("div").style("width", format!("{}px", width.get())))
        .child(
            Element::host("button")
                .on_click(handler(move |_| grow.update(|w| *w += 50)))
                .child(Element::text("Grow")),
        )
        .child(
            Element::link("/project").child(Element::host("span").child(Element::text("Projects"))),
        )
}

fn project_page(name: StateCell<String>) -> Element {
    let typed = name.clone();
    Element::host("section")
        .child(Element::host("h1").child(Element::text("Projects")))
        .child(
            Element::host("form")
                .child(
                    Element::host("input")
                        .attr("placeholder", "Project name")
                        .on_change(handler(move |e| {
                            if let Some(value) = e.value() {
                                typed.set(value.to_string());
                            }
                        })),
                )
                .child(Element::host("button").child(Element::text("Create"))),
        )
        .child(Element::host("p").child(Element::text(name.get())))
}

fn demo_app(handle: &RenderHandle) -> impl Fn() -> Vec<Element> + Send + Sync + 'static {
    let width = handle.state(100u32);
    let name = handle.state(String::new());
    move || {
        vec![
            Element::switch()
                .child(Element::route("/").child(home_page(width.clone())))
                .child(Element::route("/project").child(project_page(name.clone()))),
        ]
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = RecorderConfig::from_env().with_deterministic(true);
    let session = RecordingSession::from_config(&config, "/");
    session.mount(demo_app(&session.handle()));

    session.start();
    session.click_text("Grow");
    session.click_text("Projects");

    let dom = session.dom();
    if let Some(input) = dom.find_by_tag("input").first() {
        dom.input(input.key(), "walkrec");
    }
    if let Some(form) = dom.find_by_tag("form").first() {
        dom.submit(form.key());
    }

    let Some(walkthrough) = session.end() else {
        error!("no walkthrough was archived");
        return ExitCode::FAILURE;
    };
    info!(
        actions = walkthrough.with_propagated_actions.len(),
        direct = walkthrough.without_propagated_actions.len(),
        states = session.recorder().snapshot().gui_states.len(),
        "walkthrough recorded"
    );

    match serde_json::to_string_pretty(&walkthrough) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to serialize walkthrough");
            ExitCode::FAILURE
        }
    }
}
