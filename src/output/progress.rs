//! Terminal rendering of a running action's progress events.

use std::io::{self, BufRead};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, trace, warn};

use crate::controller::{ProgressEvent, RunHandle};

/// Prompt shown when a plan pauses.
pub const CONTINUE_PROMPT: &str = "Press enter to continue";

/// How progress is shown while a run is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Progress bar on stderr.
    Bar,
    /// One JSON object per event on stderr.
    Json,
    /// Nothing but pause prompts.
    Silent,
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Read one line from stdin on a helper thread, then release the pause.
///
/// The reader thread may outlive a cancelled run; it only ever sends on
/// a channel nobody listens to any more.
fn acknowledge_on_enter(ack: Sender<()>) {
    let spawned = thread::Builder::new()
        .name("fleet-pause".to_string())
        .spawn(move || {
            let mut line = String::new();
            if let Err(err) = io::stdin().lock().read_line(&mut line) {
                warn!(error = %err, "Cannot read from stdin, continuing");
            }
            let _ = ack.send(());
        });
    if let Err(err) = spawned {
        warn!(error = %err, "Cannot wait for enter, continuing");
    }
}

/// Drain the run's events until the worker finishes, then hand the run back.
pub fn render_run(handle: RunHandle, mode: RenderMode) -> RunHandle {
    let bar = match mode {
        RenderMode::Bar => ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr()),
        RenderMode::Json | RenderMode::Silent => ProgressBar::hidden(),
    };
    bar.set_style(bar_style());
    bar.enable_steady_tick(Duration::from_millis(120));

    for event in handle.events() {
        match event {
            ProgressEvent::Started { total } => {
                debug!(total, "Run started");
                bar.set_length(total as u64);
                if mode == RenderMode::Json {
                    eprintln!("{}", serde_json::json!({ "event": "started", "total": total }));
                }
            }
            ProgressEvent::Step {
                current,
                total,
                title,
            } => {
                trace!(current, total, %title, "Step");
                bar.set_length(total as u64);
                bar.set_position(current as u64);
                if mode == RenderMode::Json {
                    eprintln!(
                        "{}",
                        serde_json::json!({
                            "event": "step",
                            "current": current,
                            "total": total,
                            "title": title,
                        })
                    );
                }
                bar.set_message(title);
            }
            ProgressEvent::Wait { message, ack } => {
                match mode {
                    RenderMode::Json => eprintln!(
                        "{}",
                        serde_json::json!({ "event": "wait", "message": message })
                    ),
                    RenderMode::Bar | RenderMode::Silent => bar.suspend(|| {
                        eprintln!("{message}");
                        eprintln!("{CONTINUE_PROMPT}");
                    }),
                }
                acknowledge_on_enter(ack);
            }
        }
    }

    bar.finish_and_clear();
    handle
}
