//! Long-running sync: poll the domain, print status changes, and push
//! regenerated definitions only when they actually changed.

use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use dantesync_core::{
    Controller, DefinitionCache, DefinitionKind, StatusReport, SyncConfig, SyncEvent,
};

use crate::choices::{ChannelChoices, routing_state};
use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    mut config: SyncConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(interval) = args.interval {
        config.poll_interval = interval;
    }
    let threshold = config.max_channels_for_dropdowns;
    let json_lines = matches!(global.output, OutputFormat::Json | OutputFormat::JsonCompact);
    let color = output::should_color(&global.color);
    let quiet = global.quiet;

    let controller = Controller::new(config);
    let mut events = controller.events();
    let mut status = controller.status();
    let definitions = DefinitionCache::new(move |kind: DefinitionKind, value: &Value| {
        if quiet {
            return;
        }
        if json_lines {
            println!("{}", json!({ "kind": kind.to_string(), "definitions": value }));
        } else {
            println!("{} {kind} updated ({} entries)", timestamp(), entry_count(value));
        }
    });

    controller.connect().await?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = status.borrow_and_update().clone();
                print_status(&report, json_lines, color, quiet);
            }
            event = events.recv() => match event {
                Ok(SyncEvent::DefinitionsStale) => {
                    let choices = ChannelChoices::from_domain(&controller.snapshot(), threshold);
                    if !choices.dropdowns && choices.is_empty() {
                        debug!(threshold, "domain above dropdown threshold, choices left empty");
                    }
                    definitions.update(DefinitionKind::Actions, &choices)?;
                }
                Ok(SyncEvent::CheckFeedbacks) => {
                    definitions.update(DefinitionKind::Feedbacks, &routing_state(&controller.snapshot()))?;
                }
                Ok(SyncEvent::Refreshed { mode, poll }) => debug!(%mode, poll, "snapshot refreshed"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.disconnect().await;
    Ok(())
}

fn print_status(report: &StatusReport, json_lines: bool, color: bool, quiet: bool) {
    if quiet {
        return;
    }
    if json_lines {
        println!("{}", json!({ "kind": "status", "status": report }));
        return;
    }
    let label = output::status_label(report.status, color);
    match &report.message {
        Some(message) => println!("{} Status: {label}: {message}", timestamp()),
        None => println!("{} Status: {label}", timestamp()),
    }
}

fn timestamp() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}

/// Entries in a definitions payload: array length, or the summed lengths
/// of an object's array fields.
fn entry_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(fields) => fields.values().filter_map(Value::as_array).map(Vec::len).sum(),
        _ => 0,
    }
}
