//! Verified bulk apply of mapping text to one device.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;
use tabled::settings::Style;

use dantesync_core::{ApplyOutcome, Controller, RxChannelSubscription, SyncConfig};

use crate::cli::{ApplyArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "#")]
    index: u32,
    #[tabled(rename = "Wanted source")]
    source: String,
}

impl From<&RxChannelSubscription> for PendingRow {
    fn from(s: &RxChannelSubscription) -> Self {
        Self {
            index: s.rx_channel_index,
            source: if s.is_clear() {
                "(clear)".into()
            } else {
                format!("{}@{}", s.subscribed_channel, s.subscribed_device)
            },
        }
    }
}

#[derive(Serialize)]
struct ApplyReport {
    device: String,
    requested: usize,
    skipped: Vec<String>,
    #[serde(flatten)]
    outcome: ApplyOutcome,
}

pub async fn handle(
    mut config: SyncConfig,
    args: ApplyArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let Some(text) = args.mapping_text() else {
        return Err(CliError::Validation {
            field: "mappings".into(),
            reason: "pass --mappings or at least one --set RX=SOURCE".into(),
        });
    };
    if let Some(batch_size) = args.batch_size {
        config.bulk.batch_size = batch_size;
    }
    if let Some(retries) = args.retries {
        config.bulk.retries = retries;
    }

    let identifier = args.device.clone();
    let (parsed, outcome) = Controller::oneshot(config, |c| async move {
        c.force_fetch().await?;
        c.apply_mapping(&identifier, &text).await
    })
    .await?;

    if !parsed.unknown.is_empty() && !global.quiet {
        eprintln!("Skipped unknown rx channels: {}", parsed.unknown.join(", "));
    }

    let report = ApplyReport {
        device: args.device,
        requested: parsed.request.len(),
        skipped: parsed.unknown,
        outcome,
    };
    let out = output::render_single(&global.output, &report, detail, |r| {
        outcome_label(&r.outcome).into()
    })?;
    output::print_output(&out, global.quiet);

    match report.outcome {
        ApplyOutcome::Converged { .. } => Ok(()),
        ApplyOutcome::Unverifiable { reason } => Err(CliError::ApplyFailed {
            device: report.device,
            reason,
        }),
        ApplyOutcome::Exhausted {
            attempts,
            unconverged,
        } => Err(CliError::ApplyFailed {
            device: report.device,
            reason: format!(
                "{} channel(s) unconverged after {attempts} attempts",
                unconverged.len()
            ),
        }),
    }
}

fn outcome_label(outcome: &ApplyOutcome) -> &'static str {
    match outcome {
        ApplyOutcome::Converged { .. } => "converged",
        ApplyOutcome::Unverifiable { .. } => "unverifiable",
        ApplyOutcome::Exhausted { .. } => "exhausted",
    }
}

fn detail(report: &ApplyReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Device:    {}", report.device);
    let _ = writeln!(out, "Requested: {} channel(s)", report.requested);
    match &report.outcome {
        ApplyOutcome::Converged { attempts } => {
            let _ = write!(out, "Result:    converged after {attempts} attempt(s)");
        }
        ApplyOutcome::Unverifiable { reason } => {
            let _ = write!(out, "Result:    could not verify ({reason})");
        }
        ApplyOutcome::Exhausted {
            attempts,
            unconverged,
        } => {
            let _ = writeln!(
                out,
                "Result:    {} channel(s) unconverged after {attempts} attempts",
                unconverged.len()
            );
            let rows: Vec<PendingRow> = unconverged.iter().map(PendingRow::from).collect();
            let _ = write!(out, "{}", tabled::Table::new(rows).with(Style::rounded()));
        }
    }
    out
}
