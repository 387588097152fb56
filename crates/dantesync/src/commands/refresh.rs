//! Forced full fetch with a snapshot summary.

use chrono::{DateTime, Utc};
use serde::Serialize;

use dantesync_core::{Controller, Domain, SyncConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct RefreshSummary {
    id: String,
    name: String,
    devices: usize,
    rx_channels: usize,
    tx_channels: usize,
    subscribed: usize,
    refreshed_at: Option<DateTime<Utc>>,
}

impl RefreshSummary {
    fn new(domain: &Domain, refreshed_at: Option<DateTime<Utc>>) -> Self {
        let stats = domain.stats();
        Self {
            id: domain.id.clone(),
            name: domain.name.clone(),
            devices: stats.devices,
            rx_channels: stats.rx_channels,
            tx_channels: stats.tx_channels,
            subscribed: domain
                .devices
                .iter()
                .flat_map(|d| d.rx_channels.iter())
                .filter(|rx| rx.is_subscribed())
                .count(),
            refreshed_at,
        }
    }
}

pub async fn handle(config: SyncConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let summary = Controller::oneshot(config, |c| async move {
        c.force_fetch().await?;
        Ok(RefreshSummary::new(&c.snapshot(), c.store().last_refresh()))
    })
    .await?;

    let out = output::render_single(&global.output, &summary, detail, |s| s.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(s: &RefreshSummary) -> String {
    let refreshed = s
        .refreshed_at
        .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    format!(
        "Domain:      {} ({})\n\
         Devices:     {}\n\
         Rx channels: {} ({} subscribed)\n\
         Tx channels: {}\n\
         Refreshed:   {refreshed}",
        s.name, s.id, s.devices, s.rx_channels, s.subscribed, s.tx_channels
    )
}
