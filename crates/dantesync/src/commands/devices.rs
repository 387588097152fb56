//! Device listing.

use std::sync::Arc;

use tabled::Tabled;

use dantesync_core::{Controller, Device, SyncConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Rx")]
    rx: usize,
    #[tabled(rename = "Tx")]
    tx: usize,
    #[tabled(rename = "Subscribed")]
    subscribed: usize,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
            rx: d.rx_channels.len(),
            tx: d.tx_channels.len(),
            subscribed: d.rx_channels.iter().filter(|rx| rx.is_subscribed()).count(),
        }
    }
}

pub async fn handle(config: SyncConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let domain = Controller::oneshot(config, |c| async move {
        c.force_fetch().await?;
        Ok(c.snapshot())
    })
    .await?;

    let mut devices = domain.devices.clone();
    devices.sort_by(|a, b| a.name.cmp(&b.name));

    let out = output::render_list(
        &global.output,
        &devices,
        |d| DeviceRow::from(d),
        |d| d.name.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
