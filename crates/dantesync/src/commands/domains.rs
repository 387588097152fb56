//! Domain discovery.

use tabled::Tabled;

use dantesync_core::{Controller, DomainSummary, SyncConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
}

impl From<&DomainSummary> for DomainRow {
    fn from(d: &DomainSummary) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone(),
        }
    }
}

pub async fn handle(config: SyncConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let domains = Controller::oneshot(config, |c| async move { c.list_domains().await }).await?;

    let out = output::render_list(
        &global.output,
        &domains,
        |d| DomainRow::from(d),
        |d| d.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
