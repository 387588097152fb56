//! Rx routing of one device, as a table or as mapping text.

use serde::Serialize;
use tabled::Tabled;

use dantesync_core::mapping::{learn_mapping, source_of};
use dantesync_core::{Controller, RxChannel, SyncConfig};

use crate::cli::{GlobalOpts, OutputFormat, RoutesArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "#")]
    index: u32,
    #[tabled(rename = "Rx")]
    name: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&RxChannel> for RouteRow {
    fn from(rx: &RxChannel) -> Self {
        let source = source_of(rx);
        Self {
            index: rx.index,
            name: rx.label(),
            source: if source.is_empty() { "-".into() } else { source },
            status: rx.status.clone().unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct LearnedMapping<'a> {
    device: &'a str,
    mapping: String,
}

pub async fn handle(
    config: SyncConfig,
    args: RoutesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let identifier = args.device;
    let device = Controller::oneshot(config, |c| async move {
        c.force_fetch().await?;
        c.device(&identifier)
    })
    .await?;

    let out = if args.learn {
        let learned = LearnedMapping {
            device: &device.name,
            mapping: learn_mapping(&device),
        };
        match global.output {
            OutputFormat::Table | OutputFormat::Plain => learned.mapping,
            _ => output::render_single(
                &global.output,
                &learned,
                |l| l.mapping.clone(),
                |l| l.mapping.clone(),
            )?,
        }
    } else {
        let mut channels = device.rx_channels.clone();
        channels.sort_by_key(|rx| rx.index);
        output::render_list(
            &global.output,
            &channels,
            |rx| RouteRow::from(rx),
            |rx| format!("{}={}", rx.label(), source_of(rx)),
        )?
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
