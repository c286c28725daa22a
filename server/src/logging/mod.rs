use crate::config::LogsConfig;
use crate::logging::format::Formatter;
pub use log_writer::LogWriter;
use tracing::Level;
use tracing::Metadata;
use tracing_subscriber::Layer;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

mod format;
mod log_writer;

const CRATE_TARGET: &str = "deviceadm";

fn is_own_target(metadata: &Metadata<'_>) -> bool {
    metadata.target().starts_with(CRATE_TARGET)
}

/// Crate events at `level` or above. Crate spans always pass, events below them need the
/// span fields for the `request_id`.
fn own_filter(level: Level) -> filter::FilterFn<impl Fn(&Metadata<'_>) -> bool> {
    filter::filter_fn(move |metadata| {
        is_own_target(metadata) && (metadata.is_span() || metadata.level() <= &level)
    })
}

/// Installs the global subscriber.
///
/// Events of this crate are written at the configured level, either to stdio or to
/// `deviceadm.log` when file logging is enabled. Third-party events only show up from
/// `WARN` on.
pub fn registry_logs(writer: &mut LogWriter, config: &LogsConfig) -> anyhow::Result<()> {
    let mut layers = Vec::new();
    let level = config.level;
    match config.parse_dir()? {
        Some(dir) if config.enable_file_logging => {
            let access_file = writer.create_file_writer(dir.join("deviceadm.log"))?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(Formatter::new(false))
                .with_writer(access_file)
                .with_filter(own_filter(level));
            layers.push(file_layer.boxed());
        }
        _ => {
            let stdio_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .event_format(Formatter::new(true))
                .with_filter(own_filter(level));
            layers.push(stdio_layer.boxed());
        }
    }
    // third-party crates
    {
        let general_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(Formatter::new(true))
            .with_filter(filter::filter_fn(|metadata| {
                !is_own_target(metadata) && metadata.level() <= &Level::WARN
            }));
        layers.push(general_layer.boxed());
    }
    tracing_subscriber::registry()
        .with(layers)
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;
    Ok(())
}
