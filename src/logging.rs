//! Log output: `[YYYY-MM-DD HH:MM:SS] message` to stdout and, when
//! configured, appended to a log file.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Event formatter shared by the stdout and file layers.
///
/// INFO lines carry no level tag; every other level is prefixed
/// (`WARN: ...`).
pub struct LogLineFormat;

impl<S, N> FormatEvent<S, N> for LogLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "[{}] ", Local::now().format(TIMESTAMP_FORMAT))?;
        let level = *event.metadata().level();
        if level != Level::INFO {
            write!(writer, "{}: ", level)?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber.
///
/// An unopenable log file is reported and otherwise ignored.
pub fn init(verbose: bool, log_file: Option<&Path>) {
    let default_filter = if verbose {
        "scanflow=debug"
    } else {
        "scanflow=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .event_format(LogLineFormat)
        .with_writer(io::stdout);

    let mut file_error = None;
    let file_layer = match log_file.map(|path| (path, open_log_file(path))) {
        Some((_, Ok(file))) => Some(
            tracing_subscriber::fmt::layer()
                .event_format(LogLineFormat)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Some((path, Err(e))) => {
            file_error = Some((path, e));
            None
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if let Some((path, e)) = file_error {
        tracing::warn!("Could not open log file {}: {}", path.display(), e);
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
