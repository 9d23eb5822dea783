use anyhow::{Context, Result};
use chrono::Local;
use std::{
    fmt,
    fs::{self, File, OpenOptions},
    path::Path,
    sync::Mutex,
};
use tracing::{level_filters::LevelFilter, Dispatch, Event, Subscriber};
use tracing_subscriber::{
    fmt::{
        format::{FormatEvent, FormatFields, Writer},
        FmtContext,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// `<timestamp> - <LEVEL> - <message>`, one line per event, spans omitted.
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
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
        write!(
            writer,
            "{} - {} - ",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Log handle shared by every worker for the duration of a run.
///
/// Events go to an append-mode file in [`LineFormat`] and, optionally, to
/// stderr filtered by `RUST_LOG`. The file is closed when the last clone drops.
#[derive(Clone)]
pub struct LogHandle {
    dispatch: Dispatch,
}

impl LogHandle {
    /// File sink at INFO plus a stderr console layer.
    pub fn open(log_file: &Path) -> Result<Self> {
        Self::build(log_file, true)
    }

    /// File sink only.
    pub fn file_only(log_file: &Path) -> Result<Self> {
        Self::build(log_file, false)
    }

    fn build(log_file: &Path, console: bool) -> Result<Self> {
        if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("opening log file {}", log_file.display()))?;

        // a single write per formatted line under the mutex keeps lines whole
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .event_format(LineFormat)
            .with_writer(Mutex::new(file))
            .with_filter(LevelFilter::INFO);

        let console_layer = console.then(|| {
            let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env)
        });

        let subscriber = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        Ok(Self {
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// Run `f` with this handle as the current thread's subscriber.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use std::thread;
    use tempfile::tempdir;
    use tracing::{error, info};

    #[test]
    fn writes_timestamp_level_message_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("logs").join("run.log");
        let log = LogHandle::file_only(&path)?;

        log.scope(|| {
            info!("Successfully loaded data/raw/AAPL.csv");
            error!("Error processing data/raw/MSFT.csv: missing");
            tracing::debug!("not written");
        });

        let text = fs::read_to_string(&path)?;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let re = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3} - (INFO|ERROR) - .+$")?;
        assert!(lines.iter().all(|l| re.is_match(l)), "{:?}", lines);
        assert!(lines[0].ends_with(" - INFO - Successfully loaded data/raw/AAPL.csv"));
        assert!(lines[1].contains(" - ERROR - Error processing data/raw/MSFT.csv"));
        Ok(())
    }

    #[test]
    fn appends_across_handles() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("run.log");

        LogHandle::file_only(&path)?.scope(|| info!("first"));
        LogHandle::file_only(&path)?.scope(|| info!("second"));

        let text = fs::read_to_string(&path)?;
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().next().unwrap_or_default().ends_with("first"));
        Ok(())
    }

    #[test]
    fn concurrent_writers_keep_lines_whole() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("run.log");
        let log = LogHandle::file_only(&path)?;

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                thread::spawn(move || {
                    log.scope(|| {
                        for i in 0..50 {
                            info!("worker {} line {}", t, i);
                        }
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let text = fs::read_to_string(&path)?;
        let re = Regex::new(r"^\S+ \S+ - INFO - worker \d+ line \d+$")?;
        assert_eq!(text.lines().count(), 400);
        assert!(text.lines().all(|l| re.is_match(l)));
        Ok(())
    }
}
