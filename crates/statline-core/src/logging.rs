//! Logging setup with per-stage targets and indicatif integration
//!
//! Components log with `log::info!(target: "extract", ...)` and friends.
//! The target is printed as the stage label, so no logger object has to be
//! threaded through the pipeline.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use indicatif::MultiProgress;

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Stage label for a log target: explicit stage targets pass through,
/// module paths are shortened to their last segment.
fn stage_label(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

/// Logger that prints `[LEVEL] [stage] message` to stderr (through
/// indicatif when progress bars are active) and optionally to a file.
pub struct StageLogger {
    inner: env_logger::Logger,
    multi: Option<MultiProgress>,
    file: Option<Mutex<File>>,
    color: bool,
}

impl StageLogger {
    pub fn new(inner: env_logger::Logger, multi: Option<MultiProgress>, file: Option<File>) -> Self {
        let color = multi.is_some();
        Self {
            inner,
            multi,
            file: file.map(Mutex::new),
            color,
        }
    }
}

impl log::Log for StageLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        let stage = stage_label(record.target());
        let (pre, label, post) = level_style(record.level(), self.color);
        let line = format!("[{pre}{label}{post}] [{stage}] {}", record.args());
        match &self.multi {
            Some(multi) => multi.suspend(|| eprintln!("{line}")),
            None => eprintln!("{line}"),
        }

        if let Some(file) = &self.file {
            let (_, label, _) = level_style(record.level(), false);
            let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{ts} [{label}] [{stage}] {}", record.args());
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

/// Initialize logging.
///
/// `quiet` lowers the default level to warn (progress bars carry the
/// activity), `debug` raises it. `RUST_LOG` overrides both. With a
/// `log_file`, lines are appended there as well.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
    log_file: Option<&Path>,
) -> io::Result<()> {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Some(OpenOptions::new().create(true).append(true).open(path)?)
        }
        None => None,
    };

    let inner =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .build();
    let max_level = inner.filter();

    log::set_boxed_logger(Box::new(StageLogger::new(inner, multi.cloned(), file)))
        .map_err(io::Error::other)?;
    log::set_max_level(max_level);
    Ok(())
}
