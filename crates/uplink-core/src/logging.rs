//! Logging init: append-only file under the XDG state dir, stderr fallback.
//!
//! `RUST_LOG` always wins; otherwise the filter is `info` for dependencies and
//! `debug` (or `trace` when verbose) for uplink crates.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "uplink.log";

/// Writer that is either the log file or stderr (used when cloning the file handle fails).
enum LogWriter {
    File(fs::File),
    Stderr,
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogWriter::File(f) => f.write(buf),
            LogWriter::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogWriter::File(f) => f.flush(),
            LogWriter::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileMakeWriter(fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogWriter::File)
            .unwrap_or(LogWriter::Stderr)
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "info,uplink=trace,uplink_core=trace"
    } else {
        "info,uplink=debug,uplink_core=debug"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Default log directory: `~/.local/state/uplink`.
pub fn default_log_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("uplink")?;
    Ok(xdg_dirs.get_state_home())
}

/// Initialize structured logging to `~/.local/state/uplink/uplink.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(verbose: bool) -> Result<PathBuf> {
    init_logging_in(&default_log_dir()?, verbose)
}

/// Initialize logging to `<dir>/uplink.log`; returns the log file path.
pub fn init_logging_in(dir: &Path, verbose: bool) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating log dir {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(BoxMakeWriter::new(FileMakeWriter(file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {}", e))?;

    tracing::info!("uplink logging initialized at {}", path.display());
    Ok(path)
}

/// Initialize logging to stderr only. Fallback when init_logging() fails.
pub fn init_logging_stderr(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
