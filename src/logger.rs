//! Session logger - routes `tracing` events to a single file in the OS data directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\RasterPad\rasterpad.log`
//!   Linux:    `~/.local/share/RasterPad/rasterpad.log`
//!   macOS:    `~/Library/Application Support/RasterPad/rasterpad.log`
//!
//! Verbosity follows the `RASTERPAD_LOG` environment variable (an
//! `EnvFilter` directive such as `debug` or `rasterpad=trace`), default `info`.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "RASTERPAD_LOG";

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise the session logger. Call once, before any logging.
///
/// * Creates (or truncates) the log file; falls back to stderr when it
///   cannot be opened.
/// * Installs a panic hook that writes the panic message to the log before
///   propagating to the default handler.
///
/// Never fails: a second call, or a subscriber already set by the host,
/// leaves the existing one in place.
pub fn init() {
    let path = log_file_path();

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path);

    let installed = match file {
        Ok(f) => {
            let _ = LOG_PATH.set(path.clone());
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(Mutex::new(f))
                .try_init()
                .is_ok()
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .try_init()
                .is_ok()
        }
    };

    if !installed {
        return;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %path.display(),
        "=== RasterPad session started ==="
    );

    // Mirror panic info to the log, then run the default handler
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!("PANIC: {}", panic_info);
        prev(panic_info);
    }));
}

fn log_file_path() -> PathBuf {
    data_dir().join("RasterPad").join("rasterpad.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}
