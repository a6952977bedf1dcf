//! File logging. The terminal belongs to the game, so logs never go to stdout/stderr.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// `<cache dir>/duofall/duofall.log`, or `None` when the platform has no cache dir.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("duofall").join("duofall.log"))
}

#[cfg(unix)]
const NULL_DEVICE: &str = "/dev/null";
#[cfg(windows)]
const NULL_DEVICE: &str = "NUL";

fn create_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
    }
    File::create(path).with_context(|| format!("creating log file {}", path.display()))
}

/// An explicit path must be writable. The default cache path falls back to the null device.
fn open_log_file(explicit: Option<&Path>) -> Result<File> {
    if let Some(path) = explicit {
        return create_log_file(path);
    }
    if let Some(file) = default_log_path().and_then(|p| create_log_file(&p).ok()) {
        return Ok(file);
    }
    File::create(NULL_DEVICE).with_context(|| format!("opening {NULL_DEVICE}"))
}

/// Install the global subscriber, writing to `explicit` or the default log path.
/// Level comes from `RUST_LOG`, defaulting to `info`.
pub fn init(explicit: Option<&Path>) -> Result<()> {
    let file = open_log_file(explicit)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("duofall-log-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn explicit_path_creates_missing_directories() {
        let dir = scratch_dir("nested");
        let path = dir.join("a").join("b").join("game.log");
        assert!(open_log_file(Some(&path)).is_ok());
        assert!(path.exists());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn unwritable_explicit_path_is_an_error() {
        let dir = scratch_dir("blocked");
        let blocker = dir.join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let err = open_log_file(Some(&blocker.join("game.log"))).unwrap_err();
        assert!(err.to_string().contains("creating log directory"));
        std::fs::remove_dir_all(dir).ok();
    }
}
