mod config;
pub mod database;
mod kv;

pub use config::{CalendarConfig, Config, DisplayConfig, SessionConfig, StorageConfig};
pub use database::Database;
pub use kv::{KvStore, MemoryKv};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `QUACKTIME_HOME` wins when set. Otherwise `~/.config/quacktime[-dev]/`
/// based on `QUACKTIME_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("QUACKTIME_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("QUACKTIME_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("quacktime-dev")
            } else {
                base_dir.join("quacktime")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Directory of the store shared with read-only surfaces (widgets).
pub fn shared_dir() -> std::io::Result<PathBuf> {
    let dir = data_dir()?.join("shared");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
