//! Locating the contacts directory file.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable the native library also reads on first use.
pub const DIRECTORY_ENV: &str = "IMSG_CONTACTS_DIRECTORY";

/// Base data directory for the CLI.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imsg-contacts")
}

/// Directory file to load: the explicit flag, then the environment, then the
/// default file if it exists. `None` leaves the library's own choice in place.
pub fn directory_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Some(p) = env::var_os(DIRECTORY_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(p));
    }
    let default = data_dir().join("directory.json");
    default.is_file().then_some(default)
}
