use std::env;
use std::path::PathBuf;

/// Name of the per-user data directory under the home directory.
const DATA_DIR_NAME: &str = ".docchat";

/// Return the user's home directory path.
///
/// Uses HOME on Unix-like systems and USERPROFILE on Windows.
pub fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Default location for history, config and logs: `~/.docchat`.
pub fn default_data_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(DATA_DIR_NAME))
}
