//! Configuration file resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory name under the platform config directory
pub const APP_DIR_NAME: &str = "tilawah";

/// Config file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file resolution following priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `<config_dir>/tilawah/config.toml` if it exists
///
/// Returns `None` when no file applies; callers fall back to built-in defaults.
/// An explicitly requested file (CLI or environment) is returned even if it
/// does not exist so that loading reports the missing file.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        debug!("Config file from command line: {}", path.display());
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            debug!("Config file from {}: {}", env_var_name, path);
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    let path = default_config_path().filter(|path| path.exists());
    match &path {
        Some(path) => debug!("Config file from platform default: {}", path.display()),
        None => debug!("No config file found, using built-in defaults"),
    }
    path
}

/// Platform default config file path
///
/// - Linux: `~/.config/tilawah/config.toml`
/// - macOS: `~/Library/Application Support/tilawah/config.toml`
/// - Windows: `%APPDATA%\tilawah\config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Read a config file into a string, mapping failures to `Error::Config`
pub fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_argument_wins() {
        let cli = PathBuf::from("/tmp/does-not-matter.toml");
        let resolved = resolve_config_path(Some(&cli), "TILAWAH_TEST_CONFIG_UNSET_1");
        assert_eq!(resolved, Some(cli));
    }

    #[test]
    fn test_env_var_used_without_cli() {
        let var = "TILAWAH_TEST_CONFIG_ENV_2";
        std::env::set_var(var, "/etc/tilawah/custom.toml");
        let resolved = resolve_config_path(None, var);
        std::env::remove_var(var);
        assert_eq!(resolved, Some(PathBuf::from("/etc/tilawah/custom.toml")));
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("tilawah/config.toml"));
        }
    }

    #[test]
    fn test_read_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "event_capacity = 64").unwrap();

        let content = read_config_file(file.path()).unwrap();
        assert!(content.contains("event_capacity"));
    }

    #[test]
    fn test_read_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(read_config_file(&missing), Err(Error::Config(_))));
    }
}
