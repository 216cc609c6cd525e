//! Configuration loading and root folder resolution

use crate::student_id::DEFAULT_SALT;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default listen port when nothing else is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Environment variable naming the data root folder.
pub const ROOT_FOLDER_ENV: &str = "EXAMREG_ROOT_FOLDER";

/// Environment variable naming the listen port.
pub const PORT_ENV: &str = "EXAMREG_PORT";

/// TOML config file contents (`~/.config/examreg/config.toml`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Data root folder holding the database file
    pub root_folder: Option<String>,
    /// HTTP listen port
    pub port: Option<u16>,
    /// Hashids salt shared with the frontend encoders
    pub id_salt: Option<String>,
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root_folder) = load_toml_config().and_then(|c| c.root_folder) {
        return PathBuf::from(root_folder);
    }

    default_root_folder()
}

/// Listen port resolution: CLI argument, environment, TOML, default.
pub fn resolve_port(cli_arg: Option<u16>) -> u16 {
    if let Some(port) = cli_arg {
        return port;
    }

    if let Ok(value) = std::env::var(PORT_ENV) {
        if let Ok(port) = value.parse::<u16>() {
            return port;
        }
    }

    if let Some(port) = load_toml_config().and_then(|c| c.port) {
        return port;
    }

    DEFAULT_PORT
}

/// Hashids salt resolution: TOML, compiled default.
///
/// The salt must match the frontend encoders, so it is deliberately not
/// overridable per-invocation.
pub fn resolve_id_salt() -> String {
    load_toml_config()
        .and_then(|c| c.id_salt)
        .unwrap_or_else(|| DEFAULT_SALT.to_string())
}

/// Database file path inside the root folder.
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("examreg.db")
}

/// Parse the platform config file if present.
pub fn load_toml_config() -> Option<TomlConfig> {
    let path = config_file_path()?;
    let content = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring malformed config file {}: {}", path.display(), e);
            None
        }
    }
}

/// Platform config file location (`<config dir>/examreg/config.toml`).
fn config_file_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("examreg").join("config.toml");
    path.exists().then_some(path)
}

/// OS-dependent default root folder path.
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("examreg"))
        .unwrap_or_else(|| PathBuf::from("./examreg_data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn cli_argument_wins() {
        std::env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
        let resolved = resolve_root_folder(Some("/tmp/from-cli"));
        std::env::remove_var(ROOT_FOLDER_ENV);
        assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));
    }

    #[test]
    #[serial]
    fn environment_beats_default() {
        std::env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
        let resolved = resolve_root_folder(None);
        std::env::remove_var(ROOT_FOLDER_ENV);
        assert_eq!(resolved, PathBuf::from("/tmp/from-env"));
    }

    #[test]
    #[serial]
    fn port_falls_back_to_default() {
        std::env::remove_var(PORT_ENV);
        assert_eq!(resolve_port(None), DEFAULT_PORT);
        assert_eq!(resolve_port(Some(8080)), 8080);
    }

    #[test]
    #[serial]
    fn malformed_port_env_is_ignored() {
        std::env::set_var(PORT_ENV, "not-a-port");
        let resolved = resolve_port(None);
        std::env::remove_var(PORT_ENV);
        assert_eq!(resolved, DEFAULT_PORT);
    }

    #[test]
    fn database_path_is_inside_root() {
        assert_eq!(
            database_path(Path::new("/data/examreg")),
            PathBuf::from("/data/examreg/examreg.db")
        );
    }
}
