use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
    #[error("No config path available (neither XDG_CONFIG_HOME nor HOME is set)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: Monitor,
    pub storage: Storage,
    pub scheduler: Scheduler,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitor {
    /// Deadline for a single probe
    pub timeout_seconds: u64,
    /// Record an `ERROR` result (code 0) when the probe fails at the
    /// transport level instead of only returning the error
    pub record_transport_failures: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Libsql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub backend: Backend,
    /// Database file, only used by the libsql backend
    pub path: path::PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    /// Check every active target once and exit instead of looping, for
    /// deployments driven by an external cron
    pub one_shot: bool,
}

impl Default for Monitor {
    fn default() -> Self {
        Self { timeout_seconds: 10, record_transport_failures: false }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self { backend: Backend::Memory, path: path::PathBuf::from("uppe-monitor.db") }
    }
}

impl Monitor {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::Libsql => write!(f, "libsql"),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uppe/monitor.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("uppe/monitor.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Monitor Configuration:")?;
        write_title_1(f, "Monitor")?;
        write_1(f, "Probe Timeout (s)", &self.monitor.timeout_seconds)?;
        write_1(f, "Record Transport Failures", &self.monitor.record_transport_failures)?;
        write_title_1(f, "Storage")?;
        write_1(f, "Backend", &self.storage.backend)?;
        write_1(f, "Path", &self.storage.path.display())?;
        write_title_1(f, "Scheduler")?;
        write_1(f, "One Shot", &self.scheduler.one_shot)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uppe/monitor.toml
    ///  or the specified path if one does not exist
    ///
    /// ```no_run
    /// # use uppe_monitor::config::Config;
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), uppe_monitor::config::Error>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            let config: Self = toml::from_str(raw_string.as_str())?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.monitor.timeout_seconds == 0 {
            return Err(Error::InvalidValue(
                "monitor.timeout_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(Error::WriteFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/monitor.toml");

        let config = Config::from_config(Some(&path)).unwrap();

        assert!(path.exists());
        assert_eq!(config.monitor.timeout_seconds, 10);
        assert!(!config.monitor.record_transport_failures);
        assert_eq!(config.storage.backend, Backend::Memory);
    }

    #[test]
    fn test_extension_is_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("monitor.conf");

        Config::from_config(Some(&path)).unwrap();

        assert!(dir.path().join("monitor.toml").exists());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(&path, "[storage]\nbackend = \"libsql\"\n").unwrap();

        let config = Config::from_config(Some(&path)).unwrap();

        assert_eq!(config.storage.backend, Backend::Libsql);
        assert_eq!(config.storage.path, path::PathBuf::from("uppe-monitor.db"));
        assert_eq!(config.monitor.timeout(), Duration::from_secs(10));
        assert!(!config.scheduler.one_shot);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(&path, "[monitor]\ntimeout_seconds = 0\n").unwrap();

        let err = Config::from_config(Some(&path)).unwrap_err();

        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn test_invalid_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(&path, "[monitor\ntimeout_seconds = ").unwrap();

        let err = Config::from_config(Some(&path)).unwrap_err();

        assert!(matches!(err, Error::ParseFailed(_)));
    }
}
