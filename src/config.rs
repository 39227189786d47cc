use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Controller configuration, threaded explicitly into every branch.
///
/// The PID file and statistics file are owned by the service; workerctl only
/// needs to know where the service configuration put them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pid_file: PathBuf,
    pub statistics_file: PathBuf,
    /// Always launch detached, even without `-d` on the command line
    pub daemonize: bool,
    pub stop_timeout_secs: u64,
    pub stop_poll_interval_ms: u64,
    pub status_interval_secs: u64,
    pub connections_wait_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let runtime_dir = dirs::home_dir()
            .unwrap_or_else(|| {
                eprintln!("Warning: HOME directory not found, using current directory");
                PathBuf::from(".")
            })
            .join(".workerctl");

        Self {
            pid_file: runtime_dir.join("master.pid"),
            statistics_file: runtime_dir.join("master.status"),
            daemonize: false,
            stop_timeout_secs: 5,
            stop_poll_interval_ms: 10,
            status_interval_secs: 1,
            connections_wait_ms: 500,
        }
    }
}

impl Config {
    /// Load configuration from ~/.config/workerctl/config.toml
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from file without environment overrides
    fn load_from_file() -> Result<Self> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("WORKERCTL_PID_FILE") {
            if !val.trim().is_empty() {
                self.pid_file = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("WORKERCTL_STATISTICS_FILE") {
            if !val.trim().is_empty() {
                self.statistics_file = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("WORKERCTL_DAEMONIZE") {
            if let Ok(v) = val.parse::<bool>() {
                self.daemonize = v;
            }
        }

        // Numeric settings with boundary validation
        if let Ok(val) = std::env::var("WORKERCTL_STOP_TIMEOUT") {
            if let Ok(v) = val.parse::<u64>() {
                if (1..=60).contains(&v) {
                    self.stop_timeout_secs = v;
                } else {
                    eprintln!(
                        "Warning: WORKERCTL_STOP_TIMEOUT out of range (1-60): {}, using default",
                        v
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("WORKERCTL_STOP_POLL_INTERVAL_MS") {
            if let Ok(v) = val.parse::<u64>() {
                if (1..=1000).contains(&v) {
                    self.stop_poll_interval_ms = v;
                } else {
                    eprintln!(
                        "Warning: WORKERCTL_STOP_POLL_INTERVAL_MS out of range (1-1000): {}, using default",
                        v
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("WORKERCTL_STATUS_INTERVAL") {
            if let Ok(v) = val.parse::<u64>() {
                if (1..=3600).contains(&v) {
                    self.status_interval_secs = v;
                } else {
                    eprintln!(
                        "Warning: WORKERCTL_STATUS_INTERVAL out of range (1-3600): {}, using default",
                        v
                    );
                }
            }
        }

        if let Ok(val) = std::env::var("WORKERCTL_CONNECTIONS_WAIT_MS") {
            if let Ok(v) = val.parse::<u64>() {
                if v <= 10_000 {
                    self.connections_wait_ms = v;
                } else {
                    eprintln!(
                        "Warning: WORKERCTL_CONNECTIONS_WAIT_MS out of range (0-10000): {}, using default",
                        v
                    );
                }
            }
        }
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn connections_wait(&self) -> Duration {
        Duration::from_millis(self.connections_wait_ms)
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Config directory not found"))?
        .join("workerctl")
        .join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings_match_protocol() {
        let config = Config::default();
        assert_eq!(config.stop_timeout_secs, 5);
        assert_eq!(config.stop_poll_interval_ms, 10);
        assert_eq!(config.status_interval_secs, 1);
        assert_eq!(config.connections_wait_ms, 500);
        assert!(!config.daemonize);
    }

    #[test]
    fn test_default_paths_under_runtime_dir() {
        let config = Config::default();
        assert!(config.pid_file.ends_with(".workerctl/master.pid"));
        assert!(config.statistics_file.ends_with(".workerctl/master.status"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("stop_timeout_secs = 9\n").unwrap();
        assert_eq!(config.stop_timeout_secs, 9);
        assert_eq!(config.stop_poll_interval_ms, 10);
        assert_eq!(config.connections_wait_ms, 500);
    }

    #[test]
    fn test_toml_paths() {
        let config: Config = toml::from_str(
            "pid_file = \"/tmp/svc/master.pid\"\nstatistics_file = \"/tmp/svc/master.status\"\n",
        )
        .unwrap();
        assert_eq!(config.pid_file, PathBuf::from("/tmp/svc/master.pid"));
        assert_eq!(
            config.statistics_file,
            PathBuf::from("/tmp/svc/master.status")
        );
    }

    #[test]
    fn test_env_override_pid_file() {
        std::env::set_var("WORKERCTL_PID_FILE", "/tmp/override/master.pid");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var("WORKERCTL_PID_FILE");
        assert_eq!(config.pid_file, PathBuf::from("/tmp/override/master.pid"));
    }

    #[test]
    fn test_env_override_rejects_out_of_range_timeout() {
        std::env::set_var("WORKERCTL_STOP_TIMEOUT", "900");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var("WORKERCTL_STOP_TIMEOUT");
        assert_eq!(config.stop_timeout_secs, 5);
    }

    #[test]
    fn test_env_override_daemonize() {
        std::env::set_var("WORKERCTL_DAEMONIZE", "true");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var("WORKERCTL_DAEMONIZE");
        assert!(config.daemonize);
    }
}
