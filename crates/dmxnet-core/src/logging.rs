//! Logging configuration
//!
//! The library only logs through `tracing`; installing a subscriber is up to
//! the binary. This type carries the settings it needs.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const LOG_FILE_PREFIX: &str = "dmxnet-";
const LOG_FILE_SUFFIX: &str = ".log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub console_output: bool,
    pub file_output: bool,
    pub log_dir: PathBuf,
    /// Log files kept by `cleanup_old_logs`
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
            max_files: 10,
        }
    }
}

impl LogConfig {
    /// Configured level, INFO when unparseable
    pub fn parse_level(&self) -> tracing::Level {
        self.level.parse().unwrap_or(tracing::Level::INFO)
    }

    pub fn ensure_log_directory(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.log_dir)
    }

    /// Today's log file
    pub fn current_log_path(&self) -> PathBuf {
        let date = chrono::Local::now().format("%Y-%m-%d");
        self.log_dir
            .join(format!("{}{}{}", LOG_FILE_PREFIX, date, LOG_FILE_SUFFIX))
    }

    /// Delete the oldest log files beyond `max_files`
    ///
    /// Returns how many files were removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_dir.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = std::fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(LOG_FILE_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();

        if logs.len() <= self.max_files {
            return Ok(0);
        }

        // Date-stamped names sort chronologically
        logs.sort();
        let excess = logs.len() - self.max_files;
        for path in &logs[..excess] {
            std::fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), tracing::Level::INFO);

        config.level = "debug".to_string();
        assert_eq!(config.parse_level(), tracing::Level::DEBUG);

        config.level = "loud".to_string();
        assert_eq!(config.parse_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            log_dir: dir.path().to_path_buf(),
            max_files: 2,
            ..Default::default()
        };

        for day in 1..=4 {
            let name = format!("dmxnet-2026-01-0{}.log", day);
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::write(dir.path().join("other.txt"), b"").unwrap();

        assert_eq!(config.cleanup_old_logs().unwrap(), 2);
        assert!(!dir.path().join("dmxnet-2026-01-01.log").exists());
        assert!(!dir.path().join("dmxnet-2026-01-02.log").exists());
        assert!(dir.path().join("dmxnet-2026-01-04.log").exists());
        assert!(dir.path().join("other.txt").exists());
    }

    #[test]
    fn test_current_log_path_in_dir() {
        let config = LogConfig::default();
        let path = config.current_log_path();
        assert!(path.starts_with("logs"));
        assert!(path.to_string_lossy().ends_with(".log"));
    }
}
