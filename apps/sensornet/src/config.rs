//! # Configuration
//!
//! Layered settings, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `sensornet.toml` when present)
//! 3. Command line flags
//!
//! ```toml
//! data_dir = "data"
//! delimiter = ","
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```
//!
//! Server security settings are not part of the file; they come from the
//! `SENSORNET_*` environment variables read by the API module.

use sensornet_core::SensorNetError;
use sensornet_core::primitives::{DEFAULT_DATA_DIR, DEFAULT_DELIMITER};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "sensornet.toml";

/// Maximum size of a config file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the four table files.
    pub data_dir: PathBuf,
    /// Field delimiter of the table files, a single ASCII character.
    pub delimiter: String,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            delimiter: char::from(DEFAULT_DELIMITER).to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Parse TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, SensorNetError> {
        toml::from_str(text)
            .map_err(|e| SensorNetError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SensorNetError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            SensorNetError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SensorNetError::SerializationError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            SensorNetError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Resolve the file layer.
    ///
    /// An explicit path must exist. Without one, `sensornet.toml` in the
    /// working directory is used if present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SensorNetError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply the flag layer. `None` keeps the current value.
    #[must_use]
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        delimiter: Option<String>,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(delimiter) = delimiter {
            self.delimiter = delimiter;
        }
        self
    }

    /// The delimiter as a byte.
    ///
    /// Accepts one printable ASCII character or `\t`. Quotes and line
    /// breaks are rejected since the file format reserves them.
    pub fn delimiter_byte(&self) -> Result<u8, SensorNetError> {
        let raw = if self.delimiter == "\\t" {
            "\t"
        } else {
            self.delimiter.as_str()
        };
        match raw.as_bytes() {
            [b] if *b == b'\t' || (b.is_ascii_graphic() && *b != b'"') => Ok(*b),
            _ => Err(SensorNetError::SerializationError(format!(
                "Invalid delimiter {:?}: expected a single ASCII character",
                self.delimiter
            ))),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.delimiter_byte().expect("delimiter"), b',');
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml_str("delimiter = \";\"\n[server]\nport = 9000\n")
            .expect("parse");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.delimiter_byte().expect("delimiter"), b';');
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn flags_override_file() {
        let config = Config::from_toml_str("data_dir = \"/srv/net\"")
            .expect("parse")
            .with_overrides(Some(PathBuf::from("local")), None);
        assert_eq!(config.data_dir, PathBuf::from("local"));
        assert_eq!(config.delimiter, ",");
    }

    #[test]
    fn tab_escape_is_accepted() {
        let config = Config::default().with_overrides(None, Some("\\t".to_string()));
        assert_eq!(config.delimiter_byte().expect("delimiter"), b'\t');
    }

    #[test]
    fn bad_delimiters_are_rejected() {
        for bad in ["", ";;", "\"", "\n", "é"] {
            let config = Config::default().with_overrides(None, Some(bad.to_string()));
            assert!(config.delimiter_byte().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml_str("data_dir = ["),
            Err(SensorNetError::SerializationError(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let result = Config::load(Some(&tmp.path().join("absent.toml")));
        assert!(matches!(result, Err(SensorNetError::IoError(_))));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("net.toml");
        std::fs::write(&path, "data_dir = \"stations\"\n").expect("write");

        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.data_dir, PathBuf::from("stations"));
    }
}
