//! Configuration loading
//!
//! Settings resolve in priority order: explicit value (CLI) → environment
//! variable (`ALTHINGI_*`) → TOML config file → compiled default.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// First parliament term covered by the upstream XML feed.
pub const FIRST_PARLIAMENT_NUM: i64 = 20;

/// Latest parliament term known to the feed. Requests beyond this are
/// rejected as out of range.
pub const CURRENT_PARLIAMENT_NUM: i64 = 154;

/// Settings for the feed client and the document archive
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Database file location
    pub database_path: PathBuf,

    /// Latest known parliament term; used as the default scope and as the
    /// upper bound for range validation
    pub current_parliament_num: i64,

    /// Serve feed documents from the on-disk XML cache when present
    pub xml_use_cache: bool,

    /// Directory for cached feed documents
    pub xml_cache_dir: PathBuf,

    /// Download document bodies (HTML/PDF) and record local filenames
    pub download_documents: bool,

    /// Download review bodies (PDF) and record local filenames
    pub download_reviews: bool,

    /// Directory for downloaded document/review bodies
    pub document_dir: PathBuf,

    /// Timeout in seconds for remote fetches
    pub remote_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database_path: data_dir.join("althingi.db"),
            current_parliament_num: CURRENT_PARLIAMENT_NUM,
            xml_use_cache: false,
            xml_cache_dir: data_dir.join("xmlcache"),
            download_documents: false,
            download_reviews: false,
            document_dir: data_dir.join("documents"),
            remote_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load settings from the default config file location, then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Load settings from a specific TOML file, then apply environment
    /// overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut settings: Settings = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("ALTHINGI_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("ALTHINGI_XML_CACHE_DIR") {
            self.xml_cache_dir = PathBuf::from(dir);
        }
        if let Ok(value) = std::env::var("ALTHINGI_XML_USE_CACHE") {
            self.xml_use_cache = value == "1" || value.eq_ignore_ascii_case("true");
        }
    }
}

/// Default config file path for the platform (`~/.config/althingi/config.toml`)
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("althingi").join("config.toml"))
}

/// Default data directory (`~/.local/share/althingi` or platform equivalent)
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("althingi"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/althingi"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.current_parliament_num, CURRENT_PARLIAMENT_NUM);
        assert!(!settings.xml_use_cache);
        assert!(!settings.download_documents);
        assert_eq!(settings.remote_timeout_secs, 10);
    }

    #[test]
    fn test_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "current_parliament_num = 148\nxml_use_cache = true\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.current_parliament_num, 148);
        assert!(settings.xml_use_cache);
        // Unspecified keys keep their defaults.
        assert!(!settings.download_reviews);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "current_parliament_num = \"not a number\"").unwrap();

        match Settings::from_file(&path) {
            Err(Error::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }
}
