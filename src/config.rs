// ⚙️ Configuration - TOML file + defaults
// CLI flags and env vars are layered on top in main.rs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ImportError;
use crate::grading::GradeWeights;
use crate::ids::DEFAULT_IMAGE_PREFIX;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the scraper's CSV extracts
    pub import_dir: PathBuf,
    pub database_path: PathBuf,
    /// Web path that `output/images/...` paths are rewritten to
    pub image_url_prefix: String,
    /// Insert breeder/dog/litter rows that have no external id instead of
    /// skipping them. Such rows can never be matched again, so every
    /// re-import adds another copy.
    pub keep_unkeyed_rows: bool,
    /// Window for the "recent litters" views, in birth years
    pub recent_litter_years: i32,
    pub grade_weights: GradeWeights,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            import_dir: PathBuf::from("storage/app/import"),
            database_path: PathBuf::from("berner.db"),
            image_url_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
            keep_unkeyed_rows: false,
            recent_litter_years: 3,
            grade_weights: GradeWeights::default(),
        }
    }
}

impl Config {
    /// Read a TOML config file, or return defaults when `path` is `None`.
    /// The result is validated either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw).context("parsing config file")?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ImportError> {
        self.grade_weights.validate()?;
        if self.recent_litter_years < 0 {
            return Err(ImportError::InvalidConfig(format!(
                "recent_litter_years must not be negative (got {})",
                self.recent_litter_years
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.image_url_prefix, "/dog-images/");
        assert!(!config.keep_unkeyed_rows);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("berner.toml");
        fs::write(
            &path,
            "import_dir = \"/data/import\"\nkeep_unkeyed_rows = true\n\n[grade_weights]\nhealth = 0.6\nlongevity = 0.2\npedigree = 0.2\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.import_dir, PathBuf::from("/data/import"));
        assert!(config.keep_unkeyed_rows);
        assert_eq!(config.grade_weights.health, 0.6);
        assert_eq!(config.database_path, PathBuf::from("berner.db"));
    }

    #[test]
    fn test_rejects_bad_weights() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("berner.toml");
        fs::write(&path, "[grade_weights]\nhealth = 0.5\nlongevity = 0.5\npedigree = 0.5\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }
}
