use eqv_engine::CheckOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "eqv_config.toml";

/// On-disk configuration, one `[engine]` table of [`CheckOptions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub engine: CheckOptions,
}

impl CheckConfig {
    pub fn resolve_path(path: Option<&Path>) -> PathBuf {
        path.map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Reads the file if it exists; unreadable or invalid files fall back to defaults.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => warn!(path = %path.display(), error = %e, "error parsing config file, using defaults"),
                },
                Err(e) => warn!(path = %path.display(), error = %e, "error reading config file, using defaults"),
            }
        }
        Self::default()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Overwrites the file with defaults.
    pub fn restore(path: &Path) -> anyhow::Result<Self> {
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CheckConfig::load(&dir.path().join("absent.toml"));
        assert_eq!(config, CheckConfig::default());
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eqv_config.toml");
        fs::write(&path, "[engine]\nnumeric_tolerance = 0.001\n").unwrap();
        let config = CheckConfig::load(&path);
        assert_eq!(config.engine.numeric_tolerance, 0.001);
        assert_eq!(config.engine.max_terms, 200);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eqv_config.toml");
        fs::write(&path, "engine = 3").unwrap();
        assert_eq!(CheckConfig::load(&path), CheckConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eqv_config.toml");
        let mut config = CheckConfig::default();
        config.engine.max_pow_exp = 8;
        config.save(&path).unwrap();
        assert_eq!(CheckConfig::load(&path), config);

        let restored = CheckConfig::restore(&path).unwrap();
        assert_eq!(restored, CheckConfig::default());
        assert_eq!(CheckConfig::load(&path), CheckConfig::default());
    }
}
