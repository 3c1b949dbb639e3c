//! CLI configuration file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use reimburse_engine::EngineConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Engine settings; when absent the `--variant` preset is used
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Path to the labelled training cases
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("public_cases.json")
}

impl Config {
    /// Load from a TOML file, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Engine configuration from the file, or the named preset.
    pub fn engine_config(&self, variant: &str) -> anyhow::Result<EngineConfig> {
        if let Some(engine) = &self.engine {
            return Ok(engine.clone());
        }
        EngineConfig::preset(variant)
            .ok_or_else(|| anyhow::anyhow!("unknown variant '{variant}' (expected 'conservative' or 'fast')"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_or_default(Path::new("/nonexistent/reimburse.toml")).unwrap();
        assert_eq!(config.corpus.path, PathBuf::from("public_cases.json"));
        assert!(config.engine.is_none());
    }

    #[test]
    fn test_variant_fallback() {
        let config = Config::default();
        assert_eq!(config.engine_config("fast").unwrap(), EngineConfig::fast());
        assert!(config.engine_config("turbo").is_err());
    }

    #[test]
    fn test_engine_section_wins_over_variant() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[corpus]\npath = \"data/cases.json\"\n\n[engine]\nround_decimals = 0\n"
        )
        .unwrap();

        let config = Config::load_or_default(file.path()).unwrap();
        assert_eq!(config.corpus.path, PathBuf::from("data/cases.json"));
        let engine = config.engine_config("fast").unwrap();
        assert_eq!(engine.round_decimals, 0);
        assert!(engine.adaptive_k.enabled);
    }
}
