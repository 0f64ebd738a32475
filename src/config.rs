//! Configuration for the graph build and analysis commands.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::aggregate::{Aggregator, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K};
use crate::error::Result;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input transaction tables
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub train_csv: PathBuf,
    pub eval_csv: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory for graphs, the card mapping and the feature schema
    pub dir: PathBuf,
    /// Where `analyze` writes its JSON report; next to the graphs when unset
    #[serde(default)]
    pub report_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Edges per parallel scatter-add chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Number of highest card degrees to report
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl AnalysisConfig {
    pub fn aggregator(&self) -> Aggregator {
        Aggregator::new(self.chunk_size, self.top_k)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `path`, then applies `CARD_GRAPH__SECTION__KEY` environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CARD_GRAPH").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn report_dir(&self) -> &Path {
        self.store.report_dir.as_deref().unwrap_or(&self.store.dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                train_csv: PathBuf::from("data/raw/train_transaction.csv"),
                eval_csv: PathBuf::from("data/raw/test_transaction.csv"),
            },
            store: StoreConfig {
                dir: PathBuf::from("data/processed"),
                report_dir: None,
            },
            analysis: AnalysisConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.store.dir, PathBuf::from("data/processed"));
        assert_eq!(config.report_dir(), Path::new("data/processed"));
        assert_eq!(config.analysis.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.analysis.top_k, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_fills_optional_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[data]\ntrain_csv = \"a.csv\"\neval_csv = \"b.csv\"\n\n[store]\ndir = \"out\"\n\n[analysis]\ntop_k = 10\n"
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.data.train_csv, PathBuf::from("a.csv"));
        assert_eq!(config.store.dir, PathBuf::from("out"));
        assert_eq!(config.analysis.top_k, 10);
        assert_eq!(config.analysis.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load_from_path("does/not/exist.toml").is_err());
    }
}
