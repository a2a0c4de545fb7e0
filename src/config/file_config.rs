use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub json_dir: Option<String>,
    pub error_sample_size: Option<usize>,
    pub reconcile_sample_size: Option<usize>,

    pub transform: Option<TransformConfig>,
}

/// `[transform]` table.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TransformConfig {
    pub batch_size: Option<usize>,
    pub max_batches_per_kind: Option<usize>,
    pub workers: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_transform_table() {
        let config: FileConfig = toml::from_str(
            r#"
            db_dir = "/var/lib/curator"
            reconcile_sample_size = 20

            [transform]
            batch_size = 500
            workers = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.db_dir.as_deref(), Some("/var/lib/curator"));
        assert_eq!(config.reconcile_sample_size, Some(20));
        let transform = config.transform.unwrap();
        assert_eq!(transform.batch_size, Some(500));
        assert_eq!(transform.max_batches_per_kind, None);
        assert_eq!(transform.workers, Some(1));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.transform.is_none());
    }
}
