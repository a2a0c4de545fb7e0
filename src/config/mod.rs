mod file_config;

pub use file_config::{FileConfig, TransformConfig};

use crate::transform::TransformSettings;
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_BATCH_SIZE: usize = 250;
pub const DEFAULT_MAX_BATCHES_PER_KIND: usize = 4;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_ERROR_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_RECONCILE_SAMPLE_SIZE: usize = 50;

/// Command line values fed into [`AppConfig::resolve`].
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub json_dir: Option<PathBuf>,
    pub batch_size: usize,
    pub max_batches_per_kind: usize,
    pub workers: usize,
    pub error_sample_size: usize,
    pub reconcile_sample_size: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            json_dir: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_batches_per_kind: DEFAULT_MAX_BATCHES_PER_KIND,
            workers: DEFAULT_WORKERS,
            error_sample_size: DEFAULT_ERROR_SAMPLE_SIZE,
            reconcile_sample_size: DEFAULT_RECONCILE_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    /// Directory of exported `{"data": [...]}` snapshots, used by reconcile.
    pub json_dir: Option<PathBuf>,
    pub batch_size: usize,
    pub max_batches_per_kind: usize,
    pub workers: usize,
    pub error_sample_size: usize,
    pub reconcile_sample_size: usize,
}

impl AppConfig {
    /// Merges the command line with an optional TOML file; values from the
    /// file win.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let json_dir = file
            .json_dir
            .map(PathBuf::from)
            .or_else(|| cli.json_dir.clone());

        let transform = file.transform.unwrap_or_default();
        let batch_size = transform.batch_size.unwrap_or(cli.batch_size);
        let max_batches_per_kind = transform
            .max_batches_per_kind
            .unwrap_or(cli.max_batches_per_kind);
        let workers = transform.workers.unwrap_or(cli.workers);

        if batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if max_batches_per_kind == 0 {
            bail!("max_batches_per_kind must be at least 1");
        }
        if workers == 0 {
            bail!("workers must be at least 1");
        }

        Ok(Self {
            db_dir,
            json_dir,
            batch_size,
            max_batches_per_kind,
            workers,
            error_sample_size: file.error_sample_size.unwrap_or(cli.error_sample_size),
            reconcile_sample_size: file
                .reconcile_sample_size
                .unwrap_or(cli.reconcile_sample_size),
        })
    }

    pub fn raw_db_path(&self) -> PathBuf {
        self.db_dir.join("raw.db")
    }

    pub fn curated_db_path(&self) -> PathBuf {
        self.db_dir.join("curated.db")
    }

    pub fn transform_settings(&self) -> TransformSettings {
        TransformSettings {
            batch_size: self.batch_size,
            max_batches_per_kind: self.max_batches_per_kind,
            workers: self.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_dir(temp_dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            json_dir: Some(PathBuf::from("/exports")),
            batch_size: 100,
            max_batches_per_kind: 2,
            workers: 1,
            error_sample_size: 5,
            reconcile_sample_size: 10,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.json_dir, Some(PathBuf::from("/exports")));
        assert_eq!(
            config.transform_settings(),
            TransformSettings {
                batch_size: 100,
                max_batches_per_kind: 2,
                workers: 1,
            }
        );
        assert_eq!(config.error_sample_size, 5);
        assert_eq!(config.reconcile_sample_size, 10);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            batch_size: 100,
            ..Default::default()
        };
        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            transform: Some(TransformConfig {
                workers: Some(8),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.workers, 8);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_batches_per_kind, DEFAULT_MAX_BATCHES_PER_KIND);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_rejects_zero_limits() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            workers: 0,
            ..cli_with_dir(&temp_dir)
        };
        assert!(AppConfig::resolve(&cli, None).is_err());

        let file_config = FileConfig {
            transform: Some(TransformConfig {
                batch_size: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli_with_dir(&temp_dir), Some(file_config)).is_err());
    }

    #[test]
    fn test_db_path_helpers() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::resolve(&cli_with_dir(&temp_dir), None).unwrap();
        assert_eq!(config.raw_db_path(), temp_dir.path().join("raw.db"));
        assert_eq!(config.curated_db_path(), temp_dir.path().join("curated.db"));
    }
}
