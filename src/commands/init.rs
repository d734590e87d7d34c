//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Base directory; defaults to `~/.watch-duty-crawler`
    pub base_dir: Option<PathBuf>,
    pub force: bool,
}

/// Where init wrote its files
#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    pub config_file: PathBuf,
    pub db_file: PathBuf,
}

/// Write a default configuration and create the page database
pub async fn cmd_init(options: InitOptions) -> Result<InitResult> {
    let mut config = Config::default();
    config.init_paths(options.base_dir);

    if config.paths.config_file.exists() && !options.force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config.paths.config_file.display()
        )));
    }

    config.save()?;

    let db = MetaDb::connect(&config).await?;
    db.init_schema().await?;

    info!("Initialized watch-duty-crawler at {:?}", config.paths.base_dir);

    Ok(InitResult {
        config_file: config.paths.config_file,
        db_file: config.paths.db_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_config_and_db() {
        let tmp = TempDir::new().unwrap();
        let result = cmd_init(InitOptions {
            base_dir: Some(tmp.path().to_path_buf()),
            force: false,
        })
        .await
        .unwrap();

        assert!(result.config_file.exists());
        assert!(result.db_file.exists());

        let loaded = Config::load(&result.config_file).unwrap();
        assert_eq!(loaded.crawl.request_delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_init_refuses_overwrite_without_force() {
        let tmp = TempDir::new().unwrap();
        let options = InitOptions {
            base_dir: Some(tmp.path().to_path_buf()),
            force: false,
        };
        cmd_init(options.clone()).await.unwrap();

        let err = cmd_init(options).await.unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");

        cmd_init(InitOptions {
            base_dir: Some(tmp.path().to_path_buf()),
            force: true,
        })
        .await
        .unwrap();
    }
}
