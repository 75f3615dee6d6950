//! Settings loading for the mirror node.
//!
//! The node reads the same `Settings` struct the sync library consumes,
//! writing a default file on first run so an operator has something to
//! edit.

use crate::args::Args;
use anyhow::Result;
use dominion_sync::{BrokerType, Settings};
use tracing::{info, warn};

/// Loads settings from the file named in `args`, writing a default file
/// when none exists.
pub async fn load_config(args: &Args) -> Result<Settings> {
    if args.config.exists() {
        let raw = tokio::fs::read_to_string(&args.config).await?;
        match toml::from_str::<Settings>(&raw) {
            Ok(settings) => Ok(settings),
            Err(error) => {
                warn!("failed to parse {}: {}", args.config.display(), error);
                Err(error.into())
            }
        }
    } else {
        warn!(
            "settings file {} not found, using defaults",
            args.config.display()
        );
        let defaults = Settings::default();
        tokio::fs::write(&args.config, toml::to_string_pretty(&defaults)?).await?;
        info!("created default settings file {}", args.config.display());
        Ok(defaults)
    }
}

/// Applies command-line overrides on top of loaded settings.
pub fn apply_overrides(mut settings: Settings, args: &Args) -> Settings {
    if let Some(server) = &args.server {
        settings.server.name = server.clone();
    }
    if let Some(cluster) = &args.cluster {
        settings.cluster.id = cluster.clone();
    }
    if let Some(redis) = &args.redis {
        settings.broker.kind = BrokerType::Redis;
        settings.broker.redis.url = redis.clone();
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn missing_file_writes_the_defaults() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_path_buf();
        // Delete the file so the loader takes the default branch.
        drop(temp);
        let args = Args {
            config: path.clone(),
            ..Default::default()
        };

        let settings = load_config(&args).await.unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn existing_file_is_parsed() {
        let temp = NamedTempFile::new().unwrap();
        tokio::fs::write(
            temp.path(),
            r#"
            [server]
            name = "mirror-1"

            [broker]
            kind = "redis"
            "#,
        )
        .await
        .unwrap();
        let args = Args {
            config: temp.path().to_path_buf(),
            ..Default::default()
        };

        let settings = load_config(&args).await.unwrap();
        assert_eq!(settings.server.name, "mirror-1");
        assert_eq!(settings.broker.kind, BrokerType::Redis);
    }

    #[tokio::test]
    async fn garbage_files_are_an_error() {
        let temp = NamedTempFile::new().unwrap();
        tokio::fs::write(temp.path(), "not = [valid").await.unwrap();
        let args = Args {
            config: temp.path().to_path_buf(),
            ..Default::default()
        };

        assert!(load_config(&args).await.is_err());
    }

    #[test]
    fn cli_overrides_win() {
        let mut args = Args::default();
        args.server = Some("mirror-2".to_string());
        args.cluster = Some("staging".to_string());
        args.redis = Some("redis://cache:6379".to_string());

        let settings = apply_overrides(Settings::default(), &args);
        assert_eq!(settings.server.name, "mirror-2");
        assert_eq!(settings.cluster.id, "staging");
        assert_eq!(settings.broker.kind, BrokerType::Redis);
        assert_eq!(settings.broker.redis.url, "redis://cache:6379");
    }
}
