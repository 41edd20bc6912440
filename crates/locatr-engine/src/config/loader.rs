//! Config discovery.
//!
//! `LOCATR_CONFIG` names a file explicitly and must exist. Otherwise the first
//! of `./locatr.yaml` and `~/.locatr/config.yaml` that exists is used, and
//! with neither present the defaults apply.

use super::schema::LocatrConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const CONFIG_PATH_ENV: &str = "LOCATR_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid config {origin}: {reason}")]
    Invalid { origin: String, reason: String },
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub async fn load_default() -> Result<LocatrConfig, ConfigError> {
        let home = dirs::home_dir();
        Self::discover(|key| std::env::var(key).ok(), Path::new("."), home.as_deref()).await
    }

    /// Resolve the config the way [`load_default`](Self::load_default) does,
    /// with the environment, working directory and home directory supplied.
    pub async fn discover<F>(
        lookup: F,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Result<LocatrConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(explicit) = lookup(CONFIG_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            info!("Using config from {}={}", CONFIG_PATH_ENV, explicit);
            return Self::load_from(Path::new(&explicit)).await;
        }

        for path in Self::search_paths(cwd, home) {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                info!("Using config file {}", path.display());
                return Self::load_from(&path).await;
            }
            debug!("No config at {}", path.display());
        }

        debug!("No config file found, using defaults");
        Ok(LocatrConfig::default())
    }

    fn search_paths(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = vec![cwd.join("locatr.yaml")];
        if let Some(home) = home {
            paths.push(home.join(".locatr").join("config.yaml"));
        }
        paths
    }

    pub async fn load_from(path: &Path) -> Result<LocatrConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate a YAML document; `origin` names it in errors.
    pub fn parse(content: &str, origin: &str) -> Result<LocatrConfig, ConfigError> {
        let config: LocatrConfig =
            serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            origin: origin.to_string(),
            reason,
        })?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_document_is_defaults() {
        let config = ConfigLoader::parse("{}", "inline").unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.chunking.chunk_size, 4000);
        assert_eq!(config.rerank.threshold, 0.8);
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
cache:
  path: /tmp/locatr/cache.json
chunking:
  chunk_size: 1200
step_timeout_ms: 5000
"#;
        let config = ConfigLoader::parse(yaml, "inline").unwrap();
        assert_eq!(config.cache.path, PathBuf::from("/tmp/locatr/cache.json"));
        assert!(config.cache.enabled);
        assert_eq!(config.chunking.chunk_size, 1200);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.step_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_threshold_names_origin() {
        let err = ConfigLoader::parse("rerank:\n  threshold: 1.5\n", "team.yaml").unwrap_err();
        match err {
            ConfigError::Invalid { origin, .. } => assert_eq!(origin, "team.yaml"),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_error_carries_path() {
        let path = Path::new("/definitely/not/here.yaml");
        let err = ConfigLoader::load_from(path).await.unwrap_err();
        match &err {
            ConfigError::Io { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected Io, got {:?}", other),
        }
        assert!(err.to_string().contains("/definitely/not/here.yaml"));
    }

    #[tokio::test]
    async fn test_discover_prefers_working_directory() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        std::fs::write(cwd.path().join("locatr.yaml"), "step_timeout_ms: 10\n").unwrap();
        std::fs::create_dir(home.path().join(".locatr")).unwrap();
        std::fs::write(
            home.path().join(".locatr").join("config.yaml"),
            "step_timeout_ms: 20\n",
        )
        .unwrap();

        let config = ConfigLoader::discover(env(&[]), cwd.path(), Some(home.path()))
            .await
            .unwrap();
        assert_eq!(config.step_timeout_ms, 10);

        std::fs::remove_file(cwd.path().join("locatr.yaml")).unwrap();
        let config = ConfigLoader::discover(env(&[]), cwd.path(), Some(home.path()))
            .await
            .unwrap();
        assert_eq!(config.step_timeout_ms, 20);
    }

    #[tokio::test]
    async fn test_discover_env_override_wins() {
        let cwd = tempfile::tempdir().unwrap();
        std::fs::write(cwd.path().join("locatr.yaml"), "step_timeout_ms: 10\n").unwrap();
        let explicit = cwd.path().join("ci.yaml");
        std::fs::write(&explicit, "identification:\n  max_attempts: 1\n").unwrap();

        let lookup = env(&[(CONFIG_PATH_ENV, explicit.to_str().unwrap())]);
        let config = ConfigLoader::discover(lookup, cwd.path(), None).await.unwrap();
        assert_eq!(config.identification.max_attempts, 1);
        assert_eq!(config.step_timeout_ms, LocatrConfig::default().step_timeout_ms);
    }

    #[tokio::test]
    async fn test_discover_env_override_must_exist() {
        let cwd = tempfile::tempdir().unwrap();
        let missing = cwd.path().join("gone.yaml");
        let lookup = env(&[(CONFIG_PATH_ENV, missing.to_str().unwrap())]);
        let err = ConfigLoader::discover(lookup, cwd.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[tokio::test]
    async fn test_discover_without_files_is_defaults() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let lookup = env(&[(CONFIG_PATH_ENV, "  ")]);
        let config = ConfigLoader::discover(lookup, cwd.path(), Some(home.path()))
            .await
            .unwrap();
        assert_eq!(config.chunking.chunk_size, 4000);
    }
}
