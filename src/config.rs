//! Configuration management for pecha using the prefer crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::formatters::google_vision::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::services::import::DEFAULT_WORKERS;

/// Default output subdirectory name under the user's documents directory.
const OUTPUT_SUBDIR: &str = "pechas";

/// Errors loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config: {reason}")]
    Parse {
        format: &'static str,
        reason: String,
    },
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Language assumed for undetermined OCR detections.
    pub default_language: String,
    /// Pages formatted concurrently during volume import.
    pub workers: usize,
    /// Words below this confidence land in the OCR confidence layer.
    pub confidence_threshold: f32,
    /// Extra attempts for failed provider calls.
    pub provider_retries: u32,
    /// Base delay between provider attempts.
    pub retry_delay_ms: u64,
    /// Where pechas are written.
    pub output_dir: PathBuf,
    /// Root of the local OCR artifact store.
    pub ocr_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let output_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(OUTPUT_SUBDIR);

        Self {
            default_language: "bo".to_string(),
            workers: DEFAULT_WORKERS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            provider_retries: 2,
            retry_delay_ms: 250,
            output_dir,
            ocr_dir: None,
        }
    }
}

impl Settings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Apply `PECHA_*` environment overrides through `lookup`.
    /// Empty and unparsable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|s| !s.is_empty());

        if let Some(language) = var("PECHA_DEFAULT_LANGUAGE") {
            tracing::debug!("Using PECHA_DEFAULT_LANGUAGE from environment: {}", language);
            self.default_language = language;
        }
        if let Some(workers) = var("PECHA_WORKERS").and_then(|s| s.parse::<usize>().ok()) {
            tracing::debug!("Using PECHA_WORKERS from environment: {}", workers);
            self.workers = workers.max(1);
        }
        if let Some(output) = var("PECHA_OUTPUT_DIR") {
            tracing::debug!("Using PECHA_OUTPUT_DIR from environment: {}", output);
            self.output_dir = PathBuf::from(shellexpand::tilde(&output).as_ref());
        }
    }
}

/// Configuration file model. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_dir: Option<String>,
    /// Path to the config file this was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers pecha config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("pecha").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                reason: e.to_string(),
            })?,
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                reason: e.to_string(),
            })?,
            _ => serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                reason: e.to_string(),
            })?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref language) = self.default_language {
            settings.default_language = language.clone();
        }
        if let Some(workers) = self.workers {
            settings.workers = workers.max(1);
        }
        if let Some(threshold) = self.confidence_threshold {
            settings.confidence_threshold = threshold;
        }
        if let Some(retries) = self.provider_retries {
            settings.provider_retries = retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            settings.retry_delay_ms = delay;
        }
        if let Some(ref output) = self.output_dir {
            settings.output_dir = self.resolve_path(output, base_dir);
        }
        if let Some(ref ocr_dir) = self.ocr_dir {
            settings.ocr_dir = Some(self.resolve_path(ocr_dir, base_dir));
        }
    }
}

/// Load settings from an explicit config file or by discovery, then apply
/// environment overrides. Returns (Settings, Config) tuple.
pub async fn load_settings(config_path: Option<&Path>) -> anyhow::Result<(Settings, Config)> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env_overrides(|key| std::env::var(key).ok());

    Ok((settings, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_language, "bo");
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.confidence_threshold, 0.9);
        assert_eq!(settings.provider_retries, 2);
        assert_eq!(settings.retry_delay(), Duration::from_millis(250));
        assert!(settings.output_dir.ends_with("pechas"));
        assert!(settings.ocr_dir.is_none());
    }

    #[tokio::test]
    async fn test_load_formats_by_extension() {
        let dir = TempDir::new().unwrap();

        let toml_path = dir.path().join("pecha.toml");
        std::fs::write(&toml_path, "default_language = \"zh\"\nworkers = 8\n").unwrap();
        let config = Config::load_from_path(&toml_path).await.unwrap();
        assert_eq!(config.default_language.as_deref(), Some("zh"));
        assert_eq!(config.workers, Some(8));
        assert_eq!(config.source_path.as_deref(), Some(toml_path.as_path()));

        let yaml_path = dir.path().join("pecha.yml");
        std::fs::write(&yaml_path, "confidence_threshold: 0.75\n").unwrap();
        let config = Config::load_from_path(&yaml_path).await.unwrap();
        assert_eq!(config.confidence_threshold, Some(0.75));

        let json_path = dir.path().join("pecha.json");
        std::fs::write(&json_path, r#"{"provider_retries": 5}"#).unwrap();
        let config = Config::load_from_path(&json_path).await.unwrap();
        assert_eq!(config.provider_retries, Some(5));
    }

    #[tokio::test]
    async fn test_bad_config_reports_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pecha.toml");
        std::fs::write(&path, "workers = [").unwrap();
        assert!(matches!(
            Config::load_from_path(&path).await,
            Err(ConfigError::Parse { format: "TOML", .. })
        ));
        assert!(matches!(
            Config::load_from_path(&dir.path().join("missing.toml")).await,
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let config = Config {
            output_dir: Some("out".to_string()),
            ocr_dir: Some("/data/ocr".to_string()),
            workers: Some(0),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/pecha"));

        assert_eq!(settings.output_dir, PathBuf::from("/etc/pecha/out"));
        assert_eq!(settings.ocr_dir, Some(PathBuf::from("/data/ocr")));
        assert_eq!(settings.workers, 1);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PECHA_DEFAULT_LANGUAGE", "en"),
            ("PECHA_WORKERS", "not a number"),
            ("PECHA_OUTPUT_DIR", "/tmp/pechas"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.default_language, "en");
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/pechas"));
    }

    #[tokio::test]
    async fn test_load_settings_from_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pecha.yaml");
        std::fs::write(&path, "ocr_dir: artifacts\nretry_delay_ms: 10\n").unwrap();

        let (settings, config) = load_settings(Some(&path)).await.unwrap();
        assert_eq!(config.base_dir().as_deref(), Some(dir.path()));
        assert_eq!(settings.ocr_dir, Some(dir.path().join("artifacts")));
        assert_eq!(settings.retry_delay_ms, 10);
    }
}
