//! CLI configuration loader for pickr
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Working directory: ./pickr.json or ./.pickr/config.json
//! 3. XDG config: $XDG_CONFIG_HOME/pickr/config.json or ~/.config/pickr/config.json
//! 4. Built-in defaults (no files)

use anyhow::{anyhow, Context, Result};
use pickr_core::{ReferenceMode, SelectConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration loader
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Directory searched for project config (defaults to the current one)
    working_dir: Option<PathBuf>,
    /// User config directory (defaults to the platform one)
    config_home: Option<PathBuf>,
    /// Flag overrides
    multiple_override: Option<bool>,
    client_mode_override: Option<bool>,
    reference_mode_override: Option<ReferenceMode>,
    min_length_override: Option<usize>,
    debounce_override: Option<u64>,
    max_results_override: Option<usize>,
    placeholder_override: Option<String>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            config_override: None,
            working_dir: None,
            config_home: dirs::config_dir(),
            multiple_override: None,
            client_mode_override: None,
            reference_mode_override: None,
            min_length_override: None,
            debounce_override: None,
            max_results_override: None,
            placeholder_override: None,
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Search for project config in `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Use `dir` as the user config directory
    pub fn with_config_home(mut self, dir: Option<PathBuf>) -> Self {
        self.config_home = dir;
        self
    }

    pub fn with_multiple_override(mut self, multiple: bool) -> Self {
        self.multiple_override = Some(multiple);
        self
    }

    pub fn with_client_mode_override(mut self, client_mode: bool) -> Self {
        self.client_mode_override = Some(client_mode);
        self
    }

    pub fn with_reference_mode_override(mut self, mode: ReferenceMode) -> Self {
        self.reference_mode_override = Some(mode);
        self
    }

    pub fn with_min_length_override(mut self, min_length: usize) -> Self {
        self.min_length_override = Some(min_length);
        self
    }

    pub fn with_debounce_override(mut self, debounce_ms: u64) -> Self {
        self.debounce_override = Some(debounce_ms);
        self
    }

    pub fn with_max_results_override(mut self, max_results: usize) -> Self {
        self.max_results_override = Some(max_results);
        self
    }

    pub fn with_placeholder_override(mut self, placeholder: String) -> Self {
        self.placeholder_override = Some(placeholder);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<SelectConfig> {
        // Step 1: Find and load base configuration
        let mut config = if let Some(override_path) = &self.config_override {
            self.load_from_path(override_path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(multiple) = self.multiple_override {
            config.multiple = multiple;
        }
        if let Some(client_mode) = self.client_mode_override {
            config.client_mode = client_mode;
        }
        if let Some(mode) = self.reference_mode_override {
            config.reference_mode = mode;
        }
        if let Some(min_length) = self.min_length_override {
            config.min_term_length = min_length;
        }
        if let Some(debounce_ms) = self.debounce_override {
            config.debounce_delay_ms = debounce_ms;
        }
        if let Some(max_results) = self.max_results_override {
            config.max_results = Some(max_results);
        }
        if let Some(placeholder) = &self.placeholder_override {
            config.placeholder = placeholder.clone();
        }

        // Step 3: Validate
        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        Ok(config)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<SelectConfig> {
        if let Some(config) = self.try_load_working_dir().await? {
            return Ok(config);
        }

        if let Some(config) = self.try_load_xdg().await? {
            return Ok(config);
        }

        debug!("No config file found, using defaults");
        Ok(SelectConfig::default())
    }

    /// Try loading from the working directory
    async fn try_load_working_dir(&self) -> Result<Option<SelectConfig>> {
        let dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        // Try ./pickr.json first
        let pickr_json = dir.join("pickr.json");
        if pickr_json.exists() {
            return Ok(Some(self.load_file(&pickr_json).await?));
        }

        // Try ./.pickr/config.json
        let pickr_dir_config = dir.join(".pickr").join("config.json");
        if pickr_dir_config.exists() {
            return Ok(Some(self.load_file(&pickr_dir_config).await?));
        }

        Ok(None)
    }

    /// Try loading from the user config directory
    async fn try_load_xdg(&self) -> Result<Option<SelectConfig>> {
        if let Some(config_dir) = &self.config_home {
            let config_path = config_dir.join("pickr").join("config.json");
            if config_path.exists() {
                return Ok(Some(self.load_file(&config_path).await?));
            }
        }
        Ok(None)
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<SelectConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<SelectConfig> {
        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

impl Default for CliConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn isolated(dir: &TempDir) -> CliConfigLoader {
        CliConfigLoader::new()
            .with_working_dir(dir.path().to_path_buf())
            .with_config_home(Some(dir.path().join("home")))
    }

    #[tokio::test]
    async fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = isolated(&dir).load().await.unwrap();

        assert_eq!(config, SelectConfig::default());
    }

    #[tokio::test]
    async fn test_working_dir_file_wins_over_xdg() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pickr.json"), r#"{"multiple": true}"#).unwrap();
        let xdg = dir.path().join("home").join("pickr");
        std::fs::create_dir_all(&xdg).unwrap();
        std::fs::write(xdg.join("config.json"), r#"{"min_term_length": 5}"#).unwrap();

        let config = isolated(&dir).load().await.unwrap();

        assert!(config.multiple);
        assert_eq!(config.min_term_length, 2);
    }

    #[tokio::test]
    async fn test_dot_dir_and_xdg_fallbacks() {
        let dir = TempDir::new().unwrap();
        let xdg = dir.path().join("home").join("pickr");
        std::fs::create_dir_all(&xdg).unwrap();
        std::fs::write(xdg.join("config.json"), r#"{"min_term_length": 5}"#).unwrap();

        let config = isolated(&dir).load().await.unwrap();
        assert_eq!(config.min_term_length, 5);

        std::fs::create_dir_all(dir.path().join(".pickr")).unwrap();
        std::fs::write(
            dir.path().join(".pickr").join("config.json"),
            r#"{"client_mode": true}"#,
        )
        .unwrap();

        let config = isolated(&dir).load().await.unwrap();
        assert!(config.client_mode);
        assert_eq!(config.min_term_length, 2);
    }

    #[tokio::test]
    async fn test_override_directory_and_flags() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join("custom");
        std::fs::create_dir_all(&custom).unwrap();
        std::fs::write(
            custom.join("config.json"),
            r#"{"reference_mode": "entity", "debounce_delay_ms": 100}"#,
        )
        .unwrap();

        let config = isolated(&dir)
            .with_config_override(custom)
            .with_debounce_override(10)
            .with_max_results_override(3)
            .load()
            .await
            .unwrap();

        assert_eq!(config.reference_mode, ReferenceMode::Entity);
        assert_eq!(config.debounce_delay_ms, 10);
        assert_eq!(config.max_results, Some(3));
    }

    #[tokio::test]
    async fn test_missing_override_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = isolated(&dir)
            .with_config_override(dir.path().join("nope.json"))
            .load()
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = isolated(&dir).with_max_results_override(0).load().await;

        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Configuration validation failed"));
    }
}
