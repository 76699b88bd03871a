//! Configuration management for kwild
//!
//! The configuration file carries matching defaults, action safety limits,
//! pipeline tuning and named filter profiles. Every value has a default, so a
//! missing file or a missing section is never an error.

use crate::action::DEFAULT_BATCH_SIZE;
use crate::error::{KwildError, Result};
use crate::filtering::FilterSpec;
use crate::patterns::{MatchMode, DEFAULT_FUZZY_DISTANCE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Current configuration schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta", default)]
    pub meta: MetaConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Named filter presets selected with `--profile`
    #[serde(default)]
    pub profiles: BTreeMap<String, FilterSpec>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: current_timestamp(),
            last_modified: current_timestamp(),
        }
    }
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Name matching defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub mode: MatchMode,
    pub ignore_case: bool,
    pub fuzzy_distance: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            mode: MatchMode::Glob,
            ignore_case: false,
            fuzzy_distance: DEFAULT_FUZZY_DISTANCE,
        }
    }
}

/// Action execution limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Names per kubectl invocation
    pub batch_size: usize,
    /// Deletes matching more than this many resources need `--yes`; 0 disables
    pub confirm_threshold: usize,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            confirm_threshold: 0,
        }
    }
}

/// Filter pipeline tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Candidate count above which filtering runs on worker threads
    pub parallel_threshold: usize,
    /// Worker threads; 0 uses the rayon pool size
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 5000,
            workers: 0,
        }
    }
}

impl PipelineConfig {
    /// Worker count to use for `candidates` inputs; 1 means sequential
    pub fn workers_for(&self, candidates: usize) -> usize {
        if candidates <= self.parallel_threshold {
            return 1;
        }
        if self.workers > 0 {
            return self.workers;
        }
        rayon::current_num_threads()
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        let mut unhealthy = FilterSpec::default();
        unhealthy.health.unhealthy = true;
        profiles.insert("unhealthy".to_string(), unhealthy);

        Self {
            meta: MetaConfig::default(),
            matching: MatchingConfig::default(),
            actions: ActionsConfig::default(),
            pipeline: PipelineConfig::default(),
            profiles,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(KwildError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| KwildError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Load `path`, falling back to defaults (plus env overrides) when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(KwildError::ConfigNotFound { .. }) => {
                tracing::debug!("No config at {:?}, using defaults", path);
                let mut config = Self::default();
                config.apply_env_overrides();
                ConfigValidator::validate(&config)?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Save configuration to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| KwildError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", parent),
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| KwildError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    pub fn profile(&self, name: &str) -> Result<&FilterSpec> {
        self.profiles
            .get(name)
            .ok_or_else(|| KwildError::Config(format!("Unknown profile '{}'", name)))
    }

    /// Starting filter spec for `resource`: matching defaults, then the profile if any
    pub fn base_spec(&self, resource: &str, profile: Option<&str>) -> Result<FilterSpec> {
        let mut spec = FilterSpec::new(resource);
        spec.mode = Some(self.matching.mode);
        spec.ignore_case = self.matching.ignore_case;
        spec.fuzzy_distance = Some(self.matching.fuzzy_distance);
        if let Some(name) = profile {
            spec.merge(self.profile(name)?);
        }
        Ok(spec)
    }

    /// Apply environment variable overrides
    /// Environment variables in format: KWILD_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `KWILD_`-prefixed overrides from any key/value source
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("KWILD_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "MATCHING__MODE" => self.matching.mode = value.parse()?,
            "MATCHING__IGNORE_CASE" => self.matching.ignore_case = parse_value(path, value)?,
            "MATCHING__FUZZY_DISTANCE" => {
                self.matching.fuzzy_distance = parse_value(path, value)?;
            }
            "ACTIONS__BATCH_SIZE" => self.actions.batch_size = parse_value(path, value)?,
            "ACTIONS__CONFIRM_THRESHOLD" => {
                self.actions.confirm_threshold = parse_value(path, value)?;
            }
            "PIPELINE__PARALLEL_THRESHOLD" => {
                self.pipeline.parallel_threshold = parse_value(path, value)?;
            }
            "PIPELINE__WORKERS" => self.pipeline.workers = parse_value(path, value)?,
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| KwildError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("kwild").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| KwildError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}
