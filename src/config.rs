use std::env;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::chunker::ChunkerConfig;
use crate::tokens::DEFAULT_MODEL_NAME;
use crate::util::read_text_file;
use crate::validator::ValidationThresholds;

pub const ENV_MIN_CHARS: &str = "LEGALSEG_MIN_CHARS";
pub const ENV_MAX_CHARS: &str = "LEGALSEG_MAX_CHARS";
pub const ENV_TOKEN_LIMIT: &str = "LEGALSEG_TOKEN_LIMIT";
pub const ENV_MODEL: &str = "LEGALSEG_MODEL";
pub const ENV_MIN_COVERAGE: &str = "LEGALSEG_MIN_COVERAGE";
pub const ENV_MAX_DUPLICATION: &str = "LEGALSEG_MAX_DUPLICATION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SegmenterConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    pub token_limit: Option<usize>,
    pub model_name: String,
    pub min_coverage: f64,
    pub max_duplication: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        let chunker = ChunkerConfig::default();
        let thresholds = ValidationThresholds::default();
        Self {
            min_chars: chunker.min_chars,
            max_chars: chunker.max_chars,
            token_limit: chunker.token_limit,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            min_coverage: thresholds.min_coverage,
            max_duplication: thresholds.max_duplication,
        }
    }
}

impl SegmenterConfig {
    /// Defaults, then the optional JSON file, then `LEGALSEG_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = read_text_file(path)?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MIN_CHARS) {
            self.min_chars = parse_var(ENV_MIN_CHARS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_CHARS) {
            self.max_chars = parse_var(ENV_MAX_CHARS, &value)?;
        }
        if let Some(value) = lookup(ENV_TOKEN_LIMIT) {
            self.token_limit = Some(parse_var(ENV_TOKEN_LIMIT, &value)?);
        }
        if let Some(value) = lookup(ENV_MODEL) {
            let value = value.trim();
            if !value.is_empty() {
                self.model_name = value.to_string();
            }
        }
        if let Some(value) = lookup(ENV_MIN_COVERAGE) {
            self.min_coverage = parse_var(ENV_MIN_COVERAGE, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_DUPLICATION) {
            self.max_duplication = parse_var(ENV_MAX_DUPLICATION, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            bail!("max_chars must be greater than zero");
        }
        if self.min_chars > self.max_chars {
            bail!(
                "min_chars ({}) must not exceed max_chars ({})",
                self.min_chars,
                self.max_chars
            );
        }
        if self.token_limit == Some(0) {
            bail!("token_limit must be greater than zero when set");
        }
        for (name, value) in [
            ("min_coverage", self.min_coverage),
            ("max_duplication", self.max_duplication),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be within [0, 1], got {value}");
            }
        }
        Ok(())
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            min_chars: self.min_chars,
            max_chars: self.max_chars,
            token_limit: self.token_limit,
        }
    }

    pub fn thresholds(&self) -> ValidationThresholds {
        ValidationThresholds {
            min_coverage: self.min_coverage,
            max_duplication: self.max_duplication,
            ..ValidationThresholds::default()
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid value for {key}: {value:?}"))
}
