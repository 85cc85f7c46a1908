use crate::error::{NexusError, Result};
use crate::score::round_to;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CLASS_PREDICATE: &str = "http://KG_Nexus.com/equivalenceClassComputed";
pub const DEFAULT_PROPERTY_PREDICATE: &str = "http://KG_Nexus.com/equivalencePropertyComputed";

/// Secondary ordering applied to candidates that share a confidence floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Order tied candidates by their entity references.
    Lexicographic,
    /// Keep tied candidates in the order they were supplied.
    InputOrder,
}

impl Default for TieBreak {
    fn default() -> Self {
        TieBreak::Lexicographic
    }
}

/// Tunables for bucketing, matching and output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Raw similarity scores below this value never become candidates
    pub global_threshold: f64,
    /// Width of one score bucket
    pub bucket_width: f64,
    /// Decimal digits bucket bounds are rounded to
    pub precision: u32,
    /// Maximum gap between a prior claim and a new candidate that still
    /// lets a conflicting pair through
    pub slack: f64,
    pub tie_break: TieBreak,
    pub class_predicate: String,
    pub property_predicate: String,
    /// Dispatch scopes to worker tasks instead of running them in turn
    pub parallel: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            global_threshold: 0.5,
            bucket_width: 0.01,
            precision: 2,
            slack: 0.05,
            tie_break: TieBreak::default(),
            class_predicate: DEFAULT_CLASS_PREDICATE.to_string(),
            property_predicate: DEFAULT_PROPERTY_PREDICATE.to_string(),
            parallel: false,
        }
    }
}

impl AlignmentConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NexusError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: AlignmentConfig = serde_json::from_str(&content)
            .map_err(|e| NexusError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `NEXUS_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_f64("NEXUS_SLACK")? {
            self.slack = v;
        }
        if let Some(v) = env_f64("NEXUS_GLOBAL_THRESHOLD")? {
            self.global_threshold = v;
        }
        if let Some(v) = env_f64("NEXUS_BUCKET_WIDTH")? {
            self.bucket_width = v;
        }
        if let Ok(v) = std::env::var("NEXUS_PARALLEL") {
            self.parallel = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.slack.is_finite() || self.slack < 0.0 {
            return Err(NexusError::Config(format!(
                "slack must be a non-negative number, got {}",
                self.slack
            )));
        }
        if !self.global_threshold.is_finite() || !(0.0..=1.0).contains(&self.global_threshold) {
            return Err(NexusError::Config(format!(
                "global_threshold must lie in [0, 1], got {}",
                self.global_threshold
            )));
        }
        if !self.bucket_width.is_finite() || self.bucket_width <= 0.0 {
            return Err(NexusError::Config(format!(
                "bucket_width must be positive, got {}",
                self.bucket_width
            )));
        }
        if self.precision > 9 {
            return Err(NexusError::Config(format!(
                "precision must be at most 9 digits, got {}",
                self.precision
            )));
        }
        // Narrower buckets would collapse onto the same rounded bounds
        let resolution = 10_f64.powi(-(self.precision as i32));
        if self.bucket_width < resolution - f64::EPSILON {
            return Err(NexusError::Config(format!(
                "bucket_width {} is finer than the rounding precision {}",
                self.bucket_width, resolution
            )));
        }
        // An off-grid threshold would round the first bucket's floor below it
        if (round_to(self.global_threshold, self.precision) - self.global_threshold).abs() > 1e-12 {
            return Err(NexusError::Config(format!(
                "global_threshold {} has more than {} decimal digits",
                self.global_threshold, self.precision
            )));
        }
        if self.class_predicate.trim().is_empty() || self.property_predicate.trim().is_empty() {
            return Err(NexusError::Config("equivalence predicates must not be empty".to_string()));
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| NexusError::Config(format!("{} is not a number ({}): {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}
