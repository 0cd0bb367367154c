use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::stage1_correlation::DEFAULT_MIN_SAMPLES;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Thresholds for the gene coexpression link analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkAnalysisConfig {
    pub min_samples: usize,
    pub positive_threshold: f64,
    pub negative_threshold: f64,
    pub stringency: usize,
    pub batch_size: usize,
    pub store_both_ways: bool,
    pub presence_fraction: f64,
}

impl Default for LinkAnalysisConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            positive_threshold: 0.5,
            negative_threshold: -0.5,
            stringency: 2,
            batch_size: 1000,
            store_both_ways: true,
            presence_fraction: 0.0,
        }
    }
}

impl LinkAnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_samples < 3 {
            return Err(invalid("min_samples", "must be at least 3"));
        }
        if !(0.0..=1.0).contains(&self.positive_threshold) {
            return Err(invalid("positive_threshold", "must lie in [0, 1]"));
        }
        if !(-1.0..=0.0).contains(&self.negative_threshold) {
            return Err(invalid("negative_threshold", "must lie in [-1, 0]"));
        }
        if self.stringency == 0 {
            return Err(invalid("stringency", "must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        check_fraction("presence_fraction", self.presence_fraction)
    }
}

/// Filters applied before BLAT associations are scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeMapperConfig {
    pub blat_score_threshold: f64,
    pub identity_threshold: f64,
    pub trim_non_canonical_chromosome_hits: bool,
    pub maximum_repeat_fraction: f64,
    pub non_specific_site_count_threshold: usize,
    pub non_repeat_non_specific_site_count_threshold: usize,
    pub minimum_exon_overlap_fraction: f64,
}

impl Default for ProbeMapperConfig {
    fn default() -> Self {
        Self {
            blat_score_threshold: 0.8,
            identity_threshold: 0.8,
            trim_non_canonical_chromosome_hits: true,
            maximum_repeat_fraction: 0.3,
            non_specific_site_count_threshold: 3,
            non_repeat_non_specific_site_count_threshold: 50,
            minimum_exon_overlap_fraction: 0.0,
        }
    }
}

impl ProbeMapperConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("blat_score_threshold", self.blat_score_threshold)?;
        check_fraction("identity_threshold", self.identity_threshold)?;
        check_fraction("maximum_repeat_fraction", self.maximum_repeat_fraction)?;
        check_fraction(
            "minimum_exon_overlap_fraction",
            self.minimum_exon_overlap_fraction,
        )?;
        if self.non_specific_site_count_threshold == 0 {
            return Err(invalid(
                "non_specific_site_count_threshold",
                "must be at least 1",
            ));
        }
        if self.non_repeat_non_specific_site_count_threshold == 0 {
            return Err(invalid(
                "non_repeat_non_specific_site_count_threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Reads a JSON config; keys absent from the file keep their defaults.
pub fn load_json<T>(path: &Path) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn check_fraction(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, "must lie in [0, 1]"))
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}
