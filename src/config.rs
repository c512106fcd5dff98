// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

use k_means::{AssignOptions, Variant};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse options")]
    Parse(#[from] toml::de::Error),
    #[error("invalid options")]
    Invalid(#[from] ValidationErrors),
}

/// Options of a clustering run.
///
/// Every field has a default, so an empty document is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "Self::validate_self"))]
pub struct ClusteringOptions {
    #[serde(default = "ClusteringOptions::default_variant")]
    pub variant: Variant,
    /// Loose canopy threshold. A centroid is a candidate for a canopy when the
    /// canopy metric between them is below `t1`.
    #[serde(default = "ClusteringOptions::default_t1")]
    #[validate(range(exclusive_min = 0.0))]
    pub t1: f64,
    /// Tight canopy threshold. Only canopy generation reads it.
    #[serde(default = "ClusteringOptions::default_t2")]
    #[validate(range(exclusive_min = 0.0))]
    pub t2: f64,
    /// A round converges when its total error is below this threshold.
    #[serde(default = "ClusteringOptions::default_convergence_threshold")]
    #[validate(range(exclusive_min = 0.0))]
    pub convergence_threshold: f64,
    #[serde(default = "ClusteringOptions::default_max_iterations")]
    #[validate(range(min = 1))]
    pub max_iterations: Option<u32>,
    #[serde(default = "ClusteringOptions::default_threads")]
    #[validate(range(min = 1, max = 256))]
    pub threads: u16,
    #[serde(default = "ClusteringOptions::default_canopy_axis")]
    pub canopy_axis: usize,
    /// Location of the canopy centers, relative to each partition file.
    #[serde(default = "ClusteringOptions::default_canopy_centers_path")]
    pub canopy_centers_path: PathBuf,
}

impl ClusteringOptions {
    fn default_variant() -> Variant {
        Variant::Canopy
    }
    fn default_t1() -> f64 {
        10.0
    }
    fn default_t2() -> f64 {
        6.0
    }
    fn default_convergence_threshold() -> f64 {
        1.0
    }
    fn default_max_iterations() -> Option<u32> {
        None
    }
    fn default_threads() -> u16 {
        std::thread::available_parallelism().map_or(1, |n| n.get().min(256) as u16)
    }
    fn default_canopy_axis() -> usize {
        1
    }
    fn default_canopy_centers_path() -> PathBuf {
        PathBuf::from("cccenters/canopycenters.txt")
    }
    pub fn validate_self(&self) -> Result<(), ValidationError> {
        if !(self.t1.is_finite() && self.t2.is_finite()) {
            return Err(ValidationError::new("canopy thresholds must be finite"));
        }
        if self.t2 > self.t1 {
            return Err(ValidationError::new("`t2` must not exceed `t1`"));
        }
        if self.convergence_threshold.is_nan() {
            return Err(ValidationError::new("`convergence_threshold` is not a number"));
        }
        if self.canopy_centers_path.as_os_str().is_empty() {
            return Err(ValidationError::new("`canopy_centers_path` is empty"));
        }
        Ok(())
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let options = toml::from_str::<Self>(s)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&s)
    }

    /// Validates options after they have been edited in place.
    pub fn check(&self) -> Result<(), ConfigError> {
        Ok(self.validate()?)
    }

    pub fn assign_options(&self) -> AssignOptions {
        AssignOptions {
            variant: self.variant,
            t1: self.t1,
            canopy_metric: distance::CanopyMetric::new(self.canopy_axis),
            canopy_centers_path: self.canopy_centers_path.clone(),
        }
    }
}

impl Default for ClusteringOptions {
    fn default() -> Self {
        Self {
            variant: Self::default_variant(),
            t1: Self::default_t1(),
            t2: Self::default_t2(),
            convergence_threshold: Self::default_convergence_threshold(),
            max_iterations: Self::default_max_iterations(),
            threads: Self::default_threads(),
            canopy_axis: Self::default_canopy_axis(),
            canopy_centers_path: Self::default_canopy_centers_path(),
        }
    }
}
