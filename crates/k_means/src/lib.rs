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

mod aggregate;
mod canopy;
mod flat;
mod sink;
mod sums;
mod worker;

pub use aggregate::MeanAggregator;
pub use canopy::{Canopy, CanopyIndex};
pub use flat::{Flat, nearest};
pub use sink::SingleResultSink;
pub use sums::Sums;
pub use worker::PartitionWorker;

use distance::CanopyMetric;
use point::{DataLoadError, PointVector, SerializationError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no partial results to aggregate")]
    EmptyInput,
    #[error("protocol violation: expected {expected} {what}, got {actual}")]
    ProtocolViolation {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("canopy axis {axis} is out of range for {dims} dimensions")]
    InvalidAxis { axis: usize, dims: usize },
    #[error(transparent)]
    Load(#[from] DataLoadError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// The per-round lookup produced by an [`Assigner`]: given the canopy a point
/// is bound to and the point itself, the centroid slot it contributes to.
pub type Lookup<'a> = Box<dyn Fn(Option<u32>, &[i32]) -> Option<usize> + Sync + 'a>;

/// Chooses, for every local point, the centroid it is assigned to.
pub trait Assigner: Send + Sync {
    fn index<'a>(&'a self, centroids: &'a PointVector) -> Lookup<'a>;
}

/// Merges the partial aggregates of all partitions into the next centroid set.
pub trait Aggregator: Send + Sync {
    /// `centroids` is the set that was broadcast for this round. Slot `i` of
    /// every partial refers to `centroids[i]`.
    fn merge(&self, centroids: &PointVector, partials: &[PointVector])
    -> Result<PointVector, Error>;
}

/// Receives the aggregated output of a round.
pub trait ResultSink: Send {
    /// Every round delivers exactly one result.
    fn capture(&mut self, results: Vec<PointVector>) -> Result<(), Error>;

    fn result(&self) -> Option<&PointVector>;

    fn take(&mut self) -> Option<PointVector>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Plain K-means: every centroid is a candidate for every point.
    Flat,
    /// Candidates are restricted to the centroids inside the point's canopy.
    #[default]
    Canopy,
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Variant::Flat),
            "canopy" => Ok(Variant::Canopy),
            _ => Err(format!("unknown variant `{s}`, expected `flat` or `canopy`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignOptions {
    pub variant: Variant,
    pub t1: f64,
    pub canopy_metric: CanopyMetric,
    /// Resolved against the directory of each partition file.
    pub canopy_centers_path: PathBuf,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            t1: 10.0,
            canopy_metric: CanopyMetric::new(1),
            canopy_centers_path: PathBuf::from("cccenters/canopycenters.txt"),
        }
    }
}

#[test]
fn variant_names() {
    assert_eq!("flat".parse::<Variant>(), Ok(Variant::Flat));
    assert_eq!("canopy".parse::<Variant>(), Ok(Variant::Canopy));
    assert!("kmeans".parse::<Variant>().is_err());
}
