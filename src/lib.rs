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

//! Canopy-accelerated iterative k-means over a partitioned dataset.
//!
//! A run loads the seed centroids, hands the partition manifest to an
//! [`Executor`](executor::Executor) and lets the [`IterationController`]
//! broadcast centroids round after round until they stop moving.

pub mod config;
pub mod controller;
mod error;

pub use config::{ClusteringOptions, ConfigError};
pub use controller::{IterationController, Outcome, RunReport, State, total_error};
pub use error::Error;

use executor::{LocalExecutor, PartitionManifest};
use std::path::Path;

// dependencies of the `canopy` binary
use anyhow as _;
use clap as _;
use tracing_subscriber as _;

/// Clusters the partitions listed in `manifest` on a [`LocalExecutor`],
/// starting from the centroids in `centroid_file`.
pub fn run(
    centroid_file: &Path,
    num_partitions: usize,
    manifest: &Path,
    options: &ClusteringOptions,
) -> Result<RunReport, Error> {
    options.check()?;
    let seeds = point::read_points(centroid_file)?;
    let manifest = PartitionManifest::read(manifest)?;
    let executor = LocalExecutor::new(
        options.assign_options(),
        num_partitions,
        options.threads as usize,
    );
    IterationController::new(executor, options).run(seeds, &manifest)
}
