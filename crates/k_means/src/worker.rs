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

use crate::{AssignOptions, Assigner, Canopy, Error, Flat, Sums, Variant};
use distance::CanopyMetric;
use point::PointVector;
use rayon::prelude::*;
use std::path::Path;

/// One partition of the dataset, loaded once and reused by every round.
pub struct PartitionWorker {
    id: usize,
    points: PointVector,
    /// Position in the canopy center set of each point's canopy center.
    bindings: Vec<Option<u32>>,
    assigner: Box<dyn Assigner>,
}

impl PartitionWorker {
    /// Loads a partition file and, for the canopy variant, the canopy centers
    /// stored next to it.
    pub fn configure(id: usize, path: &Path, options: &AssignOptions) -> Result<Self, Error> {
        let (canopy_column, points) =
            point::read_pairs(path).map_err(|e| e.in_partition(id))?;
        let worker = match options.variant {
            Variant::Flat => Self::flat(id, points),
            Variant::Canopy => {
                let canopies_path = path
                    .parent()
                    .unwrap_or(Path::new("."))
                    .join(&options.canopy_centers_path);
                let centers =
                    point::read_points(&canopies_path).map_err(|e| e.in_partition(id))?;
                Self::with_canopies(
                    id,
                    &canopy_column,
                    points,
                    centers,
                    options.canopy_metric,
                    options.t1,
                )?
            }
        };
        tracing::debug!(
            partition = id,
            path = %path.display(),
            points = worker.len(),
            unbound = worker.bindings.iter().filter(|x| x.is_none()).count(),
            "partition configured"
        );
        Ok(worker)
    }

    pub fn flat(id: usize, points: PointVector) -> Self {
        Self {
            id,
            bindings: vec![None; points.len()],
            points,
            assigner: Box::new(Flat),
        }
    }

    /// `canopy_column[n]` is the canopy center of `points[n]`.
    pub fn with_canopies(
        id: usize,
        canopy_column: &PointVector,
        points: PointVector,
        centers: PointVector,
        metric: CanopyMetric,
        t1: f64,
    ) -> Result<Self, Error> {
        assert_eq!(canopy_column.len(), points.len());
        if centers.dims() != points.dims() {
            return Err(Error::DimensionMismatch {
                expected: points.dims(),
                actual: centers.dims(),
            });
        }
        if metric.axis() >= points.dims() {
            return Err(Error::InvalidAxis {
                axis: metric.axis(),
                dims: points.dims(),
            });
        }
        let bindings = canopy_column
            .iter()
            .map(|canopy| centers.position(canopy.features()).map(|x| x as u32))
            .collect();
        Ok(Self {
            id,
            points,
            bindings,
            assigner: Box::new(Canopy::new(centers, metric, t1)),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.points.dims()
    }

    /// Assigns every local point to a centroid and returns the per-centroid
    /// sums and counts. The result has one slot per centroid, in order.
    pub fn assign(&self, centroids: &PointVector) -> Result<PointVector, Error> {
        if centroids.dims() != self.dims() {
            return Err(Error::DimensionMismatch {
                expected: self.dims(),
                actual: centroids.dims(),
            });
        }
        let d = self.dims();
        let c = centroids.len();
        let lookup = self.assigner.index(centroids);
        let sums = (0..self.points.len())
            .into_par_iter()
            .fold(
                || Sums::from_zeros(d, c),
                |mut sums, i| {
                    let sample = self.points[i].features();
                    match lookup(self.bindings[i], sample) {
                        Some(slot) => sums.add(slot, sample),
                        None => sums.skip(),
                    }
                    sums
                },
            )
            .reduce(
                || Sums::from_zeros(d, c),
                |mut sums, sums_1| {
                    sums.merge(&sums_1);
                    sums
                },
            );
        if sums.skipped() != 0 {
            tracing::debug!(
                partition = self.id,
                skipped = sums.skipped(),
                "points without candidate centroids"
            );
        }
        Ok(sums.into_partial()?)
    }
}
