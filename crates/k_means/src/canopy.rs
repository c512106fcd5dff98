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

use crate::{Assigner, Lookup, nearest};
use distance::CanopyMetric;
use point::PointVector;
use rayon::prelude::*;

/// For every canopy center, the centroids within `t1` of it under the cheap
/// metric, in centroid order.
///
/// Rebuilt every round, since centroids move between rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanopyIndex {
    candidates: Vec<Vec<u32>>,
}

impl CanopyIndex {
    pub fn build(
        canopies: &PointVector,
        centroids: &PointVector,
        metric: CanopyMetric,
        t1: f64,
    ) -> Self {
        let candidates = canopies
            .as_slice()
            .par_iter()
            .map(|canopy| {
                let mut list = Vec::new();
                for (j, centroid) in centroids.iter().enumerate() {
                    if metric.within(canopy.features(), centroid.features(), t1) {
                        list.push(j as u32);
                    }
                }
                list
            })
            .collect();
        Self { candidates }
    }

    /// `None` if the canopy holds no centroid this round.
    pub fn candidates(&self, canopy: usize) -> Option<&[u32]> {
        self.candidates
            .get(canopy)
            .map(Vec::as_slice)
            .filter(|list| !list.is_empty())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Canopies without any candidate.
    pub fn vacant(&self) -> usize {
        self.candidates
            .iter()
            .filter(|list| list.is_empty())
            .count()
    }
}

/// Canopy-pruned assignment: a point bound to a canopy only considers the
/// centroids inside that canopy. Points without a canopy, or whose canopy
/// holds no centroid, are not assigned.
#[derive(Debug, Clone)]
pub struct Canopy {
    centers: PointVector,
    metric: CanopyMetric,
    t1: f64,
}

impl Canopy {
    pub fn new(centers: PointVector, metric: CanopyMetric, t1: f64) -> Self {
        Self {
            centers,
            metric,
            t1,
        }
    }
}

impl Assigner for Canopy {
    fn index<'a>(&'a self, centroids: &'a PointVector) -> Lookup<'a> {
        let index = CanopyIndex::build(&self.centers, centroids, self.metric, self.t1);
        tracing::trace!(
            canopies = index.len(),
            vacant = index.vacant(),
            "canopy index built"
        );
        Box::new(move |canopy: Option<u32>, sample: &[i32]| {
            let candidates = index.candidates(canopy? as usize)?;
            nearest(sample, centroids, candidates.iter().map(|&j| j as usize))
        })
    }
}
