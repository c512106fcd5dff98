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

use crate::{Assigner, Lookup};
use distance::{Distance, squared_euclidean};
use point::PointVector;

/// The candidate with the smallest exact distance to `sample`. Ties go to
/// the candidate that comes first.
pub fn nearest(
    sample: &[i32],
    centroids: &PointVector,
    candidates: impl IntoIterator<Item = usize>,
) -> Option<usize> {
    let mut result: Option<(Distance, usize)> = None;
    for j in candidates {
        let dis = squared_euclidean(sample, centroids[j].features());
        if result.is_none_or(|(best, _)| dis < best) {
            result = Some((dis, j));
        }
    }
    result.map(|(_, j)| j)
}

/// Plain K-means assignment over all centroids.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flat;

impl Assigner for Flat {
    fn index<'a>(&'a self, centroids: &'a PointVector) -> Lookup<'a> {
        Box::new(move |_: Option<u32>, sample: &[i32]| {
            nearest(sample, centroids, 0..centroids.len())
        })
    }
}
