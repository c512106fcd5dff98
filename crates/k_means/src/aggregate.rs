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

use crate::{Aggregator, Error, Sums};
use point::{DataPoint, PointVector};

/// Averages the assigned points of every slot. A slot that received no point
/// in any partition keeps its previous position.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAggregator;

impl Aggregator for MeanAggregator {
    fn merge(
        &self,
        centroids: &PointVector,
        partials: &[PointVector],
    ) -> Result<PointVector, Error> {
        if partials.is_empty() {
            return Err(Error::EmptyInput);
        }
        let d = centroids.dims();
        let c = centroids.len();
        let mut sums = Sums::from_zeros(d, c);
        for partial in partials {
            if partial.len() != c {
                return Err(Error::ProtocolViolation {
                    what: "centroid slots",
                    expected: c,
                    actual: partial.len(),
                });
            }
            if partial.dims() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    actual: partial.dims(),
                });
            }
            for (slot, aggregate) in partial.iter().enumerate() {
                sums.add_aggregate(slot, aggregate);
            }
        }
        let mut result = PointVector::with_capacity(d, c);
        for slot in 0..c {
            let count = sums.count(slot);
            if count == 0 {
                result.push(DataPoint::new(centroids[slot].features().to_vec()));
            } else {
                // the mean of 32-bit values is a 32-bit value
                let features = sums[slot].iter().map(|&x| (x / count) as i32).collect();
                result.push(DataPoint::new(features));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn centroids(points: &[[i32; 2]]) -> PointVector {
        PointVector::from_points(
            2,
            points.iter().map(|x| DataPoint::new(x.to_vec())).collect(),
        )
    }

    fn partial(slots: &[([i32; 2], i32)]) -> PointVector {
        PointVector::from_points(
            2,
            slots
                .iter()
                .map(|(x, count)| DataPoint::with_count(x.to_vec(), *count))
                .collect(),
        )
    }

    #[test]
    fn mean_of_all_partials() {
        let c = centroids(&[[0, 0], [10, 10]]);
        let partials = [
            partial(&[([2, 2], 1), ([25, 25], 2)]),
            partial(&[([4, 4], 1), ([14, 14], 1)]),
        ];
        let result = MeanAggregator.merge(&c, &partials).unwrap();
        assert_eq!(result, centroids(&[[3, 3], [13, 13]]));
        assert!(result.iter().all(DataPoint::is_observation));
    }

    #[test]
    fn division_truncates_toward_zero() {
        let c = centroids(&[[0, 0]]);
        let result = MeanAggregator
            .merge(&c, &[partial(&[([7, -7], 2)])])
            .unwrap();
        assert_eq!(result, centroids(&[[3, -3]]));
    }

    #[test]
    fn empty_slots_stay_put() {
        let c = centroids(&[[5, 6], [100, 200], [-1, -2]]);
        let partials = [
            partial(&[([10, 12], 2), ([0, 0], 0), ([0, 0], 0)]),
            partial(&[([0, 0], 0), ([0, 0], 0), ([0, 0], 0)]),
        ];
        let result = MeanAggregator.merge(&c, &partials).unwrap();
        assert_eq!(result, c);
    }

    #[test]
    fn no_partials() {
        let c = centroids(&[[0, 0]]);
        assert!(matches!(
            MeanAggregator.merge(&c, &[]),
            Err(Error::EmptyInput)
        ));
    }

    #[test]
    fn misaligned_partials() {
        let c = centroids(&[[0, 0], [1, 1]]);
        let partials = [
            partial(&[([0, 0], 0), ([0, 0], 0)]),
            partial(&[([0, 0], 0)]),
        ];
        assert!(matches!(
            MeanAggregator.merge(&c, &partials),
            Err(Error::ProtocolViolation {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn order_of_partials_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let c = rng.random_range(1..10);
            let n = rng.random_range(1..8);
            let seeds = PointVector::from_points(
                2,
                (0..c)
                    .map(|_| {
                        DataPoint::new((0..2).map(|_| rng.random_range(-1000..1000)).collect())
                    })
                    .collect(),
            );
            let mut partials = (0..n)
                .map(|_| {
                    PointVector::from_points(
                        2,
                        (0..c)
                            .map(|_| {
                                let count = rng.random_range(0..5);
                                let features = (0..2)
                                    .map(|_| count * rng.random_range(-1000..1000))
                                    .collect();
                                DataPoint::with_count(features, count)
                            })
                            .collect(),
                    )
                })
                .collect::<Vec<_>>();
            let expected = MeanAggregator.merge(&seeds, &partials).unwrap();
            for _ in 0..5 {
                partials.shuffle(&mut rng);
                assert_eq!(MeanAggregator.merge(&seeds, &partials).unwrap(), expected);
            }
            // merging pairwise first gives the same centroids
            let mut folded = Sums::from_zeros(2, c);
            for partial in partials.iter() {
                for (slot, aggregate) in partial.iter().enumerate() {
                    folded.add_aggregate(slot, aggregate);
                }
            }
            let folded = folded.into_partial().unwrap();
            assert_eq!(MeanAggregator.merge(&seeds, &[folded]).unwrap(), expected);
        }
    }
}
