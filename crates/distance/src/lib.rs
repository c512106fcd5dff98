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

/// Squared Euclidean distance between two integer feature vectors.
///
/// Each squared difference of two `i32` is exact in `u64`; the sum saturates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Distance(u64);

impl Distance {
    pub const ZERO: Self = Distance(0);
    pub const INFINITY: Self = Distance(u64::MAX);

    #[inline(always)]
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    #[inline(always)]
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64
    }
}

impl From<Distance> for f64 {
    #[inline(always)]
    fn from(value: Distance) -> Self {
        value.to_f64()
    }
}

impl std::ops::Add for Distance {
    type Output = Distance;

    #[inline(always)]
    fn add(self, rhs: Self) -> Self::Output {
        Distance(self.0.saturating_add(rhs.0))
    }
}

impl std::iter::Sum for Distance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Distance::ZERO, std::ops::Add::add)
    }
}

#[inline]
pub fn squared_euclidean(lhs: &[i32], rhs: &[i32]) -> Distance {
    assert_eq!(lhs.len(), rhs.len());
    let mut sum = 0u64;
    for i in 0..lhs.len() {
        let d = (lhs[i] as i64 - rhs[i] as i64).unsigned_abs();
        sum = sum.saturating_add(d * d);
    }
    Distance(sum)
}

/// The cheap metric used to decide canopy membership: the absolute
/// difference along a single feature axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanopyMetric {
    axis: usize,
}

impl CanopyMetric {
    pub const fn new(axis: usize) -> Self {
        Self { axis }
    }

    pub const fn axis(self) -> usize {
        self.axis
    }

    #[inline]
    pub fn distance(self, lhs: &[i32], rhs: &[i32]) -> u64 {
        (lhs[self.axis] as i64 - rhs[self.axis] as i64).unsigned_abs()
    }

    /// Strictly closer than `threshold`.
    #[inline]
    pub fn within(self, lhs: &[i32], rhs: &[i32], threshold: f64) -> bool {
        (self.distance(lhs, rhs) as f64) < threshold
    }
}

#[test]
fn squared_euclidean_is_exact() {
    assert_eq!(squared_euclidean(&[0, 0], &[3, 4]), Distance::from_u64(25));
    assert_eq!(squared_euclidean(&[1950, 20], &[1950, 20]), Distance::ZERO);
    assert_eq!(
        squared_euclidean(&[i32::MIN], &[i32::MAX]),
        Distance::from_u64(u32::MAX as u64 * u32::MAX as u64)
    );
    assert_eq!(
        squared_euclidean(&[i32::MIN, i32::MIN], &[i32::MAX, i32::MAX]),
        Distance::INFINITY
    );
}

#[test]
fn distance_sum() {
    let total: Distance = [3, 4, 5].into_iter().map(Distance::from_u64).sum();
    assert_eq!(total, Distance::from_u64(12));
    assert_eq!(f64::from(total), 12.0);
    assert_eq!(
        Distance::INFINITY + Distance::from_u64(1),
        Distance::INFINITY
    );
}

#[test]
fn canopy_metric_threshold_is_strict() {
    let metric = CanopyMetric::new(1);
    assert_eq!(metric.distance(&[1950, 0], &[1990, 10]), 10);
    assert!(!metric.within(&[1950, 0], &[1990, 10], 10.0));
    assert!(metric.within(&[1950, 0], &[1990, 9], 10.0));
    assert!(metric.within(&[0, -9], &[0, 0], 10.0));
}
