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

mod codec;
mod error;
mod text;

pub use codec::{FIELD_SIZE, record_size};
pub use error::{DataLoadError, PointSyntaxError, SerializationError};
pub use text::{read_pairs, read_points, write_points};

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A single observation, or an aggregate of observations.
///
/// `count` is `0` for an individual observation. Aggregates carry the number of
/// observations summed into `features`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataPoint {
    features: Vec<i32>,
    count: i32,
}

impl DataPoint {
    pub fn new(features: Vec<i32>) -> Self {
        Self::with_count(features, 0)
    }
    pub fn with_count(features: Vec<i32>, count: i32) -> Self {
        assert!(!features.is_empty(), "a point has at least one feature");
        Self { features, count }
    }
    pub fn zeros(dims: usize) -> Self {
        Self::new(vec![0; dims])
    }
    #[inline]
    pub fn dims(&self) -> usize {
        self.features.len()
    }
    #[inline]
    pub fn features(&self) -> &[i32] {
        &self.features
    }
    #[inline]
    pub fn count(&self) -> i32 {
        self.count
    }
    pub fn is_observation(&self) -> bool {
        self.count == 0
    }
}

impl Display for DataPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, x) in self.features.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{x}")?;
        }
        Ok(())
    }
}

impl FromStr for DataPoint {
    type Err = PointSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        text::parse_point(s)
    }
}

/// An ordered collection of points sharing one dimensionality.
///
/// The position of a point is meaningful: when a `PointVector` is used as a
/// centroid set or as a partial aggregate, slot `i` always refers to centroid
/// `i`, on every worker and in every round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointVector {
    dims: usize,
    points: Vec<DataPoint>,
}

impl PointVector {
    pub fn new(dims: usize) -> Self {
        Self::with_capacity(dims, 0)
    }
    pub fn with_capacity(dims: usize, len: usize) -> Self {
        assert!(dims > 0, "a point vector has at least one dimension");
        Self {
            dims,
            points: Vec::with_capacity(len),
        }
    }
    /// `len` aggregates with zero sums and zero counts.
    pub fn zeros(dims: usize, len: usize) -> Self {
        let mut result = Self::with_capacity(dims, len);
        result.points.resize(len, DataPoint::zeros(dims));
        result
    }
    pub fn from_points(dims: usize, points: Vec<DataPoint>) -> Self {
        let mut result = Self::with_capacity(dims, points.len());
        for point in points {
            result.push(point);
        }
        result
    }
    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    pub fn push(&mut self, point: DataPoint) {
        assert_eq!(point.dims(), self.dims);
        self.points.push(point);
    }
    pub fn get(&self, index: usize) -> Option<&DataPoint> {
        self.points.get(index)
    }
    pub fn iter(&self) -> std::slice::Iter<'_, DataPoint> {
        self.points.iter()
    }
    pub fn as_slice(&self) -> &[DataPoint] {
        &self.points
    }
    /// Position of the first point equal to `features`.
    pub fn position(&self, features: &[i32]) -> Option<usize> {
        self.points.iter().position(|x| x.features() == features)
    }
}

impl std::ops::Index<usize> for PointVector {
    type Output = DataPoint;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a PointVector {
    type Item = &'a DataPoint;

    type IntoIter = std::slice::Iter<'a, DataPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl IntoIterator for PointVector {
    type Item = DataPoint;

    type IntoIter = std::vec::IntoIter<DataPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl Display for PointVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (i, point) in self.points.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "[{point}]")?;
        }
        f.write_str("]")
    }
}

#[test]
fn display_is_text_form() {
    let point = DataPoint::new(vec![1950, -3]);
    assert_eq!(point.to_string(), "1950,-3");
    assert_eq!(point.to_string().parse::<DataPoint>(), Ok(point.clone()));
    let vector = PointVector::from_points(2, vec![point, DataPoint::new(vec![0, 7])]);
    assert_eq!(vector.to_string(), "[[1950,-3] [0,7]]");
}

#[test]
fn position_finds_first_match() {
    let vector = PointVector::from_points(
        2,
        vec![
            DataPoint::new(vec![1, 2]),
            DataPoint::new(vec![3, 4]),
            DataPoint::new(vec![1, 2]),
        ],
    );
    assert_eq!(vector.position(&[1, 2]), Some(0));
    assert_eq!(vector.position(&[3, 4]), Some(1));
    assert_eq!(vector.position(&[5, 6]), None);
}

#[test]
#[should_panic]
fn push_rejects_other_dimensionality() {
    let mut vector = PointVector::new(2);
    vector.push(DataPoint::new(vec![1, 2, 3]));
}
