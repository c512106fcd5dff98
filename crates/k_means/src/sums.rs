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

use point::{DataPoint, PointVector, SerializationError};

/// Per-slot feature sums and counts, in 64-bit so that partition-local and
/// merged sums do not overflow the 32-bit wire fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sums {
    d: usize,
    p: Vec<i64>,
    count: Vec<i64>,
    skipped: usize,
}

impl Sums {
    pub fn from_zeros(d: usize, c: usize) -> Self {
        Self {
            d,
            p: vec![0; d * c],
            count: vec![0; c],
            skipped: 0,
        }
    }
    #[inline]
    pub fn d(&self) -> usize {
        self.d
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.count.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count.is_empty()
    }
    #[inline]
    pub fn count(&self, slot: usize) -> i64 {
        self.count[slot]
    }
    /// Points that contributed to no slot.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
    pub fn add(&mut self, slot: usize, sample: &[i32]) {
        assert_eq!(sample.len(), self.d);
        for (sum, &x) in self[slot].iter_mut().zip(sample) {
            *sum += x as i64;
        }
        self.count[slot] += 1;
    }
    /// Adds an aggregate that already carries sums and a count.
    pub fn add_aggregate(&mut self, slot: usize, aggregate: &DataPoint) {
        assert_eq!(aggregate.dims(), self.d);
        for (sum, &x) in self[slot].iter_mut().zip(aggregate.features()) {
            *sum += x as i64;
        }
        self.count[slot] += aggregate.count() as i64;
    }
    pub fn skip(&mut self) {
        self.skipped += 1;
    }
    pub fn merge(&mut self, other: &Sums) {
        assert_eq!(self.d, other.d);
        assert_eq!(self.len(), other.len());
        for (x, y) in self.p.iter_mut().zip(other.p.iter()) {
            *x += y;
        }
        for (x, y) in self.count.iter_mut().zip(other.count.iter()) {
            *x += y;
        }
        self.skipped += other.skipped;
    }
    /// Narrows to a partial aggregate with 32-bit fields.
    pub fn into_partial(self) -> Result<PointVector, SerializationError> {
        let mut result = PointVector::with_capacity(self.d, self.len());
        for slot in 0..self.len() {
            let overflow = SerializationError::Overflow { slot };
            let features = self[slot]
                .iter()
                .map(|&x| i32::try_from(x).map_err(|_| overflow.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            let count = i32::try_from(self.count[slot]).map_err(|_| overflow)?;
            result.push(DataPoint::with_count(features, count));
        }
        Ok(result)
    }
}

impl std::ops::Index<usize> for Sums {
    type Output = [i64];

    fn index(&self, index: usize) -> &Self::Output {
        &self.p[self.d * index..][..self.d]
    }
}

impl std::ops::IndexMut<usize> for Sums {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.p[self.d * index..][..self.d]
    }
}

#[test]
fn add_and_merge() {
    let mut a = Sums::from_zeros(2, 3);
    a.add(0, &[1, 2]);
    a.add(0, &[3, 4]);
    a.skip();
    let mut b = Sums::from_zeros(2, 3);
    b.add(2, &[-5, 5]);
    b.add_aggregate(0, &DataPoint::with_count(vec![10, 10], 2));
    a.merge(&b);
    assert_eq!(&a[0], &[14, 16]);
    assert_eq!(a.count(0), 4);
    assert_eq!(&a[1], &[0, 0]);
    assert_eq!(a.count(1), 0);
    assert_eq!(&a[2], &[-5, 5]);
    assert_eq!(a.skipped(), 1);
    let partial = a.into_partial().unwrap();
    assert_eq!(partial[0], DataPoint::with_count(vec![14, 16], 4));
    assert_eq!(partial[1], DataPoint::with_count(vec![0, 0], 0));
}

#[test]
fn narrowing_overflow() {
    let mut sums = Sums::from_zeros(1, 2);
    sums.add(1, &[i32::MAX]);
    sums.add(1, &[1]);
    assert_eq!(
        sums.into_partial(),
        Err(SerializationError::Overflow { slot: 1 })
    );
}
