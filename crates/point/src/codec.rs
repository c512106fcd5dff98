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

use crate::{DataPoint, PointVector, SerializationError};
use zerocopy::byteorder::big_endian::I32;
use zerocopy::{FromBytes, IntoBytes};

pub const FIELD_SIZE: usize = size_of::<I32>();

/// Bytes taken by one point of `dims` features: the features, then the count.
pub const fn record_size(dims: usize) -> usize {
    (dims + 1) * FIELD_SIZE
}

impl DataPoint {
    pub fn encode_into(&self, buffer: &mut Vec<u8>) {
        for &x in self.features.iter() {
            buffer.extend_from_slice(I32::new(x).as_bytes());
        }
        buffer.extend_from_slice(I32::new(self.count).as_bytes());
    }
}

impl PointVector {
    /// Records are concatenated without framing. The element count is implied
    /// by the payload length.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.len() * record_size(self.dims));
        for point in self.points.iter() {
            point.encode_into(&mut buffer);
        }
        buffer
    }

    pub fn decode(dims: usize, bytes: &[u8]) -> Result<Self, SerializationError> {
        let record_size = record_size(dims);
        let truncated = SerializationError::Truncated {
            len: bytes.len(),
            record_size,
        };
        if bytes.len() % record_size != 0 {
            return Err(truncated);
        }
        let fields = <[I32]>::ref_from_bytes(bytes).map_err(|_| truncated)?;
        let mut result = PointVector::with_capacity(dims, fields.len() / (dims + 1));
        for (index, record) in fields.chunks_exact(dims + 1).enumerate() {
            let count = record[dims].get();
            if count < 0 {
                return Err(SerializationError::NegativeCount { index, count });
            }
            result.points.push(DataPoint {
                features: record[..dims].iter().map(|x| x.get()).collect(),
                count,
            });
        }
        Ok(result)
    }
}

#[test]
fn reference_layout() {
    let vector = PointVector::from_points(
        2,
        vec![
            DataPoint::new(vec![1950, -2]),
            DataPoint::with_count(vec![7, 8], 3),
        ],
    );
    let bytes = vector.encode();
    assert_eq!(bytes.len(), 2 * 12);
    assert_eq!(
        bytes,
        [
            0x00, 0x00, 0x07, 0x9e, 0xff, 0xff, 0xff, 0xfe, 0x00, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x03,
        ]
    );
    assert_eq!(PointVector::decode(2, &bytes), Ok(vector));
}

#[test]
fn decode_is_inverse_of_encode() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let dims = rng.random_range(1..8);
        let len = rng.random_range(0..50);
        let mut vector = PointVector::with_capacity(dims, len);
        for _ in 0..len {
            let features = (0..dims).map(|_| rng.random()).collect();
            let count = rng.random_range(0..=i32::MAX);
            vector.push(DataPoint::with_count(features, count));
        }
        let bytes = vector.encode();
        assert_eq!(bytes.len(), len * record_size(dims));
        assert_eq!(PointVector::decode(dims, &bytes), Ok(vector));
    }
}

#[test]
fn empty_payload_is_empty_vector() {
    let vector = PointVector::decode(2, &[]).unwrap();
    assert!(vector.is_empty());
    assert_eq!(vector.dims(), 2);
}

#[test]
fn truncated_payload_is_rejected() {
    let vector = PointVector::from_points(
        2,
        vec![DataPoint::new(vec![1, 2]), DataPoint::new(vec![3, 4])],
    );
    let bytes = vector.encode();
    for cut in [1, 4, 11] {
        let len = bytes.len() - cut;
        assert_eq!(
            PointVector::decode(2, &bytes[..len]),
            Err(SerializationError::Truncated {
                len,
                record_size: 12
            })
        );
    }
    // 24 bytes are whole records for 2 features but not for 3
    assert!(matches!(
        PointVector::decode(3, &bytes),
        Err(SerializationError::Truncated { .. })
    ));
}

#[test]
fn negative_count_is_rejected() {
    let mut bytes = PointVector::from_points(2, vec![DataPoint::new(vec![1, 2])]).encode();
    bytes[8..12].copy_from_slice(&(-1i32).to_be_bytes());
    assert_eq!(
        PointVector::decode(2, &bytes),
        Err(SerializationError::NegativeCount {
            index: 0,
            count: -1
        })
    );
}
