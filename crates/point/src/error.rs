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

use std::path::PathBuf;
use thiserror::Error;

/// Syntax errors of the text form `f0,f1,...` of a point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointSyntaxError {
    #[error("missing `{0}` delimiter")]
    MissingDelimiter(char),
    #[error("`{0}` is not a 32-bit integer")]
    InvalidInteger(String),
    #[error("expected {expected} features, found {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Input files that cannot be read or parsed.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed point at `{}` line {line}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: PointSyntaxError,
    },
    #[error("`{}` contains no points", path.display())]
    Empty { path: PathBuf },
    #[error("failed to load partition {partition}")]
    Partition {
        partition: usize,
        #[source]
        source: Box<DataLoadError>,
    },
}

impl DataLoadError {
    pub fn in_partition(self, partition: usize) -> Self {
        Self::Partition {
            partition,
            source: Box::new(self),
        }
    }
}

/// Binary payloads that do not decode to a point vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    #[error("payload of {len} bytes is not a whole number of {record_size}-byte records")]
    Truncated { len: usize, record_size: usize },
    #[error("record {index} has negative count {count}")]
    NegativeCount { index: usize, count: i32 },
    #[error("slot {slot} does not fit in a 32-bit field")]
    Overflow { slot: usize },
}
