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

use crate::{Error, ResultSink};
use point::PointVector;

/// Holds the single aggregated result of the latest round.
#[derive(Debug, Default)]
pub struct SingleResultSink {
    last: Option<PointVector>,
}

impl SingleResultSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for SingleResultSink {
    fn capture(&mut self, mut results: Vec<PointVector>) -> Result<(), Error> {
        if results.len() != 1 {
            return Err(Error::ProtocolViolation {
                what: "aggregated results per round",
                expected: 1,
                actual: results.len(),
            });
        }
        self.last = results.pop();
        Ok(())
    }

    fn result(&self) -> Option<&PointVector> {
        self.last.as_ref()
    }

    fn take(&mut self) -> Option<PointVector> {
        self.last.take()
    }
}
