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

use crate::ConfigError;
use executor::ExecutorError;
use point::DataLoadError;
use thiserror::Error;

/// Failure of a clustering run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] DataLoadError),
    #[error("failed to configure partitions")]
    Configure(#[source] ExecutorError),
    #[error("round {iteration} failed")]
    Round {
        iteration: usize,
        #[source]
        source: ExecutorError,
    },
    #[error("round {iteration} failed")]
    Protocol {
        iteration: usize,
        #[source]
        source: k_means::Error,
    },
}

impl Error {
    /// The round in which the run failed, if it got that far.
    pub fn iteration(&self) -> Option<usize> {
        match self {
            Error::Round { iteration, .. } | Error::Protocol { iteration, .. } => Some(*iteration),
            _ => None,
        }
    }
}

#[test]
fn every_cause_is_reported_once() {
    let e = Error::Round {
        iteration: 2,
        source: ExecutorError::Partition {
            partition: 1,
            source: k_means::Error::Load(
                DataLoadError::Empty {
                    path: "part-1.txt".into(),
                }
                .in_partition(1),
            ),
        },
    };
    let mut chain = Vec::new();
    let mut cause: Option<&dyn std::error::Error> = Some(&e);
    while let Some(x) = cause {
        chain.push(x.to_string());
        cause = x.source();
    }
    assert_eq!(
        chain,
        [
            "round 2 failed",
            "partition 1 failed",
            "failed to load partition 1",
            "`part-1.txt` contains no points",
        ]
    );
}
