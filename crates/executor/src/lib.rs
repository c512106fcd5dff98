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

mod local;
mod manifest;

pub use local::{Done, LocalExecutor};
pub use manifest::PartitionManifest;

use crossbeam_channel::Receiver;
use point::{DataLoadError, PointVector, SerializationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("partition {partition} failed")]
    Partition {
        partition: usize,
        #[source]
        source: k_means::Error,
    },
    #[error("aggregation failed")]
    Aggregate(#[source] k_means::Error),
    #[error("unreadable partition manifest")]
    Manifest(#[from] DataLoadError),
    #[error("corrupt payload")]
    Payload(#[from] SerializationError),
    #[error("expected {expected} partitions, the manifest lists {actual}")]
    PartitionCount { expected: usize, actual: usize },
    #[error("executor is not configured")]
    NotConfigured,
    #[error("no centroid set has been broadcast")]
    NothingBroadcast,
    #[error("no aggregated result is available")]
    NoResult,
    #[error("round was abandoned before completion")]
    Disconnected,
    #[error("executor is closed")]
    Closed,
}

/// Handle on a running round.
#[derive(Debug)]
pub struct Monitor {
    rx: Receiver<Result<(), ExecutorError>>,
}

impl Monitor {
    pub fn new(rx: Receiver<Result<(), ExecutorError>>) -> Self {
        Self { rx }
    }

    /// A monitor for a round that has already finished.
    pub fn completed(result: Result<(), ExecutorError>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let _ = tx.send(result);
        Self { rx }
    }

    /// Blocks until every worker and the aggregator are done.
    pub fn wait_until_done(self) -> Result<(), ExecutorError> {
        self.rx.recv().map_err(|_| ExecutorError::Disconnected)?
    }
}

/// The distributed-execution collaborator driven by the iteration loop.
///
/// Scheduling, transport and fault handling are the executor's business; a
/// round either completes with one aggregated result or fails.
pub trait Executor {
    /// Fixes the partitioning for the rest of the run.
    fn configure_maps(&mut self, manifest: &PartitionManifest) -> Result<(), ExecutorError>;

    /// Broadcasts `centroids` to every partition and starts a round.
    fn broadcast_and_run(&mut self, centroids: &PointVector) -> Result<Monitor, ExecutorError>;

    /// The centroid set produced by the last completed round.
    fn aggregated_result(&mut self) -> Result<PointVector, ExecutorError>;

    fn close(&mut self);
}

#[test]
fn completed_monitor() {
    assert!(Monitor::completed(Ok(())).wait_until_done().is_ok());
    assert!(matches!(
        Monitor::completed(Err(ExecutorError::NoResult)).wait_until_done(),
        Err(ExecutorError::NoResult)
    ));
    let (tx, rx) = crossbeam_channel::bounded(1);
    drop(tx);
    assert!(matches!(
        Monitor::new(rx).wait_until_done(),
        Err(ExecutorError::Disconnected)
    ));
}
