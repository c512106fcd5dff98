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

use crate::{Executor, ExecutorError, Monitor, PartitionManifest};
use k_means::{
    Aggregator, AssignOptions, MeanAggregator, PartitionWorker, ResultSink, SingleResultSink,
};
use point::PointVector;
use rayon::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};

/// Completion of the map phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Done {
    pub round: usize,
    pub partitions: usize,
}

#[derive(Debug, Clone)]
struct Broadcast {
    dims: usize,
    payload: Arc<[u8]>,
}

/// Everything one round needs, detached from the executor so that it can run
/// on the pool.
#[derive(Clone)]
struct Round {
    round: usize,
    workers: Arc<Vec<PartitionWorker>>,
    aggregator: Arc<dyn Aggregator>,
    sink: Arc<Mutex<SingleResultSink>>,
    broadcast: Broadcast,
}

impl Round {
    /// Every worker decodes its own copy of the broadcast and sends back an
    /// encoded partial aggregate. Payloads are in partition order.
    fn map(&self) -> Result<Vec<Vec<u8>>, ExecutorError> {
        let Broadcast { dims, payload } = &self.broadcast;
        self.workers
            .par_iter()
            .map(|worker| {
                let partition = worker.id();
                let failed = |source| ExecutorError::Partition { partition, source };
                let centroids = PointVector::decode(*dims, payload).map_err(|e| failed(e.into()))?;
                let partial = worker.assign(&centroids).map_err(failed)?;
                Ok(partial.encode())
            })
            .collect()
    }

    fn collect(&self, payloads: Vec<Vec<u8>>) -> Result<Vec<PointVector>, ExecutorError> {
        let dims = self.broadcast.dims;
        payloads
            .into_iter()
            .map(|payload| Ok(PointVector::decode(dims, &payload)?))
            .collect()
    }

    fn reduce(&self, partials: Vec<PointVector>) -> Result<(), ExecutorError> {
        let dims = self.broadcast.dims;
        let centroids = PointVector::decode(dims, &self.broadcast.payload)?;
        let merged = self
            .aggregator
            .merge(&centroids, &partials)
            .map_err(ExecutorError::Aggregate)?;
        let output = PointVector::decode(dims, &merged.encode())?;
        lock(&self.sink)
            .capture(vec![output])
            .map_err(ExecutorError::Aggregate)
    }

    fn execute(&self) -> Result<(), ExecutorError> {
        let payloads = self.map()?;
        let partials = self.collect(payloads)?;
        self.reduce(partials)?;
        tracing::debug!(round = self.round, "round complete");
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Runs all partition workers of a run inside this process, on one rayon
/// pool. Broadcasts and partial results still travel as encoded payloads.
pub struct LocalExecutor {
    options: AssignOptions,
    num_partitions: usize,
    pool: Arc<rayon::ThreadPool>,
    workers: Option<Arc<Vec<PartitionWorker>>>,
    aggregator: Arc<dyn Aggregator>,
    sink: Arc<Mutex<SingleResultSink>>,
    broadcast: Option<Broadcast>,
    pending: Option<Vec<Vec<u8>>>,
    round: usize,
    closed: bool,
}

impl LocalExecutor {
    pub fn new(options: AssignOptions, num_partitions: usize, num_threads: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("partition-worker-{i}"))
            .build()
            .expect("failed to build thread pool");
        Self {
            options,
            num_partitions,
            pool: Arc::new(pool),
            workers: None,
            aggregator: Arc::new(MeanAggregator),
            sink: Arc::new(Mutex::new(SingleResultSink::new())),
            broadcast: None,
            pending: None,
            round: 0,
            closed: false,
        }
    }

    /// Installs workers that were built in memory instead of from a manifest.
    pub fn configure_workers(
        &mut self,
        workers: Vec<PartitionWorker>,
    ) -> Result<(), ExecutorError> {
        if self.closed {
            return Err(ExecutorError::Closed);
        }
        if workers.len() != self.num_partitions {
            return Err(ExecutorError::PartitionCount {
                expected: self.num_partitions,
                actual: workers.len(),
            });
        }
        tracing::info!(
            partitions = workers.len(),
            points = workers.iter().map(PartitionWorker::len).sum::<usize>(),
            "partitions configured"
        );
        self.workers = Some(Arc::new(workers));
        Ok(())
    }

    /// Fixes the centroid set every worker reads in the next round.
    pub fn broadcast(&mut self, centroids: &PointVector) -> Result<(), ExecutorError> {
        if self.closed {
            return Err(ExecutorError::Closed);
        }
        self.round += 1;
        self.pending = None;
        self.broadcast = Some(Broadcast {
            dims: centroids.dims(),
            payload: centroids.encode().into(),
        });
        Ok(())
    }

    /// Runs the map phase of the round on the pool and waits for it.
    pub fn run_round(&mut self) -> Result<Done, ExecutorError> {
        let round = self.prepare()?;
        let payloads = self.pool.install(|| round.map())?;
        let done = Done {
            round: round.round,
            partitions: payloads.len(),
        };
        self.pending = Some(payloads);
        Ok(done)
    }

    /// The partial aggregates of the last [`run_round`](Self::run_round), in
    /// partition order.
    pub fn collect_partial_results(&mut self) -> Result<Vec<PointVector>, ExecutorError> {
        let round = self.prepare()?;
        let payloads = self.pending.take().ok_or(ExecutorError::NoResult)?;
        round.collect(payloads)
    }

    /// Merges partial aggregates and hands the result to the sink.
    pub fn aggregate(&mut self, partials: Vec<PointVector>) -> Result<(), ExecutorError> {
        let round = self.prepare()?;
        self.pool.install(|| round.reduce(partials))
    }

    pub fn rounds(&self) -> usize {
        self.round
    }

    fn prepare(&self) -> Result<Round, ExecutorError> {
        if self.closed {
            return Err(ExecutorError::Closed);
        }
        let workers = self.workers.clone().ok_or(ExecutorError::NotConfigured)?;
        let broadcast = self
            .broadcast
            .clone()
            .ok_or(ExecutorError::NothingBroadcast)?;
        Ok(Round {
            round: self.round,
            workers,
            aggregator: self.aggregator.clone(),
            sink: self.sink.clone(),
            broadcast,
        })
    }
}

impl Executor for LocalExecutor {
    fn configure_maps(&mut self, manifest: &PartitionManifest) -> Result<(), ExecutorError> {
        if self.closed {
            return Err(ExecutorError::Closed);
        }
        if manifest.len() != self.num_partitions {
            return Err(ExecutorError::PartitionCount {
                expected: self.num_partitions,
                actual: manifest.len(),
            });
        }
        let options = &self.options;
        let workers = self.pool.install(|| {
            manifest
                .as_slice()
                .par_iter()
                .enumerate()
                .map(|(partition, path)| {
                    PartitionWorker::configure(partition, path, options)
                        .map_err(|source| ExecutorError::Partition { partition, source })
                })
                .collect::<Result<Vec<_>, _>>()
        })?;
        self.configure_workers(workers)
    }

    fn broadcast_and_run(&mut self, centroids: &PointVector) -> Result<Monitor, ExecutorError> {
        self.broadcast(centroids)?;
        let round = self.prepare()?;
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.pool.spawn(move || {
            let _ = tx.send(round.execute());
        });
        Ok(Monitor::new(rx))
    }

    fn aggregated_result(&mut self) -> Result<PointVector, ExecutorError> {
        if self.closed {
            return Err(ExecutorError::Closed);
        }
        lock(&self.sink).take().ok_or(ExecutorError::NoResult)
    }

    fn close(&mut self) {
        if !self.closed {
            tracing::debug!(rounds = self.round, "executor closed");
        }
        self.closed = true;
        self.workers = None;
        self.broadcast = None;
        self.pending = None;
    }
}

impl Drop for LocalExecutor {
    fn drop(&mut self) {
        self.close();
    }
}
