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

use crate::{ClusteringOptions, Error};
use distance::{Distance, squared_euclidean};
use executor::{Executor, PartitionManifest};
use point::PointVector;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    BroadcastAndRun,
    Converged,
    MaxIterations,
    ErrorAbort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The centroids moved less than the convergence threshold in the last
    /// round.
    Converged,
    /// The iteration cap was reached first.
    MaxIterations,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub centroids: PointVector,
    pub rounds: usize,
    /// Total error of every round, in order.
    pub errors: Vec<u64>,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Sum over slots of the squared distance each centroid moved.
pub fn total_error(old: &PointVector, new: &PointVector) -> Distance {
    assert_eq!(old.len(), new.len());
    old.iter()
        .zip(new.iter())
        .map(|(old, new)| squared_euclidean(old.features(), new.features()))
        .sum()
}

/// Drives rounds on an executor until the centroids stop moving.
pub struct IterationController<E> {
    executor: E,
    convergence_threshold: f64,
    max_iterations: Option<u32>,
    state: State,
}

impl<E: Executor> IterationController<E> {
    pub fn new(executor: E, options: &ClusteringOptions) -> Self {
        Self {
            executor,
            convergence_threshold: options.convergence_threshold,
            max_iterations: options.max_iterations,
            state: State::Init,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Runs the loop from `seeds` to a terminal state. The executor is closed
    /// afterwards whatever the outcome.
    pub fn run(
        &mut self,
        seeds: PointVector,
        manifest: &PartitionManifest,
    ) -> Result<RunReport, Error> {
        let result = self.drive(seeds, manifest);
        self.state = match &result {
            Ok(report) => match report.outcome {
                Outcome::Converged => State::Converged,
                Outcome::MaxIterations => State::MaxIterations,
            },
            Err(e) => {
                tracing::error!(
                    error = e as &(dyn std::error::Error + 'static),
                    "run aborted"
                );
                State::ErrorAbort
            }
        };
        self.executor.close();
        result
    }

    fn drive(
        &mut self,
        seeds: PointVector,
        manifest: &PartitionManifest,
    ) -> Result<RunReport, Error> {
        let start = Instant::now();
        self.state = State::Init;
        if seeds.is_empty() {
            return Err(Error::Protocol {
                iteration: 0,
                source: k_means::Error::EmptyInput,
            });
        }
        self.executor
            .configure_maps(manifest)
            .map_err(Error::Configure)?;
        tracing::info!(
            centroids = seeds.len(),
            dims = seeds.dims(),
            partitions = manifest.len(),
            "run started"
        );
        let mut centroids = seeds;
        let mut errors = Vec::new();
        let outcome = loop {
            let iteration = errors.len() + 1;
            self.state = State::BroadcastAndRun;
            let failed = |source| Error::Round { iteration, source };
            self.executor
                .broadcast_and_run(&centroids)
                .map_err(failed)?
                .wait_until_done()
                .map_err(failed)?;
            let next = self.executor.aggregated_result().map_err(failed)?;
            if next.len() != centroids.len() {
                return Err(Error::Protocol {
                    iteration,
                    source: k_means::Error::ProtocolViolation {
                        what: "centroids",
                        expected: centroids.len(),
                        actual: next.len(),
                    },
                });
            }
            if next.dims() != centroids.dims() {
                return Err(Error::Protocol {
                    iteration,
                    source: k_means::Error::DimensionMismatch {
                        expected: centroids.dims(),
                        actual: next.dims(),
                    },
                });
            }
            let error = total_error(&centroids, &next);
            tracing::info!(iteration, total_error = error.to_u64(), "round complete");
            errors.push(error.to_u64());
            centroids = next;
            if error.to_f64() < self.convergence_threshold {
                break Outcome::Converged;
            }
            if self
                .max_iterations
                .is_some_and(|max| iteration >= max as usize)
            {
                tracing::warn!(iteration, "stopped without converging");
                break Outcome::MaxIterations;
            }
        };
        Ok(RunReport {
            centroids,
            rounds: errors.len(),
            errors,
            outcome,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor::{ExecutorError, Monitor};
    use point::DataPoint;
    use std::collections::VecDeque;

    fn points(points: &[[i32; 2]]) -> PointVector {
        PointVector::from_points(
            2,
            points.iter().map(|x| DataPoint::new(x.to_vec())).collect(),
        )
    }

    /// Replays scripted round results.
    #[derive(Default)]
    struct Scripted {
        rounds: VecDeque<Result<PointVector, ExecutorError>>,
        broadcasts: Vec<PointVector>,
        pending: Option<PointVector>,
        configured: bool,
        closed: bool,
    }

    impl Scripted {
        fn new(rounds: impl IntoIterator<Item = Result<PointVector, ExecutorError>>) -> Self {
            Self {
                rounds: rounds.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl Executor for Scripted {
        fn configure_maps(&mut self, _: &PartitionManifest) -> Result<(), ExecutorError> {
            self.configured = true;
            Ok(())
        }
        fn broadcast_and_run(&mut self, centroids: &PointVector) -> Result<Monitor, ExecutorError> {
            assert!(self.configured);
            self.broadcasts.push(centroids.clone());
            let round = self.rounds.pop_front().expect("unscripted round");
            Ok(Monitor::completed(round.map(|x| {
                self.pending = Some(x);
            })))
        }
        fn aggregated_result(&mut self) -> Result<PointVector, ExecutorError> {
            self.pending.take().ok_or(ExecutorError::NoResult)
        }
        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn manifest() -> PartitionManifest {
        PartitionManifest::from_paths(vec!["part-0".into()])
    }

    #[test]
    fn total_error_sums_slots() {
        let old = points(&[[0, 0], [10, 10]]);
        let new = points(&[[1, 2], [10, 13]]);
        assert_eq!(total_error(&old, &new), Distance::from_u64(5 + 9));
        assert_eq!(total_error(&old, &old), Distance::ZERO);
    }

    #[test]
    fn zero_movement_converges() {
        let seeds = points(&[[0, 0], [10, 10]]);
        let mut controller = IterationController::new(
            Scripted::new([Ok(seeds.clone())]),
            &ClusteringOptions::default(),
        );
        let report = controller.run(seeds.clone(), &manifest()).unwrap();
        assert_eq!(report.outcome, Outcome::Converged);
        assert_eq!(report.rounds, 1);
        assert_eq!(report.errors, vec![0]);
        assert_eq!(report.centroids, seeds);
        assert_eq!(controller.state(), State::Converged);
        assert!(controller.executor().closed);
    }

    #[test]
    fn adopts_new_centroids_until_converged() {
        let seeds = points(&[[0, 0], [10, 10]]);
        let moved = points(&[[3, 3], [13, 13]]);
        let mut controller = IterationController::new(
            Scripted::new([Ok(moved.clone()), Ok(moved.clone())]),
            &ClusteringOptions::default(),
        );
        let report = controller.run(seeds.clone(), &manifest()).unwrap();
        assert_eq!(report.rounds, 2);
        assert_eq!(report.errors, vec![36, 0]);
        assert_eq!(report.centroids, moved);
        assert_eq!(controller.executor().broadcasts, vec![seeds, moved]);
    }

    #[test]
    fn error_equal_to_threshold_does_not_converge() {
        let moved = points(&[[1, 0]]);
        let mut controller = IterationController::new(
            Scripted::new([Ok(moved.clone()), Ok(moved.clone())]),
            &ClusteringOptions::default(),
        );
        let report = controller.run(points(&[[0, 0]]), &manifest()).unwrap();
        assert_eq!(report.outcome, Outcome::Converged);
        assert_eq!(report.rounds, 2);
        assert_eq!(report.errors, vec![1, 0]);
        assert_eq!(report.centroids, moved);
    }

    #[test]
    fn max_iterations_stops_the_loop() {
        let options = ClusteringOptions {
            max_iterations: Some(2),
            ..Default::default()
        };
        let mut controller = IterationController::new(
            Scripted::new([
                Ok(points(&[[1, 1]])),
                Ok(points(&[[2, 2]])),
                Ok(points(&[[3, 3]])),
            ]),
            &options,
        );
        let report = controller.run(points(&[[0, 0]]), &manifest()).unwrap();
        assert_eq!(report.outcome, Outcome::MaxIterations);
        assert_eq!(report.rounds, 2);
        assert_eq!(report.centroids, points(&[[2, 2]]));
        assert_eq!(controller.state(), State::MaxIterations);
    }

    #[test]
    fn worker_failure_aborts() {
        let mut controller = IterationController::new(
            Scripted::new([
                Ok(points(&[[1, 1]])),
                Err(ExecutorError::Partition {
                    partition: 3,
                    source: k_means::Error::EmptyInput,
                }),
            ]),
            &ClusteringOptions::default(),
        );
        let e = controller.run(points(&[[0, 0]]), &manifest()).unwrap_err();
        assert_eq!(e.iteration(), Some(2));
        assert!(matches!(
            e,
            Error::Round {
                source: ExecutorError::Partition { partition: 3, .. },
                ..
            }
        ));
        assert_eq!(controller.state(), State::ErrorAbort);
        assert!(controller.executor().closed);
    }

    #[test]
    fn centroid_count_is_fixed() {
        let mut controller = IterationController::new(
            Scripted::new([Ok(points(&[[1, 1]]))]),
            &ClusteringOptions::default(),
        );
        let e = controller
            .run(points(&[[0, 0], [5, 5]]), &manifest())
            .unwrap_err();
        assert!(matches!(
            e,
            Error::Protocol {
                iteration: 1,
                source: k_means::Error::ProtocolViolation {
                    expected: 2,
                    actual: 1,
                    ..
                }
            }
        ));
    }

    #[test]
    fn no_seeds() {
        let mut controller =
            IterationController::new(Scripted::new([]), &ClusteringOptions::default());
        let e = controller.run(PointVector::new(2), &manifest()).unwrap_err();
        assert!(matches!(
            e,
            Error::Protocol {
                source: k_means::Error::EmptyInput,
                ..
            }
        ));
        assert!(controller.executor().broadcasts.is_empty());
    }
}
