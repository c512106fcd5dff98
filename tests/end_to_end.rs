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

#![allow(unused_crate_dependencies)]

use canopy::{ClusteringOptions, Error, Outcome};
use executor::ExecutorError;
use k_means::Variant;
use point::{DataLoadError, DataPoint, PointVector};
use std::path::{Path, PathBuf};

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Two partitions of two-dimensional points, one pair of points per seed.
fn dataset(dir: &Path, extra: &str) -> (PathBuf, PathBuf) {
    write(&dir.join("seeds.txt"), "0,0\n10,10\n20,20\n");
    write(
        &dir.join("cccenters/canopycenters.txt"),
        "0,0\n10,10\n20,20\n",
    );
    write(
        &dir.join("part-0.txt"),
        &format!("0,0\t2,2\n10,10\t12,12\n20,20\t22,22\n{extra}"),
    );
    write(&dir.join("part-1.txt"), "0,0\t4,4\n10,10\t14,14\n20,20\t24,24\n");
    write(
        &dir.join("partitions.txt"),
        "# partition files\npart-0.txt\n\npart-1.txt\n",
    );
    (dir.join("seeds.txt"), dir.join("partitions.txt"))
}

fn expected() -> PointVector {
    PointVector::from_points(
        2,
        [[3, 3], [13, 13], [23, 23]]
            .iter()
            .map(|x| DataPoint::new(x.to_vec()))
            .collect(),
    )
}

fn options() -> ClusteringOptions {
    ClusteringOptions {
        threads: 2,
        ..Default::default()
    }
}

#[test]
fn canopy_run_converges_in_two_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let (seeds, manifest) = dataset(dir.path(), "");
    let report = canopy::run(&seeds, 2, &manifest, &options()).unwrap();
    assert_eq!(report.outcome, Outcome::Converged);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.errors, vec![54, 0]);
    assert_eq!(report.centroids, expected());
}

#[test]
fn flat_run_agrees() {
    let dir = tempfile::tempdir().unwrap();
    let (seeds, manifest) = dataset(dir.path(), "");
    let options = ClusteringOptions {
        variant: Variant::Flat,
        ..options()
    };
    let report = canopy::run(&seeds, 2, &manifest, &options).unwrap();
    assert_eq!(report.rounds, 2);
    assert_eq!(report.centroids, expected());
}

#[test]
fn points_of_unknown_canopies_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (seeds, manifest) = dataset(dir.path(), "5,5\t100,100\n");
    let report = canopy::run(&seeds, 2, &manifest, &options()).unwrap();
    assert_eq!(report.centroids, expected());
}

#[test]
fn iteration_cap() {
    let dir = tempfile::tempdir().unwrap();
    let (seeds, manifest) = dataset(dir.path(), "");
    let options = ClusteringOptions {
        max_iterations: Some(1),
        ..options()
    };
    let report = canopy::run(&seeds, 2, &manifest, &options).unwrap();
    assert_eq!(report.outcome, Outcome::MaxIterations);
    assert_eq!(report.rounds, 1);
    assert_eq!(report.centroids, expected());
}

#[test]
fn partition_count_must_match_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let (seeds, manifest) = dataset(dir.path(), "");
    let e = canopy::run(&seeds, 3, &manifest, &options()).unwrap_err();
    assert!(matches!(
        e,
        Error::Configure(ExecutorError::PartitionCount {
            expected: 3,
            actual: 2
        })
    ));
}

#[test]
fn malformed_partition_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (seeds, manifest) = dataset(dir.path(), "0,0\t7;7\n");
    let e = canopy::run(&seeds, 2, &manifest, &options()).unwrap_err();
    match e {
        Error::Configure(ExecutorError::Partition {
            partition,
            source: k_means::Error::Load(DataLoadError::Partition { source, .. }),
        }) => {
            assert_eq!(partition, 0);
            assert!(matches!(*source, DataLoadError::Malformed { line: 4, .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_seeds() {
    let dir = tempfile::tempdir().unwrap();
    let (_, manifest) = dataset(dir.path(), "");
    let e = canopy::run(&dir.path().join("absent.txt"), 2, &manifest, &options()).unwrap_err();
    assert!(matches!(e, Error::Load(DataLoadError::Io { .. })));
    assert_eq!(e.iteration(), None);
}
