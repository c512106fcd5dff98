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

use point::DataLoadError;
use std::path::{Path, PathBuf};

/// The partition data files of a run, one worker each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionManifest {
    partitions: Vec<PathBuf>,
}

impl PartitionManifest {
    pub fn from_paths(partitions: Vec<PathBuf>) -> Self {
        Self { partitions }
    }

    /// One path per line; blank lines and `#` comments are skipped. Relative
    /// paths are taken relative to the manifest.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        let partitions = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| base.join(line))
            .collect::<Vec<_>>();
        if partitions.is_empty() {
            return Err(DataLoadError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(Self { partitions })
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.partitions.iter()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partitions.txt");
        std::fs::write(&path, "# two partitions\ndata/part_0\n\n  /abs/part_1  \n").unwrap();
        let manifest = PartitionManifest::read(&path).unwrap();
        assert_eq!(
            manifest.as_slice(),
            &[
                dir.path().join("data/part_0"),
                PathBuf::from("/abs/part_1"),
            ]
        );
    }

    #[test]
    fn empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partitions.txt");
        std::fs::write(&path, "# nothing\n").unwrap();
        assert!(matches!(
            PartitionManifest::read(&path),
            Err(DataLoadError::Empty { .. })
        ));
    }
}
