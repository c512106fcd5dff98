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

use crate::{DataLoadError, DataPoint, PointSyntaxError, PointVector};
use std::io::Write;
use std::path::Path;

pub(crate) fn parse_point(s: &str) -> Result<DataPoint, PointSyntaxError> {
    if !s.contains(',') {
        return Err(PointSyntaxError::MissingDelimiter(','));
    }
    let features = s
        .split(',')
        .map(|x| {
            let x = x.trim();
            x.parse::<i32>()
                .map_err(|_| PointSyntaxError::InvalidInteger(x.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DataPoint::new(features))
}

fn check_dims(dims: &mut Option<usize>, point: &DataPoint) -> Result<(), PointSyntaxError> {
    match *dims {
        None => {
            *dims = Some(point.dims());
            Ok(())
        }
        Some(expected) if expected == point.dims() => Ok(()),
        Some(expected) => Err(PointSyntaxError::DimensionMismatch {
            expected,
            actual: point.dims(),
        }),
    }
}

/// Parses every non-blank line of `path`. Line numbers in errors are 1-based.
fn parse_lines<T>(
    path: &Path,
    mut parse: impl FnMut(&str) -> Result<T, PointSyntaxError>,
) -> Result<Vec<T>, DataLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut result = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = parse(line).map_err(|source| DataLoadError::Malformed {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        result.push(item);
    }
    if result.is_empty() {
        return Err(DataLoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(result)
}

/// Reads a file of comma separated points, one per line.
pub fn read_points(path: impl AsRef<Path>) -> Result<PointVector, DataLoadError> {
    let mut dims = None;
    let points = parse_lines(path.as_ref(), |line| {
        let point = parse_point(line)?;
        check_dims(&mut dims, &point)?;
        Ok(point)
    })?;
    Ok(PointVector::from_points(points[0].dims(), points))
}

/// Reads a partition file of `canopyCenter\tdataPoint` lines.
///
/// Returns the canopy centers and the data points; the n-th canopy center
/// belongs to the n-th data point.
pub fn read_pairs(path: impl AsRef<Path>) -> Result<(PointVector, PointVector), DataLoadError> {
    let mut dims = None;
    let pairs = parse_lines(path.as_ref(), |line| {
        let (canopy, point) = line
            .split_once('\t')
            .ok_or(PointSyntaxError::MissingDelimiter('\t'))?;
        let canopy = parse_point(canopy)?;
        check_dims(&mut dims, &canopy)?;
        let point = parse_point(point)?;
        check_dims(&mut dims, &point)?;
        Ok((canopy, point))
    })?;
    let dims = pairs[0].0.dims();
    let mut canopies = PointVector::with_capacity(dims, pairs.len());
    let mut points = PointVector::with_capacity(dims, pairs.len());
    for (canopy, point) in pairs {
        canopies.push(canopy);
        points.push(point);
    }
    Ok((canopies, points))
}

/// Writes points in the text form accepted by [`read_points`].
pub fn write_points(mut writer: impl Write, points: &PointVector) -> std::io::Result<()> {
    for point in points {
        writeln!(writer, "{point}")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_point_errors() {
        assert_eq!(
            parse_point("1950"),
            Err(PointSyntaxError::MissingDelimiter(','))
        );
        assert_eq!(
            parse_point("1950,hot"),
            Err(PointSyntaxError::InvalidInteger("hot".to_string()))
        );
        assert_eq!(
            parse_point("1950,99999999999"),
            Err(PointSyntaxError::InvalidInteger("99999999999".to_string()))
        );
        assert_eq!(parse_point(" 1950 , -4 "), Ok(DataPoint::new(vec![1950, -4])));
        assert_eq!(parse_point("1,2,3").map(|x| x.dims()), Ok(3));
    }

    #[test]
    fn points_file() {
        let f = file("0,0\n\n10,10\r\n20,20\n");
        let points = read_points(f.path()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], DataPoint::new(vec![20, 20]));
        assert!(points.iter().all(DataPoint::is_observation));

        let mut buffer = Vec::new();
        write_points(&mut buffer, &points).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "0,0\n10,10\n20,20\n"
        );
    }

    #[test]
    fn points_file_errors() {
        let f = file("0,0\n1,2,3\n");
        match read_points(f.path()) {
            Err(DataLoadError::Malformed { line, source, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(
                    source,
                    PointSyntaxError::DimensionMismatch {
                        expected: 2,
                        actual: 3
                    }
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        let f = file("\n\n");
        assert!(matches!(
            read_points(f.path()),
            Err(DataLoadError::Empty { .. })
        ));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_points(dir.path().join("missing.txt")),
            Err(DataLoadError::Io { .. })
        ));
    }

    #[test]
    fn pairs_file() {
        let f = file("0,0\t1950,2\n10,10\t1951,12\n");
        let (canopies, points) = read_pairs(f.path()).unwrap();
        assert_eq!(canopies.len(), 2);
        assert_eq!(points.len(), 2);
        assert_eq!(canopies[1], DataPoint::new(vec![10, 10]));
        assert_eq!(points[1], DataPoint::new(vec![1951, 12]));
    }

    #[test]
    fn pairs_file_without_tab() {
        let f = file("0,0\t1950,2\n0,0 1951,3\n");
        match read_pairs(f.path()) {
            Err(DataLoadError::Malformed { line, source, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(source, PointSyntaxError::MissingDelimiter('\t'));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
