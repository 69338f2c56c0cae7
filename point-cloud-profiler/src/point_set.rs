/// Point arrays, index-aligned attribute columns and line segments
use crate::error::{ProfilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point as (x, y, z). A point set is a `[Point3]` slice whose positions are the point indices.
pub type Point3 = [f64; 3];

/// Per-point payload aligned with a point set by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeColumn {
    /// Continuous values such as intensity-derived metrics or GPS time.
    Scalar(Vec<f64>),
    /// Small integer codes, e.g. classification or return number.
    Code(Vec<u8>),
    /// 16-bit counts, e.g. raw intensity.
    Count(Vec<u16>),
    /// Normalised RGB triples used directly as display colour.
    Rgb(Vec<[f32; 3]>),
}

impl AttributeColumn {
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(v) => v.len(),
            Self::Code(v) => v.len(),
            Self::Count(v) => v.len(),
            Self::Rgb(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether values are colours rather than scalars to be colour-mapped
    pub fn is_colour(&self) -> bool {
        matches!(self, Self::Rgb(_))
    }

    /// Copy out the values at `indices`, in that order.
    ///
    /// Every index must be below `len()`; callers derive indices from the aligned point set.
    pub fn gather(&self, indices: &[usize]) -> Self {
        fn pick<T: Copy>(values: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| values[i]).collect()
        }

        match self {
            Self::Scalar(v) => Self::Scalar(pick(v, indices)),
            Self::Code(v) => Self::Code(pick(v, indices)),
            Self::Count(v) => Self::Count(pick(v, indices)),
            Self::Rgb(v) => Self::Rgb(pick(v, indices)),
        }
    }

    /// Value at `index` widened to f64 (colours report their luminance).
    pub fn value_f64(&self, index: usize) -> Option<f64> {
        match self {
            Self::Scalar(v) => v.get(index).copied(),
            Self::Code(v) => v.get(index).map(|&c| f64::from(c)),
            Self::Count(v) => v.get(index).map(|&c| f64::from(c)),
            Self::Rgb(v) => v
                .get(index)
                .map(|c| f64::from(0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2])),
        }
    }
}

/// Named attribute columns resolved once at load time, all aligned to one point set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeTable {
    point_count: usize,
    columns: BTreeMap<String, AttributeColumn>,
}

impl AttributeTable {
    /// Empty table for a point set of `point_count` points
    pub fn new(point_count: usize) -> Self {
        Self {
            point_count,
            columns: BTreeMap::new(),
        }
    }

    /// Add or replace a column. Rejects columns whose length differs from the point count.
    pub fn insert(&mut self, name: impl Into<String>, column: AttributeColumn) -> Result<()> {
        let name = name.into();
        if column.len() != self.point_count {
            return Err(ProfilerError::AttributeLength {
                name,
                expected: self.point_count,
                actual: column.len(),
            });
        }
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeColumn> {
        self.columns.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeColumn)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gather every column at the same `indices`, keeping the table aligned.
    pub fn gather(&self, indices: &[usize]) -> Self {
        Self {
            point_count: indices.len(),
            columns: self
                .columns
                .iter()
                .map(|(name, column)| (name.clone(), column.gather(indices)))
                .collect(),
        }
    }

    /// Fail unless this table is aligned to a point set of `point_count` points.
    pub fn ensure_aligned(&self, point_count: usize) -> Result<()> {
        if self.point_count == point_count {
            return Ok(());
        }
        let name = self.names().next().unwrap_or("<table>").to_string();
        Err(ProfilerError::AttributeLength {
            name,
            expected: point_count,
            actual: self.point_count,
        })
    }
}

/// An ordered pair of distinct 3D points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    start: Point3,
    end: Point3,
}

impl LineSegment {
    /// Build a segment. Identical or non-finite endpoints are rejected.
    pub fn new(start: Point3, end: Point3) -> Result<Self> {
        if start.iter().chain(end.iter()).any(|v| !v.is_finite()) {
            return Err(ProfilerError::invalid("line endpoints must be finite"));
        }
        if start == end {
            return Err(ProfilerError::invalid("start and end points are identical"));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Point3 {
        self.start
    }

    pub fn end(&self) -> Point3 {
        self.end
    }

    /// 3D length, always > 0
    pub fn length(&self) -> f64 {
        let d = self.direction();
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    /// Length of the segment projected onto the XY plane
    pub fn horizontal_length(&self) -> f64 {
        let d = self.direction();
        (d[0] * d[0] + d[1] * d[1]).sqrt()
    }

    pub fn direction(&self) -> Point3 {
        [
            self.end[0] - self.start[0],
            self.end[1] - self.start[1],
            self.end[2] - self.start[2],
        ]
    }

    /// Point at parameter `t` (0 = start, 1 = end)
    pub fn point_at(&self, t: f64) -> Point3 {
        let d = self.direction();
        [
            self.start[0] + t * d[0],
            self.start[1] + t * d[1],
            self.start[2] + t * d[2],
        ]
    }

    /// `count` evenly spaced stations from start to end inclusive (`count >= 2`).
    pub fn stations(&self, count: usize) -> Vec<Point3> {
        let last = (count.max(2) - 1) as f64;
        (0..count).map(|i| self.point_at(i as f64 / last)).collect()
    }

    /// Horizontal projection of `point` onto the segment.
    ///
    /// Returns the clamped parameter in [0, 1] and the XY distance from `point` to
    /// the projected position. A segment with no horizontal extent projects
    /// everything onto its start.
    pub fn project_horizontal(&self, point: &Point3) -> (f64, f64) {
        let d = self.direction();
        let px = point[0] - self.start[0];
        let py = point[1] - self.start[1];
        let len_sq = d[0] * d[0] + d[1] * d[1];

        let t = if len_sq > f64::EPSILON {
            ((px * d[0] + py * d[1]) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let dx = px - t * d[0];
        let dy = py - t * d[1];
        (t, (dx * dx + dy * dy).sqrt())
    }
}

/// Horizontal (XY) distance between two points
pub fn horizontal_distance(a: &Point3, b: &Point3) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_degenerate_segment_rejected() {
        let err = LineSegment::new([1.0, 2.0, 3.0], [1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ProfilerError::InvalidArgument(_)));
        assert!(LineSegment::new([f64::NAN, 0.0, 0.0], [1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_stations_span_segment() {
        let line = LineSegment::new([0.0, 0.0, 0.0], [4.0, 0.0, 2.0]).unwrap();
        let stations = line.stations(5);
        assert_eq!(stations.len(), 5);
        assert_eq!(stations[0], [0.0, 0.0, 0.0]);
        assert_eq!(stations[4], [4.0, 0.0, 2.0]);
        assert_relative_eq!(stations[2][0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(stations[2][2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_horizontal_projection_clamps() {
        let line = LineSegment::new([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]).unwrap();

        let (t, d) = line.project_horizontal(&[5.0, 3.0, 100.0]);
        assert_relative_eq!(t, 0.5, epsilon = 1e-12);
        assert_relative_eq!(d, 3.0, epsilon = 1e-12);

        let (t, d) = line.project_horizontal(&[-4.0, 3.0, 0.0]);
        assert_eq!(t, 0.0);
        assert_relative_eq!(d, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_segment_projects_to_start() {
        let line = LineSegment::new([1.0, 1.0, 0.0], [1.0, 1.0, 10.0]).unwrap();
        assert_eq!(line.horizontal_length(), 0.0);
        let (t, d) = line.project_horizontal(&[4.0, 5.0, 3.0]);
        assert_eq!(t, 0.0);
        assert_relative_eq!(d, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_table_rejects_misaligned_column() {
        let mut table = AttributeTable::new(3);
        table
            .insert("classification", AttributeColumn::Code(vec![2, 3, 5]))
            .unwrap();
        let err = table
            .insert("intensity", AttributeColumn::Count(vec![1, 2]))
            .unwrap_err();
        assert!(matches!(
            err,
            ProfilerError::AttributeLength {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_table_gather_keeps_alignment() {
        let mut table = AttributeTable::new(4);
        table
            .insert("classification", AttributeColumn::Code(vec![1, 2, 3, 4]))
            .unwrap();
        table
            .insert("z", AttributeColumn::Scalar(vec![0.1, 0.2, 0.3, 0.4]))
            .unwrap();

        let picked = table.gather(&[3, 1]);
        assert_eq!(picked.point_count(), 2);
        assert_eq!(
            picked.get("classification"),
            Some(&AttributeColumn::Code(vec![4, 2]))
        );
        assert_eq!(picked.get("z"), Some(&AttributeColumn::Scalar(vec![0.4, 0.2])));
    }
}
