//! Height profiles along a line through a point cloud.
//!
//! Stations are spaced evenly along the line. Each station aggregates the
//! heights of all points within a horizontal search radius; stations with no
//! neighbours are bridged by linear interpolation when valid stations exist
//! on both sides, and left as "no data" otherwise.

use crate::cancel::CancelToken;
use crate::error::{ProfilerError, Result};
use crate::point_set::{LineSegment, Point3};
use crate::spatial_index::{IndexDims, SpatialIndex};
use constants::profile::{DEFAULT_NUM_SAMPLES, DEFAULT_TOLERANCE};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Sampling parameters of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileParams {
    /// Number of stations, first and last on the line endpoints
    pub num_samples: usize,
    /// Horizontal search radius around each station
    pub tolerance: f64,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            num_samples: DEFAULT_NUM_SAMPLES,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ProfileParams {
    pub fn new(num_samples: usize, tolerance: f64) -> Self {
        Self {
            num_samples,
            tolerance,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_samples < 2 {
            return Err(ProfilerError::invalid(format!(
                "a profile needs at least 2 samples, got {}",
                self.num_samples
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ProfilerError::invalid(format!(
                "tolerance must be a positive finite distance, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Min, max, mean and population standard deviation of a set of heights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl HeightStats {
    /// `None` for an empty slice. A single height has zero spread.
    pub fn from_heights(heights: &[f64]) -> Option<Self> {
        if heights.is_empty() {
            return None;
        }
        let n = heights.len() as f64;
        let (min, max, sum) = heights.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, sum), &h| (lo.min(h), hi.max(h), sum + h),
        );
        let mean = sum / n;
        let std = if heights.len() > 1 {
            (heights.iter().map(|h| (h - mean) * (h - mean)).sum::<f64>() / n).sqrt()
        } else {
            0.0
        };
        Some(Self {
            min,
            max,
            mean,
            std,
        })
    }
}

/// One station of a profile. Heights are `None` where there is no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    pub distance: f64,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
    pub mean_height: Option<f64>,
    /// Never interpolated; only present for measured stations
    pub std_height: Option<f64>,
    pub point_count: usize,
    /// Heights were bridged from neighbouring stations
    pub interpolated: bool,
}

impl ProfileSample {
    fn measured(distance: f64, heights: &[f64]) -> Self {
        let stats = HeightStats::from_heights(heights);
        Self {
            distance,
            min_height: stats.map(|s| s.min),
            max_height: stats.map(|s| s.max),
            mean_height: stats.map(|s| s.mean),
            std_height: stats.map(|s| s.std),
            point_count: heights.len(),
            interpolated: false,
        }
    }

    pub fn has_data(&self) -> bool {
        self.mean_height.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// |last valid mean - first valid mean|
    pub total_elevation_change: f64,
    pub max_elevation: Option<f64>,
    pub min_elevation: Option<f64>,
    pub mean_elevation: Option<f64>,
    pub elevation_range: f64,
    /// Stations with a mean height after interpolation
    pub valid_samples: usize,
    /// Stations with at least one neighbouring point
    pub measured_samples: usize,
    pub coverage_percentage: f64,
}

impl ProfileSummary {
    fn from_samples(samples: &[ProfileSample]) -> Self {
        let valid_means: Vec<f64> = samples.iter().filter_map(|s| s.mean_height).collect();
        let measured_samples = samples.iter().filter(|s| s.point_count > 0).count();

        let (Some(&first), Some(&last)) = (valid_means.first(), valid_means.last()) else {
            return Self {
                total_elevation_change: 0.0,
                max_elevation: None,
                min_elevation: None,
                mean_elevation: None,
                elevation_range: 0.0,
                valid_samples: 0,
                measured_samples,
                coverage_percentage: 0.0,
            };
        };

        let max_elevation = samples
            .iter()
            .filter_map(|s| s.max_height)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_elevation = samples
            .iter()
            .filter_map(|s| s.min_height)
            .fold(f64::INFINITY, f64::min);

        Self {
            total_elevation_change: if valid_means.len() > 1 {
                (last - first).abs()
            } else {
                0.0
            },
            max_elevation: Some(max_elevation),
            min_elevation: Some(min_elevation),
            mean_elevation: Some(valid_means.iter().sum::<f64>() / valid_means.len() as f64),
            elevation_range: max_elevation - min_elevation,
            valid_samples: valid_means.len(),
            measured_samples,
            coverage_percentage: valid_means.len() as f64 / samples.len() as f64 * 100.0,
        }
    }
}

/// A computed profile. Recompute rather than mutate when parameters change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResult {
    pub line: LineSegment,
    pub total_length: f64,
    pub tolerance: f64,
    pub samples: Vec<ProfileSample>,
    pub summary: ProfileSummary,
}

impl ProfileResult {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.distance).collect()
    }

    pub fn mean_heights(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.mean_height).collect()
    }

    pub fn point_counts(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.point_count).collect()
    }
}

/// Profile calculator holding a planar index over one point set, reusable across lines and parameters.
pub struct ProfileEngine<'a> {
    points: &'a [Point3],
    index: SpatialIndex,
}

impl<'a> ProfileEngine<'a> {
    /// Build the horizontal index over `points`. Fails on an empty point set.
    pub fn new(points: &'a [Point3]) -> Result<Self> {
        if points.is_empty() {
            return Err(ProfilerError::invalid("no points provided for profile calculation"));
        }
        info!("[PROFILE] Building spatial index over {} points", points.len());
        let index = SpatialIndex::build(points, IndexDims::Planar)?;
        Ok(Self { points, index })
    }

    /// Reuse an index previously built over the same `points`.
    pub fn with_index(points: &'a [Point3], index: SpatialIndex) -> Result<Self> {
        if points.is_empty() {
            return Err(ProfilerError::invalid("no points provided for profile calculation"));
        }
        if index.dims() != IndexDims::Planar || index.len() != points.len() {
            return Err(ProfilerError::invalid(
                "index must be planar and built over the same points",
            ));
        }
        Ok(Self { points, index })
    }

    pub fn points(&self) -> &'a [Point3] {
        self.points
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn calculate(
        &self,
        start: Point3,
        end: Point3,
        params: &ProfileParams,
    ) -> Result<ProfileResult> {
        self.calculate_cancellable(start, end, params, &CancelToken::new())
    }

    /// Like [`calculate`](Self::calculate), checking `cancel` before each station.
    pub fn calculate_cancellable(
        &self,
        start: Point3,
        end: Point3,
        params: &ProfileParams,
        cancel: &CancelToken,
    ) -> Result<ProfileResult> {
        params.validate()?;
        let line = LineSegment::new(start, end)?;
        let length = line.length();
        let last = (params.num_samples - 1) as f64;

        info!(
            "[PROFILE] Calculating profile with {} points, {} samples, tolerance={}m, length={:.2}m",
            self.points.len(),
            params.num_samples,
            params.tolerance,
            length
        );

        let mut samples = (0..params.num_samples)
            .into_par_iter()
            .map(|i| {
                cancel.check()?;
                let t = i as f64 / last;
                let station = line.point_at(t);

                let mut neighbours = self.index.query_radius(&station, params.tolerance);
                neighbours.sort_unstable();
                let heights: Vec<f64> = neighbours.iter().map(|&j| self.points[j][2]).collect();

                Ok(ProfileSample::measured(t * length, &heights))
            })
            .collect::<Result<Vec<_>>>()?;

        interpolate_missing(&mut samples);
        let summary = ProfileSummary::from_samples(&samples);

        info!(
            "[PROFILE] Profile calculation complete. {} valid samples ({:.1}% coverage)",
            summary.valid_samples, summary.coverage_percentage
        );

        Ok(ProfileResult {
            line,
            total_length: length,
            tolerance: params.tolerance,
            samples,
            summary,
        })
    }
}

/// One-shot profile: builds the index, samples the line and discards the index.
pub fn calculate_profile(
    points: &[Point3],
    start: Point3,
    end: Point3,
    params: &ProfileParams,
) -> Result<ProfileResult> {
    params.validate()?;
    LineSegment::new(start, end)?;
    ProfileEngine::new(points)?.calculate(start, end, params)
}

/// Bridge no-data stations lying between two valid stations, per height series.
fn interpolate_missing(samples: &mut [ProfileSample]) {
    let distances: Vec<f64> = samples.iter().map(|s| s.distance).collect();

    let mut mins: Vec<Option<f64>> = samples.iter().map(|s| s.min_height).collect();
    let mut maxs: Vec<Option<f64>> = samples.iter().map(|s| s.max_height).collect();
    let mut means: Vec<Option<f64>> = samples.iter().map(|s| s.mean_height).collect();

    let filled = fill_gaps(&distances, &mut mins)
        + fill_gaps(&distances, &mut maxs)
        + fill_gaps(&distances, &mut means);
    if filled == 0 {
        return;
    }

    for (i, sample) in samples.iter_mut().enumerate() {
        if sample.point_count == 0 && means[i].is_some() {
            sample.interpolated = true;
        }
        sample.min_height = mins[i];
        sample.max_height = maxs[i];
        sample.mean_height = means[i];
    }
}

/// Linear interpolation over `distances` between consecutive known values.
/// Leading and trailing gaps are left empty. Returns the number of filled slots.
fn fill_gaps(distances: &[f64], values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut previous: Option<(usize, f64)> = None;

    for i in 0..values.len() {
        let Some(current) = values[i] else {
            continue;
        };
        if let Some((p, before)) = previous {
            let span = distances[i] - distances[p];
            for j in p + 1..i {
                let weight = (distances[j] - distances[p]) / span;
                values[j] = Some(before + weight * (current - before));
                filled += 1;
            }
        }
        previous = Some((i, current));
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_height_stats() {
        assert!(HeightStats::from_heights(&[]).is_none());

        let single = HeightStats::from_heights(&[4.0]).unwrap();
        assert_eq!((single.min, single.max, single.mean, single.std), (4.0, 4.0, 4.0, 0.0));

        let stats = HeightStats::from_heights(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_relative_eq!(stats.mean, 5.0, epsilon = 1e-12);
        assert_relative_eq!(stats.std, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fill_gaps_interior_only() {
        let distances = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let mut values = [None, Some(1.0), None, None, Some(4.0), None];
        assert_eq!(fill_gaps(&distances, &mut values), 2);
        assert_eq!(values[0], None);
        assert_relative_eq!(values[2].unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(values[3].unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(values[5], None);
    }

    #[test]
    fn test_fill_gaps_needs_two_values() {
        let distances = [0.0, 1.0, 2.0];
        let mut values = [None, Some(3.0), None];
        assert_eq!(fill_gaps(&distances, &mut values), 0);
        assert_eq!(values, [None, Some(3.0), None]);
    }

    #[test]
    fn test_invalid_params() {
        let points = [[0.0, 0.0, 0.0]];
        let engine = ProfileEngine::new(&points).unwrap();
        let end = [1.0, 0.0, 0.0];

        for params in [
            ProfileParams::new(1, 1.0),
            ProfileParams::new(10, 0.0),
            ProfileParams::new(10, -1.0),
            ProfileParams::new(10, f64::NAN),
        ] {
            let err = engine.calculate([0.0; 3], end, &params).unwrap_err();
            assert!(matches!(err, ProfilerError::InvalidArgument(_)), "{params:?}");
        }

        let err = engine
            .calculate(end, end, &ProfileParams::default())
            .unwrap_err();
        assert!(matches!(err, ProfilerError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_points_rejected() {
        assert!(matches!(
            ProfileEngine::new(&[]),
            Err(ProfilerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_gap_is_interpolated_and_flagged() {
        // points at x = 0 and x = 4 only; stations at 0..=4
        let points = [[0.0, 0.0, 10.0], [4.0, 0.0, 14.0]];
        let result = calculate_profile(
            &points,
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            &ProfileParams::new(5, 0.1),
        )
        .unwrap();

        assert_eq!(result.point_counts(), vec![1, 0, 0, 0, 1]);
        let means: Vec<f64> = result.mean_heights().into_iter().map(|m| m.unwrap()).collect();
        for (i, expected) in [10.0, 11.0, 12.0, 13.0, 14.0].into_iter().enumerate() {
            assert_relative_eq!(means[i], expected, epsilon = 1e-9);
        }
        assert!(result.samples[2].interpolated);
        assert!(!result.samples[0].interpolated);
        assert_eq!(result.samples[2].std_height, None);
        assert_eq!(result.summary.valid_samples, 5);
        assert_eq!(result.summary.measured_samples, 2);
        assert_relative_eq!(result.summary.total_elevation_change, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_data_anywhere() {
        let points = [[100.0, 100.0, 1.0]];
        let result = calculate_profile(
            &points,
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            &ProfileParams::new(3, 0.5),
        )
        .unwrap();
        assert!(result.samples.iter().all(|s| !s.has_data()));
        assert_eq!(result.summary.valid_samples, 0);
        assert_eq!(result.summary.coverage_percentage, 0.0);
        assert_eq!(result.summary.elevation_range, 0.0);
        assert_eq!(result.summary.max_elevation, None);
    }

    #[test]
    fn test_cancelled_profile() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 1.0]];
        let engine = ProfileEngine::new(&points).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = engine
            .calculate_cancellable([0.0; 3], [1.0, 0.0, 0.0], &ProfileParams::default(), &cancel)
            .unwrap_err();
        assert!(matches!(err, ProfilerError::Cancelled));
    }

    #[test]
    fn test_with_index_checks_shape() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 1.0]];
        let other = SpatialIndex::build(&points[..1], IndexDims::Planar).unwrap();
        assert!(ProfileEngine::with_index(&points, other).is_err());

        let volumetric = SpatialIndex::build(&points, IndexDims::Volumetric).unwrap();
        assert!(ProfileEngine::with_index(&points, volumetric).is_err());

        let planar = SpatialIndex::build(&points, IndexDims::Planar).unwrap();
        assert!(ProfileEngine::with_index(&points, planar).is_ok());
    }
}
