/// Extraction of the original points lying within a horizontal tolerance of a line
use crate::cancel::CancelToken;
use crate::error::{ProfilerError, Result};
use crate::point_set::{AttributeTable, LineSegment, Point3};
use crate::spatial_index::{IndexDims, SpatialIndex};
use constants::profile::{
    CROSS_SECTION_STATIONS_PER_METRE, DEFAULT_TOLERANCE, MIN_CROSS_SECTION_STATIONS,
};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Points tested per cancellation check
const POINT_CHUNK: usize = 16_384;

/// Which side of the search the spatial index is built over.
///
/// Both select exactly the points whose horizontal distance to the nearest
/// line station is within tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Index the dense stations and look up the nearest one for every point. O(P log S).
    #[default]
    StationIndex,
    /// Index the points and gather a radius neighbourhood around every station. O(S log P + hits).
    PointIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSectionConfig {
    /// Tolerance used when the caller does not supply one
    pub tolerance: f64,
    pub strategy: SearchStrategy,
    pub min_stations: usize,
    pub stations_per_metre: f64,
}

impl Default for CrossSectionConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            strategy: SearchStrategy::default(),
            min_stations: MIN_CROSS_SECTION_STATIONS,
            stations_per_metre: CROSS_SECTION_STATIONS_PER_METRE,
        }
    }
}

impl CrossSectionConfig {
    pub fn validate(&self) -> Result<()> {
        validate_tolerance(self.tolerance)?;
        if self.min_stations < 2 {
            return Err(ProfilerError::invalid(
                "cross-section needs at least 2 line stations",
            ));
        }
        if !(self.stations_per_metre.is_finite() && self.stations_per_metre >= 0.0) {
            return Err(ProfilerError::invalid(
                "stations per metre must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Selected points in ascending original index order, with per-point line metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionResult {
    pub line: LineSegment,
    pub tolerance: f64,
    pub total_length: f64,
    /// Positions of the selected points in the source point set
    pub indices: Vec<usize>,
    pub points: Vec<Point3>,
    /// Distance from the line start to the point's projection, in [0, total_length]
    pub along_distances: Vec<f64>,
    /// Horizontal distance from the point to the segment
    pub perpendicular_distances: Vec<f64>,
    /// Source attributes gathered at `indices`
    pub attributes: Option<AttributeTable>,
}

impl CrossSectionResult {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Name for a derived layer, e.g. `CrossSection_plot7_1520pts_tol1.0m`.
    pub fn layer_name(&self, source: Option<&str>) -> String {
        let base = match source {
            Some(name) if !name.is_empty() => format!("CrossSection_{name}"),
            _ => "CrossSection".to_string(),
        };
        format!("{}_{}pts_tol{:?}m", base, self.len(), self.tolerance)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrossSectionExtractor {
    config: CrossSectionConfig,
}

impl CrossSectionExtractor {
    pub fn new(config: CrossSectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CrossSectionConfig {
        &self.config
    }

    /// Stations used for a line of `length`: the minimum, or denser for long lines.
    pub fn station_count(&self, length: f64) -> usize {
        let dense = (length * self.config.stations_per_metre) as usize;
        dense.max(self.config.min_stations)
    }

    pub fn extract(
        &self,
        points: &[Point3],
        attributes: Option<&AttributeTable>,
        start: Point3,
        end: Point3,
        tolerance: f64,
    ) -> Result<CrossSectionResult> {
        self.extract_cancellable(points, attributes, start, end, tolerance, &CancelToken::new())
    }

    /// Select every point whose nearest line station is within `tolerance` horizontally.
    ///
    /// An empty selection is a valid result, not an error.
    pub fn extract_cancellable(
        &self,
        points: &[Point3],
        attributes: Option<&AttributeTable>,
        start: Point3,
        end: Point3,
        tolerance: f64,
        cancel: &CancelToken,
    ) -> Result<CrossSectionResult> {
        let (line, stations) = self.prepare(points, attributes, start, end, tolerance)?;

        let indices = match self.config.strategy {
            SearchStrategy::StationIndex => {
                select_by_station_index(points, &stations, tolerance, cancel)?
            }
            SearchStrategy::PointIndex => {
                let index = SpatialIndex::build(points, IndexDims::Planar)?;
                select_by_point_index(points.len(), &index, &stations, tolerance, cancel)?
            }
        };

        Ok(self.assemble(points, attributes, line, tolerance, indices))
    }

    /// Point-index search against an existing planar index over `points`,
    /// e.g. the one held by a profile engine.
    pub fn extract_with_index(
        &self,
        points: &[Point3],
        index: &SpatialIndex,
        attributes: Option<&AttributeTable>,
        start: Point3,
        end: Point3,
        tolerance: f64,
    ) -> Result<CrossSectionResult> {
        if index.dims() != IndexDims::Planar || index.len() != points.len() {
            return Err(ProfilerError::invalid(
                "index must be planar and built over the same points",
            ));
        }
        let (line, stations) = self.prepare(points, attributes, start, end, tolerance)?;
        let indices =
            select_by_point_index(points.len(), index, &stations, tolerance, &CancelToken::new())?;
        Ok(self.assemble(points, attributes, line, tolerance, indices))
    }

    fn prepare(
        &self,
        points: &[Point3],
        attributes: Option<&AttributeTable>,
        start: Point3,
        end: Point3,
        tolerance: f64,
    ) -> Result<(LineSegment, Vec<Point3>)> {
        if points.is_empty() {
            return Err(ProfilerError::invalid(
                "no points provided for cross-section extraction",
            ));
        }
        validate_tolerance(tolerance)?;
        let line = LineSegment::new(start, end)?;
        if let Some(table) = attributes {
            table.ensure_aligned(points.len())?;
        }

        let stations = line.stations(self.station_count(line.length()));
        info!(
            "[XSECTION] Testing {} points against {} line stations, tolerance={}m ({:?})",
            points.len(),
            stations.len(),
            tolerance,
            self.config.strategy
        );
        Ok((line, stations))
    }

    fn assemble(
        &self,
        points: &[Point3],
        attributes: Option<&AttributeTable>,
        line: LineSegment,
        tolerance: f64,
        indices: Vec<usize>,
    ) -> CrossSectionResult {
        let total_length = line.length();
        let selected: Vec<Point3> = indices.iter().map(|&i| points[i]).collect();

        let (along_distances, perpendicular_distances) = selected
            .iter()
            .map(|p| {
                let (t, perpendicular) = line.project_horizontal(p);
                (t * total_length, perpendicular)
            })
            .unzip();

        info!("[XSECTION] Cross-section points found: {}", indices.len());

        CrossSectionResult {
            line,
            tolerance,
            total_length,
            attributes: attributes.map(|table| table.gather(&indices)),
            indices,
            points: selected,
            along_distances,
            perpendicular_distances,
        }
    }
}

fn validate_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_finite() && tolerance > 0.0 {
        Ok(())
    } else {
        Err(ProfilerError::invalid(format!(
            "tolerance must be a positive finite distance, got {tolerance}"
        )))
    }
}

fn select_by_station_index(
    points: &[Point3],
    stations: &[Point3],
    tolerance: f64,
    cancel: &CancelToken,
) -> Result<Vec<usize>> {
    let station_index = SpatialIndex::build(stations, IndexDims::Planar)?;

    let chunks = points
        .par_chunks(POINT_CHUNK)
        .enumerate()
        .map(|(c, chunk)| {
            cancel.check()?;
            Ok(chunk
                .iter()
                .enumerate()
                .filter(|(_, p)| {
                    matches!(station_index.query_nearest(p), Some((_, d)) if d <= tolerance)
                })
                .map(|(k, _)| c * POINT_CHUNK + k)
                .collect::<Vec<usize>>())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(chunks.concat())
}

fn select_by_point_index(
    point_count: usize,
    index: &SpatialIndex,
    stations: &[Point3],
    tolerance: f64,
    cancel: &CancelToken,
) -> Result<Vec<usize>> {
    let neighbourhoods = stations
        .par_iter()
        .map(|station| {
            cancel.check()?;
            Ok(index.query_radius(station, tolerance))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut selected = vec![false; point_count];
    for i in neighbourhoods.into_iter().flatten() {
        selected[i] = true;
    }

    Ok(selected
        .iter()
        .enumerate()
        .filter_map(|(i, &hit)| hit.then_some(i))
        .collect())
}
