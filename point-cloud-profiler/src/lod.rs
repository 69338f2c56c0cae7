/// Level-of-detail selection and systematic point decimation for interactive rendering
use crate::bounds::PointCloudBounds;
use crate::error::{ProfilerError, Result};
use crate::point_set::{AttributeColumn, Point3};
use constants::lod::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Detail level, from full detail (`Close`) to the sparsest (`Far`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LodLevel {
    Close,
    Near,
    Medium,
    Far,
}

impl LodLevel {
    /// All levels ordered from finest to coarsest
    pub const ALL: [LodLevel; 4] = [Self::Close, Self::Near, Self::Medium, Self::Far];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Near => "near",
            Self::Medium => "medium",
            Self::Far => "far",
        }
    }
}

impl fmt::Display for LodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LodLevel {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "close" => Ok(Self::Close),
            "near" => Ok(Self::Near),
            "medium" => Ok(Self::Medium),
            "far" => Ok(Self::Far),
            other => Err(ProfilerError::invalid(format!("unknown LOD level `{other}`"))),
        }
    }
}

/// Relative camera distance at which a level starts, and the stride it decimates with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodThreshold {
    pub distance: f64,
    pub stride: usize,
}

impl LodThreshold {
    pub const fn new(distance: f64, stride: usize) -> Self {
        Self { distance, stride }
    }
}

/// Dataset size tiers driving full-detail exemption and adaptive strides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeThresholds {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
    pub massive: usize,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            small: SMALL_DATASET_POINTS,
            medium: MEDIUM_DATASET_POINTS,
            large: LARGE_DATASET_POINTS,
            massive: MASSIVE_DATASET_POINTS,
        }
    }
}

/// Rendering preset selecting a threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceMode {
    #[default]
    Auto,
    Performance,
    Quality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    pub far: LodThreshold,
    pub medium: LodThreshold,
    pub near: LodThreshold,
    pub close: LodThreshold,
    pub sizes: SizeThresholds,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            far: LodThreshold::new(FAR_DISTANCE, FAR_STRIDE),
            medium: LodThreshold::new(MEDIUM_DISTANCE, MEDIUM_STRIDE),
            near: LodThreshold::new(NEAR_DISTANCE, NEAR_STRIDE),
            close: LodThreshold::new(CLOSE_DISTANCE, CLOSE_STRIDE),
            sizes: SizeThresholds::default(),
        }
    }
}

impl LodConfig {
    /// Threshold table for a performance preset
    pub fn for_mode(mode: PerformanceMode) -> Self {
        let table = match mode {
            PerformanceMode::Auto => return Self::default(),
            PerformanceMode::Performance => PERFORMANCE_PRESET,
            PerformanceMode::Quality => QUALITY_PRESET,
        };
        let [far, medium, near, close] = table.map(|(d, s)| LodThreshold::new(d, s));
        Self {
            far,
            medium,
            near,
            close,
            sizes: SizeThresholds::default(),
        }
    }

    pub fn threshold(&self, level: LodLevel) -> LodThreshold {
        match level {
            LodLevel::Close => self.close,
            LodLevel::Near => self.near,
            LodLevel::Medium => self.medium,
            LodLevel::Far => self.far,
        }
    }

    pub fn stride(&self, level: LodLevel) -> usize {
        self.threshold(level).stride
    }

    /// Check strides are positive and distances finite, non-negative and ordered far > medium > near >= close.
    pub fn validate(&self) -> Result<()> {
        for level in LodLevel::ALL {
            let t = self.threshold(level);
            if t.stride == 0 {
                return Err(ProfilerError::invalid(format!(
                    "LOD stride for `{level}` must be at least 1"
                )));
            }
            if !t.distance.is_finite() || t.distance < 0.0 {
                return Err(ProfilerError::invalid(format!(
                    "LOD distance for `{level}` must be finite and non-negative"
                )));
            }
        }
        if !(self.far.distance > self.medium.distance
            && self.medium.distance > self.near.distance
            && self.near.distance >= self.close.distance)
        {
            return Err(ProfilerError::invalid(
                "LOD distances must be ordered far > medium > near >= close",
            ));
        }
        Ok(())
    }
}

/// Outcome of one decimation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodInfo {
    pub level: LodLevel,
    pub stride: usize,
    pub original_count: usize,
    pub final_count: usize,
    pub reduction_percent: f64,
    pub processing_time: Duration,
    /// Set when decimation was skipped because of an internal error; data is passed through untouched.
    pub fallback: Option<String>,
}

impl LodInfo {
    fn passthrough(level: LodLevel, count: usize, started: Instant) -> Self {
        Self {
            level,
            stride: 1,
            original_count: count,
            final_count: count,
            reduction_percent: 0.0,
            processing_time: started.elapsed(),
            fallback: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Decimated points and the scalars gathered with the same index set.
#[derive(Debug, Clone)]
pub struct LodOutput<'a> {
    pub points: Cow<'a, [Point3]>,
    pub scalars: Option<Cow<'a, AttributeColumn>>,
    pub info: LodInfo,
}

/// Render timing telemetry, passed in and returned rather than held globally.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderStats {
    /// Seconds
    pub last_render_time: f64,
    /// Exponential moving average, seconds
    pub average_render_time: f64,
    pub render_count: u64,
}

impl RenderStats {
    /// Fold one render duration into the statistics.
    pub fn record(mut self, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64();
        self.last_render_time = seconds;
        self.render_count += 1;
        self.average_render_time = if self.render_count == 1 {
            seconds
        } else {
            RENDER_TIME_EMA_ALPHA * seconds
                + (1.0 - RENDER_TIME_EMA_ALPHA) * self.average_render_time
        };
        self
    }
}

/// Serializable snapshot of the engine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LodSummary {
    pub enabled: bool,
    pub auto_mode: bool,
    pub config: LodConfig,
}

#[derive(Debug, Clone)]
pub struct LodEngine {
    config: LodConfig,
    enabled: bool,
    auto_mode: bool,
}

impl Default for LodEngine {
    fn default() -> Self {
        Self {
            config: LodConfig::default(),
            enabled: true,
            auto_mode: true,
        }
    }
}

impl LodEngine {
    pub fn new(config: LodConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Engine using one of the preset threshold tables
    pub fn for_mode(mode: PerformanceMode) -> Self {
        Self {
            config: LodConfig::for_mode(mode),
            ..Self::default()
        }
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    /// Replace the threshold table
    pub fn configure(&mut self, config: LodConfig) -> Result<()> {
        config.validate()?;
        info!("[LOD] Updated thresholds: {:?}", config);
        self.config = config;
        Ok(())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        info!("[LOD] System {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_auto_mode(&mut self, auto_mode: bool) {
        self.auto_mode = auto_mode;
        info!(
            "[LOD] Auto mode {}",
            if auto_mode { "enabled" } else { "disabled" }
        );
    }

    pub fn is_auto_mode(&self) -> bool {
        self.auto_mode
    }

    pub fn summary(&self) -> LodSummary {
        LodSummary {
            enabled: self.enabled,
            auto_mode: self.auto_mode,
            config: self.config.clone(),
        }
    }

    /// Bounding box diagonal of `points`, or 1.0 when empty, degenerate or non-finite.
    pub fn scene_size(points: &[Point3]) -> f64 {
        if points.is_empty() {
            return 1.0;
        }
        let bounds = PointCloudBounds::from_points(points);
        let size = bounds.diagonal();
        if !bounds.is_valid() || !size.is_finite() {
            warn!("[LOD] Could not derive scene size from bounds {:?}", bounds);
            return 1.0;
        }
        if size <= 0.0 { 1.0 } else { size }
    }

    /// Pick a level from dataset size and camera distance relative to scene size.
    ///
    /// A forced level wins over everything except a disabled engine, which always
    /// reports full detail. Boundaries belong to the coarser level.
    pub fn determine_level(
        &self,
        point_count: usize,
        camera_distance: f64,
        scene_size: f64,
        forced: Option<LodLevel>,
    ) -> LodLevel {
        if !self.enabled {
            return LodLevel::Close;
        }
        if let Some(level) = forced {
            return level;
        }
        if point_count < self.config.sizes.small {
            return LodLevel::Close;
        }

        let relative = camera_distance / scene_size.max(SCENE_SIZE_EPSILON);
        if relative >= self.config.far.distance {
            LodLevel::Far
        } else if relative >= self.config.medium.distance {
            LodLevel::Medium
        } else if relative >= self.config.near.distance {
            LodLevel::Near
        } else {
            LodLevel::Close
        }
    }

    /// Keep every `stride`-th point (and scalar) starting at index 0.
    ///
    /// Never fails: a disabled engine, stride 1 or empty input pass the data through,
    /// and misaligned scalars fall back to no decimation with `LodInfo::fallback` set.
    pub fn apply<'a>(
        &self,
        points: &'a [Point3],
        scalars: Option<&'a AttributeColumn>,
        level: LodLevel,
    ) -> LodOutput<'a> {
        let started = Instant::now();
        let original_count = points.len();
        let stride = self.config.stride(level).max(1);

        let passthrough = |info: LodInfo| LodOutput {
            points: Cow::Borrowed(points),
            scalars: scalars.map(Cow::Borrowed),
            info,
        };

        if !self.enabled || stride == 1 || points.is_empty() {
            return passthrough(LodInfo::passthrough(level, original_count, started));
        }

        if let Some(column) = scalars {
            if column.len() != original_count {
                let reason = format!(
                    "scalar column has {} values for {} points",
                    column.len(),
                    original_count
                );
                warn!("[LOD] Error applying LOD: {}", reason);
                let mut info = LodInfo::passthrough(level, original_count, started);
                info.fallback = Some(reason);
                return passthrough(info);
            }
        }

        let indices: Vec<usize> = (0..original_count).step_by(stride).collect();
        let decimated: Vec<Point3> = indices.iter().map(|&i| points[i]).collect();
        let decimated_scalars = scalars.map(|column| Cow::Owned(column.gather(&indices)));

        let final_count = decimated.len();
        let reduction_percent =
            (original_count - final_count) as f64 / original_count as f64 * 100.0;

        info!(
            "[LOD] Applied {} LOD: {} -> {} points ({:.1}% reduction)",
            level, original_count, final_count, reduction_percent
        );

        LodOutput {
            points: Cow::Owned(decimated),
            scalars: decimated_scalars,
            info: LodInfo {
                level,
                stride,
                original_count,
                final_count,
                reduction_percent,
                processing_time: started.elapsed(),
                fallback: None,
            },
        }
    }

    /// Recommended stride from dataset size alone.
    pub fn adaptive_stride(&self, point_count: usize) -> usize {
        let sizes = &self.config.sizes;
        if point_count < sizes.small {
            1
        } else if point_count < sizes.medium {
            2
        } else if point_count < sizes.large {
            5
        } else {
            10
        }
    }

    /// Whether recent render times suggest a coarser table. Advisory only;
    /// the engine never changes its thresholds by itself.
    pub fn should_auto_adjust(&self, stats: &RenderStats) -> bool {
        self.auto_mode && stats.average_render_time > TARGET_RENDER_TIME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_of_points(n: usize) -> Vec<Point3> {
        (0..n).map(|i| [i as f64, 0.0, 0.0]).collect()
    }

    #[test]
    fn test_scene_size() {
        assert_eq!(LodEngine::scene_size(&[]), 1.0);
        assert_eq!(LodEngine::scene_size(&[[2.0, 2.0, 2.0]]), 1.0);
        assert_relative_eq!(
            LodEngine::scene_size(&[[0.0, 0.0, 0.0], [3.0, 4.0, 0.0]]),
            5.0,
            epsilon = 1e-12
        );
        assert_eq!(
            LodEngine::scene_size(&[[f64::NAN, f64::NAN, f64::NAN]]),
            1.0
        );
    }

    #[test]
    fn test_level_selection_by_distance() {
        let engine = LodEngine::default();
        let n = 1_000_000;
        assert_eq!(engine.determine_level(n, 0.2, 1.0, None), LodLevel::Close);
        assert_eq!(engine.determine_level(n, 1.0, 1.0, None), LodLevel::Near);
        assert_eq!(engine.determine_level(n, 1.5, 1.0, None), LodLevel::Near);
        assert_eq!(engine.determine_level(n, 2.0, 1.0, None), LodLevel::Medium);
        assert_eq!(engine.determine_level(n, 300.0, 100.0, None), LodLevel::Medium);
        assert_eq!(engine.determine_level(n, 5.0, 1.0, None), LodLevel::Far);
        assert_eq!(engine.determine_level(n, 1e9, 1.0, None), LodLevel::Far);
    }

    #[test]
    fn test_forced_and_disabled() {
        let mut engine = LodEngine::default();
        assert_eq!(
            engine.determine_level(10, 0.0, 1.0, Some(LodLevel::Far)),
            LodLevel::Far
        );
        engine.set_enabled(false);
        assert_eq!(
            engine.determine_level(10_000_000, 100.0, 1.0, Some(LodLevel::Far)),
            LodLevel::Close
        );
    }

    #[test]
    fn test_zero_scene_size_does_not_divide_by_zero() {
        let engine = LodEngine::default();
        assert_eq!(
            engine.determine_level(100_000, 1.0, 0.0, None),
            LodLevel::Far
        );
    }

    #[test]
    fn test_apply_decimates_with_stride() {
        let engine = LodEngine::default();
        let points = line_of_points(101);
        let scalars = AttributeColumn::Scalar((0..101).map(|i| i as f64).collect());

        let out = engine.apply(&points, Some(&scalars), LodLevel::Medium);
        assert_eq!(out.info.stride, 5);
        assert_eq!(out.info.final_count, 21);
        assert_eq!(out.points.len(), 21);
        assert_eq!(out.points[3], [15.0, 0.0, 0.0]);
        match out.scalars.as_deref() {
            Some(AttributeColumn::Scalar(v)) => assert_eq!(v[3], 15.0),
            other => panic!("unexpected scalars {other:?}"),
        }
        assert_relative_eq!(out.info.reduction_percent, 80.0 / 101.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_apply_close_borrows_input() {
        let engine = LodEngine::default();
        let points = line_of_points(10);
        let out = engine.apply(&points, None, LodLevel::Close);
        assert!(matches!(out.points, Cow::Borrowed(_)));
        assert_eq!(out.info.stride, 1);
        assert_eq!(out.info.reduction_percent, 0.0);
    }

    #[test]
    fn test_apply_empty_and_disabled() {
        let mut engine = LodEngine::default();
        let out = engine.apply(&[], None, LodLevel::Far);
        assert!(out.points.is_empty());
        assert_eq!(out.info.original_count, 0);

        engine.set_enabled(false);
        let points = line_of_points(100);
        let out = engine.apply(&points, None, LodLevel::Far);
        assert_eq!(out.points.len(), 100);
        assert_eq!(out.info.stride, 1);
    }

    #[test]
    fn test_misaligned_scalars_fall_back() {
        let engine = LodEngine::default();
        let points = line_of_points(50);
        let scalars = AttributeColumn::Code(vec![1; 49]);
        let out = engine.apply(&points, Some(&scalars), LodLevel::Far);
        assert!(out.info.is_fallback());
        assert_eq!(out.points.len(), 50);
        assert_eq!(out.scalars.map(|s| s.len()), Some(49));
    }

    #[test]
    fn test_presets_validate() {
        for mode in [
            PerformanceMode::Auto,
            PerformanceMode::Performance,
            PerformanceMode::Quality,
        ] {
            LodConfig::for_mode(mode).validate().unwrap();
        }
        assert_eq!(LodConfig::for_mode(PerformanceMode::Performance).far.stride, 25);
        assert_eq!(LodConfig::for_mode(PerformanceMode::Quality).near.distance, 2.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = LodConfig::default();
        config.near.stride = 0;
        assert!(LodEngine::new(config).is_err());

        let mut config = LodConfig::default();
        config.medium.distance = 10.0;
        assert!(LodEngine::new(config).is_err());
    }

    #[test]
    fn test_adaptive_stride() {
        let engine = LodEngine::default();
        assert_eq!(engine.adaptive_stride(49_999), 1);
        assert_eq!(engine.adaptive_stride(50_000), 2);
        assert_eq!(engine.adaptive_stride(300_000), 5);
        assert_eq!(engine.adaptive_stride(5_000_000), 10);
    }

    #[test]
    fn test_render_stats_moving_average() {
        let stats = RenderStats::default()
            .record(Duration::from_millis(100))
            .record(Duration::from_millis(200));
        assert_eq!(stats.render_count, 2);
        assert_relative_eq!(stats.last_render_time, 0.2, epsilon = 1e-12);
        assert_relative_eq!(stats.average_render_time, 0.11, epsilon = 1e-12);

        let mut engine = LodEngine::default();
        assert!(engine.should_auto_adjust(&stats));
        engine.set_auto_mode(false);
        assert!(!engine.should_auto_adjust(&stats));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("Far".parse::<LodLevel>().unwrap(), LodLevel::Far);
        assert!("huge".parse::<LodLevel>().is_err());
    }
}
