/// Prepares decimated points and colour payloads for a display surface
use crate::lod::{LodEngine, LodInfo, LodLevel, PerformanceMode, RenderStats};
use crate::point_set::{AttributeColumn, Point3};
use constants::lod::SPHERE_RENDER_LIMIT;
use log::debug;
use std::borrow::Cow;
use std::time::Instant;

/// The only camera facts the core consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Distance from the scene centre to the camera
    pub distance: f64,
    /// Bounding box diagonal of the scene
    pub scene_size: f64,
}

impl CameraState {
    pub fn new(distance: f64, scene_size: f64) -> Self {
        Self {
            distance,
            scene_size,
        }
    }

    /// Camera at `distance` from a scene made of `points`
    pub fn for_points(distance: f64, points: &[Point3]) -> Self {
        Self::new(distance, LodEngine::scene_size(points))
    }
}

/// How the display should colour the points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Scalars are RGB values, use as-is
    Direct,
    /// Scalars go through a colour map
    Colormap,
    /// No scalars, single colour
    Uniform,
}

#[derive(Debug, Clone)]
pub struct RenderBatch<'a> {
    pub points: Cow<'a, [Point3]>,
    pub scalars: Option<Cow<'a, AttributeColumn>>,
    pub color_mode: ColorMode,
    pub render_as_spheres: bool,
    pub lod: LodInfo,
}

#[derive(Debug, Clone, Default)]
pub struct RenderPreparer {
    lod: LodEngine,
    mode: PerformanceMode,
}

impl RenderPreparer {
    pub fn new(mode: PerformanceMode) -> Self {
        Self {
            lod: LodEngine::for_mode(mode),
            mode,
        }
    }

    pub fn with_engine(lod: LodEngine, mode: PerformanceMode) -> Self {
        Self { lod, mode }
    }

    pub fn lod(&self) -> &LodEngine {
        &self.lod
    }

    pub fn lod_mut(&mut self) -> &mut LodEngine {
        &mut self.lod
    }

    pub fn mode(&self) -> PerformanceMode {
        self.mode
    }

    /// Switch preset, replacing the threshold table but keeping the engine switches.
    pub fn set_mode(&mut self, mode: PerformanceMode) {
        let mut engine = LodEngine::for_mode(mode);
        engine.set_enabled(self.lod.is_enabled());
        engine.set_auto_mode(self.lod.is_auto_mode());
        self.lod = engine;
        self.mode = mode;
    }

    fn use_spheres(&self, point_count: usize) -> bool {
        match self.mode {
            PerformanceMode::Quality => true,
            PerformanceMode::Performance => false,
            PerformanceMode::Auto => point_count < SPHERE_RENDER_LIMIT,
        }
    }

    /// Decimate for the current camera and return the batch with updated telemetry.
    pub fn prepare<'a>(
        &self,
        points: &'a [Point3],
        scalars: Option<&'a AttributeColumn>,
        camera: CameraState,
        forced: Option<LodLevel>,
        stats: RenderStats,
    ) -> (RenderBatch<'a>, RenderStats) {
        let started = Instant::now();

        let level =
            self.lod
                .determine_level(points.len(), camera.distance, camera.scene_size, forced);
        let output = self.lod.apply(points, scalars, level);

        let color_mode = match output.scalars.as_deref() {
            Some(column) if column.is_colour() => ColorMode::Direct,
            Some(_) => ColorMode::Colormap,
            None => ColorMode::Uniform,
        };

        let stats = stats.record(started.elapsed());
        if self.lod.should_auto_adjust(&stats) {
            debug!(
                "[LOD] Average render time {:.1}ms above target",
                stats.average_render_time * 1000.0
            );
        }

        (
            RenderBatch {
                points: output.points,
                scalars: output.scalars,
                color_mode,
                render_as_spheres: self.use_spheres(points.len()),
                lod: output.info,
            },
            stats,
        )
    }
}
