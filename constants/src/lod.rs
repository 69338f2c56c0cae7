//! Level-of-detail defaults, balanced ("auto") preset.
//!
//! Distance thresholds are camera distance divided by the scene's bounding box
//! diagonal. Strides keep every Nth point.

pub const FAR_DISTANCE: f64 = 5.0;
pub const MEDIUM_DISTANCE: f64 = 2.0;
pub const NEAR_DISTANCE: f64 = 1.0;
pub const CLOSE_DISTANCE: f64 = 0.5;

pub const FAR_STRIDE: usize = 20;
pub const MEDIUM_STRIDE: usize = 5;
pub const NEAR_STRIDE: usize = 2;
pub const CLOSE_STRIDE: usize = 1;

/// Aggressive preset favouring frame rate: (distance, stride) for far, medium, near, close
pub const PERFORMANCE_PRESET: [(f64, usize); 4] = [(3.0, 25), (1.5, 10), (0.8, 3), (0.3, 1)];

/// Conservative preset favouring visual quality
pub const QUALITY_PRESET: [(f64, usize); 4] = [(8.0, 10), (4.0, 3), (2.0, 2), (1.0, 1)];

/// Datasets below this size are always drawn at full detail
pub const SMALL_DATASET_POINTS: usize = 50_000;
pub const MEDIUM_DATASET_POINTS: usize = 200_000;
pub const LARGE_DATASET_POINTS: usize = 500_000;
pub const MASSIVE_DATASET_POINTS: usize = 1_000_000;

/// Point counts at or above this are drawn as flat points in auto mode
pub const SPHERE_RENDER_LIMIT: usize = 100_000;

/// Guard for relative distance division
pub const SCENE_SIZE_EPSILON: f64 = 1e-9;

/// Smoothing factor of the render time moving average
pub const RENDER_TIME_EMA_ALPHA: f64 = 0.1;

/// Frame budget (seconds) for smooth interaction
pub const TARGET_RENDER_TIME: f64 = 0.05;
