//! Point cloud analysis core: level-of-detail decimation for interactive
//! rendering, height profiles along a line and cross-section extraction.
//!
//! Every engine takes the point set as a `[Point3]` slice plus optional
//! index-aligned attribute columns, and never mutates its inputs.

pub mod bounds;
pub mod cancel;
pub mod config;
pub mod cross_section;
pub mod error;
pub mod export;
pub mod lod;
pub mod point_set;
pub mod profile;
pub mod render;
pub mod spatial_index;

pub use bounds::PointCloudBounds;
pub use cancel::CancelToken;
pub use config::AnalysisConfig;
pub use cross_section::{
    CrossSectionConfig, CrossSectionExtractor, CrossSectionResult, SearchStrategy,
};
pub use error::{ProfilerError, Result};
pub use lod::{LodConfig, LodEngine, LodInfo, LodLevel, LodOutput, PerformanceMode, RenderStats};
pub use point_set::{AttributeColumn, AttributeTable, LineSegment, Point3};
pub use profile::{
    ProfileEngine, ProfileParams, ProfileResult, ProfileSample, ProfileSummary, calculate_profile,
};
pub use render::{CameraState, ColorMode, RenderBatch, RenderPreparer};
pub use spatial_index::{IndexDims, SpatialIndex};
