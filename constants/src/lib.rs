/// Shared constants for point cloud analysis
pub mod class;
pub mod lod;
pub mod profile;

pub use class::get_class_name;
