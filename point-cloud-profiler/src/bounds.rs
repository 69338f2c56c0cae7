/// Axis-aligned bounds of a point set and the scene size derived from them
use crate::point_set::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Point counts above this are reduced in parallel chunks
const PARALLEL_BOUNDS_CHUNK: usize = 25_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Default for PointCloudBounds {
    fn default() -> Self {
        Self::new()
    }
}

impl PointCloudBounds {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
        }
    }

    /// Compute bounds over a whole point set, chunked across threads for large inputs.
    pub fn from_points(points: &[Point3]) -> Self {
        if points.len() <= PARALLEL_BOUNDS_CHUNK {
            let mut bounds = Self::new();
            for p in points {
                bounds.update(p[0], p[1], p[2]);
            }
            return bounds;
        }

        points
            .par_chunks(PARALLEL_BOUNDS_CHUNK)
            .map(|chunk| {
                let mut local_bounds = Self::new();
                for p in chunk {
                    local_bounds.update(p[0], p[1], p[2]);
                }
                local_bounds
            })
            .reduce_with(|mut a, b| {
                a.merge(&b);
                a
            })
            .unwrap_or_default()
    }

    /// Update bounds with a new point
    pub fn update(&mut self, x: f64, y: f64, z: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.min_z = self.min_z.min(z);
        self.max_z = self.max_z.max(z);
    }

    pub fn merge(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_z = self.max_z.max(other.max_z);
    }

    /// True once at least one finite point has been absorbed
    pub fn is_valid(&self) -> bool {
        [
            self.min_x, self.max_x, self.min_y, self.max_y, self.min_z, self.max_z,
        ]
        .iter()
        .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
            && self.min_z <= self.max_z
    }

    /// World space extent along each axis
    pub fn dimensions(&self) -> (f64, f64, f64) {
        (
            self.max_x - self.min_x,
            self.max_y - self.min_y,
            self.max_z - self.min_z,
        )
    }

    pub fn center(&self) -> Point3 {
        [
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
            (self.min_z + self.max_z) * 0.5,
        ]
    }

    /// Length of the min-to-max corner diagonal
    pub fn diagonal(&self) -> f64 {
        let (dx, dy, dz) = self.dimensions();
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}
