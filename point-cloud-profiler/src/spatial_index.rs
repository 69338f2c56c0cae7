//! Nearest-neighbour index over a point set.
//!
//! Backed by an R-tree so radius and nearest queries stay logarithmic for
//! multi-million point clouds. The planar variant ignores Z and measures
//! horizontal distance, which is what profiles and cross-sections need.

use crate::error::{ProfilerError, Result};
use crate::point_set::Point3;
use log::debug;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};

type PlanarEntry = GeomWithData<[f64; 2], usize>;
type VolumetricEntry = GeomWithData<[f64; 3], usize>;

/// Coordinates an index is built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexDims {
    /// X and Y only
    Planar,
    /// X, Y and Z
    Volumetric,
}

#[derive(Clone)]
enum Tree {
    Planar(RTree<PlanarEntry>),
    Volumetric(RTree<VolumetricEntry>),
}

/// Immutable snapshot index. Rebuild it when the underlying points change.
///
/// # Example
/// ```rust
/// use point_cloud_profiler::spatial_index::{IndexDims, SpatialIndex};
///
/// let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 9.0], [5.0, 5.0, 0.0]];
/// let index = SpatialIndex::build(&points, IndexDims::Planar).unwrap();
///
/// let mut near = index.query_radius(&[0.5, 0.0, 0.0], 0.5);
/// near.sort_unstable();
/// assert_eq!(near, vec![0, 1]);
/// ```
#[derive(Clone)]
pub struct SpatialIndex {
    tree: Tree,
    len: usize,
}

impl SpatialIndex {
    /// Build over `points`, identifying each entry by its position in the slice.
    pub fn build(points: &[Point3], dims: IndexDims) -> Result<Self> {
        if points.is_empty() {
            return Err(ProfilerError::IndexBuild);
        }

        let tree = match dims {
            IndexDims::Planar => Tree::Planar(RTree::bulk_load(
                points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| GeomWithData::new([p[0], p[1]], i))
                    .collect(),
            )),
            IndexDims::Volumetric => Tree::Volumetric(RTree::bulk_load(
                points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| GeomWithData::new(*p, i))
                    .collect(),
            )),
        };

        debug!("[INDEX] built {:?} index over {} points", dims, points.len());
        Ok(Self {
            tree,
            len: points.len(),
        })
    }

    pub fn dims(&self) -> IndexDims {
        match self.tree {
            Tree::Planar(_) => IndexDims::Planar,
            Tree::Volumetric(_) => IndexDims::Volumetric,
        }
    }

    /// Number of indexed points (never zero)
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Indices of all points within `radius` of `point`, boundary included.
    ///
    /// Order follows the tree's internal layout; treat the result as a set.
    pub fn query_radius(&self, point: &Point3, radius: f64) -> Vec<usize> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let radius_sq = radius * radius;

        match &self.tree {
            Tree::Planar(tree) => tree
                .locate_within_distance([point[0], point[1]], radius_sq)
                .map(|entry| entry.data)
                .collect(),
            Tree::Volumetric(tree) => tree
                .locate_within_distance(*point, radius_sq)
                .map(|entry| entry.data)
                .collect(),
        }
    }

    /// Closest point to `point` as (index, distance).
    pub fn query_nearest(&self, point: &Point3) -> Option<(usize, f64)> {
        self.query_k_nearest(point, 1).into_iter().next()
    }

    /// The `k` closest points as (index, distance), nearest first.
    pub fn query_k_nearest(&self, point: &Point3, k: usize) -> Vec<(usize, f64)> {
        match &self.tree {
            Tree::Planar(tree) => tree
                .nearest_neighbor_iter_with_distance_2(&[point[0], point[1]])
                .take(k)
                .map(|(entry, d2)| (entry.data, d2.sqrt()))
                .collect(),
            Tree::Volumetric(tree) => tree
                .nearest_neighbor_iter_with_distance_2(point)
                .take(k)
                .map(|(entry, d2)| (entry.data, d2.sqrt()))
                .collect(),
        }
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("dims", &self.dims())
            .field("len", &self.len)
            .finish()
    }
}
