//! Facet data: per-triangle normals/positions and a uniform-grid partition
//! for fast nearest-facet queries, plus optional depth-sorted indices for
//! alpha-blended draw order.

use glam::Vec3;
use smallvec::SmallVec;

/// Result of a closest-facet query.
#[derive(Debug, Clone, Copy)]
pub struct ClosestFacet {
    /// Facet index (triangle ordinal in the index buffer).
    pub index: u32,
    /// The query point projected onto the facet's plane.
    pub projected: Vec3,
    /// Squared distance from the query point to the projection.
    pub distance_sq: f32,
}

/// Per-facet cache over a triangle mesh, partitioned into a uniform 3D grid
/// sized relative to the local bounding box.
///
/// The subdivision count per axis is proportional to that axis's extent
/// relative to the largest extent, so thin meshes get fewer subdivisions on
/// the thin axis. Each facet is inserted into the cells of its three
/// vertices plus its centroid cell (deduplicated when they coincide).
#[derive(Debug, Clone)]
pub struct FacetData {
    /// Facet centroids, one per triangle.
    positions: Vec<Vec3>,
    /// Facet normals, one per triangle.
    normals: Vec<Vec3>,
    /// Grid cells, each holding the facet indices that touch it.
    partitioning: Vec<Vec<u32>>,
    /// Cells per axis.
    subdiv: [u32; 3],
    /// Lower corner of the (inflated) partitioning volume.
    bias: Vec3,
    /// Size of the (inflated) partitioning volume.
    scaled_size: Vec3,

    /// Requested subdivisions along the largest axis.
    pub partitioning_subdivisions: u32,
    /// Inflation ratio applied to the bounding box so border facets land
    /// inside the grid.
    pub partitioning_bbox_ratio: f32,

    /// Index buffer reordered by descending distance when depth sort is on.
    depth_sorted_indices: Vec<u32>,
}

impl Default for FacetData {
    fn default() -> Self {
        Self::new()
    }
}

impl FacetData {
    /// Empty facet data with default partitioning parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            partitioning: Vec::new(),
            subdiv: [1, 1, 1],
            bias: Vec3::ZERO,
            scaled_size: Vec3::ONE,
            partitioning_subdivisions: 10,
            partitioning_bbox_ratio: 1.01,
            depth_sorted_indices: Vec::new(),
        }
    }

    /// Number of facets currently cached.
    #[inline]
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.positions.len()
    }

    /// Facet centroids.
    #[inline]
    #[must_use]
    pub fn facet_positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Facet normals.
    #[inline]
    #[must_use]
    pub fn facet_normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Depth-sorted index buffer from the last update, empty when depth
    /// sorting was not requested.
    #[inline]
    #[must_use]
    pub fn depth_sorted_indices(&self) -> &[u32] {
        &self.depth_sorted_indices
    }

    /// Cells per axis chosen by the last update.
    #[inline]
    #[must_use]
    pub fn subdivisions(&self) -> [u32; 3] {
        self.subdiv
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Recomputes facet normals/positions and rebuilds the partition grid
    /// from the local bounding extents.
    ///
    /// When `depth_sort_from` is set, a reordered index buffer sorted by
    /// descending squared distance from that (local-space) point is rebuilt
    /// as well.
    pub fn update(
        &mut self,
        positions: &[Vec3],
        indices: &[u32],
        minimum: Vec3,
        maximum: Vec3,
        depth_sort_from: Option<Vec3>,
    ) {
        let facet_count = indices.len() / 3;
        self.positions.clear();
        self.normals.clear();
        self.positions.reserve(facet_count);
        self.normals.reserve(facet_count);

        // Subdivisions proportional to each axis's share of the largest extent
        let bb_size = maximum - minimum;
        let bb_size_max = bb_size.x.max(bb_size.y).max(bb_size.z);
        let subdivisions = self.partitioning_subdivisions as f32;
        let subdiv_for = |extent: f32| -> u32 {
            if bb_size_max <= 0.0 {
                return 1;
            }
            ((subdivisions * extent / bb_size_max).round() as u32).max(1)
        };
        self.subdiv = [
            subdiv_for(bb_size.x),
            subdiv_for(bb_size.y),
            subdiv_for(bb_size.z),
        ];

        let ratio = self.partitioning_bbox_ratio;
        let center = (minimum + maximum) * 0.5;
        self.scaled_size = bb_size * ratio;
        self.bias = center - self.scaled_size * 0.5;

        let cell_count = (self.subdiv[0] * self.subdiv[1] * self.subdiv[2]) as usize;
        self.partitioning.clear();
        self.partitioning.resize(cell_count, Vec::new());

        for (facet, triangle) in indices.chunks_exact(3).enumerate() {
            let (Some(&v0), Some(&v1), Some(&v2)) = (
                positions.get(triangle[0] as usize),
                positions.get(triangle[1] as usize),
                positions.get(triangle[2] as usize),
            ) else {
                self.positions.push(Vec3::ZERO);
                self.normals.push(Vec3::ZERO);
                continue;
            };

            let centroid = (v0 + v1 + v2) / 3.0;
            let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
            self.positions.push(centroid);
            self.normals.push(normal);

            // Insert into the cells of the three vertices plus the centroid,
            // deduplicated when they coincide
            let mut cells: SmallVec<[usize; 4]> = SmallVec::new();
            for point in [v0, v1, v2, centroid] {
                if let Some(cell) = self.cell_of(point)
                    && !cells.contains(&cell)
                {
                    cells.push(cell);
                }
            }
            for cell in cells {
                self.partitioning[cell].push(facet as u32);
            }
        }

        self.depth_sorted_indices.clear();
        if let Some(origin) = depth_sort_from {
            self.rebuild_depth_sorted_indices(indices, origin);
        }
    }

    /// Reorders whole facets by descending squared distance from `origin`,
    /// producing a draw-ready index buffer for alpha blending.
    fn rebuild_depth_sorted_indices(&mut self, indices: &[u32], origin: Vec3) {
        let mut order: Vec<u32> = (0..self.positions.len() as u32).collect();
        order.sort_unstable_by(|a, b| {
            let da = self.positions[*a as usize].distance_squared(origin);
            let db = self.positions[*b as usize].distance_squared(origin);
            db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
        });

        self.depth_sorted_indices.reserve(indices.len());
        for facet in order {
            let base = facet as usize * 3;
            if base + 2 < indices.len() {
                self.depth_sorted_indices
                    .extend_from_slice(&indices[base..base + 3]);
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Grid cell containing a local-space point, or `None` outside the
    /// partitioning volume.
    #[must_use]
    pub fn cell_of(&self, point: Vec3) -> Option<usize> {
        let relative = point - self.bias;

        let mut cell = [0u32; 3];
        for axis in 0..3 {
            let extent = self.scaled_size[axis];
            if extent <= 0.0 {
                cell[axis] = 0;
                continue;
            }
            let coord = relative[axis] * self.subdiv[axis] as f32 / extent;
            if coord < 0.0 || coord > self.subdiv[axis] as f32 {
                return None;
            }
            cell[axis] = (coord.floor() as u32).min(self.subdiv[axis] - 1);
        }

        Some(
            (cell[0] + self.subdiv[0] * cell[1] + self.subdiv[0] * self.subdiv[1] * cell[2])
                as usize,
        )
    }

    /// Facet indices sharing the query point's grid cell.
    #[must_use]
    pub fn facets_at_local_coordinates(&self, point: Vec3) -> Option<&[u32]> {
        let cell = self.cell_of(point)?;
        Some(&self.partitioning[cell])
    }

    /// Nearest facet to a local-space point, restricted to the point's grid
    /// cell: the query is projected onto each candidate facet's plane and
    /// the minimum-distance match wins.
    ///
    /// `facing`: `Some(true)` keeps only facets whose normal points toward
    /// the query side, `Some(false)` only facets pointing away.
    #[must_use]
    pub fn closest_facet_at_local_coordinates(
        &self,
        point: Vec3,
        facing: Option<bool>,
    ) -> Option<ClosestFacet> {
        let candidates = self.facets_at_local_coordinates(point)?;

        let mut best: Option<ClosestFacet> = None;
        for &facet in candidates {
            let normal = self.normals[facet as usize];
            let position = self.positions[facet as usize];

            let side = normal.dot(point - position);
            match facing {
                Some(true) if side < 0.0 => continue,
                Some(false) if side >= 0.0 => continue,
                _ => {}
            }

            let projected = point - normal * side;
            let distance_sq = point.distance_squared(projected);

            if best.is_none_or(|b| distance_sq < b.distance_sq) {
                best = Some(ClosestFacet {
                    index: facet,
                    projected,
                    distance_sq,
                });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit quad in the XY plane, two facets.
    fn quad() -> (Vec<Vec3>, Vec<u32>) {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        (positions, indices)
    }

    #[test]
    fn centroid_cell_contains_facet() {
        let (positions, indices) = quad();
        let mut data = FacetData::new();
        data.update(&positions, &indices, Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), None);

        for facet in 0..data.facet_count() {
            let centroid = data.facet_positions()[facet];
            let cell = data
                .cell_of(centroid)
                .expect("centroid must be inside the grid");
            assert!(
                data.partitioning[cell].contains(&(facet as u32)),
                "facet {facet} missing from its centroid cell"
            );
        }
    }

    #[test]
    fn thin_axis_gets_fewer_subdivisions() {
        let (positions, indices) = quad();
        let mut data = FacetData::new();
        // Flat in Z: the Z axis collapses to a single subdivision
        data.update(&positions, &indices, Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), None);

        let subdiv = data.subdivisions();
        assert_eq!(subdiv[2], 1);
        assert!(subdiv[0] > 1);
        assert_eq!(subdiv[0], subdiv[1]);
    }

    #[test]
    fn closest_facet_projects_onto_plane() {
        let (positions, indices) = quad();
        let mut data = FacetData::new();
        data.update(&positions, &indices, Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), None);

        // Slightly above the first triangle's centroid
        let query = data.facet_positions()[0] + Vec3::new(0.0, 0.0, 0.2);
        let closest = data
            .closest_facet_at_local_coordinates(query, None)
            .expect("query inside the grid");
        assert_eq!(closest.index, 0);
        assert!((closest.projected.z).abs() < 1e-6);
        assert!((closest.distance_sq - 0.04).abs() < 1e-5);
    }

    #[test]
    fn facing_filter_rejects_back_side() {
        let (positions, indices) = quad();
        let mut data = FacetData::new();
        data.update(&positions, &indices, Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), None);

        // Quad normals point +Z; a query above faces them, below does not
        let above = data.facet_positions()[0] + Vec3::new(0.0, 0.0, 0.2);
        assert!(
            data.closest_facet_at_local_coordinates(above, Some(true))
                .is_some()
        );
        assert!(
            data.closest_facet_at_local_coordinates(above, Some(false))
                .is_none()
        );
    }

    #[test]
    fn depth_sort_orders_far_facets_first() {
        let (positions, indices) = quad();
        let mut data = FacetData::new();
        // Sort from a point close to the second facet's centroid
        let origin = Vec3::new(0.2, 0.8, 0.0);
        data.update(
            &positions,
            &indices,
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 0.0),
            Some(origin),
        );

        let sorted = data.depth_sorted_indices();
        assert_eq!(sorted.len(), indices.len());
        // Facet 0 (farther from origin) must come first
        assert_eq!(&sorted[0..3], &indices[0..3]);
        assert_eq!(&sorted[3..6], &indices[3..6]);
    }
}
