//! SubMesh: a contiguous vertex/index range of a mesh with its own bounding
//! info and ray-intersection routines.

use glam::{Affine3A, Vec3};

use crate::collision::ray::{Ray, TriangleHit};
use crate::culling::BoundingInfo;
use crate::geometry::Geometry;
use crate::material::FillMode;

/// Primitive-restart marker in triangle strips.
const STRIP_RESTART: u32 = 0xFFFF_FFFF;

/// Triangle predicate for picking: receives the three local-space vertices
/// and the local-space ray, returns whether the triangle may be picked.
pub type TrianglePredicate<'a> = &'a dyn Fn(Vec3, Vec3, Vec3, &Ray) -> bool;

/// Hit record produced by [`SubMesh::intersects`], in local space.
#[derive(Debug, Clone, Copy)]
pub struct SubMeshHit {
    /// Parametric distance along the (local) ray.
    pub distance: f32,
    /// Triangle id: ordinal for triangle lists, index position for strips.
    pub face_id: usize,
    /// Barycentric weight of the second vertex.
    pub bu: f32,
    /// Barycentric weight of the third vertex.
    pub bv: f32,
}

/// A contiguous slice of a mesh's vertex/index buffers rendered with one
/// material, enabling multi-material meshes.
///
/// A submesh spanning the whole mesh (`is_global`) defers to the mesh's own
/// bounding info instead of carrying its own; see
/// `Mesh::submesh_bounding_info`.
#[derive(Debug, Clone)]
pub struct SubMesh {
    /// Index into the owning mesh's material slot list.
    pub material_index: u32,
    /// First vertex covered by this submesh.
    pub vertices_start: u32,
    /// Number of vertices covered.
    pub vertices_count: u32,
    /// First index covered.
    pub index_start: u32,
    /// Number of indices covered.
    pub index_count: u32,

    bounding_info: Option<BoundingInfo>,
    effect_dirty: bool,
    cached_material_version: u64,
}

impl SubMesh {
    /// Creates a submesh over the given ranges. Bounding info is populated
    /// by `refresh_bounding_info`.
    #[must_use]
    pub fn new(
        material_index: u32,
        vertices_start: u32,
        vertices_count: u32,
        index_start: u32,
        index_count: u32,
    ) -> Self {
        Self {
            material_index,
            vertices_start,
            vertices_count,
            index_start,
            index_count,
            bounding_info: None,
            effect_dirty: true,
            cached_material_version: 0,
        }
    }

    /// A submesh is global when it spans every vertex of the mesh.
    #[inline]
    #[must_use]
    pub fn is_global(&self, total_vertices: u32) -> bool {
        self.vertices_start == 0 && self.vertices_count == total_vertices
    }

    // ========================================================================
    // Bounding info
    // ========================================================================

    /// This submesh's own bounding info, if it carries one.
    #[inline]
    #[must_use]
    pub fn own_bounding_info(&self) -> Option<&BoundingInfo> {
        self.bounding_info.as_ref()
    }

    /// Rebuilds the bounding info from the submesh's vertex range.
    ///
    /// Meshes without positions keep whatever bounding info was there (a
    /// degenerate range is not an error).
    pub fn refresh_bounding_info(&mut self, geometry: &Geometry, world: &Affine3A) {
        let Some((minimum, maximum)) =
            geometry.extremes(self.vertices_start as usize, self.vertices_count as usize)
        else {
            return;
        };

        match &mut self.bounding_info {
            Some(info) => info.reconstruct(minimum, maximum, Some(*world)),
            None => self.bounding_info = Some(BoundingInfo::new(minimum, maximum, Some(*world))),
        }
    }

    /// Updates the world-space bounding fields after a transform change.
    pub fn update_bounding_info(&mut self, world: &Affine3A) {
        if let Some(info) = &mut self.bounding_info {
            info.update(world);
        }
    }

    // ========================================================================
    // Material dirty protocol
    // ========================================================================

    /// Whether the cached effect must be rebuilt before the next draw.
    #[inline]
    #[must_use]
    pub fn is_effect_dirty(&self) -> bool {
        self.effect_dirty
    }

    /// Material version the cached effect was built against.
    #[inline]
    #[must_use]
    pub fn cached_material_version(&self) -> u64 {
        self.cached_material_version
    }

    /// Marks the cached effect stale for the given material version.
    pub fn mark_effect_dirty(&mut self, material_version: u64) {
        self.effect_dirty = true;
        self.cached_material_version = material_version;
    }

    /// Clears the dirty flag once the effect has been rebuilt.
    pub fn clear_effect_dirty(&mut self) {
        self.effect_dirty = false;
    }

    // ========================================================================
    // Ray intersection
    // ========================================================================

    /// Tests a local-space ray against this submesh's triangles.
    ///
    /// Dispatch follows the material fill mode: point and line modes are not
    /// pickable and return `None`; triangle strips walk indices with step 1,
    /// skipping primitive-restart markers; triangle lists walk with step 3.
    /// With `fast_check` the first hit wins; otherwise the strictly closest
    /// hit is kept.
    #[must_use]
    pub fn intersects(
        &self,
        ray: &Ray,
        positions: &[Vec3],
        indices: &[u32],
        fill_mode: FillMode,
        fast_check: bool,
        predicate: Option<TrianglePredicate<'_>>,
    ) -> Option<SubMeshHit> {
        match fill_mode {
            FillMode::PointList | FillMode::LineList => None,
            FillMode::TriangleStrip => {
                self.intersects_strip(ray, positions, indices, fast_check, predicate)
            }
            FillMode::TriangleList => {
                self.intersects_list(ray, positions, indices, fast_check, predicate)
            }
        }
    }

    fn intersects_list(
        &self,
        ray: &Ray,
        positions: &[Vec3],
        indices: &[u32],
        fast_check: bool,
        predicate: Option<TrianglePredicate<'_>>,
    ) -> Option<SubMeshHit> {
        let mut best: Option<SubMeshHit> = None;

        if indices.is_empty() {
            // Unindexed geometry: the vertex range itself is the triangle list
            let start = self.vertices_start as usize;
            let end = (start + self.vertices_count as usize).min(positions.len());
            let mut i = start;
            while i + 2 < end {
                let (v0, v1, v2) = (positions[i], positions[i + 1], positions[i + 2]);
                if let Some(hit) = self.test_triangle(ray, v0, v1, v2, (i - start) / 3, predicate) {
                    if fast_check {
                        return Some(hit);
                    }
                    if best.is_none_or(|b| hit.distance < b.distance) {
                        best = Some(hit);
                    }
                }
                i += 3;
            }
            return best;
        }

        let start = self.index_start as usize;
        let end = (start + self.index_count as usize).min(indices.len());

        let mut i = start;
        while i + 2 < end {
            let ia = indices[i] as usize;
            let ib = indices[i + 1] as usize;
            let ic = indices[i + 2] as usize;
            i += 3;

            let (Some(&v0), Some(&v1), Some(&v2)) =
                (positions.get(ia), positions.get(ib), positions.get(ic))
            else {
                continue;
            };

            if let Some(hit) = self.test_triangle(ray, v0, v1, v2, (i - 3 - start) / 3, predicate) {
                if fast_check {
                    return Some(hit);
                }
                if best.is_none_or(|b| hit.distance < b.distance) {
                    best = Some(hit);
                }
            }
        }

        best
    }

    fn intersects_strip(
        &self,
        ray: &Ray,
        positions: &[Vec3],
        indices: &[u32],
        fast_check: bool,
        predicate: Option<TrianglePredicate<'_>>,
    ) -> Option<SubMeshHit> {
        let mut best: Option<SubMeshHit> = None;

        let start = self.index_start as usize;
        let end = (start + self.index_count as usize).min(indices.len());

        for i in start..end.saturating_sub(2) {
            let ic = indices[i + 2];
            if ic == STRIP_RESTART {
                // Degenerate strip marker
                continue;
            }
            let ia = indices[i] as usize;
            let ib = indices[i + 1] as usize;
            let ic = ic as usize;

            let (Some(&v0), Some(&v1), Some(&v2)) =
                (positions.get(ia), positions.get(ib), positions.get(ic))
            else {
                continue;
            };

            if let Some(hit) = self.test_triangle(ray, v0, v1, v2, i - start, predicate) {
                if fast_check {
                    return Some(hit);
                }
                if best.is_none_or(|b| hit.distance < b.distance) {
                    best = Some(hit);
                }
            }
        }

        best
    }

    fn test_triangle(
        &self,
        ray: &Ray,
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        face_id: usize,
        predicate: Option<TrianglePredicate<'_>>,
    ) -> Option<SubMeshHit> {
        if let Some(predicate) = predicate
            && !predicate(v0, v1, v2, ray)
        {
            return None;
        }

        let TriangleHit { bu, bv, distance } = ray.intersects_triangle(v0, v1, v2)?;
        Some(SubMeshHit {
            distance,
            face_id,
            bu,
            bv,
        })
    }
}
