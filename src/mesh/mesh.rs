//! Mesh component: geometry + submeshes with bounding lifecycle, facet
//! queries, collision parameters, and ray picking.

use glam::{Affine3A, Vec3};

use crate::collision::picking::PickingInfo;
use crate::collision::ray::Ray;
use crate::culling::{BoundingInfo, CullingStrategy, FrustumPlanes};
use crate::geometry::Geometry;
use crate::material::FillMode;
use crate::mesh::facet::{ClosestFacet, FacetData};
use crate::mesh::submesh::{SubMesh, SubMeshHit, TrianglePredicate};
use crate::scene::{LightKey, MaterialKey, MeshKey, NodeKey};

/// Mesh behavior variant, replacing subclass dispatch with a tagged enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshKind {
    /// Plain mesh with its own geometry.
    #[default]
    Regular,
    /// Instance sharing another mesh's geometry and bounds.
    Instance {
        /// The mesh this instance mirrors.
        source: MeshKey,
    },
    /// Line mesh; never ray-pickable.
    Lines,
}

/// Mesh component.
///
/// A mesh is referenced by a [`Node`](crate::scene::Node) for placement;
/// the component itself owns the CPU-side geometry, the submesh slices,
/// the bounding volumes, and the collision/picking parameters. Bounding
/// info is created lazily on first access and kept in sync with the owning
/// node's world matrix by the scene's post-compute hook (unless
/// `do_not_sync_bounding_info` is set).
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Display name.
    pub name: String,
    /// Behavior variant.
    pub kind: MeshKind,
    /// Back-reference to the owning node.
    pub node: Option<NodeKey>,

    /// CPU-side vertex/index data.
    pub geometry: Geometry,
    /// Material slot.
    pub material: Option<MaterialKey>,
    /// Render batches; one or more per mesh.
    pub sub_meshes: Vec<SubMesh>,

    /// Strategy used by the scene's frustum sweep for this mesh.
    pub culling_strategy: CullingStrategy,
    /// Suppresses bounding-info updates from the world-matrix hook.
    pub do_not_sync_bounding_info: bool,

    /// Whether ray picking considers this mesh.
    pub is_pickable: bool,
    /// Render opacity; picking and culling ignore it.
    pub visibility: f32,

    // === Collision parameters ===
    /// Whether `move_with_collisions` collides against this mesh.
    pub check_collisions: bool,
    /// Half extents of the collision ellipsoid.
    pub ellipsoid: Vec3,
    /// Offset of the ellipsoid center from the node origin.
    pub ellipsoid_offset: Vec3,
    /// Mask tested against other meshes' `collision_group`.
    pub collision_mask: u32,
    /// Group bits exposed to other meshes' `collision_mask`.
    pub collision_group: u32,

    /// Lights affecting this mesh, refreshed by the scene's light sweep.
    pub light_sources: Vec<LightKey>,

    bounding_info: Option<BoundingInfo>,
    facet_data: Option<FacetData>,
}

impl Mesh {
    /// Creates a mesh over `geometry` with one global submesh and bounding
    /// info computed from the position attribute (when present).
    #[must_use]
    pub fn new(name: &str, geometry: Geometry) -> Self {
        let mut mesh = Self {
            name: name.to_string(),
            kind: MeshKind::Regular,
            node: None,
            geometry,
            material: None,
            sub_meshes: Vec::new(),
            culling_strategy: CullingStrategy::default(),
            do_not_sync_bounding_info: false,
            is_pickable: true,
            visibility: 1.0,
            check_collisions: false,
            ellipsoid: Vec3::new(0.5, 1.0, 0.5),
            ellipsoid_offset: Vec3::ZERO,
            collision_mask: u32::MAX,
            collision_group: 1,
            light_sources: Vec::new(),
            bounding_info: None,
            facet_data: None,
        };
        mesh.create_global_submesh();
        mesh.refresh_bounding_info();
        mesh
    }

    /// Replaces all submeshes with a single one spanning the whole mesh.
    pub fn create_global_submesh(&mut self) {
        let total_vertices = self.geometry.total_vertices() as u32;
        let total_indices = self.geometry.total_indices() as u32;
        self.sub_meshes.clear();
        self.sub_meshes
            .push(SubMesh::new(0, 0, total_vertices, 0, total_indices));
    }

    /// Splits the index buffer into `count` contiguous submeshes (triangle
    /// granularity). A count of 0 or 1 recreates the global submesh.
    pub fn subdivide(&mut self, count: u32) {
        if count <= 1 {
            self.create_global_submesh();
            return;
        }

        let total_indices = self.geometry.total_indices() as u32;
        let total_vertices = self.geometry.total_vertices() as u32;
        if total_indices == 0 {
            return;
        }

        // Round each slice down to whole triangles
        let slice = (total_indices / count / 3) * 3;
        if slice == 0 {
            return;
        }

        self.sub_meshes.clear();
        let mut offset = 0;
        for i in 0..count {
            if offset >= total_indices {
                break;
            }
            let len = if i + 1 == count {
                total_indices - offset
            } else {
                slice.min(total_indices - offset)
            };
            let mut sub = SubMesh::new(0, 0, total_vertices, offset, len);
            sub.refresh_bounding_info(&self.geometry, &Affine3A::IDENTITY);
            self.sub_meshes.push(sub);
            offset += len;
        }
    }

    /// Appends an explicitly-constructed submesh after validating its index
    /// range against the geometry.
    pub fn add_sub_mesh(&mut self, mut sub: SubMesh) -> crate::errors::Result<()> {
        let len = self.geometry.total_indices();
        let start = sub.index_start;
        let end = start + sub.index_count;
        if len > 0 && end as usize > len {
            return Err(crate::errors::ParallaxError::SubMeshOutOfRange { start, end, len });
        }
        sub.refresh_bounding_info(&self.geometry, &Affine3A::IDENTITY);
        self.sub_meshes.push(sub);
        Ok(())
    }

    // ========================================================================
    // Bounding lifecycle
    // ========================================================================

    /// The mesh-level bounding info, if it exists yet.
    #[inline]
    #[must_use]
    pub fn bounding_info(&self) -> Option<&BoundingInfo> {
        self.bounding_info.as_ref()
    }

    /// Mutable access to the mesh-level bounding info.
    #[inline]
    #[must_use]
    pub fn bounding_info_mut(&mut self) -> Option<&mut BoundingInfo> {
        self.bounding_info.as_mut()
    }

    /// Installs an externally-built bounding info (e.g. shared from an
    /// instance source).
    pub fn set_bounding_info(&mut self, info: BoundingInfo) {
        self.bounding_info = Some(info);
    }

    /// Recomputes the bounding info from the geometry's position extremes,
    /// preserving the current world matrix. Geometry without positions
    /// leaves the bounding info untouched.
    pub fn refresh_bounding_info(&mut self) {
        let Some((minimum, maximum)) = self.geometry.extremes(0, 0) else {
            return;
        };

        let world = self
            .bounding_info
            .as_ref()
            .map(|info| *info.bounding_box.world_matrix());
        match &mut self.bounding_info {
            Some(info) => info.reconstruct(minimum, maximum, world),
            None => self.bounding_info = Some(BoundingInfo::new(minimum, maximum, None)),
        }

        let world = world.unwrap_or(Affine3A::IDENTITY);
        for sub in &mut self.sub_meshes {
            sub.refresh_bounding_info(&self.geometry, &world);
        }
    }

    /// World-matrix hook body: creates a degenerate point bound at the
    /// node's absolute position when no geometry bounds exist, otherwise
    /// updates the existing volumes, then propagates to submeshes.
    pub fn update_bounding_info(&mut self, world: &Affine3A, absolute_position: Vec3) {
        match &mut self.bounding_info {
            None => {
                self.bounding_info = Some(BoundingInfo::new(
                    absolute_position,
                    absolute_position,
                    None,
                ));
            }
            Some(info) => info.update(world),
        }
        self.update_submeshes_bounding_info(world);
    }

    fn update_submeshes_bounding_info(&mut self, world: &Affine3A) {
        let single = self.sub_meshes.len() == 1;
        let total_vertices = self.geometry.total_vertices() as u32;
        for sub in &mut self.sub_meshes {
            // A lone global submesh reuses the mesh's own bounding info
            if single && sub.is_global(total_vertices) {
                continue;
            }
            sub.update_bounding_info(world);
        }
    }

    /// Bounding info for one submesh: a lone global submesh returns the
    /// mesh's own bounding info (same object), others their own.
    #[must_use]
    pub fn submesh_bounding_info(&self, index: usize) -> Option<&BoundingInfo> {
        let sub = self.sub_meshes.get(index)?;
        let total_vertices = self.geometry.total_vertices() as u32;
        if self.sub_meshes.len() == 1 && sub.is_global(total_vertices) {
            self.bounding_info.as_ref()
        } else {
            sub.own_bounding_info()
        }
    }

    /// Scale factor that would fit the mesh's local bounds into a unit cube,
    /// or `None` for degenerate (zero max dimension) bounds — a silent
    /// no-op for the caller, not an error.
    #[must_use]
    pub fn unit_cube_scale(&self) -> Option<f32> {
        let info = self.bounding_info.as_ref()?;
        let size = info.maximum() - info.minimum();
        let max_dimension = size.x.max(size.y).max(size.z);
        if max_dimension <= 0.0 {
            return None;
        }
        Some(1.0 / max_dimension)
    }

    // ========================================================================
    // Culling
    // ========================================================================

    /// Frustum test using this mesh's culling strategy.
    #[must_use]
    pub fn is_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        self.bounding_info
            .as_ref()
            .is_some_and(|info| info.is_in_frustum(planes, self.culling_strategy))
    }

    /// Strict frustum containment.
    #[must_use]
    pub fn is_completely_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        self.bounding_info
            .as_ref()
            .is_some_and(|info| info.is_completely_in_frustum(planes))
    }

    /// Bounding-volume overlap with another mesh; `precise` switches the
    /// box-box test to SAT.
    #[must_use]
    pub fn intersects_mesh(&self, other: &Mesh, precise: bool) -> bool {
        match (&self.bounding_info, &other.bounding_info) {
            (Some(a), Some(b)) => a.intersects(b, precise),
            // Missing bounds on either side: benign, report no intersection
            _ => false,
        }
    }

    /// World-space point containment.
    #[must_use]
    pub fn intersects_point(&self, point: Vec3) -> bool {
        self.bounding_info
            .as_ref()
            .is_some_and(|info| info.intersects_point(point))
    }

    // ========================================================================
    // Ray picking
    // ========================================================================

    /// Picks this mesh with a world-space ray.
    ///
    /// Rejects early on the bounding sphere and box, then walks submeshes
    /// (submesh-level bounds prune when there are several), transforming the
    /// ray into local space for the triangle tests. `fast_check` returns the
    /// first hit instead of the closest.
    #[must_use]
    pub fn intersects_ray(
        &self,
        world: &Affine3A,
        ray: &Ray,
        fill_mode: FillMode,
        fast_check: bool,
        predicate: Option<TrianglePredicate<'_>>,
    ) -> PickingInfo {
        if matches!(self.kind, MeshKind::Lines) {
            return PickingInfo::miss();
        }

        let Some(info) = &self.bounding_info else {
            return PickingInfo::miss();
        };
        if !ray.intersects_sphere(&info.bounding_sphere) || !ray.intersects_box(&info.bounding_box)
        {
            return PickingInfo::miss();
        }

        let Some(positions) = self.geometry.positions() else {
            return PickingInfo::miss();
        };
        let indices = self.geometry.indices();

        let local_ray = ray.transformed(&world.inverse());
        let many = self.sub_meshes.len() > 1;

        let mut best: Option<(SubMeshHit, usize)> = None;
        for (index, sub) in self.sub_meshes.iter().enumerate() {
            if many
                && let Some(sub_info) = self.submesh_bounding_info(index)
                && !ray.intersects_sphere(&sub_info.bounding_sphere)
            {
                continue;
            }

            let Some(hit) =
                sub.intersects(&local_ray, positions, indices, fill_mode, fast_check, predicate)
            else {
                continue;
            };

            let closer = best.is_none_or(|(b, _)| hit.distance < b.distance);
            if closer {
                best = Some((hit, index));
                if fast_check {
                    break;
                }
            }
        }

        let Some((hit, submesh_id)) = best else {
            return PickingInfo::miss();
        };

        let local_point = local_ray.at(hit.distance);
        let world_point = world.transform_point3(local_point);

        PickingInfo {
            hit: true,
            distance: world_point.distance(ray.origin),
            picked_point: Some(world_point),
            picked_node: self.node,
            submesh_id,
            face_id: Some(hit.face_id),
            bu: hit.bu,
            bv: hit.bv,
        }
    }

    // ========================================================================
    // Facet data
    // ========================================================================

    /// Whether facet data has been built.
    #[inline]
    #[must_use]
    pub fn has_facet_data(&self) -> bool {
        self.facet_data.is_some()
    }

    /// The facet cache, if built.
    #[inline]
    #[must_use]
    pub fn facet_data(&self) -> Option<&FacetData> {
        self.facet_data.as_ref()
    }

    /// Mutable facet cache for parameter tweaks before an update.
    pub fn facet_data_mut(&mut self) -> &mut FacetData {
        self.facet_data.get_or_insert_with(FacetData::new)
    }

    /// (Re)builds facet positions/normals and the partition grid from the
    /// current geometry. `depth_sort_from` enables the depth-sorted index
    /// buffer, sorted from that local-space reference point.
    pub fn update_facet_data(&mut self, depth_sort_from: Option<Vec3>) {
        let Some((minimum, maximum)) = self.geometry.extremes(0, 0) else {
            return;
        };
        // Split borrows: facet cache on one side, geometry on the other
        let facet_data = self.facet_data.get_or_insert_with(FacetData::new);
        let Some(positions) = self.geometry.positions() else {
            return;
        };
        facet_data.update(
            positions,
            self.geometry.indices(),
            minimum,
            maximum,
            depth_sort_from,
        );
    }

    /// Nearest facet to a local-space point; `None` when facet data is not
    /// built or the point lies outside the partitioning volume.
    #[must_use]
    pub fn closest_facet_at_local_coordinates(
        &self,
        point: Vec3,
        facing: Option<bool>,
    ) -> Option<ClosestFacet> {
        self.facet_data
            .as_ref()?
            .closest_facet_at_local_coordinates(point, facing)
    }

    /// Drops the facet cache.
    pub fn dispose_facet_data(&mut self) {
        self.facet_data = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::VertexKind;

    fn quad_mesh() -> Mesh {
        let mut geometry = Geometry::new();
        geometry
            .set_vertices_data(
                VertexKind::Position,
                vec![
                    0.0, 0.0, 0.0, //
                    1.0, 0.0, 0.0, //
                    1.0, 1.0, 0.0, //
                    0.0, 1.0, 0.0,
                ],
                false,
            )
            .unwrap();
        geometry.set_indices(vec![0, 1, 2, 0, 2, 3]);
        Mesh::new("quad", geometry)
    }

    #[test]
    fn new_mesh_gets_global_submesh_and_bounds() {
        let mesh = quad_mesh();
        assert_eq!(mesh.sub_meshes.len(), 1);
        assert!(mesh.sub_meshes[0].is_global(4));

        let info = mesh.bounding_info().unwrap();
        assert_eq!(info.minimum(), Vec3::ZERO);
        assert_eq!(info.maximum(), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn global_submesh_shares_mesh_bounding_info() {
        let mesh = quad_mesh();
        let mesh_info = mesh.bounding_info().unwrap();
        let sub_info = mesh.submesh_bounding_info(0).unwrap();
        assert!(
            std::ptr::eq(mesh_info, sub_info),
            "global submesh must defer to the mesh's own bounding info"
        );
    }

    #[test]
    fn subdivide_creates_per_range_bounds() {
        let mut mesh = quad_mesh();
        mesh.subdivide(2);
        assert_eq!(mesh.sub_meshes.len(), 2);
        assert_eq!(mesh.sub_meshes[0].index_start, 0);
        assert_eq!(mesh.sub_meshes[0].index_count, 3);
        assert_eq!(mesh.sub_meshes[1].index_start, 3);
        assert_eq!(mesh.sub_meshes[1].index_count, 3);

        // Subdivided submeshes carry their own bounding info
        assert!(mesh.sub_meshes[0].own_bounding_info().is_some());
    }

    #[test]
    fn pick_returns_world_hit() {
        let mut mesh = quad_mesh();
        let world = Affine3A::from_translation(Vec3::new(0.0, 0.0, -5.0));
        mesh.update_bounding_info(&world, Vec3::new(0.0, 0.0, -5.0));

        let ray = Ray::new(Vec3::new(0.7, 0.2, 0.0), Vec3::NEG_Z, 100.0);
        let pick = mesh.intersects_ray(&world, &ray, FillMode::TriangleList, false, None);

        assert!(pick.hit);
        assert!((pick.distance - 5.0).abs() < 1e-4);
        let point = pick.picked_point.unwrap();
        assert!((point - Vec3::new(0.7, 0.2, -5.0)).length() < 1e-4);
        assert_eq!(pick.face_id, Some(0));
    }

    #[test]
    fn pick_misses_outside_bounds() {
        let mut mesh = quad_mesh();
        mesh.update_bounding_info(&Affine3A::IDENTITY, Vec3::ZERO);

        let ray = Ray::new(Vec3::new(10.0, 10.0, 1.0), Vec3::NEG_Z, 100.0);
        let pick = mesh.intersects_ray(
            &Affine3A::IDENTITY,
            &ray,
            FillMode::TriangleList,
            false,
            None,
        );
        assert!(!pick.hit);
    }

    #[test]
    fn lines_meshes_are_never_picked() {
        let mut mesh = quad_mesh();
        mesh.kind = MeshKind::Lines;
        mesh.update_bounding_info(&Affine3A::IDENTITY, Vec3::ZERO);

        let ray = Ray::new(Vec3::new(0.5, 0.25, 1.0), Vec3::NEG_Z, 100.0);
        let pick = mesh.intersects_ray(
            &Affine3A::IDENTITY,
            &ray,
            FillMode::TriangleList,
            false,
            None,
        );
        assert!(!pick.hit);
    }

    #[test]
    fn unit_cube_scale_handles_degenerate_bounds() {
        let mesh = quad_mesh();
        let scale = mesh.unit_cube_scale().unwrap();
        assert!((scale - 1.0).abs() < 1e-6);

        let empty = Mesh::new("empty", Geometry::new());
        assert!(empty.bounding_info().is_none());
        assert!(empty.unit_cube_scale().is_none());
    }

    #[test]
    fn mesh_mesh_intersection_uses_bounds() {
        let mut a = quad_mesh();
        a.update_bounding_info(&Affine3A::IDENTITY, Vec3::ZERO);

        let mut b = quad_mesh();
        let far = Affine3A::from_translation(Vec3::splat(10.0));
        b.update_bounding_info(&far, Vec3::splat(10.0));

        assert!(!a.intersects_mesh(&b, false));

        let near = Affine3A::from_translation(Vec3::new(0.5, 0.5, 0.0));
        b.update_bounding_info(&near, Vec3::new(0.5, 0.5, 0.0));
        assert!(a.intersects_mesh(&b, false));
        assert!(a.intersects_mesh(&b, true));
    }
}
