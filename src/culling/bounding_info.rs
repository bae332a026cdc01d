//! Box + sphere pairing with strategy-driven culling and SAT intersection.

use glam::{Affine3A, Vec3};

use crate::culling::bounding_box::BoundingBox;
use crate::culling::bounding_sphere::BoundingSphere;
use crate::culling::frustum::FrustumPlanes;

/// Strategy applied by [`BoundingInfo::is_in_frustum`].
///
/// The inclusion variants first test whether the sphere center alone is
/// inside the frustum and accept immediately when it is; the sphere-only
/// variants skip the box test after the sphere exclusion test passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullingStrategy {
    /// Sphere exclusion test, then the full box test.
    #[default]
    Standard,
    /// Sphere exclusion test only — fastest, loosest.
    BoundingSphereOnly,
    /// Center-inclusion fast accept, then the standard path.
    OptimisticInclusion,
    /// Center-inclusion fast accept, then sphere-only.
    OptimisticInclusionThenSphereOnly,
}

/// Projection interval of a box onto a candidate separation axis.
///
/// Both intervals of a SAT axis test live on the caller's stack, so overlap
/// tests can nest freely; there is no shared scratch state to alias.
#[derive(Debug, Clone, Copy)]
struct Interval {
    min: f32,
    max: f32,
}

fn project_box(bbox: &BoundingBox, axis: Vec3) -> Interval {
    let center = bbox.center_world.dot(axis);
    let extent = bbox.directions[0].dot(axis).abs() * bbox.extend_size.x
        + bbox.directions[1].dot(axis).abs() * bbox.extend_size.y
        + bbox.directions[2].dot(axis).abs() * bbox.extend_size.z;

    Interval {
        min: center - extent,
        max: center + extent,
    }
}

fn axis_overlap(axis: Vec3, box0: &BoundingBox, box1: &BoundingBox) -> bool {
    let i0 = project_box(box0, axis);
    let i1 = project_box(box1, axis);
    !(i0.min > i1.max || i1.min > i0.max)
}

/// Composed bounding volume: a [`BoundingBox`] and a [`BoundingSphere`]
/// always built from the same min/max pair and world matrix.
#[derive(Debug, Clone)]
pub struct BoundingInfo {
    /// The oriented box component.
    pub bounding_box: BoundingBox,
    /// The sphere component.
    pub bounding_sphere: BoundingSphere,
    is_locked: bool,
}

impl BoundingInfo {
    /// Builds both volumes from one min/max pair.
    #[must_use]
    pub fn new(minimum: Vec3, maximum: Vec3, world_matrix: Option<Affine3A>) -> Self {
        Self {
            bounding_box: BoundingBox::new(minimum, maximum, world_matrix),
            bounding_sphere: BoundingSphere::new(minimum, maximum, world_matrix),
            is_locked: false,
        }
    }

    /// Rebuilds both volumes from a new min/max pair, keeping them in sync.
    pub fn reconstruct(&mut self, minimum: Vec3, maximum: Vec3, world_matrix: Option<Affine3A>) {
        self.bounding_box.reconstruct(minimum, maximum, world_matrix);
        self.bounding_sphere
            .reconstruct(minimum, maximum, world_matrix);
    }

    /// Local-space minimum shared by both volumes.
    #[inline]
    #[must_use]
    pub fn minimum(&self) -> Vec3 {
        self.bounding_box.minimum
    }

    /// Local-space maximum shared by both volumes.
    #[inline]
    #[must_use]
    pub fn maximum(&self) -> Vec3 {
        self.bounding_box.maximum
    }

    /// A locked bounding info ignores [`update`](Self::update) calls.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    /// Locks or unlocks updates.
    #[inline]
    pub fn set_locked(&mut self, locked: bool) {
        self.is_locked = locked;
    }

    /// Length of the world diagonal.
    #[must_use]
    pub fn diagonal_length(&self) -> f32 {
        (self.bounding_box.maximum_world - self.bounding_box.minimum_world).length()
    }

    /// Updates both volumes from the same world matrix.
    ///
    /// Call exactly once per transform change; no-op while locked.
    pub fn update(&mut self, world: &Affine3A) {
        if self.is_locked {
            return;
        }
        self.bounding_box.update(world);
        self.bounding_sphere.update(world);
    }

    /// Rescales both volumes by the same factor.
    pub fn scale(&mut self, factor: f32) {
        self.bounding_box.scale(factor);
        self.bounding_sphere.scale(factor);
    }

    // ========================================================================
    // Frustum tests
    // ========================================================================

    /// Strategy-driven frustum test.
    ///
    /// Order of short circuits:
    /// 1. inclusion strategies accept when the sphere center is inside all planes
    /// 2. the sphere exclusion test must pass, else reject
    /// 3. sphere-only strategies accept here
    /// 4. otherwise the box corner test decides
    #[must_use]
    pub fn is_in_frustum(&self, planes: &FrustumPlanes, strategy: CullingStrategy) -> bool {
        let inclusion = matches!(
            strategy,
            CullingStrategy::OptimisticInclusion
                | CullingStrategy::OptimisticInclusionThenSphereOnly
        );
        let sphere_only = matches!(
            strategy,
            CullingStrategy::BoundingSphereOnly
                | CullingStrategy::OptimisticInclusionThenSphereOnly
        );

        if inclusion && self.bounding_sphere.is_center_in_frustum(planes) {
            return true;
        }

        if !self.bounding_sphere.is_in_frustum(planes) {
            return false;
        }

        if sphere_only {
            return true;
        }

        self.bounding_box.is_in_frustum(planes)
    }

    /// Strict containment: every box corner inside every plane.
    #[must_use]
    pub fn is_completely_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        self.bounding_box.is_completely_in_frustum(planes)
    }

    // ========================================================================
    // Intersection tests
    // ========================================================================

    /// World-space point containment (sphere first, then box).
    #[must_use]
    pub fn intersects_point(&self, point: Vec3) -> bool {
        self.bounding_sphere.intersects_point(point) && self.bounding_box.intersects_point(point)
    }

    /// Volume overlap test against another bounding info.
    ///
    /// Cheap rejections run first: sphere-sphere, then world AABB overlap.
    /// With `precise` the overlap is confirmed by the separating axis theorem
    /// over 15 candidate axes (3 + 3 box directions and their 9 pairwise
    /// cross products), so boxes that only touch under the AABB-of-OBB
    /// approximation are correctly rejected.
    #[must_use]
    pub fn intersects(&self, other: &BoundingInfo, precise: bool) -> bool {
        if !BoundingSphere::intersects(&self.bounding_sphere, &other.bounding_sphere) {
            return false;
        }

        if !BoundingBox::intersects(&self.bounding_box, &other.bounding_box) {
            return false;
        }

        if !precise {
            return true;
        }

        let box0 = &self.bounding_box;
        let box1 = &other.bounding_box;

        for direction in &box0.directions {
            if !axis_overlap(*direction, box0, box1) {
                return false;
            }
        }
        for direction in &box1.directions {
            if !axis_overlap(*direction, box0, box1) {
                return false;
            }
        }
        for d0 in &box0.directions {
            for d1 in &box1.directions {
                // Parallel axes produce a zero cross product whose projections
                // are empty intervals at the origin; the overlap test then
                // passes trivially, which is the correct SAT behavior.
                if !axis_overlap(d0.cross(*d1), box0, box1) {
                    return false;
                }
            }
        }

        true
    }
}
