//! Axis-aligned-in-local-space, oriented-in-world-space bounding box.

use glam::{Affine3A, Vec3};

use crate::culling::frustum::{FrustumPlanes, dot_coordinate};

/// Tolerance for [`BoundingBox::intersects_point`]. Negative so that points
/// sitting exactly on (or marginally outside) a face still count as inside.
const POINT_EPSILON: f32 = -1.0e-3;

/// A bounding box that is axis-aligned in the mesh's local space and carries
/// its oriented world-space counterpart.
///
/// The world-space fields (`vectors_world`, `minimum_world`, …) describe the
/// AABB of the transformed box, not a tight oriented bound. The three
/// `directions` are the columns of the world matrix and are deliberately NOT
/// re-normalized: projecting `extend_size` onto them implicitly carries the
/// world scale, which is what the SAT overlap test in
/// [`BoundingInfo`](crate::culling::BoundingInfo) relies on.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    /// Local-space minimum corner.
    pub minimum: Vec3,
    /// Local-space maximum corner.
    pub maximum: Vec3,
    /// The 8 local-space corners.
    pub vectors: [Vec3; 8],
    /// Local-space center, `(minimum + maximum) / 2`.
    pub center: Vec3,
    /// Local-space half size, `(maximum - minimum) / 2`.
    pub extend_size: Vec3,
    /// The 8 corners transformed to world space.
    pub vectors_world: [Vec3; 8],
    /// Componentwise minimum of `vectors_world`.
    pub minimum_world: Vec3,
    /// Componentwise maximum of `vectors_world`.
    pub maximum_world: Vec3,
    /// Center of the world-space AABB.
    pub center_world: Vec3,
    /// Half size of the world-space AABB.
    pub extend_size_world: Vec3,
    /// The first three columns of the world matrix (un-normalized).
    pub directions: [Vec3; 3],
    world_matrix: Affine3A,
}

impl BoundingBox {
    /// Creates a box from local min/max, transformed by `world_matrix`
    /// (identity when `None`).
    #[must_use]
    pub fn new(minimum: Vec3, maximum: Vec3, world_matrix: Option<Affine3A>) -> Self {
        let mut bbox = Self {
            minimum: Vec3::ZERO,
            maximum: Vec3::ZERO,
            vectors: [Vec3::ZERO; 8],
            center: Vec3::ZERO,
            extend_size: Vec3::ZERO,
            vectors_world: [Vec3::ZERO; 8],
            minimum_world: Vec3::ZERO,
            maximum_world: Vec3::ZERO,
            center_world: Vec3::ZERO,
            extend_size_world: Vec3::ZERO,
            directions: [Vec3::ZERO; 3],
            world_matrix: Affine3A::IDENTITY,
        };
        bbox.reconstruct(minimum, maximum, world_matrix);
        bbox
    }

    /// Rebuilds the box in place from a new min/max pair and world matrix.
    pub fn reconstruct(&mut self, minimum: Vec3, maximum: Vec3, world_matrix: Option<Affine3A>) {
        self.minimum = minimum;
        self.maximum = maximum;

        self.vectors = [
            Vec3::new(minimum.x, minimum.y, minimum.z),
            Vec3::new(minimum.x, minimum.y, maximum.z),
            Vec3::new(minimum.x, maximum.y, minimum.z),
            Vec3::new(minimum.x, maximum.y, maximum.z),
            Vec3::new(maximum.x, minimum.y, minimum.z),
            Vec3::new(maximum.x, minimum.y, maximum.z),
            Vec3::new(maximum.x, maximum.y, minimum.z),
            Vec3::new(maximum.x, maximum.y, maximum.z),
        ];

        self.center = (minimum + maximum) * 0.5;
        self.extend_size = (maximum - minimum) * 0.5;

        let world = world_matrix.unwrap_or(Affine3A::IDENTITY);
        self.update(&world);
    }

    /// Rescales the box around its local center and reconstructs.
    /// `scale(1.0)` leaves the box unchanged.
    pub fn scale(&mut self, factor: f32) {
        let offset = (self.maximum - self.minimum) * (0.5 * factor);
        let center = self.center;
        let world = self.world_matrix;
        self.reconstruct(center - offset, center + offset, Some(world));
    }

    /// The world matrix the world-space fields were derived from.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    /// Recomputes all world-space fields from `world`.
    ///
    /// Identity world matrices take a cheap copy path.
    pub fn update(&mut self, world: &Affine3A) {
        self.world_matrix = *world;

        if *world == Affine3A::IDENTITY {
            self.vectors_world = self.vectors;
            self.minimum_world = self.minimum;
            self.maximum_world = self.maximum;
            self.center_world = self.center;
            self.extend_size_world = self.extend_size;
            self.directions = [Vec3::X, Vec3::Y, Vec3::Z];
            return;
        }

        let mut min_world = Vec3::splat(f32::INFINITY);
        let mut max_world = Vec3::splat(f32::NEG_INFINITY);

        for (world_corner, corner) in self.vectors_world.iter_mut().zip(&self.vectors) {
            let v = world.transform_point3(*corner);
            *world_corner = v;
            min_world = min_world.min(v);
            max_world = max_world.max(v);
        }

        self.minimum_world = min_world;
        self.maximum_world = max_world;
        self.center_world = (min_world + max_world) * 0.5;
        self.extend_size_world = (max_world - min_world) * 0.5;

        self.directions = [
            world.matrix3.x_axis.into(),
            world.matrix3.y_axis.into(),
            world.matrix3.z_axis.into(),
        ];
    }

    // ========================================================================
    // Frustum tests
    // ========================================================================

    /// Returns `false` only when some plane has all 8 world corners on its
    /// negative side.
    #[must_use]
    pub fn is_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        Self::corners_in_frustum(&self.vectors_world, planes)
    }

    /// All 8 world corners must be on the non-negative side of all 6 planes.
    #[must_use]
    pub fn is_completely_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        for plane in planes {
            for corner in &self.vectors_world {
                if dot_coordinate(*plane, *corner) < 0.0 {
                    return false;
                }
            }
        }
        true
    }

    /// Shared corner sweep for the non-strict frustum test.
    #[must_use]
    pub fn corners_in_frustum(corners: &[Vec3; 8], planes: &FrustumPlanes) -> bool {
        for plane in planes {
            let mut all_outside = true;
            for corner in corners {
                if dot_coordinate(*plane, *corner) >= 0.0 {
                    all_outside = false;
                    break;
                }
            }
            if all_outside {
                return false;
            }
        }
        true
    }

    // ========================================================================
    // Intersection tests
    // ========================================================================

    /// World-space point containment with a boundary-inclusive tolerance.
    #[must_use]
    pub fn intersects_point(&self, point: Vec3) -> bool {
        let min = self.minimum_world;
        let max = self.maximum_world;

        if max.x - point.x < POINT_EPSILON || point.x - min.x < POINT_EPSILON {
            return false;
        }
        if max.y - point.y < POINT_EPSILON || point.y - min.y < POINT_EPSILON {
            return false;
        }
        if max.z - point.z < POINT_EPSILON || point.z - min.z < POINT_EPSILON {
            return false;
        }
        true
    }

    /// Sphere overlap: clamp the center into the world AABB and compare the
    /// squared distance against the squared radius.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let clamped = center.clamp(self.minimum_world, self.maximum_world);
        center.distance_squared(clamped) <= radius * radius
    }

    /// AABB-AABB overlap against explicit world-space bounds.
    #[must_use]
    pub fn intersects_min_max(&self, min: Vec3, max: Vec3) -> bool {
        let smin = self.minimum_world;
        let smax = self.maximum_world;

        smin.x <= max.x
            && smax.x >= min.x
            && smin.y <= max.y
            && smax.y >= min.y
            && smin.z <= max.z
            && smax.z >= min.z
    }

    /// AABB-AABB overlap between two boxes' world bounds.
    #[must_use]
    pub fn intersects(a: &BoundingBox, b: &BoundingBox) -> bool {
        a.intersects_min_max(b.minimum_world, b.maximum_world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconstruct_round_trips_min_max() {
        let bbox = BoundingBox::new(Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0), None);
        assert_eq!(bbox.minimum, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.maximum, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.center, Vec3::ZERO);
        assert_eq!(bbox.extend_size, Vec3::new(1.0, 2.0, 3.0));
        // Identity world: world fields are plain copies
        assert_eq!(bbox.minimum_world, bbox.minimum);
        assert_eq!(bbox.maximum_world, bbox.maximum);
    }

    #[test]
    fn world_transform_produces_aabb_of_obb() {
        let world = Affine3A::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let bbox = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0), Some(world));

        // A unit cube rotated 45 degrees around Y grows to sqrt(2) in X and Z
        let expected = 2.0_f32.sqrt();
        assert!((bbox.maximum_world.x - expected).abs() < 1e-5);
        assert!((bbox.maximum_world.z - expected).abs() < 1e-5);
        assert!((bbox.maximum_world.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn point_on_boundary_counts_as_inside() {
        let bbox = BoundingBox::new(Vec3::ZERO, Vec3::ONE, None);
        assert!(bbox.intersects_point(Vec3::new(1.0, 1.0, 1.0)));
        assert!(bbox.intersects_point(Vec3::new(0.0, 0.5, 0.5)));
        assert!(!bbox.intersects_point(Vec3::new(1.5, 0.5, 0.5)));
    }

    #[test]
    fn sphere_overlap_uses_clamped_distance() {
        let bbox = BoundingBox::new(Vec3::ZERO, Vec3::ONE, None);
        assert!(bbox.intersects_sphere(Vec3::new(2.0, 0.5, 0.5), 1.1));
        assert!(!bbox.intersects_sphere(Vec3::new(2.0, 0.5, 0.5), 0.9));
    }
}
