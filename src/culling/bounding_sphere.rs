//! Center + radius bounding sphere with a conservative world-space radius.

use glam::{Affine3A, Vec3};

use crate::culling::frustum::{FrustumPlanes, dot_coordinate};

/// Bounding sphere constructed from the same local min/max pair as its
/// sibling [`BoundingBox`](crate::culling::BoundingBox).
///
/// The world radius is the local radius scaled by the largest transformed
/// unit-axis length. Under non-uniform scale this is a conservative (loose)
/// bound, never a tight one; culling strategies rely on this exact formula,
/// so it must not be "fixed" to something tighter.
#[derive(Debug, Clone)]
pub struct BoundingSphere {
    /// Local-space minimum used for construction.
    pub minimum: Vec3,
    /// Local-space maximum used for construction.
    pub maximum: Vec3,
    /// Local-space center.
    pub center: Vec3,
    /// Local-space radius (half the min/max diagonal).
    pub radius: f32,
    /// World-space center.
    pub center_world: Vec3,
    /// World-space radius (conservative under non-uniform scale).
    pub radius_world: f32,
    world_matrix: Affine3A,
}

impl BoundingSphere {
    /// Creates a sphere from local min/max, transformed by `world_matrix`
    /// (identity when `None`).
    #[must_use]
    pub fn new(minimum: Vec3, maximum: Vec3, world_matrix: Option<Affine3A>) -> Self {
        let mut sphere = Self {
            minimum: Vec3::ZERO,
            maximum: Vec3::ZERO,
            center: Vec3::ZERO,
            radius: 0.0,
            center_world: Vec3::ZERO,
            radius_world: 0.0,
            world_matrix: Affine3A::IDENTITY,
        };
        sphere.reconstruct(minimum, maximum, world_matrix);
        sphere
    }

    /// Rebuilds the sphere in place from a new min/max pair and world matrix.
    pub fn reconstruct(&mut self, minimum: Vec3, maximum: Vec3, world_matrix: Option<Affine3A>) {
        self.minimum = minimum;
        self.maximum = maximum;
        self.center = (minimum + maximum) * 0.5;
        self.radius = (maximum - minimum).length() * 0.5;

        let world = world_matrix.unwrap_or(Affine3A::IDENTITY);
        self.update(&world);
    }

    /// Rescales the sphere around its center and reconstructs.
    pub fn scale(&mut self, factor: f32) {
        let new_radius = self.radius * factor;
        let offset = Vec3::splat(new_radius);
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

    /// Recomputes the world center and the conservative world radius.
    pub fn update(&mut self, world: &Affine3A) {
        self.world_matrix = *world;

        if *world == Affine3A::IDENTITY {
            self.center_world = self.center;
            self.radius_world = self.radius;
            return;
        }

        self.center_world = world.transform_point3(self.center);

        // Worst-case axis stretch: max |world * unit axis|
        let max_scale_sq = world
            .matrix3
            .x_axis
            .length_squared()
            .max(world.matrix3.y_axis.length_squared())
            .max(world.matrix3.z_axis.length_squared());
        self.radius_world = self.radius * max_scale_sq.sqrt();
    }

    // ========================================================================
    // Tests
    // ========================================================================

    /// Sphere-frustum test: rejected when entirely behind any plane.
    #[must_use]
    pub fn is_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        let radius = self.radius_world;
        for plane in planes {
            if dot_coordinate(*plane, self.center_world) <= -radius {
                return false;
            }
        }
        true
    }

    /// Cheap inclusion test: is the center alone inside all planes?
    #[must_use]
    pub fn is_center_in_frustum(&self, planes: &FrustumPlanes) -> bool {
        for plane in planes {
            if dot_coordinate(*plane, self.center_world) < 0.0 {
                return false;
            }
        }
        true
    }

    /// World-space point containment.
    #[must_use]
    pub fn intersects_point(&self, point: Vec3) -> bool {
        self.center_world.distance_squared(point) <= self.radius_world * self.radius_world
    }

    /// Sphere-sphere overlap on the world-space fields.
    #[must_use]
    pub fn intersects(a: &BoundingSphere, b: &BoundingSphere) -> bool {
        let max_distance = a.radius_world + b.radius_world;
        a.center_world.distance_squared(b.center_world) <= max_distance * max_distance
    }
}
