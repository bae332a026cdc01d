//! View frustum plane extraction and plane-level tests.
//!
//! Planes are stored as `Vec4` where `xyz` is the plane normal and `w` the
//! distance term, normals pointing into the frustum. A point is inside a
//! plane's positive half-space when [`dot_coordinate`] is `>= 0`.

use glam::{Mat4, Vec3, Vec4};

/// The six planes of a frustum, in the order
/// left, right, bottom, top, near, far.
pub type FrustumPlanes = [Vec4; 6];

/// Signed distance from `point` to `plane` (normal · point + distance term).
#[inline]
#[must_use]
pub fn dot_coordinate(plane: Vec4, point: Vec3) -> f32 {
    plane.x * point.x + plane.y * point.y + plane.z * point.z + plane.w
}

/// View frustum described by six inward-facing planes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: FrustumPlanes,
}

impl Frustum {
    /// Extracts frustum planes from a view-projection matrix using the
    /// Gribb-Hartmann method, assuming a [0, 1] NDC depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [Vec4::ZERO; 6];

        // Left:   row4 + row1
        planes[0] = rows[3] + rows[0];
        // Right:  row4 - row1
        planes[1] = rows[3] - rows[0];
        // Bottom: row4 + row2
        planes[2] = rows[3] + rows[1];
        // Top:    row4 - row2
        planes[3] = rows[3] - rows[1];
        // Near: for a [0, 1] depth range the near plane is row3 itself
        planes[4] = rows[2];
        // Far:    row4 - row3
        planes[5] = rows[3] - rows[2];

        for plane in &mut planes {
            let length = Vec3::new(plane.x, plane.y, plane.z).length();
            *plane /= length;
        }

        Self { planes }
    }

    /// Builds a frustum directly from pre-extracted planes.
    #[must_use]
    pub fn from_planes(planes: FrustumPlanes) -> Self {
        Self { planes }
    }

    /// The six planes in left, right, bottom, top, near, far order.
    #[inline]
    #[must_use]
    pub fn planes(&self) -> &FrustumPlanes {
        &self.planes
    }

    /// Sphere test: rejected as soon as the center is more than `radius`
    /// behind any plane.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        for plane in &self.planes {
            if dot_coordinate(*plane, center) < -radius {
                return false;
            }
        }
        true
    }

    /// Point containment against all six planes.
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        for plane in &self.planes {
            if dot_coordinate(*plane, point) < 0.0 {
                return false;
            }
        }
        true
    }
}
