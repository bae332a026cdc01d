//! Ray primitive and its intersection predicates.

use glam::{Affine3A, Vec3};

use crate::culling::{BoundingBox, BoundingSphere};

const TRIANGLE_EPSILON: f32 = 1e-7;

/// Barycentric hit record returned by [`Ray::intersects_triangle`].
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Barycentric weight of the second vertex.
    pub bu: f32,
    /// Barycentric weight of the third vertex.
    pub bv: f32,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
}

/// A ray with origin, direction, and maximum length.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Direction; not required to be normalized, but distances returned by
    /// the predicates are expressed in multiples of its length.
    pub direction: Vec3,
    /// Maximum parametric distance considered a hit.
    pub length: f32,
}

impl Ray {
    /// Creates a ray with the given maximum length.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self {
            origin,
            direction,
            length,
        }
    }

    /// Point at parametric distance `t`.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Returns this ray transformed by `matrix` (used to carry a world-space
    /// ray into a mesh's local space). The direction is not re-normalized so
    /// parametric distances stay comparable across spaces with uniform scale.
    #[must_use]
    pub fn transformed(&self, matrix: &Affine3A) -> Ray {
        Ray {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
            length: self.length,
        }
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    /// Slab test against explicit world-space min/max bounds.
    #[must_use]
    pub fn intersects_box_min_max(&self, minimum: Vec3, maximum: Vec3) -> bool {
        let mut t_min = 0.0_f32;
        let mut t_max = self.length;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];
            let min = minimum[axis];
            let max = maximum[axis];

            if dir.abs() < 1e-12 {
                // Parallel to the slab: miss unless the origin lies inside it
                if origin < min || origin > max {
                    return false;
                }
            } else {
                let inv = 1.0 / dir;
                let mut t0 = (min - origin) * inv;
                let mut t1 = (max - origin) * inv;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return false;
                }
            }
        }

        true
    }

    /// Slab test against a bounding box's world AABB.
    #[must_use]
    pub fn intersects_box(&self, bbox: &BoundingBox) -> bool {
        self.intersects_box_min_max(bbox.minimum_world, bbox.maximum_world)
    }

    /// Geometric sphere test against the world-space sphere.
    #[must_use]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let to_center = sphere.center_world - self.origin;
        let radius_sq = sphere.radius_world * sphere.radius_world;
        let dist_sq = to_center.length_squared();

        if dist_sq <= radius_sq {
            // Origin inside the sphere
            return true;
        }

        let dir_len_sq = self.direction.length_squared();
        if dir_len_sq < 1e-12 {
            return false;
        }

        // Closest approach along the ray
        let t = to_center.dot(self.direction) / dir_len_sq;
        if t < 0.0 {
            return false;
        }

        let closest_sq = dist_sq - t * t * dir_len_sq;
        closest_sq <= radius_sq
    }

    /// Möller-Trumbore ray-triangle intersection.
    ///
    /// Returns barycentrics and distance for hits within `self.length`;
    /// back-facing and degenerate triangles return `None`.
    #[must_use]
    pub fn intersects_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<TriangleHit> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let pvec = self.direction.cross(edge2);
        let det = edge1.dot(pvec);

        if det.abs() < TRIANGLE_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = self.origin - v0;
        let bu = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&bu) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let bv = self.direction.dot(qvec) * inv_det;
        if bv < 0.0 || bu + bv > 1.0 {
            return None;
        }

        let distance = edge2.dot(qvec) * inv_det;
        if distance < 0.0 || distance > self.length {
            return None;
        }

        Some(TriangleHit { bu, bv, distance })
    }

    /// Distance from the ray to the segment `[a, b]`, if the closest approach
    /// is within `threshold`. Returns the parametric distance along the ray,
    /// or `None` when the segment is farther than the threshold.
    #[must_use]
    pub fn intersection_segment(&self, a: Vec3, b: Vec3, threshold: f32) -> Option<f32> {
        let u = b - a;
        let v = self.direction;
        let w = a - self.origin;

        let uu = u.dot(u);
        let uv = u.dot(v);
        let vv = v.dot(v);
        let uw = u.dot(w);
        let vw = v.dot(w);
        let denom = uu * vv - uv * uv;

        let (s, t) = if denom.abs() < 1e-12 {
            // Parallel: clamp to the segment start
            (0.0, if vv.abs() < 1e-12 { 0.0 } else { vw / vv })
        } else {
            let s = ((uv * vw - vv * uw) / denom).clamp(0.0, 1.0);
            let t = (uv * s + vw) / vv;
            (s, t)
        };

        if t < 0.0 || t > self.length {
            return None;
        }

        let seg_point = a + u * s;
        let ray_point = self.at(t);
        if seg_point.distance_squared(ray_point) <= threshold * threshold {
            Some(t)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_hit_reports_barycentrics() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), Vec3::NEG_Z, 10.0);
        let hit = ray
            .intersects_triangle(Vec3::ZERO, Vec3::X, Vec3::Y)
            .expect("ray should hit the triangle");

        assert!((hit.distance - 1.0).abs() < 1e-5);
        assert!((hit.bu - 0.25).abs() < 1e-5);
        assert!((hit.bv - 0.25).abs() < 1e-5);
    }

    #[test]
    fn triangle_miss_outside_edges() {
        let ray = Ray::new(Vec3::new(0.9, 0.9, 1.0), Vec3::NEG_Z, 10.0);
        assert!(ray.intersects_triangle(Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn triangle_behind_origin_is_ignored() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::NEG_Z, 10.0);
        assert!(ray.intersects_triangle(Vec3::ZERO, Vec3::X, Vec3::Y).is_none());
    }

    #[test]
    fn box_slab_test() {
        let ray = Ray::new(Vec3::new(0.5, 0.5, 5.0), Vec3::NEG_Z, 100.0);
        assert!(ray.intersects_box_min_max(Vec3::ZERO, Vec3::ONE));

        let miss = Ray::new(Vec3::new(5.0, 0.5, 5.0), Vec3::NEG_Z, 100.0);
        assert!(!miss.intersects_box_min_max(Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn segment_within_threshold() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X, 10.0);
        let t = ray.intersection_segment(Vec3::new(5.0, 0.1, 0.0), Vec3::new(5.0, 2.0, 0.0), 0.5);
        assert!(t.is_some());

        let miss =
            ray.intersection_segment(Vec3::new(5.0, 1.0, 0.0), Vec3::new(5.0, 2.0, 0.0), 0.5);
        assert!(miss.is_none());
    }
}
