//! Ellipsoid collider with slide response.
//!
//! Collision detection runs in "ellipsoid space": every world-space point is
//! divided componentwise by the ellipsoid radius so the moving shape becomes
//! a unit sphere. A swept unit sphere is tested against each candidate
//! triangle (face interior, then vertices, then edges), the nearest contact
//! wins, and the response slides the remaining velocity along the contact
//! plane.

use glam::Vec3;

/// Solves `a·t² + b·t + c = 0` and returns the lowest root in `[0, max_r)`.
fn lowest_root(a: f32, b: f32, c: f32, max_r: f32) -> Option<f32> {
    let determinant = b * b - 4.0 * a * c;
    if determinant < 0.0 {
        return None;
    }

    let sqrt_d = determinant.sqrt();
    let inv = 1.0 / (2.0 * a);
    let mut r1 = (-b - sqrt_d) * inv;
    let mut r2 = (-b + sqrt_d) * inv;
    if r1 > r2 {
        std::mem::swap(&mut r1, &mut r2);
    }

    if r1 > 0.0 && r1 < max_r {
        return Some(r1);
    }
    if r2 > 0.0 && r2 < max_r {
        return Some(r2);
    }
    None
}

/// Point-in-triangle test in the triangle's plane.
fn point_in_triangle(point: Vec3, pa: Vec3, pb: Vec3, pc: Vec3, n: Vec3) -> bool {
    let e0 = pb - pa;
    let e1 = pc - pb;
    let e2 = pa - pc;

    let c0 = (point - pa).cross(e0);
    let c1 = (point - pb).cross(e1);
    let c2 = (point - pc).cross(e2);

    c0.dot(n) <= 0.0 && c1.dot(n) <= 0.0 && c2.dot(n) <= 0.0
}

/// Swept-sphere collider state for one `move_with_collisions` query.
#[derive(Debug, Clone)]
pub struct Collider {
    /// Ellipsoid radius (world units per axis).
    pub radius: Vec3,
    /// Number of slide iterations before giving up (Fauerby's classic 3).
    pub max_retries: u32,

    // Query state, all in ellipsoid space
    base_position: Vec3,
    velocity: Vec3,
    normalized_velocity: Vec3,
    epsilon: f32,

    collision_found: bool,
    nearest_time: f32,
    intersection_point: Vec3,
}

impl Collider {
    /// Creates a collider for the given ellipsoid radius.
    #[must_use]
    pub fn new(radius: Vec3) -> Self {
        Self {
            radius,
            max_retries: 3,
            base_position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            normalized_velocity: Vec3::ZERO,
            epsilon: 0.001,
            collision_found: false,
            nearest_time: 0.0,
            intersection_point: Vec3::ZERO,
        }
    }

    /// Converts a world-space point into ellipsoid space.
    #[inline]
    #[must_use]
    pub fn to_ellipsoid_space(&self, v: Vec3) -> Vec3 {
        v / self.radius
    }

    /// Converts an ellipsoid-space point back to world space.
    #[inline]
    #[must_use]
    pub fn to_world_space(&self, v: Vec3) -> Vec3 {
        v * self.radius
    }

    /// Starts a sweep from `position` along `velocity`, both in world space.
    pub fn initialize(&mut self, position: Vec3, velocity: Vec3) {
        self.base_position = self.to_ellipsoid_space(position);
        self.velocity = self.to_ellipsoid_space(velocity);
        self.normalized_velocity = self.velocity.normalize_or_zero();
        self.collision_found = false;
        self.nearest_time = 1.0;
        self.intersection_point = Vec3::ZERO;
    }

    /// Whether the current sweep found a contact.
    #[inline]
    #[must_use]
    pub fn collision_found(&self) -> bool {
        self.collision_found
    }

    /// Tests one triangle (already converted into ellipsoid space) against
    /// the swept unit sphere and keeps the nearest contact.
    pub fn test_triangle(&mut self, p1: Vec3, p2: Vec3, p3: Vec3) {
        let normal = (p2 - p1).cross(p3 - p1).normalize_or_zero();
        if normal == Vec3::ZERO {
            // Degenerate triangle
            return;
        }

        // Only front-facing triangles can stop the sweep
        if normal.dot(self.normalized_velocity) > 0.0 {
            return;
        }

        let plane_constant = -normal.dot(p1);
        let signed_dist = normal.dot(self.base_position) + plane_constant;
        let normal_dot_velocity = normal.dot(self.velocity);

        let (t0, embedded) = if normal_dot_velocity.abs() < 1e-12 {
            if signed_dist.abs() >= 1.0 {
                return;
            }
            (0.0, true)
        } else {
            let mut t0 = (-1.0 - signed_dist) / normal_dot_velocity;
            let mut t1 = (1.0 - signed_dist) / normal_dot_velocity;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > 1.0 || t1 < 0.0 {
                return;
            }
            (t0.clamp(0.0, 1.0), false)
        };

        let mut found = false;
        let mut t = 1.0_f32;
        let mut contact = Vec3::ZERO;

        // 1. Face interior at the moment the sphere touches the plane
        if !embedded {
            let plane_point = self.base_position - normal + self.velocity * t0;
            if point_in_triangle(plane_point, p1, p2, p3, normal) {
                found = true;
                t = t0;
                contact = plane_point;
            }
        }

        // 2. Vertices and edges, swept-sphere quadratics
        if !found {
            let velocity_sq = self.velocity.length_squared();

            for vertex in [p1, p2, p3] {
                let to_vertex = self.base_position - vertex;
                let b = 2.0 * self.velocity.dot(to_vertex);
                let c = to_vertex.length_squared() - 1.0;
                if let Some(root) = lowest_root(velocity_sq, b, c, t) {
                    found = true;
                    t = root;
                    contact = vertex;
                }
            }

            for (ea, eb) in [(p1, p2), (p2, p3), (p3, p1)] {
                let edge = eb - ea;
                let base_to_vertex = ea - self.base_position;

                let edge_sq = edge.length_squared();
                let edge_dot_velocity = edge.dot(self.velocity);
                let edge_dot_base = edge.dot(base_to_vertex);

                let a = edge_sq * -velocity_sq + edge_dot_velocity * edge_dot_velocity;
                let b = edge_sq * (2.0 * self.velocity.dot(base_to_vertex))
                    - 2.0 * edge_dot_velocity * edge_dot_base;
                let c = edge_sq * (1.0 - base_to_vertex.length_squared())
                    + edge_dot_base * edge_dot_base;

                if let Some(root) = lowest_root(a, b, c, t) {
                    // Contact must lie within the edge span
                    let f = (edge_dot_velocity * root - edge_dot_base) / edge_sq;
                    if (0.0..=1.0).contains(&f) {
                        found = true;
                        t = root;
                        contact = ea + edge * f;
                    }
                }
            }
        }

        if found && (!self.collision_found || t < self.nearest_time) {
            self.collision_found = true;
            self.nearest_time = t;
            self.intersection_point = contact;
        }
    }

    /// Computes the post-collision position and slide velocity for the
    /// current sweep, in ellipsoid space. Call only after a sweep.
    ///
    /// Returns `(new_position, remaining_velocity)`.
    #[must_use]
    pub fn response(&self) -> (Vec3, Vec3) {
        if !self.collision_found {
            return (self.base_position + self.velocity, Vec3::ZERO);
        }

        let travelled = self.velocity * self.nearest_time;
        let mut new_position = self.base_position + travelled;

        // Back off along the velocity so the sphere is not exactly touching
        let dist = travelled.length();
        if dist > self.epsilon {
            new_position -= self.normalized_velocity * self.epsilon;
        }

        let slide_normal = (new_position - self.intersection_point).normalize_or_zero();
        let remaining = self.velocity - travelled;
        let slide_velocity = remaining - slide_normal * remaining.dot(slide_normal);

        (new_position, slide_velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_stops_at_wall() {
        // Unit sphere moving +X toward a large wall triangle at x = 3
        let mut collider = Collider::new(Vec3::ONE);
        collider.initialize(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0));

        collider.test_triangle(
            Vec3::new(3.0, -10.0, -10.0),
            Vec3::new(3.0, -10.0, 10.0),
            Vec3::new(3.0, 10.0, 0.0),
        );

        assert!(collider.collision_found());
        let (pos, _) = collider.response();
        // Sphere center halts one radius short of the wall (minus back-off)
        assert!((pos.x - 2.0).abs() < 0.01, "got x = {}", pos.x);
    }

    #[test]
    fn back_facing_triangle_is_ignored() {
        let mut collider = Collider::new(Vec3::ONE);
        collider.initialize(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0));

        // Same wall with reversed winding: normal points away from the sphere
        collider.test_triangle(
            Vec3::new(3.0, -10.0, -10.0),
            Vec3::new(3.0, 10.0, 0.0),
            Vec3::new(3.0, -10.0, 10.0),
        );

        assert!(!collider.collision_found());
    }

    #[test]
    fn grazing_slide_keeps_tangent_velocity() {
        let mut collider = Collider::new(Vec3::ONE);
        // Moving diagonally into a wall at x = 2
        collider.initialize(Vec3::ZERO, Vec3::new(3.0, 0.0, 3.0));

        collider.test_triangle(
            Vec3::new(2.0, -10.0, -10.0),
            Vec3::new(2.0, -10.0, 10.0),
            Vec3::new(2.0, 10.0, 0.0),
        );

        assert!(collider.collision_found());
        let (_, slide) = collider.response();
        // The slide keeps the Z component, the X component is absorbed
        assert!(slide.x.abs() < 0.05);
        assert!(slide.z > 0.5);
    }
}
