//! Ray predicates, picking results, and ellipsoid collisions.
//!
//! The geometric predicates here ([`Ray`] vs sphere/box/triangle/segment)
//! are the only intersection primitives the mesh picking path depends on;
//! the [`Collider`] implements the ellipsoid slide response consumed by
//! `Scene::move_with_collisions`.

pub mod collider;
pub mod picking;
pub mod ray;

pub use collider::Collider;
pub use picking::PickingInfo;
pub use ray::{Ray, TriangleHit};
