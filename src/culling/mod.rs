//! Bounding volumes and frustum culling
//!
//! The culling module owns the spatial data structures consumed by the
//! visibility pipeline:
//! - [`BoundingBox`]: axis-aligned in local space, oriented in world space
//! - [`BoundingSphere`]: center + radius with a conservative world radius
//! - [`BoundingInfo`]: box + sphere pair with strategy-driven frustum tests
//!   and a precise (SAT-based) box-box overlap test
//! - [`Frustum`]: plane extraction from a view-projection matrix
//!
//! Box and sphere are always reconstructed together from the same
//! minimum/maximum pair; [`BoundingInfo`] enforces that pairing.

pub mod bounding_box;
pub mod bounding_info;
pub mod bounding_sphere;
pub mod frustum;

pub use bounding_box::BoundingBox;
pub use bounding_info::{BoundingInfo, CullingStrategy};
pub use bounding_sphere::BoundingSphere;
pub use frustum::{Frustum, FrustumPlanes, dot_coordinate};
