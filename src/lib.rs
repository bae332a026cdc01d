//! Parallax — spatial scene-graph core for a 3D rendering engine.
//!
//! This crate implements the CPU-side geometry heart of an engine:
//! hierarchical transform nodes with cached world matrices (dirty tracking,
//! freezing, pivots, billboards), bounding volumes with frustum and
//! SAT-based intersection tests, mesh/submesh bounding and ray picking,
//! facet partitioning, ellipsoid collisions, and a material base with a
//! dirty-marking protocol. GPU upload, shader compilation, and asset I/O
//! are collaborator concerns and do not appear here.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod collision;
pub mod culling;
pub mod errors;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod scene;

pub use collision::{Collider, PickingInfo, Ray};
pub use culling::{BoundingBox, BoundingInfo, BoundingSphere, CullingStrategy, Frustum};
pub use errors::{ParallaxError, Result};
pub use geometry::{Geometry, VertexKind};
pub use material::{AlphaMode, FillMode, Material, MaterialDirtyFlags, Side};
pub use mesh::{FacetData, Mesh, MeshKind, SubMesh};
pub use scene::{
    BillboardMode, Camera, CameraKey, Light, LightKey, LightKind, MaterialKey, MeshKey, Node,
    NodeKey, Rotation, Scene, Space, Transform,
};
