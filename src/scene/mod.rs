//! Scene graph: nodes, transforms, hierarchy update, and the scene container.
//!
//! Components are stored in slotmap arenas keyed by the handles below;
//! parent/child and node↔component references are keys into those arenas,
//! never owning pointers, so removal invalidates them trivially.

pub mod camera;
pub mod light;
pub mod node;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use camera::{Camera, ProjectionType};
pub use light::{Light, LightKind};
pub use node::Node;
pub use scene::Scene;
pub use transform::{BillboardMode, Rotation, Space, Transform};
pub use transform_system::WorldUpdateContext;

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a [`Node`] in a [`Scene`].
    pub struct NodeKey;
    /// Handle to a [`Mesh`](crate::mesh::Mesh) in a [`Scene`].
    pub struct MeshKey;
    /// Handle to a [`Material`](crate::material::Material) in a [`Scene`].
    pub struct MaterialKey;
    /// Handle to a [`Camera`] in a [`Scene`].
    pub struct CameraKey;
    /// Handle to a [`Light`] in a [`Scene`].
    pub struct LightKey;
}
