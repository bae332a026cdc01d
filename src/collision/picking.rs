//! Picking result record.

use glam::Vec3;

use crate::scene::NodeKey;

/// Result of a ray pick against a mesh or a scene.
///
/// A default-constructed `PickingInfo` is a miss; hits are produced by
/// `Mesh::intersects_ray` and `Scene::pick_with_ray`.
#[derive(Debug, Clone, Default)]
pub struct PickingInfo {
    /// Whether the ray hit anything.
    pub hit: bool,
    /// World-space distance from the ray origin to the hit.
    pub distance: f32,
    /// World-space hit point.
    pub picked_point: Option<Vec3>,
    /// Node carrying the picked mesh.
    pub picked_node: Option<NodeKey>,
    /// Index of the submesh containing the hit triangle.
    pub submesh_id: usize,
    /// Index of the hit triangle within the mesh's index buffer.
    pub face_id: Option<usize>,
    /// Barycentric weight of the hit triangle's second vertex.
    pub bu: f32,
    /// Barycentric weight of the hit triangle's third vertex.
    pub bv: f32,
}

impl PickingInfo {
    /// A miss.
    #[must_use]
    pub fn miss() -> Self {
        Self::default()
    }
}
