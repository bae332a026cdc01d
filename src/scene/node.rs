//! Scene node: hierarchy links, transform, and component keys.

use glam::Affine3A;
use smallvec::SmallVec;

use crate::scene::transform::Transform;
use crate::scene::{CameraKey, LightKey, MeshKey, NodeKey};

/// A scene node containing the data traversed every frame.
///
/// # Design
///
/// - Hierarchy and transform are the hot path; everything else (mesh,
///   camera, light) is a key into the scene's component arenas.
/// - `parent` is a non-owning back-reference used only for matrix
///   composition and traversal; the scene keeps both directions in sync.
#[derive(Debug, Clone)]
pub struct Node {
    /// Display name.
    pub name: String,
    /// Parent node key (`None` for root nodes).
    pub(crate) parent: Option<NodeKey>,
    /// Child node keys.
    pub(crate) children: SmallVec<[NodeKey; 4]>,

    /// Transform component (local TRS + cached matrices).
    pub transform: Transform,

    /// Disabled nodes are skipped by picking and culling sweeps.
    pub enabled: bool,

    /// Mesh component, if any.
    pub mesh: Option<MeshKey>,
    /// Camera component, if any.
    pub camera: Option<CameraKey>,
    /// Light component, if any.
    pub light: Option<LightKey>,

    /// Extra world-matrix multiplier for bone attachment: when set, this
    /// node's world matrix is additionally multiplied by the referral
    /// node's world matrix after the parent composition.
    pub transform_referral: Option<NodeKey>,
}

impl Node {
    /// Creates a named node with a default transform.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            children: SmallVec::new(),
            transform: Transform::new(),
            enabled: true,
            mesh: None,
            camera: None,
            light: None,
            transform_referral: None,
        }
    }

    /// The parent node key, if any.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Read-only view of the child keys.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// The cached world matrix.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        self.transform.world_matrix()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("Node")
    }
}
