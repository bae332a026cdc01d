//! Material base: a rendering-state container with a dirty-marking protocol.
//!
//! Shading itself is a collaborator concern (shader compilation and effect
//! binding live outside this core); what the geometry core consumes is the
//! render state that affects picking and batching (fill mode, alpha mode,
//! side) and the dirty protocol: mutations bump a version counter and record
//! flag bits, and the scene propagates staleness to the submeshes of every
//! mesh using the material so their cached effects get rebuilt.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bitflags::bitflags;
use glam::Vec4;
use uuid::Uuid;

bitflags! {
    /// What changed since a material's effects were last built.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialDirtyFlags: u32 {
        /// Texture bindings changed.
        const TEXTURE    = 1 << 0;
        /// Lighting-related state changed.
        const LIGHT      = 1 << 1;
        /// Required vertex attributes changed.
        const ATTRIBUTES = 1 << 2;
        /// Anything else (render states, defines).
        const MISC       = 1 << 3;
        /// Everything.
        const ALL        = (1 << 4) - 1;
    }
}

/// Alpha handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlphaMode {
    /// Fully opaque.
    Opaque,
    /// Cutout with the given threshold.
    Mask(f32),
    /// Alpha blended.
    Blend,
}

/// Which triangle side is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Front faces only.
    Front,
    /// Back faces only.
    Back,
    /// Both sides.
    Double,
}

/// Primitive interpretation; drives submesh ray-intersection dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Independent triangles, indices walked with step 3.
    #[default]
    TriangleList,
    /// Strip, indices walked with step 1 (restart markers skipped).
    TriangleStrip,
    /// Lines; not pickable.
    LineList,
    /// Points; not pickable.
    PointList,
}

/// Typed material parameters, a tagged enum instead of a subclass chain.
#[derive(Debug)]
pub enum MaterialData {
    /// Unlit color.
    Basic {
        /// Base RGBA color.
        color: Vec4,
    },
    /// Metallic-roughness shading.
    Standard {
        /// Base RGBA color.
        color: Vec4,
        /// Perceptual roughness.
        roughness: f32,
        /// Metallic factor.
        metalness: f32,
    },
}

impl MaterialData {
    /// Shader family implementing this data.
    #[must_use]
    pub fn shader_name(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "mesh_basic",
            Self::Standard { .. } => "mesh_standard",
        }
    }
}

/// Material: render states + typed data + the dirty protocol.
#[derive(Debug)]
pub struct Material {
    /// Stable resource identity.
    pub uuid: Uuid,
    /// Optional display name.
    pub name: Option<String>,
    /// Typed shading parameters.
    pub data: MaterialData,

    /// Alpha handling.
    pub alpha_mode: AlphaMode,
    /// Rendered side.
    pub side: Side,
    /// Primitive interpretation.
    pub fill_mode: FillMode,
    /// Depth write toggle.
    pub depth_write: bool,
    /// Depth test toggle.
    pub depth_test: bool,
    /// Wireframe rendering toggle.
    pub wireframe: bool,

    version: AtomicU64,
    dirty_flags: AtomicU32,
}

impl Material {
    /// Creates a material with default render states.
    #[must_use]
    pub fn new(data: MaterialData) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: None,
            data,
            alpha_mode: AlphaMode::Opaque,
            side: Side::Front,
            fill_mode: FillMode::default(),
            depth_write: true,
            depth_test: true,
            wireframe: false,
            version: AtomicU64::new(0),
            dirty_flags: AtomicU32::new(MaterialDirtyFlags::ALL.bits()),
        }
    }

    /// Unlit material with the given color.
    #[must_use]
    pub fn new_basic(color: Vec4) -> Self {
        Self::new(MaterialData::Basic { color })
    }

    /// Metallic-roughness material with the given color.
    #[must_use]
    pub fn new_standard(color: Vec4) -> Self {
        Self::new(MaterialData::Standard {
            color,
            roughness: 1.0,
            metalness: 0.0,
        })
    }

    /// Current version; bumped by every [`mark_dirty`](Self::mark_dirty).
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    /// Records what changed and bumps the version. Submeshes caching
    /// effects against the old version are stale from here on; the scene's
    /// `flush_material_dirty` propagates that to them.
    pub fn mark_dirty(&self, flags: MaterialDirtyFlags) {
        self.dirty_flags.fetch_or(flags.bits(), Ordering::Relaxed);
        self.version.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads and clears the accumulated dirty flags.
    pub fn take_dirty_flags(&self) -> MaterialDirtyFlags {
        let bits = self.dirty_flags.swap(0, Ordering::Relaxed);
        MaterialDirtyFlags::from_bits_truncate(bits)
    }

    /// Whether this material requires blending.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }

    /// Shader family implementing this material.
    #[must_use]
    pub fn shader_name(&self) -> &'static str {
        self.data.shader_name()
    }
}
