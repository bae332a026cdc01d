//! CPU-side vertex data storage.
//!
//! [`Geometry`] holds vertex attributes keyed by a fixed [`VertexKind`]
//! vocabulary plus an index buffer, and answers the narrow contract the
//! spatial core needs: "give me vertex data by semantic kind", "give me the
//! indices", "tell me when data changed" (version counters). GPU upload is a
//! collaborator concern and never appears here.

use glam::Vec3;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::errors::{ParallaxError, Result};

/// Fixed vocabulary of vertex attribute semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    /// 3 floats per vertex.
    Position,
    /// 3 floats per vertex.
    Normal,
    /// 4 floats per vertex (xyz + handedness).
    Tangent,
    /// 2 floats per vertex; `Uv(0)` through `Uv(5)` are the six channels.
    Uv(u8),
    /// 4 floats per vertex.
    Color,
    /// 4 floats per vertex.
    MatricesIndices,
    /// 4 floats per vertex.
    MatricesWeights,
    /// 4 floats per vertex, for more than 4 bone influencers.
    MatricesIndicesExtra,
    /// 4 floats per vertex, for more than 4 bone influencers.
    MatricesWeightsExtra,
}

impl VertexKind {
    /// Floats per element for this kind.
    #[must_use]
    pub fn stride(self) -> usize {
        match self {
            Self::Position | Self::Normal => 3,
            Self::Uv(_) => 2,
            Self::Tangent
            | Self::Color
            | Self::MatricesIndices
            | Self::MatricesWeights
            | Self::MatricesIndicesExtra
            | Self::MatricesWeightsExtra => 4,
        }
    }
}

impl std::fmt::Display for VertexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position => write!(f, "position"),
            Self::Normal => write!(f, "normal"),
            Self::Tangent => write!(f, "tangent"),
            Self::Uv(0) => write!(f, "uv"),
            Self::Uv(n) => write!(f, "uv{}", n + 1),
            Self::Color => write!(f, "color"),
            Self::MatricesIndices => write!(f, "matricesIndices"),
            Self::MatricesWeights => write!(f, "matricesWeights"),
            Self::MatricesIndicesExtra => write!(f, "matricesIndicesExtra"),
            Self::MatricesWeightsExtra => write!(f, "matricesWeightsExtra"),
        }
    }
}

/// One vertex attribute: raw floats plus update policy and a version counter.
#[derive(Debug, Clone)]
pub struct VertexData {
    data: Vec<f32>,
    updatable: bool,
    version: u64,
}

impl VertexData {
    /// Raw float storage.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Whether in-place updates are allowed.
    #[inline]
    #[must_use]
    pub fn updatable(&self) -> bool {
        self.updatable
    }

    /// Bumped on every in-place update, for change detection.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// CPU-side geometry: attributes by kind + an index buffer.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Stable resource identity.
    pub uuid: Uuid,
    attributes: FxHashMap<VertexKind, VertexData>,
    indices: Vec<u32>,
    data_version: u64,
}

impl Geometry {
    /// Creates an empty geometry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            attributes: FxHashMap::default(),
            indices: Vec::new(),
            data_version: 0,
        }
    }

    /// Bumped whenever any attribute or the index buffer changes.
    #[inline]
    #[must_use]
    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    // ========================================================================
    // Attribute access
    // ========================================================================

    /// Stores `data` under `kind`.
    ///
    /// Validates the stride, and — for every kind other than positions —
    /// that the element count matches the position count. Setting positions
    /// first is therefore required before any other attribute.
    pub fn set_vertices_data(&mut self, kind: VertexKind, data: Vec<f32>, updatable: bool) -> Result<()> {
        let stride = kind.stride();
        if data.len() % stride != 0 {
            return Err(ParallaxError::InvalidStride {
                kind,
                len: data.len(),
                stride,
            });
        }

        if kind != VertexKind::Position {
            let expected = self.total_vertices();
            let count = data.len() / stride;
            if expected != 0 && count != expected {
                return Err(ParallaxError::MismatchedVertexCount {
                    kind,
                    count,
                    expected,
                });
            }
        }

        self.attributes.insert(
            kind,
            VertexData {
                data,
                updatable,
                version: 0,
            },
        );
        self.data_version = self.data_version.wrapping_add(1);
        Ok(())
    }

    /// Overwrites an updatable attribute in place, keeping its length.
    pub fn update_vertices_data(&mut self, kind: VertexKind, data: &[f32]) -> Result<()> {
        let stride = kind.stride();
        let Some(attr) = self.attributes.get_mut(&kind) else {
            return Err(ParallaxError::NotUpdatable { kind });
        };
        if !attr.updatable {
            return Err(ParallaxError::NotUpdatable { kind });
        }
        if data.len() != attr.data.len() {
            return Err(ParallaxError::UpdateSizeMismatch {
                kind,
                count: data.len() / stride,
                expected: attr.data.len() / stride,
            });
        }

        attr.data.copy_from_slice(data);
        attr.version = attr.version.wrapping_add(1);
        self.data_version = self.data_version.wrapping_add(1);
        Ok(())
    }

    /// Raw float data for `kind`, if present.
    #[must_use]
    pub fn get_vertices_data(&self, kind: VertexKind) -> Option<&[f32]> {
        self.attributes.get(&kind).map(|a| a.data.as_slice())
    }

    /// Whether `kind` has been set.
    #[must_use]
    pub fn is_vertices_data_present(&self, kind: VertexKind) -> bool {
        self.attributes.contains_key(&kind)
    }

    /// Position data viewed as `Vec3`s.
    #[must_use]
    pub fn positions(&self) -> Option<&[Vec3]> {
        self.get_vertices_data(VertexKind::Position)
            .map(bytemuck::cast_slice)
    }

    /// Number of vertices implied by the position attribute (0 when unset).
    #[must_use]
    pub fn total_vertices(&self) -> usize {
        self.get_vertices_data(VertexKind::Position)
            .map_or(0, |data| data.len() / 3)
    }

    // ========================================================================
    // Indices
    // ========================================================================

    /// Replaces the index buffer.
    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
        self.data_version = self.data_version.wrapping_add(1);
    }

    /// The index buffer.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices.
    #[inline]
    #[must_use]
    pub fn total_indices(&self) -> usize {
        self.indices.len()
    }

    // ========================================================================
    // Bounds
    // ========================================================================

    /// Componentwise min/max of the position attribute over
    /// `[start, start + count)`, or the full range when `count` is 0.
    ///
    /// Returns `None` for geometry without positions (degenerate input is
    /// not an error here; callers fall back to a point-sized bound).
    #[must_use]
    pub fn extremes(&self, start: usize, count: usize) -> Option<(Vec3, Vec3)> {
        let positions = self.positions()?;
        if positions.is_empty() {
            return None;
        }

        let end = if count == 0 {
            positions.len()
        } else {
            (start + count).min(positions.len())
        };
        if start >= end {
            return None;
        }

        let mut minimum = Vec3::splat(f32::INFINITY);
        let mut maximum = Vec3::splat(f32::NEG_INFINITY);
        for p in &positions[start..end] {
            minimum = minimum.min(*p);
            maximum = maximum.max(*p);
        }
        Some((minimum, maximum))
    }
}
