//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`ParallaxError`] covers the failure modes of the
//! geometry core:
//! - Vertex data validation errors (mismatched attribute counts, bad strides)
//! - Geometry slicing errors (submesh ranges outside the buffers)
//! - Scene-graph misuse (attaching a node to itself or to a missing parent)
//!
//! All of these are programmer-misuse errors: they are raised immediately at
//! the call site and are expected to be fixed by the caller, never retried.
//! Degenerate geometry (zero-length axes, empty meshes) is deliberately NOT
//! an error — those inputs no-op or propagate through as documented on the
//! individual operations, so a render pass can always complete.
//!
//! # Usage
//!
//! Public APIs that validate their input return [`Result<T>`], an alias for
//! `std::result::Result<T, ParallaxError>`.

use thiserror::Error;

use crate::geometry::VertexKind;

/// The main error type for the Parallax geometry core.
#[derive(Error, Debug)]
pub enum ParallaxError {
    // ========================================================================
    // Vertex Data Errors
    // ========================================================================
    /// An attribute's element count does not match the position count.
    #[error("The {kind} element count ({count}) does not match the positions count ({expected})")]
    MismatchedVertexCount {
        /// The offending attribute kind
        kind: VertexKind,
        /// Number of elements supplied for the attribute
        count: usize,
        /// Number of elements implied by the position attribute
        expected: usize,
    },

    /// Attribute data length is not a multiple of the kind's stride.
    #[error("The {kind} data length ({len}) is not a multiple of its stride ({stride})")]
    InvalidStride {
        /// The offending attribute kind
        kind: VertexKind,
        /// Raw float count supplied
        len: usize,
        /// Floats per element for this kind
        stride: usize,
    },

    /// Attempted to update vertex data that was not created as updatable.
    #[error("The {kind} attribute is not updatable")]
    NotUpdatable {
        /// The offending attribute kind
        kind: VertexKind,
    },

    /// In-place update changed the attribute's length.
    #[error("Updating {kind} must keep the element count ({expected}), got {count}")]
    UpdateSizeMismatch {
        /// The offending attribute kind
        kind: VertexKind,
        /// New element count
        count: usize,
        /// Existing element count
        expected: usize,
    },

    // ========================================================================
    // Mesh Slicing Errors
    // ========================================================================
    /// A submesh index range exceeds the mesh's index buffer.
    #[error("Submesh index range {start}..{end} exceeds index buffer length {len}")]
    SubMeshOutOfRange {
        /// First index of the range
        start: u32,
        /// One past the last index of the range
        end: u32,
        /// Index buffer length
        len: usize,
    },

    // ========================================================================
    // Scene-Graph Errors
    // ========================================================================
    /// Attempted to attach a node to itself.
    #[error("Cannot attach a node to itself")]
    SelfParenting,

    /// A node handle did not resolve to a live node.
    #[error("Node handle is stale or was removed")]
    NodeNotFound,
}

/// Alias for `Result<T, ParallaxError>`.
pub type Result<T> = std::result::Result<T, ParallaxError>;
