//! Camera component: projection matrices and the culling frustum.

use glam::{Affine3A, Mat4};

use crate::culling::Frustum;

/// Projection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    /// Perspective projection.
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// Camera component.
///
/// The camera's placement comes from the node it is attached to; this
/// component only owns projection parameters and the matrices derived from
/// them. [`update_view_projection`](Self::update_view_projection) is called
/// by the scene whenever the owning node's world matrix changes, and the
/// frustum planes it extracts are what every `is_in_frustum` test consumes.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Projection kind.
    pub projection_type: ProjectionType,
    /// Vertical field of view in radians (perspective).
    pub fov: f32,
    /// Width / height.
    pub aspect: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Half height of the orthographic volume.
    pub ortho_size: f32,

    world_matrix: Affine3A,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_projection_matrix: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Perspective camera; `fov` in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            projection_type: ProjectionType::Perspective,
            fov: fov.to_radians(),
            aspect,
            near,
            far,
            ortho_size: 10.0,
            world_matrix: Affine3A::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Orthographic camera with the given half height.
    #[must_use]
    pub fn new_orthographic(ortho_size: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            projection_type: ProjectionType::Orthographic,
            fov: 0.0,
            aspect,
            near,
            far,
            ortho_size,
            world_matrix: Affine3A::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Rebuilds the projection matrix (and the frustum) after a parameter
    /// change. Uses a [0, 1] depth range.
    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = match self.projection_type {
            ProjectionType::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
            }
            ProjectionType::Orthographic => {
                let w = self.ortho_size * self.aspect;
                let h = self.ortho_size;
                Mat4::orthographic_rh(-w, w, -h, h, self.near, self.far)
            }
        };

        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(self.view_projection_matrix);
    }

    /// Refreshes the view, view-projection, and frustum from the owning
    /// node's world matrix.
    pub fn update_view_projection(&mut self, world: &Affine3A) {
        self.world_matrix = *world;
        self.view_matrix = Mat4::from(*world).inverse();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(self.view_projection_matrix);
    }

    /// The owning node's world matrix at the last update.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    /// View matrix (inverse of the world matrix).
    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix.
    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// View-projection matrix.
    #[inline]
    #[must_use]
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection_matrix
    }

    /// The culling frustum extracted from the view-projection matrix.
    #[inline]
    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}
