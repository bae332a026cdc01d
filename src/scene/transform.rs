//! Transform component
//!
//! Owns a node's local position, rotation, scale, pivot, and billboard
//! settings, plus the cached local and world matrices with their dirty
//! tracking. The component is pure data + cache logic; hierarchy-aware
//! composition (parents, billboards, infinite distance) lives in
//! [`transform_system`](crate::scene::transform_system).
//!
//! # Dirty tracking
//!
//! Mutations are detected by comparing the public TRS fields against a
//! private shadow copy taken at the last recompute, so plain field writes
//! mark the transform dirty without setter ceremony. Billboard mode, pivot,
//! and infinite-distance changes are tracked the same way. A frozen
//! transform never recomputes, regardless of dirtiness, until unfrozen.

use std::cell::Cell;

use bitflags::bitflags;
use glam::{Affine3A, EulerRot, Mat3, Quat, Vec3, Vec3A};

bitflags! {
    /// Axis mask constraining a node's orientation (or position-facing)
    /// toward the active camera.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BillboardMode: u32 {
        /// Rotate around X to face the camera.
        const X = 1;
        /// Rotate around Y to face the camera.
        const Y = 2;
        /// Rotate around Z to face the camera.
        const Z = 4;
        /// Face the camera on all axes.
        const ALL = 7;
        /// Face the camera's position instead of its orientation.
        const USE_POSITION = 128;
    }
}

/// Reference space for incremental mutators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// Relative to the node's own orientation.
    Local,
    /// Relative to the parent (or world for root nodes).
    World,
}

/// A node's orientation: Euler angles or a quaternion, never both.
///
/// Exactly one representation is authoritative at any time; assigning one
/// supersedes the other. [`Transform::rotate`] migrates Euler state to a
/// quaternion on first use (one-way), and [`Transform::absorb_euler`] is the
/// explicit merge for feeding later Euler increments back into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Euler angles in radians, composed in yaw (Y), pitch (X), roll (Z) order.
    Euler(Vec3),
    /// Quaternion orientation.
    Quaternion(Quat),
}

impl Rotation {
    /// The equivalent quaternion, converting Euler angles via Y-X-Z order.
    #[must_use]
    pub fn to_quat(self) -> Quat {
        match self {
            Self::Euler(e) => Quat::from_euler(EulerRot::YXZ, e.y, e.x, e.z),
            Self::Quaternion(q) => q,
        }
    }
}

#[derive(Debug, Clone)]
struct Pivot {
    matrix: Affine3A,
    /// Precomputed inverse, present only when the pivot offset should be
    /// cancelled in world space (post-multiplication).
    inverse: Option<Affine3A>,
}

/// Transform component with matrix caching and dirty tracking.
#[derive(Debug, Clone)]
pub struct Transform {
    // === Public attributes ===
    /// Local translation.
    pub position: Vec3,
    /// Local scale.
    pub scaling: Vec3,
    /// Sign/mirror factor applied to the scale during composition; lets a
    /// negatively-determinant parent (mirrored bone attachment) flip a
    /// subtree without touching `scaling` itself.
    pub scaling_determinant: f32,
    /// Camera-facing constraint mask.
    pub billboard_mode: BillboardMode,
    /// Root nodes with this flag translate relative to the active camera,
    /// so they never get closer (skyboxes).
    pub infinite_distance: bool,
    /// Suppresses the inherited non-uniform-scaling flag.
    pub ignore_non_uniform_scaling: bool,

    rotation: Rotation,
    pivot: Option<Pivot>,
    pivot_version: u32,

    // === Matrix cache ===
    local_matrix: Affine3A,
    world_matrix: Affine3A,

    // === Shadow state for dirty checking ===
    last_position: Vec3,
    last_rotation: Rotation,
    last_scaling: Vec3,
    last_billboard_mode: BillboardMode,
    last_infinite_distance: bool,
    last_pivot_version: u32,
    force_update: bool,
    frozen: bool,
    current_render_id: u32,

    // === Derived state, refreshed on every actual recompute ===
    absolute_position: Vec3,
    absolute_scaling: Cell<Vec3>,
    absolute_rotation: Cell<Quat>,
    absolute_valid: Cell<bool>,
    non_uniform_scaling: bool,
    world_determinant: Cell<Option<f32>>,
    pose_matrix: Option<Affine3A>,
}

impl Transform {
    /// Identity transform, dirty so the first compute always runs.
    #[must_use]
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            scaling: Vec3::ONE,
            scaling_determinant: 1.0,
            billboard_mode: BillboardMode::empty(),
            infinite_distance: false,
            ignore_non_uniform_scaling: false,

            rotation: Rotation::Euler(Vec3::ZERO),
            pivot: None,
            pivot_version: 0,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            last_position: Vec3::ZERO,
            last_rotation: Rotation::Euler(Vec3::ZERO),
            last_scaling: Vec3::ONE,
            last_billboard_mode: BillboardMode::empty(),
            last_infinite_distance: false,
            last_pivot_version: 0,
            force_update: true,
            frozen: false,
            current_render_id: u32::MAX,

            absolute_position: Vec3::ZERO,
            absolute_scaling: Cell::new(Vec3::ONE),
            absolute_rotation: Cell::new(Quat::IDENTITY),
            absolute_valid: Cell::new(true),
            non_uniform_scaling: false,
            world_determinant: Cell::new(None),
            pose_matrix: None,
        }
    }

    // ========================================================================
    // Rotation accessors (sum-type exclusivity)
    // ========================================================================

    /// The authoritative rotation representation.
    #[inline]
    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Euler angles, or zero while a quaternion is authoritative.
    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        match self.rotation {
            Rotation::Euler(e) => e,
            Rotation::Quaternion(_) => Vec3::ZERO,
        }
    }

    /// The quaternion, or `None` while Euler angles are authoritative.
    #[must_use]
    pub fn rotation_quaternion(&self) -> Option<Quat> {
        match self.rotation {
            Rotation::Euler(_) => None,
            Rotation::Quaternion(q) => Some(q),
        }
    }

    /// Makes Euler angles authoritative (supersedes any quaternion).
    #[inline]
    pub fn set_rotation_euler(&mut self, euler: Vec3) {
        self.rotation = Rotation::Euler(euler);
    }

    /// Makes a quaternion authoritative (zeroes the Euler representation).
    #[inline]
    pub fn set_rotation_quaternion(&mut self, quaternion: Quat) {
        self.rotation = Rotation::Quaternion(quaternion);
    }

    /// Explicitly merges an Euler increment into the quaternion.
    ///
    /// This is the reintegration path for callers that keep writing Euler
    /// angles after the one-way quaternion migration: call it with the
    /// accumulated angles whenever they change.
    pub fn absorb_euler(&mut self, euler: Vec3) {
        let q = self.rotation.to_quat();
        let delta = Quat::from_euler(EulerRot::YXZ, euler.y, euler.x, euler.z);
        self.rotation = Rotation::Quaternion(q * delta);
    }

    // ========================================================================
    // Pivot
    // ========================================================================

    /// Sets the pivot matrix applied before scale/rotation.
    ///
    /// With `post_multiply` the precomputed pivot inverse is appended so the
    /// pivot offset cancels out of the world translation (the node rotates
    /// and scales about the pivot without moving its logical position).
    /// An identity matrix clears the pivot.
    pub fn set_pivot_matrix(&mut self, matrix: Affine3A, post_multiply: bool) {
        if matrix == Affine3A::IDENTITY {
            self.pivot = None;
        } else {
            self.pivot = Some(Pivot {
                matrix,
                inverse: post_multiply.then(|| matrix.inverse()),
            });
        }
        self.pivot_version = self.pivot_version.wrapping_add(1);
    }

    /// The active pivot matrix (identity when none).
    #[must_use]
    pub fn pivot_matrix(&self) -> Affine3A {
        self.pivot
            .as_ref()
            .map_or(Affine3A::IDENTITY, |p| p.matrix)
    }

    // ========================================================================
    // Dirty state
    // ========================================================================

    /// Whether any TRS field changed since the last recompute.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.force_update
            || self.position != self.last_position
            || self.rotation != self.last_rotation
            || self.scaling != self.last_scaling
    }

    /// A transform is synchronized when nothing forces a recompute: TRS
    /// clean, billboard mode unchanged and inactive, pivot unchanged, and
    /// not at infinite distance.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        !self.is_dirty()
            && self.billboard_mode == self.last_billboard_mode
            && (self.billboard_mode & BillboardMode::ALL).is_empty()
            && !self.infinite_distance
            && self.infinite_distance == self.last_infinite_distance
            && self.pivot_version == self.last_pivot_version
    }

    /// Forces the next compute to run.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }

    /// Captures the supplied world matrix (or keeps the current one) and
    /// stops all recomputation until [`unfreeze_world_matrix`](Self::unfreeze_world_matrix).
    pub fn freeze_world_matrix(&mut self, world: Option<Affine3A>) {
        if let Some(world) = world {
            self.set_world_matrix(world);
        }
        self.frozen = true;
    }

    /// Re-enables recomputation and marks the transform dirty.
    pub fn unfreeze_world_matrix(&mut self) {
        self.frozen = false;
        self.force_update = true;
    }

    /// Whether the world matrix is frozen.
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Render id recorded at the last compute (cache hits update it too).
    #[inline]
    #[must_use]
    pub fn current_render_id(&self) -> u32 {
        self.current_render_id
    }

    #[inline]
    pub(crate) fn set_current_render_id(&mut self, render_id: u32) {
        self.current_render_id = render_id;
    }

    // ========================================================================
    // Matrix access
    // ========================================================================

    /// The cached local matrix.
    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    /// The cached world matrix.
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    /// Determinant of the world matrix's linear part, cached until the next
    /// recompute.
    #[must_use]
    pub fn world_matrix_determinant(&self) -> f32 {
        if let Some(det) = self.world_determinant.get() {
            return det;
        }
        let det = Mat3::from(self.world_matrix.matrix3).determinant();
        self.world_determinant.set(Some(det));
        det
    }

    /// World translation recorded at the last recompute.
    #[inline]
    #[must_use]
    pub fn absolute_position(&self) -> Vec3 {
        self.absolute_position
    }

    /// World scale, decomposed lazily from the world matrix.
    #[must_use]
    pub fn absolute_scaling(&self) -> Vec3 {
        self.sync_absolute();
        self.absolute_scaling.get()
    }

    /// World rotation, decomposed lazily from the world matrix.
    #[must_use]
    pub fn absolute_rotation(&self) -> Quat {
        self.sync_absolute();
        self.absolute_rotation.get()
    }

    fn sync_absolute(&self) {
        if self.absolute_valid.get() {
            return;
        }
        let (scale, rotation, _) = self.world_matrix.to_scale_rotation_translation();
        self.absolute_scaling.set(scale);
        self.absolute_rotation.set(rotation);
        self.absolute_valid.set(true);
    }

    /// Whether the world matrix carries non-uniform scale (own or inherited).
    #[inline]
    #[must_use]
    pub fn non_uniform_scaling(&self) -> bool {
        self.non_uniform_scaling
    }

    /// Rest pose, lazily initialized to the inverse of the first computed
    /// world matrix.
    #[inline]
    #[must_use]
    pub fn pose_matrix(&self) -> Option<&Affine3A> {
        self.pose_matrix.as_ref()
    }

    // ========================================================================
    // Incremental mutators
    // ========================================================================

    /// Moves along `axis` by `distance`, in local or parent space.
    pub fn translate(&mut self, axis: Vec3, distance: f32, space: Space) {
        let displacement = match space {
            Space::Local => self.rotation.to_quat() * (axis * distance),
            Space::World => axis * distance,
        };
        self.position += displacement;
    }

    /// Rotates around `axis` by `amount` radians.
    ///
    /// Migrates an Euler rotation to a quaternion on first use; the Euler
    /// representation is superseded from then on (use
    /// [`absorb_euler`](Self::absorb_euler) to feed later Euler writes back in).
    pub fn rotate(&mut self, axis: Vec3, amount: f32, space: Space) {
        let q = self.rotation.to_quat();
        let delta = Quat::from_axis_angle(axis.normalize(), amount);
        let rotated = match space {
            Space::Local => q * delta,
            Space::World => delta * q,
        };
        self.rotation = Rotation::Quaternion(rotated);
    }

    /// Rotates around a point in parent space, updating both position and
    /// orientation.
    pub fn rotate_around(&mut self, point: Vec3, axis: Vec3, amount: f32) {
        let delta = Quat::from_axis_angle(axis.normalize(), amount);
        let q = self.rotation.to_quat();
        self.position = delta * (self.position - point) + point;
        self.rotation = Rotation::Quaternion(delta * q);
    }

    /// Accumulates a yaw-pitch-roll increment on top of the current rotation.
    pub fn add_rotation(&mut self, x: f32, y: f32, z: f32) {
        let q = self.rotation.to_quat();
        let delta = Quat::from_euler(EulerRot::YXZ, y, x, z);
        self.rotation = Rotation::Quaternion(q * delta);
    }

    /// Orients the node so its forward axis points along `direction`
    /// (parent space), with optional yaw/pitch/roll corrections.
    ///
    /// A zero-length direction degenerates to an identity-ish orientation
    /// rather than an error; this mirrors the source engine's behavior.
    pub fn set_direction(&mut self, direction: Vec3, yaw_cor: f32, pitch_cor: f32, roll_cor: f32) {
        let yaw = -direction.z.atan2(direction.x) + std::f32::consts::FRAC_PI_2 + yaw_cor;
        let len = (direction.x * direction.x + direction.z * direction.z).sqrt();
        let pitch = -direction.y.atan2(len) + pitch_cor;
        self.rotation = Rotation::Quaternion(Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll_cor));
    }

    /// Orients the node to look at `target` (parent space).
    ///
    /// No-op when the forward direction is collinear with `up`.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();

        if forward.cross(up).length_squared() < 1e-4 {
            return;
        }

        let right = forward.cross(up).normalize();
        let new_up = right.cross(forward).normalize();

        let rot_mat = Mat3::from_cols(right, new_up, -forward);
        self.rotation = Rotation::Quaternion(Quat::from_mat3(&rot_mat));
    }

    /// Assigns TRS from a decomposed matrix (used by reparenting to keep the
    /// world pose). Shear is lost in the decomposition.
    pub fn set_trs_from(&mut self, matrix: &Affine3A) {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        self.scaling = scale;
        self.rotation = Rotation::Quaternion(rotation);
        self.position = translation;
    }

    // ========================================================================
    // Composition internals (driven by transform_system)
    // ========================================================================

    /// Re-orients toward a world-space position (position billboarding),
    /// constrained to the given axes.
    pub(crate) fn face_position(&mut self, target: Vec3, axes: BillboardMode) {
        let direction = target - self.absolute_position;
        let yaw = -direction.z.atan2(direction.x) + std::f32::consts::FRAC_PI_2;
        let len = (direction.x * direction.x + direction.z * direction.z).sqrt();
        let pitch = -direction.y.atan2(len);

        let x = if axes.contains(BillboardMode::X) { pitch } else { 0.0 };
        let y = if axes.contains(BillboardMode::Y) { yaw } else { 0.0 };

        self.rotation = Rotation::Quaternion(Quat::from_euler(EulerRot::YXZ, y, x, 0.0));
    }

    /// Composes the local matrix from scale, rotation, pivot, and the final
    /// translation chosen by the caller (camera-relative for
    /// infinite-distance roots).
    pub(crate) fn compose_local(&mut self, translation: Vec3) {
        let scale = self.scaling * self.scaling_determinant;
        let rotation = self.rotation.to_quat();

        self.local_matrix = match &self.pivot {
            None => Affine3A::from_scale_rotation_translation(scale, rotation, translation),
            Some(pivot) => {
                // pivot first, then scale and rotation, then the optional
                // inverse that cancels the pivot offset in world space
                let mut m = Affine3A::from_quat(rotation)
                    * Affine3A::from_scale(scale)
                    * pivot.matrix;
                if let Some(inverse) = pivot.inverse {
                    m = inverse * m;
                }
                m.translation += Vec3A::from(translation);
                m
            }
        };
    }

    /// Installs a recomputed world matrix and refreshes everything derived
    /// from it. The caller decides observer notification.
    pub(crate) fn finish_world_update(&mut self, world: Affine3A, render_id: u32) {
        self.set_world_matrix(world);
        self.current_render_id = render_id;

        // Sync shadow state
        self.last_position = self.position;
        self.last_rotation = self.rotation;
        self.last_scaling = self.scaling;
        self.last_billboard_mode = self.billboard_mode;
        self.last_infinite_distance = self.infinite_distance;
        self.last_pivot_version = self.pivot_version;
        self.force_update = false;
    }

    pub(crate) fn set_world_matrix(&mut self, world: Affine3A) {
        self.world_matrix = world;
        self.absolute_position = world.translation.into();
        self.absolute_valid.set(false);
        self.world_determinant.set(None);
        if self.pose_matrix.is_none() {
            self.pose_matrix = Some(world.inverse());
        }
    }

    pub(crate) fn set_non_uniform_scaling(&mut self, value: bool) {
        self.non_uniform_scaling = value;
    }

    /// Whether the local scale has two components differing by more than 1e-6.
    #[must_use]
    pub(crate) fn has_non_uniform_scale(&self) -> bool {
        let s = self.scaling;
        (s.x - s.y).abs() > 1e-6 || (s.x - s.z).abs() > 1e-6 || (s.y - s.z).abs() > 1e-6
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
