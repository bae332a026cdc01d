//! Light component, kept minimal: the spatial core only needs enough to
//! associate light sources with meshes by range.

use glam::Vec3;

/// Light kind with the parameters relevant to range association.
#[derive(Debug, Clone, Copy)]
pub enum LightKind {
    /// Affects everything.
    Directional,
    /// Omnidirectional with a finite range.
    Point {
        /// Influence radius in world units.
        range: f32,
    },
    /// Cone light with a finite range.
    Spot {
        /// Influence radius in world units.
        range: f32,
        /// Inner cone half-angle in radians.
        inner_cone: f32,
        /// Outer cone half-angle in radians.
        outer_cone: f32,
    },
}

/// Light component.
#[derive(Debug, Clone)]
pub struct Light {
    /// Linear RGB color.
    pub color: Vec3,
    /// Scalar intensity.
    pub intensity: f32,
    /// Kind and range parameters.
    pub kind: LightKind,
    /// Disabled lights are skipped by the light-source association sweep.
    pub enabled: bool,
}

impl Light {
    /// A white light of the given kind.
    #[must_use]
    pub fn new(kind: LightKind) -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
            kind,
            enabled: true,
        }
    }

    /// Whether a bounding sphere at `center`/`radius` is within this light's
    /// influence when the light sits at `light_position`.
    #[must_use]
    pub fn affects_sphere(&self, light_position: Vec3, center: Vec3, radius: f32) -> bool {
        if !self.enabled {
            return false;
        }
        match self.kind {
            LightKind::Directional => true,
            LightKind::Point { range } | LightKind::Spot { range, .. } => {
                let reach = range + radius;
                light_position.distance_squared(center) <= reach * reach
            }
        }
    }
}
