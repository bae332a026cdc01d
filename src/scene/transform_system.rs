//! Transform System
//!
//! Hierarchical world-matrix computation, decoupled from `Scene` so it only
//! borrows the node arena and the per-frame context. The traversal is
//! iterative (explicit stack) to survive deep hierarchies.
//!
//! # Recompute order
//!
//! For a node that is dirty, forced, or whose parent changed this frame:
//! 1. position-based billboards re-orient toward the camera position first
//! 2. scale (× `scaling_determinant`), rotation, and translation
//!    (camera-relative for infinite-distance roots) compose the local matrix,
//!    routed through the pivot when one is set
//! 3. parent composition — orientation billboards keep only the parent
//!    translation; a `transform_referral` inserts an extra multiply
//! 4. orientation billboards rebuild the world rotation from the camera's
//!    constrained orientation, preserving the computed translation
//! 5. non-uniform-scaling flag and world-derived caches refresh
//!
//! Nodes that actually recomputed are pushed to the caller's `updated` list;
//! the scene fires after-update observers and syncs mesh bounds from it.

use glam::{Affine3A, EulerRot, Mat3A, Quat, Vec3};
use slotmap::SlotMap;

use crate::scene::NodeKey;
use crate::scene::node::Node;
use crate::scene::transform::{BillboardMode, Transform};

/// Per-frame inputs for world-matrix computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldUpdateContext {
    /// External render-id counter gating redundant recomputation within a
    /// frame.
    pub render_id: u32,
    /// World matrix of the active camera, consumed by billboards and
    /// infinite-distance translation. `None` disables both paths.
    pub camera_world: Option<Affine3A>,
}

/// Restricts a rotation to the billboard axis mask, in Y-X-Z Euler space.
fn constrain_rotation(rotation: Quat, axes: BillboardMode) -> Quat {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    let x = if axes.contains(BillboardMode::X) { pitch } else { 0.0 };
    let y = if axes.contains(BillboardMode::Y) { yaw } else { 0.0 };
    let z = if axes.contains(BillboardMode::Z) { roll } else { 0.0 };
    Quat::from_euler(EulerRot::YXZ, y, x, z)
}

/// Composes one transform's world matrix. Pure function of the transform,
/// its parent's state, and the frame context.
fn compose_world(
    t: &mut Transform,
    parent: Option<(Affine3A, bool)>,
    referral_world: Option<Affine3A>,
    ctx: &WorldUpdateContext,
) -> Affine3A {
    let billboard_axes = t.billboard_mode & BillboardMode::ALL;
    let billboarded = !billboard_axes.is_empty() && ctx.camera_world.is_some();
    let position_billboard = billboarded && t.billboard_mode.contains(BillboardMode::USE_POSITION);

    // 1. Position-based billboarding re-orients before composition
    if position_billboard
        && let Some(camera) = &ctx.camera_world
    {
        t.face_position(camera.translation.into(), billboard_axes);
    }

    // 2. Translation is camera-relative for infinite-distance roots
    let translation = if t.infinite_distance && parent.is_none() {
        match &ctx.camera_world {
            Some(camera) => Vec3::from(camera.translation) + t.position,
            None => t.position,
        }
    } else {
        t.position
    };
    t.compose_local(translation);
    let local = *t.local_matrix();

    // 3. Parent composition
    let mut world = match parent {
        Some((parent_world, _)) => {
            if billboarded && !position_billboard {
                // Orientation billboards ignore parent scale and rotation so
                // the node faces the camera regardless of its ancestors
                let mut w = local;
                w.translation += parent_world.translation;
                w
            } else if let Some(referral) = referral_world {
                referral * parent_world * local
            } else {
                parent_world * local
            }
        }
        None => local,
    };

    // 4. Orientation billboarding: adopt the camera's constrained rotation,
    //    keep the translation computed above
    if billboarded
        && !position_billboard
        && let Some(camera) = &ctx.camera_world
    {
        let (_, camera_rotation, _) = camera.to_scale_rotation_translation();
        let constrained = constrain_rotation(camera_rotation, billboard_axes);
        let scale = t.scaling * t.scaling_determinant;

        let translation = world.translation;
        world.matrix3 = Mat3A::from_quat(constrained) * Mat3A::from_diagonal(scale);
        world.translation = translation;
    }

    // 5. Non-uniform scaling: own scale or inherited from the parent
    let parent_non_uniform = parent.is_some_and(|(_, nu)| nu);
    let non_uniform =
        !t.ignore_non_uniform_scaling && (t.has_non_uniform_scale() || parent_non_uniform);
    t.set_non_uniform_scaling(non_uniform);

    world
}

/// Updates one node against an already-resolved parent state.
///
/// Returns `true` when the world matrix was actually recomputed; cache hits
/// and frozen transforms return `false` (but still record the render id).
fn update_single_node(
    node: &mut Node,
    parent: Option<(Affine3A, bool)>,
    referral_world: Option<Affine3A>,
    ctx: &WorldUpdateContext,
    force: bool,
    parent_changed: bool,
) -> bool {
    let t = &mut node.transform;

    if t.is_frozen() {
        t.set_current_render_id(ctx.render_id);
        return false;
    }

    // A clean transform is a cache hit when it is synchronized, or when it
    // was already computed under this render id (billboards recompute once
    // per frame, not once per query)
    if !force
        && !parent_changed
        && !t.is_dirty()
        && (t.current_render_id() == ctx.render_id || t.is_synchronized())
    {
        t.set_current_render_id(ctx.render_id);
        return false;
    }

    let world = compose_world(t, parent, referral_world, ctx);
    t.finish_world_update(world, ctx.render_id);
    true
}

/// Updates the whole hierarchy iteratively, appending every node that
/// actually recomputed to `updated`.
pub fn update_hierarchy(
    nodes: &mut SlotMap<NodeKey, Node>,
    roots: &[NodeKey],
    ctx: &WorldUpdateContext,
    updated: &mut Vec<NodeKey>,
) {
    // Work stack: (key, parent world + non-uniform flag, parent changed)
    let mut stack: Vec<(NodeKey, Option<(Affine3A, bool)>, bool)> = Vec::with_capacity(64);

    for &root in roots.iter().rev() {
        stack.push((root, None, false));
    }

    while let Some((key, parent, parent_changed)) = stack.pop() {
        let referral_world = nodes
            .get(key)
            .and_then(|n| n.transform_referral)
            .and_then(|r| nodes.get(r))
            .map(|r| *r.transform.world_matrix());

        let Some(node) = nodes.get_mut(key) else {
            continue;
        };

        let recomputed = update_single_node(node, parent, referral_world, ctx, false, parent_changed);
        if recomputed {
            updated.push(key);
        }

        let child_parent = Some((
            *node.transform.world_matrix(),
            node.transform.non_uniform_scaling(),
        ));
        let child_count = node.children.len();

        for i in (0..child_count).rev() {
            if let Some(node) = nodes.get(key)
                && let Some(&child) = node.children.get(i)
            {
                stack.push((child, child_parent, recomputed || parent_changed));
            }
        }
    }
}

/// Computes a single node's world matrix on demand, resolving the ancestor
/// chain first (ancestors are never forced; cache hits are cheap).
///
/// Returns the up-to-date world matrix, or identity for a stale key.
pub fn compute_world_matrix(
    nodes: &mut SlotMap<NodeKey, Node>,
    key: NodeKey,
    ctx: &WorldUpdateContext,
    force: bool,
    updated: &mut Vec<NodeKey>,
) -> Affine3A {
    // Collect the ancestor chain, root first
    let mut chain: Vec<NodeKey> = Vec::new();
    let mut cursor = Some(key);
    while let Some(k) = cursor {
        chain.push(k);
        cursor = nodes.get(k).and_then(|n| n.parent);
    }
    chain.reverse();

    let mut parent: Option<(Affine3A, bool)> = None;
    let mut parent_changed = false;

    for k in chain {
        let referral_world = nodes
            .get(k)
            .and_then(|n| n.transform_referral)
            .and_then(|r| nodes.get(r))
            .map(|r| *r.transform.world_matrix());

        let Some(node) = nodes.get_mut(k) else {
            return Affine3A::IDENTITY;
        };

        let force_this = force && k == key;
        let recomputed =
            update_single_node(node, parent, referral_world, ctx, force_this, parent_changed);
        if recomputed {
            updated.push(k);
        }

        parent = Some((
            *node.transform.world_matrix(),
            node.transform.non_uniform_scaling(),
        ));
        parent_changed = recomputed || parent_changed;
    }

    parent.map_or(Affine3A::IDENTITY, |(world, _)| world)
}
