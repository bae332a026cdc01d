//! Transform and world-matrix pipeline tests
//!
//! Tests for:
//! - TRS composition against a hand-built matrix
//! - Cache invalidation and observer firing
//! - Frozen world matrices
//! - Rotation representation exclusivity
//! - Pivot matrices (with and without post-multiplied inverse)
//! - Reparenting with world-pose preservation
//! - Billboarding and infinite distance

use std::cell::Cell;
use std::rc::Rc;

use glam::{Affine3A, Quat, Vec3};
use parallax::scene::{BillboardMode, Camera, Node, Scene, Space};

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn affine_approx(a: &Affine3A, b: &Affine3A) -> bool {
    let am = a.to_cols_array();
    let bm = b.to_cols_array();
    am.iter().zip(bm.iter()).all(|(x, y)| (x - y).abs() < 1e-6)
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn world_matrix_equals_trs_composition() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));

    let rotation = Quat::from_rotation_y(0.8);
    {
        let node = scene.get_node_mut(key).unwrap();
        node.transform.position = Vec3::new(1.0, 2.0, 3.0);
        node.transform.scaling = Vec3::new(2.0, 2.0, 2.0);
        node.transform.set_rotation_quaternion(rotation);
    }

    let world = scene.compute_world_matrix(key, false);
    let expected = Affine3A::from_scale_rotation_translation(
        Vec3::splat(2.0),
        rotation,
        Vec3::new(1.0, 2.0, 3.0),
    );
    assert!(affine_approx(&world, &expected));
}

#[test]
fn euler_rotation_composes_yaw_pitch_roll() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));
    scene
        .get_node_mut(key)
        .unwrap()
        .transform
        .set_rotation_euler(Vec3::new(0.3, 0.7, 0.1));

    let world = scene.compute_world_matrix(key, false);
    let expected = Quat::from_euler(glam::EulerRot::YXZ, 0.7, 0.3, 0.1);
    let (_, rotation, _) = world.to_scale_rotation_translation();
    assert!(rotation.angle_between(expected) < 1e-5);
}

// ============================================================================
// Cache invalidation & observers
// ============================================================================

#[test]
fn cache_hit_skips_recompute_and_observers() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));

    let fired = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&fired);
    scene.on_after_world_matrix_update(key, Box::new(move |_| counter.set(counter.get() + 1)));

    scene
        .get_node_mut(key)
        .unwrap()
        .transform
        .position = Vec3::X;

    let first = scene.compute_world_matrix(key, false);
    assert_eq!(fired.get(), 1, "first compute must fire the observer");

    // No mutation: cache hit, observer silent
    let second = scene.compute_world_matrix(key, false);
    assert_eq!(fired.get(), 1, "cache hit must not fire the observer");
    assert!(affine_approx(&first, &second));

    // Mutation: exactly one more firing
    scene.get_node_mut(key).unwrap().transform.position = Vec3::new(5.0, 0.0, 0.0);
    let third = scene.compute_world_matrix(key, false);
    assert_eq!(fired.get(), 2);
    assert!(approx_eq(third.translation.x, 5.0));
}

#[test]
fn force_recomputes_clean_transform() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));

    let fired = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&fired);
    scene.on_after_world_matrix_update(key, Box::new(move |_| counter.set(counter.get() + 1)));

    scene.compute_world_matrix(key, false);
    scene.compute_world_matrix(key, true);
    assert_eq!(fired.get(), 2, "force must bypass the cache");
}

// ============================================================================
// Freezing
// ============================================================================

#[test]
fn frozen_world_matrix_ignores_mutations() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));
    scene.get_node_mut(key).unwrap().transform.position = Vec3::X;
    scene.compute_world_matrix(key, false);

    scene.freeze_world_matrix(key, None);

    scene.get_node_mut(key).unwrap().transform.position = Vec3::new(100.0, 0.0, 0.0);
    let world = scene.compute_world_matrix(key, false);
    assert!(
        approx_eq(world.translation.x, 1.0),
        "frozen matrix must not move"
    );

    scene.unfreeze_world_matrix(key);
    let world = scene.compute_world_matrix(key, false);
    assert!(
        approx_eq(world.translation.x, 100.0),
        "unfreeze must recompute from the mutated position"
    );
}

#[test]
fn freeze_can_capture_a_supplied_matrix() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));

    let supplied = Affine3A::from_translation(Vec3::new(7.0, 0.0, 0.0));
    scene.freeze_world_matrix(key, Some(supplied));

    let world = scene.compute_world_matrix(key, false);
    assert!(approx_eq(world.translation.x, 7.0));
}

// ============================================================================
// Rotation exclusivity
// ============================================================================

#[test]
fn quaternion_supersedes_euler_and_back() {
    let mut node = Node::new("n");

    node.transform.set_rotation_euler(Vec3::new(0.1, 0.2, 0.3));
    assert!(node.transform.rotation_quaternion().is_none());

    node.transform
        .set_rotation_quaternion(Quat::from_rotation_x(1.0));
    assert_eq!(
        node.transform.rotation_euler(),
        Vec3::ZERO,
        "assigning a quaternion zeroes the euler representation"
    );

    node.transform.set_rotation_euler(Vec3::new(0.4, 0.0, 0.0));
    assert!(
        node.transform.rotation_quaternion().is_none(),
        "assigning euler angles nulls the quaternion"
    );
}

// ============================================================================
// Pivot
// ============================================================================

#[test]
fn post_multiplied_pivot_cancels_in_world_space() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));
    {
        let t = &mut scene.get_node_mut(key).unwrap().transform;
        t.position = Vec3::new(5.0, 0.0, 0.0);
        t.set_pivot_matrix(Affine3A::from_translation(Vec3::new(-1.0, 0.0, 0.0)), true);
    }

    let world = scene.compute_world_matrix(key, false);
    assert!(
        vec3_approx(world.translation.into(), Vec3::new(5.0, 0.0, 0.0)),
        "pivot offset must cancel: got {:?}",
        world.translation
    );
}

#[test]
fn pivot_offsets_rotation_center() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));
    {
        let t = &mut scene.get_node_mut(key).unwrap().transform;
        // Rotate 180 degrees around Y about a pivot at x = +1
        t.set_pivot_matrix(Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)), false);
        t.set_rotation_quaternion(Quat::from_rotation_y(std::f32::consts::PI));
    }

    let world = scene.compute_world_matrix(key, false);
    // The pivot point itself maps to (-1, 0, 0) after the rotation
    let origin = world.transform_point3(Vec3::ZERO);
    assert!(vec3_approx(origin, Vec3::new(-1.0, 0.0, 0.0)));
}

// ============================================================================
// Hierarchy & reparenting
// ============================================================================

#[test]
fn child_inherits_parent_transform() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new("parent"));
    let child = scene.add_to_parent(Node::new("child"), parent);

    {
        let t = &mut scene.get_node_mut(parent).unwrap().transform;
        t.position = Vec3::new(5.0, 0.0, 0.0);
        t.set_rotation_quaternion(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        t.scaling = Vec3::splat(2.0);
    }
    scene.get_node_mut(child).unwrap().transform.position = Vec3::X;

    scene.update_world_matrices();

    // (1,0,0) rotated 90 degrees about Y is (0,0,-1), scaled by 2, offset by (5,0,0)
    let world = *scene.get_node(child).unwrap().world_matrix();
    assert!(vec3_approx(world.translation.into(), Vec3::new(5.0, 0.0, -2.0)));
}

#[test]
fn set_parent_preserves_world_pose() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new("parent"));
    let child = scene.add_node(Node::new("child"));

    {
        let t = &mut scene.get_node_mut(parent).unwrap().transform;
        t.position = Vec3::new(10.0, 0.0, 0.0);
        t.set_rotation_quaternion(Quat::from_rotation_y(0.5));
        t.scaling = Vec3::splat(2.0);
    }
    scene.get_node_mut(child).unwrap().transform.position = Vec3::new(3.0, 4.0, 5.0);

    let before = scene.compute_world_matrix(child, false);

    scene.set_parent(child, Some(parent)).unwrap();
    scene.update_world_matrices();
    let after = *scene.get_node(child).unwrap().world_matrix();

    assert!(
        affine_approx(&before, &after),
        "world pose must survive reparenting"
    );

    // And un-parenting restores it as well
    scene.set_parent(child, None).unwrap();
    scene.update_world_matrices();
    let detached = *scene.get_node(child).unwrap().world_matrix();
    assert!(affine_approx(&before, &detached));
}

#[test]
fn set_parent_rejects_self() {
    let mut scene = Scene::new();
    let key = scene.add_node(Node::new("n"));
    assert!(scene.set_parent(key, Some(key)).is_err());
}

#[test]
fn remove_node_reparents_children_to_root() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new("parent"));
    let child = scene.add_to_parent(Node::new("child"), parent);

    scene.remove_node(parent);

    let node = scene.get_node(child).expect("child must survive disposal");
    assert!(node.parent().is_none());
    assert!(scene.root_nodes().contains(&child));
}

// ============================================================================
// Incremental mutators
// ============================================================================

#[test]
fn translate_local_space_respects_orientation() {
    let mut node = Node::new("n");
    node.transform
        .set_rotation_quaternion(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
    node.transform.translate(Vec3::X, 3.0, Space::Local);
    assert!(vec3_approx(node.transform.position, Vec3::new(0.0, 0.0, -3.0)));
}

#[test]
fn rotate_migrates_to_quaternion_permanently() {
    let mut node = Node::new("n");
    node.transform.set_rotation_euler(Vec3::new(0.0, 0.5, 0.0));
    node.transform.rotate(Vec3::Y, 0.25, Space::Local);

    assert!(node.transform.rotation_quaternion().is_some());
    let expected = Quat::from_rotation_y(0.75);
    assert!(
        node.transform
            .rotation_quaternion()
            .unwrap()
            .angle_between(expected)
            < 1e-5
    );
}

// ============================================================================
// Billboarding & infinite distance
// ============================================================================

fn scene_with_camera(camera_world: Affine3A) -> (Scene, parallax::scene::NodeKey) {
    let mut scene = Scene::new();
    let camera_key = scene.add_camera(Camera::new_perspective(60.0, 1.0, 0.1, 100.0));
    scene.get_node_mut(camera_key).unwrap().transform.position = camera_world.translation.into();
    if camera_world.matrix3 != glam::Mat3A::IDENTITY {
        let (_, rotation, _) = camera_world.to_scale_rotation_translation();
        scene
            .get_node_mut(camera_key)
            .unwrap()
            .transform
            .set_rotation_quaternion(rotation);
    }
    scene.active_camera = Some(camera_key);
    (scene, camera_key)
}

#[test]
fn billboard_all_adopts_camera_rotation() {
    let camera_rotation = Quat::from_rotation_y(0.6);
    let (mut scene, _) = scene_with_camera(Affine3A::from_quat(camera_rotation));

    let key = scene.add_node(Node::new("sprite"));
    {
        let t = &mut scene.get_node_mut(key).unwrap().transform;
        t.billboard_mode = BillboardMode::ALL;
        t.position = Vec3::new(0.0, 0.0, -5.0);
    }

    scene.update_world_matrices();
    let world = *scene.get_node(key).unwrap().world_matrix();
    let (_, rotation, translation) = world.to_scale_rotation_translation();

    assert!(rotation.angle_between(camera_rotation) < 1e-4);
    assert!(vec3_approx(translation, Vec3::new(0.0, 0.0, -5.0)));
}

#[test]
fn billboard_recomputes_every_frame() {
    let (mut scene, _) = scene_with_camera(Affine3A::IDENTITY);
    let key = scene.add_node(Node::new("sprite"));
    scene.get_node_mut(key).unwrap().transform.billboard_mode = BillboardMode::ALL;

    let fired = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&fired);
    scene.on_after_world_matrix_update(key, Box::new(move |_| counter.set(counter.get() + 1)));

    scene.update();
    scene.update();
    assert!(
        fired.get() >= 2,
        "billboarded nodes are never cache-synchronized"
    );
}

#[test]
fn infinite_distance_tracks_camera_translation() {
    let (mut scene, camera_key) =
        scene_with_camera(Affine3A::from_translation(Vec3::new(50.0, 0.0, 0.0)));

    let key = scene.add_node(Node::new("sky"));
    {
        let t = &mut scene.get_node_mut(key).unwrap().transform;
        t.infinite_distance = true;
        t.position = Vec3::new(0.0, 2.0, 0.0);
    }

    scene.update();
    let world = *scene.get_node(key).unwrap().world_matrix();
    assert!(vec3_approx(world.translation.into(), Vec3::new(50.0, 2.0, 0.0)));

    // Move the camera and advance a frame: the skybox follows
    scene.get_node_mut(camera_key).unwrap().transform.position = Vec3::new(80.0, 0.0, 0.0);
    scene.update();
    let world = *scene.get_node(key).unwrap().world_matrix();
    assert!(vec3_approx(world.translation.into(), Vec3::new(80.0, 2.0, 0.0)));
}

// ============================================================================
// Derived state
// ============================================================================

#[test]
fn absolute_position_and_scaling_follow_world() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new("parent"));
    let child = scene.add_to_parent(Node::new("child"), parent);

    scene.get_node_mut(parent).unwrap().transform.scaling = Vec3::splat(3.0);
    scene.get_node_mut(child).unwrap().transform.position = Vec3::X;

    scene.update_world_matrices();

    let t = &scene.get_node(child).unwrap().transform;
    assert!(vec3_approx(t.absolute_position(), Vec3::new(3.0, 0.0, 0.0)));
    assert!(vec3_approx(t.absolute_scaling(), Vec3::splat(3.0)));
}

#[test]
fn non_uniform_scaling_flag_inherits() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::new("parent"));
    let child = scene.add_to_parent(Node::new("child"), parent);

    scene.get_node_mut(parent).unwrap().transform.scaling = Vec3::new(1.0, 3.0, 1.0);
    scene.update_world_matrices();

    assert!(scene.get_node(parent).unwrap().transform.non_uniform_scaling());
    assert!(scene.get_node(child).unwrap().transform.non_uniform_scaling());
}

#[test]
fn deep_hierarchy_does_not_overflow() {
    let mut scene = Scene::new();
    let mut cursor = scene.add_node(Node::new("root"));
    scene.get_node_mut(cursor).unwrap().transform.position = Vec3::X;

    let depth = 500;
    for i in 1..depth {
        let mut node = Node::new(&format!("n{i}"));
        node.transform.position = Vec3::X;
        cursor = scene.add_to_parent(node, cursor);
    }

    scene.update_world_matrices();
    let world = *scene.get_node(cursor).unwrap().world_matrix();
    assert!(approx_eq(world.translation.x, depth as f32));
}
