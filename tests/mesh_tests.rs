//! Mesh, submesh, and facet tests
//!
//! Tests for:
//! - Bounding info lifecycle through the world-matrix hook
//! - Global-submesh bounding delegation (object identity)
//! - Subdivision into per-range submeshes
//! - Facet partitioning grid consistency on a unit cube
//! - Ray picking through submeshes and fill modes
//! - Material dirty propagation to submeshes

use glam::{Affine3A, Vec3, Vec4};
use parallax::geometry::{Geometry, VertexKind};
use parallax::material::{FillMode, Material, MaterialDirtyFlags};
use parallax::mesh::Mesh;
use parallax::collision::Ray;
use parallax::scene::Scene;

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

/// Unit cube centered at the origin, 12 triangles (2 per face).
fn cube_geometry() -> Geometry {
    let mut geometry = Geometry::new();
    #[rustfmt::skip]
    let positions = vec![
        -0.5, -0.5, -0.5, //
         0.5, -0.5, -0.5, //
         0.5,  0.5, -0.5, //
        -0.5,  0.5, -0.5, //
        -0.5, -0.5,  0.5, //
         0.5, -0.5,  0.5, //
         0.5,  0.5,  0.5, //
        -0.5,  0.5,  0.5,
    ];
    geometry
        .set_vertices_data(VertexKind::Position, positions, false)
        .unwrap();
    #[rustfmt::skip]
    geometry.set_indices(vec![
        0, 2, 1, 0, 3, 2, // back  (z = -0.5)
        4, 5, 6, 4, 6, 7, // front (z = +0.5)
        0, 1, 5, 0, 5, 4, // bottom
        3, 7, 6, 3, 6, 2, // top
        0, 4, 7, 0, 7, 3, // left
        1, 2, 6, 1, 6, 5, // right
    ]);
    geometry
}

fn quad_geometry() -> Geometry {
    let mut geometry = Geometry::new();
    geometry
        .set_vertices_data(
            VertexKind::Position,
            vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0,
            ],
            false,
        )
        .unwrap();
    geometry.set_indices(vec![0, 1, 2, 0, 2, 3]);
    geometry
}

// ============================================================================
// Bounding lifecycle
// ============================================================================

#[test]
fn bounding_info_tracks_world_matrix() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    let world = Affine3A::from_translation(Vec3::new(10.0, 0.0, 0.0));
    mesh.update_bounding_info(&world, Vec3::new(10.0, 0.0, 0.0));

    let info = mesh.bounding_info().unwrap();
    assert!(approx_eq(info.bounding_box.center_world.x, 10.0));
    assert!(approx_eq(info.bounding_sphere.center_world.x, 10.0));
    // Local bounds untouched
    assert_eq!(info.minimum(), Vec3::splat(-0.5));
    assert_eq!(info.maximum(), Vec3::splat(0.5));
}

#[test]
fn mesh_without_positions_gets_point_bound_at_absolute_position() {
    let mut mesh = Mesh::new("empty", Geometry::new());
    assert!(mesh.bounding_info().is_none());

    let position = Vec3::new(3.0, 4.0, 5.0);
    mesh.update_bounding_info(&Affine3A::from_translation(position), position);

    let info = mesh.bounding_info().unwrap();
    assert_eq!(info.minimum(), position);
    assert_eq!(info.maximum(), position);
    assert!(approx_eq(info.bounding_sphere.radius, 0.0));
}

#[test]
fn global_submesh_returns_mesh_bounding_info_object() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.update_bounding_info(&Affine3A::IDENTITY, Vec3::ZERO);

    let mesh_info = mesh.bounding_info().unwrap();
    let sub_info = mesh.submesh_bounding_info(0).unwrap();
    assert!(
        std::ptr::eq(mesh_info, sub_info),
        "single global submesh must share the mesh's bounding info object"
    );
}

#[test]
fn subdivided_submeshes_get_own_bounds() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.subdivide(3);
    assert_eq!(mesh.sub_meshes.len(), 3);

    let total: u32 = mesh.sub_meshes.iter().map(|s| s.index_count).sum();
    assert_eq!(total, 36);

    for i in 0..3 {
        let info = mesh.submesh_bounding_info(i).unwrap();
        let mesh_info = mesh.bounding_info().unwrap();
        assert!(
            !std::ptr::eq(mesh_info, info),
            "subdivided submeshes carry their own bounding info"
        );
    }
}

#[test]
fn add_sub_mesh_validates_index_range() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.sub_meshes.clear();

    mesh.add_sub_mesh(parallax::mesh::SubMesh::new(0, 0, 8, 0, 18)).unwrap();
    let err = mesh
        .add_sub_mesh(parallax::mesh::SubMesh::new(0, 0, 8, 18, 30))
        .unwrap_err();
    assert!(matches!(
        err,
        parallax::ParallaxError::SubMeshOutOfRange { .. }
    ));
}

#[test]
fn do_not_sync_flag_suppresses_hook() {
    let mut scene = Scene::new();
    let key = scene.add_mesh(Mesh::new("cube", cube_geometry()));
    scene.mesh_of_mut(key).unwrap().do_not_sync_bounding_info = true;

    scene.get_node_mut(key).unwrap().transform.position = Vec3::new(50.0, 0.0, 0.0);
    scene.update_world_matrices();

    let info = scene.mesh_of(key).unwrap().bounding_info().unwrap();
    assert!(
        approx_eq(info.bounding_box.center_world.x, 0.0),
        "opted-out mesh bounds must not move"
    );
}

// ============================================================================
// Facet partitioning
// ============================================================================

#[test]
fn every_cube_facet_centroid_maps_to_its_own_cell() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.update_facet_data(None);

    let data = mesh.facet_data().unwrap();
    assert_eq!(data.facet_count(), 12);

    for facet in 0..data.facet_count() {
        let centroid = data.facet_positions()[facet];
        let cell_facets = data
            .facets_at_local_coordinates(centroid)
            .expect("centroid must land inside the partitioning volume");
        assert!(
            cell_facets.contains(&(facet as u32)),
            "facet {facet}: centroid cell does not contain the facet"
        );
    }
}

#[test]
fn closest_facet_query_projects_onto_face_plane() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.update_facet_data(None);

    // Just inside the +Z face, near facet 2's centroid: the lookup is
    // restricted to the query's grid cell, which that centroid seeds.
    let centroid = mesh.facet_data().unwrap().facet_positions()[2];
    let query = centroid + Vec3::new(0.0, 0.0, -0.05);

    let closest = mesh
        .closest_facet_at_local_coordinates(query, None)
        .expect("query cell must hold the facet");
    assert_eq!(closest.index, 2);
    assert!(approx_eq(closest.projected.z, 0.5));
    assert!(approx_eq(closest.distance_sq, 0.0025));
}

#[test]
fn query_outside_partitioning_volume_returns_none() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.update_facet_data(None);

    assert!(
        mesh.closest_facet_at_local_coordinates(Vec3::splat(5.0), None)
            .is_none()
    );
}

#[test]
fn depth_sort_covers_all_indices() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.update_facet_data(Some(Vec3::new(0.0, 0.0, 2.0)));

    let data = mesh.facet_data().unwrap();
    let sorted = data.depth_sorted_indices();
    assert_eq!(sorted.len(), 36);

    // Farthest-first: the first sorted facet must be a back-face triangle
    let positions: Vec<Vec3> = sorted[0..3]
        .iter()
        .map(|&i| {
            let p = mesh.geometry.positions().unwrap();
            p[i as usize]
        })
        .collect();
    for p in positions {
        assert!(approx_eq(p.z, -0.5), "back face (z = -0.5) must draw first");
    }
}

// ============================================================================
// Picking
// ============================================================================

#[test]
fn pick_hits_front_face_of_cube() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.update_bounding_info(&Affine3A::IDENTITY, Vec3::ZERO);

    let ray = Ray::new(Vec3::new(0.1, 0.1, 5.0), Vec3::NEG_Z, 100.0);
    let pick = mesh.intersects_ray(
        &Affine3A::IDENTITY,
        &ray,
        FillMode::TriangleList,
        false,
        None,
    );

    assert!(pick.hit);
    // Closest intersection is the front face at z = +0.5
    assert!(approx_eq(pick.distance, 4.5));
    let point = pick.picked_point.unwrap();
    assert!(approx_eq(point.z, 0.5));
}

#[test]
fn fast_check_returns_some_hit() {
    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.update_bounding_info(&Affine3A::IDENTITY, Vec3::ZERO);

    let ray = Ray::new(Vec3::new(0.1, 0.1, 5.0), Vec3::NEG_Z, 100.0);
    let pick = mesh.intersects_ray(
        &Affine3A::IDENTITY,
        &ray,
        FillMode::TriangleList,
        true,
        None,
    );
    assert!(pick.hit, "fast check must still report a hit");
}

#[test]
fn picking_respects_world_scale() {
    let mut mesh = Mesh::new("quad", quad_geometry());
    let world = Affine3A::from_scale(Vec3::splat(10.0));
    mesh.update_bounding_info(&world, Vec3::ZERO);

    // Point (7, 2) is inside the scaled quad but outside the unit quad
    let ray = Ray::new(Vec3::new(7.0, 2.0, 5.0), Vec3::NEG_Z, 100.0);
    let pick = mesh.intersects_ray(&world, &ray, FillMode::TriangleList, false, None);
    assert!(pick.hit);
    assert!(approx_eq(pick.distance, 5.0));
}

#[test]
fn barycentrics_flow_to_picking_info() {
    let mut mesh = Mesh::new("quad", quad_geometry());
    mesh.update_bounding_info(&Affine3A::IDENTITY, Vec3::ZERO);

    let ray = Ray::new(Vec3::new(0.7, 0.2, 1.0), Vec3::NEG_Z, 10.0);
    let pick = mesh.intersects_ray(
        &Affine3A::IDENTITY,
        &ray,
        FillMode::TriangleList,
        false,
        None,
    );

    assert!(pick.hit);
    // v0=(0,0) v1=(1,0) v2=(1,1): p = v0 + bu*(v1-v0) + bv*(v2-v0)
    assert!(approx_eq(pick.bu, 0.5));
    assert!(approx_eq(pick.bv, 0.2));
}

// ============================================================================
// Material dirty propagation
// ============================================================================

#[test]
fn material_dirty_marks_submeshes_of_users() {
    let mut scene = Scene::new();
    let material_key = scene.add_material(Material::new_basic(Vec4::ONE));

    let mut mesh = Mesh::new("cube", cube_geometry());
    mesh.material = Some(material_key);
    mesh.subdivide(2);
    let user = scene.add_mesh(mesh);

    let other = scene.add_mesh(Mesh::new("other", cube_geometry()));

    // Settle the initial dirtiness from construction
    scene.flush_material_dirty();
    for sub in &mut scene.mesh_of_mut(user).unwrap().sub_meshes {
        sub.clear_effect_dirty();
    }
    for sub in &mut scene.mesh_of_mut(other).unwrap().sub_meshes {
        sub.clear_effect_dirty();
    }

    scene.materials[material_key].mark_dirty(MaterialDirtyFlags::TEXTURE);
    scene.flush_material_dirty();

    let version = scene.materials[material_key].version();
    for sub in &scene.mesh_of(user).unwrap().sub_meshes {
        assert!(sub.is_effect_dirty(), "user submeshes must be marked stale");
        assert_eq!(sub.cached_material_version(), version);
    }
    for sub in &scene.mesh_of(other).unwrap().sub_meshes {
        assert!(
            !sub.is_effect_dirty(),
            "meshes not using the material stay clean"
        );
    }
}

// ============================================================================
// Normalize to unit cube
// ============================================================================

#[test]
fn normalize_to_unit_cube_scales_node() {
    let mut scene = Scene::new();
    let mut geometry = Geometry::new();
    geometry
        .set_vertices_data(
            VertexKind::Position,
            vec![
                -2.0, -2.0, -2.0, //
                2.0, 2.0, 2.0,
            ],
            false,
        )
        .unwrap();
    let key = scene.add_mesh(Mesh::new("big", geometry));

    scene.normalize_to_unit_cube(key);
    let scaling = scene.get_node(key).unwrap().transform.scaling;
    assert!(approx_eq(scaling.x, 0.25));

    // Degenerate bounds: silent no-op
    let empty = scene.add_mesh(Mesh::new("empty", Geometry::new()));
    scene.normalize_to_unit_cube(empty);
    let scaling = scene.get_node(empty).unwrap().transform.scaling;
    assert!(approx_eq(scaling.x, 1.0));
}

// ============================================================================
// Mesh-mesh intersection through the scene
// ============================================================================

#[test]
fn meshes_intersect_after_transform_updates() {
    let mut scene = Scene::new();
    let a = scene.add_mesh(Mesh::new("a", cube_geometry()));
    let b = scene.add_mesh(Mesh::new("b", cube_geometry()));

    scene.get_node_mut(b).unwrap().transform.position = Vec3::new(10.0, 0.0, 0.0);
    scene.update_world_matrices();
    {
        let mesh_a = scene.mesh_of(a).unwrap();
        let mesh_b = scene.mesh_of(b).unwrap();
        assert!(!mesh_a.intersects_mesh(mesh_b, false));
    }

    scene.get_node_mut(b).unwrap().transform.position = Vec3::new(0.5, 0.0, 0.0);
    scene.update_world_matrices();
    {
        let mesh_a = scene.mesh_of(a).unwrap();
        let mesh_b = scene.mesh_of(b).unwrap();
        assert!(mesh_a.intersects_mesh(mesh_b, false));
        assert!(mesh_a.intersects_mesh(mesh_b, true));
    }
}
