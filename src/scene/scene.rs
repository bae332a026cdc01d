//! Scene container
//!
//! Pure data layer: node arena, component arenas (meshes, materials,
//! cameras, lights), and the per-frame pipelines that keep world matrices,
//! bounding volumes, camera frustums, light associations, and material
//! dirty state in sync. Rendering itself is a collaborator; the scene only
//! produces the data a renderer consumes.

use glam::{Affine3A, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::collision::collider::Collider;
use crate::collision::picking::PickingInfo;
use crate::collision::ray::Ray;
use crate::culling::FrustumPlanes;
use crate::errors::{ParallaxError, Result};
use crate::material::{FillMode, Material};
use crate::mesh::Mesh;
use crate::scene::camera::Camera;
use crate::scene::light::Light;
use crate::scene::node::Node;
use crate::scene::transform_system::{self, WorldUpdateContext};
use crate::scene::{CameraKey, LightKey, MaterialKey, MeshKey, NodeKey};

/// Callback fired after a node's world matrix actually recomputes.
pub type WorldMatrixObserver = Box<dyn FnMut(&Affine3A)>;

/// Scene graph and component storage.
pub struct Scene {
    pub(crate) nodes: SlotMap<NodeKey, Node>,
    root_nodes: Vec<NodeKey>,

    /// Mesh components.
    pub meshes: SlotMap<MeshKey, Mesh>,
    /// Material registry.
    pub materials: SlotMap<MaterialKey, Material>,
    /// Camera components.
    pub cameras: SlotMap<CameraKey, Camera>,
    /// Light components.
    pub lights: SlotMap<LightKey, Light>,

    /// Node whose camera drives billboards, infinite distance, and culling.
    pub active_camera: Option<NodeKey>,

    render_id: u32,
    observers: FxHashMap<NodeKey, Vec<WorldMatrixObserver>>,
    updated_scratch: Vec<NodeKey>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// An empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            meshes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            cameras: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            active_camera: None,
            render_id: 1,
            observers: FxHashMap::default(),
            updated_scratch: Vec::new(),
        }
    }

    // ========================================================================
    // Node management
    // ========================================================================

    /// Adds a node at the root.
    pub fn add_node(&mut self, node: Node) -> NodeKey {
        let key = self.nodes.insert(node);
        self.root_nodes.push(key);
        key
    }

    /// Adds a node under `parent`.
    pub fn add_to_parent(&mut self, node: Node, parent: NodeKey) -> NodeKey {
        let key = self.nodes.insert(node);
        if self.nodes.contains_key(parent) {
            self.nodes[parent].children.push(key);
            self.nodes[key].parent = Some(parent);
        } else {
            log::error!("Parent node not found, adding to root instead");
            self.root_nodes.push(key);
        }
        key
    }

    /// Read access to a node.
    #[must_use]
    pub fn get_node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Mutable access to a node (for TRS writes).
    pub fn get_node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// The root node keys.
    #[must_use]
    pub fn root_nodes(&self) -> &[NodeKey] {
        &self.root_nodes
    }

    /// Reparents `child` under `parent` WITHOUT preserving the world pose
    /// (the local TRS is kept as-is). Use [`set_parent`](Self::set_parent)
    /// to keep the world pose instead.
    pub fn attach(&mut self, child: NodeKey, parent: NodeKey) -> Result<()> {
        if child == parent {
            return Err(ParallaxError::SelfParenting);
        }
        if !self.nodes.contains_key(parent) {
            return Err(ParallaxError::NodeNotFound);
        }

        self.unlink(child)?;

        self.nodes[parent].children.push(child);
        let node = &mut self.nodes[child];
        node.parent = Some(parent);
        node.transform.mark_dirty();
        Ok(())
    }

    /// Moves `child` back to the root, keeping its local TRS.
    pub fn detach(&mut self, child: NodeKey) -> Result<()> {
        self.unlink(child)?;
        self.root_nodes.push(child);
        let node = &mut self.nodes[child];
        node.parent = None;
        node.transform.mark_dirty();
        Ok(())
    }

    /// Removes a node from its current parent's child list (or the roots),
    /// leaving it unlinked.
    fn unlink(&mut self, child: NodeKey) -> Result<()> {
        let old_parent = self
            .nodes
            .get(child)
            .ok_or(ParallaxError::NodeNotFound)?
            .parent;

        if let Some(p) = old_parent {
            if let Some(parent_node) = self.nodes.get_mut(p)
                && let Some(i) = parent_node.children.iter().position(|&k| k == child)
            {
                parent_node.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&k| k == child) {
            self.root_nodes.remove(i);
        }
        Ok(())
    }

    /// Re-parents while preserving the world-space pose: the relative
    /// transform (`world * new_parent_world⁻¹`, or the world transform alone
    /// when un-parenting) is decomposed into the new local TRS.
    pub fn set_parent(&mut self, child: NodeKey, new_parent: Option<NodeKey>) -> Result<()> {
        if new_parent == Some(child) {
            return Err(ParallaxError::SelfParenting);
        }
        if !self.nodes.contains_key(child) {
            return Err(ParallaxError::NodeNotFound);
        }

        let child_world = self.compute_world_matrix(child, false);
        let local = match new_parent {
            Some(p) => {
                if !self.nodes.contains_key(p) {
                    return Err(ParallaxError::NodeNotFound);
                }
                let parent_world = self.compute_world_matrix(p, false);
                parent_world.inverse() * child_world
            }
            None => child_world,
        };

        self.nodes[child].transform.set_trs_from(&local);

        match new_parent {
            Some(p) => self.attach(child, p),
            None => self.detach(child),
        }
    }

    /// Disposes a node: children are re-parented to the root (they are not
    /// destroyed), components are dropped, observers cleared.
    pub fn remove_node(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let children: Vec<NodeKey> = node.children.to_vec();

        for child in children {
            if self.detach(child).is_err() {
                log::warn!("Failed to detach child during node removal");
            }
        }

        let _ = self.unlink(key);

        if let Some(node) = self.nodes.remove(key) {
            if let Some(mesh) = node.mesh {
                self.meshes.remove(mesh);
            }
            if let Some(camera) = node.camera {
                self.cameras.remove(camera);
            }
            if let Some(light) = node.light {
                self.lights.remove(light);
            }
        }
        self.observers.remove(&key);
        if self.active_camera == Some(key) {
            self.active_camera = None;
        }
    }

    // ========================================================================
    // Component helpers
    // ========================================================================

    /// Creates a node carrying `mesh` at the root; the mesh's back-reference
    /// is filled in.
    pub fn add_mesh(&mut self, mesh: Mesh) -> NodeKey {
        let mut node = Node::new(&mesh.name);
        let mesh_key = self.meshes.insert(mesh);
        node.mesh = Some(mesh_key);
        let key = self.add_node(node);
        self.meshes[mesh_key].node = Some(key);
        key
    }

    /// Creates a node carrying `camera` at the root.
    pub fn add_camera(&mut self, camera: Camera) -> NodeKey {
        let mut node = Node::new("Camera");
        node.camera = Some(self.cameras.insert(camera));
        self.add_node(node)
    }

    /// Creates a node carrying `light` at the root.
    pub fn add_light(&mut self, light: Light) -> NodeKey {
        let mut node = Node::new("Light");
        node.light = Some(self.lights.insert(light));
        self.add_node(node)
    }

    /// Registers a material.
    pub fn add_material(&mut self, material: Material) -> MaterialKey {
        self.materials.insert(material)
    }

    /// The mesh component of a node, if any.
    #[must_use]
    pub fn mesh_of(&self, key: NodeKey) -> Option<&Mesh> {
        self.meshes.get(self.nodes.get(key)?.mesh?)
    }

    /// Mutable mesh component of a node.
    pub fn mesh_of_mut(&mut self, key: NodeKey) -> Option<&mut Mesh> {
        self.meshes.get_mut(self.nodes.get(key)?.mesh?)
    }

    // ========================================================================
    // World-matrix pipeline
    // ========================================================================

    /// External render-id counter; gates redundant recomputation per frame.
    #[inline]
    #[must_use]
    pub fn render_id(&self) -> u32 {
        self.render_id
    }

    /// Advances to the next frame.
    pub fn increment_render_id(&mut self) {
        self.render_id = self.render_id.wrapping_add(1);
    }

    fn world_update_context(&mut self) -> WorldUpdateContext {
        let render_id = self.render_id;
        let camera_world = self.active_camera.and_then(|camera_node| {
            if !self.nodes.contains_key(camera_node) {
                return None;
            }
            // Resolve the camera's own chain first; the camera node itself
            // never billboards against itself
            let ctx = WorldUpdateContext {
                render_id,
                camera_world: None,
            };
            let mut updated = std::mem::take(&mut self.updated_scratch);
            updated.clear();
            let world = transform_system::compute_world_matrix(
                &mut self.nodes,
                camera_node,
                &ctx,
                false,
                &mut updated,
            );
            self.after_world_updates(&updated);
            self.updated_scratch = updated;
            Some(world)
        });

        WorldUpdateContext {
            render_id,
            camera_world,
        }
    }

    /// Updates every world matrix in the scene, then synchronizes cameras,
    /// mesh bounding volumes, and after-update observers for the nodes that
    /// actually recomputed. Call once per frame.
    pub fn update_world_matrices(&mut self) {
        let ctx = self.world_update_context();
        let mut updated = std::mem::take(&mut self.updated_scratch);
        updated.clear();

        transform_system::update_hierarchy(&mut self.nodes, &self.root_nodes, &ctx, &mut updated);

        self.after_world_updates(&updated);
        self.updated_scratch = updated;
    }

    /// Computes one node's world matrix on demand (ancestors resolved
    /// first), running the same post-update synchronization.
    pub fn compute_world_matrix(&mut self, key: NodeKey, force: bool) -> Affine3A {
        let ctx = self.world_update_context();
        let mut updated = std::mem::take(&mut self.updated_scratch);
        updated.clear();

        let world =
            transform_system::compute_world_matrix(&mut self.nodes, key, &ctx, force, &mut updated);

        self.after_world_updates(&updated);
        self.updated_scratch = updated;
        world
    }

    /// Post-compute hook: camera view matrices, mesh bounding volumes
    /// (unless opted out), and observers, for nodes that recomputed.
    fn after_world_updates(&mut self, updated: &[NodeKey]) {
        for &key in updated {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            let world = *node.transform.world_matrix();
            let absolute_position = node.transform.absolute_position();
            let camera = node.camera;
            let mesh = node.mesh;

            if let Some(camera_key) = camera
                && let Some(camera) = self.cameras.get_mut(camera_key)
            {
                camera.update_view_projection(&world);
            }

            if let Some(mesh_key) = mesh
                && let Some(mesh) = self.meshes.get_mut(mesh_key)
                && !mesh.do_not_sync_bounding_info
            {
                mesh.update_bounding_info(&world, absolute_position);
            }

            if let Some(callbacks) = self.observers.get_mut(&key) {
                for callback in callbacks {
                    callback(&world);
                }
            }
        }
    }

    /// Registers a callback fired after `key`'s world matrix actually
    /// recomputes (cache hits never fire).
    pub fn on_after_world_matrix_update(&mut self, key: NodeKey, observer: WorldMatrixObserver) {
        self.observers.entry(key).or_default().push(observer);
    }

    /// Drops all observers of a node.
    pub fn clear_world_matrix_observers(&mut self, key: NodeKey) {
        self.observers.remove(&key);
    }

    /// Freezes a node's world matrix: captures the supplied matrix, or
    /// computes and captures the current one. Until unfrozen, TRS mutations
    /// no longer affect the node.
    pub fn freeze_world_matrix(&mut self, key: NodeKey, world: Option<Affine3A>) {
        if world.is_none() {
            self.compute_world_matrix(key, true);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.transform.freeze_world_matrix(world);
        }
    }

    /// Unfreezes and immediately recomputes.
    pub fn unfreeze_world_matrix(&mut self, key: NodeKey) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.transform.unfreeze_world_matrix();
        }
        self.compute_world_matrix(key, false);
    }

    /// Moves a node so its world translation lands on `target`, respecting
    /// the parent's current world matrix.
    pub fn set_absolute_position(&mut self, key: NodeKey, target: Vec3) {
        let parent_world = self
            .nodes
            .get(key)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(p))
            .map(|p| *p.transform.world_matrix());

        if let Some(node) = self.nodes.get_mut(key) {
            node.transform.position = match parent_world {
                Some(pw) => pw.inverse().transform_point3(target),
                None => target,
            };
        }
    }

    /// Applies the scale that fits a mesh node's local bounds into a unit
    /// cube. Degenerate bounds (zero max dimension) no-op silently.
    pub fn normalize_to_unit_cube(&mut self, key: NodeKey) {
        let Some(factor) = self.mesh_of(key).and_then(Mesh::unit_cube_scale) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(key) {
            node.transform.scaling *= factor;
        }
    }

    // ========================================================================
    // Culling / picking / collisions
    // ========================================================================

    /// Keys of enabled mesh nodes whose bounding info passes the frustum
    /// test (per-mesh culling strategy applies).
    #[must_use]
    pub fn visible_meshes(&self, planes: &FrustumPlanes) -> Vec<NodeKey> {
        let mut visible = Vec::new();
        for (key, node) in &self.nodes {
            if !node.enabled {
                continue;
            }
            let Some(mesh) = node.mesh.and_then(|m| self.meshes.get(m)) else {
                continue;
            };
            if mesh.is_in_frustum(planes) {
                visible.push(key);
            }
        }
        visible
    }

    /// Picks the nearest enabled, pickable mesh along a world-space ray.
    ///
    /// World matrices and bounding volumes must be current (call
    /// [`update_world_matrices`](Self::update_world_matrices) first).
    #[must_use]
    pub fn pick_with_ray(
        &self,
        ray: &Ray,
        predicate: Option<&dyn Fn(&Node, &Mesh) -> bool>,
    ) -> PickingInfo {
        let mut best = PickingInfo::miss();

        for (key, node) in &self.nodes {
            if !node.enabled {
                continue;
            }
            let Some(mesh) = node.mesh.and_then(|m| self.meshes.get(m)) else {
                continue;
            };
            if !mesh.is_pickable {
                continue;
            }
            if let Some(predicate) = predicate
                && !predicate(node, mesh)
            {
                continue;
            }

            let fill_mode = mesh
                .material
                .and_then(|m| self.materials.get(m))
                .map_or(FillMode::default(), |m| m.fill_mode);

            let mut pick =
                mesh.intersects_ray(node.transform.world_matrix(), ray, fill_mode, false, None);
            if pick.hit {
                pick.picked_node = Some(key);
                if !best.hit || pick.distance < best.distance {
                    best = pick;
                }
            }
        }

        best
    }

    /// Moves a mesh node by `displacement`, sliding along any colliding
    /// geometry (ellipsoid swept-sphere response). Returns the new world
    /// position, or `None` when the node has no mesh.
    ///
    /// Candidate meshes are those with `check_collisions` whose
    /// `collision_group` intersects the moving mesh's `collision_mask`.
    pub fn move_with_collisions(&mut self, key: NodeKey, displacement: Vec3) -> Option<Vec3> {
        let node = self.nodes.get(key)?;
        let mesh = self.meshes.get(node.mesh?)?;
        let ellipsoid = mesh.ellipsoid;
        let offset = mesh.ellipsoid_offset;
        let mask = mesh.collision_mask;

        let mut center = node.transform.absolute_position() + offset;
        let mut velocity = displacement;

        // Gather world-space triangles from collision candidates once
        let mut triangles: Vec<[Vec3; 3]> = Vec::new();
        for (other_key, other_node) in &self.nodes {
            if other_key == key || !other_node.enabled {
                continue;
            }
            let Some(other_mesh) = other_node.mesh.and_then(|m| self.meshes.get(m)) else {
                continue;
            };
            if !other_mesh.check_collisions || other_mesh.collision_group & mask == 0 {
                continue;
            }
            let Some(positions) = other_mesh.geometry.positions() else {
                continue;
            };
            let world = other_node.transform.world_matrix();
            for triangle in other_mesh.geometry.indices().chunks_exact(3) {
                let (Some(&a), Some(&b), Some(&c)) = (
                    positions.get(triangle[0] as usize),
                    positions.get(triangle[1] as usize),
                    positions.get(triangle[2] as usize),
                ) else {
                    continue;
                };
                triangles.push([
                    world.transform_point3(a),
                    world.transform_point3(b),
                    world.transform_point3(c),
                ]);
            }
        }

        let mut collider = Collider::new(ellipsoid);
        for _ in 0..collider.max_retries {
            if velocity.length_squared() < 1e-12 {
                break;
            }

            collider.initialize(center, velocity);
            for [a, b, c] in &triangles {
                collider.test_triangle(
                    collider.to_ellipsoid_space(*a),
                    collider.to_ellipsoid_space(*b),
                    collider.to_ellipsoid_space(*c),
                );
            }

            let (position, slide) = collider.response();
            center = collider.to_world_space(position);
            velocity = collider.to_world_space(slide);

            if !collider.collision_found() {
                break;
            }
        }

        let target = center - offset;
        self.set_absolute_position(key, target);
        Some(target)
    }

    // ========================================================================
    // Light association & material dirty propagation
    // ========================================================================

    /// Refreshes every mesh's light-source list from the lights' ranges
    /// against the mesh bounding spheres.
    pub fn update_light_sources(&mut self) {
        let mut lights: Vec<(LightKey, Vec3, Light)> = Vec::new();
        for (_, node) in &self.nodes {
            if !node.enabled {
                continue;
            }
            if let Some(light_key) = node.light
                && let Some(light) = self.lights.get(light_key)
            {
                lights.push((light_key, node.transform.absolute_position(), light.clone()));
            }
        }

        for (_, node) in &self.nodes {
            let Some(mesh_key) = node.mesh else {
                continue;
            };
            let Some(mesh) = self.meshes.get_mut(mesh_key) else {
                continue;
            };

            let (center, radius) = mesh.bounding_info().map_or(
                (node.transform.absolute_position(), 0.0),
                |info| {
                    (
                        info.bounding_sphere.center_world,
                        info.bounding_sphere.radius_world,
                    )
                },
            );

            mesh.light_sources.clear();
            for (light_key, light_position, light) in &lights {
                if light.affects_sphere(*light_position, center, radius) {
                    mesh.light_sources.push(*light_key);
                }
            }
        }
    }

    /// Propagates material dirtiness: submeshes of every mesh using a
    /// material with pending dirty flags are marked for effect rebuild
    /// against the material's current version.
    pub fn flush_material_dirty(&mut self) {
        for (material_key, material) in &self.materials {
            let flags = material.take_dirty_flags();
            if flags.is_empty() {
                continue;
            }
            let version = material.version();

            for (_, mesh) in &mut self.meshes {
                if mesh.material != Some(material_key) {
                    continue;
                }
                for sub in &mut mesh.sub_meshes {
                    sub.mark_effect_dirty(version);
                }
            }
        }
    }

    /// Frame tick: advances the render id, updates world matrices (with all
    /// post-update synchronization), and flushes material dirtiness.
    pub fn update(&mut self) {
        self.increment_render_id();
        self.update_world_matrices();
        self.flush_material_dirty();
    }
}
