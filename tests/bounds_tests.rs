//! Rig bounds tests
//!
//! Tests for:
//! - Bound recomputation from bone spheres across poses
//! - Derived bounding sphere and padding
//! - Inactive skeletons and the bounds first-frame flag
//! - Dirty propagation to ancestor node bounds

use std::sync::Arc;

use glam::{Affine3A, Quat, Vec3};
use myth_rig::resources::{BoundingSphere, Geometry};
use myth_rig::rig::{BoneInfluence, InfluenceMap, RigGeometry, RigSystem};
use myth_rig::scene::node::Node;
use myth_rig::scene::scene::Scene;
use myth_rig::scene::skeleton::Skeleton;
use myth_rig::scene::NodeHandle;
use myth_rig::settings::SkinningSettings;

const EPSILON: f32 = 1e-4;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rig(settings: SkinningSettings) -> RigGeometry {
    let geometry = Geometry::new("Strip", vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)]);
    let mut map = InfluenceMap::new();
    map.insert(
        "Root",
        BoneInfluence::new(Affine3A::IDENTITY, BoundingSphere::new(Vec3::new(0.5, 0.0, 0.0), 0.75))
            .with_weights([(0, 1.0), (1, 1.0)]),
    );
    map.insert(
        "Arm",
        BoneInfluence::new(
            Affine3A::from_translation(Vec3::new(-1.0, 0.0, 0.0)),
            BoundingSphere::new(Vec3::new(0.5, 0.0, 0.0), 0.75),
        )
        .with_weight(2, 1.0),
    );
    RigGeometry::from_parts(Arc::new(geometry), map.into_shared()).with_settings(settings)
}

fn skeleton() -> Skeleton {
    let mut skeleton = Skeleton::new("Armature");
    let root = skeleton.add_bone("Root", None).unwrap();
    let arm = skeleton.add_bone("Arm", Some(root)).unwrap();
    skeleton.bone_mut(arm).unwrap().transform.position = Vec3::X;
    skeleton
}

/// (scene, root, armature, mesh)
fn setup(settings: SkinningSettings) -> (Scene, NodeHandle, NodeHandle, NodeHandle) {
    init_logger();
    let mut scene = Scene::new();
    let root = scene.create_node_with_name("Root");
    let armature = scene.add_to_parent(Node::with_name("Armature"), root);
    scene.set_skeleton(armature, skeleton());
    let mut mesh = Node::with_name("Mesh");
    mesh.transform.position = Vec3::new(0.0, 3.0, 0.0);
    let mesh = scene.add_to_parent(mesh, armature);
    scene.set_rig(mesh, rig(settings));
    (scene, root, armature, mesh)
}

/// Every bone sphere, moved into the mesh's space for the current pose.
fn expected_spheres(scene: &Scene, armature: NodeHandle, mesh: NodeHandle) -> Vec<BoundingSphere> {
    let rig = scene.get_rig(mesh).unwrap();
    let skeleton = scene.get_skeleton(armature).unwrap();
    rig.bone_spheres()
        .iter()
        .map(|(&bone, sphere)| {
            let matrix = rig.skeleton_to_geometry_matrix() * skeleton.bone(bone).unwrap().matrix_in_skeleton_space();
            sphere.transform(&matrix)
        })
        .collect()
}

// ============================================================================
// Recomputation
// ============================================================================

#[test]
fn bound_contains_every_bone_sphere_in_two_poses() {
    let (mut scene, _, armature, mesh) = setup(SkinningSettings::default());

    let poses = [
        (Vec3::X, Quat::IDENTITY),
        (Vec3::new(0.0, 4.0, 0.0), Quat::from_rotation_z(1.0)),
    ];
    let mut boxes = Vec::new();
    for (position, rotation) in poses {
        let skeleton = scene.get_skeleton_mut(armature).unwrap();
        let arm = skeleton.find_bone_by_name("Arm").unwrap();
        let bone = skeleton.bone_mut(arm).unwrap();
        bone.transform.position = position;
        bone.transform.rotation = rotation;

        scene.frame();

        let bbox = scene.get_rig(mesh).unwrap().bounding_box().unwrap();
        let spheres = expected_spheres(&scene, armature, mesh);
        assert_eq!(spheres.len(), 2);
        for sphere in &spheres {
            assert!(bbox.contains_sphere(sphere, EPSILON), "{sphere:?} not inside {bbox:?}");
        }
        boxes.push(bbox);
    }
    assert_ne!(boxes[0], boxes[1]);
}

#[test]
fn bound_is_tight_union_of_spheres() {
    let (mut scene, _, _, mesh) = setup(SkinningSettings::default());
    scene.frame();

    let rig = scene.get_rig(mesh).unwrap();
    let bbox = rig.bounding_box().unwrap();
    // Root sphere at x = 0.5, Arm sphere at x = 1.5, both shifted by -3 in y
    assert!((bbox.min.x + 0.25).abs() < EPSILON);
    assert!((bbox.max.x - 2.25).abs() < EPSILON);
    assert!((bbox.min.y + 3.75).abs() < EPSILON);
    assert!((bbox.max.y + 2.25).abs() < EPSILON);

    let sphere = rig.bounding_sphere().unwrap();
    assert!((sphere.center - bbox.center()).length() < EPSILON);
    assert!((sphere.radius - bbox.radius()).abs() < EPSILON);
}

#[test]
fn padding_inflates_bound() {
    let settings = SkinningSettings {
        bounds_padding: 0.5,
        ..Default::default()
    };
    let (mut scene, _, _, mesh) = setup(settings);
    scene.frame();

    let bbox = scene.get_rig(mesh).unwrap().bounding_box().unwrap();
    assert!((bbox.min.x + 0.75).abs() < EPSILON);
    assert!((bbox.max.x - 2.75).abs() < EPSILON);
}

#[test]
fn no_bound_before_first_pass() {
    let (scene, _, _, mesh) = setup(SkinningSettings::default());
    let rig = scene.get_rig(mesh).unwrap();
    assert!(rig.bounding_box().is_none());
    assert!(rig.bounding_sphere().is_none());
}

// ============================================================================
// Inactive skeletons
// ============================================================================

#[test]
fn inactive_skeleton_bounds_first_frame_only() {
    let (mut scene, _, armature, mesh) = setup(SkinningSettings::default());
    scene.get_skeleton_mut(armature).unwrap().set_active(false);

    let n = scene.advance_traversal();
    scene.update_matrix_world();
    assert_eq!(RigSystem::update_pass(&mut scene, n), 1);
    let first = scene.get_rig(mesh).unwrap().bounding_box();
    assert!(first.is_some());

    // Move the mesh; the skipped pass keeps the old bound
    scene.get_node_mut(mesh).unwrap().transform.position = Vec3::ZERO;
    let n = scene.advance_traversal();
    scene.update_matrix_world();
    assert_eq!(RigSystem::update_pass(&mut scene, n), 0);
    assert_eq!(scene.get_rig(mesh).unwrap().bounding_box(), first);
}

#[test]
fn bounds_first_frame_is_independent_of_deform() {
    let (mut scene, _, armature, mesh) = setup(SkinningSettings::default());
    scene.get_skeleton_mut(armature).unwrap().set_active(false);

    // Deform alone consumes only its own first frame
    let n = scene.advance_traversal();
    scene.update_matrix_world();
    assert_eq!(RigSystem::cull_pass(&mut scene, n), 1);
    assert!(scene.get_rig(mesh).unwrap().bounding_box().is_none());

    assert_eq!(RigSystem::update_pass(&mut scene, n), 1);
    assert!(scene.get_rig(mesh).unwrap().bounding_box().is_some());
}

// ============================================================================
// Dirty propagation
// ============================================================================

#[test]
fn bounds_pass_dirties_ancestor_bounds() {
    let (mut scene, root, armature, mesh) = setup(SkinningSettings::default());
    scene.frame();
    let before = scene.compute_bound(root).unwrap();
    for h in [root, armature, mesh] {
        assert!(!scene.get_node(h).unwrap().is_bound_dirty());
    }

    let skeleton = scene.get_skeleton_mut(armature).unwrap();
    let arm = skeleton.find_bone_by_name("Arm").unwrap();
    skeleton.bone_mut(arm).unwrap().transform.position = Vec3::new(5.0, 0.0, 0.0);
    scene.frame();

    for h in [root, armature, mesh] {
        assert!(scene.get_node(h).unwrap().is_bound_dirty());
    }
    let after = scene.compute_bound(root).unwrap();
    assert!(after.max.x > before.max.x + 3.0);
}

#[test]
fn moving_a_node_dirties_ancestor_bounds_while_inactive() {
    let (mut scene, root, armature, mesh) = setup(SkinningSettings::default());
    scene.frame();
    let before = scene.compute_bound(root).unwrap();

    scene.get_skeleton_mut(armature).unwrap().set_active(false);
    scene.get_node_mut(mesh).unwrap().transform.position = Vec3::new(10.0, 3.0, 0.0);
    scene.frame();

    assert!(scene.get_node(root).unwrap().is_bound_dirty());
    assert!(scene.get_node(armature).unwrap().is_bound_dirty());
    let after = scene.compute_bound(root).unwrap();
    assert!((after.min.x - (before.min.x + 10.0)).abs() < EPSILON);
    assert!((after.max.x - (before.max.x + 10.0)).abs() < EPSILON);
    assert!((after.min.y - before.min.y).abs() < EPSILON);
}

#[test]
fn moving_the_skeleton_node_dirties_root_bound() {
    let (mut scene, root, armature, _mesh) = setup(SkinningSettings::default());
    scene.frame();
    let before = scene.compute_bound(root).unwrap();

    scene.get_skeleton_mut(armature).unwrap().set_active(false);
    scene.get_node_mut(armature).unwrap().transform.position = Vec3::new(10.0, 0.0, 0.0);
    scene.frame();

    assert!(scene.get_node(root).unwrap().is_bound_dirty());
    let after = scene.compute_bound(root).unwrap();
    assert!((after.min.x - (before.min.x + 10.0)).abs() < EPSILON);
    assert!((after.max.x - (before.max.x + 10.0)).abs() < EPSILON);
}
