//! Skeleton Tests
//!
//! Tests for:
//! - Bone table construction and name lookup
//! - Pose evaluation order and memoization per traversal
//! - Influence map serialization

use std::f32::consts::FRAC_PI_2;

use glam::{Affine3A, Quat, Vec3};
use myth_rig::errors::RigError;
use myth_rig::resources::BoundingSphere;
use myth_rig::rig::{BoneInfluence, InfluenceMap};
use myth_rig::scene::skeleton::Skeleton;
use myth_rig::scene::transform::Transform;

const EPSILON: f32 = 1e-5;

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn chain(length: usize) -> Skeleton {
    let mut skeleton = Skeleton::new("Chain");
    let mut parent = None;
    for i in 0..length {
        let transform = Transform::from_trs(Vec3::Y, Quat::IDENTITY, Vec3::ONE);
        let id = skeleton
            .add_bone_with_transform(&format!("Bone{i}"), parent, transform)
            .unwrap();
        parent = Some(id);
    }
    skeleton
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn bones_are_found_by_name() {
    let skeleton = chain(3);
    assert_eq!(skeleton.bone_count(), 3);

    let id = skeleton.find_bone_by_name("Bone1").unwrap();
    let bone = skeleton.bone(id).unwrap();
    assert_eq!(bone.name(), "Bone1");
    assert_eq!(bone.parent(), skeleton.find_bone_by_name("Bone0"));
    assert!(skeleton.find_bone_by_name("Missing").is_none());
}

#[test]
fn duplicate_bone_names_are_rejected() {
    let mut skeleton = chain(1);
    let err = skeleton.add_bone("Bone0", None).unwrap_err();
    assert_eq!(err, RigError::DuplicateBone("Bone0".to_string()));
    assert_eq!(skeleton.bone_count(), 1);
}

#[test]
fn new_skeletons_are_active() {
    let mut skeleton = Skeleton::new("Armature");
    assert!(skeleton.is_active());
    skeleton.set_active(false);
    assert!(!skeleton.is_active());
}

// ============================================================================
// Pose evaluation
// ============================================================================

#[test]
fn chain_accumulates_parent_matrices() {
    let mut skeleton = chain(4);
    assert!(skeleton.refresh_pose(1));

    for (i, bone) in skeleton.bones().iter().enumerate() {
        let origin = bone.matrix_in_skeleton_space().transform_point3(Vec3::ZERO);
        assert!(vec3_approx(origin, Vec3::new(0.0, (i + 1) as f32, 0.0)), "bone {i} at {origin}");
    }
}

#[test]
fn parent_rotation_moves_children() {
    let mut skeleton = chain(2);
    let root = skeleton.find_bone_by_name("Bone0").unwrap();
    skeleton.bone_mut(root).unwrap().transform.rotation = Quat::from_rotation_z(FRAC_PI_2);
    skeleton.refresh_pose(1);

    let child = skeleton.find_bone_by_name("Bone1").unwrap();
    let origin = skeleton.bone(child).unwrap().matrix_in_skeleton_space().transform_point3(Vec3::ZERO);
    // Root at (0,1,0); child offset (0,1,0) rotated to (-1,0,0)
    assert!(vec3_approx(origin, Vec3::new(-1.0, 1.0, 0.0)), "got {origin}");
}

#[test]
fn refresh_is_memoized_per_traversal() {
    let mut skeleton = chain(2);
    assert!(skeleton.refresh_pose(1));
    assert!(!skeleton.refresh_pose(1));
    assert_eq!(skeleton.pose_revision(), 1);

    // Changes in the same traversal are not picked up until marked dirty
    let root = skeleton.find_bone_by_name("Bone0").unwrap();
    skeleton.bone_mut(root).unwrap().transform.position = Vec3::X;
    assert!(!skeleton.refresh_pose(1));

    skeleton.mark_dirty();
    assert!(skeleton.refresh_pose(1));
    let origin = skeleton.bone(root).unwrap().matrix_in_skeleton_space().translation;
    assert!(vec3_approx(origin.into(), Vec3::X));

    assert!(skeleton.refresh_pose(2));
    assert_eq!(skeleton.pose_revision(), 3);
}

// ============================================================================
// Influence map
// ============================================================================

#[test]
fn influence_map_iterates_in_name_order() {
    let sphere = BoundingSphere::new(Vec3::ZERO, 1.0);
    let map: InfluenceMap = [
        ("Spine".to_string(), BoneInfluence::new(Affine3A::IDENTITY, sphere)),
        ("Head".to_string(), BoneInfluence::new(Affine3A::IDENTITY, sphere)),
        ("Arm".to_string(), BoneInfluence::new(Affine3A::IDENTITY, sphere)),
    ]
    .into_iter()
    .collect();

    let names: Vec<&str> = map.bone_names().collect();
    assert_eq!(names, ["Arm", "Head", "Spine"]);
}

#[test]
fn influence_map_serde_roundtrip() -> anyhow::Result<()> {
    let mut map = InfluenceMap::new();
    map.insert(
        "Root",
        BoneInfluence::new(
            Affine3A::from_translation(Vec3::new(0.0, -1.0, 0.0)),
            BoundingSphere::new(Vec3::Y, 0.5),
        )
        .with_weights([(0, 0.25), (7, 1.0)]),
    );

    let json = serde_json::to_string(&map)?;
    let restored: InfluenceMap = serde_json::from_str(&json)?;
    assert_eq!(restored, map);
    assert!((restored.get("Root").unwrap().weights[&7] - 1.0).abs() < EPSILON);
    Ok(())
}
