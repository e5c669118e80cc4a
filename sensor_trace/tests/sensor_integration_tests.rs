//! Integration tests for sensor firing through the public API
//!
//! These tests drive a scene the way a host application does: push a scene,
//! fire sensors, read the hit positions back and release the handles.
//!
//! Run with: cargo test --test sensor_integration_tests

use sensor_trace::glam::{Mat4, Vec3};
use sensor_trace::sensortrace::geometry::MeshDesc;
use sensor_trace::sensortrace::sensor::Sensor;
use sensor_trace::sensortrace::{
    BufferResidency, ContextKind, EngineConfig, Error, HostSession, Scene, MISS_POSITION,
};

// ============================================================================
// HELPERS
// ============================================================================

fn scene_with(context: ContextKind, residency: BufferResidency) -> Scene {
    let config = EngineConfig { context, residency, ..EngineConfig::default() };
    Scene::new(config).unwrap()
}

fn unit_cube() -> MeshDesc {
    MeshDesc::cuboid(Vec3::splat(0.5))
}

/// Straight ray along +Z from `origin`
fn point_sensor(origin: Vec3) -> Sensor {
    Sensor::new(origin, Vec3::Z, 10.0, 0.0, 0.0, 1.0)
}

/// Row of `count` unit cubes along +X, 3 units apart
fn cube_row(scene: &mut Scene, count: usize, enabled: bool) {
    let meshes = vec![unit_cube(); count];
    let transforms: Vec<Mat4> = (0..count)
        .map(|i| Mat4::from_translation(Vec3::new(i as f32 * 3.0, 0.0, 0.0)))
        .collect();
    scene.set_scene(&meshes, &transforms, &vec![enabled; count]).unwrap();
}

// ============================================================================
// FIRE TESTS
// ============================================================================

#[test]
fn test_integration_single_cube_hit() {
    let mut scene = scene_with(ContextKind::Cpu, BufferResidency::HostVisible);
    cube_row(&mut scene, 1, true);

    let fired = scene.fire_positions(&[point_sensor(Vec3::new(0.0, 0.0, -5.0))]).unwrap().unwrap();
    assert_eq!(fired.count, 1);

    let positions = scene.positions(fired.handle).unwrap();
    assert!(positions[0].abs_diff_eq(Vec3::new(0.0, 0.0, -0.5), 1e-5));
    assert!(scene.release_result(fired.handle));
}

#[test]
fn test_integration_disabled_cube_is_invisible() {
    let mut scene = scene_with(ContextKind::Cpu, BufferResidency::HostVisible);
    cube_row(&mut scene, 1, false);

    let fired = scene.fire_positions(&[point_sensor(Vec3::new(0.0, 0.0, -5.0))]).unwrap().unwrap();
    assert_eq!(fired.count, 0);
    assert!(!scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
}

#[test]
fn test_integration_fan_sensor_hits_row() {
    let mut scene = scene_with(ContextKind::Cpu, BufferResidency::HostVisible);
    cube_row(&mut scene, 5, true);

    // Horizontal fan aimed at the middle cube; the outer columns pass beside it
    let sensor = Sensor::new(Vec3::new(6.0, 0.0, -5.0), Vec3::Z, 10.0, 0.0, 20.0, 1.0);
    let fired = scene.fire_positions(&[sensor]).unwrap().unwrap();
    assert!(fired.count > 0 && fired.count < 20);

    let positions = scene.positions(fired.handle).unwrap();
    assert_eq!(positions.len(), fired.count);
    for position in positions {
        assert!((position.z + 0.5).abs() < 1e-4, "hit {:?} not on a front face", position);
    }
}

#[test]
fn test_integration_device_only_results_need_read_back() {
    let mut scene = scene_with(ContextKind::Cpu, BufferResidency::DeviceOnly);
    cube_row(&mut scene, 1, true);

    let fired = scene.fire_positions(&[point_sensor(Vec3::new(0.0, 0.0, -5.0))]).unwrap().unwrap();
    assert_eq!(scene.positions(fired.handle), Err(Error::BufferNotHostVisible));
    assert_eq!(scene.read_back(fired.handle).unwrap().len(), 1);
}

#[test]
fn test_integration_accelerated_matches_cpu() {
    let sensors: Vec<Sensor> = (0..4)
        .map(|i| Sensor::new(Vec3::new(i as f32 * 3.0, 0.0, -5.0), Vec3::Z, 10.0, 1.0, 20.0, 0.1))
        .collect();

    let mut cpu = scene_with(ContextKind::Cpu, BufferResidency::HostVisible);
    let mut accelerated = scene_with(ContextKind::Accelerated, BufferResidency::HostVisible);
    cube_row(&mut cpu, 4, true);
    cube_row(&mut accelerated, 4, true);

    let mut cpu_counts = vec![0; sensors.len()];
    let mut accelerated_counts = vec![0; sensors.len()];
    assert!(cpu.fire_counts(&sensors, &mut cpu_counts).unwrap());
    assert!(accelerated.fire_counts(&sensors, &mut accelerated_counts).unwrap());
    assert_eq!(cpu_counts, accelerated_counts);
}

// ============================================================================
// UPDATE TESTS
// ============================================================================

#[test]
fn test_integration_update_transforms_round_trip() {
    let mut scene = scene_with(ContextKind::Cpu, BufferResidency::HostVisible);
    cube_row(&mut scene, 1, true);
    let origin = Vec3::new(0.0, 0.0, -5.0);

    scene.update_transforms(&[0], &[Mat4::from_translation(Vec3::new(0.0, 20.0, 0.0))]).unwrap();
    assert_eq!(scene.trace_hit(origin, Vec3::Z, 10.0).unwrap(), MISS_POSITION);

    scene.update_transforms(&[0], &[Mat4::IDENTITY]).unwrap();
    let hit = scene.trace_hit(origin, Vec3::Z, 10.0).unwrap();
    assert!(hit.abs_diff_eq(Vec3::new(0.0, 0.0, -0.5), 1e-5));
}

#[test]
fn test_integration_out_of_range_update_leaves_state() {
    let mut scene = scene_with(ContextKind::Cpu, BufferResidency::HostVisible);
    cube_row(&mut scene, 2, true);
    let generation = scene.generation();

    let result = scene.update_enabled(&[0, 2], &[false, false]);
    assert!(matches!(result, Err(Error::IndexOutOfRange { index: 2, count: 2 })));
    assert_eq!(scene.enabled_count(), 2);
    assert_eq!(scene.generation(), generation);
}

#[test]
fn test_integration_enable_within_distance() {
    let mut scene = scene_with(ContextKind::Cpu, BufferResidency::HostVisible);
    cube_row(&mut scene, 5, false);

    // Cubes at x = 0, 3 and 6 are closer than 7
    let changed = scene.enable_within_distance(Vec3::ZERO, 7.0).unwrap();
    assert_eq!(changed, 3);
    assert_eq!(scene.enabled_count(), 3);
}

// ============================================================================
// HOST BOUNDARY TESTS
// ============================================================================

#[test]
fn test_integration_host_release_twice() {
    let mut host = HostSession::new(scene_with(ContextKind::Cpu, BufferResidency::HostVisible));
    let cube: Vec<f32> = unit_cube()
        .triangles()
        .unwrap()
        .iter()
        .flat_map(|t| [t.v0, t.v1, t.v2])
        .flat_map(|v| v.to_array())
        .collect();
    let identity = Mat4::IDENTITY.to_cols_array();

    host.set_scene(1, &[36], &[Some(&cube[..])], &[identity], &[1]).unwrap();
    host.set_sensors(1, &[point_sensor(Vec3::new(0.0, 0.0, -5.0))]).unwrap();

    let fired = host.fire_and_return_positions().unwrap().unwrap();
    assert_eq!(host.positions_flat(fired.handle).unwrap().len(), 3);
    assert!(host.release_result(fired.handle));
    assert!(!host.release_result(fired.handle));
    assert!(matches!(host.positions(fired.handle), Err(Error::UnknownHandle(_))));
}
