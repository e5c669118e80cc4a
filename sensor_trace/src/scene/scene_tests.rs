//! Unit tests for scene.rs

use super::*;
use crate::config::BufferResidency;
use crate::device::mock_device::FailingDevice;
use crate::device::CpuDevice;
use crate::error::Error;

fn cpu_scene() -> Scene {
    Scene::with_device(EngineConfig::default(), Arc::new(CpuDevice::new()))
}

fn cube() -> MeshDesc {
    MeshDesc::cuboid(Vec3::splat(0.5))
}

fn at(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

/// Sensor at (x, 0, -5) looking down +Z with a single ray
fn point_sensor(x: f32) -> Sensor {
    Sensor::new(Vec3::new(x, 0.0, -5.0), Vec3::Z, 10.0, 0.0, 0.0, 1.0)
}

/// Three cubes along X at 0, 3 and 6, all enabled
fn three_cubes() -> Scene {
    let mut scene = cpu_scene();
    scene
        .set_scene(&[cube(), cube(), cube()], &[at(0.0, 0.0, 0.0), at(3.0, 0.0, 0.0), at(6.0, 0.0, 0.0)], &[true; 3])
        .unwrap();
    scene
}

// ============================================================================
// SET SCENE TESTS
// ============================================================================

#[test]
fn test_set_scene_counts() {
    let scene = three_cubes();
    assert_eq!(scene.instance_count(), 3);
    assert_eq!(scene.model_count(), 3);
    assert_eq!(scene.enabled_count(), 3);
    assert_eq!(scene.generation(), 1);
    assert!(scene.is_index_stale());
}

#[test]
fn test_set_scene_size_mismatch_keeps_previous_scene() {
    let mut scene = three_cubes();
    let result = scene.set_scene(&[cube()], &[at(0.0, 0.0, 0.0), at(1.0, 0.0, 0.0)], &[true]);
    assert!(matches!(result, Err(Error::SizeMismatch(_))));
    assert_eq!(scene.instance_count(), 3);
    assert_eq!(scene.generation(), 1);
}

#[test]
fn test_set_scene_invalid_geometry_keeps_previous_scene() {
    let mut scene = three_cubes();
    let broken = MeshDesc::from_vertices(vec![Vec3::ZERO, Vec3::X]);
    let result = scene.set_scene(&[cube(), broken], &[Mat4::IDENTITY; 2], &[true; 2]);
    assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    assert_eq!(scene.instance_count(), 3);
    assert_eq!(scene.model_count(), 3);
}

#[test]
fn test_set_scene_rejects_projective_transform() {
    let mut scene = cpu_scene();
    let projective = Mat4::perspective_rh(1.0, 1.0, 0.1, 10.0);
    let result = scene.set_scene(&[cube()], &[projective], &[true]);
    assert!(matches!(result, Err(Error::InvalidTransform(_))));
    assert_eq!(scene.instance_count(), 0);
}

#[test]
fn test_set_scene_replaces_everything() {
    let mut scene = three_cubes();
    scene.set_scene(&[cube()], &[at(0.0, 0.0, 0.0)], &[true]).unwrap();
    assert_eq!(scene.instance_count(), 1);

    // Previous cube at x = 6 is gone
    assert_eq!(scene.try_trace_hit(Vec3::new(6.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap(), None);
}

// ============================================================================
// FIRE TESTS
// ============================================================================

#[test]
fn test_fire_positions_cube_at_origin() {
    let mut scene = cpu_scene();
    scene.set_scene(&[cube()], &[Mat4::IDENTITY], &[true]).unwrap();

    let fired = scene.fire_positions(&[point_sensor(0.0)]).unwrap().unwrap();
    assert_eq!(fired.count, 1);

    let positions = scene.positions(fired.handle).unwrap();
    assert!(positions[0].abs_diff_eq(Vec3::new(0.0, 0.0, -0.5), 1e-5));
    assert_eq!(scene.live_results(), 1);
}

#[test]
fn test_fire_positions_no_sensors_or_no_instances() {
    let mut scene = cpu_scene();
    assert_eq!(scene.fire_positions(&[point_sensor(0.0)]).unwrap(), None);

    let mut scene = three_cubes();
    assert_eq!(scene.fire_positions(&[]).unwrap(), None);
    assert_eq!(scene.live_results(), 0);
    assert_eq!(scene.stats().index_builds, 0);
}

#[test]
fn test_fire_positions_all_disabled_yields_empty_result() {
    let mut scene = cpu_scene();
    scene.set_scene(&[cube()], &[Mat4::IDENTITY], &[false]).unwrap();

    let fired = scene.fire_positions(&[point_sensor(0.0)]).unwrap().unwrap();
    assert_eq!(fired.count, 0);
    assert!(scene.positions(fired.handle).unwrap().is_empty());
}

#[test]
fn test_fire_positions_invalid_sensor() {
    let mut scene = three_cubes();
    let bad = Sensor { point_gap: 0.0, ..point_sensor(0.0) };
    let result = scene.fire_positions(&[point_sensor(0.0), bad]);
    assert!(matches!(result, Err(Error::InvalidSensorParams(_))));
    assert_eq!(scene.live_results(), 0);

    // Rejected even when nothing could be hit
    let mut empty = cpu_scene();
    assert!(empty.fire_positions(&[bad]).is_err());
}

#[test]
fn test_fire_positions_in_ray_order() {
    let mut scene = three_cubes();
    let sensors = [point_sensor(6.0), point_sensor(1.5), point_sensor(0.0)];

    let fired = scene.fire_positions(&sensors).unwrap().unwrap();
    let positions = scene.positions(fired.handle).unwrap();
    assert_eq!(positions.len(), 2);
    assert!(positions[0].abs_diff_eq(Vec3::new(6.0, 0.0, -0.5), 1e-5));
    assert!(positions[1].abs_diff_eq(Vec3::new(0.0, 0.0, -0.5), 1e-5));
}

#[test]
fn test_each_fire_gets_fresh_buffer() {
    let mut scene = three_cubes();
    let first = scene.fire_positions(&[point_sensor(0.0)]).unwrap().unwrap();
    let second = scene.fire_positions(&[point_sensor(0.0)]).unwrap().unwrap();
    assert_ne!(first.handle, second.handle);
    assert_eq!(scene.live_results(), 2);

    assert!(scene.release_result(first.handle));
    assert!(!scene.release_result(first.handle));
    assert!(scene.positions(second.handle).is_ok());
    assert!(matches!(scene.positions(first.handle), Err(Error::UnknownHandle(_))));
}

#[test]
fn test_device_only_residency() {
    let config = EngineConfig { residency: BufferResidency::DeviceOnly, ..EngineConfig::default() };
    let mut scene = Scene::with_device(config, Arc::new(CpuDevice::new()));
    scene.set_scene(&[cube()], &[Mat4::IDENTITY], &[true]).unwrap();

    let fired = scene.fire_positions(&[point_sensor(0.0)]).unwrap().unwrap();
    assert_eq!(scene.positions(fired.handle), Err(Error::BufferNotHostVisible));
    assert_eq!(scene.read_back(fired.handle).unwrap().len(), 1);
}

#[test]
fn test_fire_counts_per_sensor() {
    let mut scene = three_cubes();
    // Wide fan across all three cubes, plus one sensor aimed between cubes
    let fan = Sensor::new(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, 20.0, 0.0, 80.0, 1.0);
    let sensors = [point_sensor(0.0), point_sensor(1.5), fan];
    let mut counts = [usize::MAX; 3];

    assert!(scene.fire_counts(&sensors, &mut counts).unwrap());
    assert_eq!(counts[0], 1);
    assert_eq!(counts[1], 0);
    assert!(counts[2] > 0 && counts[2] <= fan.ray_count());
}

#[test]
fn test_fire_counts_size_mismatch() {
    let mut scene = three_cubes();
    let mut counts = [7usize; 1];
    let result = scene.fire_counts(&[point_sensor(0.0), point_sensor(3.0)], &mut counts);
    assert!(matches!(result, Err(Error::SizeMismatch(_))));
    assert_eq!(counts, [7]);
}

#[test]
fn test_fire_counts_noop_cases() {
    let mut scene = cpu_scene();
    let mut counts = [9usize; 1];
    assert!(!scene.fire_counts(&[point_sensor(0.0)], &mut counts).unwrap());
    assert_eq!(counts, [9]);

    let mut scene = three_cubes();
    assert!(!scene.fire_counts(&[], &mut []).unwrap());
}

// ============================================================================
// UPDATE TESTS
// ============================================================================

#[test]
fn test_update_transforms_moves_only_listed_instances() {
    let mut scene = three_cubes();
    scene.update_transforms(&[1], &[at(3.0, 10.0, 0.0)]).unwrap();

    assert!(scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
    assert!(!scene.check_hit(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
    assert!(scene.check_hit(Vec3::new(3.0, 10.0, -5.0), Vec3::Z, 10.0).unwrap());
    assert!(scene.check_hit(Vec3::new(6.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
}

#[test]
fn test_update_transforms_round_trip() {
    let mut scene = three_cubes();
    let original = *scene.instances().transform(2).unwrap();

    scene.update_transforms(&[2], &[at(6.0, 0.0, 4.0)]).unwrap();
    let hit = scene.trace_hit(Vec3::new(6.0, 0.0, -5.0), Vec3::Z, 20.0).unwrap();
    assert!(hit.abs_diff_eq(Vec3::new(6.0, 0.0, 3.5), 1e-5));

    scene.update_transforms(&[2], &[math::mat4_from_affine(&original)]).unwrap();
    let hit = scene.trace_hit(Vec3::new(6.0, 0.0, -5.0), Vec3::Z, 20.0).unwrap();
    assert!(hit.abs_diff_eq(Vec3::new(6.0, 0.0, -0.5), 1e-5));
}

#[test]
fn test_update_transforms_invalid_matrix_is_all_or_nothing() {
    let mut scene = three_cubes();
    let generation = scene.generation();
    let projective = Mat4::perspective_rh(1.0, 1.0, 0.1, 10.0);

    let result = scene.update_transforms(&[0, 1], &[at(0.0, 50.0, 0.0), projective]);
    assert!(matches!(result, Err(Error::InvalidTransform(_))));
    assert_eq!(scene.generation(), generation);
    assert!(scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
}

#[test]
fn test_update_enabled_out_of_range_keeps_state() {
    let mut scene = three_cubes();
    assert!(scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());

    let result = scene.update_enabled(&[0, 3], &[false, false]);
    assert_eq!(result, Err(Error::IndexOutOfRange { index: 3, count: 3 }));
    assert!(!scene.is_index_stale());
    assert!(scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
}

#[test]
fn test_disabled_instance_is_never_hit() {
    let mut scene = three_cubes();
    scene.update_enabled(&[1], &[false]).unwrap();

    assert!(!scene.check_hit(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
    let fan = Sensor::new(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, 10.0, 1.0, 4.0, 0.25);
    let fired = scene.fire_positions(&[fan]).unwrap().unwrap();
    assert_eq!(fired.count, 0);

    scene.update_enabled(&[1], &[true]).unwrap();
    assert!(scene.check_hit(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
}

#[test]
fn test_enable_within_distance() {
    let mut scene = three_cubes();
    let generation = scene.generation();

    // Only the cube at x = 0 is strictly within 2 units of the origin
    let changed = scene.enable_within_distance(Vec3::ZERO, 2.0).unwrap();
    assert_eq!(changed, 2);
    assert_eq!(scene.enabled_count(), 1);
    assert!(scene.instances().is_enabled(0));
    assert_eq!(scene.generation(), generation + 1);

    // Same sphere again: nothing to change, no generation bump
    assert_eq!(scene.enable_within_distance(Vec3::ZERO, 2.0).unwrap(), 0);
    assert_eq!(scene.generation(), generation + 1);

    // Boundary is exclusive
    assert_eq!(scene.enable_within_distance(Vec3::ZERO, 3.0).unwrap(), 0);
    assert_eq!(scene.enable_within_distance(Vec3::ZERO, 100.0).unwrap(), 2);
    assert_eq!(scene.enabled_count(), 3);

    assert!(scene.enable_within_distance(Vec3::ZERO, f32::NAN).is_err());
}

// ============================================================================
// SINGLE RAY TESTS
// ============================================================================

#[test]
fn test_trace_hit_and_miss_sentinel() {
    let mut scene = three_cubes();
    let hit = scene.trace_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 3.0), 10.0).unwrap();
    assert!(hit.abs_diff_eq(Vec3::new(0.0, 0.0, -0.5), 1e-5));

    let miss = scene.trace_hit(Vec3::new(0.0, 5.0, -5.0), Vec3::Z, 10.0).unwrap();
    assert_eq!(miss, MISS_POSITION);
    assert_eq!(scene.try_trace_hit(Vec3::new(0.0, 5.0, -5.0), Vec3::Z, 10.0).unwrap(), None);
}

#[test]
fn test_single_ray_respects_max_distance() {
    let mut scene = three_cubes();
    assert!(!scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 4.0).unwrap());
    assert!(scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 4.6).unwrap());
}

#[test]
fn test_single_ray_invalid_input() {
    let mut scene = three_cubes();
    assert!(matches!(
        scene.check_hit(Vec3::ZERO, Vec3::ZERO, 1.0),
        Err(Error::InvalidSensorParams(_))
    ));
    assert!(matches!(
        scene.trace_hit(Vec3::ZERO, Vec3::Z, -1.0),
        Err(Error::InvalidSensorParams(_))
    ));
}

#[test]
fn test_single_ray_on_empty_scene() {
    let mut scene = cpu_scene();
    assert!(!scene.check_hit(Vec3::ZERO, Vec3::Z, 1.0).unwrap());
    assert_eq!(scene.trace_hit(Vec3::ZERO, Vec3::Z, 1.0).unwrap(), MISS_POSITION);
}

// ============================================================================
// DEVICE FAILURE / STATS TESTS
// ============================================================================

#[test]
fn test_device_failure_aborts_fire_without_result() {
    let device = Arc::new(FailingDevice::new());
    let mut scene = Scene::with_device(EngineConfig::default(), device.clone());
    scene.set_scene(&[cube()], &[Mat4::IDENTITY], &[true]).unwrap();

    device.set_fail_traces(true);
    let result = scene.fire_positions(&[point_sensor(0.0)]);
    assert_eq!(result, Err(Error::OutOfMemory));
    assert_eq!(scene.live_results(), 0);

    device.set_fail_traces(false);
    assert!(scene.fire_positions(&[point_sensor(0.0)]).unwrap().is_some());
}

#[test]
fn test_failed_rebuild_retries_on_next_query() {
    let device = Arc::new(FailingDevice::new());
    let mut scene = Scene::with_device(EngineConfig::default(), device.clone());
    scene.set_scene(&[cube()], &[Mat4::IDENTITY], &[true]).unwrap();
    assert!(scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());

    scene.update_enabled(&[0], &[false]).unwrap();
    device.set_fail_builds(true);
    assert!(matches!(
        scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0),
        Err(Error::DeviceError(_))
    ));
    assert!(scene.is_index_stale());

    device.set_fail_builds(false);
    assert!(!scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap());
}

#[test]
fn test_stats_accumulate_and_reset() {
    let mut scene = three_cubes();
    let fan = Sensor::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0, 0.0, 2.0, 1.0);
    scene.fire_positions(&[fan]).unwrap();
    scene.check_hit(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 10.0).unwrap();

    let stats = *scene.stats();
    assert_eq!(stats.rays_traced, fan.ray_count() as u64 + 1);
    assert_eq!(stats.hits, stats.rays_traced);
    assert_eq!(stats.index_builds, 1);
    assert_eq!(stats.last_build_instances, 3);

    scene.reset_stats();
    assert_eq!(*scene.stats(), TraceStats::default());
}

#[test]
fn test_device_kind_reported() {
    let scene = cpu_scene();
    assert_eq!(scene.device_kind(), ContextKind::Cpu);
    assert_eq!(scene.device_name(), "cpu");
}
