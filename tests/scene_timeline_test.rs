//! Frame-by-frame behaviour of the scene parts that don't need a GPU.

use std::time::Duration;

use cgmath::{InnerSpace, Vector3};
use earth_scene::{
    camera::{Camera, OrbitController, Projection},
    config::{CameraConfig, ControlsConfig, FloatConfig, SceneConfig, StarLayerConfig},
    scene::{
        SceneState,
        earth::EarthSpin,
        float::FloatMotion,
        lighting::LightingRig,
        loader::{dot_positions, loader_angle},
        stars::generate_layer,
    },
};

const FRAME: Duration = Duration::from_millis(16);

#[test]
fn should_spin_earth_and_clouds_monotonically() {
    let mut spin = EarthSpin::default();
    let mut previous = spin;
    for _ in 0..600 {
        spin.advance(FRAME.as_secs_f32());
        assert!(spin.group > previous.group);
        assert!(spin.clouds - previous.clouds > spin.group - previous.group);
        previous = spin;
    }
}

#[test]
fn should_keep_light_intensity_in_range_while_zooming() {
    let base = LightingRig::default();
    let mut rig = base.clone();
    for step in 0..=130 {
        let distance = 2.0 + step as f32 * 0.1;
        rig.update(Vector3::new(0.3, 0.2, 1.0).normalize() * distance);
        let ratio = rig.main.intensity / base.main.intensity;
        assert!((0.3..=1.0).contains(&ratio), "ratio {ratio} at {distance}");
        if distance <= 8.0 {
            assert_eq!(rig.main.intensity, base.main.intensity);
            assert_eq!(rig.fill.intensity, base.fill.intensity);
        }
    }
}

#[test]
fn should_show_loader_until_textures_arrive() {
    let mut state = SceneState::default();
    for frame in 0..10 {
        assert!(state.phase.shows_loader(), "frame {frame}");
    }
    assert!(state.mark_ready());
    for _ in 0..10 {
        assert!(!state.phase.shows_loader());
        assert!(!state.mark_ready());
    }
}

#[test]
fn should_turn_loader_with_elapsed_time() {
    let mut previous = loader_angle(0.0);
    for frame in 1..100 {
        let angle = loader_angle(frame as f32 * FRAME.as_secs_f32());
        assert!(angle > previous);
        previous = angle;
    }
    for dot in dot_positions() {
        assert!((dot.magnitude() - 0.9).abs() < 1e-5);
        assert_eq!(dot.z, 0.0);
    }
}

#[test]
fn should_float_within_bounds() {
    let config = SceneConfig::default();
    let motion = FloatMotion::seeded(config.float.clone(), config.seed);
    let FloatConfig {
        rotation_intensity,
        float_intensity,
        floating_range: (low, high),
        ..
    } = config.float;
    for frame in 0..5000 {
        let pose = motion.pose(frame as f32 * FRAME.as_secs_f32());
        assert!(pose.rotation[0].abs() <= rotation_intensity / 8.0 + 1e-6);
        assert!(pose.rotation[2].abs() <= rotation_intensity / 20.0 + 1e-6);
        assert!(pose.height >= low * float_intensity - 1e-6);
        assert!(pose.height <= high * float_intensity + 1e-6);
    }
}

#[test]
fn should_generate_identical_starfields_for_one_seed() {
    let seed = SceneConfig::default().seed;
    for layer in [StarLayerConfig::near(), StarLayerConfig::far()] {
        let first = generate_layer(&layer, seed);
        let second = generate_layer(&layer, seed);
        assert_eq!(first, second);
    }
}

#[test]
fn should_keep_camera_distance_within_limits() {
    let mut camera = Camera::from(&CameraConfig::default());
    let projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0);
    let mut controller = OrbitController::new(ControlsConfig::default(), 600);

    for _ in 0..200 {
        controller.zoom(3.0);
        controller.update(&mut camera, &projection, FRAME);
        assert!(camera.distance() >= 2.0 - 1e-4);
    }
    assert!((camera.distance() - 2.0).abs() < 1e-3);

    for _ in 0..200 {
        controller.zoom(-3.0);
        controller.rotate(15.0, 4.0);
        controller.update(&mut camera, &projection, FRAME);
        assert!(camera.distance() <= 15.0 + 1e-3);
    }
    assert!((camera.distance() - 15.0).abs() < 1e-2);
}
