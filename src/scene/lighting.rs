//! Lights that follow the camera.
//!
//! The main and fill lights sit on the line through the camera and the
//! origin, so the side of the Earth facing the viewer is always lit. Both dim
//! as the camera moves away. Point lights and the ambient term stay fixed.

use cgmath::{EuclideanSpace, InnerSpace, Vector3, Zero};
use instant::Duration;

use crate::{
    context::Context,
    data_structures::colour::Colour,
    flow::{GraphicsFlow, Out},
    pipelines::light::{
        DirectionalLightRaw, LightUniform, MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS, PointLightRaw,
    },
    render::Render,
    scene::{SceneEvent, SceneState},
};

/// Distance from the origin the main light is placed at.
pub const MAIN_LIGHT_DISTANCE: f32 = 10.0;
/// The fill light sits on the opposite side of the origin.
pub const FILL_LIGHT_DISTANCE: f32 = -8.0;

/// `clamp(8 / distance, 0.3, 1)`: full intensity up to a distance of 8.
pub fn intensity_factor(camera_distance: f32) -> f32 {
    (8.0 / camera_distance).clamp(0.3, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub position: Vector3<f32>,
    pub colour: Colour,
    pub base_intensity: f32,
    pub intensity: f32,
}

impl DirectionalLight {
    fn new(position: Vector3<f32>, hex: u32, intensity: f32) -> Self {
        Self {
            position,
            colour: Colour::from_hex(hex),
            base_intensity: intensity,
            intensity,
        }
    }

    fn to_raw(&self) -> DirectionalLightRaw {
        let [r, g, b] = self.colour.scaled(self.intensity);
        DirectionalLightRaw {
            position: self.position.extend(0.0).into(),
            colour: [r, g, b, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub colour: Colour,
    pub intensity: f32,
    /// Range after which the light has no effect.
    pub distance: f32,
    pub decay: f32,
}

impl PointLight {
    fn new(position: [f32; 3], intensity: f32, hex: u32, distance: f32, decay: f32) -> Self {
        Self {
            position: position.into(),
            colour: Colour::from_hex(hex),
            intensity,
            distance,
            decay,
        }
    }

    fn to_raw(&self) -> PointLightRaw {
        let [r, g, b] = self.colour.scaled(self.intensity);
        PointLightRaw {
            position: self.position.extend(self.distance).into(),
            colour: [r, g, b, self.decay],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightingRig {
    pub ambient: Colour,
    pub ambient_intensity: f32,
    pub main: DirectionalLight,
    pub fill: DirectionalLight,
    pub points: Vec<PointLight>,
}

impl Default for LightingRig {
    fn default() -> Self {
        Self {
            ambient: Colour::from_hex(0x404040),
            ambient_intensity: 0.15,
            main: DirectionalLight::new(Vector3::new(10.0, 2.0, 8.0), 0xfff5dc, 1.2),
            fill: DirectionalLight::new(Vector3::new(-8.0, 5.0, -3.0), 0xffebb5, 0.4),
            points: vec![
                PointLight::new([-10.0, 0.0, 0.0], 0.2, 0x6bb6ff, 15.0, 2.0),
                PointLight::new([0.0, 10.0, 0.0], 0.15, 0xffffff, 20.0, 2.0),
                PointLight::new([0.0, -8.0, 5.0], 0.1, 0x4a90e2, 15.0, 2.0),
            ],
        }
    }
}

impl LightingRig {
    /// Move the main and fill lights onto the camera axis and dim them with
    /// distance. A camera at the origin has no direction, so the positions
    /// are kept and only the intensities change.
    pub fn update(&mut self, camera_position: Vector3<f32>) {
        let factor = intensity_factor(camera_position.magnitude());
        if !camera_position.is_zero() {
            let direction = camera_position.normalize();
            self.main.position = direction * MAIN_LIGHT_DISTANCE;
            self.fill.position = direction * FILL_LIGHT_DISTANCE;
        }
        self.main.intensity = self.main.base_intensity * factor;
        self.fill.intensity = self.fill.base_intensity * factor;
    }

    pub fn to_uniform(&self) -> LightUniform {
        let mut uniform = LightUniform::default();
        let [r, g, b] = self.ambient.scaled(self.ambient_intensity);
        uniform.ambient = [r, g, b, 0.0];

        let directional = [&self.main, &self.fill];
        for (slot, light) in uniform.directional.iter_mut().zip(directional) {
            *slot = light.to_raw();
        }
        for (slot, light) in uniform.point.iter_mut().zip(&self.points) {
            *slot = light.to_raw();
        }
        uniform.counts = [
            directional.len().min(MAX_DIRECTIONAL_LIGHTS) as u32,
            self.points.len().min(MAX_POINT_LIGHTS) as u32,
            0,
            0,
        ];
        uniform
    }
}

/// Keeps the light uniform in step with the camera. Registered before every
/// other flow so the lights are current when the frame is drawn.
pub struct LightingFlow {
    rig: LightingRig,
}

impl LightingFlow {
    pub fn new(rig: LightingRig) -> Self {
        if rig.points.len() > MAX_POINT_LIGHTS {
            log::warn!(
                "Only the first {MAX_POINT_LIGHTS} of {} point lights are used",
                rig.points.len()
            );
        }
        Self { rig }
    }
}

impl GraphicsFlow<SceneState, SceneEvent> for LightingFlow {
    fn on_init(&mut self, ctx: &mut Context, _state: &mut SceneState) -> Out<SceneEvent> {
        self.rig.update(ctx.camera.camera.position.to_vec());
        ctx.set_lights(self.rig.to_uniform());
        Out::Empty
    }

    fn on_update(
        &mut self,
        ctx: &Context,
        _state: &mut SceneState,
        _dt: Duration,
    ) -> Out<SceneEvent> {
        let camera_position = ctx.camera.camera.position.to_vec();
        self.rig.update(camera_position);
        let uniform = self.rig.to_uniform();
        Out::Configure(Box::new(move |ctx| ctx.set_lights(uniform)))
    }

    fn on_custom_events(
        &mut self,
        _ctx: &Context,
        _state: &mut SceneState,
        event: SceneEvent,
    ) -> Option<SceneEvent> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        Render::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_full_intensity_up_close() {
        assert_eq!(intensity_factor(2.0), 1.0);
        assert_eq!(intensity_factor(8.0), 1.0);
        assert!((intensity_factor(10.0) - 0.8).abs() < 1e-6);
        assert_eq!(intensity_factor(100.0), 0.3);
    }

    #[test]
    fn should_place_lights_on_camera_axis() {
        let mut rig = LightingRig::default();
        rig.update(Vector3::new(0.0, 0.0, 5.0));
        assert!((rig.main.position - Vector3::new(0.0, 0.0, 10.0)).magnitude() < 1e-5);
        assert!((rig.fill.position - Vector3::new(0.0, 0.0, -8.0)).magnitude() < 1e-5);
        assert_eq!(rig.main.intensity, 1.2);
        assert_eq!(rig.fill.intensity, 0.4);
    }

    #[test]
    fn should_dim_lights_far_away() {
        let mut rig = LightingRig::default();
        rig.update(Vector3::new(0.0, 15.0, 0.0));
        assert!((rig.main.intensity - 1.2 * 8.0 / 15.0).abs() < 1e-5);
        assert!((rig.fill.intensity - 0.4 * 8.0 / 15.0).abs() < 1e-5);
    }

    #[test]
    fn should_keep_positions_for_camera_at_origin() {
        let mut rig = LightingRig::default();
        rig.update(Vector3::zero());
        assert_eq!(rig.main.position, Vector3::new(10.0, 2.0, 8.0));
        assert_eq!(rig.fill.position, Vector3::new(-8.0, 5.0, -3.0));
        assert_eq!(rig.main.intensity, 1.2);
    }

    #[test]
    fn should_pack_every_light_into_the_uniform() {
        let uniform = LightingRig::default().to_uniform();
        assert_eq!(uniform.counts[..2], [2, 3]);
        // Distance and decay travel in the w components
        assert_eq!(uniform.point[1].position, [0.0, 10.0, 0.0, 20.0]);
        assert_eq!(uniform.point[1].colour[3], 2.0);
        assert!((uniform.point[1].colour[0] - 0.15).abs() < 1e-6);
        assert_eq!(uniform.point[3], PointLightRaw::default());
    }
}
