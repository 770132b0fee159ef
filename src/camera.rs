//! Orbit camera, perspective projection and the camera uniform.
//!
//! The camera always looks at a target point. [`OrbitController`] turns mouse
//! input into changes of the camera's spherical coordinates around that target
//! (azimuth, polar angle, distance) and of the target itself (panning). Input
//! is accumulated between frames and applied in [`OrbitController::update`],
//! optionally with exponential damping.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector2, Vector3};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::{CameraConfig, ControlsConfig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle away from the poles where the view matrix degenerates.
const POLAR_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Distance from the target.
    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    /// Camera right and up axes in world space.
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>) {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward);
        (right, up)
    }
}

impl From<&CameraConfig> for Camera {
    fn from(config: &CameraConfig) -> Self {
        Self::new(config.position, config.target)
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Surface width and height in pixels, exposure, elapsed seconds.
    pub frame: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        let identity: [[f32; 4]; 4] = Matrix4::identity().into();
        Self {
            view_position: [0.0; 4],
            view_proj: identity,
            view: identity,
            projection: identity,
            frame: [1.0, 1.0, 1.0, 0.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        let view = camera.calc_matrix();
        let proj = projection.calc_matrix();
        self.view = view.into();
        self.projection = proj.into();
        self.view_proj = (proj * view).into();
    }

    pub fn set_frame(&mut self, width: u32, height: u32, exposure: f32, elapsed: f32) {
        self.frame = [width as f32, height as f32, exposure, elapsed];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Azimuth, polar angle and radius of the camera relative to its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    /// Polar angle measured from +y.
    pub phi: f32,
    /// Azimuth around +y, measured from +z.
    pub theta: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Rotate,
    Dolly,
    Pan,
}

/// Orbit controls: left drag rotates, wheel and middle drag zoom, right drag
/// pans.
#[derive(Debug)]
pub struct OrbitController {
    controls: ControlsConfig,
    viewport_height: f32,
    spherical_delta: Spherical,
    scale: f32,
    pan_pixels: Vector2<f32>,
    pan_offset: Vector3<f32>,
    drag: Option<Drag>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl OrbitController {
    pub fn new(controls: ControlsConfig, viewport_height: u32) -> Self {
        Self {
            controls,
            viewport_height: viewport_height.max(1) as f32,
            spherical_delta: Spherical {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            },
            scale: 1.0,
            pan_pixels: Vector2::new(0.0, 0.0),
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            drag: None,
            cursor: None,
        }
    }

    pub fn controls(&self) -> &ControlsConfig {
        &self.controls
    }

    pub fn resize(&mut self, viewport_height: u32) {
        self.viewport_height = viewport_height.max(1) as f32;
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.controls.zoom_speed)
    }

    /// Rotate by a mouse movement in pixels; a full viewport height of
    /// horizontal travel is one turn.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if !self.controls.enable_rotate {
            return;
        }
        let factor = 2.0 * PI * self.controls.rotate_speed / self.viewport_height;
        self.spherical_delta.theta -= dx * factor;
        self.spherical_delta.phi -= dy * factor;
    }

    /// Positive steps move the camera towards the target.
    pub fn zoom(&mut self, steps: f32) {
        if !self.controls.enable_zoom || steps == 0.0 {
            return;
        }
        let step = self.zoom_scale().powf(steps.abs());
        if steps > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    /// Pan by a mouse movement in pixels. Converted into world units in
    /// [`update`](Self::update) where the projection is known.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !self.controls.enable_pan {
            return;
        }
        self.pan_pixels += Vector2::new(dx, dy) * self.controls.pan_speed;
    }

    /// Feed a window event to the controller. Returns whether it was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                let drag = match button {
                    MouseButton::Left => Drag::Rotate,
                    MouseButton::Middle => Drag::Dolly,
                    MouseButton::Right => Drag::Pan,
                    _ => return false,
                };
                match state {
                    ElementState::Pressed => self.drag = Some(drag),
                    ElementState::Released if self.drag == Some(drag) => self.drag = None,
                    ElementState::Released => (),
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let last = self.cursor.replace(*position);
                let (Some(last), Some(drag)) = (last, self.drag) else {
                    return false;
                };
                let dx = (position.x - last.x) as f32;
                let dy = (position.y - last.y) as f32;
                match drag {
                    Drag::Rotate => self.rotate(dx, dy),
                    Drag::Pan => self.pan(dx, dy),
                    Drag::Dolly if dy > 0.0 => self.zoom(-1.0),
                    Drag::Dolly if dy < 0.0 => self.zoom(1.0),
                    Drag::Dolly => (),
                }
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.drag = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.zoom(scroll_steps(delta));
                true
            }
            _ => false,
        }
    }

    /// Apply accumulated input to the camera.
    ///
    /// With damping enabled a fraction `damping_factor` of the pending rotation
    /// and pan is applied each frame and the rest carries over, so motion eases
    /// out over the following frames. Zoom applies immediately. The distance to
    /// the target is clamped to `[min_distance, max_distance]`.
    pub fn update(&mut self, camera: &mut Camera, projection: &Projection, dt: Duration) {
        let offset = camera.position - camera.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.pan_pixels != Vector2::new(0.0, 0.0) {
            let (right, up) = camera.basis();
            let target_distance = offset.magnitude() * (projection.fovy.0 / 2.0).tan();
            let left = 2.0 * self.pan_pixels.x * target_distance / self.viewport_height;
            let upwards = 2.0 * self.pan_pixels.y * target_distance / self.viewport_height;
            self.pan_offset += right * -left + up * upwards;
            self.pan_pixels = Vector2::new(0.0, 0.0);
        }

        if self.controls.auto_rotate && self.drag.is_none() {
            let angle = self.controls.auto_rotate_speed.to_radians() * dt.as_secs_f32();
            self.spherical_delta.theta -= angle;
        }

        let damping = self.controls.damping_factor.clamp(0.0, 1.0);
        if self.controls.enable_damping {
            spherical.theta += self.spherical_delta.theta * damping;
            spherical.phi += self.spherical_delta.phi * damping;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }
        spherical.phi = spherical.phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.controls.min_distance, self.controls.max_distance);

        if self.controls.enable_damping {
            camera.target += self.pan_offset * damping;
        } else {
            camera.target += self.pan_offset;
        }
        camera.position = camera.target + spherical.to_offset();

        if self.controls.enable_damping {
            self.spherical_delta.theta *= 1.0 - damping;
            self.spherical_delta.phi *= 1.0 - damping;
            self.pan_offset *= 1.0 - damping;
        } else {
            self.spherical_delta.theta = 0.0;
            self.spherical_delta.phi = 0.0;
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;
    }
}

/// Camera state plus the GPU objects the uniform lives in.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera: Camera,
        controller: OrbitController,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

/// Zoom steps of one wheel event. Pixel deltas only carry a direction;
/// a purely horizontal scroll is no step.
fn scroll_steps(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => *y,
        MouseScrollDelta::PixelDelta(pos) if pos.y == 0.0 => 0.0,
        MouseScrollDelta::PixelDelta(pos) => pos.y.signum() as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    const FRAME: Duration = Duration::from_millis(16);

    fn setup(controls: ControlsConfig) -> (Camera, Projection, OrbitController) {
        let config = CameraConfig::default();
        let camera = Camera::from(&config);
        let projection = Projection::new(800, 600, Deg(config.fov_deg), config.near, config.far);
        (camera, projection, OrbitController::new(controls, 600))
    }

    fn undamped() -> ControlsConfig {
        ControlsConfig {
            enable_damping: false,
            ..Default::default()
        }
    }

    #[test]
    fn should_round_trip_spherical_coordinates() {
        let offset = Vector3::new(1.0, 2.0, -3.0);
        let back = Spherical::from_offset(offset).to_offset();
        assert!((back - offset).magnitude() < 1e-5);
    }

    #[test]
    fn should_keep_distance_while_rotating() {
        let (mut camera, projection, mut controller) = setup(undamped());
        controller.rotate(150.0, 40.0);
        controller.update(&mut camera, &projection, FRAME);
        assert!((camera.distance() - 5.0).abs() < 1e-4);
        assert!(camera.position.x.abs() > 0.1);
    }

    #[test]
    fn should_turn_once_per_viewport_height_of_travel() {
        let (mut camera, projection, mut controller) = setup(undamped());
        controller.rotate(600.0, 0.0);
        controller.update(&mut camera, &projection, FRAME);
        assert!((camera.position - Point3::new(0.0, 0.0, 5.0)).magnitude() < 1e-3);
    }

    #[test]
    fn should_clamp_distance_when_zooming() {
        let (mut camera, projection, mut controller) = setup(ControlsConfig::default());
        for _ in 0..200 {
            controller.zoom(1.0);
            controller.update(&mut camera, &projection, FRAME);
        }
        assert!((camera.distance() - 2.0).abs() < 1e-4);
        for _ in 0..400 {
            controller.zoom(-1.0);
            controller.update(&mut camera, &projection, FRAME);
        }
        assert!((camera.distance() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn should_zoom_by_five_percent_per_step() {
        let (mut camera, projection, mut controller) = setup(undamped());
        controller.zoom(1.0);
        controller.update(&mut camera, &projection, FRAME);
        assert!((camera.distance() - 4.75).abs() < 1e-4);
    }

    #[test]
    fn should_ignore_horizontal_scrolling() {
        let (mut camera, projection, mut controller) = setup(undamped());
        let wheel = |x: f64, y: f64| WindowEvent::MouseWheel {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            delta: MouseScrollDelta::PixelDelta(PhysicalPosition::new(x, y)),
            phase: winit::event::TouchPhase::Moved,
        };
        controller.handle_window_events(&wheel(40.0, 0.0));
        controller.update(&mut camera, &projection, FRAME);
        assert!((camera.distance() - 5.0).abs() < 1e-4);

        controller.handle_window_events(&wheel(0.0, 12.0));
        controller.update(&mut camera, &projection, FRAME);
        assert!((camera.distance() - 4.75).abs() < 1e-4);
        assert_eq!(scroll_steps(&MouseScrollDelta::LineDelta(3.0, 0.0)), 0.0);
    }

    #[test]
    fn should_ease_out_rotation_with_damping() {
        let (mut camera, projection, mut controller) = setup(ControlsConfig::default());
        controller.rotate(-60.0, 0.0);
        controller.update(&mut camera, &projection, FRAME);
        let first = Spherical::from_offset(camera.position - camera.target).theta;
        controller.update(&mut camera, &projection, FRAME);
        let second = Spherical::from_offset(camera.position - camera.target).theta;
        assert!(first > 0.0);
        // The second step applies (1 - 0.05) of the first one
        assert!(((second - first) - first * 0.95).abs() < 1e-4);
    }

    #[test]
    fn should_not_flip_over_the_poles() {
        let (mut camera, projection, mut controller) = setup(undamped());
        controller.rotate(0.0, 10_000.0);
        controller.update(&mut camera, &projection, FRAME);
        let spherical = Spherical::from_offset(camera.position - camera.target);
        assert!(spherical.phi > 0.0 && spherical.phi < PI);
        assert!(camera.calc_matrix().x.x.is_finite());
    }

    #[test]
    fn should_move_target_when_panning() {
        let (mut camera, projection, mut controller) = setup(undamped());
        controller.pan(100.0, 0.0);
        controller.update(&mut camera, &projection, FRAME);
        // Dragging right moves the view left
        assert!(camera.target.x < 0.0);
        assert!((camera.distance() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn should_ignore_disabled_controls() {
        let (mut camera, projection, mut controller) = setup(ControlsConfig {
            enable_rotate: false,
            enable_zoom: false,
            enable_pan: false,
            ..undamped()
        });
        controller.rotate(100.0, 100.0);
        controller.zoom(3.0);
        controller.pan(50.0, 50.0);
        controller.update(&mut camera, &projection, FRAME);
        assert!((camera.position - Point3::new(0.0, 0.0, 5.0)).magnitude() < 1e-5);
    }

    #[test]
    fn should_put_target_in_front_of_camera() {
        let (camera, projection, _) = setup(undamped());
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);
        let view_proj = Matrix4::from(uniform.view_proj);
        let clip = view_proj * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        let depth = clip.z / clip.w;
        assert!(depth > 0.0 && depth < 1.0);
    }
}
