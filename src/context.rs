use std::sync::Arc;

use anyhow::Context as _;
use instant::{Duration, Instant};
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::{self, CameraResources, OrbitController, Projection},
    config::{CameraConfig, ControlsConfig, RenderConfig, SceneConfig},
    data_structures::texture,
    pipelines::{
        Layouts, Pipelines, TargetInfo,
        light::{LightResources, LightUniform},
    },
};

/// Samples per pixel when antialiasing is on and the surface format allows it.
const MSAA_SAMPLES: u32 = 4;

/// The parts of [`SceneConfig`] the engine reads while creating the [`Context`].
#[derive(Clone, Debug, Default)]
pub struct ContextConfig {
    pub render: RenderConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
}

impl From<&SceneConfig> for ContextConfig {
    fn from(config: &SceneConfig) -> Self {
        Self {
            render: config.render.clone(),
            camera: config.camera.clone(),
            controls: config.controls.clone(),
        }
    }
}

/// Frame clock. `elapsed` only moves when [`tick`](Self::tick) is called so
/// every flow sees the same time within one frame.
#[derive(Debug, Clone)]
pub struct Clock {
    last: Instant,
    elapsed: Duration,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Advance to now and return the time since the previous tick.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last;
        self.last = now;
        self.advance(dt);
        dt
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Surface resolution for a window of `physical` pixels at `scale_factor`
/// device pixels per logical pixel, with the pixel ratio clamped to
/// `pixel_ratio`.
pub fn surface_size(
    physical: PhysicalSize<u32>,
    scale_factor: f64,
    pixel_ratio: (f64, f64),
) -> (u32, u32) {
    let scale_factor = if scale_factor > 0.0 { scale_factor } else { 1.0 };
    let ratio = scale_factor.clamp(pixel_ratio.0, pixel_ratio.1);
    let scale = |px: u32| ((px as f64 / scale_factor * ratio).round() as u32).max(1);
    (scale(physical.width), scale(physical.height))
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub(crate) msaa_target: Option<texture::Texture>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub sample_count: u32,
    pub layouts: Layouts,
    pub pipelines: Pipelines,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub clear_colour: wgpu::Color,
    pub exposure: f32,
    pub clock: Clock,
    pub render_config: RenderConfig,
}

impl Context {
    pub async fn new(window: Arc<Window>, settings: &ContextConfig) -> anyhow::Result<Self> {
        let render_config = settings.render.clone();
        let (width, height) = surface_size(
            window.inner_size(),
            window.scale_factor(),
            render_config.pixel_ratio,
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: if render_config.high_performance {
                    wgpu::PowerPreference::HighPerformance
                } else {
                    wgpu::PowerPreference::default()
                },
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter found")?;

        let info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("earth-scene device"),
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                // using_resolution lifts the 2048 texture cap when the
                // adapter allows more
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("could not create the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders write linear colour and rely on an sRGB surface for encoding
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no texture formats")?;
        let present_mode = if surface_caps
            .present_modes
            .contains(&wgpu::PresentMode::Fifo)
        {
            wgpu::PresentMode::Fifo
        } else {
            surface_caps.present_modes[0]
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let msaa_supported = adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(MSAA_SAMPLES);
        let sample_count = if render_config.antialias && msaa_supported {
            MSAA_SAMPLES
        } else {
            if render_config.antialias {
                log::warn!("{surface_format:?} does not support {MSAA_SAMPLES}x multisampling");
            }
            1
        };

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(
            &device,
            TargetInfo {
                format: surface_format,
                sample_count,
            },
            &layouts,
        );

        let projection = Projection::new(
            width,
            height,
            cgmath::Deg(settings.camera.fov_deg),
            settings.camera.near,
            settings.camera.far,
        );
        let camera = CameraResources::new(
            &device,
            &layouts.camera,
            camera::Camera::from(&settings.camera),
            OrbitController::new(settings.controls.clone(), window.inner_size().height),
            &projection,
        );

        let light = LightResources::new(&device, &layouts.light, LightUniform::default());

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [width, height],
            sample_count,
            "depth_texture",
        );
        let msaa_target = (sample_count > 1).then(|| {
            texture::Texture::create_msaa_target(
                &device,
                [width, height],
                surface_format,
                sample_count,
            )
        });

        Ok(Self {
            window,
            depth_texture,
            msaa_target,
            surface,
            device,
            queue,
            config,
            sample_count,
            layouts,
            pipelines,
            camera,
            projection,
            light,
            clear_colour: render_config.clear_colour,
            exposure: render_config.exposure,
            clock: Clock::new(),
            render_config,
        })
    }

    /// Resize the surface and every target that has to match it.
    pub(crate) fn resize(&mut self, physical: PhysicalSize<u32>) {
        let (width, height) = surface_size(
            physical,
            self.window.scale_factor(),
            self.render_config.pixel_ratio,
        );
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.projection.resize(width, height);
        self.camera.controller.resize(physical.height);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [width, height],
            self.sample_count,
            "depth_texture",
        );
        if self.sample_count > 1 {
            self.msaa_target = Some(texture::Texture::create_msaa_target(
                &self.device,
                [width, height],
                self.config.format,
                self.sample_count,
            ));
        }
    }

    /// Run the orbit controls and upload the camera uniform.
    pub(crate) fn update_camera(&mut self, dt: Duration) {
        let camera = &mut self.camera;
        camera
            .controller
            .update(&mut camera.camera, &self.projection, dt);
        camera.uniform.update_view_proj(&camera.camera, &self.projection);
        camera.uniform.set_frame(
            self.config.width,
            self.config.height,
            self.exposure,
            self.clock.elapsed_secs(),
        );
        self.queue
            .write_buffer(&camera.buffer, 0, bytemuck::cast_slice(&[camera.uniform]));
    }

    pub fn set_lights(&mut self, uniform: LightUniform) {
        self.light.uniform = uniform;
        self.queue
            .write_buffer(&self.light.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// What a flow constructor gets to build its GPU resources with.
///
/// Device and queue are reference counted by wgpu, so cloning them only
/// clones handles.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub layouts: Layouts,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            layouts: ctx.layouts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_clamp_pixel_ratio_to_range() {
        // 3x display, 800x600 logical
        let size = surface_size(PhysicalSize::new(2400, 1800), 3.0, (1.0, 2.0));
        assert_eq!(size, (1600, 1200));
        // 0.5x display renders at least at logical resolution
        let size = surface_size(PhysicalSize::new(400, 300), 0.5, (1.0, 2.0));
        assert_eq!(size, (800, 600));
        let size = surface_size(PhysicalSize::new(1920, 1080), 1.5, (1.0, 2.0));
        assert_eq!(size, (1920, 1080));
    }

    #[test]
    fn should_never_return_zero_size() {
        assert_eq!(surface_size(PhysicalSize::new(0, 0), 1.0, (1.0, 2.0)), (1, 1));
    }

    #[test]
    fn should_accumulate_elapsed_time() {
        let mut clock = Clock::new();
        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(750));
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
        assert!((clock.elapsed_secs() - 1.0).abs() < 1e-6);
        let dt = clock.tick();
        assert_eq!(clock.elapsed(), Duration::from_secs(1) + dt);
    }
}
