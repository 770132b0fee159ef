//! Scene configuration.
//!
//! Every tunable constant of the Earth scene lives here with the values the
//! scene ships with as `Default`. The engine reads [`RenderConfig`] and
//! [`CameraConfig`] once while creating the [`Context`](crate::context::Context);
//! everything else is read by the flows in [`crate::scene`].

/// Top-level configuration passed to [`crate::scene::launch`].
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub render: RenderConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub stars: Vec<StarLayerConfig>,
    pub float: FloatConfig,
    pub overlay: OverlayConfig,
    /// Seed for everything random in the scene (star placement, float offset).
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            stars: vec![StarLayerConfig::near(), StarLayerConfig::far()],
            float: FloatConfig::default(),
            overlay: OverlayConfig::default(),
            seed: 0x5EED_EA27,
        }
    }
}

/// Surface and frame settings.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub clear_colour: wgpu::Color,
    /// Multisample the colour target when the surface format allows it.
    pub antialias: bool,
    /// Exposure fed into the ACES filmic tone mapping curve.
    pub exposure: f32,
    /// Device pixel ratio range the surface resolution is clamped to.
    pub pixel_ratio: (f64, f64),
    /// Prefer a discrete GPU.
    pub high_performance: bool,
    /// Directory (native) or URL path segment (web) holding the textures.
    pub asset_root: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_colour: wgpu::Color::BLACK,
            antialias: true,
            exposure: 0.8,
            pixel_ratio: (1.0, 2.0),
            high_performance: true,
            asset_root: "assets".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Orbit control settings.
#[derive(Clone, Debug)]
pub struct ControlsConfig {
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub auto_rotate: bool,
    /// Degrees per second around the target when `auto_rotate` is set.
    pub auto_rotate_speed: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_pan: true,
            enable_zoom: true,
            enable_rotate: true,
            min_distance: 2.0,
            max_distance: 15.0,
            auto_rotate: false,
            auto_rotate_speed: 12.0,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

/// One shell of stars around the scene.
#[derive(Clone, Debug)]
pub struct StarLayerConfig {
    /// Inner radius of the shell.
    pub radius: f32,
    /// Thickness of the shell.
    pub depth: f32,
    pub count: u32,
    /// Size multiplier.
    pub factor: f32,
    pub saturation: f32,
    /// Soften each star towards its edge.
    pub fade: bool,
    /// Twinkle speed.
    pub speed: f32,
}

impl StarLayerConfig {
    pub fn near() -> Self {
        Self {
            radius: 300.0,
            depth: 200.0,
            count: 5000,
            factor: 5.0,
            saturation: 0.1,
            fade: true,
            speed: 0.2,
        }
    }

    pub fn far() -> Self {
        Self {
            radius: 500.0,
            depth: 300.0,
            count: 2000,
            factor: 1.5,
            saturation: 0.0,
            fade: true,
            speed: 0.08,
        }
    }
}

/// Gentle bobbing of the Earth group.
#[derive(Clone, Debug)]
pub struct FloatConfig {
    pub speed: f32,
    pub rotation_intensity: f32,
    pub float_intensity: f32,
    pub floating_range: (f32, f32),
}

impl Default for FloatConfig {
    fn default() -> Self {
        Self {
            speed: 0.5,
            rotation_intensity: 0.1,
            float_intensity: 0.3,
            floating_range: (-0.1, 0.1),
        }
    }
}

/// Text shown on top of the canvas.
#[derive(Clone, Debug)]
pub struct OverlayConfig {
    pub page_title: String,
    pub heading: String,
    pub credit: String,
    pub loading_caption: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            page_title: "Piero Marcos - 3D Earth Visualization".to_string(),
            heading: "Earth 3D".to_string(),
            credit: "Piero Marcos".to_string(),
            loading_caption: "loading planetary data...".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_ship_two_star_layers() {
        let config = SceneConfig::default();
        assert_eq!(config.stars.len(), 2);
        assert_eq!(config.stars[0].count, 5000);
        assert_eq!(config.stars[1].count, 2000);
    }

    #[test]
    fn should_keep_min_distance_below_max_distance() {
        let controls = ControlsConfig::default();
        assert!(controls.min_distance < controls.max_distance);
        let camera = CameraConfig::default();
        let start = cgmath::Vector3::from(camera.position);
        let distance = cgmath::InnerSpace::magnitude(start);
        assert!(distance >= controls.min_distance && distance <= controls.max_distance);
    }
}
