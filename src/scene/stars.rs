//! Starfield background.
//!
//! Each layer is a spherical shell of stars. Stars are placed from the outer
//! edge of the shell inwards with a random step, so the shell fills up evenly
//! and the innermost star stays at or beyond the inner radius.

use std::f32::consts::PI;

use cgmath::Vector3;
use instant::Duration;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wgpu::util::DeviceExt;

use crate::{
    config::StarLayerConfig,
    context::{Context, InitContext},
    data_structures::colour::Colour,
    flow::{GraphicsFlow, Out},
    pipelines::stars::{StarVertex, StarsUniform},
    render::{Render, Sprites},
    scene::{SceneEvent, SceneState},
};

/// Deterministic star positions, colours and sizes for one layer.
pub fn generate_layer(config: &StarLayerConfig, seed: u64) -> Vec<StarVertex> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let count = config.count.max(1) as f32;
    let increment = config.depth / count;
    let mut radius = config.radius + config.depth;

    (0..config.count)
        .map(|i| {
            radius -= increment * rng.random::<f32>();
            // Uniform direction: cos(phi) uniform in [-1, 1], theta uniform
            let phi = (1.0 - 2.0 * rng.random::<f32>()).acos();
            let theta = 2.0 * PI * rng.random::<f32>();
            let position = Vector3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
            let colour = Colour::from_hsl(i as f32 / count, config.saturation, 0.9);
            let size = (0.5 + 0.5 * rng.random::<f32>()) * config.factor;
            StarVertex {
                position: position.into(),
                colour: colour.to_array(),
                size,
            }
        })
        .collect()
}

/// One layer uploaded to the GPU.
pub struct StarLayer {
    config: StarLayerConfig,
    vertices: wgpu::Buffer,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    amount: u32,
}

impl StarLayer {
    pub fn new(ctx: &InitContext, config: StarLayerConfig, seed: u64) -> Self {
        let stars = generate_layer(&config, seed);
        let vertices = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Star Buffer"),
                contents: bytemuck::cast_slice(&stars),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let uniform = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Stars Uniform Buffer"),
                contents: bytemuck::cast_slice(&[StarsUniform::new(0.0, config.fade)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.layouts.stars,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
            label: Some("stars_bind_group"),
        });
        Self {
            amount: stars.len() as u32,
            config,
            vertices,
            uniform,
            bind_group,
        }
    }

    /// Twinkle phase for the elapsed time.
    pub fn time(&self, elapsed: f32) -> f32 {
        elapsed * self.config.speed
    }
}

pub struct StarsFlow {
    layers: Vec<StarLayer>,
}

impl StarsFlow {
    /// Layer `i` is generated from `seed + i`.
    pub fn new(ctx: &InitContext, layers: &[StarLayerConfig], seed: u64) -> Self {
        let layers: Vec<_> = layers
            .iter()
            .enumerate()
            .map(|(i, config)| StarLayer::new(ctx, config.clone(), seed.wrapping_add(i as u64)))
            .collect();
        log::info!(
            "Generated {} stars in {} layers",
            layers.iter().map(|l| l.amount).sum::<u32>(),
            layers.len()
        );
        Self { layers }
    }
}

impl GraphicsFlow<SceneState, SceneEvent> for StarsFlow {
    fn on_init(&mut self, _ctx: &mut Context, _state: &mut SceneState) -> Out<SceneEvent> {
        Out::Empty
    }

    fn on_update(
        &mut self,
        ctx: &Context,
        _state: &mut SceneState,
        _dt: Duration,
    ) -> Out<SceneEvent> {
        let elapsed = ctx.clock.elapsed_secs();
        for layer in &self.layers {
            let uniform = StarsUniform::new(layer.time(elapsed), layer.config.fade);
            ctx.queue
                .write_buffer(&layer.uniform, 0, bytemuck::cast_slice(&[uniform]));
        }
        Out::Empty
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
        Render::Composed(
            self.layers
                .iter()
                .map(|layer| {
                    Render::Stars(Sprites {
                        vertices: &layer.vertices,
                        bind_group: &layer.bind_group,
                        amount: layer.amount,
                    })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn should_generate_same_stars_for_same_seed() {
        let config = StarLayerConfig::far();
        assert_eq!(generate_layer(&config, 7), generate_layer(&config, 7));
        assert_ne!(generate_layer(&config, 7), generate_layer(&config, 8));
    }

    #[test]
    fn should_keep_stars_inside_shell() {
        for config in [StarLayerConfig::near(), StarLayerConfig::far()] {
            let stars = generate_layer(&config, 42);
            assert_eq!(stars.len(), config.count as usize);
            for star in &stars {
                let r = Vector3::from(star.position).magnitude();
                assert!(r >= config.radius - 1e-2 && r <= config.radius + config.depth + 1e-2);
                assert!(star.size >= 0.5 * config.factor && star.size <= config.factor);
            }
        }
    }

    #[test]
    fn should_move_inwards_with_each_star() {
        let stars = generate_layer(&StarLayerConfig::near(), 1);
        let radii: Vec<f32> = stars
            .iter()
            .map(|s| Vector3::from(s.position).magnitude())
            .collect();
        assert!(radii.windows(2).all(|w| w[1] <= w[0] + 1e-2));
    }

    #[test]
    fn should_colour_unsaturated_layer_grey() {
        let stars = generate_layer(&StarLayerConfig::far(), 3);
        for star in stars.iter().take(20) {
            let [r, g, b] = star.colour;
            assert!((r - g).abs() < 1e-6 && (g - b).abs() < 1e-6);
        }
    }
}
