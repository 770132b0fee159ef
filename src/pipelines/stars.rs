//! Billboarded star sprites.
//!
//! Each star is one instance of a six-vertex quad expanded in clip space, so
//! its on-screen size is given in framebuffer pixels like a GL point sprite.

use crate::{
    data_structures::model::Vertex,
    pipelines::{
        Layouts, TargetInfo,
        basic::{ADDITIVE_BLENDING, PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
        compose_shader,
    },
};

/// Vertices per star quad.
pub const QUAD_VERTICES: u32 = 6;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StarVertex {
    pub position: [f32; 3],
    pub colour: [f32; 3],
    pub size: f32,
}

impl Vertex for StarVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<StarVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StarsUniform {
    /// x twinkle time, y 1.0 when the sprite edge fades out
    pub params: [f32; 4],
}

impl StarsUniform {
    pub fn new(time: f32, fade: bool) -> Self {
        Self {
            params: [time, if fade { 1.0 } else { 0.0 }, 0.0, 0.0],
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
        label: Some("stars_bind_group_layout"),
    })
}

pub fn mk_stars_pipeline(
    device: &wgpu::Device,
    target: TargetInfo,
    layouts: &Layouts,
) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(
        device,
        "Stars Pipeline Layout",
        &[&layouts.stars, &layouts.camera],
    );
    mk_render_pipeline(
        device,
        "Stars Pipeline",
        &layout,
        target,
        PipelineOptions {
            cull_mode: None,
            blend: Some(ADDITIVE_BLENDING),
            depth_write: false,
            ..Default::default()
        },
        &[StarVertex::desc()],
        compose_shader("Stars Shader", include_str!("stars.wgsl")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_encode_fade_flag() {
        assert_eq!(StarsUniform::new(2.0, true).params, [2.0, 1.0, 0.0, 0.0]);
        assert_eq!(StarsUniform::new(0.5, false).params[1], 0.0);
    }

    #[test]
    fn should_step_star_data_per_instance() {
        let desc = StarVertex::desc();
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(desc.array_stride, 28);
    }
}
