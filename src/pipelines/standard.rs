//! Lit physically based pipeline used by textured materials.

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::{
        Layouts, TargetInfo,
        basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
        compose_shader,
    },
};

/// Transparent standard materials blend over the opaque pass and leave the
/// depth buffer untouched so layers beneath them stay visible.
pub fn mk_standard_pipeline(
    device: &wgpu::Device,
    target: TargetInfo,
    layouts: &Layouts,
    transparent: bool,
) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(
        device,
        "Standard Pipeline Layout",
        &[&layouts.standard_material, &layouts.camera, &layouts.light],
    );
    let options = if transparent {
        PipelineOptions {
            depth_write: false,
            ..PipelineOptions::default().alpha_blended()
        }
    } else {
        PipelineOptions::default()
    };
    let label = if transparent {
        "Standard Transparent Pipeline"
    } else {
        "Standard Pipeline"
    };
    mk_render_pipeline(
        device,
        label,
        &layout,
        target,
        options,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        compose_shader("Standard Shader", include_str!("standard.wgsl")),
    )
}
