use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
    },
    pipelines::{
        Layouts, PipelineKind, TargetInfo,
        basic::{PipelineOptions, mk_pipeline_layout, mk_render_pipeline},
        compose_shader,
    },
};

/// Fixed-function state for each flat-colour pipeline variant.
pub fn unlit_options(kind: PipelineKind) -> PipelineOptions {
    match kind {
        PipelineKind::UnlitTransparent => PipelineOptions::default().alpha_blended(),
        PipelineKind::UnlitBackSide => PipelineOptions {
            cull_mode: Some(wgpu::Face::Front),
            ..PipelineOptions::default().alpha_blended()
        },
        PipelineKind::UnlitWireframe => PipelineOptions {
            topology: wgpu::PrimitiveTopology::LineList,
            cull_mode: None,
            ..PipelineOptions::default().alpha_blended()
        },
        _ => PipelineOptions::default(),
    }
}

pub fn mk_unlit_pipeline(
    device: &wgpu::Device,
    target: TargetInfo,
    layouts: &Layouts,
    kind: PipelineKind,
) -> wgpu::RenderPipeline {
    let layout = mk_pipeline_layout(
        device,
        "Unlit Pipeline Layout",
        &[&layouts.unlit_material, &layouts.camera],
    );
    mk_render_pipeline(
        device,
        &format!("{kind:?} Pipeline"),
        &layout,
        target,
        unlit_options(kind),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        compose_shader("Unlit Shader", include_str!("unlit.wgsl")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_cull_front_faces_for_back_side_materials() {
        let options = unlit_options(PipelineKind::UnlitBackSide);
        assert_eq!(options.cull_mode, Some(wgpu::Face::Front));
        assert!(options.depth_write);
    }

    #[test]
    fn should_draw_wireframe_as_lines() {
        let options = unlit_options(PipelineKind::UnlitWireframe);
        assert_eq!(options.topology, wgpu::PrimitiveTopology::LineList);
        assert_eq!(options.blend, Some(wgpu::BlendState::ALPHA_BLENDING));
    }
}
