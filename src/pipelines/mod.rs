//! Render pipelines and the wgsl they are built from.
//!
//! Every pipeline shares the camera bind group at index 1 and the instance
//! vertex layout from [`crate::data_structures::instance`]. Shaders are
//! assembled by prefixing a pipeline-specific body with `common.wgsl`, which
//! holds the camera uniform, the instance inputs and the tone mapping curve.

use std::borrow::Cow;

pub mod basic;
pub mod light;
pub mod standard;
pub mod stars;
pub mod unlit;

/// Selects the pipeline a material is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    StandardOpaque,
    /// Alpha blended, depth tested, no depth write.
    StandardTransparent,
    UnlitOpaque,
    UnlitTransparent,
    /// Front faces culled, alpha blended.
    UnlitBackSide,
    /// Line list over the mesh edges, alpha blended.
    UnlitWireframe,
    Stars,
}

impl PipelineKind {
    /// Lit pipelines bind the light uniform at group 2.
    pub fn is_lit(&self) -> bool {
        matches!(self, Self::StandardOpaque | Self::StandardTransparent)
    }

    pub fn is_transparent(&self) -> bool {
        !matches!(self, Self::StandardOpaque | Self::UnlitOpaque)
    }
}

/// Bind group layouts shared between pipelines and the resources bound to them.
#[derive(Debug, Clone)]
pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub light: wgpu::BindGroupLayout,
    pub standard_material: wgpu::BindGroupLayout,
    pub unlit_material: wgpu::BindGroupLayout,
    pub stars: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            camera: crate::camera::mk_bind_group_layout(device),
            light: light::mk_bind_group_layout(device),
            standard_material: crate::resources::texture::standard_material_layout(device),
            unlit_material: crate::resources::texture::unlit_material_layout(device),
            stars: stars::mk_bind_group_layout(device),
        }
    }
}

/// Surface properties every pipeline is compiled against.
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

#[derive(Debug)]
pub struct Pipelines {
    pub standard_opaque: wgpu::RenderPipeline,
    pub standard_transparent: wgpu::RenderPipeline,
    pub unlit_opaque: wgpu::RenderPipeline,
    pub unlit_transparent: wgpu::RenderPipeline,
    pub unlit_back_side: wgpu::RenderPipeline,
    pub unlit_wireframe: wgpu::RenderPipeline,
    pub stars: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, target: TargetInfo, layouts: &Layouts) -> Self {
        log::info!(
            "Compiling pipelines for {:?} with {}x multisampling",
            target.format,
            target.sample_count
        );
        Self {
            standard_opaque: standard::mk_standard_pipeline(device, target, layouts, false),
            standard_transparent: standard::mk_standard_pipeline(device, target, layouts, true),
            unlit_opaque: unlit::mk_unlit_pipeline(
                device,
                target,
                layouts,
                PipelineKind::UnlitOpaque,
            ),
            unlit_transparent: unlit::mk_unlit_pipeline(
                device,
                target,
                layouts,
                PipelineKind::UnlitTransparent,
            ),
            unlit_back_side: unlit::mk_unlit_pipeline(
                device,
                target,
                layouts,
                PipelineKind::UnlitBackSide,
            ),
            unlit_wireframe: unlit::mk_unlit_pipeline(
                device,
                target,
                layouts,
                PipelineKind::UnlitWireframe,
            ),
            stars: stars::mk_stars_pipeline(device, target, layouts),
        }
    }

    pub fn get(&self, kind: PipelineKind) -> &wgpu::RenderPipeline {
        match kind {
            PipelineKind::StandardOpaque => &self.standard_opaque,
            PipelineKind::StandardTransparent => &self.standard_transparent,
            PipelineKind::UnlitOpaque => &self.unlit_opaque,
            PipelineKind::UnlitTransparent => &self.unlit_transparent,
            PipelineKind::UnlitBackSide => &self.unlit_back_side,
            PipelineKind::UnlitWireframe => &self.unlit_wireframe,
            PipelineKind::Stars => &self.stars,
        }
    }
}

const COMMON_WGSL: &str = include_str!("common.wgsl");

/// Prefix `body` with the shared declarations.
pub(crate) fn compose_shader<'a>(label: &'a str, body: &str) -> wgpu::ShaderModuleDescriptor<'a> {
    wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(format!("{COMMON_WGSL}\n{body}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_bind_lights_only_for_standard_materials() {
        assert!(PipelineKind::StandardOpaque.is_lit());
        assert!(PipelineKind::StandardTransparent.is_lit());
        assert!(!PipelineKind::UnlitBackSide.is_lit());
        assert!(!PipelineKind::Stars.is_lit());
    }

    #[test]
    fn should_treat_blended_pipelines_as_transparent() {
        assert!(!PipelineKind::StandardOpaque.is_transparent());
        assert!(!PipelineKind::UnlitOpaque.is_transparent());
        assert!(PipelineKind::UnlitWireframe.is_transparent());
        assert!(PipelineKind::UnlitBackSide.is_transparent());
    }

    #[test]
    fn should_prefix_common_declarations() {
        let desc = compose_shader("test", "fn body() {}");
        match desc.source {
            wgpu::ShaderSource::Wgsl(src) => {
                assert!(src.contains("struct CameraUniform"));
                assert!(src.ends_with("fn body() {}"));
            }
            _ => panic!("expected wgsl source"),
        }
    }
}
