//! Render composition and pipeline batching.
//!
//! Flows describe what they draw with a [`Render`]. The engine collects the
//! renders of all flows every frame into [`RenderQueues`] and draws the queues
//! in a fixed order: star sprites first, then opaque meshes, then transparent
//! meshes in the order they were submitted.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum a flow returns from `on_render`
//! - [`Instanced<'a>`] is one mesh with its material and instance buffer
//! - [`Sprites<'a>`] is one layer of camera-facing star quads

use std::sync::Arc;

use crate::{
    data_structures::{
        model::{Material, Mesh},
        scene_graph::SceneNode,
    },
    pipelines::PipelineKind,
};

/// A mesh drawn once per instance in `instance` with `material`.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a Arc<Mesh>,
    pub material: &'a Material,
    pub amount: usize,
}

/// Star sprites: one [`StarVertex`](crate::pipelines::stars::StarVertex) per
/// star in `vertices`, expanded to a quad by the stars pipeline.
pub struct Sprites<'a> {
    pub vertices: &'a wgpu::Buffer,
    pub bind_group: &'a wgpu::BindGroup,
    pub amount: u32,
}

/// Specifies what a flow renders this frame.
///
/// - `None` renders nothing
/// - `Mesh(Instanced)` renders one instanced mesh
/// - `Meshes(Vec<Instanced>)` renders a batch of instanced meshes
/// - `Stars(Sprites)` renders a layer of star sprites
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
///
/// Meshes are routed to the opaque or the transparent queue by the pipeline
/// of their material.
pub enum Render<'a> {
    None,
    Mesh(Instanced<'a>),
    Meshes(Vec<Instanced<'a>>),
    Stars(Sprites<'a>),
    Composed(Vec<Render<'a>>),
}

/// Which queue a material's draws end up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    Stars,
    Opaque,
    Transparent,
}

impl Queue {
    pub fn for_pipeline(kind: PipelineKind) -> Self {
        match kind {
            PipelineKind::Stars => Queue::Stars,
            kind if kind.is_transparent() => Queue::Transparent,
            _ => Queue::Opaque,
        }
    }
}

#[derive(Default)]
pub struct RenderQueues<'a> {
    pub stars: Vec<Sprites<'a>>,
    pub opaque: Vec<Instanced<'a>>,
    pub transparent: Vec<Instanced<'a>>,
}

impl<'a> RenderQueues<'a> {
    fn push_instanced(&mut self, instanced: Instanced<'a>) {
        match Queue::for_pipeline(instanced.material.pipeline) {
            Queue::Opaque => self.opaque.push(instanced),
            Queue::Transparent => self.transparent.push(instanced),
            Queue::Stars => {
                log::warn!(
                    "Material {} uses the stars pipeline and cannot draw a mesh",
                    instanced.material.name
                );
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty() && self.opaque.is_empty() && self.transparent.is_empty()
    }
}

impl<'a> Render<'a> {
    /// Sort this render into `queues` by the pipeline of each material.
    pub fn set_pipelines(self, queues: &mut RenderQueues<'a>) {
        match self {
            Render::Mesh(instanced) => queues.push_instanced(instanced),
            Render::Meshes(vec) => vec
                .into_iter()
                .for_each(|instanced| queues.push_instanced(instanced)),
            Render::Stars(sprites) => queues.stars.push(sprites),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(queues)),
            Render::None => (),
        }
    }
}

impl<'a> From<&'a dyn SceneNode> for Render<'a> {
    fn from(sn: &'a dyn SceneNode) -> Self {
        Render::Meshes(sn.get_render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_route_pipelines_to_queues() {
        assert_eq!(Queue::for_pipeline(PipelineKind::Stars), Queue::Stars);
        assert_eq!(Queue::for_pipeline(PipelineKind::StandardOpaque), Queue::Opaque);
        assert_eq!(Queue::for_pipeline(PipelineKind::UnlitOpaque), Queue::Opaque);
        assert_eq!(
            Queue::for_pipeline(PipelineKind::StandardTransparent),
            Queue::Transparent
        );
        assert_eq!(
            Queue::for_pipeline(PipelineKind::UnlitBackSide),
            Queue::Transparent
        );
        assert_eq!(
            Queue::for_pipeline(PipelineKind::UnlitWireframe),
            Queue::Transparent
        );
    }

    #[test]
    fn should_flatten_empty_compositions() {
        let mut queues = RenderQueues::default();
        Render::Composed(vec![Render::None, Render::Composed(vec![Render::Meshes(vec![])])])
            .set_pipelines(&mut queues);
        assert!(queues.is_empty());
    }
}
