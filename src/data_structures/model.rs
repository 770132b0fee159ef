//! Meshes, materials and the draw helpers used by the render loop.

use std::{ops::Range, sync::Arc};

use wgpu::util::DeviceExt;

use crate::{data_structures::colour::Colour, pipelines::PipelineKind};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Tangent and bitangent feed the normal map
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Geometry uploaded to the GPU. Triangle meshes and line meshes share this
/// type; which one it is only matters to the pipeline that draws it.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        }
    }
}

/// Which faces of a mesh a material draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

/// Lit material parameters, laid out for the standard shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StandardUniform {
    /// rgb emissive colour, w emissive intensity
    pub emissive: [f32; 4],
    /// roughness, metalness, opacity, alpha test
    pub params: [f32; 4],
    /// xy normal scale
    pub normal_scale: [f32; 4],
}

#[derive(Clone, Debug)]
pub struct StandardParams {
    pub emissive: Colour,
    pub emissive_intensity: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub opacity: f32,
    pub alpha_test: f32,
    pub normal_scale: [f32; 2],
    /// Transparent standard materials blend and never write depth.
    pub transparent: bool,
}

impl Default for StandardParams {
    fn default() -> Self {
        Self {
            emissive: Colour::BLACK,
            emissive_intensity: 1.0,
            roughness: 1.0,
            metalness: 0.0,
            opacity: 1.0,
            alpha_test: 0.0,
            normal_scale: [1.0, 1.0],
            transparent: false,
        }
    }
}

impl StandardParams {
    pub fn to_uniform(&self) -> StandardUniform {
        let [er, eg, eb] = self.emissive.to_array();
        StandardUniform {
            emissive: [er, eg, eb, self.emissive_intensity],
            params: [self.roughness, self.metalness, self.opacity, self.alpha_test],
            normal_scale: [self.normal_scale[0], self.normal_scale[1], 0.0, 0.0],
        }
    }
}

/// Flat-colour material parameters.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UnlitUniform {
    /// rgb colour, w opacity
    pub colour: [f32; 4],
}

#[derive(Clone, Debug)]
pub struct UnlitParams {
    pub colour: Colour,
    pub opacity: f32,
    pub transparent: bool,
    pub side: Side,
    pub wireframe: bool,
}

impl Default for UnlitParams {
    fn default() -> Self {
        Self {
            colour: Colour::WHITE,
            opacity: 1.0,
            transparent: false,
            side: Side::Front,
            wireframe: false,
        }
    }
}

impl UnlitParams {
    pub fn to_uniform(&self) -> UnlitUniform {
        let [r, g, b] = self.colour.to_array();
        UnlitUniform {
            colour: [r, g, b, self.opacity],
        }
    }

    pub fn pipeline_kind(&self) -> PipelineKind {
        if self.wireframe {
            PipelineKind::UnlitWireframe
        } else if self.side == Side::Back {
            PipelineKind::UnlitBackSide
        } else if self.transparent {
            PipelineKind::UnlitTransparent
        } else {
            PipelineKind::UnlitOpaque
        }
    }
}

/// A material ready to draw: its pipeline, its queue and its bind group.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub pipeline: PipelineKind,
    pub uniform: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn standard(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        params: &StandardParams,
        maps: StandardMaps<'_>,
    ) -> Self {
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} material uniform")),
            contents: bytemuck::cast_slice(&[params.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(maps.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(maps.base_colour),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(maps.normal),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(maps.emissive),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(maps.roughness),
                },
            ],
            label: Some(name),
        });
        let pipeline = if params.transparent {
            PipelineKind::StandardTransparent
        } else {
            PipelineKind::StandardOpaque
        };
        Self {
            name: name.to_string(),
            pipeline,
            uniform,
            bind_group,
        }
    }

    pub fn unlit(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        params: &UnlitParams,
    ) -> Self {
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} material uniform")),
            contents: bytemuck::cast_slice(&[params.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
            label: Some(name),
        });
        Self {
            name: name.to_string(),
            pipeline: params.pipeline_kind(),
            uniform,
            bind_group,
        }
    }
}

/// Texture views bound by a standard material. Missing maps are filled with
/// neutral 1x1 textures by the caller.
pub struct StandardMaps<'a> {
    pub sampler: &'a wgpu::Sampler,
    pub base_colour: &'a wgpu::TextureView,
    pub normal: &'a wgpu::TextureView,
    pub emissive: &'a wgpu::TextureView,
    pub roughness: &'a wgpu::TextureView,
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Arc<Mesh>,
        material: &'a Material,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    /// Bind groups follow the pipeline layouts: material at 0, camera at 1,
    /// lights at 2 for lit pipelines.
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Arc<Mesh>,
        material: &'b Material,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        if material.pipeline.is_lit() {
            self.set_bind_group(2, light_bind_group, &[]);
        }
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_pick_pipeline_from_unlit_flags() {
        let back = UnlitParams {
            transparent: true,
            side: Side::Back,
            ..Default::default()
        };
        assert_eq!(back.pipeline_kind(), PipelineKind::UnlitBackSide);
        let wire = UnlitParams {
            transparent: true,
            wireframe: true,
            ..Default::default()
        };
        assert_eq!(wire.pipeline_kind(), PipelineKind::UnlitWireframe);
        assert_eq!(UnlitParams::default().pipeline_kind(), PipelineKind::UnlitOpaque);
    }

    #[test]
    fn should_pack_standard_uniform() {
        let params = StandardParams {
            roughness: 0.4,
            metalness: 0.05,
            opacity: 0.5,
            alpha_test: 0.1,
            normal_scale: [0.3, 0.3],
            emissive_intensity: 0.8,
            ..Default::default()
        };
        let uniform = params.to_uniform();
        assert_eq!(uniform.params, [0.4, 0.05, 0.5, 0.1]);
        assert_eq!(uniform.normal_scale[..2], [0.3, 0.3]);
        assert_eq!(uniform.emissive[3], 0.8);
    }

    #[test]
    fn should_keep_vertex_layout_in_sync_with_struct() {
        let desc = ModelVertex::desc();
        assert_eq!(desc.array_stride as usize, std::mem::size_of::<ModelVertex>());
        assert_eq!(desc.attributes.len(), 5);
    }
}
