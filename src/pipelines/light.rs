use wgpu::util::DeviceExt;

pub const MAX_DIRECTIONAL_LIGHTS: usize = 2;
pub const MAX_POINT_LIGHTS: usize = 4;

/// Light shining from `position` towards the origin.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightRaw {
    pub position: [f32; 4],
    /// rgb colour already multiplied by intensity
    pub colour: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    /// xyz position, w cutoff distance (0 = infinite)
    pub position: [f32; 4],
    /// rgb colour times intensity, w decay exponent
    pub colour: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 4],
    /// x directional lights in use, y point lights in use
    pub counts: [u32; 4],
    pub directional: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    pub point: [PointLightRaw; MAX_POINT_LIGHTS],
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            ambient: [0.0; 4],
            counts: [0; 4],
            directional: [DirectionalLightRaw::default(); MAX_DIRECTIONAL_LIGHTS],
            point: [PointLightRaw::default(); MAX_POINT_LIGHTS],
        }
    }
}

/// The light uniform together with the GPU objects it lives in.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LightResources {
    pub fn new(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        uniform: LightUniform,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
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
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}
