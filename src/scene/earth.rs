//! The textured Earth with its cloud layer and atmosphere.
//!
//! All three meshes share one unit sphere. The cloud and atmosphere shells are
//! the same sphere scaled slightly up, so they sit just above the surface.

use std::sync::Arc;

use crate::{
    data_structures::{
        colour::Colour,
        instance::Instance,
        model::{Material, Mesh, Side, StandardMaps, StandardParams, UnlitParams},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::{self, Texture, TextureOptions},
    },
    pipelines::Layouts,
    resources::{mesh::uv_sphere, texture::load_texture},
};

pub const EARTH_GROUP: &str = "earth";
pub const SURFACE: &str = "earth surface";
pub const CLOUDS: &str = "clouds";
pub const ATMOSPHERE: &str = "atmosphere";

/// Radians per second around y.
pub const EARTH_SPIN: f32 = 0.1;
pub const CLOUD_SPIN: f32 = 0.12;

pub const CLOUD_SCALE: f32 = 1.01;
pub const ATMOSPHERE_SCALE: f32 = 1.02;

pub const ALBEDO: &str = "textures/earth albedo.jpg";
pub const BUMP: &str = "textures/earth bump.jpg";
pub const CLOUDS_MAP: &str = "textures/clouds earth.png";
pub const NIGHT_LIGHTS: &str = "textures/earth night_lights_modified.png";
pub const LAND_OCEAN_MASK: &str = "textures/earth land ocean mask.png";

/// Every texture the Earth needs. Loaded as a whole: the Earth is only built
/// once all of them are available.
#[derive(Debug, Clone)]
pub struct EarthTextures {
    pub albedo: Texture,
    pub bump: Texture,
    pub clouds: Texture,
    pub night_lights: Texture,
    pub land_ocean_mask: Texture,
}

impl EarthTextures {
    pub async fn load(
        asset_root: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<Self> {
        log::info!("Loading Earth textures from {asset_root}");
        let (albedo, bump, clouds, night_lights, land_ocean_mask) = futures::try_join!(
            load_texture(asset_root, ALBEDO, TextureOptions::colour(), device, queue),
            load_texture(asset_root, BUMP, TextureOptions::data(), device, queue),
            load_texture(asset_root, CLOUDS_MAP, TextureOptions::data(), device, queue),
            load_texture(asset_root, NIGHT_LIGHTS, TextureOptions::colour(), device, queue),
            load_texture(asset_root, LAND_OCEAN_MASK, TextureOptions::data(), device, queue),
        )?;
        Ok(Self {
            albedo,
            bump,
            clouds,
            night_lights,
            land_ocean_mask,
        })
    }
}

pub fn surface_params() -> StandardParams {
    StandardParams {
        emissive: Colour::from_hex(0xffaa00),
        emissive_intensity: 0.8,
        roughness: 0.4,
        metalness: 0.05,
        normal_scale: [0.3, 0.3],
        ..Default::default()
    }
}

pub fn cloud_params() -> StandardParams {
    StandardParams {
        roughness: 0.8,
        metalness: 0.0,
        opacity: 0.5,
        alpha_test: 0.1,
        transparent: true,
        ..Default::default()
    }
}

pub fn atmosphere_params() -> UnlitParams {
    UnlitParams {
        colour: Colour::from_hex(0x88ccff),
        opacity: 0.08,
        transparent: true,
        side: Side::Back,
        wireframe: false,
    }
}

/// Build the Earth group: surface, clouds and atmosphere as children of one
/// container named [`EARTH_GROUP`].
pub fn build_earth(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layouts: &Layouts,
    textures: &EarthTextures,
) -> ContainerNode {
    let sphere = Arc::new(uv_sphere(1.0, 64, 32).upload(device, "earth sphere"));
    let sampler = texture::create_sampler(device, wgpu::AddressMode::ClampToEdge);

    let flat_normal = Texture::create_solid([128, 128, 255, 255], "flat normal", device, queue);
    let no_emission = Texture::create_solid([0, 0, 0, 255], "no emission", device, queue);
    let full_roughness = Texture::create_solid([255; 4], "full roughness", device, queue);

    let surface = Material::standard(
        device,
        &layouts.standard_material,
        SURFACE,
        &surface_params(),
        StandardMaps {
            sampler: &sampler,
            base_colour: &textures.albedo.view,
            normal: &textures.bump.view,
            emissive: &textures.night_lights.view,
            roughness: &textures.land_ocean_mask.view,
        },
    );
    let clouds = Material::standard(
        device,
        &layouts.standard_material,
        CLOUDS,
        &cloud_params(),
        StandardMaps {
            sampler: &sampler,
            base_colour: &textures.clouds.view,
            normal: &flat_normal.view,
            emissive: &no_emission.view,
            roughness: &full_roughness.view,
        },
    );
    let atmosphere = Material::unlit(
        device,
        &layouts.unlit_material,
        ATMOSPHERE,
        &atmosphere_params(),
    );

    let shell = |name: &str, mesh: &Arc<Mesh>, material: Material, scale: f32| {
        Box::new(ModelNode::new(
            name,
            device,
            mesh.clone(),
            material,
            vec![Instance::uniform_scale(scale)],
        )) as Box<dyn SceneNode>
    };

    ContainerNode::with_children(
        EARTH_GROUP,
        vec![
            shell(SURFACE, &sphere, surface, 1.0),
            shell(CLOUDS, &sphere, clouds, CLOUD_SCALE),
            shell(ATMOSPHERE, &sphere, atmosphere, ATMOSPHERE_SCALE),
        ],
    )
}

/// Accumulated rotation of the Earth group and the clouds.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct EarthSpin {
    pub group: f32,
    pub clouds: f32,
}

impl EarthSpin {
    pub fn advance(&mut self, dt: f32) {
        self.group += dt * EARTH_SPIN;
        self.clouds += dt * CLOUD_SPIN;
    }

    /// Write the angles into the Earth group and its cloud layer. The cloud
    /// layer turns relative to the group.
    pub fn apply(&self, earth: &mut dyn SceneNode) {
        if let Some(local) = earth.local_transform_mut() {
            local.set_rotation_y(self.group);
        }
        match earth
            .find_mut(CLOUDS)
            .and_then(|clouds| clouds.local_transform_mut())
        {
            Some(local) => local.set_rotation_y(self.clouds),
            None => log::warn!("Earth group has no {CLOUDS} layer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_spin_clouds_faster_than_the_group() {
        let mut spin = EarthSpin::default();
        let mut last = spin;
        for _ in 0..100 {
            spin.advance(1.0 / 60.0);
            assert!(spin.group > last.group);
            assert!(spin.clouds > last.clouds);
            last = spin;
        }
        assert!(spin.clouds > spin.group);
        assert!((spin.group - 100.0 / 60.0 * 0.1).abs() < 1e-4);
    }

    #[test]
    fn should_rotate_group_and_clouds() {
        let mut earth = ContainerNode::with_children(
            EARTH_GROUP,
            vec![Box::new(ContainerNode::new(CLOUDS)) as Box<dyn SceneNode>],
        );
        if let Some(clouds) = earth.find_mut(CLOUDS).and_then(|n| n.local_transform_mut()) {
            *clouds = Instance::uniform_scale(CLOUD_SCALE);
        }
        let spin = EarthSpin {
            group: 0.5,
            clouds: 0.7,
        };
        spin.apply(&mut earth);

        let mut expected = Instance::new();
        expected.set_rotation_y(0.5);
        assert_eq!(earth.transform.0, expected);
        let clouds = earth
            .find_mut(CLOUDS)
            .and_then(|n| n.local_transform().cloned())
            .unwrap();
        assert_eq!(clouds.scale.x, CLOUD_SCALE);
        let mut expected = Instance::uniform_scale(CLOUD_SCALE);
        expected.set_rotation_y(0.7);
        assert_eq!(clouds, expected);
    }

    #[test]
    fn should_configure_materials() {
        let surface = surface_params();
        assert_eq!(surface.roughness, 0.4);
        assert_eq!(surface.normal_scale, [0.3, 0.3]);
        assert!(!surface.transparent);
        let clouds = cloud_params();
        assert!(clouds.transparent);
        assert_eq!(clouds.alpha_test, 0.1);
        assert_eq!(atmosphere_params().side, Side::Back);
    }
}
