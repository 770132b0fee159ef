//! Placeholder shown while the Earth textures load: a turning wireframe
//! sphere with four dots around it.

use std::{f32::consts::FRAC_PI_2, sync::Arc};

use cgmath::Vector3;

use crate::{
    data_structures::{
        colour::Colour,
        instance::Instance,
        model::{Material, UnlitParams},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
    },
    pipelines::Layouts,
    resources::mesh::uv_sphere,
};

pub const LOADER_GROUP: &str = "loader";
/// Radians per second around y.
pub const LOADER_SPIN: f32 = 0.5;
pub const DOT_ORBIT: f32 = 0.9;

/// The loader's angle is absolute, not accumulated from frame deltas.
pub fn loader_angle(elapsed: f32) -> f32 {
    elapsed * LOADER_SPIN
}

/// Dots on a circle in the xy plane, a quarter turn apart, starting on +x.
pub fn dot_positions() -> [Vector3<f32>; 4] {
    std::array::from_fn(|i| {
        let angle = i as f32 * FRAC_PI_2;
        Vector3::new(angle.cos() * DOT_ORBIT, angle.sin() * DOT_ORBIT, 0.0)
    })
}

pub fn wireframe_params() -> UnlitParams {
    UnlitParams {
        colour: Colour::from_hex(0x4a90e2),
        opacity: 0.3,
        transparent: true,
        wireframe: true,
        ..Default::default()
    }
}

pub fn dot_params() -> UnlitParams {
    UnlitParams {
        colour: Colour::from_hex(0x88ccff),
        ..Default::default()
    }
}

pub fn build_loader(device: &wgpu::Device, layouts: &Layouts) -> ContainerNode {
    let wire_mesh = Arc::new(
        uv_sphere(0.6, 16, 12)
            .to_wireframe()
            .upload(device, "loader sphere"),
    );
    let dot_mesh = Arc::new(uv_sphere(0.04, 6, 6).upload(device, "loader dot"));

    let wire = ModelNode::new(
        "loader sphere",
        device,
        wire_mesh,
        Material::unlit(device, &layouts.unlit_material, "loader sphere", &wireframe_params()),
        vec![Instance::new()],
    );
    let dots = ModelNode::new(
        "loader dots",
        device,
        dot_mesh,
        Material::unlit(device, &layouts.unlit_material, "loader dots", &dot_params()),
        dot_positions().into_iter().map(Instance::from).collect(),
    );

    ContainerNode::with_children(
        LOADER_GROUP,
        vec![Box::new(wire) as Box<dyn SceneNode>, Box::new(dots)],
    )
}

/// Turn the loader group to its angle at `elapsed`.
pub fn apply_spin(loader: &mut dyn SceneNode, elapsed: f32) {
    if let Some(local) = loader.local_transform_mut() {
        local.set_rotation_y(loader_angle(elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn should_place_dots_a_quarter_turn_apart() {
        let dots = dot_positions();
        assert!((dots[0] - Vector3::new(0.9, 0.0, 0.0)).magnitude() < 1e-6);
        assert!((dots[1] - Vector3::new(0.0, 0.9, 0.0)).magnitude() < 1e-6);
        assert!((dots[2] - Vector3::new(-0.9, 0.0, 0.0)).magnitude() < 1e-6);
        assert!((dots[3] - Vector3::new(0.0, -0.9, 0.0)).magnitude() < 1e-6);
    }

    #[test]
    fn should_turn_with_absolute_time() {
        assert_eq!(loader_angle(0.0), 0.0);
        assert_eq!(loader_angle(4.0), 2.0);

        let mut group = ContainerNode::new(LOADER_GROUP);
        apply_spin(&mut group, 3.0);
        apply_spin(&mut group, 3.0);
        let mut expected = Instance::new();
        expected.set_rotation_y(1.5);
        assert_eq!(group.transform.0, expected);
    }

    #[test]
    fn should_draw_wireframe_translucent_and_dots_opaque() {
        use crate::pipelines::PipelineKind;
        assert_eq!(wireframe_params().pipeline_kind(), PipelineKind::UnlitWireframe);
        assert_eq!(dot_params().pipeline_kind(), PipelineKind::UnlitOpaque);
    }
}
