//! Scene graph and hierarchical scene organization.
//!
//! Provides the [`SceneNode`] trait and its two node types: [`ContainerNode`]
//! groups children under one local transform and [`ModelNode`] draws a mesh
//! with a material once per instance. World transforms are recomputed top-down
//! from the local transforms every frame before the instance buffers are
//! written.

use std::sync::Arc;

use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{Material, Mesh},
    },
    render::Instanced,
};

pub trait SceneNode {
    fn name(&self) -> &str;

    /// The transform of the node relative to its parent. For a model node with
    /// several instances this is the first instance.
    fn local_transform(&self) -> Option<&Instance>;

    fn local_transform_mut(&mut self) -> Option<&mut Instance>;

    fn get_world_transforms(&self) -> Vec<Instance>;

    /// Depth-first search for a node by name, including `self`.
    fn find_mut(&mut self, name: &str) -> Option<&mut dyn SceneNode>;

    /**
     * Recompute world transforms from `parent`, the world transform of the
     * node above, and pass the result down to the children.
     */
    fn update_world_transforms(&mut self, parent: &Instance);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device);

    /// Every mesh of this subtree, in depth-first order.
    fn get_render(&self) -> Vec<Instanced<'_>>;

    fn update_world_transform_all(&mut self) {
        self.update_world_transforms(&Instance::default());
    }
}

/// A group: one local transform applied to all children.
pub struct ContainerNode {
    name: String,
    pub children: Vec<Box<dyn SceneNode>>,
    pub transform: (Instance, Instance),
}

impl ContainerNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: vec![],
            transform: (Instance::default(), Instance::default()),
        }
    }

    pub fn with_children(name: &str, children: Vec<Box<dyn SceneNode>>) -> Self {
        Self {
            children,
            ..Self::new(name)
        }
    }
}

fn find_in_children<'a>(
    children: &'a mut [Box<dyn SceneNode>],
    name: &str,
) -> Option<&'a mut dyn SceneNode> {
    children
        .iter_mut()
        .find_map(|child| child.find_mut(name))
}

impl SceneNode for ContainerNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_transform(&self) -> Option<&Instance> {
        Some(&self.transform.0)
    }

    fn local_transform_mut(&mut self) -> Option<&mut Instance> {
        Some(&mut self.transform.0)
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        vec![self.transform.1.clone()]
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut dyn SceneNode> {
        if self.name == name {
            return Some(self);
        }
        find_in_children(&mut self.children, name)
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        let (local, world) = &mut self.transform;
        *world = parent * &*local;
        let world = world.clone();
        for child in self.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// A mesh drawn with one material, once per instance. Model nodes are
/// leaves of the graph.
///
/// The mesh is shared through an `Arc` so several nodes can draw the same
/// geometry with different materials and transforms.
pub struct ModelNode {
    name: String,
    instance_buffer: wgpu::Buffer,
    instances: Vec<(Instance, Instance)>,
    mesh: Arc<Mesh>,
    material: Material,
}

impl ModelNode {
    pub fn new(
        name: &str,
        device: &wgpu::Device,
        mesh: Arc<Mesh>,
        material: Material,
        instances: Vec<Instance>,
    ) -> Self {
        if instances.is_empty() {
            warn!("Model node {name} was created without instances and will not be drawn.");
        }
        let instances = instances
            .into_iter()
            .map(|local| (local.clone(), local))
            .collect::<Vec<_>>();

        let instance_data = instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect::<Vec<_>>();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Instance Buffer")),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            name: name.to_string(),
            instance_buffer,
            instances,
            mesh,
            material,
        }
    }
}

impl SceneNode for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn local_transform(&self) -> Option<&Instance> {
        self.instances.first().map(|(local, _)| local)
    }

    fn local_transform_mut(&mut self) -> Option<&mut Instance> {
        self.instances.first_mut().map(|(local, _)| local)
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut dyn SceneNode> {
        (self.name == name).then_some(self as &mut dyn SceneNode)
    }

    fn update_world_transforms(&mut self, parent: &Instance) {
        for (local, world) in self.instances.iter_mut() {
            *world = parent * &*local;
        }
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, _device: &wgpu::Device) {
        if self.instances.is_empty() {
            return;
        }
        let raw_instances: Vec<InstanceRaw> = self
            .instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect();
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&raw_instances),
        );
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        vec![Instanced {
            instance: &self.instance_buffer,
            mesh: &self.mesh,
            material: &self.material,
            amount: self.instances.len(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn group(name: &str, children: Vec<Box<dyn SceneNode>>) -> Box<dyn SceneNode> {
        Box::new(ContainerNode::with_children(name, children))
    }

    #[test]
    fn should_propagate_transforms_top_down() {
        let mut root = ContainerNode::with_children(
            "float",
            vec![group("earth", vec![group("clouds", vec![])])],
        );
        root.transform.0.position = Vector3::new(0.0, 0.5, 0.0);
        root.find_mut("earth")
            .and_then(|n| n.local_transform_mut())
            .unwrap()
            .set_rotation_y(std::f32::consts::FRAC_PI_2);
        let clouds = root.find_mut("clouds").unwrap();
        *clouds.local_transform_mut().unwrap() = Instance {
            position: Vector3::new(1.0, 0.0, 0.0),
            ..Instance::uniform_scale(1.01)
        };

        root.update_world_transform_all();

        let world = root.find_mut("clouds").unwrap().get_world_transforms()[0].clone();
        assert!((world.position - Vector3::new(0.0, 0.5, -1.0)).magnitude() < 1e-5);
        assert!((world.scale.x - 1.01).abs() < 1e-6);
    }

    #[test]
    fn should_find_nodes_by_name() {
        let mut root = group(
            "root",
            vec![group("a", vec![]), group("b", vec![group("c", vec![])])],
        );
        assert_eq!(root.find_mut("c").map(|n| n.name().to_string()), Some("c".to_string()));
        assert!(root.find_mut("root").is_some());
        assert!(root.find_mut("missing").is_none());
    }

    #[test]
    fn should_render_nothing_for_empty_groups() {
        let root = group("root", vec![group("a", vec![])]);
        assert!(root.get_render().is_empty());
    }
}
