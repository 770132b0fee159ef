#![cfg(feature = "integration-tests")]

mod common;

use earth_scene::{
    config::FloatConfig,
    context::InitContext,
    data_structures::{
        scene_graph::SceneNode,
        texture::{Texture, TextureOptions},
    },
    flow::GraphicsFlow,
    pipelines::{Pipelines, TargetInfo},
    render::{Render, RenderQueues},
    resources::{mesh::uv_sphere, texture::load_texture},
    scene::{EarthFlow, ScenePhase, SceneState, earth::EarthTextures, loader::build_loader},
};

fn device_or_skip() -> Option<(wgpu::Device, wgpu::Queue)> {
    let device = futures::executor::block_on(common::headless_device());
    if device.is_none() {
        eprintln!("no GPU adapter available, skipping");
    }
    device
}

#[test]
fn should_compile_every_pipeline() {
    let Some((device, _queue)) = device_or_skip() else {
        return;
    };
    let layouts = common::layouts(&device);
    for sample_count in [1, 4] {
        let _pipelines = Pipelines::new(
            &device,
            TargetInfo {
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                sample_count,
            },
            &layouts,
        );
    }
}

#[test]
fn should_upload_sphere_and_loader() {
    let Some((device, _queue)) = device_or_skip() else {
        return;
    };
    let layouts = common::layouts(&device);
    let mesh = uv_sphere(1.0, 64, 32).upload(&device, "sphere");
    assert_eq!(mesh.num_elements, 64 * 32 * 6 - 2 * 64 * 3);

    let mut loader = build_loader(&device, &layouts);
    loader.update_world_transform_all();
    let renders = loader.get_render();
    assert_eq!(renders.len(), 2);
    assert_eq!(renders[1].amount, 4);

    let mut queues = RenderQueues::default();
    Render::from(&loader as &dyn SceneNode).set_pipelines(&mut queues);
    assert_eq!(queues.opaque.len(), 1);
    assert_eq!(queues.transparent.len(), 1);
}

#[test]
fn should_create_neutral_texture() {
    let Some((device, queue)) = device_or_skip() else {
        return;
    };
    let texture = Texture::create_solid([128, 128, 255, 255], "flat", &device, &queue);
    assert_eq!(texture.texture.width(), 1);
    assert_eq!(TextureOptions::colour().format(), wgpu::TextureFormat::Rgba8UnormSrgb);
}

/// Number of meshes a flow draws this frame.
fn drawn_meshes(flow: &EarthFlow) -> usize {
    let mut queues = RenderQueues::default();
    flow.on_render().set_pipelines(&mut queues);
    queues.opaque.len() + queues.transparent.len()
}

fn solid_textures(device: &wgpu::Device, queue: &wgpu::Queue) -> EarthTextures {
    let solid = |rgba, label| Texture::create_solid(rgba, label, device, queue);
    EarthTextures {
        albedo: solid([40, 90, 160, 255], "albedo"),
        bump: solid([128, 128, 255, 255], "bump"),
        clouds: solid([255, 255, 255, 128], "clouds"),
        night_lights: solid([0, 0, 0, 255], "night lights"),
        land_ocean_mask: solid([255; 4], "mask"),
    }
}

#[test]
fn should_keep_loader_when_textures_fail() {
    let Some((device, queue)) = device_or_skip() else {
        return;
    };
    let layouts = common::layouts(&device);
    let init = InitContext {
        device: device.clone(),
        queue: queue.clone(),
        layouts: layouts.clone(),
    };
    let mut flow = EarthFlow::new(&init, FloatConfig::default(), 7);
    let mut state = SceneState::default();
    // Loader ring and dots
    assert_eq!(drawn_meshes(&flow), 2);

    flow.receive_textures(
        &device,
        &queue,
        &layouts,
        &mut state,
        Err(anyhow::anyhow!("could not read textures/earth albedo.jpg")),
    );
    assert_eq!(state.phase, ScenePhase::Failed);
    assert_eq!(drawn_meshes(&flow), 2);
}

#[test]
fn should_swap_in_earth_once_textures_arrive() {
    let Some((device, queue)) = device_or_skip() else {
        return;
    };
    let layouts = common::layouts(&device);
    let init = InitContext {
        device: device.clone(),
        queue: queue.clone(),
        layouts: layouts.clone(),
    };
    let mut flow = EarthFlow::new(&init, FloatConfig::default(), 7);
    let mut state = SceneState::default();

    let textures = solid_textures(&device, &queue);
    flow.receive_textures(&device, &queue, &layouts, &mut state, Ok(textures.clone()));
    assert_eq!(state.phase, ScenePhase::Ready);
    // Surface, clouds and atmosphere
    assert_eq!(drawn_meshes(&flow), 3);

    flow.receive_textures(&device, &queue, &layouts, &mut state, Ok(textures));
    assert_eq!(state.phase, ScenePhase::Ready);
    assert_eq!(drawn_meshes(&flow), 3);
}

#[test]
fn should_scale_textures_above_the_device_limit() {
    let Some((device, queue)) = device_or_skip() else {
        return;
    };
    let limit = device.limits().max_texture_dimension_2d;
    let img = image::DynamicImage::new_rgba8(limit * 2, limit);
    let texture =
        Texture::from_image(&device, &queue, &img, Some("wide"), TextureOptions::colour())
            .unwrap();
    assert_eq!(texture.texture.width(), limit);
    assert_eq!(texture.texture.height(), limit / 2);
    assert_eq!(
        texture.texture.mip_level_count(),
        earth_scene::data_structures::texture::mip_level_count(limit, limit / 2)
    );
}

#[test]
fn should_fail_loading_from_missing_root() {
    let Some((device, queue)) = device_or_skip() else {
        return;
    };
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let single = runtime.block_on(load_texture(
        "does-not-exist",
        "textures/earth albedo.jpg",
        TextureOptions::colour(),
        &device,
        &queue,
    ));
    assert!(single.is_err());
    let all = runtime.block_on(EarthTextures::load("does-not-exist", &device, &queue));
    assert!(all.is_err());
}
