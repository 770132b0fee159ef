//! earth-scene
//!
//! A rotating, textured Earth with a cloud layer, a thin atmosphere, lights
//! that follow the camera and a twinkling starfield. Runs natively and in the
//! browser (WebGL2) on top of wgpu and winit. While the textures load a small
//! wireframe loader is shown in place of the Earth.
//!
//! High-level modules
//! - `camera`: perspective camera, orbit controls and the camera uniform
//! - `config`: every tunable of the scene, with the shipped values as `Default`
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, materials, instances, textures and the scene graph
//! - `flow`: the flow trait, the event loop and the frame order
//! - `pipelines`: the standard, unlit and star pipelines and their shaders
//! - `resources`: asset IO, texture decoding and procedural meshes
//! - `render`: render composition and queue batching
//! - `scene`: the Earth scene itself and [`launch`]
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::SceneConfig;
pub use scene::launch;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Render the default scene into the page's `<canvas id="canvas">`.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    launch(SceneConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
