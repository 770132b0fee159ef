//! The Earth scene.
//!
//! Four flows make up the scene, registered in this order:
//!
//! - [`lighting::LightingFlow`] keeps the lights on the camera axis
//! - [`stars::StarsFlow`] draws the two star layers
//! - [`EarthFlow`] shows the loader, loads the textures and swaps in the Earth
//! - [`overlay::OverlayFlow`] maintains the title and caption
//!
//! The flows share a [`SceneState`] that records whether the Earth is up.

use instant::Duration;

use crate::{
    config::{FloatConfig, SceneConfig},
    context::{Context, ContextConfig, InitContext},
    data_structures::scene_graph::{ContainerNode, SceneNode},
    flow::{self, FlowConstructor, GraphicsFlow, Out},
    pipelines::Layouts,
    render::Render,
};

pub mod earth;
pub mod float;
pub mod lighting;
pub mod loader;
pub mod overlay;
pub mod stars;

use earth::{EarthSpin, EarthTextures};
use float::FloatMotion;

/// Name of the group the float motion is applied to.
pub const FLOAT_GROUP: &str = "float";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScenePhase {
    #[default]
    Loading,
    Ready,
    /// Loading failed. The loader stays up.
    Failed,
}

impl ScenePhase {
    pub fn is_ready(&self) -> bool {
        *self == Self::Ready
    }

    pub fn shows_loader(&self) -> bool {
        !self.is_ready()
    }
}

#[derive(Debug, Default)]
pub struct SceneState {
    pub phase: ScenePhase,
}

impl SceneState {
    /// Move from `Loading` to `Ready`. Returns whether the phase changed; a
    /// scene never goes back to the loader once the Earth is shown.
    pub fn mark_ready(&mut self) -> bool {
        if self.phase == ScenePhase::Loading {
            self.phase = ScenePhase::Ready;
            true
        } else {
            false
        }
    }

    pub fn mark_failed(&mut self) -> bool {
        if self.phase == ScenePhase::Loading {
            self.phase = ScenePhase::Failed;
            true
        } else {
            false
        }
    }
}

pub enum SceneEvent {
    TexturesLoaded(anyhow::Result<EarthTextures>),
}

/// Loader while the textures load, the floating Earth afterwards.
pub struct EarthFlow {
    float: FloatMotion,
    spin: EarthSpin,
    loader: ContainerNode,
    /// The float group holding the Earth group. Set once on swap.
    earth: Option<ContainerNode>,
}

impl EarthFlow {
    pub fn new(ctx: &InitContext, float: FloatConfig, seed: u64) -> Self {
        Self {
            float: FloatMotion::seeded(float, seed),
            spin: EarthSpin::default(),
            loader: loader::build_loader(&ctx.device, &ctx.layouts),
            earth: None,
        }
    }

    /// Handle the outcome of the texture load. The first successful result
    /// replaces the loader with the Earth; a failure keeps the loader up.
    pub fn receive_textures(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &Layouts,
        state: &mut SceneState,
        textures: anyhow::Result<EarthTextures>,
    ) {
        match textures {
            Ok(textures) => {
                if state.mark_ready() {
                    let earth = earth::build_earth(device, queue, layouts, &textures);
                    self.earth = Some(ContainerNode::with_children(
                        FLOAT_GROUP,
                        vec![Box::new(earth)],
                    ));
                    log::info!("Earth textures loaded, replacing the loader");
                }
            }
            Err(e) => {
                log::error!("Could not load the Earth textures: {e:#}");
                state.mark_failed();
            }
        }
    }
}

impl GraphicsFlow<SceneState, SceneEvent> for EarthFlow {
    fn on_init(&mut self, ctx: &mut Context, _state: &mut SceneState) -> Out<SceneEvent> {
        let device = ctx.device.clone();
        let queue = ctx.queue.clone();
        let asset_root = ctx.render_config.asset_root.clone();
        Out::FutEvent(vec![Box::pin(async move {
            SceneEvent::TexturesLoaded(EarthTextures::load(&asset_root, &device, &queue).await)
        })])
    }

    fn on_update(
        &mut self,
        ctx: &Context,
        _state: &mut SceneState,
        dt: Duration,
    ) -> Out<SceneEvent> {
        let elapsed = ctx.clock.elapsed_secs();
        let root = match self.earth.as_mut() {
            Some(root) => {
                root.transform.0 = self.float.pose(elapsed).to_instance();
                self.spin.advance(dt.as_secs_f32());
                if let Some(earth) = root.find_mut(earth::EARTH_GROUP) {
                    self.spin.apply(earth);
                }
                root
            }
            None => {
                loader::apply_spin(&mut self.loader, elapsed);
                &mut self.loader
            }
        };
        root.update_world_transform_all();
        root.write_to_buffers(&ctx.queue, &ctx.device);
        Out::Empty
    }

    fn on_custom_events(
        &mut self,
        ctx: &Context,
        state: &mut SceneState,
        event: SceneEvent,
    ) -> Option<SceneEvent> {
        match event {
            SceneEvent::TexturesLoaded(textures) => {
                self.receive_textures(&ctx.device, &ctx.queue, &ctx.layouts, state, textures);
            }
        }
        None
    }

    fn on_render(&self) -> Render<'_> {
        match &self.earth {
            Some(root) => Render::from(root as &dyn SceneNode),
            None => Render::from(&self.loader as &dyn SceneNode),
        }
    }
}

/// Flow constructors for `config`, in registration order.
pub fn flows(config: &SceneConfig) -> Vec<FlowConstructor<SceneState, SceneEvent>> {
    let lighting: FlowConstructor<SceneState, SceneEvent> = Box::new(|_ctx| {
        Box::pin(async move {
            Box::new(lighting::LightingFlow::new(lighting::LightingRig::default()))
                as Box<dyn GraphicsFlow<_, _>>
        })
    });
    let star_layers = config.stars.clone();
    let seed = config.seed;
    let stars: FlowConstructor<SceneState, SceneEvent> = Box::new(move |ctx| {
        Box::pin(async move {
            Box::new(stars::StarsFlow::new(&ctx, &star_layers, seed))
                as Box<dyn GraphicsFlow<_, _>>
        })
    });
    let float = config.float.clone();
    let earth: FlowConstructor<SceneState, SceneEvent> = Box::new(move |ctx| {
        Box::pin(async move {
            Box::new(EarthFlow::new(&ctx, float, seed)) as Box<dyn GraphicsFlow<_, _>>
        })
    });
    let overlay_config = config.overlay.clone();
    let overlay: FlowConstructor<SceneState, SceneEvent> = Box::new(move |_ctx| {
        Box::pin(async move {
            Box::new(overlay::OverlayFlow::new(overlay_config)) as Box<dyn GraphicsFlow<_, _>>
        })
    });
    vec![lighting, stars, earth, overlay]
}

/// Open a window and show the Earth scene until it is closed.
pub fn launch(config: SceneConfig) -> anyhow::Result<()> {
    let constructors = flows(&config);
    flow::run(ContextConfig::from(&config), constructors)
}
