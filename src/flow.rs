//! Flow control and application event loop.
//!
//! A "flow" is one self-contained part of the scene: it owns GPU resources,
//! reacts to events, updates itself every frame and says what it wants drawn.
//! The engine drives every registered flow in registration order and composes
//! their renders.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for scene parts that update and render
//! - [`Out<E>`] is the output type for async event handling and context configuration
//!
//! # Frame order
//!
//! Each redraw runs the same fixed sequence:
//! 1. Tick the clock
//! 2. Apply orbit controls and upload the camera uniform
//! 3. Call `on_update` on all flows (lighting, stars, float, Earth or loader)
//! 4. Collect `on_render` of all flows into queues
//! 5. Draw stars, opaque meshes and transparent meshes, resolve and present

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::Duration;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    context::{Context, ContextConfig, InitContext},
    data_structures::model::DrawModel,
    pipelines::stars::QUAD_VERTICES,
    render::{Render, RenderQueues},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

///
/// This is the Output Type for every lifecycle hook where the user can pass async events that are
/// handled according to the platform you're running on.
///
/// `Out::FutEvent` can be used to resolve a future of an Event that is put in the Event Queue after
/// being resolved. The caller is responsible for handling the event later on and it will have no
/// side effects unless handled.
///
/// `Out::Configure` can be used to modify the Context during runtime, for instance to upload new
/// light values or change the clear colour.
///
/// `Empty` is the default output used when no eventing/futures need to be handled.
///
pub enum Out<E> {
    FutEvent(Vec<EventFuture<E>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

/// A future resolving to a custom event. Natively it runs on the tokio
/// runtime, so it has to be `Send`.
#[cfg(not(target_arch = "wasm32"))]
pub type EventFuture<E> = Pin<Box<dyn Future<Output = E> + Send>>;

#[cfg(target_arch = "wasm32")]
pub type EventFuture<E> = Pin<Box<dyn Future<Output = E>>>;

impl<E> Default for Out<E> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing one part of the scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after all flows are constructed
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame, after the camera was updated
/// 4. `on_custom_events()` is called for events resolved from `Out::FutEvent`
/// 5. `on_render()` is called each frame and specifies how to render `self`
///
pub trait GraphicsFlow<S, E> {
    /// Initialize the flow. This is the place to start asynchronous loading.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<E>;

    /// Update state every frame.
    ///
    /// `dt` is the time since the previous frame, `ctx.clock` holds the
    /// elapsed time since start.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<E>;

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(
        &mut self,
        _ctx: &Context,
        _state: &mut S,
        _event: &WindowEvent,
    ) -> Out<E> {
        Out::Empty
    }

    /// Handle custom application events.
    ///
    /// Returns the event if it was not consumed, allowing it to be passed to
    /// the next flow. Returning `None` means the event was consumed.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// Return renderable objects for this flow.
    ///
    /// Called each frame. Collect your objects into a [`Render`]; the engine
    /// batches the renders of all flows by pipeline.
    fn on_render(&self) -> Render<'_>;
}

// Dummy impl to make wasm work
impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`. This allows lazy initialization and resource loading.
pub type FlowConstructor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>, config: &ContextConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            state: State::default(),
            // Context::new configures the surface
            is_surface_configured: true,
        })
    }
}

impl<State> AppState<State> {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(winit::dpi::PhysicalSize::new(width, height));
            self.is_surface_configured = true;
        }
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            // With multisampling the pass draws into the MSAA target and
            // resolves into the surface texture
            let (target, resolve_target, store) = match &self.ctx.msaa_target {
                Some(msaa) => (&msaa.view, Some(&view), wgpu::StoreOp::Discard),
                None => (&view, None, wgpu::StoreOp::Store),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            let mut queues = RenderQueues::default();
            graphics_flows
                .iter()
                .for_each(|flow| flow.on_render().set_pipelines(&mut queues));
            let RenderQueues {
                stars,
                opaque,
                transparent,
            } = queues;

            if !stars.is_empty() {
                render_pass.set_pipeline(&self.ctx.pipelines.stars);
                render_pass.set_bind_group(1, &self.ctx.camera.bind_group, &[]);
                for sprites in stars {
                    if sprites.amount == 0 {
                        continue;
                    }
                    render_pass.set_bind_group(0, sprites.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, sprites.vertices.slice(..));
                    render_pass.draw(0..QUAD_VERTICES, 0..sprites.amount);
                }
            }

            for instanced in opaque.into_iter().chain(transparent) {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!(
                        "you attempted to render {} with zero instances",
                        instanced.mesh.name
                    );
                    continue;
                }
                render_pass.set_pipeline(self.ctx.pipelines.get(instanced.material.pipeline));
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_mesh_instanced(
                    instanced.mesh,
                    instanced.material,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App<State: 'static, Event: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    // Resolved flow futures, drained at the start of every frame
    #[cfg(not(target_arch = "wasm32"))]
    event_tx: tokio::sync::mpsc::UnboundedSender<Event>,
    #[cfg(not(target_arch = "wasm32"))]
    event_rx: tokio::sync::mpsc::UnboundedReceiver<Event>,
    #[cfg(target_arch = "wasm32")]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<State, Event>>,
    config: ContextConfig,
    state: Option<AppState<State>>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // This holds the constructors at the start.
    // We use Option to `take()` it after use.
    constructors: Option<Vec<FlowConstructor<State, Event>>>,
}

impl<State, Event> App<State, Event>
where
    State: 'static,
    Event: Send + 'static,
{
    fn new(
        #[allow(unused_variables)] event_loop: &EventLoop<FlowEvent<State, Event>>,
        config: ContextConfig,
        constructors: Vec<FlowConstructor<State, Event>>,
    ) -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        #[cfg(not(target_arch = "wasm32"))]
        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            #[cfg(not(target_arch = "wasm32"))]
            event_tx,
            #[cfg(not(target_arch = "wasm32"))]
            event_rx,
            #[cfg(target_arch = "wasm32")]
            proxy: event_loop.create_proxy(),
            config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
        })
    }

    /// Call `on_init` on every flow and handle what they return.
    fn init_flows(&mut self) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        self.graphics_flows.iter_mut().for_each(|flow| {
            let events = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                #[cfg(not(target_arch = "wasm32"))]
                &self.event_tx,
                #[cfg(target_arch = "wasm32")]
                self.proxy.clone(),
                &mut app_state.ctx,
                events,
            );
        });
        app_state.ctx.window.request_redraw();
    }

    fn redraw(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        #[cfg(not(target_arch = "wasm32"))]
        while let Ok(event) = self.event_rx.try_recv() {
            dispatch_custom(&mut self.graphics_flows, state, event);
        }

        let dt = state.ctx.clock.tick();
        state.ctx.update_camera(dt);

        self.graphics_flows.iter_mut().for_each(|f| {
            let events = f.on_update(&state.ctx, &mut state.state, dt);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                #[cfg(not(target_arch = "wasm32"))]
                &self.event_tx,
                #[cfg(target_arch = "wasm32")]
                self.proxy.clone(),
                &mut state.ctx,
                events,
            );
        });

        match state.render(&self.graphics_flows) {
            Ok(_) => (),
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
            }
            Err(e) => {
                log::error!("Unable to render {}", e);
            }
        }
    }
}

/// Messages from `spawn_local` tasks back to the event loop. Natively the
/// app is initialized in place and custom events go through a channel.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) enum FlowEvent<State: 'static, Event: 'static> {
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    },
    Custom(Event),
}

impl<State, Event> Debug for FlowEvent<State, Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Custom(_) => f.write_str("Custom(E)"),
        }
    }
}

impl<State: 'static + Default, Event: Send + 'static> ApplicationHandler<FlowEvent<State, Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes();

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let config = self.config.clone();
        let init_future = async move {
            let app_state = AppState::new(window, &config).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // Device and queue are reference counted, so into() only clones handles
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => {
                    self.state = Some(app_state);
                    self.graphics_flows = flows;
                    self.init_flows();
                }
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok((state, flows)) => {
                        if proxy
                            .send_event(FlowEvent::Initialized { state, flows })
                            .is_err()
                        {
                            log::error!("Event loop closed before the app was initialized");
                        }
                    }
                    Err(e) => {
                        log::error!("App initialization failed: {e:#}");
                    }
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        match event {
            FlowEvent::Initialized { state, flows } => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(state);
                self.graphics_flows = flows;

                // Important: Trigger a resize now that we are initialized
                if let Some(app_state) = self.state.as_mut() {
                    let size = app_state.ctx.window.inner_size();
                    app_state.resize(size.width, size.height);
                }
                self.init_flows();
            }
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    dispatch_custom(&mut self.graphics_flows, state, custom_event);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        state.ctx.camera.controller.handle_window_events(&event);

        self.graphics_flows.iter_mut().for_each(|f| {
            let events = f.on_window_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                #[cfg(not(target_arch = "wasm32"))]
                &self.event_tx,
                #[cfg(target_arch = "wasm32")]
                self.proxy.clone(),
                &mut state.ctx,
                events,
            );
        });

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

/// Offer `event` to every flow in order until one consumes it.
fn dispatch_custom<State, Event>(
    flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
    app_state: &mut AppState<State>,
    event: Event,
) {
    let result = flows.iter_mut().fold(Some(event), |event, flow| {
        flow.on_custom_events(&app_state.ctx, &mut app_state.state, event?)
    });
    if result.is_some() {
        log::warn!("Warning! Custom event was not consumed this cycle");
    }
}

fn handle_flow_output<#[cfg(target_arch = "wasm32")] State, Event: Send + 'static>(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    #[cfg(not(target_arch = "wasm32"))] events: &tokio::sync::mpsc::UnboundedSender<Event>,
    #[cfg(target_arch = "wasm32")] proxy: winit::event_loop::EventLoopProxy<
        FlowEvent<State, Event>,
    >,
    ctx: &mut Context,
    out: Out<Event>,
) {
    match out {
        // Resolve each future in the background; the frame loop picks the
        // events up once they are ready
        Out::FutEvent(futures) => {
            for fut in futures {
                #[cfg(not(target_arch = "wasm32"))]
                {
                    let events = events.clone();
                    async_runtime.spawn(async move {
                        if events.send(fut.await).is_err() {
                            log::error!("App was closed before a flow event resolved");
                        }
                    });
                }

                #[cfg(target_arch = "wasm32")]
                {
                    let proxy = proxy.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        if proxy.send_event(FlowEvent::Custom(fut.await)).is_err() {
                            log::error!("Event loop was closed before a flow event resolved");
                        }
                    });
                }
            }
        }
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

/// Create the window and GPU context, then drive `constructors` until the
/// window closes.
pub fn run<State: 'static + Default, Event: Send + 'static>(
    config: ContextConfig,
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent<State, Event>> = EventLoop::with_user_event().build()?;

    let mut app: App<State, Event> = App::new(&event_loop, config, constructors)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
