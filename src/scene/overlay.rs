//! Page shell around the canvas: title, heading, credit and the loading
//! caption.
//!
//! On the web the text is laid over the canvas as absolutely positioned
//! elements. Natively there is no DOM, so the window title carries the page
//! title and the caption.

use instant::Duration;

use crate::{
    config::OverlayConfig,
    context::Context,
    flow::{GraphicsFlow, Out},
    render::Render,
    scene::{SceneEvent, SceneState},
};

/// Window title for the current phase. The caption is appended while the
/// loader is up.
pub fn window_title(config: &OverlayConfig, loading: bool) -> String {
    if loading {
        format!("{} ({})", config.page_title, config.loading_caption)
    } else {
        config.page_title.clone()
    }
}

#[cfg(target_arch = "wasm32")]
mod dom {
    use wasm_bindgen::prelude::*;

    const TEXT_STYLE: &str = "position:absolute;margin:0;color:white;\
        font-family:sans-serif;pointer-events:none;user-select:none;";

    pub struct Page {
        document: web_sys::Document,
        caption: Option<web_sys::Element>,
    }

    impl Page {
        pub fn new() -> Result<Self, JsValue> {
            let document = web_sys::window()
                .and_then(|window| window.document())
                .ok_or_else(|| JsValue::from_str("no document"))?;
            Ok(Self {
                document,
                caption: None,
            })
        }

        pub fn set_title(&self, title: &str) {
            self.document.set_title(title);
        }

        pub fn add_text(
            &self,
            tag: &str,
            text: &str,
            placement: &str,
        ) -> Result<web_sys::Element, JsValue> {
            let element = self.document.create_element(tag)?;
            element.set_text_content(Some(text));
            element.set_attribute("style", &format!("{TEXT_STYLE}{placement}"))?;
            let body = self
                .document
                .body()
                .ok_or_else(|| JsValue::from_str("no body"))?;
            body.append_child(&element)?;
            Ok(element)
        }

        pub fn show_caption(&mut self, text: &str) -> Result<(), JsValue> {
            let caption = self.add_text(
                "p",
                text,
                "top:50%;left:50%;transform:translate(-50%,4rem);font-size:0.9rem;opacity:0.8;",
            )?;
            self.caption = Some(caption);
            Ok(())
        }

        pub fn remove_caption(&mut self) {
            if let Some(caption) = self.caption.take() {
                caption.remove();
            }
        }
    }
}

pub struct OverlayFlow {
    config: OverlayConfig,
    loading: bool,
    #[cfg(target_arch = "wasm32")]
    page: Option<dom::Page>,
}

impl OverlayFlow {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            loading: true,
            #[cfg(target_arch = "wasm32")]
            page: None,
        }
    }

    /// Whether the loading caption is currently shown.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[cfg(target_arch = "wasm32")]
    fn show(&mut self, _ctx: &Context) {
        let build = || -> Result<dom::Page, wasm_bindgen::JsValue> {
            let mut page = dom::Page::new()?;
            page.set_title(&self.config.page_title);
            page.add_text("h1", &self.config.heading, "top:1.5rem;left:2rem;font-size:2rem;")?;
            page.add_text("p", &self.config.credit, "bottom:1rem;right:2rem;font-size:0.9rem;")?;
            page.show_caption(&self.config.loading_caption)?;
            Ok(page)
        };
        match build() {
            Ok(page) => self.page = Some(page),
            Err(e) => log::warn!("Could not build the page overlay: {e:?}"),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn show(&mut self, ctx: &Context) {
        log::info!("{}", self.config.heading);
        ctx.set_title(&window_title(&self.config, true));
    }

    #[cfg(target_arch = "wasm32")]
    fn hide_caption(&mut self, _ctx: &Context) {
        if let Some(page) = self.page.as_mut() {
            page.remove_caption();
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn hide_caption(&mut self, ctx: &Context) {
        ctx.set_title(&window_title(&self.config, false));
    }
}

impl GraphicsFlow<SceneState, SceneEvent> for OverlayFlow {
    fn on_init(&mut self, ctx: &mut Context, _state: &mut SceneState) -> Out<SceneEvent> {
        self.show(ctx);
        Out::Empty
    }

    fn on_update(
        &mut self,
        ctx: &Context,
        state: &mut SceneState,
        _dt: Duration,
    ) -> Out<SceneEvent> {
        // A failed load keeps the caption, like the loader
        if self.loading && state.phase.is_ready() {
            self.loading = false;
            self.hide_caption(ctx);
        }
        Out::Empty
    }

    fn on_custom_events(
        &mut self,
        _ctx: &Context,
        _state: &mut SceneState,
        event: SceneEvent,
    ) -> Option<SceneEvent> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        Render::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_append_caption_while_loading() {
        let config = OverlayConfig::default();
        assert_eq!(
            window_title(&config, true),
            format!("{} ({})", config.page_title, config.loading_caption)
        );
        assert_eq!(window_title(&config, false), config.page_title);
    }

    #[test]
    fn should_start_with_caption() {
        assert!(OverlayFlow::new(OverlayConfig::default()).is_loading());
    }
}
