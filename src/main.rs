use std::path::Path;

use earth_scene::{SceneConfig, launch};

fn main() -> anyhow::Result<()> {
    let mut config = SceneConfig::default();
    // Fall back to the copy build.rs placed next to the build output
    if !Path::new(&config.render.asset_root).is_dir() {
        config.render.asset_root = concat!(env!("OUT_DIR"), "/assets").to_string();
    }
    launch(config)
}
