/**
 * This module contains all logic for loading textures from external files and
 * for generating the procedural meshes the scene is made of.
 */
pub mod mesh;
pub mod texture;

use anyhow::Context as _;

#[cfg(target_arch = "wasm32")]
fn format_url(asset_root: &str, file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no window in this context")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("could not read the page origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{}/{}/", origin, asset_root.trim_matches('/')))?;
    Ok(base.join(file_name)?)
}

/// Read an asset relative to `asset_root`.
///
/// On the web the asset is fetched from `<origin>/<asset_root>/<file_name>`,
/// natively it is read from the `asset_root` directory.
pub async fn load_binary(asset_root: &str, file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(asset_root, file_name)?;
        let response = reqwest::get(url.clone())
            .await?
            .error_for_status()
            .with_context(|| format!("could not fetch {url}"))?;
        response.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new(asset_root).join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_name_missing_file_in_error() {
        let err = load_binary("does-not-exist", "textures/earth albedo.jpg")
            .await
            .unwrap_err();
        assert!(format!("{err}").contains("earth albedo.jpg"));
    }

    #[tokio::test]
    async fn should_read_relative_to_asset_root() {
        let data = load_binary(env!("CARGO_MANIFEST_DIR"), "Cargo.toml")
            .await
            .unwrap();
        assert!(!data.is_empty());
    }
}
