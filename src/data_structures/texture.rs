//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU GPU texture resources,
//! and helpers for render targets (depth and multisampled colour), neutral 1x1
//! placeholder maps, and textures decoded from image files.

use anyhow::*;
use image::{GenericImageView, ImageFormat, imageops::FilterType, load_from_memory_with_format};

/// How a decoded image is turned into a GPU texture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureOptions {
    /// Colour data authored in sRGB (albedo, emissive). Data maps such as
    /// normals, masks or cloud alpha stay linear.
    pub srgb: bool,
}

impl TextureOptions {
    pub const fn colour() -> Self {
        Self { srgb: true }
    }

    pub const fn data() -> Self {
        Self { srgb: false }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        if self.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}

/// Number of mip levels down to 1x1 for a `width` x `height` image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Shrink `img` so neither side exceeds `max_dimension`, keeping the aspect
/// ratio. Images that already fit are returned unchanged.
pub fn fit_to_limit(img: image::RgbaImage, max_dimension: u32) -> image::RgbaImage {
    let (width, height) = img.dimensions();
    let longest = width.max(height);
    if longest <= max_dimension {
        return img;
    }
    let scale = max_dimension as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_dimension);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_dimension);
    image::imageops::resize(&img, new_width, new_height, FilterType::Triangle)
}

/// `base` followed by every smaller mip level, each half the size of the
/// previous one and at least one pixel wide.
pub fn mip_chain(base: image::RgbaImage) -> Vec<image::RgbaImage> {
    let (width, height) = base.dimensions();
    let levels = mip_level_count(width, height);
    let mut chain = Vec::with_capacity(levels as usize);
    chain.push(base);
    for level in 1..levels {
        let previous = &chain[level as usize - 1];
        let next = image::imageops::resize(
            previous,
            (width >> level).max(1),
            (height >> level).max(1),
            FilterType::Triangle,
        );
        chain.push(next);
    }
    chain
}

/// A GPU texture with its default view.
///
/// Textures are used for colour maps, normal maps, masks and render targets.
/// Typically created via [`from_bytes`](Self::from_bytes) or one of the
/// render-target constructors. Samplers are created separately with
/// [`create_sampler`] and shared between materials.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// `sample_count` has to match the colour target of the pass the depth
    /// texture is attached to.
    pub fn create_depth_texture(
        device: &wgpu::Device,
        size: [u32; 2],
        sample_count: u32,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view }
    }

    /// Create the multisampled colour target resolved into the surface texture.
    pub fn create_msaa_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa colour target"),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Create a 1x1 texture filled with one RGBA value.
    ///
    /// Used for maps a material does not have: a flat normal
    /// (`[127, 127, 255, 255]`), no emission (black) or full roughness (white)
    /// keep the shader free of branches.
    pub fn create_solid(
        rgba: [u8; 4],
        label: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Texture {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Texture { texture, view }
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG)
    /// * `label` is used as a debug name for the GPU resource
    /// * `format` is an optional file extension hint (e.g. "png"). If None, auto-detect.
    /// * `options` selects the colour space
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        options: TextureOptions,
    ) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Self::from_image(device, queue, &img, Some(label), options)
    }

    /// Upload `img` with a full mip chain.
    ///
    /// Images larger than the device's 2D texture limit are scaled down to
    /// fit, so a WebGL2 device with a 2048 limit still gets a usable texture.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        options: TextureOptions,
    ) -> Result<Self> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            bail!("image {:?} has no pixels", label);
        }
        let max_dimension = device.limits().max_texture_dimension_2d;
        let rgba = fit_to_limit(img.to_rgba8(), max_dimension);
        if rgba.dimensions() != (width, height) {
            log::warn!(
                "Texture {:?} is {width}x{height}, scaled to {}x{} for the limit {max_dimension}",
                label,
                rgba.width(),
                rgba.height()
            );
        }
        let (width, height) = rgba.dimensions();

        let levels = mip_chain(rgba);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: options.format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in levels.iter().enumerate() {
            let (level_width, level_height) = level.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                },
                level,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level_width),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self { texture, view })
    }
}

pub fn create_sampler(device: &wgpu::Device, address_mode: wgpu::AddressMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_colour_maps_in_srgb() {
        assert_eq!(TextureOptions::colour().format(), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(TextureOptions::data().format(), wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn should_count_mips_down_to_one_pixel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 1), 2);
        assert_eq!(mip_level_count(4096, 2048), 13);
        assert_eq!(mip_level_count(1000, 3), 10);
    }

    #[test]
    fn should_halve_every_mip_level() {
        let chain = mip_chain(image::RgbaImage::new(8, 2));
        let sizes: Vec<_> = chain.iter().map(|level| level.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn should_shrink_oversized_images_to_the_limit() {
        let fitted = fit_to_limit(image::RgbaImage::new(4096, 2048), 2048);
        assert_eq!(fitted.dimensions(), (2048, 1024));
        let untouched = fit_to_limit(image::RgbaImage::new(512, 256), 2048);
        assert_eq!(untouched.dimensions(), (512, 256));
    }
}
