//! Textures for inline images embedded in text flow.
//!
//! Each image owns its own RGBA texture; inline images are rare and
//! large compared to glyphs, so they skip the atlas entirely.

use std::{num::NonZeroU32, sync::Arc};

use glam::{uvec2, UVec2};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to an image registered with the engine.
    pub struct ImageId;
}

pub(crate) struct ImageTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: UVec2,
}

impl ImageTexture {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }
}

#[derive(Default)]
pub(crate) struct Images {
    images: SlotMap<ImageId, ImageTexture>,
}

impl Images {
    /// Uploads RGBA pixel data as a new image texture.
    pub fn add(
        &mut self,
        device: &Arc<wgpu::Device>,
        queue: &Arc<wgpu::Queue>,
        data: &[u8],
        size: UVec2,
    ) -> ImageId {
        assert_eq!(
            data.len(),
            (size.x * size.y * 4) as usize,
            "image data must be RGBA with {}x{} pixels",
            size.x,
            size.y
        );
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("inline_image"),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(NonZeroU32::new(size.x * 4).expect("image width is zero")),
                rows_per_image: Some(NonZeroU32::new(size.y).expect("image height is zero")),
            },
            wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&Default::default());
        self.images.insert(ImageTexture {
            texture,
            view,
            size,
        })
    }

    pub fn remove(&mut self, id: ImageId) {
        self.images.remove(id);
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageTexture> {
        self.images.get(id)
    }

    /// Pixel size of an image, or zero when the handle is stale.
    pub fn size(&self, id: ImageId) -> UVec2 {
        self.images.get(id).map(|i| i.size()).unwrap_or(uvec2(0, 0))
    }
}
