//! Shelf-packed grayscale atlas pages for cached glyph bitmaps.
//!
//! Pages are fixed-size `R8Unorm` textures created lazily. Insertion
//! places bitmaps left to right along the current shelf, opens a new
//! shelf when the row is full, and a new page when the page is full.
//! Only the affected rectangle is uploaded to the GPU.

use std::{num::NonZeroU32, sync::Arc};

use glam::{uvec2, UVec2};

/// Spacing between packed rectangles so bilinear sampling does not
/// bleed across neighbors.
const PACK_PADDING: u32 = 1;

pub const DEFAULT_PAGE_SIZE: u32 = 1024;

#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    #[error("glyph bitmap of {width}x{height} exceeds atlas page size")]
    GlyphTooLarge { width: u32, height: u32 },
}

/// A placed rectangle within an atlas page. An empty rect means the
/// glyph has no bitmap (whitespace, or a bitmap that could not be
/// packed).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct AtlasRect {
    pub pos: UVec2,
    pub size: UVec2,
}

impl AtlasRect {
    pub fn is_empty(&self) -> bool {
        self.size.x == 0 || self.size.y == 0
    }
}

/// Shelf placement state for one page. Pure geometry, no GPU.
pub(crate) struct ShelfPacker {
    page_size: UVec2,
    pen: UVec2,
    row_height: u32,
}

impl ShelfPacker {
    pub fn new(page_size: UVec2) -> Self {
        Self {
            page_size,
            pen: UVec2::ZERO,
            row_height: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pen = UVec2::ZERO;
        self.row_height = 0;
    }

    /// Places a rectangle on the current page, advancing to the next
    /// shelf if the row is full. Returns `None` when the page cannot
    /// hold it; the caller then opens a fresh page.
    pub fn place(&mut self, size: UVec2) -> Option<UVec2> {
        if size.x > self.page_size.x || size.y > self.page_size.y {
            return None;
        }
        if self.pen.x + size.x > self.page_size.x {
            self.pen.x = 0;
            self.pen.y += self.row_height;
            self.row_height = 0;
        }
        if self.pen.y + size.y > self.page_size.y {
            return None;
        }
        let pos = self.pen;
        self.pen.x += size.x + PACK_PADDING;
        self.row_height = self.row_height.max(size.y + PACK_PADDING);
        Some(pos)
    }
}

pub(crate) struct AtlasPage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl AtlasPage {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// The set of atlas pages backing the glyph cache.
pub(crate) struct AtlasSet {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    page_size: UVec2,
    pages: Vec<AtlasPage>,
    packer: ShelfPacker,
}

impl AtlasSet {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, page_size: UVec2) -> Self {
        Self {
            device,
            queue,
            page_size,
            pages: Vec::new(),
            packer: ShelfPacker::new(page_size),
        }
    }

    pub fn page_size(&self) -> UVec2 {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: u16) -> Option<&AtlasPage> {
        self.pages.get(index as usize)
    }

    /// Packs a grayscale bitmap, creating a new page if the current
    /// one is full, and uploads the affected rectangle.
    pub fn insert(
        &mut self,
        data: &[u8],
        size: UVec2,
    ) -> Result<(u16, AtlasRect), AtlasError> {
        if size.x > self.page_size.x || size.y > self.page_size.y {
            return Err(AtlasError::GlyphTooLarge {
                width: size.x,
                height: size.y,
            });
        }

        if self.pages.is_empty() {
            self.open_page();
        }
        let pos = match self.packer.place(size) {
            Some(pos) => pos,
            None => {
                self.open_page();
                self.packer
                    .place(size)
                    .expect("fresh page must fit a bitmap within page bounds")
            }
        };

        let page_index = (self.pages.len() - 1) as u16;
        self.upload(page_index, pos, data, size);
        Ok((page_index, AtlasRect { pos, size }))
    }

    /// Drops every page and resets the packer.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.packer.reset();
    }

    pub fn reconfigure(&mut self, page_size: UVec2) {
        self.page_size = page_size;
        self.pages.clear();
        self.packer = ShelfPacker::new(page_size);
    }

    fn open_page(&mut self) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph_atlas_page"),
            size: wgpu::Extent3d {
                width: self.page_size.x,
                height: self.page_size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
        });
        let view = texture.create_view(&Default::default());
        log::debug!("opened glyph atlas page {}", self.pages.len());
        self.pages.push(AtlasPage { texture, view });
        self.packer.reset();
    }

    fn upload(&self, page: u16, pos: UVec2, data: &[u8], size: UVec2) {
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.pages[page as usize].texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: pos.x,
                    y: pos.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(NonZeroU32::new(size.x).expect("bitmap width is zero")),
                rows_per_image: Some(NonZeroU32::new(size.y).expect("bitmap height is zero")),
            },
            wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
        );
    }
}

pub(crate) fn default_page_size() -> UVec2 {
    uvec2(DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_along_a_shelf() {
        let mut packer = ShelfPacker::new(uvec2(64, 64));
        let a = packer.place(uvec2(10, 12)).unwrap();
        let b = packer.place(uvec2(10, 8)).unwrap();
        assert_eq!(a, uvec2(0, 0));
        assert_eq!(b, uvec2(10 + PACK_PADDING, 0));
    }

    #[test]
    fn opens_a_new_row_when_the_shelf_fills() {
        let mut packer = ShelfPacker::new(uvec2(32, 64));
        packer.place(uvec2(20, 10)).unwrap();
        let next = packer.place(uvec2(20, 10)).unwrap();
        assert_eq!(next, uvec2(0, 10 + PACK_PADDING));
    }

    #[test]
    fn rejects_when_the_page_is_full() {
        let mut packer = ShelfPacker::new(uvec2(16, 16));
        assert!(packer.place(uvec2(16, 16)).is_some());
        assert!(packer.place(uvec2(1, 1)).is_none());
    }

    #[test]
    fn rejects_oversized_rects() {
        let mut packer = ShelfPacker::new(uvec2(16, 16));
        assert!(packer.place(uvec2(17, 4)).is_none());
        assert!(packer.place(uvec2(4, 17)).is_none());
    }

    #[test]
    fn rows_track_the_tallest_member() {
        let mut packer = ShelfPacker::new(uvec2(32, 64));
        packer.place(uvec2(10, 4)).unwrap();
        packer.place(uvec2(10, 20)).unwrap();
        packer.place(uvec2(20, 4)).unwrap(); // wraps to next shelf
        let below = packer.place(uvec2(4, 4)).unwrap();
        assert_eq!(below.y, 20 + PACK_PADDING);
    }
}
