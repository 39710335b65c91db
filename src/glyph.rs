//! Glyph cache: renders glyph bitmaps on demand at each face's design
//! size, packs them into atlas pages, and evicts by LRU.
//!
//! Cache entries are keyed by the font that actually renders the
//! glyph, so fallback substitution never aliases entries between
//! fonts. Eviction only removes the index entry; the abandoned atlas
//! rectangle is reclaimed when the cache is cleared.

use std::sync::Arc;

use glam::{uvec2, vec2, UVec2, Vec2};
use lru::LruCache;
use swash::{
    scale::{Render, ScaleContext, Source},
    zeno::Format,
    GlyphId,
};

use crate::{
    atlas::{AtlasError, AtlasPage, AtlasRect, AtlasSet},
    font::{FontId, Fonts},
    sdf,
};

pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// What the atlas pages hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AtlasKind {
    /// Signed distance fields rendered through the SDF shader.
    Sdf,
    /// Plain coverage masks drawn with the textured pipeline.
    Alpha,
}

impl Default for AtlasKind {
    fn default() -> Self {
        AtlasKind::Sdf
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GlyphKey {
    pub font: FontId,
    pub glyph: GlyphId,
    pub design_size: u16,
    pub sdf: bool,
}

/// A cached glyph. Metrics are at the design size; callers scale by
/// `render_size / design_size` for on-screen placement.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct CachedGlyph {
    pub page: u16,
    pub rect: AtlasRect,
    /// Pen position to bitmap top-left, y down.
    pub draw_offset: Vec2,
    pub advance: f32,
    /// Ink extent of the rasterized outline above the baseline. Layout
    /// metrics come from the face, not from these.
    pub ascent: f32,
    /// Ink extent below the baseline.
    pub descent: f32,
    pub is_sdf: bool,
    /// The design size the metrics refer to; zero for glyphs that
    /// could not be rendered at all.
    pub design_size: u16,
}

impl CachedGlyph {
    /// Scale factor from cached metrics to a render size.
    pub fn scale_for(&self, render_size: f32) -> f32 {
        if self.design_size > 0 {
            render_size / self.design_size as f32
        } else {
            1.
        }
    }

    /// Left side bearing at the design size. SDF bitmaps carry their
    /// distance padding in `draw_offset`, which is removed here.
    pub fn bearing_x(&self) -> f32 {
        if self.is_sdf && !self.rect.is_empty() {
            self.draw_offset.x + sdf::PADDING as f32
        } else {
            self.draw_offset.x
        }
    }

    /// Ink width at the design size, without SDF padding.
    pub fn ink_width(&self) -> f32 {
        if self.rect.is_empty() {
            0.
        } else if self.is_sdf {
            (self.rect.size.x as f32 - 2. * sdf::PADDING as f32).max(0.)
        } else {
            self.rect.size.x as f32
        }
    }
}

pub(crate) struct GlyphCache {
    cache: LruCache<GlyphKey, CachedGlyph>,
    atlas: AtlasSet,
    scale_context: ScaleContext,
    kind: AtlasKind,
}

impl GlyphCache {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        capacity: usize,
        page_size: UVec2,
        kind: AtlasKind,
    ) -> Self {
        Self {
            cache: LruCache::new(capacity.max(1)),
            atlas: AtlasSet::new(device, queue, page_size),
            scale_context: ScaleContext::new(),
            kind,
        }
    }

    pub fn kind(&self) -> AtlasKind {
        self.kind
    }

    pub fn page(&self, index: u16) -> Option<&AtlasPage> {
        self.atlas.page(index)
    }

    pub fn page_count(&self) -> usize {
        self.atlas.page_count()
    }

    /// Resolves a codepoint to a rendered glyph, substituting from the
    /// fallback chain when the requested font lacks it. Returns the
    /// cached glyph and the font that actually rendered it.
    pub fn resolve(
        &mut self,
        fonts: &Fonts,
        requested: FontId,
        codepoint: char,
    ) -> (CachedGlyph, FontId) {
        let (font, glyph_id) = fonts.select_for_codepoint(requested, codepoint);
        (self.glyph(fonts, font, glyph_id), font)
    }

    /// Looks up or renders a glyph by id within a specific font.
    pub fn glyph(&mut self, fonts: &Fonts, font: FontId, glyph_id: GlyphId) -> CachedGlyph {
        let font_data = match fonts.get(font) {
            Some(f) => f,
            None => return CachedGlyph::default(),
        };
        let design_size = font_data.sdf_design_size();
        let key = GlyphKey {
            font,
            glyph: glyph_id,
            design_size,
            sdf: self.kind == AtlasKind::Sdf,
        };
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let cached = self.rasterize(fonts, key);
        self.cache.put(key, cached);
        cached
    }

    fn rasterize(&mut self, fonts: &Fonts, key: GlyphKey) -> CachedGlyph {
        let font = match fonts.get(key.font) {
            Some(f) => f,
            None => return CachedGlyph::default(),
        };
        let font_ref = font.as_ref();
        let design = key.design_size as f32;

        let advance = font_ref
            .glyph_metrics(&[])
            .scale(design)
            .advance_width(key.glyph);

        let mut scaler = self
            .scale_context
            .builder(font_ref)
            .size(design)
            .hint(false)
            .build();
        let image = Render::new(&[Source::Outline])
            .format(Format::Alpha)
            .render(&mut scaler, key.glyph);

        let mut cached = CachedGlyph {
            advance,
            is_sdf: key.sdf,
            design_size: key.design_size,
            ..Default::default()
        };

        let image = match image {
            Some(image) => image,
            None => return cached,
        };
        let width = image.placement.width;
        let height = image.placement.height;
        cached.ascent = image.placement.top as f32;
        cached.descent = height as f32 - image.placement.top as f32;
        if width == 0 || height == 0 {
            // Whitespace and other blank glyphs carry metrics only.
            return cached;
        }

        let (bitmap, bitmap_size, draw_offset) = if key.sdf {
            let (field, w, h) = sdf::distance_field(&image.data, width, height);
            (
                field,
                uvec2(w, h),
                vec2(
                    (image.placement.left - sdf::PADDING as i32) as f32,
                    -(image.placement.top + sdf::PADDING as i32) as f32,
                ),
            )
        } else {
            (
                image.data,
                uvec2(width, height),
                vec2(image.placement.left as f32, -image.placement.top as f32),
            )
        };

        match self.atlas.insert(&bitmap, bitmap_size) {
            Ok((page, rect)) => {
                cached.page = page;
                cached.rect = rect;
                cached.draw_offset = draw_offset;
            }
            Err(AtlasError::GlyphTooLarge { width, height }) => {
                // The pen still advances by the metric advance.
                log::warn!(
                    "glyph {} of {:?} ({}x{}) exceeds atlas page size; dropping bitmap",
                    key.glyph,
                    key.font,
                    width,
                    height
                );
            }
        }
        cached
    }

    /// Removes every cache entry rendered from `font`. Called on font
    /// unload; the orphaned atlas rectangles persist until `clear`.
    pub fn evict_font(&mut self, font: FontId) {
        let keys: Vec<GlyphKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.font == font)
            .map(|(key, _)| *key)
            .collect();
        for key in keys {
            self.cache.pop(&key);
        }
    }

    /// Drops every entry and every atlas page.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.atlas.clear();
    }

    /// Applies new cache options, clearing implicitly when any
    /// parameter changed.
    pub fn reconfigure(&mut self, capacity: usize, page_size: UVec2, kind: AtlasKind) {
        let capacity = capacity.max(1);
        let changed = capacity != self.cache.cap()
            || page_size != self.atlas.page_size()
            || kind != self.kind;
        if !changed {
            return;
        }
        self.cache.clear();
        self.cache.resize(capacity);
        self.atlas.reconfigure(page_size);
        self.kind = kind;
    }
}
