//! The engine handle: owns fonts, the glyph cache, inline images,
//! and the render pipelines.

use std::sync::Arc;

use glam::{Affine2, UVec2, Vec2};
use palette::Srgba;
use parking_lot::{Mutex, RwLock};

use crate::{
    font::{FontError, FontId, FontProperties, Fonts, ScaledMetrics},
    glyph::{AtlasKind, GlyphCache, DEFAULT_CACHE_CAPACITY},
    image::{ImageId, Images},
    rect::Rect,
    renderer::{Frame, PreparedFrame, Renderer},
    text::{layout, layout::LayoutError, layout::TextBlock, ParagraphStyle, TextSpan},
};

/// Range of the process-wide SDF smoothness adjustment.
pub const SMOOTHNESS_ADJUSTMENT_RANGE: (f32, f32) = (-0.04, 0.2);

/// Builder for an [`Engine`].
pub struct EngineBuilder {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    cache_capacity: usize,
    atlas_page_size: UVec2,
    atlas_kind: AtlasKind,
}

impl EngineBuilder {
    /// Maximum number of cached glyphs before LRU eviction. Eviction
    /// does not reclaim atlas space, so size this to the working set.
    pub fn glyph_cache_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0);
        self.cache_capacity = capacity;
        self
    }

    pub fn atlas_page_size(mut self, size: UVec2) -> Self {
        assert!(size.x > 0 && size.y > 0);
        self.atlas_page_size = size;
        self
    }

    /// Whether atlas pages hold distance fields or coverage masks.
    pub fn atlas_kind(mut self, kind: AtlasKind) -> Self {
        self.atlas_kind = kind;
        self
    }

    pub fn build(self) -> Engine {
        let renderer = Renderer::new(&self.device, &self.queue);
        Engine(Arc::new(Inner {
            glyphs: Mutex::new(GlyphCache::new(
                Arc::clone(&self.device),
                Arc::clone(&self.queue),
                self.cache_capacity,
                self.atlas_page_size,
                self.atlas_kind,
            )),
            fonts: RwLock::new(Fonts::default()),
            images: RwLock::new(Images::default()),
            renderer,
            smoothness_adjustment: Mutex::new(0.),
            atlas_page_size: Mutex::new(self.atlas_page_size),
            device: self.device,
            queue: self.queue,
        }))
    }
}

/// The text engine. Cheap to clone; clones share all state.
///
/// Layout and drawing are cooperatively single-threaded: the engine
/// serializes access internally, but callers should drive layout and
/// rendering from the thread that owns the GPU context.
#[derive(Clone)]
pub struct Engine(Arc<Inner>);

struct Inner {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,

    fonts: RwLock<Fonts>,
    glyphs: Mutex<GlyphCache>,
    images: RwLock<Images>,
    renderer: Renderer,
    smoothness_adjustment: Mutex<f32>,
    atlas_page_size: Mutex<UVec2>,
}

impl Engine {
    pub fn builder(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> EngineBuilder {
        EngineBuilder {
            device,
            queue,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            atlas_page_size: crate::atlas::default_page_size(),
            atlas_kind: AtlasKind::Sdf,
        }
    }

    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Engine {
        Self::builder(device, queue).build()
    }

    // --- Fonts ---

    /// Loads a face from raw TTF/OTF bytes. The first loaded font
    /// becomes the default.
    pub fn load_font(&self, data: Vec<u8>, face_index: usize) -> Result<FontId, FontError> {
        self.0.fonts.write().load(data, face_index)
    }

    /// Loads a face from a font file on disk.
    pub fn load_font_file(
        &self,
        path: impl AsRef<std::path::Path>,
        face_index: usize,
    ) -> Result<FontId, FontError> {
        let data = std::fs::read(path)?;
        self.load_font(data, face_index)
    }

    /// Unloads a font, evicting its glyph cache entries and removing
    /// it from every fallback chain. Blocks laid out with the font
    /// must not be rendered afterwards.
    pub fn unload_font(&self, id: FontId) {
        self.0.fonts.write().unload(id);
        self.0.glyphs.lock().evict_font(id);
    }

    pub fn is_font_valid(&self, id: FontId) -> bool {
        self.0.fonts.read().is_valid(id)
    }

    pub fn default_font(&self) -> FontId {
        self.0.fonts.read().default_font()
    }

    pub fn set_default_font(&self, id: FontId) {
        self.0.fonts.write().set_default(id);
    }

    /// Sets the fallback chain consulted when `primary` lacks a
    /// codepoint. Invalid entries are skipped with a warning.
    pub fn set_fallback_chain(&self, primary: FontId, chain: &[FontId]) {
        self.0.fonts.write().set_fallback_chain(primary, chain);
    }

    pub fn is_codepoint_available(
        &self,
        font: FontId,
        codepoint: char,
        check_fallback: bool,
    ) -> bool {
        self.0
            .fonts
            .read()
            .is_codepoint_available(font, codepoint, check_fallback)
    }

    pub fn font_properties(&self, id: FontId) -> FontProperties {
        self.0.fonts.read().properties(id)
    }

    /// Metrics of a font scaled to a pixel size; synthetic metrics
    /// for invalid ids.
    pub fn scaled_metrics(&self, id: FontId, size: f32) -> ScaledMetrics {
        self.0.fonts.read().scaled_metrics(id, size)
    }

    // --- Images ---

    /// Registers RGBA pixel data for use as an inline image.
    pub fn add_image(&self, data: &[u8], size: UVec2) -> ImageId {
        self.0
            .images
            .write()
            .add(&self.0.device, &self.0.queue, data, size)
    }

    pub fn remove_image(&self, id: ImageId) {
        self.0.images.write().remove(id);
    }

    // --- Layout ---

    /// Shapes and lays out styled spans into an immutable
    /// [`TextBlock`]. Rejects invalid styles without partial output.
    pub fn layout(
        &self,
        spans: Vec<TextSpan>,
        style: ParagraphStyle,
    ) -> Result<TextBlock, LayoutError> {
        let fonts = self.0.fonts.read();
        let mut glyphs = self.0.glyphs.lock();
        let images = self.0.images.read();
        layout::layout(&fonts, &mut glyphs, &images, spans, style)
    }

    // --- Glyph cache ---

    /// Drops every cached glyph and atlas page. Outstanding blocks
    /// must be laid out again before rendering.
    pub fn clear_glyph_cache(&self) {
        self.0.glyphs.lock().clear();
    }

    /// Reconfigures the glyph cache, clearing it when any parameter
    /// changed.
    pub fn set_atlas_options(&self, capacity: usize, page_size: UVec2, kind: AtlasKind) {
        self.0.glyphs.lock().reconfigure(capacity, page_size, kind);
        *self.0.atlas_page_size.lock() = page_size;
    }

    pub fn atlas_page_count(&self) -> usize {
        self.0.glyphs.lock().page_count()
    }

    pub fn atlas_kind(&self) -> AtlasKind {
        self.0.glyphs.lock().kind()
    }

    /// Runs `f` with an atlas page's texture view, for debug
    /// overlays.
    pub fn with_atlas_page<R>(
        &self,
        index: u16,
        f: impl FnOnce(Option<&wgpu::TextureView>) -> R,
    ) -> R {
        let glyphs = self.0.glyphs.lock();
        f(glyphs.page(index).map(|p| p.view()))
    }

    // --- Rendering ---

    /// Sets the process-wide smoothness adjustment added to every
    /// batch's SDF smoothness, clamped to
    /// [`SMOOTHNESS_ADJUSTMENT_RANGE`].
    pub fn set_smoothness_adjustment(&self, value: f32) {
        let (lo, hi) = SMOOTHNESS_ADJUSTMENT_RANGE;
        *self.0.smoothness_adjustment.lock() = value.clamp(lo, hi);
    }

    pub fn smoothness_adjustment(&self) -> f32 {
        *self.0.smoothness_adjustment.lock()
    }

    pub fn create_frame(&self) -> Frame {
        Frame::new()
    }

    /// Batches a text block into the frame. Elements are visited in
    /// visual order; glyphs sharing a render state coalesce into one
    /// draw call. `clip` is in block-local (pre-transform)
    /// coordinates.
    pub fn draw_text_block(
        &self,
        frame: &mut Frame,
        block: &TextBlock,
        transform: Affine2,
        tint: Srgba<u8>,
        clip: Option<Rect>,
    ) {
        let page_size = *self.0.atlas_page_size.lock();
        let adjustment = self.smoothness_adjustment();
        frame.draw_block(
            block,
            transform,
            tint,
            clip,
            Vec2::new(page_size.x as f32, page_size.y as f32),
            adjustment,
        );
    }

    /// Batches selection rectangles for a byte range of the block.
    pub fn draw_selection_highlight(
        &self,
        frame: &mut Frame,
        block: &TextBlock,
        range: std::ops::Range<usize>,
        color: Srgba<u8>,
        transform: Affine2,
    ) {
        let rects = block.bounds_of_byte_range(range);
        frame.draw_solid_rects(&rects, color, transform);
    }

    /// Uploads a frame's geometry. `target_size` is the logical size
    /// of the render target.
    pub fn prepare_frame(&self, frame: Frame, target_size: Vec2) -> PreparedFrame {
        let glyphs = self.0.glyphs.lock();
        let images = self.0.images.read();
        frame.prepare(
            &self.0.device,
            &self.0.renderer,
            &glyphs,
            &images,
            target_size,
        )
    }

    /// Replays a prepared frame into a render pass targeting a
    /// [`TARGET_FORMAT`](crate::TARGET_FORMAT) attachment.
    pub fn render_frame<'a>(
        &'a self,
        prepared: &'a PreparedFrame,
        pass: &mut wgpu::RenderPass<'a>,
    ) {
        prepared.render(&self.0.renderer, pass);
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.0.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.0.queue
    }
}
