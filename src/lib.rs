//! A rich text layout and rendering engine for `wgpu`.
//!
//! Styled spans go through paragraph analysis, bidi reordering,
//! complex-script shaping, and line composition to produce an
//! immutable [`TextBlock`] with per-glyph coordinates, caret
//! mapping, and selection geometry. Rendering draws through a
//! signed-distance-field glyph atlas with per-run effects (outline,
//! glow, drop shadow, inner effect, synthetic bold and italic).
//!
//! ```no_run
//! # fn demo(device: std::sync::Arc<wgpu::Device>, queue: std::sync::Arc<wgpu::Queue>) {
//! use limn::{Engine, ParagraphStyle, TextSpan, CharacterStyle};
//!
//! let engine = Engine::new(device, queue);
//! let font = engine.load_font_file("fonts/NotoSans-Regular.ttf", 0).unwrap();
//! let style = CharacterStyle { font, font_size: 18., ..Default::default() };
//! let block = engine
//!     .layout(vec![TextSpan::new("hello world", style)], ParagraphStyle::default())
//!     .unwrap();
//! let caret = block.cursor_info_from_byte_offset(5, true);
//! # let _ = caret;
//! # }
//! ```

mod atlas;
mod context;
pub mod font;
mod glyph;
mod image;
mod rect;
mod renderer;
mod sdf;
mod text;

pub use atlas::{AtlasError, AtlasRect, DEFAULT_PAGE_SIZE};
pub use context::{Engine, EngineBuilder, SMOOTHNESS_ADJUSTMENT_RANGE};
pub use font::{FontError, FontId, FontProperties, ScaledMetrics, DEFAULT_SDF_DESIGN_SIZE};
pub use glyph::{AtlasKind, CachedGlyph, DEFAULT_CACHE_CAPACITY};
pub use image::ImageId;
pub use rect::Rect;
pub use renderer::{Frame, PreparedFrame, TARGET_FORMAT};
pub use text::{
    cursor::{CursorInfo, HitTest},
    default_color,
    layout::{
        LayoutError, Line, PositionedElement, PositionedGlyph, PositionedImage, RunDirection,
        SourceMapping, TextBlock, VisualRun,
    },
    BaseDirection, CharacterStyle, Fill, GlowEffect, GradientStop, HorizontalAlignment,
    ImageVAlign, InlineImage, InnerEffect, LineBreakStrategy, LineHeightType, OutlineEffect,
    ParagraphStyle, ShadowEffect, StyleFlags, TextSpan, DEFAULT_FONT_SIZE, OBJECT_REPLACEMENT,
};

pub use glam;
pub use palette::Srgba;
pub use swash;
