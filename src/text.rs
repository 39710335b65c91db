//! Rich text model: styled spans, character styles, effects,
//! and paragraph settings.

use palette::Srgba;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smartstring::{LazyCompact, SmartString};
use swash::text::Script;

use crate::{font::FontId, image::ImageId};

pub mod cursor;
pub mod layout;

pub const DEFAULT_FONT_SIZE: f32 = 16.;

/// The object replacement character substituted for image spans
/// in the concatenated source text.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

pub fn default_color() -> Srgba<u8> {
    Srgba::new(0, 0, 0, u8::MAX)
}

/// Basic style bits. Bold and italic are rendered synthetically
/// by the SDF shader (edge shift) and the quad emitter (shear),
/// not by selecting a different face.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
}

/// A color stop on a linear gradient. `position` is normalized
/// to `[0, 1]` along the gradient axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GradientStop {
    pub color: Srgba<u8>,
    pub position: f32,
}

/// How glyph interiors are painted.
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Srgba<u8>),
    /// Linear gradient across each glyph quad. Start and end are in
    /// normalized quad coordinates, so `(0,0)..(0,1)` runs top to bottom.
    LinearGradient {
        start: glam::Vec2,
        end: glam::Vec2,
        stops: SmallVec<[GradientStop; 2]>,
    },
}

impl Default for Fill {
    fn default() -> Self {
        Fill::Solid(default_color())
    }
}

impl Fill {
    /// Evaluates the fill at a normalized quad position.
    pub fn color_at(&self, pos: glam::Vec2) -> Srgba<u8> {
        match self {
            Fill::Solid(c) => *c,
            Fill::LinearGradient { start, end, stops } => {
                if stops.is_empty() {
                    return default_color();
                }
                let axis = *end - *start;
                let len2 = axis.length_squared();
                let t = if len2 <= f32::EPSILON {
                    0.
                } else {
                    ((pos - *start).dot(axis) / len2).clamp(0., 1.)
                };
                let mut prev = &stops[0];
                if t <= prev.position {
                    return prev.color;
                }
                for stop in &stops[1..] {
                    if t <= stop.position {
                        let span = stop.position - prev.position;
                        let f = if span <= f32::EPSILON {
                            1.
                        } else {
                            (t - prev.position) / span
                        };
                        return lerp_color(prev.color, stop.color, f);
                    }
                    prev = stop;
                }
                prev.color
            }
        }
    }
}

fn lerp_color(a: Srgba<u8>, b: Srgba<u8>, f: f32) -> Srgba<u8> {
    let l = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * f).round() as u8;
    Srgba::new(
        l(a.red, b.red),
        l(a.green, b.green),
        l(a.blue, b.blue),
        l(a.alpha, b.alpha),
    )
}

/// SDF outline ring drawn outside the fill edge.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OutlineEffect {
    pub enabled: bool,
    pub color: Srgba<u8>,
    /// Width in SDF distance units.
    pub width: f32,
}

impl Default for OutlineEffect {
    fn default() -> Self {
        Self {
            enabled: false,
            color: default_color(),
            width: 0.05,
        }
    }
}

/// Radial falloff outside the effective edge.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlowEffect {
    pub enabled: bool,
    pub color: Srgba<u8>,
    pub range: f32,
    pub intensity: f32,
}

impl Default for GlowEffect {
    fn default() -> Self {
        Self {
            enabled: false,
            color: default_color(),
            range: 0.15,
            intensity: 0.7,
        }
    }
}

/// Drop shadow sampled at a texel offset.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadowEffect {
    pub enabled: bool,
    pub color: Srgba<u8>,
    /// Offset in destination pixels.
    pub offset: glam::Vec2,
    /// Softness of the shadow edge in SDF distance units.
    pub spread: f32,
}

impl Default for ShadowEffect {
    fn default() -> Self {
        Self {
            enabled: false,
            color: default_color(),
            offset: glam::vec2(2., 2.),
            spread: 0.1,
        }
    }
}

/// Shadow-like multiply or solid overlay just inside the edge.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InnerEffect {
    pub enabled: bool,
    pub color: Srgba<u8>,
    pub range: f32,
    pub is_shadow: bool,
}

impl Default for InnerEffect {
    fn default() -> Self {
        Self {
            enabled: false,
            color: default_color(),
            range: 0.05,
            is_shadow: true,
        }
    }
}

/// Vertical alignment modes for inline images.
///
/// `LineTop` and `LineBottom` are resolved only once the line box
/// height is known; the other modes are resolved against the text
/// metrics of the surrounding run at shaping time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageVAlign {
    Baseline,
    MiddleOfText,
    TextTop,
    TextBottom,
    LineTop,
    LineBottom,
}

impl Default for ImageVAlign {
    fn default() -> Self {
        ImageVAlign::Baseline
    }
}

/// An inline image embedded in text flow.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InlineImage {
    pub image: ImageId,
    /// Display size in pixels. A zero component falls back to the
    /// image's pixel size, or to the run font size if the image is
    /// unavailable.
    pub display_size: glam::Vec2,
    pub valign: ImageVAlign,
}

/// Style applied to a contiguous run of characters (or an image span).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CharacterStyle {
    /// The font to shape and render with. An invalid id resolves to
    /// the paragraph default, then the registry default.
    pub font: FontId,
    /// Font size in pixels. Zero or negative resolves to the
    /// paragraph default size.
    pub font_size: f32,
    pub flags: StyleFlags,
    pub fill: Fill,
    pub outline: OutlineEffect,
    pub glow: GlowEffect,
    pub shadow: ShadowEffect,
    pub inner: InnerEffect,
    /// Script override for the shaper; guessed from content when `None`.
    pub script: Option<Script>,
    /// BCP-47 language tag for the shaper, e.g. `"ar"`.
    pub language: Option<SmartString<LazyCompact>>,
    /// When set, the span is an inline image rather than text.
    pub image: Option<InlineImage>,
}

impl CharacterStyle {
    pub fn is_image(&self) -> bool {
        self.image.is_some()
    }
}

/// A contiguous run of UTF-8 text sharing one style.
///
/// Image spans carry no text; the engine substitutes U+FFFC in the
/// concatenated source so byte offsets stay continuous.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSpan {
    pub text: SmartString<LazyCompact>,
    pub style: CharacterStyle,
}

impl TextSpan {
    pub fn new(text: impl Into<SmartString<LazyCompact>>, style: CharacterStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn image(image: InlineImage, style: CharacterStyle) -> Self {
        Self {
            text: SmartString::new(),
            style: CharacterStyle {
                image: Some(image),
                ..style
            },
        }
    }

    /// The text this span contributes to the concatenated source.
    pub(crate) fn effective_text(&self) -> &str {
        if self.style.is_image() && self.text.is_empty() {
            "\u{FFFC}"
        } else {
            &self.text
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
    /// Treated as `Left` until word-spacing redistribution lands.
    Justify,
}

impl Default for HorizontalAlignment {
    fn default() -> Self {
        HorizontalAlignment::Left
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseDirection {
    AutoDetect,
    Ltr,
    Rtl,
}

impl Default for BaseDirection {
    fn default() -> Self {
        BaseDirection::AutoDetect
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineBreakStrategy {
    /// Break wherever width runs out, at grapheme granularity.
    SimpleByWidth,
    /// Break at UAX #14 line break opportunities.
    WordBoundaries,
    /// Break at grapheme cluster boundaries.
    GraphemeBoundaries,
}

impl Default for LineBreakStrategy {
    fn default() -> Self {
        LineBreakStrategy::WordBoundaries
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineHeightType {
    /// `recommended line height * value` of the paragraph default font.
    ScaledFontMetrics,
    /// `paragraph font size * value`.
    FactorOfFontSize,
    /// `value`, in pixels.
    AbsolutePoints,
    /// `(max ascent + max descent) * value` of the line content.
    ContentScaled,
}

impl Default for LineHeightType {
    fn default() -> Self {
        LineHeightType::ScaledFontMetrics
    }
}

/// Paragraph-level layout settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphStyle {
    pub alignment: HorizontalAlignment,
    pub base_direction: BaseDirection,
    pub line_break: LineBreakStrategy,
    pub line_height_type: LineHeightType,
    pub line_height_value: f32,
    pub first_line_indent: f32,
    /// Wrap width in pixels; `0` disables wrapping.
    pub wrap_width: f32,
    /// Tab advance as a multiple of the space advance.
    pub tab_width_factor: f32,
    /// Style used for empty lines and as the fallback for spans with
    /// unresolved fonts or sizes.
    pub default_style: CharacterStyle,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        Self {
            alignment: HorizontalAlignment::Left,
            base_direction: BaseDirection::AutoDetect,
            line_break: LineBreakStrategy::WordBoundaries,
            line_height_type: LineHeightType::ScaledFontMetrics,
            line_height_value: 1.2,
            first_line_indent: 0.,
            wrap_width: 0.,
            tab_width_factor: 4.0,
            default_style: CharacterStyle {
                font_size: DEFAULT_FONT_SIZE,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec2;
    use smallvec::smallvec;

    #[test]
    fn solid_fill_is_uniform() {
        let fill = Fill::Solid(Srgba::new(10, 20, 30, 255));
        assert_eq!(fill.color_at(vec2(0., 0.)), fill.color_at(vec2(1., 1.)));
    }

    #[test]
    fn gradient_endpoints_and_midpoint() {
        let fill = Fill::LinearGradient {
            start: vec2(0., 0.),
            end: vec2(0., 1.),
            stops: smallvec![
                GradientStop {
                    color: Srgba::new(0, 0, 0, 255),
                    position: 0.,
                },
                GradientStop {
                    color: Srgba::new(200, 100, 50, 255),
                    position: 1.,
                },
            ],
        };
        assert_eq!(fill.color_at(vec2(0., 0.)), Srgba::new(0, 0, 0, 255));
        assert_eq!(fill.color_at(vec2(0.5, 1.)), Srgba::new(200, 100, 50, 255));
        assert_eq!(fill.color_at(vec2(0., 0.5)), Srgba::new(100, 50, 25, 255));
    }

    #[test]
    fn image_span_substitutes_replacement_char() {
        let span = TextSpan {
            text: SmartString::new(),
            style: CharacterStyle {
                image: Some(InlineImage {
                    image: ImageId::default(),
                    display_size: vec2(30., 30.),
                    valign: ImageVAlign::MiddleOfText,
                }),
                ..Default::default()
            },
        };
        assert_eq!(span.effective_text(), "\u{FFFC}");
        assert_eq!(span.effective_text().len(), 3);
    }
}
