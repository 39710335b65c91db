//! Text layout implementation.
//!
//! For an overview of the text layout hierarchy,
//! see https://raphlinus.github.io/text/2020/10/26/text-layout.html.
//!
//! The pipeline: paragraph analysis (UTF-16 mirror, bidi levels,
//! break segmentation) feeds the run builder, which shapes each
//! segment into positioned elements; the line composer wraps and
//! aligns them into a finished [`TextBlock`].

use std::ops::Range;

use glam::Vec2;
use smartstring::{LazyCompact, SmartString};
use swash::{text::Script, GlyphId};
use unicode_bidi::{BidiInfo, Level};

use crate::{
    font::{FontId, Fonts, ScaledMetrics},
    glyph::{CachedGlyph, GlyphCache},
    image::Images,
    rect::Rect,
    text::{CharacterStyle, Fill, InlineImage, ParagraphStyle, StyleFlags, TextSpan},
};

pub(crate) mod analyze;
pub(crate) mod compose;
pub(crate) mod shape;

use self::analyze::Utf16Mirror;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid style: {0}")]
    InvalidStyle(&'static str),
}

/// Direction of a visual run. Image runs are direction-neutral.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RunDirection {
    Ltr,
    Rtl,
    Neutral,
}

impl RunDirection {
    pub fn is_rtl(self) -> bool {
        self == RunDirection::Rtl
    }
}

/// Where an element came from in the input spans.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct SourceMapping {
    pub span_index: u32,
    /// Byte offset of the cluster within its span's text.
    pub byte_offset: u32,
    /// Byte length of the cluster.
    pub byte_len: u16,
}

/// A glyph with its final position within the block.
#[derive(Clone, Debug)]
pub struct PositionedGlyph {
    pub glyph_id: GlyphId,
    /// The font that actually renders this glyph; differs from the
    /// requested font after fallback substitution.
    pub font: FontId,
    /// Render size in pixels.
    pub size: f32,
    /// Pen position relative to the line origin; y is relative to the
    /// baseline, positive downwards.
    pub position: Vec2,
    /// Shaping offset from the pen position, y positive upwards as
    /// the shaper reports it.
    pub offset: Vec2,
    pub advance: Vec2,
    pub visual_left: f32,
    pub visual_right: f32,
    pub ascent: f32,
    pub descent: f32,
    /// Atlas lookup result at the design size.
    pub render: CachedGlyph,
    pub fill: Fill,
    pub flags: StyleFlags,
    pub style_index: u32,
    pub source: SourceMapping,
    pub direction: RunDirection,
}

/// An inline image with its final position within the block.
#[derive(Clone, Debug)]
pub struct PositionedImage {
    pub image: InlineImage,
    /// Top-left corner relative to the line origin; y is relative to
    /// the baseline, positive downwards.
    pub position: Vec2,
    pub size: Vec2,
    /// Pen advance, equal to the rendered width.
    pub advance: f32,
    pub ascent: f32,
    pub descent: f32,
    pub source: SourceMapping,
}

/// A positioned element: glyph or image.
#[derive(Clone, Debug)]
pub enum PositionedElement {
    Glyph(PositionedGlyph),
    Image(PositionedImage),
}

impl PositionedElement {
    pub fn position(&self) -> Vec2 {
        match self {
            PositionedElement::Glyph(g) => g.position,
            PositionedElement::Image(i) => i.position,
        }
    }

    pub fn advance(&self) -> f32 {
        match self {
            PositionedElement::Glyph(g) => g.advance.x,
            PositionedElement::Image(i) => i.advance,
        }
    }

    pub fn ascent(&self) -> f32 {
        match self {
            PositionedElement::Glyph(g) => g.ascent,
            PositionedElement::Image(i) => i.ascent,
        }
    }

    pub fn descent(&self) -> f32 {
        match self {
            PositionedElement::Glyph(g) => g.descent,
            PositionedElement::Image(i) => i.descent,
        }
    }

    pub fn source(&self) -> SourceMapping {
        match self {
            PositionedElement::Glyph(g) => g.source,
            PositionedElement::Image(i) => i.source,
        }
    }

    pub fn direction(&self) -> RunDirection {
        match self {
            PositionedElement::Glyph(g) => g.direction,
            PositionedElement::Image(_) => RunDirection::Neutral,
        }
    }

    pub(crate) fn translate_x(&mut self, dx: f32) {
        match self {
            PositionedElement::Glyph(g) => g.position.x += dx,
            PositionedElement::Image(i) => i.position.x += dx,
        }
    }
}

/// A maximal contiguous range of elements on a line sharing
/// direction, font, size, and script/language.
#[derive(Clone, Debug)]
pub struct VisualRun {
    /// Index of the run's first element within the line.
    pub first_element: usize,
    pub len: usize,
    pub direction: RunDirection,
    pub font: FontId,
    pub font_size: f32,
    pub script: Option<Script>,
    pub language: Option<SmartString<LazyCompact>>,
    /// Total pen advance of the run.
    pub advance: f32,
}

/// One laid-out line of a [`TextBlock`].
#[derive(Clone, Debug, Default)]
pub struct Line {
    /// Index of the line's first element in the block element list.
    pub first_element: usize,
    pub element_count: usize,
    /// Byte range into the concatenated source. A hard newline
    /// counts toward the line it ends.
    pub byte_range: Range<usize>,
    /// Content width before alignment, excluding the indent.
    pub width: f32,
    /// Top of the line box in block coordinates.
    pub box_y: f32,
    pub box_height: f32,
    /// Baseline position measured from the top of the line box.
    pub baseline: f32,
    pub max_ascent: f32,
    pub max_descent: f32,
    pub visual_runs: Vec<VisualRun>,
    /// Visual to logical map over the line's UTF-16 code units.
    pub visual_to_logical: Vec<u32>,
    /// Logical to visual map over the line's UTF-16 code units.
    pub logical_to_visual: Vec<u32>,
}

impl Line {
    pub fn element_range(&self) -> Range<usize> {
        self.first_element..self.first_element + self.element_count
    }

    /// Baseline y in block coordinates.
    pub fn baseline_y(&self) -> f32 {
        self.box_y + self.baseline
    }
}

/// A block of rich text, fully shaped, wrapped, and positioned.
/// Immutable once produced by [`Engine::layout`](crate::Engine::layout).
pub struct TextBlock {
    pub elements: Vec<PositionedElement>,
    pub lines: Vec<Line>,
    pub bounds: Rect,
    /// The concatenated UTF-8 source, with U+FFFC standing in for
    /// image spans.
    pub source: String,
    pub spans: Vec<TextSpan>,
    pub style: ParagraphStyle,

    pub(crate) span_offsets: Vec<u32>,
    pub(crate) mirror: Utf16Mirror,
    pub(crate) base_level: Level,
    pub(crate) default_metrics: ScaledMetrics,
}

impl TextBlock {
    /// Byte range of an element in the concatenated source.
    pub fn element_byte_range(&self, element: &PositionedElement) -> Range<usize> {
        let source = element.source();
        let start =
            self.span_offsets[source.span_index as usize] as usize + source.byte_offset as usize;
        start..start + source.byte_len as usize
    }

    /// The visual x where a line's content begins: first-line indent
    /// plus the alignment shift. Element positions already include it.
    pub fn line_origin_x(&self, line_index: usize) -> f32 {
        let line = &self.lines[line_index];
        let indent = if line_index == 0 {
            self.style.first_line_indent
        } else {
            0.
        };
        indent
            + compose::alignment_shift(
                self.style.alignment,
                self.style.wrap_width,
                indent + line.width,
            )
    }

    /// Style of the span an element came from; the paragraph default
    /// for out-of-range indices.
    pub fn element_style(&self, element: &PositionedElement) -> &CharacterStyle {
        self.spans
            .get(element.source().span_index as usize)
            .map(|s| &s.style)
            .unwrap_or(&self.style.default_style)
    }

    pub(crate) fn line_u16_range(&self, line: &Line) -> Range<usize> {
        self.mirror.u8_to_u16(line.byte_range.start)..self.mirror.u8_to_u16(line.byte_range.end)
    }
}

fn validate_fill(fill: &Fill) -> Result<(), LayoutError> {
    if let Fill::LinearGradient { stops, .. } = fill {
        let mut prev = 0.;
        for stop in stops.iter() {
            if !(0. ..=1.).contains(&stop.position) || stop.position < prev {
                return Err(LayoutError::InvalidStyle(
                    "gradient stops must be non-decreasing within [0, 1]",
                ));
            }
            prev = stop.position;
        }
    }
    Ok(())
}

fn validate(spans: &[TextSpan], style: &ParagraphStyle) -> Result<(), LayoutError> {
    if !(style.wrap_width >= 0. && style.wrap_width.is_finite()) {
        return Err(LayoutError::InvalidStyle(
            "wrap width must be finite and non-negative",
        ));
    }
    if !(style.line_height_value > 0.) {
        return Err(LayoutError::InvalidStyle("line height must be positive"));
    }
    if !(style.default_style.font_size > 0.) {
        return Err(LayoutError::InvalidStyle(
            "paragraph default font size must be positive",
        ));
    }
    validate_fill(&style.default_style.fill)?;
    for span in spans {
        if span.style.font_size < 0. {
            return Err(LayoutError::InvalidStyle("font size must not be negative"));
        }
        validate_fill(&span.style.fill)?;
        if let Some(image) = &span.style.image {
            if image.display_size.x < 0. || image.display_size.y < 0. {
                return Err(LayoutError::InvalidStyle(
                    "image display size must not be negative",
                ));
            }
        }
    }
    Ok(())
}

/// Lays out styled spans into a [`TextBlock`]. Invoked through the
/// engine, which provides the registry, cache, and image store.
pub(crate) fn layout(
    fonts: &Fonts,
    glyphs: &mut GlyphCache,
    images: &Images,
    spans: Vec<TextSpan>,
    style: ParagraphStyle,
) -> Result<TextBlock, LayoutError> {
    validate(&spans, &style)?;

    let mut para_font = style.default_style.font;
    if !fonts.is_valid(para_font) {
        para_font = fonts.default_font();
    }
    let para_size = if style.default_style.font_size > 0. {
        style.default_style.font_size
    } else {
        crate::text::DEFAULT_FONT_SIZE
    };
    let default_metrics = fonts.scaled_metrics(para_font, para_size);

    let (source, span_offsets) = analyze::concatenate(&spans);
    let mirror = Utf16Mirror::new(&source);

    let level_override = analyze::level_override(style.base_direction);
    let bidi = BidiInfo::new(&source, level_override);
    let base_level = analyze::base_level(&bidi, style.base_direction);

    let mut composer = compose::Composer::new(
        &style,
        &spans,
        default_metrics,
        para_font,
        para_size,
        base_level,
        &source,
    );

    for segment in analyze::segments(&source, style.line_break) {
        let shaped = shape::shape_segment(shape::SegmentInput {
            fonts,
            glyphs: &mut *glyphs,
            images,
            source: &source,
            bidi: &bidi,
            range: segment.shape_range(&source),
            spans: &spans,
            span_offsets: &span_offsets,
            style: &style,
            para_font,
            para_size,
        });
        composer.push_segment(&segment, shaped);
    }

    let (elements, lines, bounds) = composer.finish(source.len());

    Ok(TextBlock {
        elements,
        lines,
        bounds,
        source,
        spans,
        style,
        span_offsets,
        mirror,
        base_level,
        default_metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{GradientStop, HorizontalAlignment};
    use glam::vec2;
    use smallvec::smallvec;

    fn default_spans() -> Vec<TextSpan> {
        vec![TextSpan::new("abc", CharacterStyle::default())]
    }

    #[test]
    fn rejects_negative_wrap_width() {
        let style = ParagraphStyle {
            wrap_width: -1.,
            ..Default::default()
        };
        assert!(matches!(
            validate(&default_spans(), &style),
            Err(LayoutError::InvalidStyle(_))
        ));
    }

    #[test]
    fn rejects_non_monotonic_gradient() {
        let mut style = ParagraphStyle::default();
        style.default_style.fill = Fill::LinearGradient {
            start: vec2(0., 0.),
            end: vec2(0., 1.),
            stops: smallvec![
                GradientStop {
                    color: crate::text::default_color(),
                    position: 0.8,
                },
                GradientStop {
                    color: crate::text::default_color(),
                    position: 0.2,
                },
            ],
        };
        assert!(validate(&default_spans(), &style).is_err());
    }

    #[test]
    fn accepts_defaults() {
        let style = ParagraphStyle {
            alignment: HorizontalAlignment::Center,
            wrap_width: 120.,
            ..Default::default()
        };
        assert!(validate(&default_spans(), &style).is_ok());
    }
}
