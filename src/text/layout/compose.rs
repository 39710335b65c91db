//! Line composition: wrapping, line-box metrics, alignment, and
//! per-line bidi maps.
//!
//! The composer keeps a pending line of shaped segments. A segment
//! that would push past the wrap width finalizes the pending line
//! first; a hard newline finalizes after appending, with the newline
//! byte counting toward the ending line.

use glam::vec2;
use unicode_bidi::Level;

use crate::{
    font::{FontId, ScaledMetrics},
    rect::Rect,
    text::{
        layout::{
            analyze::{self, Segment},
            shape::ShapedSegment,
            Line, PositionedElement, RunDirection, VisualRun,
        },
        HorizontalAlignment, ImageVAlign, LineHeightType, ParagraphStyle, TextSpan,
    },
};

/// Horizontal shift applied to a finalized line's elements.
/// `content_width` includes the first-line indent. Justify is
/// currently treated as left alignment.
pub(crate) fn alignment_shift(
    alignment: HorizontalAlignment,
    wrap_width: f32,
    content_width: f32,
) -> f32 {
    let effective = if wrap_width > 0. {
        wrap_width
    } else {
        content_width
    };
    match alignment {
        HorizontalAlignment::Left | HorizontalAlignment::Justify => 0.,
        HorizontalAlignment::Right => (effective - content_width).max(0.),
        HorizontalAlignment::Center => ((effective - content_width) / 2.).max(0.),
    }
}

/// The height of a line box under the paragraph's line-height rule,
/// clamped to never clip content.
pub(crate) fn line_box_height(
    style: &ParagraphStyle,
    default_metrics: &ScaledMetrics,
    max_ascent: f32,
    max_descent: f32,
    para_font_size: f32,
) -> f32 {
    let mut content = max_ascent + max_descent;
    if content < 0.001 {
        let default = default_metrics.ascent + default_metrics.descent;
        content = if default > 0.001 {
            default
        } else {
            para_font_size.max(16.) * 1.2
        };
    }
    let computed = match style.line_height_type {
        LineHeightType::ScaledFontMetrics => {
            default_metrics.recommended_line_height * style.line_height_value
        }
        LineHeightType::FactorOfFontSize => para_font_size * style.line_height_value,
        LineHeightType::AbsolutePoints => style.line_height_value,
        LineHeightType::ContentScaled => content * style.line_height_value,
    };
    computed.max(content)
}

pub(crate) struct Composer<'a> {
    style: &'a ParagraphStyle,
    spans: &'a [TextSpan],
    default_metrics: ScaledMetrics,
    para_font: FontId,
    para_size: f32,
    base_level: Level,
    source: &'a str,

    elements: Vec<PositionedElement>,
    lines: Vec<Line>,

    pending: Vec<PositionedElement>,
    pending_width: f32,
    pending_ascent: f32,
    pending_descent: f32,
    line_byte_start: usize,

    cursor_y: f32,
    first_line: bool,
    max_extent: f32,
}

impl<'a> Composer<'a> {
    pub fn new(
        style: &'a ParagraphStyle,
        spans: &'a [TextSpan],
        default_metrics: ScaledMetrics,
        para_font: FontId,
        para_size: f32,
        base_level: Level,
        source: &'a str,
    ) -> Self {
        Self {
            style,
            spans,
            default_metrics,
            para_font,
            para_size,
            base_level,
            source,
            elements: Vec::new(),
            lines: Vec::new(),
            pending: Vec::new(),
            pending_width: 0.,
            pending_ascent: 0.,
            pending_descent: 0.,
            line_byte_start: 0,
            cursor_y: 0.,
            first_line: true,
            max_extent: 0.,
        }
    }

    pub fn push_segment(&mut self, segment: &Segment, shaped: ShapedSegment) {
        let indent = if self.first_line {
            self.style.first_line_indent
        } else {
            0.
        };
        if self.style.wrap_width > 0.
            && !self.pending.is_empty()
            && shaped.width > 0.001
            && indent + self.pending_width + shaped.width > self.style.wrap_width
        {
            self.finalize_line(segment.range.start);
        }

        if !shaped.elements.is_empty() {
            let shift = self.pending_width;
            for mut element in shaped.elements {
                element.translate_x(shift);
                self.pending.push(element);
            }
            self.pending_width += shaped.width;
            self.pending_ascent = self.pending_ascent.max(shaped.max_ascent);
            self.pending_descent = self.pending_descent.max(shaped.max_descent);
        }

        if segment.hard_break {
            self.finalize_line(segment.range.end);
        }
    }

    pub fn finish(
        mut self,
        source_len: usize,
    ) -> (Vec<PositionedElement>, Vec<Line>, Rect) {
        if !self.pending.is_empty() || self.lines.is_empty() || self.line_byte_start < source_len
        {
            self.finalize_line(source_len);
        }

        let height = self.cursor_y;
        let width = if self.max_extent > 0. {
            self.max_extent
        } else {
            self.style.first_line_indent
        };
        let bounds = Rect::new(vec2(0., 0.), vec2(width, height));
        (self.elements, self.lines, bounds)
    }

    fn finalize_line(&mut self, byte_end: usize) {
        let byte_start = self.line_byte_start;

        let mut max_ascent = self.pending_ascent;
        let mut max_descent = self.pending_descent;
        if self.pending.is_empty() || (max_ascent <= 0.001 && max_descent <= 0.001) {
            max_ascent = self.default_metrics.ascent;
            max_descent = self.default_metrics.descent;
        }

        let box_height = line_box_height(
            self.style,
            &self.default_metrics,
            max_ascent,
            max_descent,
            self.para_size,
        );
        let mut baseline = max_ascent;
        let content_height = max_ascent + max_descent;
        if box_height > content_height + 0.001
            && self.style.line_height_type != LineHeightType::ContentScaled
        {
            baseline += (box_height - content_height) / 2.;
        }

        let width = self.pending_width;
        let indent = if self.first_line {
            self.style.first_line_indent
        } else {
            0.
        };
        let shift = alignment_shift(self.style.alignment, self.style.wrap_width, indent + width);
        let dx = indent + shift;
        if dx.abs() > 0.001 {
            for element in &mut self.pending {
                element.translate_x(dx);
            }
        }

        // Images aligned to the line box get their geometry rewritten
        // now that the box is known.
        for element in &mut self.pending {
            if let PositionedElement::Image(image) = element {
                match image.image.valign {
                    ImageVAlign::LineTop => {
                        image.position.y = -baseline;
                        image.ascent = baseline;
                        image.descent = (image.size.y - baseline).max(0.);
                    }
                    ImageVAlign::LineBottom => {
                        image.position.y = (box_height - baseline) - image.size.y;
                        image.descent = box_height - baseline;
                        image.ascent = (image.size.y - image.descent).max(0.);
                    }
                    _ => {}
                }
            }
        }

        let visual_runs = self.build_visual_runs();
        let (visual_to_logical, logical_to_visual) =
            analyze::line_bidi_maps(&self.source[byte_start..byte_end], self.base_level);

        let first_element = self.elements.len();
        let element_count = self.pending.len();
        self.elements.append(&mut self.pending);

        self.lines.push(Line {
            first_element,
            element_count,
            byte_range: byte_start..byte_end,
            width,
            box_y: self.cursor_y,
            box_height,
            baseline,
            max_ascent,
            max_descent,
            visual_runs,
            visual_to_logical,
            logical_to_visual,
        });

        self.max_extent = self.max_extent.max(indent + width + shift.max(0.));
        self.cursor_y += box_height;
        self.line_byte_start = byte_end;
        self.first_line = false;
        self.pending_width = 0.;
        self.pending_ascent = 0.;
        self.pending_descent = 0.;
    }

    /// Partitions the pending line into visual runs: maximal stretches
    /// sharing direction, font, size, script/language, and
    /// text-versus-image nature.
    fn build_visual_runs(&self) -> Vec<VisualRun> {
        let mut runs: Vec<VisualRun> = Vec::new();
        for (index, element) in self.pending.iter().enumerate() {
            let (direction, font, font_size, script, language) = match element {
                PositionedElement::Glyph(g) => {
                    let style = self
                        .spans
                        .get(g.style_index as usize)
                        .map(|s| &s.style)
                        .unwrap_or(&self.style.default_style);
                    (
                        g.direction,
                        g.font,
                        g.size,
                        style.script,
                        style.language.clone(),
                    )
                }
                PositionedElement::Image(_) => (
                    RunDirection::Neutral,
                    self.para_font,
                    self.para_size,
                    None,
                    None,
                ),
            };

            let extends_last = runs.last().map_or(false, |run| {
                run.direction == direction
                    && run.font == font
                    && (run.font_size - font_size).abs() <= 0.1
                    && run.script == script
                    && run.language == language
            });
            if extends_last {
                let run = runs.last_mut().unwrap();
                run.len += 1;
                run.advance += element.advance();
            } else {
                runs.push(VisualRun {
                    first_element: index,
                    len: 1,
                    direction,
                    font,
                    font_size,
                    script,
                    language,
                    advance: element.advance(),
                });
            }
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        glyph::CachedGlyph,
        text::{
            layout::{PositionedGlyph, SourceMapping},
            Fill, InlineImage, StyleFlags,
        },
    };
    use glam::vec2;

    fn glyph(advance: f32, ascent: f32, descent: f32, source: SourceMapping) -> PositionedElement {
        PositionedElement::Glyph(PositionedGlyph {
            glyph_id: 1,
            font: FontId(0),
            size: 16.,
            position: vec2(0., 0.),
            offset: vec2(0., 0.),
            advance: vec2(advance, 0.),
            visual_left: 0.,
            visual_right: advance,
            ascent,
            descent,
            render: CachedGlyph::default(),
            fill: Fill::default(),
            flags: StyleFlags::default(),
            style_index: source.span_index,
            source,
            direction: RunDirection::Ltr,
        })
    }

    fn shaped(advances: &[(f32, u32, u16)]) -> ShapedSegment {
        let mut segment = ShapedSegment::default();
        let mut pen = 0.;
        for &(advance, byte_offset, byte_len) in advances {
            let mut el = glyph(
                advance,
                12.,
                4.,
                SourceMapping {
                    span_index: 0,
                    byte_offset,
                    byte_len,
                },
            );
            el.translate_x(pen);
            pen += advance;
            segment.elements.push(el);
        }
        segment.width = pen;
        segment.max_ascent = 12.;
        segment.max_descent = 4.;
        segment
    }

    fn metrics() -> ScaledMetrics {
        ScaledMetrics {
            ascent: 12.,
            descent: 4.,
            recommended_line_height: 18.,
            ..Default::default()
        }
    }

    #[test]
    fn alignment_shift_rules() {
        assert_eq!(alignment_shift(HorizontalAlignment::Left, 100., 40.), 0.);
        assert_eq!(alignment_shift(HorizontalAlignment::Right, 100., 40.), 60.);
        assert_eq!(alignment_shift(HorizontalAlignment::Center, 100., 40.), 30.);
        // Justify is treated as left for now.
        assert_eq!(alignment_shift(HorizontalAlignment::Justify, 100., 40.), 0.);
        // Without a wrap width the line is its own box.
        assert_eq!(alignment_shift(HorizontalAlignment::Center, 0., 40.), 0.);
        // Overflowing lines never shift negative.
        assert_eq!(alignment_shift(HorizontalAlignment::Right, 30., 40.), 0.);
    }

    #[test]
    fn line_box_height_modes() {
        let style = |t, v| ParagraphStyle {
            line_height_type: t,
            line_height_value: v,
            ..Default::default()
        };
        let m = metrics();
        assert_eq!(
            line_box_height(&style(LineHeightType::ScaledFontMetrics, 1.5), &m, 12., 4., 16.),
            27.
        );
        assert_eq!(
            line_box_height(&style(LineHeightType::FactorOfFontSize, 2.), &m, 12., 4., 16.),
            32.
        );
        assert_eq!(
            line_box_height(&style(LineHeightType::AbsolutePoints, 40.), &m, 12., 4., 16.),
            40.
        );
        assert_eq!(
            line_box_height(&style(LineHeightType::ContentScaled, 1.5), &m, 12., 4., 16.),
            24.
        );
        // Never smaller than the content.
        assert_eq!(
            line_box_height(&style(LineHeightType::AbsolutePoints, 5.), &m, 12., 4., 16.),
            16.
        );
    }

    #[test]
    fn hard_newline_consumes_its_byte() {
        // "a\nb": two lines, the newline byte belongs to the first.
        let style = ParagraphStyle::default();
        let spans: Vec<TextSpan> = Vec::new();
        let source = "a\nb";
        let mut composer = Composer::new(
            &style,
            &spans,
            metrics(),
            FontId(0),
            16.,
            Level::ltr(),
            source,
        );
        composer.push_segment(
            &Segment {
                range: 0..2,
                hard_break: true,
            },
            shaped(&[(8., 0, 1)]),
        );
        composer.push_segment(
            &Segment {
                range: 2..3,
                hard_break: false,
            },
            shaped(&[(8., 2, 1)]),
        );
        let (_, lines, _) = composer.finish(source.len());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].byte_range, 0..2);
        assert_eq!(lines[1].byte_range, 2..3);
        assert_eq!(lines[1].box_y, lines[0].box_height);
    }

    #[test]
    fn wrapping_finalizes_before_the_overflowing_segment() {
        // Two 60px words at wrap width 100: the second word wraps, and
        // the lines' byte ranges tile the source.
        let style = ParagraphStyle {
            wrap_width: 100.,
            ..Default::default()
        };
        let spans: Vec<TextSpan> = Vec::new();
        let source = "hello world";
        let mut composer = Composer::new(
            &style,
            &spans,
            metrics(),
            FontId(0),
            16.,
            Level::ltr(),
            source,
        );
        composer.push_segment(
            &Segment {
                range: 0..6,
                hard_break: false,
            },
            shaped(&[(60., 0, 6)]),
        );
        composer.push_segment(
            &Segment {
                range: 6..11,
                hard_break: false,
            },
            shaped(&[(60., 6, 5)]),
        );
        let (_, lines, _) = composer.finish(source.len());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].byte_range, 0..6);
        assert_eq!(lines[1].byte_range, 6..11);
        assert!((lines[0].width - 60.).abs() < 1e-4);
        assert!((lines[1].width - 60.).abs() < 1e-4);
    }

    #[test]
    fn center_alignment_shifts_elements_by_half_the_slack() {
        let style = ParagraphStyle {
            wrap_width: 100.,
            alignment: HorizontalAlignment::Center,
            ..Default::default()
        };
        let spans: Vec<TextSpan> = Vec::new();
        let source = "x";
        let mut composer = Composer::new(
            &style,
            &spans,
            metrics(),
            FontId(0),
            16.,
            Level::ltr(),
            source,
        );
        composer.push_segment(
            &Segment {
                range: 0..1,
                hard_break: false,
            },
            shaped(&[(20., 0, 1)]),
        );
        let (elements, lines, _) = composer.finish(source.len());
        assert_eq!(lines[0].width, 20.);
        assert!((elements[0].position().x - 40.).abs() < 1e-4);
    }

    #[test]
    fn alignment_change_is_a_constant_shift_per_line() {
        let run = |alignment| {
            let style = ParagraphStyle {
                wrap_width: 200.,
                alignment,
                ..Default::default()
            };
            let spans: Vec<TextSpan> = Vec::new();
            let source = "ab";
            let mut composer = Composer::new(
                &style,
                &spans,
                metrics(),
                FontId(0),
                16.,
                Level::ltr(),
                source,
            );
            composer.push_segment(
                &Segment {
                    range: 0..2,
                    hard_break: false,
                },
                shaped(&[(10., 0, 1), (14., 1, 1)]),
            );
            composer.finish(2)
        };
        let (left, left_lines, _) = run(HorizontalAlignment::Left);
        let (right, right_lines, _) = run(HorizontalAlignment::Right);
        assert_eq!(left_lines[0].width, right_lines[0].width);
        let delta = right[0].position().x - left[0].position().x;
        assert!((delta - 176.).abs() < 1e-4);
        assert!((right[1].position().x - left[1].position().x - delta).abs() < 1e-4);
    }

    #[test]
    fn empty_input_produces_one_default_line() {
        let style = ParagraphStyle::default();
        let spans: Vec<TextSpan> = Vec::new();
        let composer = Composer::new(
            &style,
            &spans,
            metrics(),
            FontId(0),
            16.,
            Level::ltr(),
            "",
        );
        let (elements, lines, bounds) = composer.finish(0);
        assert!(elements.is_empty());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].byte_range, 0..0);
        assert_eq!(lines[0].max_ascent, 12.);
        assert_eq!(lines[0].max_descent, 4.);
        assert!(bounds.size.y > 0.);
    }

    #[test]
    fn extra_box_space_recenters_the_baseline() {
        let style = ParagraphStyle {
            line_height_type: LineHeightType::AbsolutePoints,
            line_height_value: 32.,
            ..Default::default()
        };
        let spans: Vec<TextSpan> = Vec::new();
        let source = "a";
        let mut composer = Composer::new(
            &style,
            &spans,
            metrics(),
            FontId(0),
            16.,
            Level::ltr(),
            source,
        );
        composer.push_segment(
            &Segment {
                range: 0..1,
                hard_break: false,
            },
            shaped(&[(8., 0, 1)]),
        );
        let (_, lines, _) = composer.finish(1);
        // Content is 16 tall in a 32 box: baseline shifts down by 8.
        assert_eq!(lines[0].box_height, 32.);
        assert!((lines[0].baseline - 20.).abs() < 1e-4);
    }

    #[test]
    fn line_bottom_image_is_rewritten_against_the_box() {
        let style = ParagraphStyle::default();
        let spans: Vec<TextSpan> = Vec::new();
        let source = "\u{FFFC}";
        let mut composer = Composer::new(
            &style,
            &spans,
            metrics(),
            FontId(0),
            16.,
            Level::ltr(),
            source,
        );
        let mut segment = ShapedSegment::default();
        segment.elements.push(PositionedElement::Image(
            crate::text::layout::PositionedImage {
                image: InlineImage {
                    image: Default::default(),
                    display_size: vec2(10., 10.),
                    valign: ImageVAlign::LineBottom,
                },
                position: vec2(0., -10.),
                size: vec2(10., 10.),
                advance: 10.,
                ascent: 10.,
                descent: 0.,
                source: SourceMapping {
                    span_index: 0,
                    byte_offset: 0,
                    byte_len: 3,
                },
            },
        ));
        segment.width = 10.;
        segment.max_ascent = 10.;
        segment.max_descent = 0.;
        composer.push_segment(
            &Segment {
                range: 0..3,
                hard_break: false,
            },
            segment,
        );
        let (elements, lines, _) = composer.finish(3);
        let line = &lines[0];
        if let PositionedElement::Image(image) = &elements[0] {
            assert!(
                (image.position.y - ((line.box_height - line.baseline) - image.size.y)).abs()
                    < 1e-4
            );
            assert!((image.descent - (line.box_height - line.baseline)).abs() < 1e-4);
        } else {
            panic!("expected an image element");
        }
    }
}
