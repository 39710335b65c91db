//! Run building and complex-script shaping.
//!
//! Each break segment is split into bidi level runs (in visual
//! order), then into style sub-runs wherever the owning span changes.
//! Sub-runs are shaped with `swash` at render size; clusters the
//! requested font cannot map are re-shaped against the first fallback
//! font that can, so substituted glyphs keep the fallback font's own
//! advances.

use std::{cell::RefCell, ops::Range};

use glam::vec2;
use smallvec::SmallVec;
use swash::{
    shape::{Direction, ShapeContext},
    text::{Language, Script},
    GlyphId,
};
use unicode_bidi::BidiInfo;

use crate::{
    font::{FontId, Fonts, ScaledMetrics},
    glyph::GlyphCache,
    image::Images,
    text::{CharacterStyle, ImageVAlign, ParagraphStyle, TextSpan},
    text::layout::{
        analyze, PositionedElement, PositionedGlyph, PositionedImage, RunDirection, SourceMapping,
    },
};

thread_local! {
    static SHAPE_CONTEXT: RefCell<ShapeContext> = RefCell::new(ShapeContext::new());
}

/// A shaped segment ready for line composition. Element positions are
/// relative to the segment's own pen origin.
#[derive(Default)]
pub(crate) struct ShapedSegment {
    pub elements: Vec<PositionedElement>,
    pub width: f32,
    pub max_ascent: f32,
    pub max_descent: f32,
}

pub(crate) struct SegmentInput<'a, 'text> {
    pub fonts: &'a Fonts,
    pub glyphs: &'a mut GlyphCache,
    pub images: &'a Images,
    pub source: &'a str,
    pub bidi: &'a BidiInfo<'text>,
    pub range: Range<usize>,
    pub spans: &'a [TextSpan],
    pub span_offsets: &'a [u32],
    pub style: &'a ParagraphStyle,
    pub para_font: FontId,
    pub para_size: f32,
}

struct OwnedGlyph {
    id: GlyphId,
    x: f32,
    y: f32,
    advance: f32,
}

struct OwnedCluster {
    /// Byte range within the shaped sub-run text.
    source: Range<usize>,
    glyphs: SmallVec<[OwnedGlyph; 2]>,
}

/// Resolved ascent, descent, and baseline-relative y for an inline
/// image, given the reference metrics of the surrounding run.
/// `LineTop`/`LineBottom` get provisional baseline values here and are
/// rewritten once the line box is known.
pub(crate) fn image_valign_metrics(
    valign: ImageVAlign,
    height: f32,
    metrics: &ScaledMetrics,
) -> (f32, f32, f32) {
    match valign {
        ImageVAlign::Baseline | ImageVAlign::LineTop | ImageVAlign::LineBottom => {
            (height, 0., -height)
        }
        ImageVAlign::MiddleOfText => {
            let half_x = metrics.x_height / 2.;
            let half_h = height / 2.;
            (
                (half_x + half_h).max(0.),
                (half_h - half_x).max(0.),
                -(half_x + half_h),
            )
        }
        ImageVAlign::TextTop => (
            metrics.ascent,
            (height - metrics.ascent).max(0.),
            -metrics.ascent,
        ),
        ImageVAlign::TextBottom => (
            (height - metrics.descent).max(0.),
            metrics.descent,
            metrics.descent - height,
        ),
    }
}

/// Guesses the script of a sub-run from its first non-common
/// character, the way the shaper would.
fn guess_script(text: &str) -> Script {
    for (properties, _boundary) in swash::text::analyze(text.chars()) {
        let script = properties.script();
        if script != Script::Common {
            return script;
        }
    }
    Script::Latin
}

fn shape_cluster_text(
    fonts: &Fonts,
    font: FontId,
    size: f32,
    direction: Direction,
    script: Script,
    language: Option<&str>,
    text: &str,
) -> Vec<OwnedCluster> {
    let font_ref = match fonts.get(font) {
        Some(f) => f.as_ref(),
        None => return Vec::new(),
    };
    SHAPE_CONTEXT.with(|cell| {
        let mut context = cell.borrow_mut();
        let mut builder = context
            .builder(font_ref)
            .script(script)
            .direction(direction)
            .size(size);
        if let Some(language) = language.and_then(Language::parse) {
            builder = builder.language(Some(language));
        }
        let mut shaper = builder.build();
        shaper.add_str(text);

        let mut clusters = Vec::new();
        shaper.shape_with(|cluster| {
            clusters.push(OwnedCluster {
                source: cluster.source.start as usize..cluster.source.end as usize,
                glyphs: cluster
                    .glyphs
                    .iter()
                    .map(|g| OwnedGlyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                        advance: g.advance,
                    })
                    .collect(),
            });
        });
        clusters
    })
}

pub(crate) fn shape_segment(input: SegmentInput) -> ShapedSegment {
    let mut segment = ShapedSegment::default();
    if input.range.is_empty() {
        return segment;
    }
    let para = match analyze::paragraph_containing(input.bidi, input.range.start) {
        Some(p) => p,
        None => return segment,
    };

    let (levels, runs) = input.bidi.visual_runs(para, input.range.clone());
    let mut pen_x = 0.;
    for run in runs {
        let level = levels[run.start];
        let direction = if level.is_rtl() {
            RunDirection::Rtl
        } else {
            RunDirection::Ltr
        };

        // Split the level run at span boundaries. Visual order within
        // an RTL run is reverse logical order.
        let mut sub_runs: SmallVec<[(usize, Range<usize>); 4]> = SmallVec::new();
        let mut pos = run.start;
        while pos < run.end {
            let span_index = span_at(input.span_offsets, pos);
            let span_end = input.span_offsets[span_index + 1] as usize;
            let end = span_end.min(run.end);
            sub_runs.push((span_index, pos..end));
            pos = end;
        }
        if direction.is_rtl() {
            sub_runs.reverse();
        }

        for (span_index, sub_range) in sub_runs {
            let span = &input.spans[span_index];
            let style = &span.style;
            let mut font = style.font;
            if !input.fonts.is_valid(font) {
                font = input.para_font;
            }
            let size = if style.font_size > 0. {
                style.font_size
            } else {
                input.para_size
            };

            if style.is_image() {
                shape_image_sub_run(&input, span_index, sub_range, font, size, &mut pen_x, &mut segment);
                continue;
            }

            let text = &input.source[sub_range.clone()];
            let script = style.script.unwrap_or_else(|| guess_script(text));
            let shape_direction = if direction.is_rtl() {
                Direction::RightToLeft
            } else {
                Direction::LeftToRight
            };
            let language = style.language.as_deref();
            let run_metrics = input.fonts.scaled_metrics(font, size);
            let clusters =
                shape_cluster_text(input.fonts, font, size, shape_direction, script, language, text);

            for cluster in clusters {
                let cluster_text = &text[cluster.source.clone()];
                let first_char = cluster_text.chars().next().unwrap_or('\u{FFFD}');

                // Re-shape missing clusters with a fallback font so
                // the substituted glyph keeps that font's metrics.
                let mut rendered_font = font;
                let mut glyphs = cluster.glyphs;
                let missing = !glyphs.is_empty()
                    && glyphs.iter().all(|g| g.id == 0)
                    && !cluster_text.chars().all(char::is_whitespace);
                if missing {
                    let (fallback, fallback_glyph) =
                        input.fonts.select_for_codepoint(font, first_char);
                    if fallback != font && fallback_glyph != 0 {
                        let reshaped = shape_cluster_text(
                            input.fonts,
                            fallback,
                            size,
                            shape_direction,
                            script,
                            language,
                            cluster_text,
                        );
                        let reshaped: SmallVec<[OwnedGlyph; 2]> =
                            reshaped.into_iter().flat_map(|c| c.glyphs).collect();
                        if !reshaped.is_empty() {
                            rendered_font = fallback;
                            glyphs = reshaped;
                        }
                    }
                }

                let source = SourceMapping {
                    span_index: span_index as u32,
                    byte_offset: (sub_range.start + cluster.source.start
                        - input.span_offsets[span_index] as usize)
                        as u32,
                    byte_len: cluster.source.len() as u16,
                };

                // Vertical extents come from the face, not the bitmap:
                // line boxes must not depend on which letters appear.
                let metrics = if rendered_font == font {
                    run_metrics
                } else {
                    input.fonts.scaled_metrics(rendered_font, size)
                };

                for glyph in &glyphs {
                    let cached = input.glyphs.glyph(input.fonts, rendered_font, glyph.id);
                    let scale = cached.scale_for(size);

                    let mut advance = glyph.advance;
                    if cluster_text == "\t" {
                        advance = tab_advance(&input, rendered_font, size);
                    }

                    let ascent = metrics.ascent;
                    let descent = metrics.descent;
                    let bearing = cached.bearing_x() * scale;
                    let positioned = PositionedGlyph {
                        glyph_id: glyph.id,
                        font: rendered_font,
                        size,
                        position: vec2(pen_x + glyph.x, -glyph.y),
                        offset: vec2(glyph.x, glyph.y),
                        advance: vec2(advance, 0.),
                        visual_left: bearing,
                        visual_right: bearing + cached.ink_width() * scale,
                        ascent,
                        descent,
                        render: cached,
                        fill: style.fill.clone(),
                        flags: style.flags,
                        style_index: span_index as u32,
                        source,
                        direction,
                    };
                    segment.max_ascent = segment.max_ascent.max(ascent + glyph.y);
                    segment.max_descent = segment.max_descent.max(descent - glyph.y);
                    pen_x += advance;
                    segment.elements.push(PositionedElement::Glyph(positioned));
                }
            }
        }
    }

    segment.width = pen_x;
    segment
}

fn shape_image_sub_run(
    input: &SegmentInput,
    span_index: usize,
    sub_range: Range<usize>,
    font: FontId,
    size: f32,
    pen_x: &mut f32,
    segment: &mut ShapedSegment,
) {
    let style: &CharacterStyle = &input.spans[span_index].style;
    let inline = match style.image {
        Some(inline) => inline,
        None => return,
    };
    let metrics = input.fonts.scaled_metrics(font, size);
    let texture_size = input.images.size(inline.image);

    let width = if inline.display_size.x > 0. {
        inline.display_size.x
    } else if texture_size.x > 0 {
        texture_size.x as f32
    } else {
        size
    };
    let height = if inline.display_size.y > 0. {
        inline.display_size.y
    } else if texture_size.y > 0 {
        texture_size.y as f32
    } else {
        size
    };

    let (ascent, descent, y) = image_valign_metrics(inline.valign, height, &metrics);

    // One element per character; an auto-substituted image span is a
    // single U+FFFC.
    let text = &input.source[sub_range.clone()];
    for (offset, c) in text.char_indices() {
        let source = SourceMapping {
            span_index: span_index as u32,
            byte_offset: (sub_range.start + offset - input.span_offsets[span_index] as usize)
                as u32,
            byte_len: c.len_utf8() as u16,
        };
        segment.elements.push(PositionedElement::Image(PositionedImage {
            image: inline,
            position: vec2(*pen_x, y),
            size: vec2(width, height),
            advance: width,
            ascent,
            descent,
            source,
        }));
        segment.max_ascent = segment.max_ascent.max(ascent);
        segment.max_descent = segment.max_descent.max(descent);
        *pen_x += width;
    }
}

fn tab_advance(input: &SegmentInput, font: FontId, size: f32) -> f32 {
    let space = input
        .fonts
        .get(font)
        .map(|f| {
            let space_glyph = f.as_ref().charmap().map(' ');
            f.as_ref()
                .glyph_metrics(&[])
                .scale(size)
                .advance_width(space_glyph)
        })
        .filter(|a| *a > 0.)
        .unwrap_or(size * 0.25);
    space * input.style.tab_width_factor.max(1.)
}

/// Index of the span containing a source byte position.
fn span_at(span_offsets: &[u32], position: usize) -> usize {
    let position = position as u32;
    match span_offsets.binary_search(&position) {
        Ok(i) => i.min(span_offsets.len().saturating_sub(2)),
        Err(i) => i - 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_for_tests() -> ScaledMetrics {
        ScaledMetrics {
            ascent: 15.,
            descent: 5.,
            x_height: 9.,
            ..Default::default()
        }
    }

    #[test]
    fn baseline_image_sits_on_the_baseline() {
        let m = metrics_for_tests();
        let (ascent, descent, y) = image_valign_metrics(ImageVAlign::Baseline, 30., &m);
        assert_eq!((ascent, descent, y), (30., 0., -30.));
    }

    #[test]
    fn middle_of_text_centers_on_half_x_height() {
        let m = metrics_for_tests();
        let (ascent, descent, y) = image_valign_metrics(ImageVAlign::MiddleOfText, 30., &m);
        assert!((ascent - 19.5).abs() < 1e-5);
        assert!((descent - 10.5).abs() < 1e-5);
        assert!((y + 19.5).abs() < 1e-5);
    }

    #[test]
    fn text_top_hangs_from_the_ascender() {
        let m = metrics_for_tests();
        let (ascent, descent, y) = image_valign_metrics(ImageVAlign::TextTop, 30., &m);
        assert_eq!((ascent, descent, y), (15., 15., -15.));
    }

    #[test]
    fn text_bottom_rests_on_the_descender() {
        let m = metrics_for_tests();
        let (ascent, descent, y) = image_valign_metrics(ImageVAlign::TextBottom, 30., &m);
        assert_eq!((ascent, descent, y), (25., 5., -25.));
    }

    #[test]
    fn small_image_metrics_never_go_negative() {
        let m = metrics_for_tests();
        let (ascent, descent, _) = image_valign_metrics(ImageVAlign::MiddleOfText, 4., &m);
        assert!(ascent >= 0. && descent >= 0.);
        let (ascent, descent, _) = image_valign_metrics(ImageVAlign::TextTop, 4., &m);
        assert_eq!(ascent, 15.);
        assert_eq!(descent, 0.);
    }

    #[test]
    fn guesses_script_from_first_strong_character() {
        assert_eq!(guess_script("hello"), Script::Latin);
        assert_eq!(guess_script("\u{062E}\u{0627}"), Script::Arabic);
        // Leading common characters do not decide the script.
        assert_eq!(guess_script("  \u{05D0}"), Script::Hebrew);
        assert_eq!(guess_script("   "), Script::Latin);
    }

    #[test]
    fn span_lookup_picks_the_covering_span() {
        let offsets = [0u32, 2, 5, 6];
        assert_eq!(span_at(&offsets, 0), 0);
        assert_eq!(span_at(&offsets, 1), 0);
        assert_eq!(span_at(&offsets, 2), 1);
        assert_eq!(span_at(&offsets, 4), 1);
        assert_eq!(span_at(&offsets, 5), 2);
    }
}
