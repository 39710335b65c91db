//! Caret geometry, hit testing, and selection bounds over a laid-out
//! [`TextBlock`].
//!
//! Byte offsets are UTF-8 positions in the block's concatenated
//! source. Visual work runs in UTF-16 code units through the per-line
//! bidi maps, then converts back through the block's cached mirror.

use std::ops::Range;

use glam::{vec2, Vec2};

use crate::{
    rect::Rect,
    text::layout::{PositionedElement, TextBlock},
};

/// Caret placement for a byte offset.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CursorInfo {
    /// Caret position in block coordinates; `y` is the baseline.
    pub position: Vec2,
    pub ascent: f32,
    pub descent: f32,
    pub height: f32,
    pub byte_offset: usize,
    pub line_index: usize,
    pub is_at_logical_line_end: bool,
    pub is_trailing_edge: bool,
}

/// Result of mapping a point to a source position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitTest {
    pub byte_offset: usize,
    pub is_trailing_edge: bool,
    pub distance_to_edge: f32,
}

fn element_width(element: &PositionedElement) -> f32 {
    match element {
        PositionedElement::Glyph(g) => g.advance.x,
        PositionedElement::Image(i) => i.size.x,
    }
}

impl TextBlock {
    /// Computes caret geometry for a byte offset, clamped to the
    /// source. `prefer_leading` picks the leading edge when the offset
    /// sits exactly on an element boundary.
    pub fn cursor_info_from_byte_offset(
        &self,
        byte_offset: usize,
        prefer_leading: bool,
    ) -> CursorInfo {
        let offset = byte_offset.min(self.source.len());
        let default = &self.default_metrics;

        if self.lines.is_empty() {
            return CursorInfo {
                position: vec2(self.style.first_line_indent, default.ascent),
                ascent: default.ascent,
                descent: default.descent,
                height: default.ascent + default.descent,
                byte_offset: offset,
                line_index: 0,
                is_at_logical_line_end: true,
                is_trailing_edge: !prefer_leading,
            };
        }

        let line_index = self
            .lines
            .iter()
            .position(|l| offset < l.byte_range.end)
            .unwrap_or(self.lines.len().saturating_sub(1));
        let line = &self.lines[line_index];
        let origin = self.line_origin_x(line_index);

        let mut info = CursorInfo {
            position: vec2(origin, line.baseline_y()),
            ascent: positive_or(line.max_ascent, default.ascent),
            descent: positive_or(line.max_descent, default.descent),
            height: 0.,
            byte_offset: offset,
            line_index,
            is_at_logical_line_end: offset == line.byte_range.end,
            is_trailing_edge: !prefer_leading,
        };

        if line.element_count > 0 {
            let elements = &self.elements[line.element_range()];
            let containing = elements.iter().find(|el| {
                let range = self.element_byte_range(el);
                range.contains(&offset) && !range.is_empty()
            });
            match containing {
                Some(element) => {
                    let range = self.element_byte_range(element);
                    let mid = range.start as f32 + range.len() as f32 / 2.;
                    let leading = (offset == range.start && prefer_leading)
                        || (offset as f32) < mid;
                    let rtl = element.direction().is_rtl();
                    // The leading edge of an RTL element is its visual
                    // right side. The caret keeps the line's metric
                    // height regardless of the neighboring element.
                    let x = if leading != rtl {
                        element.position().x
                    } else {
                        element.position().x + element.advance()
                    };
                    info.position.x = x;
                    info.is_trailing_edge = !leading;
                }
                None => {
                    // Offset beyond the last element (for example on a
                    // consumed newline): caret after the content.
                    info.position.x = origin + line.width;
                    info.is_trailing_edge = true;
                }
            }
        }

        info.height = info.ascent + info.descent;
        if info.height < 1. {
            info.height = if default.recommended_line_height > 0. {
                default.recommended_line_height
            } else {
                16.
            };
            info.ascent = info.height * 0.75;
            info.descent = info.height * 0.25;
        }
        info
    }

    /// Maps a point in block-local coordinates to the nearest caret
    /// position.
    pub fn byte_offset_from_visual_position(&self, point: Vec2) -> HitTest {
        if self.lines.is_empty() {
            return HitTest {
                byte_offset: 0,
                is_trailing_edge: point.x > 0.,
                distance_to_edge: point.x.abs(),
            };
        }

        // Line selection by y: containment first, then nearest center.
        let mut line_index = 0;
        let mut best_dist_y = f32::INFINITY;
        for (i, line) in self.lines.iter().enumerate() {
            let top = line.box_y;
            let bottom = line.box_y + line.box_height;
            if point.y >= top && point.y < bottom {
                line_index = i;
                break;
            }
            let center = top + line.box_height / 2.;
            let dist = (point.y - center).abs();
            if dist < best_dist_y {
                best_dist_y = dist;
                line_index = i;
            }
        }
        let line = &self.lines[line_index];

        let line_u16 = self.line_u16_range(line);
        let line_len16 = line_u16.len();
        let origin = self.line_origin_x(line_index);
        let content_end = origin + line.width;

        if line.element_count == 0 || line_len16 == 0 {
            let trailing = point.x > origin + line.width / 2.;
            let anchor = origin + if trailing { line.width } else { 0. };
            return HitTest {
                byte_offset: line.byte_range.start,
                is_trailing_edge: trailing,
                distance_to_edge: (point.x - anchor).abs(),
            };
        }

        let v2l = &line.visual_to_logical;
        let l2v = &line.logical_to_visual;

        // Left of the content: the visually first code unit, leading.
        if point.x < origin {
            let first_logical = v2l.first().copied().unwrap_or(0) as usize;
            let byte = self.mirror.u16_to_u8(line_u16.start + first_logical);
            return HitTest {
                byte_offset: byte,
                is_trailing_edge: false,
                distance_to_edge: origin - point.x,
            };
        }

        let mut best_visual = 0usize;
        let mut trailing = false;
        let mut best_dist = f32::INFINITY;

        for element in &self.elements[line.element_range()] {
            let left = element.position().x;
            let width = element_width(element);
            let mid = left + width / 2.;
            let on_left_half = point.x < mid;
            let dist = if on_left_half {
                (point.x - left).abs()
            } else {
                (point.x - (left + width)).abs()
            };
            if dist >= best_dist {
                continue;
            }
            best_dist = dist;

            let bytes = self.element_byte_range(element);
            let log_start = self
                .mirror
                .u8_to_u16(bytes.start)
                .saturating_sub(line_u16.start);
            let mut log_end = self
                .mirror
                .u8_to_u16(bytes.end)
                .saturating_sub(line_u16.start);
            if log_end == log_start && !bytes.is_empty() {
                log_end = log_start + 1;
            }
            let log_start = log_start.min(line_len16.saturating_sub(1));
            let log_end = log_end.min(line_len16);

            let rtl = element.direction().is_rtl();
            // The visual left edge of an RTL element is logically
            // after it.
            let (target_logical, target_trailing) = if rtl {
                if on_left_half {
                    (log_end.saturating_sub(1).max(log_start), true)
                } else {
                    (log_start, false)
                }
            } else if on_left_half {
                (log_start, false)
            } else {
                (log_end.saturating_sub(1).max(log_start), true)
            };
            let target_logical = target_logical.min(l2v.len().saturating_sub(1));
            best_visual = l2v
                .get(target_logical)
                .copied()
                .unwrap_or(target_logical as u32) as usize;
            trailing = target_trailing;
        }

        // Right of the visual line end: logical end for LTR-dominant
        // lines, logical start for RTL-dominant ones.
        if point.x >= content_end {
            let dist = point.x - content_end;
            if dist < best_dist {
                best_dist = dist;
                let rtl_dominant = line
                    .visual_runs
                    .first()
                    .map(|r| r.direction.is_rtl())
                    .unwrap_or_else(|| self.base_level.is_rtl());
                if rtl_dominant {
                    best_visual = l2v.first().copied().unwrap_or(0) as usize;
                    trailing = false;
                } else {
                    let last = line_len16 - 1;
                    best_visual = l2v.get(last).copied().unwrap_or(last as u32) as usize;
                    trailing = true;
                }
            }
        }

        let best_visual = best_visual.min(v2l.len().saturating_sub(1));
        let mut logical = v2l.get(best_visual).copied().unwrap_or(0) as usize;
        if trailing && logical < line_len16 {
            // Step over the full character, surrogate pairs included.
            let unit = self.mirror.units()[line_u16.start + logical];
            logical += if (0xD800..0xDC00).contains(&unit) { 2 } else { 1 };
            logical = logical.min(line_len16);
        }

        let byte = self
            .mirror
            .u16_to_u8(line_u16.start + logical)
            .min(self.source.len());
        HitTest {
            byte_offset: byte,
            is_trailing_edge: trailing,
            distance_to_edge: best_dist,
        }
    }

    /// Bounding rectangles of a byte range: one rectangle per
    /// contiguous visual stretch per line, in block coordinates.
    pub fn bounds_of_byte_range(&self, range: Range<usize>) -> Vec<Rect> {
        let mut bounds = Vec::new();
        if range.start >= range.end || self.lines.is_empty() {
            return bounds;
        }

        for line in &self.lines {
            let effective_start = range.start.max(line.byte_range.start);
            let effective_end = range.end.min(line.byte_range.end);
            if effective_start >= effective_end {
                continue;
            }
            let baseline_y = line.baseline_y();

            let mut active: Option<(f32, f32, f32, f32)> = None;
            let close = |bounds: &mut Vec<Rect>, run: Option<(f32, f32, f32, f32)>| {
                if let Some((min_x, max_x, ascent, descent)) = run {
                    bounds.push(Rect::new(
                        vec2(min_x, baseline_y - ascent),
                        vec2(max_x - min_x, ascent + descent),
                    ));
                }
            };

            for element in &self.elements[line.element_range()] {
                let bytes = self.element_byte_range(element);
                let overlaps = bytes.end > effective_start && bytes.start < effective_end;
                if overlaps {
                    let left = element.position().x;
                    let right = left + element_width(element);
                    let ascent = positive_or(element.ascent(), line.max_ascent);
                    let descent = positive_or(element.descent(), line.max_descent);
                    active = Some(match active {
                        None => (left, right, ascent, descent),
                        Some((min_x, max_x, a, d)) => (
                            min_x.min(left),
                            max_x.max(right),
                            a.max(ascent),
                            d.max(descent),
                        ),
                    });
                } else if active.is_some() {
                    close(&mut bounds, active.take());
                }
            }
            close(&mut bounds, active.take());
        }
        bounds
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value > 0.001 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        font::{FontId, ScaledMetrics},
        glyph::CachedGlyph,
        text::{
            layout::{
                analyze::{self, Utf16Mirror},
                Line, PositionedGlyph, RunDirection, SourceMapping, TextBlock, VisualRun,
            },
            CharacterStyle, Fill, HorizontalAlignment, ParagraphStyle, StyleFlags, TextSpan,
        },
    };
    use unicode_bidi::Level;

    fn glyph_at(
        x: f32,
        advance: f32,
        byte_offset: u32,
        byte_len: u16,
        direction: RunDirection,
    ) -> crate::text::layout::PositionedElement {
        crate::text::layout::PositionedElement::Glyph(PositionedGlyph {
            glyph_id: 1,
            font: FontId(0),
            size: 16.,
            position: vec2(x, 0.),
            offset: vec2(0., 0.),
            advance: vec2(advance, 0.),
            visual_left: 0.,
            visual_right: advance,
            ascent: 12.,
            descent: 4.,
            render: CachedGlyph::default(),
            fill: Fill::default(),
            flags: StyleFlags::default(),
            style_index: 0,
            source: SourceMapping {
                span_index: 0,
                byte_offset,
                byte_len,
            },
            direction,
        })
    }

    /// Builds a one-line block whose elements are given in visual
    /// order with their byte mappings.
    fn block(
        source: &str,
        base_level: Level,
        style: ParagraphStyle,
        elements: Vec<crate::text::layout::PositionedElement>,
        width: f32,
    ) -> TextBlock {
        let (v2l, l2v) = analyze::line_bidi_maps(source, base_level);
        let direction = elements
            .first()
            .map(|e| e.direction())
            .unwrap_or(RunDirection::Ltr);
        let count = elements.len();
        TextBlock {
            elements,
            lines: vec![Line {
                first_element: 0,
                element_count: count,
                byte_range: 0..source.len(),
                width,
                box_y: 0.,
                box_height: 19.2,
                baseline: 13.6,
                max_ascent: 12.,
                max_descent: 4.,
                visual_runs: vec![VisualRun {
                    first_element: 0,
                    len: count,
                    direction,
                    font: FontId(0),
                    font_size: 16.,
                    script: None,
                    language: None,
                    advance: width,
                }],
                visual_to_logical: v2l,
                logical_to_visual: l2v,
            }],
            bounds: Rect::new(vec2(0., 0.), vec2(width, 19.2)),
            source: source.to_owned(),
            spans: vec![TextSpan::new(source, CharacterStyle::default())],
            style,
            span_offsets: vec![0, source.len() as u32],
            mirror: Utf16Mirror::new(source),
            base_level,
            default_metrics: ScaledMetrics {
                ascent: 12.,
                descent: 4.,
                recommended_line_height: 19.2,
                ..Default::default()
            },
        }
    }

    fn ltr_block() -> TextBlock {
        block(
            "ab",
            Level::ltr(),
            ParagraphStyle::default(),
            vec![
                glyph_at(0., 10., 0, 1, RunDirection::Ltr),
                glyph_at(10., 10., 1, 1, RunDirection::Ltr),
            ],
            20.,
        )
    }

    #[test]
    fn ltr_hit_test_round_trip() {
        let block = ltr_block();
        for boundary in [0usize, 1, 2] {
            let caret = block.cursor_info_from_byte_offset(boundary, true);
            let hit = block.byte_offset_from_visual_position(caret.position);
            assert_eq!(hit.byte_offset, boundary, "round trip at {}", boundary);
        }
    }

    #[test]
    fn caret_edges_on_ltr_text() {
        let block = ltr_block();
        let start = block.cursor_info_from_byte_offset(0, true);
        assert_eq!(start.position.x, 0.);
        assert!(!start.is_trailing_edge);
        let end = block.cursor_info_from_byte_offset(2, true);
        assert_eq!(end.position.x, 20.);
        assert!(end.is_at_logical_line_end);
    }

    #[test]
    fn caret_respects_center_alignment() {
        // A 20px glyph centered in a 100px wrap: origin is 40.
        let style = ParagraphStyle {
            alignment: HorizontalAlignment::Center,
            wrap_width: 100.,
            ..Default::default()
        };
        let block = block(
            "x",
            Level::ltr(),
            style,
            vec![glyph_at(40., 20., 0, 1, RunDirection::Ltr)],
            20.,
        );
        let caret = block.cursor_info_from_byte_offset(0, true);
        assert!((caret.position.x - 40.).abs() < 1e-4);
    }

    #[test]
    fn rtl_caret_leading_edge_is_visual_right() {
        // Source "אב", visual order ב then א.
        let block = block(
            "\u{05D0}\u{05D1}",
            Level::rtl(),
            ParagraphStyle::default(),
            vec![
                glyph_at(0., 10., 2, 2, RunDirection::Rtl),
                glyph_at(10., 10., 0, 2, RunDirection::Rtl),
            ],
            20.,
        );
        let caret = block.cursor_info_from_byte_offset(0, true);
        assert_eq!(caret.position.x, 20.);
        assert!(!caret.is_trailing_edge);
    }

    #[test]
    fn rtl_hit_right_edge_is_logical_start() {
        let block = block(
            "\u{05D0}\u{05D1}",
            Level::rtl(),
            ParagraphStyle::default(),
            vec![
                glyph_at(0., 10., 2, 2, RunDirection::Rtl),
                glyph_at(10., 10., 0, 2, RunDirection::Rtl),
            ],
            20.,
        );
        let hit = block.byte_offset_from_visual_position(vec2(19.5, 5.));
        assert_eq!(hit.byte_offset, 0);
        assert!(!hit.is_trailing_edge);
        // Far right of the line: logical start for an RTL line.
        let hit = block.byte_offset_from_visual_position(vec2(400., 5.));
        assert_eq!(hit.byte_offset, 0);
    }

    #[test]
    fn hit_above_and_below_clamp_to_first_and_last_line() {
        let block = ltr_block();
        let above = block.byte_offset_from_visual_position(vec2(0., -100.));
        assert_eq!(above.byte_offset, 0);
        let below = block.byte_offset_from_visual_position(vec2(0., 500.));
        assert_eq!(below.byte_offset, 0);
    }

    #[test]
    fn selection_bounds_cover_the_selected_prefix() {
        let block = ltr_block();
        let rects = block.bounds_of_byte_range(0..1);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].pos.x, 0.);
        assert!((rects[0].size.x - 10.).abs() < 1e-4);
        assert!((rects[0].size.y - 16.).abs() < 1e-4);

        let all = block.bounds_of_byte_range(0..2);
        assert_eq!(all.len(), 1);
        assert!((all[0].size.x - 20.).abs() < 1e-4);
    }

    #[test]
    fn selection_bounds_empty_for_degenerate_range() {
        let block = ltr_block();
        assert!(block.bounds_of_byte_range(1..1).is_empty());
        assert!(block.bounds_of_byte_range(2..1).is_empty());
    }

    #[test]
    fn cursor_clamps_past_the_end() {
        let block = ltr_block();
        let caret = block.cursor_info_from_byte_offset(999, true);
        assert_eq!(caret.byte_offset, 2);
        assert_eq!(caret.line_index, 0);
    }
}
