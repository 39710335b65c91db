//! Paragraph analysis: source concatenation, the UTF-8/UTF-16
//! bridge, bidi level resolution, and break segmentation.
//!
//! Public layout APIs speak UTF-8 byte offsets; bidi maps and hit
//! testing work in UTF-16 code units. The mirror built here is cached
//! on the block so hit tests never re-encode the paragraph.

use std::ops::Range;

use unicode_bidi::{BidiInfo, Level, ParagraphInfo};
use unicode_linebreak::linebreaks;
use unicode_segmentation::UnicodeSegmentation;

use crate::text::{BaseDirection, LineBreakStrategy, TextSpan};

/// A cached UTF-16 transcription of the concatenated source with a
/// per-character offset table for O(log n) offset conversion in both
/// directions.
#[derive(Clone, Debug, Default)]
pub(crate) struct Utf16Mirror {
    units: Vec<u16>,
    /// `(utf8 offset, utf16 offset)` per character, plus an end
    /// sentinel.
    map: Vec<(u32, u32)>,
}

impl Utf16Mirror {
    pub fn new(text: &str) -> Self {
        let mut units = Vec::with_capacity(text.len());
        let mut map = Vec::with_capacity(text.len() + 1);
        let mut buf = [0u16; 2];
        for (offset, c) in text.char_indices() {
            map.push((offset as u32, units.len() as u32));
            units.extend_from_slice(c.encode_utf16(&mut buf));
        }
        map.push((text.len() as u32, units.len() as u32));
        Self { units, map }
    }

    pub fn len_utf16(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Converts a UTF-8 byte offset to a UTF-16 code unit offset.
    /// Offsets inside a character round down to its start.
    pub fn u8_to_u16(&self, offset: usize) -> usize {
        let offset = offset as u32;
        match self.map.binary_search_by_key(&offset, |&(u8o, _)| u8o) {
            Ok(i) => self.map[i].1 as usize,
            Err(i) => self.map[i.saturating_sub(1)].1 as usize,
        }
    }

    /// Converts a UTF-16 code unit offset to a UTF-8 byte offset.
    /// Offsets on a trailing surrogate round down to the character.
    pub fn u16_to_u8(&self, offset: usize) -> usize {
        let offset = offset as u32;
        match self.map.binary_search_by_key(&offset, |&(_, u16o)| u16o) {
            Ok(i) => self.map[i].0 as usize,
            Err(i) => self.map[i.saturating_sub(1)].0 as usize,
        }
    }
}

/// Concatenates span texts, substituting U+FFFC for image spans.
/// Returns the source and the byte offset of each span start, with an
/// end sentinel.
pub(crate) fn concatenate(spans: &[TextSpan]) -> (String, Vec<u32>) {
    let mut source = String::new();
    let mut offsets = Vec::with_capacity(spans.len() + 1);
    for span in spans {
        offsets.push(source.len() as u32);
        source.push_str(span.effective_text());
    }
    offsets.push(source.len() as u32);
    (source, offsets)
}

pub(crate) fn level_override(direction: BaseDirection) -> Option<Level> {
    match direction {
        BaseDirection::AutoDetect => None,
        BaseDirection::Ltr => Some(Level::ltr()),
        BaseDirection::Rtl => Some(Level::rtl()),
    }
}

/// The resolved paragraph base level: the explicit direction when one
/// was requested, else the first paragraph's detected level.
pub(crate) fn base_level(bidi: &BidiInfo, direction: BaseDirection) -> Level {
    match direction {
        BaseDirection::Ltr => Level::ltr(),
        BaseDirection::Rtl => Level::rtl(),
        BaseDirection::AutoDetect => bidi
            .paragraphs
            .first()
            .map(|p| p.level)
            .unwrap_or_else(Level::ltr),
    }
}

pub(crate) fn paragraph_containing<'a>(
    bidi: &'a BidiInfo,
    position: usize,
) -> Option<&'a ParagraphInfo> {
    bidi.paragraphs
        .iter()
        .find(|p| p.range.contains(&position) || p.range.end == position)
}

fn is_hard_break_char(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// A stretch of source text ending at a break opportunity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Segment {
    /// Byte range including any trailing newline.
    pub range: Range<usize>,
    /// True when the segment ends in an explicit line terminator,
    /// which forces a break and is consumed by the ending line.
    pub hard_break: bool,
}

impl Segment {
    /// The byte range passed to the shaper: the segment minus its
    /// trailing newline sequence.
    pub fn shape_range(&self, source: &str) -> Range<usize> {
        if !self.hard_break {
            return self.range.clone();
        }
        let text = &source[self.range.clone()];
        let mut end = self.range.end;
        if text.ends_with("\r\n") {
            end -= 2;
        } else if let Some(c) = text.chars().next_back() {
            if is_hard_break_char(c) {
                end -= c.len_utf8();
            }
        }
        self.range.start..end
    }
}

/// Splits the source into shaping segments per the paragraph's break
/// strategy. Every returned range ends at a valid break opportunity;
/// concatenated, the ranges cover the source exactly.
pub(crate) fn segments(source: &str, strategy: LineBreakStrategy) -> Vec<Segment> {
    if source.is_empty() {
        return Vec::new();
    }
    match strategy {
        LineBreakStrategy::WordBoundaries => {
            let mut result = Vec::new();
            let mut prev = 0;
            for (end, _opportunity) in linebreaks(source) {
                if end == prev {
                    continue;
                }
                let text = &source[prev..end];
                let hard_break = text.chars().next_back().map_or(false, is_hard_break_char);
                result.push(Segment {
                    range: prev..end,
                    hard_break,
                });
                prev = end;
            }
            if prev < source.len() {
                let text = &source[prev..];
                result.push(Segment {
                    range: prev..source.len(),
                    hard_break: text.chars().next_back().map_or(false, is_hard_break_char),
                });
            }
            result
        }
        LineBreakStrategy::GraphemeBoundaries | LineBreakStrategy::SimpleByWidth => source
            .grapheme_indices(true)
            .map(|(start, g)| Segment {
                range: start..start + g.len(),
                hard_break: g.chars().next_back().map_or(false, is_hard_break_char),
            })
            .collect(),
    }
}

/// Computes the per-line `visual -> logical` and `logical -> visual`
/// maps over the line's UTF-16 code units, running the bidi algorithm
/// on the line alone at the paragraph base level.
pub(crate) fn line_bidi_maps(text: &str, base_level: Level) -> (Vec<u32>, Vec<u32>) {
    if text.is_empty() {
        return (Vec::new(), Vec::new());
    }

    // UTF-16 offset of each character.
    let mut u16_at = vec![0u32; text.len() + 1];
    let mut total = 0u32;
    for (offset, c) in text.char_indices() {
        u16_at[offset] = total;
        total += c.len_utf16() as u32;
    }
    u16_at[text.len()] = total;

    let bidi = BidiInfo::new(text, Some(base_level));
    let mut visual_to_logical = Vec::with_capacity(total as usize);
    for para in &bidi.paragraphs {
        let (levels, runs) = bidi.visual_runs(para, para.range.clone());
        for run in runs {
            let rtl = levels[run.start].is_rtl();
            let mut push_char = |offset: usize, c: char| {
                let start = u16_at[offset];
                for k in 0..c.len_utf16() as u32 {
                    visual_to_logical.push(start + k);
                }
            };
            if rtl {
                for (offset, c) in text[run.clone()].char_indices().rev() {
                    push_char(run.start + offset, c);
                }
            } else {
                for (offset, c) in text[run.clone()].char_indices() {
                    push_char(run.start + offset, c);
                }
            }
        }
    }

    let mut logical_to_visual = vec![0u32; visual_to_logical.len()];
    for (visual, &logical) in visual_to_logical.iter().enumerate() {
        logical_to_visual[logical as usize] = visual as u32;
    }
    (visual_to_logical, logical_to_visual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::CharacterStyle;

    #[test]
    fn mirror_round_trips_ascii_and_multibyte() {
        let text = "aé\u{10348}b";
        let mirror = Utf16Mirror::new(text);
        assert_eq!(mirror.len_utf16(), 1 + 1 + 2 + 1);
        for (offset, _) in text.char_indices() {
            assert_eq!(mirror.u16_to_u8(mirror.u8_to_u16(offset)), offset);
        }
        assert_eq!(mirror.u8_to_u16(text.len()), mirror.len_utf16());
        assert_eq!(mirror.u16_to_u8(mirror.len_utf16()), text.len());
    }

    #[test]
    fn mirror_rounds_down_inside_surrogate_pairs() {
        let text = "\u{10348}";
        let mirror = Utf16Mirror::new(text);
        assert_eq!(mirror.u16_to_u8(1), 0);
    }

    #[test]
    fn concatenate_substitutes_object_replacement() {
        let spans = vec![
            TextSpan::new("ab", CharacterStyle::default()),
            TextSpan {
                text: Default::default(),
                style: CharacterStyle {
                    image: Some(crate::text::InlineImage {
                        image: Default::default(),
                        display_size: glam::vec2(10., 10.),
                        valign: Default::default(),
                    }),
                    ..Default::default()
                },
            },
            TextSpan::new("c", CharacterStyle::default()),
        ];
        let (source, offsets) = concatenate(&spans);
        assert_eq!(source, "ab\u{FFFC}c");
        assert_eq!(offsets, vec![0, 2, 5, 6]);
    }

    #[test]
    fn word_segments_cover_source_and_mark_newlines() {
        let segs = segments("hello world\nbye", LineBreakStrategy::WordBoundaries);
        let mut pos = 0;
        for seg in &segs {
            assert_eq!(seg.range.start, pos);
            pos = seg.range.end;
        }
        assert_eq!(pos, "hello world\nbye".len());
        assert!(segs.iter().any(|s| s.hard_break));
        let hard = segs.iter().find(|s| s.hard_break).unwrap();
        assert_eq!(&"hello world\nbye"[hard.range.clone()], "world\n");
        assert_eq!(
            hard.shape_range("hello world\nbye"),
            hard.range.start..hard.range.end - 1
        );
    }

    #[test]
    fn grapheme_segments_are_single_clusters() {
        let segs = segments("a\u{0301}b", LineBreakStrategy::GraphemeBoundaries);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].range, 0..3);
    }

    #[test]
    fn line_maps_are_mutual_inverses() {
        // Latin around Hebrew: the Hebrew stretch reverses visually.
        let text = "a\u{05D0}\u{05D1}b";
        let (v2l, l2v) = line_bidi_maps(text, Level::ltr());
        assert_eq!(v2l.len(), 4);
        assert_eq!(v2l, vec![0, 2, 1, 3]);
        for (visual, &logical) in v2l.iter().enumerate() {
            assert_eq!(l2v[logical as usize], visual as u32);
        }
        for (logical, &visual) in l2v.iter().enumerate() {
            assert_eq!(v2l[visual as usize], logical as u32);
        }
    }

    #[test]
    fn rtl_paragraph_reverses_latin_run() {
        let text = "ab";
        let (v2l, _) = line_bidi_maps(text, Level::rtl());
        // In an RTL paragraph a lone LTR run keeps its internal order
        // but sits at the visual left; the map stays well formed.
        assert_eq!(v2l.len(), 2);
        let mut sorted = v2l.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1]);
    }
}
