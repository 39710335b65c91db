//! Font registry: owns font byte blobs, resolves per-size metrics,
//! and holds the fallback chains used for missing-codepoint
//! substitution.
//!
//! Font parsing, metrics, and shaping are handled by the `swash` crate.

use ahash::AHashMap;
use swash::{CacheKey, FontDataRef, FontRef, GlyphId, StringId};

/// Identifies a loaded font. Stable from load until unload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub(crate) u32);

impl FontId {
    /// Sentinel for "no font". Resolves to the paragraph default,
    /// then the registry default.
    pub const INVALID: FontId = FontId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl Default for FontId {
    fn default() -> Self {
        Self::INVALID
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("failed to read font data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse font data as a TTF/OTF face")]
    FaceInvalid,
    #[error("face index {index} out of range ({count} faces in collection)")]
    FaceIndexOutOfRange { index: usize, count: usize },
    #[error("face has no usable metrics for shaping")]
    ShaperInit,
}

/// Pixel size at which SDF bitmaps are generated for a face.
pub const DEFAULT_SDF_DESIGN_SIZE: u16 = 64;

/// Design-space properties of a face, in font units.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct FontProperties {
    pub units_per_em: u16,
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
    pub cap_height: f32,
    pub x_height: f32,
}

/// Metrics of a face scaled to a pixel size. Ascent and descent are
/// both positive, measured away from the baseline.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ScaledMetrics {
    pub scale: f32,
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
    pub recommended_line_height: f32,
    pub x_height: f32,
    pub cap_height: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
    pub strikeout_position: f32,
    pub strikeout_thickness: f32,
}

impl ScaledMetrics {
    /// Synthetic metrics used when no valid font is available.
    pub(crate) fn synthetic(size: f32) -> Self {
        let size = if size > 0. { size } else { 16. };
        let ascent = size * 0.75;
        let descent = size * 0.25;
        Self {
            scale: 1.,
            ascent,
            descent,
            line_gap: 0.,
            recommended_line_height: ascent + descent,
            x_height: size * 0.45,
            cap_height: ascent * 0.7,
            underline_position: -descent * 0.5,
            underline_thickness: 1.,
            strikeout_position: size * 0.225,
            strikeout_thickness: 1.,
        }
    }
}

pub(crate) struct Font {
    data: Vec<u8>,
    offset: u32,
    key: CacheKey,
    properties: FontProperties,
    sdf_design_size: u16,
}

impl Font {
    fn from_data(data: Vec<u8>, face_index: usize) -> Result<Self, FontError> {
        let collection = FontDataRef::new(&data).ok_or(FontError::FaceInvalid)?;
        if face_index >= collection.len() {
            return Err(FontError::FaceIndexOutOfRange {
                index: face_index,
                count: collection.len(),
            });
        }
        let font = FontRef::from_index(&data, face_index).ok_or(FontError::FaceInvalid)?;
        let FontRef { key, offset, .. } = font;

        let metrics = font.metrics(&[]);
        if metrics.units_per_em == 0 {
            return Err(FontError::ShaperInit);
        }
        let properties = FontProperties {
            units_per_em: metrics.units_per_em,
            ascent: metrics.ascent,
            descent: metrics.descent,
            line_gap: metrics.leading,
            cap_height: metrics.cap_height,
            x_height: metrics.x_height,
        };

        Ok(Self {
            data,
            offset,
            key,
            properties,
            sdf_design_size: DEFAULT_SDF_DESIGN_SIZE,
        })
    }

    /// The main entrypoint to access font data through `swash`.
    pub fn as_ref(&self) -> FontRef {
        FontRef {
            data: &self.data,
            key: self.key,
            offset: self.offset,
        }
    }

    pub fn sdf_design_size(&self) -> u16 {
        self.sdf_design_size
    }
}

/// Codepoints that resolve in the requested font even when its
/// charmap reports no glyph for them.
pub(crate) fn is_resolve_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{3000}')
}

/// The fonts loaded into an engine.
#[derive(Default)]
pub(crate) struct Fonts {
    fonts: Vec<Option<Font>>,
    default: Option<FontId>,
    fallbacks: AHashMap<FontId, Vec<FontId>>,
}

impl Fonts {
    /// Loads a face from raw TTF/OTF bytes. The first successful load
    /// becomes the registry default.
    pub fn load(&mut self, data: Vec<u8>, face_index: usize) -> Result<FontId, FontError> {
        let font = Font::from_data(data, face_index)?;
        let id = FontId(self.fonts.len() as u32);

        if let Some(name) = font
            .as_ref()
            .localized_strings()
            .find_by_id(StringId::Family, None)
        {
            log::info!("loaded font '{}' as {:?}", name.to_string(), id);
        } else {
            log::info!("loaded unnamed font as {:?}", id);
        }

        self.fonts.push(Some(font));
        if self.default.is_none() {
            self.default = Some(id);
        }
        Ok(id)
    }

    /// Drops the font and removes it from every fallback chain.
    /// Glyph cache eviction is handled by the caller.
    pub fn unload(&mut self, id: FontId) {
        let slot = match self.fonts.get_mut(id.0 as usize) {
            Some(s) => s,
            None => return,
        };
        if slot.take().is_none() {
            return;
        }
        self.fallbacks.remove(&id);
        for chain in self.fallbacks.values_mut() {
            chain.retain(|f| *f != id);
        }
        if self.default == Some(id) {
            self.default = self
                .fonts
                .iter()
                .enumerate()
                .find(|(_, f)| f.is_some())
                .map(|(i, _)| FontId(i as u32));
        }
        log::info!("unloaded font {:?}", id);
    }

    pub fn is_valid(&self, id: FontId) -> bool {
        id.is_valid()
            && self
                .fonts
                .get(id.0 as usize)
                .map_or(false, |f| f.is_some())
    }

    pub fn get(&self, id: FontId) -> Option<&Font> {
        self.fonts.get(id.0 as usize)?.as_ref()
    }

    pub fn default_font(&self) -> FontId {
        self.default.unwrap_or(FontId::INVALID)
    }

    pub fn set_default(&mut self, id: FontId) {
        if self.is_valid(id) {
            self.default = Some(id);
        } else if !id.is_valid() {
            self.default = None;
        } else {
            log::warn!("cannot set invalid font {:?} as default", id);
        }
    }

    /// Replaces the fallback chain of `primary`. Invalid entries are
    /// skipped with a warning.
    pub fn set_fallback_chain(&mut self, primary: FontId, chain: &[FontId]) {
        if !self.is_valid(primary) {
            log::warn!("cannot set fallback chain for invalid font {:?}", primary);
            return;
        }
        let valid: Vec<FontId> = chain
            .iter()
            .copied()
            .filter(|f| {
                let ok = self.is_valid(*f);
                if !ok {
                    log::warn!(
                        "skipping invalid fallback {:?} in chain for {:?}",
                        f,
                        primary
                    );
                }
                ok
            })
            .collect();
        self.fallbacks.insert(primary, valid);
    }

    pub fn fallback_chain(&self, primary: FontId) -> &[FontId] {
        self.fallbacks
            .get(&primary)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn glyph_for(&self, id: FontId, codepoint: char) -> Option<GlyphId> {
        let font = self.get(id)?;
        let glyph = font.as_ref().charmap().map(codepoint);
        if glyph != 0 {
            Some(glyph)
        } else {
            None
        }
    }

    /// Whether `font` (optionally including its fallback chain and the
    /// registry default) maps the codepoint to a real glyph.
    pub fn is_codepoint_available(
        &self,
        font: FontId,
        codepoint: char,
        check_fallback: bool,
    ) -> bool {
        if self.glyph_for(font, codepoint).is_some() {
            return true;
        }
        if check_fallback {
            for fallback in self.fallback_chain(font) {
                if self.glyph_for(*fallback, codepoint).is_some() {
                    return true;
                }
            }
        }
        let default = self.default_font();
        if default != font
            && !(check_fallback && self.fallback_chain(font).contains(&default))
            && self.glyph_for(default, codepoint).is_some()
        {
            return true;
        }
        false
    }

    /// Selects the font that will render `codepoint` for a run
    /// requesting `requested`:
    ///
    /// 1. the requested font if it has a glyph;
    /// 2. otherwise each fallback in order;
    /// 3. otherwise the registry default if not already tried;
    /// 4. otherwise the requested (or first valid) font's `.notdef`.
    ///
    /// Whitespace short-circuits to the requested font even when its
    /// glyph id is zero.
    pub fn select_for_codepoint(&self, requested: FontId, codepoint: char) -> (FontId, GlyphId) {
        let whitespace = is_resolve_whitespace(codepoint);

        if self.is_valid(requested) {
            if let Some(glyph) = self.glyph_for(requested, codepoint) {
                return (requested, glyph);
            }
            if whitespace {
                return (requested, 0);
            }
        }

        if !whitespace {
            for fallback in self.fallback_chain(requested) {
                if let Some(glyph) = self.glyph_for(*fallback, codepoint) {
                    return (*fallback, glyph);
                }
            }
            let default = self.default_font();
            if default != requested && !self.fallback_chain(requested).contains(&default) {
                if let Some(glyph) = self.glyph_for(default, codepoint) {
                    return (default, glyph);
                }
            }
        }

        // Nothing maps the codepoint: render .notdef from the best
        // available face.
        let notdef_font = if self.is_valid(requested) {
            requested
        } else if self.is_valid(self.default_font()) {
            self.default_font()
        } else {
            self.fonts
                .iter()
                .enumerate()
                .find(|(_, f)| f.is_some())
                .map(|(i, _)| FontId(i as u32))
                .unwrap_or(FontId::INVALID)
        };
        (notdef_font, 0)
    }

    pub fn properties(&self, id: FontId) -> FontProperties {
        self.get(id).map(|f| f.properties).unwrap_or_default()
    }

    /// Metrics of the face scaled to `size` pixels, with the standard
    /// substitutes for absent OS/2 fields.
    pub fn scaled_metrics(&self, id: FontId, size: f32) -> ScaledMetrics {
        let font = match self.get(id) {
            Some(f) if size > 0. => f,
            _ => return ScaledMetrics::synthetic(size),
        };

        let m = font.as_ref().metrics(&[]).scale(size);
        let scale = if font.properties.units_per_em > 0 {
            size / font.properties.units_per_em as f32
        } else {
            1.
        };

        let ascent = m.ascent;
        let descent = m.descent;
        let line_gap = m.leading;
        let mut recommended_line_height = ascent + descent + line_gap;
        if recommended_line_height <= 0.001 {
            recommended_line_height = size * 1.2;
        }

        let x_height = if m.x_height > 0. {
            m.x_height
        } else {
            ascent * 0.45
        };
        let cap_height = if m.cap_height > 0. {
            m.cap_height
        } else {
            ascent * 0.7
        };

        let clamp_thickness = |t: f32| if t > 0. && t < 1. { 1. } else { t };
        let underline_thickness = clamp_thickness(m.stroke_size);
        let strikeout_position = if m.strikeout_offset != 0. {
            m.strikeout_offset
        } else {
            x_height / 2.
        };
        let strikeout_thickness = clamp_thickness(if m.stroke_size > 0. {
            m.stroke_size
        } else {
            size / 20.
        });

        ScaledMetrics {
            scale,
            ascent,
            descent,
            line_gap,
            recommended_line_height,
            x_height,
            cap_height,
            underline_position: m.underline_offset,
            underline_thickness,
            strikeout_position,
            strikeout_thickness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_font_yields_synthetic_metrics() {
        let fonts = Fonts::default();
        let m = fonts.scaled_metrics(FontId::INVALID, 20.);
        assert!((m.ascent - 15.).abs() < 1e-5);
        assert!((m.descent - 5.).abs() < 1e-5);
        assert!((m.recommended_line_height - 20.).abs() < 1e-5);
        assert!((m.x_height - 9.).abs() < 1e-5);
    }

    #[test]
    fn select_reports_invalid_when_registry_is_empty() {
        let fonts = Fonts::default();
        let (font, glyph) = fonts.select_for_codepoint(FontId::INVALID, 'x');
        assert_eq!(font, FontId::INVALID);
        assert_eq!(glyph, 0);
    }

    #[test]
    fn resolve_whitespace_set() {
        assert!(is_resolve_whitespace(' '));
        assert!(is_resolve_whitespace('\u{3000}'));
        assert!(!is_resolve_whitespace('x'));
    }
}
