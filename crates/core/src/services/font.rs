//! Embedded TrueType font for PDF documents.
//!
//! DejaVu Sans is written as a `Type0` font with `Identity-H` encoding:
//! text is shown as big-endian glyph ids and a `ToUnicode` map lets viewers
//! copy and search it.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::LazyLock;

use flate2::{Compression, write::ZlibEncoder};
use foodgram_common::{AppError, AppResult};
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Filter, Finish, Name, Pdf, Rect, Ref, Str};
use ttf_parser::{Face, GlyphId};

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const BASE_FONT: Name<'static> = Name(b"DejaVuSans");

const SYSTEM_INFO: SystemInfo<'static> = SystemInfo {
    registry: Str(b"Adobe"),
    ordering: Str(b"Identity"),
    supplement: 0,
};

static FONT: LazyLock<Result<EmbeddedFont, String>> = LazyLock::new(EmbeddedFont::load);

/// The parsed font and its compressed file stream.
pub(super) struct EmbeddedFont {
    face: Face<'static>,
    file: Vec<u8>,
    file_len: i32,
}

impl EmbeddedFont {
    /// Shared instance, parsed and compressed on first use.
    pub(super) fn get() -> AppResult<&'static Self> {
        FONT.as_ref().map_err(|e| AppError::Render(e.clone()))
    }

    fn load() -> Result<Self, String> {
        let face = Face::parse(FONT_DATA, 0).map_err(|e| format!("invalid font: {e}"))?;
        let file_len = i32::try_from(FONT_DATA.len())
            .map_err(|_| format!("font too large: {} bytes", FONT_DATA.len()))?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(FONT_DATA)
            .map_err(|e| format!("font compression failed: {e}"))?;
        let file = encoder
            .finish()
            .map_err(|e| format!("font compression failed: {e}"))?;

        Ok(Self {
            face,
            file,
            file_len,
        })
    }

    /// Glyph for `c`, or `.notdef` when the font has none.
    fn glyph(&self, c: char) -> u16 {
        self.face.glyph_index(c).map_or(0, |g| g.0)
    }

    /// Horizontal advance in text space units (1/1000 em).
    fn advance(&self, glyph: u16) -> f32 {
        self.scale(self.face.glyph_hor_advance(GlyphId(glyph)).unwrap_or(0))
    }

    fn scale(&self, value: impl Into<f32>) -> f32 {
        value.into() * 1000.0 / f32::from(self.face.units_per_em())
    }
}

/// Encodes text for one document and remembers which glyphs it used.
pub(super) struct GlyphEncoder<'a> {
    font: &'a EmbeddedFont,
    used: BTreeMap<u16, char>,
}

impl<'a> GlyphEncoder<'a> {
    pub(super) const fn new(font: &'a EmbeddedFont) -> Self {
        Self {
            font,
            used: BTreeMap::new(),
        }
    }

    /// Two bytes per character, the glyph id in big-endian order.
    pub(super) fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let glyph = self.font.glyph(c);
            if glyph != 0 {
                self.used.entry(glyph).or_insert(c);
            }
            bytes.extend_from_slice(&glyph.to_be_bytes());
        }
        bytes
    }

    /// Write the font as object `font_id`. The descendant font, descriptor,
    /// font file and `ToUnicode` map take ids from `next_id`.
    pub(super) fn write(self, pdf: &mut Pdf, font_id: Ref, next_id: &mut Ref) {
        let cid_id = next_id.bump();
        let descriptor_id = next_id.bump();
        let file_id = next_id.bump();
        let cmap_id = next_id.bump();
        let font = self.font;
        let face = &font.face;

        pdf.type0_font(font_id)
            .base_font(BASE_FONT)
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(cid_id)
            .to_unicode(cmap_id);

        let mut cid = pdf.cid_font(cid_id);
        cid.subtype(CidFontType::Type2)
            .base_font(BASE_FONT)
            .system_info(SYSTEM_INFO)
            .font_descriptor(descriptor_id)
            .default_width(font.advance(0))
            .cid_to_gid_map_predefined(Name(b"Identity"));
        let mut widths = cid.widths();
        for &glyph in self.used.keys() {
            widths.consecutive(glyph, [font.advance(glyph)]);
        }
        widths.finish();
        cid.finish();

        let bbox = face.global_bounding_box();
        pdf.font_descriptor(descriptor_id)
            .name(BASE_FONT)
            .flags(FontFlags::SYMBOLIC)
            .bbox(Rect::new(
                font.scale(bbox.x_min),
                font.scale(bbox.y_min),
                font.scale(bbox.x_max),
                font.scale(bbox.y_max),
            ))
            .italic_angle(0.0)
            .ascent(font.scale(face.ascender()))
            .descent(font.scale(face.descender()))
            .cap_height(font.scale(face.capital_height().unwrap_or_else(|| face.ascender())))
            .stem_v(80.0)
            .font_file2(file_id);

        pdf.stream(file_id, &font.file)
            .filter(Filter::FlateDecode)
            .pair(Name(b"Length1"), font.file_len);

        let mut cmap = UnicodeCmap::new(Name(b"Custom"), SYSTEM_INFO);
        for (&glyph, &c) in &self.used {
            cmap.pair(glyph, c);
        }
        pdf.stream(cmap_id, &cmap.finish());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_covers_cyrillic() {
        let font = EmbeddedFont::get().unwrap();

        for c in "Список покупок Ёё".chars() {
            assert_ne!(font.glyph(c), 0, "no glyph for {c:?}");
        }
        assert!(font.advance(font.glyph('М')) > 0.0);
    }

    #[test]
    fn test_encode_records_used_glyphs() {
        let font = EmbeddedFont::get().unwrap();
        let mut encoder = GlyphEncoder::new(font);

        let bytes = encoder.encode("Соль");

        assert_eq!(bytes.len(), 8);
        assert_eq!(
            u16::from_be_bytes([bytes[0], bytes[1]]),
            font.glyph('С')
        );
        assert_eq!(encoder.used.len(), 4);
        assert_eq!(encoder.used.get(&font.glyph('ь')), Some(&'ь'));
    }

    #[test]
    fn test_unknown_character_maps_to_notdef() {
        let font = EmbeddedFont::get().unwrap();
        let mut encoder = GlyphEncoder::new(font);

        let bytes = encoder.encode("\u{10fffd}");

        assert_eq!(bytes, vec![0, 0]);
        assert!(encoder.used.is_empty());
    }
}
