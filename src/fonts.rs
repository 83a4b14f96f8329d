use std::collections::BTreeMap;

use lopdf::{Object, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, GlyphId, OwnedFace};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::InvoiceError;

/// Widths of the printable ASCII characters (from the space to the tilde) of Helvetica,
/// expressed in thousandths of the font size as listed in the Adobe font metrics.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

/// Same as `HELVETICA_WIDTHS`, but for Helvetica-Bold.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Widths of the upper half of `WinAnsiEncoding` (codes 0x80 to 0xFF) of Helvetica. The codes
/// left undefined by the encoding are zero, they are never produced by `win_ansi_byte`.
#[rustfmt::skip]
const HELVETICA_UPPER_WIDTHS: [u16; 128] = [
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

#[rustfmt::skip]
const HELVETICA_BOLD_UPPER_WIDTHS: [u16; 128] = [
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667,
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// What is written in place of a character `WinAnsiEncoding` cannot represent.
const REPLACEMENT_BYTE: u8 = b'?';

/// One of the standard fonts every PDF reader ships with, so nothing needs to be embedded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Width of a character in thousandths of the font size, as it is encoded: a character
    /// which cannot be represented is as wide as its replacement.
    pub fn character_width(&self, character: char) -> u16 {
        let (widths, upper_widths) = match self {
            StandardFont::Helvetica => (&HELVETICA_WIDTHS, &HELVETICA_UPPER_WIDTHS),
            StandardFont::HelveticaBold => (&HELVETICA_BOLD_WIDTHS, &HELVETICA_BOLD_UPPER_WIDTHS),
        };
        match win_ansi_byte(character).unwrap_or(REPLACEMENT_BYTE) {
            byte @ 0x80..=0xff => upper_widths[usize::from(byte - 0x80)],
            byte @ b' '..=b'~' => widths[usize::from(byte - b' ')],
            _ => widths[usize::from(REPLACEMENT_BYTE - b' ')],
        }
    }

    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let total_width: u32 = text
            .nfc()
            .map(|character| u32::from(self.character_width(character)))
            .sum();
        total_width as f32 * font_size / 1000.0
    }

    /// Encodes the text in `WinAnsiEncoding`, replacing what cannot be represented with `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        text.nfc()
            .map(|character| {
                win_ansi_byte(character).unwrap_or_else(|| {
                    log::warn!(
                        "The character {:?} cannot be written with {}, replacing it",
                        character,
                        self.base_font()
                    );
                    REPLACEMENT_BYTE
                })
            })
            .collect()
    }

    pub fn to_dictionary(&self) -> lopdf::Dictionary {
        lopdf::Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(self.base_font().as_bytes().to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ])
    }
}

/// Maps a character to its code in `WinAnsiEncoding` (Windows code page 1252).
fn win_ansi_byte(character: char) -> Option<u8> {
    let byte = match character {
        ' '..='~' | '\u{a0}'..='\u{ff}' => character as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };

    Some(byte)
}

const CMAP_HEADER: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";

const CMAP_FOOTER: &str = "endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// The number of entries a single `beginbfchar` section may hold.
const CMAP_BLOCK_LENGTH: usize = 100;

/// A TrueType font which is embedded as a whole into the document. The glyphs used while
/// writing are remembered, so that only their widths and Unicode mappings are emitted.
#[derive(Debug)]
pub struct TrueTypeFont {
    /// The byte data the font was loaded from.
    bytes: Vec<u8>,
    face: OwnedFace,
    /// The name under which the font appears in the document.
    base_font: String,
    used_glyphs: BTreeMap<u16, char>,
}

impl TrueTypeFont {
    pub fn from_bytes(bytes: Vec<u8>, base_font: String) -> Result<Self, InvoiceError> {
        let face = OwnedFace::from_vec(bytes.clone(), 0).map_err(|error| {
            InvoiceError::generation(
                format!("Failed to parse the TrueType font {:?}", base_font),
                &error,
            )
        })?;

        Ok(TrueTypeFont {
            bytes,
            face,
            base_font,
            used_glyphs: BTreeMap::new(),
        })
    }

    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    /// Scales font units so that they fit into a 1000 units square, as PDF expects.
    fn to_thousandths(&self, font_units: f32) -> f32 {
        font_units * 1000.0 / f32::from(self.face().units_per_em())
    }

    fn glyph_width(&self, glyph_id: u16) -> f32 {
        let advance = self
            .face()
            .glyph_hor_advance(GlyphId(glyph_id))
            .unwrap_or_default();
        self.to_thousandths(f32::from(advance))
    }

    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let total_width: f32 = text
            .nfc()
            .filter_map(|character| self.face().glyph_index(character))
            .map(|glyph_id| self.glyph_width(glyph_id.0))
            .sum();
        total_width * font_size / 1000.0
    }

    /// Encodes the text as a sequence of big-endian glyph IDs (the `Identity-H` encoding).
    /// Characters missing from the font are skipped.
    pub fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut glyph_id_bytes = Vec::with_capacity(text.len() * 2);
        for character in text.nfc() {
            match self.face().glyph_index(character) {
                Some(glyph_id) => {
                    self.used_glyphs.entry(glyph_id.0).or_insert(character);
                    glyph_id_bytes.extend_from_slice(&glyph_id.0.to_be_bytes());
                }
                None => log::warn!(
                    "Unable to find the character {:?} in the font {:?}",
                    character,
                    self.base_font
                ),
            }
        }

        glyph_id_bytes
    }

    /// Inserts the font program, its descriptor and its Unicode mapping into the document,
    /// returning the `Type0` font dictionary that refers to them.
    pub fn insert_into_document(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        use lopdf::Object::*;

        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]),
            self.bytes.clone(),
        );
        let font_stream_id = inner_document.add_object(font_stream);

        let bounding_box = self.face().global_bounding_box();
        let capital_height = self
            .face()
            .capital_height()
            .unwrap_or_else(|| self.face().ascender());
        let font_descriptor = lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"FontDescriptor".to_vec())),
            ("FontName", Name(self.base_font.clone().into_bytes())),
            (
                "Ascent",
                Integer(self.to_thousandths(f32::from(self.face().ascender())) as i64),
            ),
            (
                "Descent",
                Integer(self.to_thousandths(f32::from(self.face().descender())) as i64),
            ),
            (
                "CapHeight",
                Integer(self.to_thousandths(f32::from(capital_height)) as i64),
            ),
            ("ItalicAngle", Integer(0)),
            // Non-symbolic font using the standard Latin character set
            ("Flags", Integer(32)),
            ("StemV", Integer(80)),
            (
                "FontBBox",
                Array(
                    [
                        bounding_box.x_min,
                        bounding_box.y_min,
                        bounding_box.x_max,
                        bounding_box.y_max,
                    ]
                    .into_iter()
                    .map(|coordinate| Integer(self.to_thousandths(f32::from(coordinate)) as i64))
                    .collect(),
                ),
            ),
            ("FontFile2", Reference(font_stream_id)),
        ]);
        let font_descriptor_id = inner_document.add_object(font_descriptor);

        // Widths are listed as `glyph_id [width]` pairs, only for the glyphs in use
        let widths = self
            .used_glyphs
            .keys()
            .flat_map(|&glyph_id| {
                [
                    Integer(i64::from(glyph_id)),
                    Array(vec![Integer(self.glyph_width(glyph_id) as i64)]),
                ]
            })
            .collect();

        let descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"Font".to_vec())),
            ("Subtype", Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Name(self.base_font.clone().into_bytes())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String(b"Adobe".to_vec(), StringFormat::Literal)),
                    ("Ordering", String(b"Identity".to_vec(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("FontDescriptor", Reference(font_descriptor_id)),
            ("W", Array(widths)),
            ("DW", Integer(1000)),
        ]);

        let to_unicode_stream = lopdf::Stream::new(
            lopdf::Dictionary::new(),
            self.to_unicode_cmap().into_bytes(),
        );
        let to_unicode_id = inner_document.add_object(to_unicode_stream);

        lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"Font".to_vec())),
            ("Subtype", Name(b"Type0".to_vec())),
            ("BaseFont", Name(self.base_font.clone().into_bytes())),
            ("Encoding", Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Array(vec![Dictionary(descendant_font)])),
            ("ToUnicode", Reference(to_unicode_id)),
        ])
    }

    /// The CMap that lets readers map the glyph IDs back to text, e.g. for copy and paste.
    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(CMAP_HEADER);
        let entries: Vec<(u16, char)> = self
            .used_glyphs
            .iter()
            .map(|(&glyph_id, &character)| (glyph_id, character))
            .collect();

        for block in entries.chunks(CMAP_BLOCK_LENGTH) {
            cmap.push_str(&format!("{} beginbfchar\n", block.len()));
            for &(glyph_id, character) in block {
                let utf16_units: std::string::String = character
                    .encode_utf16(&mut [0; 2])
                    .iter()
                    .map(|unit| format!("{unit:04X}"))
                    .collect();
                cmap.push_str(&format!("<{glyph_id:04X}> <{utf16_units}>\n"));
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(CMAP_FOOTER);

        cmap
    }
}
