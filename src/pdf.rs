use lopdf::{
    content::{Content, Operation},
    Object, ObjectId, StringFormat,
};
use std::path::Path;
use time::OffsetDateTime;

use crate::{
    configuration::InvoiceConfiguration,
    error::{ContextError, InvoiceError},
    fonts::{StandardFont, TrueTypeFont},
    logo::LogoImage,
    surface::{FontWeight, RenderSurface},
};

/// A font as it is registered into the document.
enum PdfFont {
    Standard(StandardFont),
    TrueType(TrueTypeFont),
}

impl PdfFont {
    /// Loads the TrueType font at the given path, if any, otherwise falls back to a standard font.
    fn load(font_path: Option<&Path>, fallback: StandardFont) -> Result<Self, InvoiceError> {
        let Some(font_path) = font_path else {
            return Ok(PdfFont::Standard(fallback));
        };

        let font_bytes = std::fs::read(font_path).map_err(|error| {
            InvoiceError::generation(format!("Failed to read the font {:?}", font_path), &error)
        })?;
        // The file stem doubles as the name of the font in the document, keeping only what is
        // allowed in a PDF name
        let base_font: String = font_path
            .file_stem()
            .map(|file_stem| file_stem.to_string_lossy())
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let base_font = if base_font.is_empty() {
            "EmbeddedFont".to_string()
        } else {
            base_font
        };
        log::debug!("Embedding the font {:?} as {}", font_path, base_font);

        Ok(PdfFont::TrueType(TrueTypeFont::from_bytes(
            font_bytes, base_font,
        )?))
    }

    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            PdfFont::Standard(standard_font) => standard_font.text_width(text, font_size),
            PdfFont::TrueType(true_type_font) => true_type_font.text_width(text, font_size),
        }
    }

    /// Encodes the text into the string operand of a `Tj` operator.
    fn encode(&mut self, text: &str) -> Object {
        match self {
            PdfFont::Standard(standard_font) => {
                Object::String(standard_font.encode(text), StringFormat::Literal)
            }
            PdfFont::TrueType(true_type_font) => {
                Object::String(true_type_font.encode(text), StringFormat::Hexadecimal)
            }
        }
    }

    fn to_dictionary(&self, inner_document: &mut lopdf::Document) -> lopdf::Dictionary {
        match self {
            PdfFont::Standard(standard_font) => standard_font.to_dictionary(),
            PdfFont::TrueType(true_type_font) => {
                true_type_font.insert_into_document(inner_document)
            }
        }
    }
}

/// What ends up in the information dictionary of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub producer: String,
    /// Unix timestamp used for both the creation and the modification date.
    pub creation_timestamp: i64,
}

/// A page whose content is kept as a list of operations until the document is finished.
struct PdfPage {
    /// Page width in points.
    width: f32,
    /// Page height in points.
    height: f32,
    operations: Vec<Operation>,
    /// The images drawn onto the page, by the name they are referred to in the content.
    images: Vec<(String, ObjectId)>,
}

/// A rendering surface producing the bytes of a PDF document through `lopdf`.
///
/// Fonts are registered once for the whole document under the resource names `F1` (regular)
/// and `F2` (bold). When only a regular TrueType font is configured, it serves both weights.
pub struct PdfSurface {
    /// The underlying PDF document, which accumulates the objects as they are created.
    inner_document: lopdf::Document,
    /// Used in order to set the PDF `ID` tag of the trailer.
    identifier: String,
    metadata: DocumentMetadata,
    fonts: Vec<(String, PdfFont)>,
    regular_font_index: usize,
    bold_font_index: usize,
    pages: Vec<PdfPage>,
    image_count: usize,
    compress_streams: bool,
}

impl PdfSurface {
    /// Creates an empty document. Fails if one of the configured fonts cannot be loaded,
    /// since no text could be written without it.
    pub fn new(
        identifier: String,
        configuration: &InvoiceConfiguration,
        metadata: DocumentMetadata,
    ) -> Result<Self, InvoiceError> {
        let regular_font_path = configuration.fonts.regular_font_path.as_deref();
        let bold_font_path = configuration.fonts.bold_font_path.as_deref();

        let mut fonts = vec![(
            "F1".to_string(),
            PdfFont::load(regular_font_path, StandardFont::Helvetica)?,
        )];
        let bold_font_index = if bold_font_path.is_none() && regular_font_path.is_some() {
            0
        } else {
            fonts.push((
                "F2".to_string(),
                PdfFont::load(bold_font_path, StandardFont::HelveticaBold)?,
            ));
            1
        };

        Ok(PdfSurface {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier,
            metadata,
            fonts,
            regular_font_index: 0,
            bold_font_index,
            pages: Vec::new(),
            image_count: 0,
            compress_streams: configuration.compress_streams,
        })
    }

    fn font_index(&self, weight: FontWeight) -> usize {
        match weight {
            FontWeight::Regular => self.regular_font_index,
            FontWeight::Bold => self.bold_font_index,
        }
    }

    fn current_page(&mut self) -> Result<&mut PdfPage, InvoiceError> {
        self.pages
            .last_mut()
            .ok_or(InvoiceError::DocumentGeneration(ContextError::with_context(
                "No page has been added to draw onto",
            )))
    }

    /// Builds the information dictionary from the metadata of the document.
    fn document_info(&self) -> Result<lopdf::Dictionary, InvoiceError> {
        let creation_date = OffsetDateTime::from_unix_timestamp(self.metadata.creation_timestamp)
            .map_err(|error| InvoiceError::generation("Invalid creation timestamp", &error))?;
        let creation_date = to_pdf_timestamp_format(&creation_date);

        Ok(lopdf::Dictionary::from_iter(vec![
            ("Title", text_string(&self.metadata.title)),
            ("Author", text_string(&self.metadata.author)),
            ("Creator", text_string(&self.metadata.producer)),
            ("Producer", text_string(&self.metadata.producer)),
            ("CreationDate", text_string(&creation_date)),
            ("ModDate", text_string(&creation_date)),
            ("Trapped", Object::Name(b"False".to_vec())),
        ]))
    }
}

impl RenderSurface for PdfSurface {
    type Rendered = Vec<u8>;

    fn add_page(&mut self, width: f32, height: f32) {
        self.pages.push(PdfPage {
            width,
            height,
            operations: Vec::new(),
            images: Vec::new(),
        });
    }

    fn text_width(&self, text: &str, weight: FontWeight, font_size: f32) -> f32 {
        self.fonts[self.font_index(weight)]
            .1
            .text_width(text, font_size)
    }

    fn draw_text(
        &mut self,
        text: &str,
        weight: FontWeight,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), InvoiceError> {
        let font_index = self.font_index(weight);
        let (resource_name, font) = &mut self.fonts[font_index];
        let resource_name = resource_name.clone().into_bytes();
        let encoded_text = font.encode(text);

        let [x, y] = position;
        self.current_page()?.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(resource_name), Object::Real(font_size)],
            ),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new("Tj", vec![encoded_text]),
            Operation::new("ET", vec![]),
        ]);

        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &LogoImage,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), InvoiceError> {
        use lopdf::Object::*;

        // Make sure there is somewhere to draw before inserting anything into the document
        self.current_page()?;

        let image_dictionary = |color_space: &str| {
            lopdf::Dictionary::from_iter(vec![
                ("Type", Name(b"XObject".to_vec())),
                ("Subtype", Name(b"Image".to_vec())),
                ("Width", Integer(i64::from(image.width))),
                ("Height", Integer(i64::from(image.height))),
                ("ColorSpace", Name(color_space.as_bytes().to_vec())),
                ("BitsPerComponent", Integer(8)),
            ])
        };

        let mut rgb_dictionary = image_dictionary("DeviceRGB");
        // Transparency is carried by a separate grayscale image, the soft mask
        if let Some(alpha) = &image.alpha {
            let soft_mask = lopdf::Stream::new(image_dictionary("DeviceGray"), alpha.clone());
            let soft_mask_id = self.inner_document.add_object(soft_mask);
            rgb_dictionary.set("SMask", Reference(soft_mask_id));
        }
        let image_id = self
            .inner_document
            .add_object(lopdf::Stream::new(rgb_dictionary, image.rgb.clone()));

        let image_name = format!("Im{}", self.image_count);
        self.image_count += 1;

        let [x, y] = position;
        let [width, height] = size;
        let page = self.current_page()?;
        page.images.push((image_name.clone(), image_id));
        page.operations.extend([
            Operation::new("q", vec![]),
            // Scale the unit square the image is painted into, then move it into place
            Operation::new(
                "cm",
                vec![
                    Real(width),
                    Real(0.0),
                    Real(0.0),
                    Real(height),
                    Real(x),
                    Real(y),
                ],
            ),
            Operation::new("Do", vec![Name(image_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);

        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, InvoiceError> {
        use lopdf::Object::*;

        if self.pages.is_empty() {
            return Err(InvoiceError::DocumentGeneration(ContextError::with_context(
                "The document has no pages",
            )));
        }

        let pages_id = self.inner_document.new_object_id();

        // Load the fonts and insert them into the document, they are shared by all the pages
        let mut fonts_dictionary = lopdf::Dictionary::new();
        for (resource_name, font) in &self.fonts {
            let font_dictionary = font.to_dictionary(&mut self.inner_document);
            let font_id = self.inner_document.add_object(font_dictionary);
            fonts_dictionary.set(resource_name.clone(), Reference(font_id));
        }
        let fonts_dictionary_id = self.inner_document.add_object(fonts_dictionary);

        let mut page_ids = Vec::<Object>::new();
        for page in std::mem::take(&mut self.pages) {
            let mut resources = lopdf::Dictionary::from_iter(vec![(
                "Font",
                Reference(fonts_dictionary_id),
            )]);
            if !page.images.is_empty() {
                let xobjects: lopdf::Dictionary = page
                    .images
                    .into_iter()
                    .map(|(image_name, image_id)| (image_name, Reference(image_id)))
                    .collect();
                resources.set("XObject", Dictionary(xobjects));
            }

            let content = Content {
                operations: page.operations,
            }
            .encode()
            .map_err(|error| InvoiceError::generation("Failed to encode the page content", &error))?;
            let content_id = self
                .inner_document
                .add_object(lopdf::Stream::new(lopdf::Dictionary::new(), content));

            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name(b"Page".to_vec())),
                ("Parent", Reference(pages_id)),
                (
                    "MediaBox",
                    Array(vec![
                        Integer(0),
                        Integer(0),
                        Real(page.width),
                        Real(page.height),
                    ]),
                ),
                ("Resources", Dictionary(resources)),
                ("Contents", Reference(content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"Pages".to_vec())),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        let catalog_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![
            ("Type", Name(b"Catalog".to_vec())),
            ("Pages", Reference(pages_id)),
        ]));
        let document_info = self.document_info()?;
        let document_info_id = self.inner_document.add_object(document_info);

        self.inner_document
            .trailer
            .set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), StringFormat::Literal),
                String(self.identifier.clone().into_bytes(), StringFormat::Literal),
            ]),
        );

        if self.compress_streams {
            self.inner_document.compress();
        }

        let mut pdf_document_bytes = Vec::new();
        self.inner_document
            .save_to(&mut pdf_document_bytes)
            .map_err(|error| {
                InvoiceError::generation("Error while saving the PDF document to bytes", &error)
            })?;
        log::debug!(
            "Saved a PDF document of {} bytes with identifier {}",
            pdf_document_bytes.len(),
            self.identifier
        );

        Ok(pdf_document_bytes)
    }
}

/// Encodes a text string for the information dictionary: plain ASCII stays literal, anything
/// else is written as UTF-16BE with its byte order mark.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut utf16_bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        utf16_bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(utf16_bytes, StringFormat::Hexadecimal)
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            title: "Invoice".into(),
            author: "Ferretería Del Mallín".into(),
            producer: "invoicr".into(),
            creation_timestamp: 0,
        }
    }

    #[test]
    fn timestamps_follow_the_pdf_format() {
        let date = OffsetDateTime::from_unix_timestamp(1_493_996_544).unwrap();

        assert_eq!(to_pdf_timestamp_format(&date), "D:20170505150224+00'00'");
    }

    #[test]
    fn non_ascii_text_strings_are_utf16() {
        let Object::String(bytes, StringFormat::Hexadecimal) = text_string("Mallín") else {
            panic!("Expected a hexadecimal string");
        };
        assert_eq!(
            bytes,
            vec![0xfe, 0xff, 0, b'M', 0, b'a', 0, b'l', 0, b'l', 0, 0xed, 0, b'n']
        );
        assert!(matches!(
            text_string("Invoice"),
            Object::String(_, StringFormat::Literal)
        ));
    }

    #[test]
    fn drawing_without_a_page_fails() {
        let mut surface =
            PdfSurface::new("0".repeat(32), &InvoiceConfiguration::default(), metadata()).unwrap();
        let error = surface
            .draw_text("Invoice", FontWeight::Bold, 24.0, [0.0, 0.0])
            .unwrap_err();

        assert!(matches!(error, InvoiceError::DocumentGeneration(_)));
    }

    #[test]
    fn finished_documents_can_be_parsed_back() {
        let mut surface =
            PdfSurface::new("0".repeat(32), &InvoiceConfiguration::default(), metadata()).unwrap();
        surface.add_page(600.0, 800.0);
        surface
            .draw_text("Invoice", FontWeight::Bold, 24.0, [250.0, 750.0])
            .unwrap();
        let bytes = surface.finish().unwrap();

        let document = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(document.get_pages().len(), 1);
        let info_id = document.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = document.get_dictionary(info_id).unwrap();
        assert_eq!(
            info.get(b"CreationDate").unwrap().as_str().unwrap(),
            b"D:19700101000000+00'00'"
        );
    }

    #[test]
    fn missing_fonts_abort_the_document() {
        let mut configuration = InvoiceConfiguration::default();
        configuration.fonts.regular_font_path = Some("does/not/exist.ttf".into());

        let error = PdfSurface::new("0".repeat(32), &configuration, metadata())
            .err()
            .unwrap();
        assert!(matches!(error, InvoiceError::DocumentGeneration(_)));
    }
}
