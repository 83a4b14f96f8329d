use std::fmt::Write as _;

use crate::{
    error::{ContextError, InvoiceError},
    fonts::StandardFont,
    logo::LogoImage,
    surface::{FontWeight, RenderSurface},
};

/// A rendering surface which writes down every draw call as a line of text instead of
/// producing a document. Text is measured with the metrics of the built-in Helvetica fonts,
/// so that positions match the ones of a PDF rendered with the default configuration.
#[derive(Debug, Default)]
pub struct TranscriptSurface {
    transcript: String,
    page_count: usize,
}

impl TranscriptSurface {
    pub fn new() -> Self {
        TranscriptSurface::default()
    }

    fn standard_font(weight: FontWeight) -> StandardFont {
        match weight {
            FontWeight::Regular => StandardFont::Helvetica,
            FontWeight::Bold => StandardFont::HelveticaBold,
        }
    }

    fn ensure_page(&self) -> Result<(), InvoiceError> {
        if self.page_count == 0 {
            return Err(InvoiceError::DocumentGeneration(ContextError::with_context(
                "No page has been added to draw onto",
            )));
        }

        Ok(())
    }
}

impl RenderSurface for TranscriptSurface {
    type Rendered = String;

    fn add_page(&mut self, width: f32, height: f32) {
        self.page_count += 1;
        // Writing into a `String` cannot fail
        let _ = writeln!(
            self.transcript,
            "page {} {:.0}x{:.0}",
            self.page_count, width, height
        );
    }

    fn text_width(&self, text: &str, weight: FontWeight, font_size: f32) -> f32 {
        Self::standard_font(weight).text_width(text, font_size)
    }

    fn draw_text(
        &mut self,
        text: &str,
        weight: FontWeight,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), InvoiceError> {
        self.ensure_page()?;
        let weight = match weight {
            FontWeight::Regular => "regular",
            FontWeight::Bold => "bold",
        };
        let _ = writeln!(
            self.transcript,
            "text {} {:.0} at {:.2},{:.2}: {}",
            weight, font_size, position[0], position[1], text
        );

        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &LogoImage,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), InvoiceError> {
        self.ensure_page()?;
        let _ = writeln!(
            self.transcript,
            "image {}x{} at {:.2},{:.2} size {:.2}x{:.2}",
            image.width, image.height, position[0], position[1], size[0], size[1]
        );

        Ok(())
    }

    fn finish(self) -> Result<String, InvoiceError> {
        Ok(self.transcript)
    }
}
