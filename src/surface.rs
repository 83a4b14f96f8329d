use crate::{error::InvoiceError, logo::LogoImage};

/// The two weights of text an invoice is printed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// What a rendering backend must be able to do for an invoice to be laid out onto it.
/// Coordinates are in points, with the origin in the bottom-left corner of the page and
/// text positioned by the left end of its baseline. Drawing always targets the last page added.
pub trait RenderSurface {
    /// What the backend produces once every page has been drawn.
    type Rendered;

    fn add_page(&mut self, width: f32, height: f32);

    /// The width the text would occupy once drawn, used for alignment.
    fn text_width(&self, text: &str, weight: FontWeight, font_size: f32) -> f32;

    fn draw_text(
        &mut self,
        text: &str,
        weight: FontWeight,
        font_size: f32,
        position: [f32; 2],
    ) -> Result<(), InvoiceError>;

    /// Draws the image stretched onto the rectangle with the given lower-left corner and size.
    fn draw_image(
        &mut self,
        image: &LogoImage,
        position: [f32; 2],
        size: [f32; 2],
    ) -> Result<(), InvoiceError>;

    fn finish(self) -> Result<Self::Rendered, InvoiceError>;
}
