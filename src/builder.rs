use crate::{
    configuration::InvoiceConfiguration,
    error::InvoiceError,
    invoice::{InvoiceDocument, InvoiceRequest, LineItem},
    logo::LogoImage,
    money::{format_money, format_quantity, suggested_filename},
    pdf::{DocumentMetadata, PdfSurface},
    surface::{FontWeight, RenderSurface},
    transcript::TranscriptSurface,
};

/// Left edge of every left-aligned text and of the logo.
const LEFT_MARGIN: f32 = 50.0;

// Distances of the baselines from the top edge of the page
const TITLE_OFFSET: f32 = 50.0;
const CLIENT_OFFSET: f32 = 120.0;
const EMAIL_OFFSET: f32 = 138.0;
const TABLE_HEADER_OFFSET: f32 = 160.0;
/// Where the table header goes on the pages following the first one.
const CONTINUATION_OFFSET: f32 = 50.0;
/// Distance of the lower-left corner of the logo from the top edge of the page.
const LOGO_OFFSET: f32 = 80.0;

const ROW_SPACING: f32 = 20.0;
/// Additional space between the last row and the total line.
const TOTAL_SPACING: f32 = 20.0;

// The numeric columns are aligned on their right edge
const QUANTITY_RIGHT_EDGE: f32 = 340.0;
const UNIT_PRICE_RIGHT_EDGE: f32 = 440.0;
const SUBTOTAL_RIGHT_EDGE: f32 = 550.0;

const TITLE_SIZE: f32 = 24.0;
const CLIENT_SIZE: f32 = 14.0;
const EMAIL_SIZE: f32 = 12.0;
const TABLE_SIZE: f32 = 12.0;
const TOTAL_SIZE: f32 = 14.0;

/// Lays out invoices onto a rendering surface.
///
/// The layout is fixed and computed in a single pass: logo, title and client on top of the
/// first page, then the table header followed by one row per item, and finally the total.
/// Rows which would end up below the bottom margin go onto a new page, which starts with the
/// table header again.
#[derive(Debug, Clone, Default)]
pub struct InvoiceBuilder {
    configuration: InvoiceConfiguration,
}

impl InvoiceBuilder {
    pub fn new(configuration: InvoiceConfiguration) -> Self {
        InvoiceBuilder { configuration }
    }

    pub fn configuration(&self) -> &InvoiceConfiguration {
        &self.configuration
    }

    /// Generates the PDF document for the request. Nothing is returned unless the whole
    /// document could be assembled, except for the logo, which is skipped if it cannot be decoded.
    pub fn build(&self, request: &InvoiceRequest) -> Result<InvoiceDocument, InvoiceError> {
        request.validate()?;

        let metadata = DocumentMetadata {
            title: format!(
                "{} {}",
                self.configuration.labels.title, request.client_name
            )
            .trim()
            .to_string(),
            author: request.client_name.clone(),
            producer: self.configuration.producer.clone(),
            creation_timestamp: self.configuration.creation_timestamp,
        };
        let mut surface =
            PdfSurface::new(request.document_identifier(), &self.configuration, metadata)?;
        self.lay_out(request, &mut surface)?;
        let bytes = surface.finish()?;

        let filename = suggested_filename(&self.configuration.filename_prefix, &request.client_name);
        log::info!(
            "Generated {} with {} items and a total of {} ({} bytes)",
            filename,
            request.items.len(),
            format_money(request.total(), &self.configuration.currency_symbol),
            bytes.len()
        );

        Ok(InvoiceDocument { bytes, filename })
    }

    /// Lays out the request onto any rendering surface.
    pub fn build_with<S: RenderSurface>(
        &self,
        request: &InvoiceRequest,
        mut surface: S,
    ) -> Result<S::Rendered, InvoiceError> {
        request.validate()?;
        self.lay_out(request, &mut surface)?;
        surface.finish()
    }

    /// A textual listing of what would be drawn for the request.
    pub fn transcript(&self, request: &InvoiceRequest) -> Result<String, InvoiceError> {
        self.build_with(request, TranscriptSurface::new())
    }

    fn lay_out<S: RenderSurface>(
        &self,
        request: &InvoiceRequest,
        surface: &mut S,
    ) -> Result<(), InvoiceError> {
        let configuration = &self.configuration;
        let labels = &configuration.labels;
        let top = configuration.page_height;

        surface.add_page(configuration.page_width, configuration.page_height);

        if let Some(logo_bytes) = &request.logo {
            self.draw_logo(logo_bytes, surface);
        }

        let title_width = surface.text_width(&labels.title, FontWeight::Bold, TITLE_SIZE);
        surface.draw_text(
            &labels.title,
            FontWeight::Bold,
            TITLE_SIZE,
            [(configuration.page_width - title_width) / 2.0, top - TITLE_OFFSET],
        )?;

        surface.draw_text(
            &format!("{}: {}", labels.client, request.client_name),
            FontWeight::Bold,
            CLIENT_SIZE,
            [LEFT_MARGIN, top - CLIENT_OFFSET],
        )?;
        if let Some(contact_email) = &request.contact_email {
            surface.draw_text(
                &format!("{}: {}", labels.email, contact_email),
                FontWeight::Regular,
                EMAIL_SIZE,
                [LEFT_MARGIN, top - EMAIL_OFFSET],
            )?;
        }

        // The cursor is the baseline of the next row
        let mut cursor = self.draw_table_header(surface, top - TABLE_HEADER_OFFSET)?;
        for item in &request.items {
            if cursor < configuration.bottom_margin {
                surface.add_page(configuration.page_width, configuration.page_height);
                cursor = self.draw_table_header(surface, top - CONTINUATION_OFFSET)?;
            }
            self.draw_row(surface, item, cursor)?;
            cursor -= ROW_SPACING;
        }

        let mut total_baseline = cursor - TOTAL_SPACING;
        if total_baseline < configuration.bottom_margin {
            surface.add_page(configuration.page_width, configuration.page_height);
            total_baseline = top - CONTINUATION_OFFSET;
        }
        let total = format!(
            "{}: {}",
            labels.total,
            format_money(request.total(), &configuration.currency_symbol)
        );
        draw_right_aligned(
            surface,
            &total,
            FontWeight::Bold,
            TOTAL_SIZE,
            [SUBTOTAL_RIGHT_EDGE, total_baseline],
        )
    }

    /// Draws the logo in the top-left corner of the page. A logo which cannot be decoded or
    /// drawn is left out, the rest of the document does not depend on it.
    fn draw_logo<S: RenderSurface>(&self, logo_bytes: &[u8], surface: &mut S) {
        let configuration = &self.configuration;
        let drawn_logo = LogoImage::decode(logo_bytes).and_then(|logo| {
            let size = logo.fit_within(configuration.logo_max_width, configuration.logo_max_height);
            surface.draw_image(
                &logo,
                [LEFT_MARGIN, configuration.page_height - LOGO_OFFSET],
                size,
            )
        });

        if let Err(error) = drawn_logo {
            log::warn!("Continuing without the logo: {}", error);
        }
    }

    /// Draws the column titles and returns the baseline of the first row below them.
    fn draw_table_header<S: RenderSurface>(
        &self,
        surface: &mut S,
        baseline: f32,
    ) -> Result<f32, InvoiceError> {
        let labels = &self.configuration.labels;

        surface.draw_text(
            &labels.description,
            FontWeight::Bold,
            TABLE_SIZE,
            [LEFT_MARGIN, baseline],
        )?;
        for (label, right_edge) in [
            (&labels.quantity, QUANTITY_RIGHT_EDGE),
            (&labels.unit_price, UNIT_PRICE_RIGHT_EDGE),
            (&labels.subtotal, SUBTOTAL_RIGHT_EDGE),
        ] {
            draw_right_aligned(
                surface,
                label,
                FontWeight::Bold,
                TABLE_SIZE,
                [right_edge, baseline],
            )?;
        }

        Ok(baseline - ROW_SPACING)
    }

    fn draw_row<S: RenderSurface>(
        &self,
        surface: &mut S,
        item: &LineItem,
        baseline: f32,
    ) -> Result<(), InvoiceError> {
        let currency_symbol = &self.configuration.currency_symbol;

        surface.draw_text(
            &item.description,
            FontWeight::Regular,
            TABLE_SIZE,
            [LEFT_MARGIN, baseline],
        )?;
        for (text, right_edge) in [
            (format_quantity(item.quantity), QUANTITY_RIGHT_EDGE),
            (format_money(item.unit_price, currency_symbol), UNIT_PRICE_RIGHT_EDGE),
            (format_money(item.subtotal(), currency_symbol), SUBTOTAL_RIGHT_EDGE),
        ] {
            draw_right_aligned(
                surface,
                &text,
                FontWeight::Regular,
                TABLE_SIZE,
                [right_edge, baseline],
            )?;
        }

        Ok(())
    }
}

/// Draws the text so that it ends at the given position.
fn draw_right_aligned<S: RenderSurface>(
    surface: &mut S,
    text: &str,
    weight: FontWeight,
    font_size: f32,
    end_position: [f32; 2],
) -> Result<(), InvoiceError> {
    let [right_edge, baseline] = end_position;
    let width = surface.text_width(text, weight, font_size);

    surface.draw_text(text, weight, font_size, [right_edge - width, baseline])
}
