use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, InvoiceError};

/// Everything about the generated document that is not part of the form itself. Every field
/// has a default, so a configuration file only needs to list what it changes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceConfiguration {
    /// Page width in points.
    pub page_width: f32,
    /// Page height in points.
    pub page_height: f32,
    /// No row is drawn with its baseline below this height, a new page is started instead.
    pub bottom_margin: f32,
    pub currency_symbol: String,
    /// The suggested file name is `<prefix>-<client name>.pdf`.
    pub filename_prefix: String,
    pub labels: Labels,
    pub fonts: FontsConfiguration,
    /// The logo is scaled down to fit into this box, in points.
    pub logo_max_width: f32,
    pub logo_max_height: f32,
    /// Compress the content streams of the PDF document.
    pub compress_streams: bool,
    /// Unix timestamp written as the creation date of the document.
    pub creation_timestamp: i64,
    pub producer: String,
    /// Timeout for fetching remote logos.
    pub fetch_timeout_seconds: u64,
    /// Bring the form back to its initial state after a successful generation.
    pub reset_after_generate: bool,
}

impl Default for InvoiceConfiguration {
    fn default() -> Self {
        InvoiceConfiguration {
            page_width: 600.0,
            page_height: 800.0,
            bottom_margin: 60.0,
            currency_symbol: "$".into(),
            filename_prefix: "invoice".into(),
            labels: Labels::default(),
            fonts: FontsConfiguration::default(),
            logo_max_width: 100.0,
            logo_max_height: 60.0,
            compress_streams: false,
            creation_timestamp: 0,
            producer: "invoicr".into(),
            fetch_timeout_seconds: 10,
            reset_after_generate: false,
        }
    }
}

/// The fixed texts printed on the document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Labels {
    pub title: String,
    pub client: String,
    pub email: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
    pub subtotal: String,
    pub total: String,
}

impl Default for Labels {
    fn default() -> Self {
        Labels {
            title: "Invoice".into(),
            client: "Client".into(),
            email: "Email".into(),
            description: "Description".into(),
            quantity: "Quantity".into(),
            unit_price: "Unit price".into(),
            subtotal: "Subtotal".into(),
            total: "Total".into(),
        }
    }
}

/// TrueType fonts to embed instead of the built-in Helvetica family. When only the regular
/// font is given, it is used for the bold text as well.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FontsConfiguration {
    pub regular_font_path: Option<PathBuf>,
    pub bold_font_path: Option<PathBuf>,
}

impl InvoiceConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, InvoiceError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                InvoiceError::Configuration(ContextError::with_error(
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                ))
            })?;
        let configuration: InvoiceConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                InvoiceError::Configuration(ContextError::with_error(
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                ))
            })?;
        log::debug!("Loaded the configuration {:?}", configuration);

        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_configurations_keep_the_defaults() {
        let configuration: InvoiceConfiguration = serde_json::from_str(
            r#"{"currencySymbol": "ARS ", "labels": {"title": "Factura", "client": "Cliente"}}"#,
        )
        .unwrap();

        assert_eq!(configuration.currency_symbol, "ARS ");
        assert_eq!(configuration.labels.title, "Factura");
        assert_eq!(configuration.labels.total, "Total");
        assert_eq!(configuration.page_width, 600.0);
        assert_eq!(configuration.fonts, FontsConfiguration::default());
    }

    #[test]
    fn unreadable_configuration_is_reported() {
        let error = InvoiceConfiguration::from_path(Path::new("does/not/exist.json")).unwrap_err();

        assert!(matches!(error, InvoiceError::Configuration(_)));
    }
}
