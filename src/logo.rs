use std::{path::PathBuf, str::FromStr, time::Duration};

use base64::Engine as _;

use crate::error::{ContextError, InvoiceError};

/// Where the bytes of a logo come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoReference {
    /// A `data:image/...;base64,...` URI, such as the ones produced by a browser file picker.
    DataUri(String),
    /// A remote `http://` or `https://` resource.
    Url(String),
    /// A file on the local file system.
    File(PathBuf),
}

impl FromStr for LogoReference {
    type Err = std::convert::Infallible;

    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let reference = reference.trim();
        let logo_reference = if reference.starts_with("data:") {
            LogoReference::DataUri(reference.to_string())
        } else if reference.starts_with("http://") || reference.starts_with("https://") {
            LogoReference::Url(reference.to_string())
        } else {
            LogoReference::File(PathBuf::from(reference))
        };

        Ok(logo_reference)
    }
}

impl std::fmt::Display for LogoReference {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // The payload of a data URI is of no use in a log line
            LogoReference::DataUri(data_uri) => {
                let header = data_uri.split(',').next().unwrap_or_default();
                write!(formatter, "{header},...")
            }
            LogoReference::Url(url) => write!(formatter, "{url}"),
            LogoReference::File(path) => write!(formatter, "{}", path.display()),
        }
    }
}

/// Resolves a logo reference to the raw bytes of the image. Failing to do so is never fatal
/// for a document: the caller logs the error and goes on without the logo.
pub trait ResourceFetcher {
    fn fetch(&self, reference: &LogoReference) -> Result<Vec<u8>, InvoiceError>;
}

/// Reads local files, decodes data URIs and downloads remote images.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    timeout: Duration,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration) -> Self {
        DefaultFetcher { timeout }
    }

    fn fetch_url(&self, url: &str) -> Result<Vec<u8>, InvoiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|error| {
                InvoiceError::resource_fetch("Failed to create the HTTP client", &error)
            })?;
        let response = client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|error| {
                InvoiceError::resource_fetch(format!("Failed to download the logo {url}"), &error)
            })?;
        let bytes = response.bytes().map_err(|error| {
            InvoiceError::resource_fetch(format!("Failed to read the logo {url}"), &error)
        })?;

        Ok(bytes.to_vec())
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        DefaultFetcher::new(Duration::from_secs(10))
    }
}

impl ResourceFetcher for DefaultFetcher {
    fn fetch(&self, reference: &LogoReference) -> Result<Vec<u8>, InvoiceError> {
        log::debug!("Fetching the logo {}", reference);
        match reference {
            LogoReference::DataUri(data_uri) => decode_data_uri(data_uri),
            LogoReference::Url(url) => self.fetch_url(url),
            LogoReference::File(path) => std::fs::read(path).map_err(|error| {
                InvoiceError::resource_fetch(format!("Failed to read the logo {:?}", path), &error)
            }),
        }
    }
}

fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>, InvoiceError> {
    let (header, payload) = data_uri.split_once(',').ok_or_else(|| {
        InvoiceError::ResourceFetch(ContextError::with_context(
            "Invalid data URI for the logo: missing comma",
        ))
    })?;
    if !header.ends_with(";base64") {
        return Err(InvoiceError::ResourceFetch(ContextError::with_context(
            format!("Only base64 data URIs are supported for the logo, found {header:?}"),
        )));
    }

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|error| InvoiceError::resource_fetch("Failed to decode the logo data URI", &error))
}

/// A decoded logo, as 8 bits per component RGB pixels plus an optional alpha channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes.
    pub rgb: Vec<u8>,
    /// `width * height` bytes, `None` when the image has no alpha channel.
    pub alpha: Option<Vec<u8>>,
}

impl LogoImage {
    /// Decodes a PNG or JPEG image.
    pub fn decode(bytes: &[u8]) -> Result<Self, InvoiceError> {
        let image = image::load_from_memory(bytes)
            .map_err(|error| InvoiceError::resource_fetch("Failed to decode the logo", &error))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(InvoiceError::ResourceFetch(ContextError::with_context(
                "The logo has no pixels",
            )));
        }

        let alpha = image.color().has_alpha().then(|| {
            image
                .to_rgba8()
                .pixels()
                .map(|pixel| pixel.0[3])
                .collect::<Vec<u8>>()
        });

        Ok(LogoImage {
            width: image.width(),
            height: image.height(),
            rgb: image.to_rgb8().into_raw(),
            alpha,
        })
    }

    /// The size of the image once scaled down to fit the given box, one pixel being one point.
    /// The aspect ratio is preserved and the image is never enlarged.
    pub fn fit_within(&self, maximum_width: f32, maximum_height: f32) -> [f32; 2] {
        let (width, height) = (self.width as f32, self.height as f32);
        let scale = (maximum_width / width).min(maximum_height / height).min(1.0);

        [width * scale, height * scale]
    }
}
