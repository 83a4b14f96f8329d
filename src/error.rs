use serde::{Deserialize, Serialize};

/// A struct that represents an error with a context and possibly the propagated source error.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ContextError {
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source_error {
            Some(source_error) => write!(
                formatter,
                "{}: {}",
                self.context,
                minimize_first_letter(source_error.to_string()),
            ),
            None => write!(formatter, "{}", self.context),
        }
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// Create a new `ContextError` with the given context.
    pub fn with_context<S: Into<String>>(context: S) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: None,
        }
    }

    /// Create a new `ContextError` with the given context and source error.
    pub fn with_error<S: Into<String>>(context: S, error: &dyn std::error::Error) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }
}

/// The kinds of failure an invoice generation can run into. Each kind decides how far
/// the failure is allowed to travel: a `ResourceFetch` error is recovered where it happens
/// (the logo is skipped), the others are surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceError {
    /// The logo could not be fetched or decoded.
    ResourceFetch(ContextError),
    /// The document could not be assembled, serialized or delivered.
    DocumentGeneration(ContextError),
    /// A numeric field or an item position was rejected at the input boundary.
    InvalidInput(ContextError),
    /// A configuration or form snapshot file could not be read.
    Configuration(ContextError),
}

impl InvoiceError {
    pub fn resource_fetch<S: Into<String>>(context: S, error: &dyn std::error::Error) -> Self {
        InvoiceError::ResourceFetch(ContextError::with_error(context, error))
    }

    pub fn generation<S: Into<String>>(context: S, error: &dyn std::error::Error) -> Self {
        InvoiceError::DocumentGeneration(ContextError::with_error(context, error))
    }

    pub fn invalid_input<S: Into<String>>(context: S) -> Self {
        InvoiceError::InvalidInput(ContextError::with_context(context))
    }

    /// The context carried by the error, whatever its kind.
    pub fn context_error(&self) -> &ContextError {
        match self {
            InvoiceError::ResourceFetch(context_error)
            | InvoiceError::DocumentGeneration(context_error)
            | InvoiceError::InvalidInput(context_error)
            | InvoiceError::Configuration(context_error) => context_error,
        }
    }
}

impl std::fmt::Display for InvoiceError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            InvoiceError::ResourceFetch(_) => "Resource fetch error",
            InvoiceError::DocumentGeneration(_) => "Document generation error",
            InvoiceError::InvalidInput(_) => "Invalid input",
            InvoiceError::Configuration(_) => "Configuration error",
        };
        write!(
            formatter,
            "{}: {}",
            kind,
            minimize_first_letter(self.context_error().to_string())
        )
    }
}

impl std::error::Error for InvoiceError {}

/// Minimizes the first letter of a string, it is used for standardizing the error message.
fn minimize_first_letter(string: String) -> String {
    let mut characters = string.chars();
    match characters.next() {
        None => String::new(),
        Some(character) => character.to_lowercase().chain(characters).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_error_chains_the_source_message() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let error = ContextError::with_error("Failed to read the logo", &source);

        assert_eq!(error.to_string(), "Failed to read the logo: no such file");
    }

    #[test]
    fn invoice_error_names_its_kind() {
        let error = InvoiceError::invalid_input("Quantity \"abc\" is not a number");

        assert_eq!(
            error.to_string(),
            "Invalid input: quantity \"abc\" is not a number"
        );
        assert!(matches!(error, InvoiceError::InvalidInput(_)));
    }
}
