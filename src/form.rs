use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    builder::InvoiceBuilder,
    error::{ContextError, InvoiceError},
    invoice::{InvoiceDocument, InvoiceRequest, LineItem},
    logo::{LogoReference, ResourceFetcher},
};

/// The editable fields of an item, as the inputs of a form row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Quantity,
    UnitPrice,
}

/// Turns the raw text of a numeric input into a number. Surrounding whitespace is ignored,
/// an empty input counts as zero and a decimal comma is accepted when there is no point.
/// Anything which is not a finite, non-negative number is rejected.
pub fn parse_amount(raw: &str) -> Result<f64, InvoiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let normalized = if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        trimmed.replacen(',', ".", 1)
    };
    let amount = normalized
        .parse::<f64>()
        .map_err(|_| InvoiceError::invalid_input(format!("{raw:?} is not a number")))?;

    check_amount(amount)
}

fn check_amount(amount: f64) -> Result<f64, InvoiceError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(InvoiceError::invalid_input(format!(
            "Expected a finite, non-negative number, found {amount}"
        )));
    }

    // Avoid storing `-0`
    Ok(if amount == 0.0 { 0.0 } else { amount })
}

/// The mutable state behind the invoice form. Every change goes through one of its methods,
/// which coerce raw input into numbers and leave the state untouched when they fail.
/// Generating a document works on a snapshot, so the builder never sees the form itself.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceForm {
    client_name: String,
    contact_email: Option<String>,
    items: Vec<LineItem>,
    logo: Option<LogoReference>,
}

impl Default for InvoiceForm {
    fn default() -> Self {
        InvoiceForm {
            client_name: String::new(),
            contact_email: None,
            items: vec![LineItem::blank()],
            logo: None,
        }
    }
}

impl InvoiceForm {
    /// A form with a single blank item.
    pub fn new() -> Self {
        InvoiceForm::default()
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn contact_email(&self) -> Option<&str> {
        self.contact_email.as_deref()
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn logo(&self) -> Option<&LogoReference> {
        self.logo.as_ref()
    }

    pub fn set_client_name<S: Into<String>>(&mut self, client_name: S) {
        self.client_name = client_name.into();
    }

    /// Sets the contact email, an empty (or blank) one removes it.
    pub fn set_contact_email(&mut self, contact_email: &str) {
        let contact_email = contact_email.trim();
        self.contact_email = (!contact_email.is_empty()).then(|| contact_email.to_string());
    }

    /// Appends a blank item and returns its position.
    pub fn add_item(&mut self) -> usize {
        self.items.push(LineItem::blank());
        self.items.len() - 1
    }

    /// Replaces one field of the item at the given position with the raw input. The
    /// description is taken as-is, numbers go through [`parse_amount`].
    pub fn update_item(
        &mut self,
        index: usize,
        field: ItemField,
        raw_value: &str,
    ) -> Result<(), InvoiceError> {
        let item_count = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or_else(|| missing_item_error(index, item_count))?;

        match field {
            ItemField::Description => item.description = raw_value.to_string(),
            ItemField::Quantity => item.quantity = parse_amount(raw_value)?,
            ItemField::UnitPrice => item.unit_price = parse_amount(raw_value)?,
        }

        Ok(())
    }

    /// Removes the item at the given position, the following ones move up by one.
    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, InvoiceError> {
        if index >= self.items.len() {
            return Err(missing_item_error(index, self.items.len()));
        }

        Ok(self.items.remove(index))
    }

    pub fn set_logo(&mut self, logo: LogoReference) {
        self.logo = Some(logo);
    }

    pub fn clear_logo(&mut self) {
        self.logo = None;
    }

    /// Brings the form back to its initial state.
    pub fn reset(&mut self) {
        *self = InvoiceForm::default();
    }

    /// Copies the current state into a request, with the logo bytes already resolved.
    pub fn snapshot(&self, logo: Option<Vec<u8>>) -> InvoiceRequest {
        InvoiceRequest {
            client_name: self.client_name.clone(),
            contact_email: self.contact_email.clone(),
            items: self.items.clone(),
            logo,
        }
    }

    /// Copies the current state into a request, fetching the logo first. A logo which cannot
    /// be fetched is logged and left out of the snapshot.
    pub fn snapshot_with_logo<F: ResourceFetcher + ?Sized>(&self, fetcher: &F) -> InvoiceRequest {
        let logo = self
            .logo
            .as_ref()
            .and_then(|reference| match fetcher.fetch(reference) {
                Ok(logo_bytes) => Some(logo_bytes),
                Err(error) => {
                    log::warn!("Continuing without the logo: {}", error);
                    None
                }
            });

        self.snapshot(logo)
    }

    /// Builds the document for the current state of the form. When the configuration asks
    /// for it, the form is reset once the document has been generated; a failed generation
    /// leaves it as it was.
    pub fn generate<F: ResourceFetcher + ?Sized>(
        &mut self,
        builder: &InvoiceBuilder,
        fetcher: &F,
    ) -> Result<InvoiceDocument, InvoiceError> {
        let request = self.snapshot_with_logo(fetcher);
        let document = builder.build(&request)?;

        if builder.configuration().reset_after_generate {
            log::debug!("Resetting the form after generating {}", document.filename);
            self.reset();
        }

        Ok(document)
    }
}

fn missing_item_error(index: usize, item_count: usize) -> InvoiceError {
    InvoiceError::invalid_input(format!(
        "There is no item at position {index}, the form has {item_count} items"
    ))
}

/// A number as it may come from a form: either already numeric or the raw text of an input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn one() -> Self {
        RawAmount::Number(1.0)
    }

    pub fn resolve(&self) -> Result<f64, InvoiceError> {
        match self {
            RawAmount::Number(amount) => check_amount(*amount),
            RawAmount::Text(raw) => parse_amount(raw),
        }
    }
}

impl Default for RawAmount {
    fn default() -> Self {
        RawAmount::Number(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineItem {
    #[serde(default)]
    pub description: String,
    #[serde(default = "RawAmount::one")]
    pub quantity: RawAmount,
    #[serde(default)]
    pub unit_price: RawAmount,
}

/// The contents of a form as stored in a JSON file, before any input coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSnapshot {
    pub client_name: String,
    pub contact_email: Option<String>,
    pub items: Vec<RawLineItem>,
    /// A logo reference, see [`LogoReference`].
    pub logo: Option<String>,
}

impl FormSnapshot {
    pub fn from_path(form_file_path: &Path) -> Result<Self, InvoiceError> {
        let form_file_contents = std::fs::read_to_string(form_file_path).map_err(|error| {
            InvoiceError::Configuration(ContextError::with_error(
                format!("Failed to read the form file {:?}", form_file_path),
                &error,
            ))
        })?;
        let form_snapshot: FormSnapshot =
            serde_json::from_str(&form_file_contents).map_err(|error| {
                InvoiceError::Configuration(ContextError::with_error(
                    format!("Failed to parse the form file {:?}", form_file_path),
                    &error,
                ))
            })?;
        log::debug!(
            "Loaded a form with {} items from {:?}",
            form_snapshot.items.len(),
            form_file_path
        );

        Ok(form_snapshot)
    }

    /// Coerces every field into a form, failing on the first number which is not valid.
    pub fn into_form(self) -> Result<InvoiceForm, InvoiceError> {
        let mut form = InvoiceForm::new();
        form.set_client_name(self.client_name);
        form.set_contact_email(self.contact_email.as_deref().unwrap_or_default());
        if let Some(logo) = self.logo.filter(|logo| !logo.trim().is_empty()) {
            // Parsing a logo reference cannot fail
            if let Ok(logo) = logo.parse::<LogoReference>() {
                form.set_logo(logo);
            }
        }

        form.items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, raw_item)| {
                let resolve = |amount: &RawAmount, field_name: &str| {
                    amount.resolve().map_err(|error| {
                        InvoiceError::invalid_input(format!(
                            "Invalid {} for item {}: {}",
                            field_name,
                            index + 1,
                            error.context_error()
                        ))
                    })
                };

                Ok(LineItem {
                    quantity: resolve(&raw_item.quantity, "quantity")?,
                    unit_price: resolve(&raw_item.unit_price, "unit price")?,
                    description: raw_item.description,
                })
            })
            .collect::<Result<Vec<_>, InvoiceError>>()?;

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::InvoiceConfiguration;
    use std::cell::Cell;

    /// Counts the fetches and fails every one of them.
    #[derive(Default)]
    struct UnreachableFetcher {
        fetch_count: Cell<usize>,
    }

    impl ResourceFetcher for UnreachableFetcher {
        fn fetch(&self, reference: &LogoReference) -> Result<Vec<u8>, InvoiceError> {
            self.fetch_count.set(self.fetch_count.get() + 1);
            Err(InvoiceError::ResourceFetch(ContextError::with_context(
                format!("{reference} is unreachable"),
            )))
        }
    }

    fn hardware_store_form() -> InvoiceForm {
        let mut form = InvoiceForm::new();
        form.set_client_name("Ferreteria Del Mallin");
        form.update_item(0, ItemField::Description, "Hammer").unwrap();
        form.update_item(0, ItemField::Quantity, "2").unwrap();
        form.update_item(0, ItemField::UnitPrice, "15.50").unwrap();
        let index = form.add_item();
        form.update_item(index, ItemField::Description, "Nails box").unwrap();
        form.update_item(index, ItemField::Quantity, " 3 ").unwrap();
        form.update_item(index, ItemField::UnitPrice, "4,25").unwrap();
        form
    }

    #[test]
    fn amounts_are_coerced_at_the_boundary() {
        assert_eq!(parse_amount("15.50").unwrap(), 15.5);
        assert_eq!(parse_amount(" 4,25 ").unwrap(), 4.25);
        assert_eq!(parse_amount("").unwrap(), 0.0);
        assert_eq!(parse_amount("   ").unwrap(), 0.0);
        assert_eq!(parse_amount("-0").unwrap().to_bits(), 0.0f64.to_bits());

        for raw in ["abc", "-1", "NaN", "inf", "1.000,50", "12 units"] {
            let error = parse_amount(raw).unwrap_err();
            assert!(matches!(error, InvoiceError::InvalidInput(_)), "{raw}: {error}");
        }
    }

    #[test]
    fn forms_start_with_one_blank_item() {
        let form = InvoiceForm::new();

        assert_eq!(form.items(), [LineItem::blank()]);
        assert_eq!(form.client_name(), "");
        assert_eq!(form.contact_email(), None);
        assert_eq!(form.logo(), None);
    }

    #[test]
    fn updates_coerce_numbers() {
        let form = hardware_store_form();

        assert_eq!(
            form.items(),
            [
                LineItem::new("Hammer", 2.0, 15.5),
                LineItem::new("Nails box", 3.0, 4.25)
            ]
        );
        assert_eq!(form.snapshot(None).total(), 44.25);
    }

    #[test]
    fn rejected_updates_leave_the_form_untouched() {
        let mut form = hardware_store_form();
        let before = form.clone();

        assert!(form.update_item(0, ItemField::Quantity, "two").is_err());
        assert!(form.update_item(1, ItemField::UnitPrice, "-4").is_err());
        assert!(form.update_item(2, ItemField::Description, "Saw").is_err());
        assert!(form.remove_item(2).is_err());
        assert_eq!(form, before);
    }

    #[test]
    fn removal_keeps_the_order_of_the_others() {
        let mut form = InvoiceForm::new();
        for index in 1..5 {
            let position = form.add_item();
            form.update_item(position, ItemField::Description, &format!("Item {index}"))
                .unwrap();
        }

        let removed = form.remove_item(2).unwrap();

        assert_eq!(removed.description, "Item 2");
        let descriptions = form
            .items()
            .iter()
            .map(|item| item.description.as_str())
            .collect::<Vec<_>>();
        assert_eq!(descriptions, ["", "Item 1", "Item 3", "Item 4"]);
    }

    #[test]
    fn blank_emails_are_cleared() {
        let mut form = InvoiceForm::new();
        form.set_contact_email(" ventas@example.com ");
        assert_eq!(form.contact_email(), Some("ventas@example.com"));

        form.set_contact_email("  ");
        assert_eq!(form.contact_email(), None);
    }

    #[test]
    fn reset_goes_back_to_the_initial_state() {
        let mut form = hardware_store_form();
        form.set_contact_email("ventas@example.com");
        form.set_logo(LogoReference::File("logo.png".into()));

        form.reset();

        assert_eq!(form, InvoiceForm::new());
    }

    #[test]
    fn snapshots_do_not_follow_later_changes() {
        let mut form = hardware_store_form();
        let snapshot = form.snapshot(None);

        form.remove_item(0).unwrap();
        form.set_client_name("Someone else");

        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.client_name, "Ferreteria Del Mallin");
    }

    #[test]
    fn unreachable_logos_are_left_out() {
        let fetcher = UnreachableFetcher::default();
        let mut form = hardware_store_form();

        assert_eq!(form.snapshot_with_logo(&fetcher).logo, None);
        assert_eq!(fetcher.fetch_count.get(), 0);

        form.set_logo(LogoReference::Url("https://example.com/logo.png".into()));
        let request = form.snapshot_with_logo(&fetcher);

        assert_eq!(request.logo, None);
        assert_eq!(request.items.len(), 2);
        assert_eq!(fetcher.fetch_count.get(), 1);
    }

    #[test]
    fn generation_resets_only_when_configured_and_successful() {
        let fetcher = UnreachableFetcher::default();

        let mut form = hardware_store_form();
        form.generate(&InvoiceBuilder::default(), &fetcher).unwrap();
        assert_eq!(form, hardware_store_form());

        let resetting_builder = InvoiceBuilder::new(InvoiceConfiguration {
            reset_after_generate: true,
            ..InvoiceConfiguration::default()
        });
        let document = form.generate(&resetting_builder, &fetcher).unwrap();
        assert!(document.bytes.starts_with(b"%PDF-"));
        assert_eq!(document.filename, "invoice-Ferreteria-Del-Mallin.pdf");
        assert_eq!(form, InvoiceForm::new());

        let mut failing_configuration = resetting_builder.configuration().clone();
        failing_configuration.fonts.regular_font_path = Some("does/not/exist.ttf".into());
        let mut form = hardware_store_form();
        let error = form
            .generate(&InvoiceBuilder::new(failing_configuration), &fetcher)
            .unwrap_err();
        assert!(matches!(error, InvoiceError::DocumentGeneration(_)), "{}", error);
        assert_eq!(form, hardware_store_form());
    }

    #[test]
    fn snapshots_accept_numbers_and_raw_text() {
        let form_snapshot: FormSnapshot = serde_json::from_str(
            r#"{
                "clientName": "Ferreteria Del Mallin",
                "contactEmail": "",
                "items": [
                    {"description": "Hammer", "quantity": 2, "unitPrice": "15.50"},
                    {"description": "Nails box", "quantity": "3", "unitPrice": 4.25},
                    {"description": "Gift"}
                ],
                "logo": "https://example.com/logo.png"
            }"#,
        )
        .unwrap();

        let form = form_snapshot.into_form().unwrap();

        assert_eq!(form.contact_email(), None);
        assert_eq!(
            form.logo(),
            Some(&LogoReference::Url("https://example.com/logo.png".into()))
        );
        assert_eq!(
            form.items(),
            [
                LineItem::new("Hammer", 2.0, 15.5),
                LineItem::new("Nails box", 3.0, 4.25),
                LineItem::new("Gift", 1.0, 0.0)
            ]
        );
    }

    #[test]
    fn invalid_snapshot_numbers_name_the_item() {
        let form_snapshot: FormSnapshot = serde_json::from_str(
            r#"{"items": [{"quantity": 1}, {"description": "Saw", "unitPrice": -3}]}"#,
        )
        .unwrap();

        let error = form_snapshot.into_form().unwrap_err();

        assert!(matches!(error, InvoiceError::InvalidInput(_)));
        assert!(
            error.context_error().context.starts_with("Invalid unit price for item 2"),
            "{}",
            error
        );
    }

    #[test]
    fn empty_snapshots_give_empty_forms() {
        let form = FormSnapshot::default().into_form().unwrap();

        assert!(form.items().is_empty());
        assert_eq!(form.logo(), None);
    }
}
