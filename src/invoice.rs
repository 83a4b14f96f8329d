use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::InvoiceError;

/// One row of the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn new<S: Into<String>>(description: S, quantity: f64, unit_price: f64) -> Self {
        LineItem {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// The blank item a form starts with: one unit of nothing, at no cost.
    pub fn blank() -> Self {
        LineItem::new("", 1.0, 0.0)
    }

    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// The full input snapshot for one document generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRequest {
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Raw bytes of the logo image, which are decoded only while building the document.
    #[serde(default, skip)]
    pub logo: Option<Vec<u8>>,
}

impl InvoiceRequest {
    /// Sum of all the subtotals, computed anew on every call.
    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    /// Checks that every quantity and unit price is a finite, non-negative number, and that
    /// every subtotal as well as the total can be written down as a whole number of cents.
    /// The first offending field is reported together with its position.
    pub fn validate(&self) -> Result<(), InvoiceError> {
        for (index, item) in self.items.iter().enumerate() {
            for (field_name, value) in [("quantity", item.quantity), ("unit price", item.unit_price)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(InvoiceError::invalid_input(format!(
                        "The {} of item {} must be a finite, non-negative number, found {}",
                        field_name,
                        index + 1,
                        value
                    )));
                }
            }
            if !is_representable_amount(item.subtotal()) {
                return Err(InvoiceError::invalid_input(format!(
                    "The subtotal of item {} is too large, found {} times {}",
                    index + 1,
                    item.quantity,
                    item.unit_price
                )));
            }
        }

        let total = self.total();
        if !is_representable_amount(total) {
            return Err(InvoiceError::invalid_input(format!(
                "The total is too large, found {total}"
            )));
        }

        Ok(())
    }

    /// A 32 characters-long identifier which depends only on the contents of the request,
    /// so that equal snapshots produce byte-identical documents.
    pub fn document_identifier(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.client_name.as_bytes());
        hasher.update([0]);
        if let Some(contact_email) = &self.contact_email {
            hasher.update(contact_email.as_bytes());
        }
        hasher.update([0]);
        for item in &self.items {
            hasher.update(item.description.as_bytes());
            hasher.update([0]);
            hasher.update(item.quantity.to_le_bytes());
            hasher.update(item.unit_price.to_le_bytes());
        }
        if let Some(logo) = &self.logo {
            hasher.update(logo);
        }

        hex::encode(&hasher.finalize()[..16])
    }
}

/// Whether the amount is finite and fits into the cents `format_money` rounds it to.
fn is_representable_amount(amount: f64) -> bool {
    amount.is_finite() && (amount * 100.0).abs() < i64::MAX as f64
}

/// The generated output artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng as _;

    fn hardware_store_request() -> InvoiceRequest {
        InvoiceRequest {
            client_name: "Ferreteria Del Mallin".into(),
            contact_email: None,
            items: vec![
                LineItem::new("Hammer", 2.0, 15.50),
                LineItem::new("Nails box", 3.0, 4.25),
            ],
            logo: None,
        }
    }

    #[test]
    fn total_is_the_sum_of_subtotals() {
        assert_eq!(hardware_store_request().total(), 44.25);
        assert_eq!(InvoiceRequest::default().total(), 0.0);
    }

    #[test]
    fn total_matches_random_item_lists() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let items: Vec<_> = (0..rng.gen_range(0..30))
                .map(|_| {
                    LineItem::new(
                        "item",
                        rng.gen_range(0..100) as f64,
                        rng.gen_range(0..100_000) as f64 / 100.0,
                    )
                })
                .collect();
            let expected = items
                .iter()
                .fold(0.0, |sum, item| sum + item.quantity * item.unit_price);
            let request = InvoiceRequest {
                items,
                ..Default::default()
            };

            assert_eq!(request.total(), expected);
        }
    }

    #[test]
    fn validation_rejects_negative_and_non_finite_numbers() {
        assert!(hardware_store_request().validate().is_ok());

        for (quantity, unit_price) in [(-1.0, 1.0), (1.0, f64::NAN), (f64::INFINITY, 1.0)] {
            let mut request = hardware_store_request();
            request.items[1] = LineItem::new("Broken", quantity, unit_price);

            let error = request.validate().unwrap_err();
            assert!(matches!(error, InvoiceError::InvalidInput(_)));
            assert!(error.to_string().contains("item 2"), "{}", error);
        }
    }

    #[test]
    fn validation_rejects_amounts_too_large_to_print() {
        for item in [
            LineItem::new("Huge", 1e10, 1e10),
            LineItem::new("Infinite", 1e200, 1e200),
        ] {
            let request = InvoiceRequest {
                items: vec![item],
                ..Default::default()
            };

            let error = request.validate().unwrap_err();
            assert!(matches!(error, InvoiceError::InvalidInput(_)));
            assert!(error.to_string().contains("item 1"), "{}", error);
        }

        // Every subtotal fits, but their sum does not
        let request = InvoiceRequest {
            items: vec![LineItem::new("Large", 1.0, 6e16); 2],
            ..Default::default()
        };
        let error = request.validate().unwrap_err();
        assert!(error.to_string().contains("total"), "{}", error);

        let request = InvoiceRequest {
            items: vec![LineItem::new("Large", 1.0, 6e16)],
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn identifier_follows_the_contents() {
        let request = hardware_store_request();
        let mut other_request = hardware_store_request();
        other_request.items[0].quantity = 3.0;

        assert_eq!(request.document_identifier().len(), 32);
        assert_eq!(request.document_identifier(), request.clone().document_identifier());
        assert_ne!(request.document_identifier(), other_request.document_identifier());
    }

    #[test]
    fn requests_deserialize_from_camel_case() {
        let request: InvoiceRequest = serde_json::from_str(
            r#"{"clientName": "Ana", "items": [{"description": "Saw", "quantity": 1, "unitPrice": 9.5}]}"#,
        )
        .unwrap();

        assert_eq!(request.items, vec![LineItem::new("Saw", 1.0, 9.5)]);
        assert_eq!(request.contact_email, None);
    }
}
