//! Textual representation of the numbers that end up on an invoice.

/// Formats an amount with the currency prefix and exactly two decimals.
///
/// The amount is rounded to whole cents, half away from zero, after being scaled by 100
/// in binary floating point. This means that `2.005` (which is stored as `2.00499...`)
/// becomes `2.00`, while `0.125` (stored exactly) becomes `0.13`.
pub fn format_money(amount: f64, currency_symbol: &str) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();

    format!("{sign}{currency_symbol}{}.{:02}", cents / 100, cents % 100)
}

/// Formats a quantity as integer text when it is whole, otherwise with the shortest
/// decimal representation that round-trips (`2`, `2.5`).
pub fn format_quantity(quantity: f64) -> String {
    // Avoid printing `-0`
    let quantity = if quantity == 0.0 { 0.0 } else { quantity };
    format!("{quantity}")
}

/// Derives the file name under which a document for the given client is delivered.
/// Characters which are not allowed in file names are dropped and whitespace is collapsed
/// into dashes, an empty client name yields just the prefix.
pub fn suggested_filename(prefix: &str, client_name: &str) -> String {
    let sanitized = sanitize_filename::sanitize(client_name.trim());
    let stem = sanitized.split_whitespace().collect::<Vec<_>>().join("-");

    if stem.is_empty() {
        format!("{prefix}.pdf")
    } else {
        format!("{prefix}-{stem}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_always_has_two_decimals() {
        assert_eq!(format_money(3.0, "$"), "$3.00");
        assert_eq!(format_money(44.25, "$"), "$44.25");
        assert_eq!(format_money(0.0, "$"), "$0.00");
        assert_eq!(format_money(1234.5, "€"), "€1234.50");
        assert_eq!(format_money(0.1 + 0.2, "$"), "$0.30");
    }

    #[test]
    fn money_rounds_whole_cents_half_away_from_zero() {
        assert_eq!(format_money(2.005, "$"), "$2.00");
        assert_eq!(format_money(0.125, "$"), "$0.13");
        assert_eq!(format_money(1.999, "$"), "$2.00");
        assert_eq!(format_money(-0.125, "$"), "-$0.13");
    }

    #[test]
    fn quantities_are_integer_text_when_whole() {
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(2.5), "2.5");
        assert_eq!(format_quantity(-0.0), "0");
    }

    #[test]
    fn filenames_are_derived_from_the_client() {
        assert_eq!(
            suggested_filename("invoice", "  Ferreteria Del Mallin "),
            "invoice-Ferreteria-Del-Mallin.pdf"
        );
        assert_eq!(suggested_filename("factura", "a/b"), "factura-ab.pdf");
        assert_eq!(suggested_filename("invoice", "   "), "invoice.pdf");
    }
}
