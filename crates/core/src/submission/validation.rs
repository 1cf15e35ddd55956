//! Local validation rules
//!
//! Items that fail here never reach the network. Every rule runs, so a
//! single pass reports all missing fields.

use std::fmt;

use taxbridge_domain::{CustomerData, InvoiceItem};

/// One failed validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join violations into one message for a `LocalValidationFailed` outcome.
#[must_use]
pub fn describe(violations: &[FieldViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Check the fields of an item that can be validated without lookups.
#[must_use]
pub fn validate_item(item: &InvoiceItem) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if item.external_id.trim().is_empty() {
        violations.push(FieldViolation::new("external_id", "is required"));
    }
    if item.customer_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
        violations.push(FieldViolation::new("customer_id", "is required"));
    }
    let currency = item.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        violations.push(FieldViolation::new("currency", "must be a three-letter code"));
    }
    if item.lines.is_empty() {
        violations.push(FieldViolation::new("lines", "at least one line is required"));
    }
    for (idx, line) in item.lines.iter().enumerate() {
        // Non-finite amounts serialize as JSON null.
        if !line.quantity.is_finite() || line.quantity <= 0.0 {
            violations.push(FieldViolation::new(
                "lines.quantity",
                format!("line {} must have a positive quantity", idx + 1),
            ));
        }
        if !line.unit_price.is_finite() || line.unit_price < 0.0 {
            violations.push(FieldViolation::new(
                "lines.unit_price",
                format!("line {} has an invalid unit price", idx + 1),
            ));
        }
        if !line.tax_rate.is_finite() || line.tax_rate < 0.0 {
            violations.push(FieldViolation::new(
                "lines.tax_rate",
                format!("line {} has an invalid tax rate", idx + 1),
            ));
        }
    }

    violations
}

/// Check the customer fields the intake service cross-references.
#[must_use]
pub fn validate_customer(customer: &CustomerData) -> Vec<FieldViolation> {
    let required = [
        ("tin", &customer.tin),
        ("id_type", &customer.id_type),
        ("id_number", &customer.id_number),
        ("phone_number", &customer.phone_number),
        ("address", &customer.address),
    ];

    required
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(field, _)| {
            FieldViolation::new(field, format!("missing for customer {}", customer.customer_id))
        })
        .collect()
}
