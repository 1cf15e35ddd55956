//! Invoice-like items handed to the pipeline and the customer reference data
//! they are validated against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A locally finalized invoice awaiting submission.
///
/// `external_id` is the caller's own invoice number. It is sent as the
/// document's code number and is the key every outcome is reported under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub external_id: String,
    pub customer_id: Option<String>,
    pub issue_date: NaiveDate,
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl InvoiceItem {
    /// Sum of all line subtotals, before tax.
    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(InvoiceLine::subtotal).sum()
    }

    /// Sum of all line taxes.
    pub fn tax_total(&self) -> f64 {
        self.lines.iter().map(InvoiceLine::tax_amount).sum()
    }

    /// Payable amount including tax.
    pub fn total(&self) -> f64 {
        self.subtotal() + self.tax_total()
    }
}

/// One line of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Tax rate as a percentage (e.g. `6.0` for 6%).
    #[serde(default)]
    pub tax_rate: f64,
}

impl InvoiceLine {
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }

    pub fn tax_amount(&self) -> f64 {
        self.subtotal() * self.tax_rate / 100.0
    }
}

/// Customer reference data looked up by `InvoiceItem::customer_id`.
///
/// The remote validator cross-checks the buyer's identifiers, so the
/// mandatory ones are modelled as optional here and enforced by local
/// validation before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerData {
    pub customer_id: String,
    pub name: String,
    pub tin: Option<String>,
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
}
