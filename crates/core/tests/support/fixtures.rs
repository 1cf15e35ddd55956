//! Invoice and customer builders

use chrono::NaiveDate;
use taxbridge_domain::{CustomerData, InvoiceItem, InvoiceLine};

/// A valid single-line item for `customer_id`.
pub fn item(external_id: &str, customer_id: &str) -> InvoiceItem {
    InvoiceItem {
        external_id: external_id.to_string(),
        customer_id: Some(customer_id.to_string()),
        issue_date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
        currency: "MYR".to_string(),
        lines: vec![InvoiceLine {
            description: "Consulting".to_string(),
            quantity: 1.0,
            unit_price: 250.0,
            tax_rate: 0.08,
        }],
        note: None,
    }
}

/// A customer with every cross-referenced field present.
pub fn customer(customer_id: &str) -> CustomerData {
    CustomerData {
        customer_id: customer_id.to_string(),
        name: format!("Customer {customer_id}"),
        tin: Some(format!("TIN-{customer_id}")),
        id_type: Some("BRN".to_string()),
        id_number: Some(format!("ID-{customer_id}")),
        phone_number: Some("+60123456789".to_string()),
        address: Some("1 Jalan Test".to_string()),
        email: None,
    }
}

/// Same as [`customer`] without a phone number.
pub fn customer_without_phone(customer_id: &str) -> CustomerData {
    CustomerData { phone_number: None, ..customer(customer_id) }
}
