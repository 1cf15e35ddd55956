//! JSON document codec for the intake service
//!
//! Serializes an invoice item plus its customer reference data into the wire
//! invoice the intake service validates, stamps the SHA-256 content hash, and
//! provides the base64 transport encoding used in the submit body.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use sha2::{Digest, Sha256};
use taxbridge_core::DocumentCodec;
use taxbridge_domain::{
    CustomerData, Document, DocumentFormat, InvoiceItem, InvoiceLine, Result, TaxBridgeError,
};

/// Encodes invoice items as JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentCodec;

impl JsonDocumentCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for JsonDocumentCodec {
    fn encode(&self, item: &InvoiceItem, customer: &CustomerData) -> Result<Document> {
        let invoice = WireInvoice::build(item, customer)?;
        let payload = serde_json::to_vec(&invoice)
            .map_err(|e| TaxBridgeError::Internal(format!("failed to serialize invoice: {e}")))?;
        let hash = content_hash(&payload);

        Ok(Document::new(item.external_id.clone(), payload, hash, DocumentFormat::Json))
    }
}

/// Lowercase hex SHA-256 of the payload bytes.
pub fn content_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Standard (padded) base64 of the payload, as carried in the submit body.
pub fn encode_transport(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Decode a transport-encoded payload.
pub fn decode_transport(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| TaxBridgeError::Internal(format!("invalid base64 document: {e}")))
}

/// True when `hash` is the content hash of `payload` (case-insensitive hex).
pub fn verify_content_hash(payload: &[u8], hash: &str) -> bool {
    content_hash(payload).eq_ignore_ascii_case(hash.trim())
}

// =============================================================================
// Wire invoice
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInvoice<'a> {
    code_number: &'a str,
    issue_date: String,
    currency: &'a str,
    buyer: WireParty<'a>,
    lines: Vec<WireLine<'a>>,
    totals: WireTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireParty<'a> {
    name: &'a str,
    tin: &'a str,
    id_type: &'a str,
    id_number: &'a str,
    phone_number: &'a str,
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireLine<'a> {
    description: &'a str,
    quantity: f64,
    unit_price: f64,
    tax_rate: f64,
    subtotal: f64,
    tax_amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTotals {
    subtotal: f64,
    tax_total: f64,
    total: f64,
}

impl<'a> WireInvoice<'a> {
    fn build(item: &'a InvoiceItem, customer: &'a CustomerData) -> Result<Self> {
        let buyer = WireParty {
            name: &customer.name,
            tin: required(customer, "tin", customer.tin.as_deref())?,
            id_type: required(customer, "id_type", customer.id_type.as_deref())?,
            id_number: required(customer, "id_number", customer.id_number.as_deref())?,
            phone_number: required(customer, "phone_number", customer.phone_number.as_deref())?,
            address: required(customer, "address", customer.address.as_deref())?,
            email: customer.email.as_deref(),
        };

        Ok(Self {
            code_number: &item.external_id,
            issue_date: item.issue_date.format("%Y-%m-%d").to_string(),
            currency: &item.currency,
            buyer,
            lines: item.lines.iter().map(WireLine::from).collect(),
            totals: WireTotals {
                subtotal: round2(item.subtotal()),
                tax_total: round2(item.tax_total()),
                total: round2(item.total()),
            },
            note: item.note.as_deref(),
        })
    }
}

impl<'a> From<&'a InvoiceLine> for WireLine<'a> {
    fn from(line: &'a InvoiceLine) -> Self {
        Self {
            description: &line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            tax_rate: line.tax_rate,
            subtotal: round2(line.subtotal()),
            tax_amount: round2(line.tax_amount()),
        }
    }
}

fn required<'a>(
    customer: &CustomerData,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(TaxBridgeError::LocalValidation(format!(
            "{field} missing for customer {}",
            customer.customer_id
        ))),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
