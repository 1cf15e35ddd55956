//! Protocol constants
//!
//! Centralized location for the remote intake protocol's paths and the
//! pipeline's default tuning values.

// Remote endpoints
pub const TOKEN_PATH: &str = "/connect/token";
pub const SUBMISSIONS_PATH: &str = "/api/v1.0/documentsubmissions";
pub const DOCUMENTS_PATH: &str = "/api/v1.0/documents";

// Credential lifecycle
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;
pub const DEFAULT_TOKEN_SCOPE: &str = "InvoicingAPI";

// Polling
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_HEURISTIC_MIN_ATTEMPT: u32 = 9;
pub const DEFAULT_HEURISTIC_REQUIRED_STREAK: u32 = 2;
pub const DEFAULT_HEURISTIC_SUB_STATUS: &str = "Submitted";

// Encoding
pub const DEFAULT_ENCODE_CONCURRENCY: usize = 5;

// Reference-data cache
pub const DEFAULT_REFERENCE_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_REFERENCE_CACHE_MAX_CAPACITY: u64 = 1000;

// HTTP
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
