//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the store, the engine
//! and the CLI.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Migration identifiers
pub const FIELD_VERSION: &str = "version";

// Collection sizes
pub const FIELD_PENDING_LEN: &str = "pending";
pub const FIELD_APPLIED_LEN: &str = "applied";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
