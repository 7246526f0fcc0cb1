//! Metrics collection.
//!
//! # Metrics
//! - `mgmt_connector_requests_total` (counter): requests reaching the connector
//! - `mgmt_connector_auth_failures_total` (counter): rejected credentials
//! - `mgmt_connector_access_denied_total` (counter): access-file denials
//!
//! # Design Decisions
//! - No exporter is installed here; without a recorder the counters are no-ops
//! - Descriptions are registered once by the binaries

pub const REQUESTS_TOTAL: &str = "mgmt_connector_requests_total";
pub const AUTH_FAILURES_TOTAL: &str = "mgmt_connector_auth_failures_total";
pub const ACCESS_DENIED_TOTAL: &str = "mgmt_connector_access_denied_total";

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Requests received by the management connector");
    metrics::describe_counter!(AUTH_FAILURES_TOTAL, "Connector requests rejected by the authenticator");
    metrics::describe_counter!(ACCESS_DENIED_TOTAL, "Connector operations denied by the access file");
}
