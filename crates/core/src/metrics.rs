//! Metric names and descriptions.
//!
//! Every crate records through the `metrics` macros using these constants.
//! No exporter is installed by the harness itself, so recording is a no-op
//! unless the host process installs a recorder.
//!
//! # Naming
//!
//! - prefix: `sonarcheck_`
//! - suffix: `_total` (counter), `_seconds` (histogram)
//!
//! ```ignore
//! use metrics::counter;
//! counter!(sonarcheck_core::metrics::SCANNER_RUNS_TOTAL).increment(1);
//! ```

/// Endpoint label key (`/api/issues/search`, ...)
pub const LABEL_ENDPOINT: &str = "endpoint";

/// Result label key (`success`, `failure`)
pub const LABEL_RESULT: &str = "result";

/// Scenario kind label key (`language`, `tool`, `import`)
pub const LABEL_KIND: &str = "kind";

/// One-shot scanner/tool containers run (counter, label: result)
pub const SCANNER_RUNS_TOTAL: &str = "sonarcheck_scanner_runs_total";

/// Quality server API requests (counter, labels: endpoint, result)
pub const API_REQUESTS_TOTAL: &str = "sonarcheck_api_requests_total";

/// Log polls made while waiting for readiness (counter)
pub const READINESS_POLLS_TOTAL: &str = "sonarcheck_readiness_polls_total";

/// Time spent waiting for readiness (histogram, seconds)
pub const READINESS_WAIT_SECONDS: &str = "sonarcheck_readiness_wait_seconds";

/// Scenarios executed (counter, labels: kind, result)
pub const SCENARIOS_TOTAL: &str = "sonarcheck_scenarios_total";

/// Registers descriptions for every metric above.
///
/// Call once after installing a recorder.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        SCANNER_RUNS_TOTAL,
        "One-shot scanner or analysis tool containers run"
    );
    describe_counter!(
        API_REQUESTS_TOTAL,
        "Requests sent to the quality server API, by endpoint and result"
    );
    describe_counter!(
        READINESS_POLLS_TOTAL,
        "Container log polls made while waiting for the readiness marker"
    );
    describe_histogram!(
        READINESS_WAIT_SECONDS,
        "Time spent waiting for the quality server to become ready"
    );
    describe_counter!(SCENARIOS_TOTAL, "Scenarios executed, by kind and result");
}
