//! Smoke test for the telemetry stack without a collector. Lives in its own
//! file because `init_telemetry` installs the process-global subscriber and
//! can only run once per test binary.

use valuation_client::Config;
use valuation_client::telemetry::init_telemetry;

#[test]
fn test_init_telemetry_with_exporters_disabled() {
    let config = Config {
        environment: "test".to_string(),
        backend_base_url: "http://localhost:8087".to_string(),
        request_timeout_secs: 5,
        max_retries: 1,
        demo_mode: false,
        comparable_limit: 12,
        valora_base_url: "https://api.valora-estimates.example/v2".to_string(),
        valora_api_key: None,
        valora_account: None,
        prepared_by: None,
        otel_service_name: "valuation-client".to_string(),
        otel_exporter_endpoint: "http://localhost:4317".to_string(),
        otel_disabled: true,
    };

    let guard = init_telemetry(&config).expect("fmt-only stack must come up");
    tracing::info!("subscriber is live");

    // No exporters were started, so shutdown must be a clean no-op.
    guard.shutdown();
}
