use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub backend_base_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub demo_mode: bool,
    pub comparable_limit: usize,
    pub valora_base_url: String,
    pub valora_api_key: Option<String>,
    pub valora_account: Option<String>,
    pub prepared_by: Option<String>,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
    pub otel_disabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            backend_base_url: env::var("VALUATION_BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:8087".to_string()),
            request_timeout_secs: env::var("VALUATION_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("VALUATION_REQUEST_TIMEOUT_SECS must be a number"),
            max_retries: env::var("VALUATION_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("VALUATION_MAX_RETRIES must be a number"),
            demo_mode: env::var("VALUATION_DEMO_MODE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .expect("VALUATION_DEMO_MODE must be true or false"),
            comparable_limit: env::var("VALUATION_COMPARABLE_LIMIT")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .expect("VALUATION_COMPARABLE_LIMIT must be a number"),
            valora_base_url: env::var("VALORA_BASE_URL")
                .unwrap_or_else(|_| "https://api.valora-estimates.example/v2".to_string()),
            valora_api_key: env::var("VALORA_API_KEY").ok(),
            valora_account: env::var("VALORA_ACCOUNT").ok(),
            prepared_by: env::var("REPORT_PREPARED_BY").ok(),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "valuation-client".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            otel_disabled: env::var("OTEL_SDK_DISABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
