use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::analysis::AnalysisClient;
use super::demo::demo_valuation;
use super::streaming::{AppraisalEvent, collect_stream_with};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::form::AppraisalForm;
use crate::telemetry::metrics::{
    VALUATION_ERROR_COUNT, VALUATION_FALLBACK_COUNT, VALUATION_OPERATION_DURATION,
    VALUATION_RETRY_COUNT,
};
use crate::valuation::{Valuation, ValuationSource};

/// The seam between the CLI and the divergent backends.
#[async_trait::async_trait]
pub trait ValuationProvider: Send + Sync {
    async fn appraise(&self, form: &AppraisalForm) -> anyhow::Result<Valuation>;
    fn name(&self) -> &str;
    fn source(&self) -> ValuationSource;
    fn endpoint(&self) -> String;
}

/// Facade over a provider: validation gate, bounded retries, demo-mode
/// short-circuit, and a demo fallback when the backend cannot be reached
/// at all. Application-level rejections always propagate.
pub struct ValuationClient {
    pub provider: Arc<dyn ValuationProvider>,
    pub config: Config,
}

impl ValuationClient {
    pub fn new(provider: Arc<dyn ValuationProvider>, config: Config) -> Self {
        Self { provider, config }
    }

    pub async fn appraise_once(&self, form: &AppraisalForm) -> anyhow::Result<Valuation> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("valuation.appraise {provider_name}");
        let start = Instant::now();

        let span = tracing::info_span!(
            "valuation.appraise",
            otel.name = %span_display_name,
            valuation.provider.name = %provider_name,
            valuation.request.kind = form.property.kind.label(),
            valuation.request.purpose = form.purpose.label(),
            valuation.reference = form.reference.as_deref().unwrap_or(""),
            server.address = %self.provider.endpoint(),
            valuation.response.model = tracing::field::Empty,
            valuation.market_value = tracing::field::Empty,
            valuation.confidence = tracing::field::Empty,
            valuation.comparables = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        span.add_event(
            "valuation.request",
            vec![KeyValue::new(
                "valuation.address",
                truncate(
                    &format!(
                        "{}, {} {}",
                        form.address.street, form.address.postal_code, form.address.city
                    ),
                    200,
                ),
            )],
        );

        let result = self.provider.appraise(form).instrument(span.clone()).await;

        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(valuation) => {
                span.record("valuation.response.model", valuation.model.as_str());
                span.record("valuation.market_value", valuation.market_value);
                span.record("valuation.confidence", valuation.confidence);
                span.record("valuation.comparables", valuation.comparables.len() as i64);

                VALUATION_OPERATION_DURATION.record(
                    duration,
                    &[
                        KeyValue::new("valuation.provider.name", provider_name),
                        KeyValue::new("valuation.request.kind", form.property.kind.label()),
                    ],
                );

                Ok(valuation)
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", classify_error(&err));

                VALUATION_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("valuation.provider.name", provider_name),
                        KeyValue::new("error.type", classify_error(&err)),
                    ],
                );

                Err(err)
            }
        }
    }

    pub async fn appraise_with_retry(&self, form: &AppraisalForm) -> anyhow::Result<Valuation> {
        let max_retries = self.config.max_retries.max(1);
        let mut last_err = None;

        for attempt in 0..max_retries {
            match self.appraise_once(form).await {
                Ok(valuation) => return Ok(valuation),
                Err(err) => {
                    // Application-level rejections will not change on retry.
                    if err.downcast_ref::<AppError>().is_some() {
                        return Err(err);
                    }

                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        provider = self.provider.name(),
                        error = %err,
                        "valuation call failed, retrying"
                    );

                    if attempt > 0 {
                        VALUATION_RETRY_COUNT.add(
                            1,
                            &[KeyValue::new(
                                "valuation.provider.name",
                                self.provider.name().to_string(),
                            )],
                        );
                    }

                    last_err = Some(err);

                    if attempt < max_retries - 1 {
                        let base = Duration::from_secs(1) * 2u32.pow(attempt);
                        let base = base.min(Duration::from_secs(10));
                        // 25% jitter to avoid thundering herd
                        let jitter_ms = fastrand::u64(0..=base.as_millis() as u64 / 4);
                        let delay = base + Duration::from_millis(jitter_ms);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("all retries exhausted")))
    }

    /// Blocking appraisal with the full facade behavior.
    pub async fn appraise(&self, form: &AppraisalForm) -> AppResult<Valuation> {
        form.ensure_valid()?;

        if self.config.demo_mode {
            tracing::info!("demo mode is on, skipping the backend");
            return Ok(demo_valuation(form, Utc::now().date_naive()));
        }

        match self.appraise_with_retry(form).await {
            Ok(valuation) => Ok(valuation),
            Err(err) if is_connect_failure(&err) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    endpoint = %self.provider.endpoint(),
                    error = %err,
                    "backend unreachable, falling back to demo data"
                );
                VALUATION_FALLBACK_COUNT.add(
                    1,
                    &[KeyValue::new(
                        "valuation.provider.name",
                        self.provider.name().to_string(),
                    )],
                );
                Ok(demo_valuation(form, Utc::now().date_naive()))
            }
            Err(err) => Err(self.to_app_error(err)),
        }
    }

    /// Streaming appraisal. `on_event` sees every event as it arrives;
    /// the return value is the folded final valuation. Only the analysis
    /// backend streams.
    pub async fn appraise_streamed<F>(
        &self,
        form: &AppraisalForm,
        on_event: F,
    ) -> AppResult<Valuation>
    where
        F: FnMut(&AppraisalEvent),
    {
        form.ensure_valid()?;

        if self.config.demo_mode {
            tracing::info!("demo mode is on, skipping the backend");
            return Ok(demo_valuation(form, Utc::now().date_naive()));
        }

        if self.provider.source() != ValuationSource::Analysis {
            return Err(AppError::Validation(
                "streaming is only supported by the analysis provider".to_string(),
            ));
        }

        let streamer = AnalysisClient::new(&self.config);
        let stream = match streamer.stream_appraise(form).await {
            Ok(stream) => stream,
            Err(err) if is_connect_failure(&err) => {
                tracing::warn!(
                    endpoint = %streamer.stream_url(),
                    error = %err,
                    "backend unreachable, falling back to demo data"
                );
                VALUATION_FALLBACK_COUNT.add(
                    1,
                    &[KeyValue::new(
                        "valuation.provider.name",
                        self.provider.name().to_string(),
                    )],
                );
                return Ok(demo_valuation(form, Utc::now().date_naive()));
            }
            Err(err) => return Err(self.to_app_error(err)),
        };

        collect_stream_with(stream, self.config.comparable_limit, on_event)
            .await
            .map_err(|err| self.to_app_error(err))
    }

    fn to_app_error(&self, err: anyhow::Error) -> AppError {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(err) => match self.provider.source() {
                ValuationSource::Valora => AppError::Cloud(format!("{err:#}")),
                _ => AppError::Backend(format!("{err:#}")),
            },
        }
    }
}

/// Unreachable-backend detection for the demo fallback. Only transport
/// failures count; an HTTP response of any status means the backend is
/// there and its answer must not be papered over.
fn is_connect_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout())
    })
}

fn classify_error(err: &anyhow::Error) -> &'static str {
    let msg = err.to_string().to_lowercase();
    if msg.contains("rate limit") || msg.contains("429") || msg.contains("quota") {
        "rate_limit"
    } else if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
        "timeout"
    } else if msg.contains("401")
        || msg.contains("403")
        || msg.contains("auth")
        || msg.contains("api key")
    {
        "auth_error"
    } else if msg.contains("400")
        || msg.contains("422")
        || msg.contains("invalid")
        || msg.contains("rejected")
    {
        "invalid_request"
    } else if msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("unavailable")
    {
        "server_error"
    } else if msg.contains("connect")
        || msg.contains("dns")
        || msg.contains("network")
        || msg.contains("reset")
    {
        "network_error"
    } else {
        "unknown_error"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, _)| i < max)
            .map(|(_, c)| c)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
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
        }
    }

    #[test]
    fn test_classify_error_categories() {
        let cases = vec![
            ("rate limit exceeded", "rate_limit"),
            ("status 429: too many requests", "rate_limit"),
            ("monthly quota reached", "rate_limit"),
            ("request timed out", "timeout"),
            ("401 unauthorized", "auth_error"),
            ("invalid api key", "auth_error"),
            ("Property data rejected: area out of range", "invalid_request"),
            ("422 unprocessable entity", "invalid_request"),
            ("Valuation model temporarily unavailable: retraining", "server_error"),
            ("502 bad gateway", "server_error"),
            ("connection refused", "network_error"),
            ("dns resolution failed", "network_error"),
            ("something unexpected", "unknown_error"),
        ];

        for (msg, expected) in cases {
            let err = anyhow::anyhow!("{}", msg);
            assert_eq!(
                classify_error(&err),
                expected,
                "classify_error({msg:?}) should be {expected:?}"
            );
        }
    }

    #[test]
    fn test_is_connect_failure_ignores_app_errors() {
        let err: anyhow::Error = AppError::Backend("Property data rejected: bad".to_string()).into();
        assert!(!is_connect_failure(&err));
    }

    #[test]
    fn test_to_app_error_preserves_semantic_variant() {
        let client = ValuationClient::new(
            Arc::new(AnalysisClient::new(&test_config())),
            test_config(),
        );
        let err: anyhow::Error = AppError::Decode("bad payload".to_string()).into();
        assert!(matches!(client.to_app_error(err), AppError::Decode(_)));

        let plain = anyhow::anyhow!("socket closed");
        assert!(matches!(client.to_app_error(plain), AppError::Backend(_)));
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate("Münchner Straße", 3);
        assert!(result.len() <= 3);
        assert!(result.is_char_boundary(result.len()));
        assert_eq!(truncate("kurz", 10), "kurz");
    }
}
