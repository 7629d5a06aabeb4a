use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::client::ValuationProvider;
use crate::config::Config;
use crate::error::AppError;
use crate::form::{Amenity, AppraisalForm, Condition, PropertyKind, ValuationPurpose};
use crate::valuation::{Comparable, Valuation, ValuationSource, ValueRange};

/// Client for the local analysis backend. Modern nested JSON schema,
/// no authentication, structured error envelope.
pub struct AnalysisClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    comparable_limit: usize,
}

impl AnalysisClient {
    pub fn new(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        // The client itself only bounds connection establishment. The
        // blocking endpoint adds a full-request deadline per call; the
        // streaming endpoint must stay open for as long as the backend
        // keeps sending lines.
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .expect("TLS backend must initialize");
        Self {
            client,
            base_url: config.backend_base_url.trim_end_matches('/').to_string(),
            timeout,
            comparable_limit: config.comparable_limit,
        }
    }

    pub fn valuation_url(&self) -> String {
        format!("{}/api/v1/valuations", self.base_url)
    }

    pub fn stream_url(&self) -> String {
        format!("{}/api/v1/valuations/stream", self.base_url)
    }

    pub(super) fn request_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    pub(super) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub(super) fn comparable_limit(&self) -> usize {
        self.comparable_limit
    }
}

#[derive(Serialize)]
pub(super) struct AnalysisRequest {
    property: AnalysisProperty,
    options: AnalysisOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
}

#[derive(Serialize)]
struct AnalysisProperty {
    category: &'static str,
    location: AnalysisLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    building: Option<AnalysisBuilding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    site: Option<AnalysisSite>,
}

#[derive(Serialize)]
struct AnalysisLocation {
    street: String,
    postal_code: String,
    city: String,
    country: String,
}

#[derive(Serialize)]
struct AnalysisBuilding {
    #[serde(skip_serializing_if = "Option::is_none")]
    year_built: Option<i32>,
    living_area_sqm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    rooms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<&'static str>,
    amenities: Vec<&'static str>,
}

#[derive(Serialize)]
struct AnalysisSite {
    plot_area_sqm: f64,
}

#[derive(Serialize)]
struct AnalysisOptions {
    purpose: &'static str,
    max_comparables: usize,
}

#[derive(Deserialize)]
pub(super) struct AnalysisResponse {
    #[serde(default)]
    id: Option<String>,
    model: AnalysisModel,
    valuation: AnalysisValuation,
    #[serde(default)]
    comparables: Vec<AnalysisComparable>,
}

#[derive(Deserialize)]
struct AnalysisModel {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct AnalysisValuation {
    market_value: f64,
    range: AnalysisRange,
    #[serde(default)]
    price_per_sqm: Option<f64>,
    confidence: f64,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    valued_on: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct AnalysisRange {
    lower: f64,
    upper: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnalysisComparable {
    label: String,
    #[serde(default)]
    distance_m: Option<u32>,
    #[serde(default)]
    living_area_sqm: Option<f64>,
    sale_price: f64,
    #[serde(default)]
    price_per_sqm: Option<f64>,
    #[serde(default)]
    sold_on: Option<NaiveDate>,
    #[serde(default)]
    similarity: Option<f64>,
}

#[derive(Deserialize)]
struct AnalysisError {
    error: AnalysisErrorDetail,
}

#[derive(Deserialize)]
struct AnalysisErrorDetail {
    code: String,
    message: String,
}

fn category_code(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::House => "house",
        PropertyKind::Apartment => "apartment",
        PropertyKind::Plot => "plot",
    }
}

fn condition_code(condition: Condition) -> &'static str {
    match condition {
        Condition::New => "new",
        Condition::Renovated => "renovated",
        Condition::WellKept => "well_kept",
        Condition::NeedsWork => "needs_work",
    }
}

/// The backend grew its amenity vocabulary before this client existed, so
/// two of the names do not line up with ours.
fn amenity_code(amenity: Amenity) -> &'static str {
    match amenity {
        Amenity::Garage => "garage",
        Amenity::Balcony => "balcony",
        Amenity::Garden => "garden",
        Amenity::Elevator => "elevator",
        Amenity::Basement => "cellar",
        Amenity::SolarPanels => "solar",
    }
}

fn purpose_code(purpose: ValuationPurpose) -> &'static str {
    match purpose {
        ValuationPurpose::MarketSale => "market_sale",
        ValuationPurpose::Purchase => "purchase",
        ValuationPurpose::Financing => "financing",
        ValuationPurpose::Insurance => "insurance",
    }
}

pub(super) fn build_request(form: &AppraisalForm, max_comparables: usize) -> AnalysisRequest {
    let p = &form.property;

    let building = match p.kind {
        PropertyKind::Plot => None,
        _ => Some(AnalysisBuilding {
            year_built: p.year_built,
            living_area_sqm: p.living_area_sqm.unwrap_or(0.0),
            rooms: p.rooms,
            condition: p.condition.map(condition_code),
            amenities: p.amenities.iter().map(|a| amenity_code(*a)).collect(),
        }),
    };
    let site = p.plot_area_sqm.map(|plot_area_sqm| AnalysisSite { plot_area_sqm });

    AnalysisRequest {
        property: AnalysisProperty {
            category: category_code(p.kind),
            location: AnalysisLocation {
                street: form.address.street.clone(),
                postal_code: form.address.postal_code.clone(),
                city: form.address.city.clone(),
                country: form.address.country_code.clone(),
            },
            building,
            site,
        },
        options: AnalysisOptions {
            purpose: purpose_code(form.purpose),
            max_comparables,
        },
        reference: form.reference.clone(),
    }
}

pub(super) fn map_comparable(wire: AnalysisComparable) -> Comparable {
    Comparable {
        label: wire.label,
        distance_m: wire.distance_m,
        living_area_sqm: wire.living_area_sqm,
        sale_price: wire.sale_price,
        price_per_sqm: wire.price_per_sqm,
        sold_on: wire.sold_on,
        similarity: wire.similarity,
    }
}

pub(super) fn map_response(wire: AnalysisResponse) -> Valuation {
    let model = match wire.model.version {
        Some(version) => format!("{}/{}", wire.model.name, version),
        None => wire.model.name,
    };
    Valuation {
        market_value: wire.valuation.market_value,
        value_range: ValueRange {
            lower: wire.valuation.range.lower,
            upper: wire.valuation.range.upper,
        },
        price_per_sqm: wire.valuation.price_per_sqm,
        confidence: wire.valuation.confidence.clamp(0.0, 1.0),
        currency: wire.valuation.currency.unwrap_or_else(|| "EUR".to_string()),
        comparables: wire.comparables.into_iter().map(map_comparable).collect(),
        model,
        source: ValuationSource::Analysis,
        valued_on: wire
            .valuation
            .valued_on
            .unwrap_or_else(|| Utc::now().date_naive()),
        request_id: wire.id,
    }
}

/// Known backend error codes get a human-readable prefix, unknown codes
/// pass the backend message through.
pub(super) fn backend_error(code: &str, message: &str) -> AppError {
    let message = match code {
        "invalid_property" => format!("Property data rejected: {message}"),
        "unsupported_region" => format!("Region not covered: {message}"),
        "model_unavailable" => {
            format!("Valuation model temporarily unavailable: {message}")
        }
        code => {
            tracing::debug!(code, "unmapped analysis error code");
            message.to_string()
        }
    };
    AppError::Backend(message)
}

/// Turns a non-2xx body into an error. Anything that is not the structured
/// envelope keeps the raw body for the log.
pub(super) fn envelope_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    if let Ok(err) = serde_json::from_str::<AnalysisError>(body) {
        return backend_error(&err.error.code, &err.error.message).into();
    }
    anyhow::anyhow!("analysis backend returned HTTP {}: {}", status, body.trim())
}

#[async_trait::async_trait]
impl ValuationProvider for AnalysisClient {
    async fn appraise(&self, form: &AppraisalForm) -> anyhow::Result<Valuation> {
        let body = build_request(form, self.comparable_limit);

        let response = self
            .client
            .post(self.valuation_url())
            .headers(Self::request_headers())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(envelope_error(status, &error_body));
        }

        let resp: AnalysisResponse = response.json().await?;
        Ok(map_response(resp))
    }

    fn name(&self) -> &str {
        "analysis"
    }

    fn source(&self) -> ValuationSource {
        ValuationSource::Analysis
    }

    fn endpoint(&self) -> String {
        self.valuation_url()
    }
}
