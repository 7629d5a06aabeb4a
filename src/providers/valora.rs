//! Client for the legacy Valora cloud API. Everything about its wire format
//! predates the analysis backend: flat camelCase payloads, every number a
//! string (decimal commas show up in responses), letter codes for the
//! condition, and application errors delivered inside an HTTP 200 envelope.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::client::ValuationProvider;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::form::{Amenity, AppraisalForm, Condition, PropertyKind, ValuationPurpose};
use crate::valuation::{Valuation, ValuationSource, ValueRange};

pub struct ValoraClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    account: String,
    timeout: Duration,
}

impl ValoraClient {
    pub fn new(base_url: &str, api_key: &str, account: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            account: account.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let api_key = config.valora_api_key.clone().ok_or_else(|| {
            AppError::Config("VALORA_API_KEY is required for the valora provider".to_string())
        })?;
        let account = config.valora_account.clone().ok_or_else(|| {
            AppError::Config("VALORA_ACCOUNT is required for the valora provider".to_string())
        })?;
        Ok(Self::new(
            &config.valora_base_url,
            &api_key,
            &account,
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    pub fn estimate_url(&self) -> String {
        format!("{}/estimate", self.base_url)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValoraRequest {
    object_category: String,
    street: String,
    zip: String,
    town: String,
    country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    construction_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    living_space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rooms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extras: Option<String>,
    reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_ref: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValoraResponse {
    state: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    object_value: Option<String>,
    #[serde(default)]
    value_min: Option<String>,
    #[serde(default)]
    value_max: Option<String>,
    #[serde(default)]
    sqm_price: Option<String>,
    #[serde(default)]
    trust_level: Option<String>,
    #[serde(default)]
    estimate_date: Option<String>,
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

fn category_code(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::House => "1",
        PropertyKind::Apartment => "2",
        PropertyKind::Plot => "3",
    }
}

fn condition_letter(condition: Condition) -> &'static str {
    match condition {
        Condition::New => "A",
        Condition::Renovated => "B",
        Condition::WellKept => "C",
        Condition::NeedsWork => "D",
    }
}

fn extra_code(amenity: Amenity) -> &'static str {
    match amenity {
        Amenity::Garage => "GARAGE",
        Amenity::Balcony => "BALCONY",
        Amenity::Garden => "GARDEN",
        Amenity::Elevator => "LIFT",
        Amenity::Basement => "CELLAR",
        Amenity::SolarPanels => "SOLAR",
    }
}

fn reason_code(purpose: ValuationPurpose) -> &'static str {
    match purpose {
        ValuationPurpose::MarketSale => "SALE",
        ValuationPurpose::Purchase => "BUY",
        ValuationPurpose::Financing => "LOAN",
        ValuationPurpose::Insurance => "INSURE",
    }
}

fn build_request(form: &AppraisalForm) -> ValoraRequest {
    let p = &form.property;
    let extras = if p.amenities.is_empty() {
        None
    } else {
        Some(
            p.amenities
                .iter()
                .map(|a| extra_code(*a))
                .collect::<Vec<_>>()
                .join(";"),
        )
    };

    ValoraRequest {
        object_category: category_code(p.kind).to_string(),
        street: form.address.street.clone(),
        zip: form.address.postal_code.clone(),
        town: form.address.city.clone(),
        country_code: form.address.country_code.clone(),
        construction_year: p.year_built.map(|y| y.to_string()),
        living_space: p.living_area_sqm.map(|a| a.to_string()),
        plot_size: p.plot_area_sqm.map(|a| a.to_string()),
        rooms: p.rooms.map(|r| r.to_string()),
        condition: p.condition.map(condition_letter),
        extras,
        reason: reason_code(form.purpose),
        customer_ref: form.reference.clone(),
    }
}

/// Valora writes numbers the way its spreadsheets do.
fn parse_decimal(field: &str, raw: &str) -> AppResult<f64> {
    let normalized = raw.trim().replace(',', ".");
    normalized
        .parse::<f64>()
        .map_err(|_| AppError::Decode(format!("valora field {field}: '{raw}' is not a number")))
}

fn parse_legacy_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d.%m.%Y")
        .map_err(|_| AppError::Decode(format!("valora field {field}: '{raw}' is not a DD.MM.YYYY date")))
}

fn map_response(wire: ValoraResponse) -> AppResult<Valuation> {
    match wire.state.as_str() {
        "OK" => {}
        "ERROR" => {
            let message = wire
                .error_message
                .unwrap_or_else(|| "unspecified error".to_string());
            let message = match wire.error_code {
                Some(code) => format!("{message} [{code}]"),
                None => message,
            };
            return Err(AppError::Cloud(message));
        }
        other => {
            return Err(AppError::Cloud(format!("unexpected state '{other}'")));
        }
    }

    let raw_value = wire
        .object_value
        .ok_or_else(|| AppError::Decode("valora response missing objectValue".to_string()))?;
    let market_value = parse_decimal("objectValue", &raw_value)?;

    let lower = match wire.value_min {
        Some(raw) => parse_decimal("valueMin", &raw)?,
        None => market_value * 0.95,
    };
    let upper = match wire.value_max {
        Some(raw) => parse_decimal("valueMax", &raw)?,
        None => market_value * 1.05,
    };
    let price_per_sqm = match wire.sqm_price {
        Some(raw) => Some(parse_decimal("sqmPrice", &raw)?),
        None => None,
    };
    let confidence = match wire.trust_level {
        Some(raw) => (parse_decimal("trustLevel", &raw)? / 5.0).clamp(0.0, 1.0),
        None => 0.5,
    };
    let valued_on = match wire.estimate_date {
        Some(raw) => parse_legacy_date("estimateDate", &raw)?,
        None => Utc::now().date_naive(),
    };

    Ok(Valuation {
        market_value,
        value_range: ValueRange { lower, upper },
        price_per_sqm,
        confidence,
        currency: wire.currency.unwrap_or_else(|| "EUR".to_string()),
        // The legacy API has no comparables endpoint at all.
        comparables: Vec::new(),
        model: wire.model_id.unwrap_or_else(|| "valora-legacy".to_string()),
        source: ValuationSource::Valora,
        valued_on,
        request_id: wire.request_id,
    })
}

#[async_trait::async_trait]
impl ValuationProvider for ValoraClient {
    async fn appraise(&self, form: &AppraisalForm) -> anyhow::Result<Valuation> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| anyhow::anyhow!("invalid API key header: {e}"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = build_request(form);

        let response = self
            .client
            .post(self.estimate_url())
            .query(&[("account", self.account.as_str())])
            .headers(headers)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "valora returned HTTP {}: {}",
                status,
                error_body.trim()
            ));
        }

        let resp: ValoraResponse = response.json().await?;
        Ok(map_response(resp)?)
    }

    fn name(&self) -> &str {
        "valora"
    }

    fn source(&self) -> ValuationSource {
        ValuationSource::Valora
    }

    fn endpoint(&self) -> String {
        self.estimate_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_response() -> serde_json::Value {
        serde_json::json!({
            "state": "OK",
            "requestId": "VA-2215",
            "objectValue": "385000,50",
            "valueMin": "362000",
            "valueMax": "407500",
            "sqmPrice": "5310,35",
            "trustLevel": "4",
            "estimateDate": "03.11.2025",
            "modelId": "valora-mk3",
            "currency": "EUR"
        })
    }

    #[test]
    fn test_request_uses_legacy_codes() {
        let json = serde_json::to_value(build_request(&AppraisalForm::sample())).unwrap();
        assert_eq!(json["objectCategory"], "2");
        assert_eq!(json["livingSpace"], "72.5");
        assert_eq!(json["constructionYear"], "1987");
        assert_eq!(json["condition"], "C");
        assert_eq!(json["extras"], "BALCONY;LIFT");
        assert_eq!(json["reason"], "SALE");
        assert_eq!(json["zip"], "80331");
        assert_eq!(json["customerRef"], "SAMPLE-0001");
    }

    #[test]
    fn test_request_for_plot_carries_plot_size_only() {
        let mut form = AppraisalForm::sample();
        form.property.kind = PropertyKind::Plot;
        form.property.year_built = None;
        form.property.living_area_sqm = None;
        form.property.rooms = None;
        form.property.condition = None;
        form.property.amenities.clear();
        form.property.plot_area_sqm = Some(640.0);
        let json = serde_json::to_value(build_request(&form)).unwrap();
        assert_eq!(json["objectCategory"], "3");
        assert_eq!(json["plotSize"], "640");
        assert!(json.get("livingSpace").is_none());
        assert!(json.get("condition").is_none());
        assert!(json.get("extras").is_none());
    }

    #[test]
    fn test_parse_decimal_accepts_comma() {
        assert_eq!(parse_decimal("objectValue", "385000,50").unwrap(), 385000.5);
        assert_eq!(parse_decimal("objectValue", "72.5").unwrap(), 72.5);
        assert!(parse_decimal("objectValue", "12x4").is_err());
    }

    #[test]
    fn test_map_ok_response() {
        let wire: ValoraResponse = serde_json::from_value(ok_response()).unwrap();
        let v = map_response(wire).unwrap();
        assert_eq!(v.market_value, 385000.5);
        assert_eq!(v.value_range.lower, 362000.0);
        assert_eq!(v.value_range.upper, 407500.0);
        assert_eq!(v.confidence, 0.8);
        assert_eq!(v.valued_on, NaiveDate::from_ymd_opt(2025, 11, 3).unwrap());
        assert_eq!(v.model, "valora-mk3");
        assert_eq!(v.source, ValuationSource::Valora);
        assert_eq!(v.request_id.as_deref(), Some("VA-2215"));
        assert!(v.comparables.is_empty());
    }

    #[test]
    fn test_map_error_state_with_http_200() {
        let wire: ValoraResponse = serde_json::from_value(serde_json::json!({
            "state": "ERROR",
            "errorCode": "E42",
            "errorMessage": "Account quota exceeded"
        }))
        .unwrap();
        let err = map_response(wire).unwrap_err();
        assert_eq!(err.to_string(), "Valora error: Account quota exceeded [E42]");
    }

    #[test]
    fn test_map_missing_value_is_a_decode_error() {
        let wire: ValoraResponse =
            serde_json::from_value(serde_json::json!({"state": "OK"})).unwrap();
        assert!(matches!(map_response(wire), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_map_rejects_bad_legacy_date() {
        let mut raw = ok_response();
        raw["estimateDate"] = serde_json::json!("2025-11-03");
        let wire: ValoraResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(map_response(wire), Err(AppError::Decode(_))));
    }

    #[test]
    fn test_map_defaults_range_when_bounds_missing() {
        let wire: ValoraResponse = serde_json::from_value(serde_json::json!({
            "state": "OK",
            "objectValue": "200000"
        }))
        .unwrap();
        let v = map_response(wire).unwrap();
        assert_eq!(v.value_range.lower, 190000.0);
        assert_eq!(v.value_range.upper, 210000.0);
        assert_eq!(v.confidence, 0.5);
        assert_eq!(v.model, "valora-legacy");
    }
}
