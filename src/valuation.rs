use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which path produced a valuation. Carried through to the report so the
/// methodology section can say what actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationSource {
    Analysis,
    Valora,
    Demo,
}

impl ValuationSource {
    pub fn label(&self) -> &'static str {
        match self {
            ValuationSource::Analysis => "Analysis backend",
            ValuationSource::Valora => "Valora cloud service",
            ValuationSource::Demo => "Built-in demo model",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub lower: f64,
    pub upper: f64,
}

/// A sold or listed object the valuation was benchmarked against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparable {
    pub label: String,
    #[serde(default)]
    pub distance_m: Option<u32>,
    #[serde(default)]
    pub living_area_sqm: Option<f64>,
    pub sale_price: f64,
    #[serde(default)]
    pub price_per_sqm: Option<f64>,
    #[serde(default)]
    pub sold_on: Option<NaiveDate>,
    #[serde(default)]
    pub similarity: Option<f64>,
}

/// Normalized appraisal result. Every provider maps its own wire shape into
/// this one type, so the report and the CLI never see backend specifics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub market_value: f64,
    pub value_range: ValueRange,
    #[serde(default)]
    pub price_per_sqm: Option<f64>,
    /// 0.0 to 1.0.
    pub confidence: f64,
    pub currency: String,
    #[serde(default)]
    pub comparables: Vec<Comparable>,
    pub model: String,
    pub source: ValuationSource,
    pub valued_on: NaiveDate,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl Valuation {
    /// Folds comparables collected along the way into the final result.
    /// The backend may repeat some of them in its closing payload, so
    /// entries are deduplicated by label and the list is capped.
    pub fn merge_comparables(&mut self, streamed: Vec<Comparable>, limit: usize) {
        for comparable in streamed {
            if self.comparables.len() >= limit {
                break;
            }
            if !self.comparables.iter().any(|c| c.label == comparable.label) {
                self.comparables.push(comparable);
            }
        }
        self.comparables.truncate(limit);
    }
}
