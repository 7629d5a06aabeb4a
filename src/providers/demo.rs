//! Deterministic offline valuation used whenever no backend is reachable
//! (or demo mode is forced). The numbers come from a small heuristic seeded
//! by the address, so repeated runs for the same property agree.

use chrono::{Datelike, Duration, NaiveDate};

use crate::form::{Amenity, AppraisalForm, Condition, PropertyKind};
use crate::valuation::{Comparable, Valuation, ValuationSource, ValueRange};

pub const DEMO_MODEL: &str = "demo-heuristic/1";

const BASE_RATE_HOUSE: f64 = 3400.0;
const BASE_RATE_APARTMENT: f64 = 4100.0;
const BASE_RATE_PLOT: f64 = 450.0;

/// Used when the form is missing the relevant area so the demo still
/// produces something renderable instead of erroring.
const NOMINAL_LIVING_AREA: f64 = 90.0;
const NOMINAL_PLOT_AREA: f64 = 500.0;

const STREET_POOL: [&str; 7] = [
    "Ahornallee",
    "Birkenstraße",
    "Drosselgasse",
    "Eichenring",
    "Fasanenhof",
    "Gartenweg",
    "Hangstraße",
];

/// FNV-1a. `DefaultHasher` is not guaranteed stable across releases, and the
/// demo values must not change under a toolchain upgrade.
fn address_seed(form: &AppraisalForm) -> u64 {
    let input = format!(
        "{}|{}|{}",
        form.address.postal_code.trim(),
        form.address.street.trim(),
        form.address.city.trim()
    );
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn condition_factor(condition: Option<Condition>) -> f64 {
    match condition {
        Some(Condition::New) => 1.15,
        Some(Condition::Renovated) => 1.08,
        Some(Condition::WellKept) | None => 1.0,
        Some(Condition::NeedsWork) => 0.82,
    }
}

fn amenity_bump(amenity: Amenity) -> f64 {
    match amenity {
        Amenity::Garage => 0.02,
        Amenity::Balcony => 0.015,
        Amenity::Garden => 0.02,
        Amenity::Elevator => 0.01,
        Amenity::Basement => 0.01,
        Amenity::SolarPanels => 0.025,
    }
}

pub fn demo_valuation(form: &AppraisalForm, on: NaiveDate) -> Valuation {
    let seed = address_seed(form);
    // Location spread in [0.88, 1.12], derived from the address hash.
    let spread = 0.88 + 0.24 * ((seed % 2401) as f64 / 2400.0);

    let p = &form.property;
    let amenity_factor = 1.0 + p.amenities.iter().map(|a| amenity_bump(*a)).sum::<f64>();

    let (area, rate) = match p.kind {
        PropertyKind::House => (
            p.living_area_sqm.unwrap_or(NOMINAL_LIVING_AREA),
            BASE_RATE_HOUSE,
        ),
        PropertyKind::Apartment => (
            p.living_area_sqm.unwrap_or(NOMINAL_LIVING_AREA),
            BASE_RATE_APARTMENT,
        ),
        PropertyKind::Plot => (
            p.plot_area_sqm.unwrap_or(NOMINAL_PLOT_AREA),
            BASE_RATE_PLOT,
        ),
    };

    let mut value = area * rate * spread * amenity_factor;

    if p.kind != PropertyKind::Plot {
        value *= condition_factor(p.condition);
        if let Some(year) = p.year_built {
            let age = (on.year() - year).max(0);
            // Straight-line depreciation, floored so old stock keeps land value.
            value *= (1.0 - 0.004 * f64::from(age)).max(0.65);
        }
        // A house on its own plot prices part of the land in.
        if p.kind == PropertyKind::House
            && let Some(plot) = p.plot_area_sqm
        {
            value += plot * BASE_RATE_PLOT * 0.25 * spread;
        }
    }

    let value = (value / 500.0).round() * 500.0;
    let per_sqm = match p.kind {
        PropertyKind::Plot => p.plot_area_sqm.map(|a| value / a),
        _ => p.living_area_sqm.map(|a| value / a),
    };

    Valuation {
        market_value: value,
        value_range: ValueRange {
            lower: (value * 0.94 / 500.0).round() * 500.0,
            upper: (value * 1.06 / 500.0).round() * 500.0,
        },
        price_per_sqm: per_sqm.map(|v| v.round()),
        confidence: 0.35,
        currency: "EUR".to_string(),
        comparables: demo_comparables(seed, area, rate * spread, on),
        model: DEMO_MODEL.to_string(),
        source: ValuationSource::Demo,
        valued_on: on,
        request_id: None,
    }
}

fn demo_comparables(seed: u64, area: f64, rate: f64, on: NaiveDate) -> Vec<Comparable> {
    (0..5u64)
        .map(|i| {
            let bits = seed.rotate_right((7 * (i + 1)) as u32);
            let street = STREET_POOL[(bits % STREET_POOL.len() as u64) as usize];
            let number = 2 + bits % 57;
            let area_factor = 0.8 + 0.4 * ((bits >> 8) % 101) as f64 / 100.0;
            let price_factor = 0.92 + 0.16 * ((bits >> 16) % 101) as f64 / 100.0;
            let comp_area = (area * area_factor).round();
            let sale_price = ((comp_area * rate * price_factor) / 1000.0).round() * 1000.0;
            Comparable {
                label: format!("{street} {number}"),
                distance_m: Some((150 + (bits >> 24) % 1850) as u32),
                living_area_sqm: Some(comp_area),
                sale_price,
                price_per_sqm: Some((sale_price / comp_area).round()),
                sold_on: Some(on - Duration::days(30 + (i as i64) * 47)),
                similarity: Some(0.93 - 0.07 * i as f64),
            }
        })
        .collect()
}
