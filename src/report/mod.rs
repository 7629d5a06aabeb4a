pub mod layout;
pub mod pdf;

pub use layout::{Page, PageSpec, paginate};
pub use pdf::{render_pdf, render_pdf_file};

use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::form::AppraisalForm;
use crate::telemetry::metrics::{REPORT_PAGES, REPORT_RENDER_DURATION};
use crate::valuation::{Valuation, ValuationSource};

/// Everything the report needs, assembled by the caller.
pub struct ReportContext {
    pub form: AppraisalForm,
    pub valuation: Valuation,
    pub generated_at: DateTime<Utc>,
    pub prepared_by: Option<String>,
    pub reference: String,
}

impl ReportContext {
    /// Resolves the document reference once so the cover and the footers
    /// agree: the wizard reference wins, then the backend request id, then
    /// a generated one.
    pub fn new(form: AppraisalForm, valuation: Valuation, prepared_by: Option<String>) -> Self {
        let reference = form
            .reference
            .clone()
            .or_else(|| valuation.request_id.clone())
            .unwrap_or_else(|| {
                format!(
                    "VAL-{}",
                    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
                )
            });
        Self {
            form,
            valuation,
            generated_at: Utc::now(),
            prepared_by,
            reference,
        }
    }
}

/// Semantic content blocks. The layout engine decides where they land on
/// pages, the PDF backend decides how they look.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    KeyValues { rows: Vec<(String, String)> },
    ValueBanner { amount: String, caption: String },
    Table { columns: Vec<Column>, rows: Vec<Vec<String>> },
    Notice { text: String },
    Rule,
    Spacer { height_mm: f64 },
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub heading: String,
    pub width_mm: f64,
    pub align: Align,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Builds the full block sequence for one appraisal report.
pub fn build_report(ctx: &ReportContext) -> Vec<Block> {
    let mut blocks = Vec::new();
    cover(ctx, &mut blocks);
    property_section(ctx, &mut blocks);
    valuation_section(ctx, &mut blocks);
    comparables_section(ctx, &mut blocks);
    methodology_section(ctx, &mut blocks);
    disclaimer(&mut blocks);
    blocks
}

/// Layout, then PDF. The returned bytes are a complete document.
#[tracing::instrument(
    name = "report render",
    skip(ctx),
    fields(
        report.source = ctx.valuation.source.label(),
        report.reference = %ctx.reference,
        report.pages,
    )
)]
pub fn render_report(ctx: &ReportContext) -> AppResult<Vec<u8>> {
    let start = Instant::now();

    let blocks = build_report(ctx);
    let spec = PageSpec {
        footer_text: Some(format!(
            "{} · generated {}",
            ctx.reference,
            ctx.generated_at.format("%d %b %Y %H:%M UTC")
        )),
        ..PageSpec::default()
    };
    let pages = paginate(&blocks, &spec);
    let bytes = render_pdf(&pages, &spec, "Property Valuation Report")?;

    let span = tracing::Span::current();
    span.record("report.pages", pages.len());

    REPORT_RENDER_DURATION.record(start.elapsed().as_secs_f64(), &[]);
    REPORT_PAGES.record(pages.len() as f64, &[]);

    Ok(bytes)
}

fn cover(ctx: &ReportContext, blocks: &mut Vec<Block>) {
    let address = &ctx.form.address;

    blocks.push(Block::Spacer { height_mm: 60.0 });
    blocks.push(Block::Heading {
        level: 1,
        text: "Property Valuation Report".to_string(),
    });
    blocks.push(Block::Rule);
    blocks.push(Block::Spacer { height_mm: 6.0 });
    blocks.push(Block::Paragraph {
        text: format!(
            "{}, {} {} ({})",
            address.street, address.postal_code, address.city, address.country_code
        ),
    });
    blocks.push(Block::Paragraph {
        text: format!(
            "{} · {}",
            ctx.form.property.kind.label(),
            ctx.form.purpose.label()
        ),
    });
    blocks.push(Block::Spacer { height_mm: 12.0 });
    blocks.push(Block::Paragraph {
        text: format!("Reference: {}", ctx.reference),
    });
    if let Some(prepared_by) = &ctx.prepared_by {
        blocks.push(Block::Paragraph {
            text: format!("Prepared by: {prepared_by}"),
        });
    }
    if let Some(contact) = &ctx.form.contact {
        blocks.push(Block::Paragraph {
            text: format!("Prepared for: {}", contact.name),
        });
    }
    blocks.push(Block::Paragraph {
        text: format!(
            "Generated on {}",
            ctx.generated_at.format("%d %b %Y %H:%M UTC")
        ),
    });
    blocks.push(Block::PageBreak);
}

fn property_section(ctx: &ReportContext, blocks: &mut Vec<Block>) {
    let p = &ctx.form.property;
    let address = &ctx.form.address;

    let mut rows = vec![
        ("Address".to_string(), address.street.clone()),
        (
            "City".to_string(),
            format!("{} {}", address.postal_code, address.city),
        ),
        ("Country".to_string(), address.country_code.clone()),
        ("Type".to_string(), p.kind.label().to_string()),
    ];
    if let Some(year) = p.year_built {
        rows.push(("Year built".to_string(), year.to_string()));
    }
    if let Some(area) = p.living_area_sqm {
        rows.push(("Living area".to_string(), format_area(area)));
    }
    if let Some(area) = p.plot_area_sqm {
        rows.push(("Plot area".to_string(), format_area(area)));
    }
    if let Some(rooms) = p.rooms {
        rows.push(("Rooms".to_string(), format_count(rooms)));
    }
    if let Some(condition) = p.condition {
        rows.push(("Condition".to_string(), condition.label().to_string()));
    }
    if !p.amenities.is_empty() {
        let labels = p
            .amenities
            .iter()
            .map(|a| a.label())
            .collect::<Vec<_>>()
            .join(", ");
        rows.push(("Amenities".to_string(), labels));
    }

    blocks.push(Block::Heading {
        level: 2,
        text: "Property".to_string(),
    });
    blocks.push(Block::KeyValues { rows });
    blocks.push(Block::Spacer { height_mm: 6.0 });
}

fn valuation_section(ctx: &ReportContext, blocks: &mut Vec<Block>) {
    let v = &ctx.valuation;

    blocks.push(Block::Heading {
        level: 2,
        text: "Valuation".to_string(),
    });
    blocks.push(Block::ValueBanner {
        amount: format_money(&v.currency, v.market_value),
        caption: "Estimated market value".to_string(),
    });

    let mut rows = vec![(
        "Value range".to_string(),
        format!(
            "{} to {}",
            format_money(&v.currency, v.value_range.lower),
            format_money(&v.currency, v.value_range.upper)
        ),
    )];
    if let Some(per_sqm) = v.price_per_sqm {
        rows.push(("Price per m²".to_string(), format_money(&v.currency, per_sqm)));
    }
    rows.push(("Confidence".to_string(), format_percent(v.confidence)));
    rows.push(("Model".to_string(), v.model.clone()));
    rows.push(("Source".to_string(), v.source.label().to_string()));
    rows.push(("Valued on".to_string(), format_date(v.valued_on)));
    if let Some(request_id) = &v.request_id {
        rows.push(("Request ID".to_string(), request_id.clone()));
    }

    blocks.push(Block::KeyValues { rows });
    blocks.push(Block::Spacer { height_mm: 6.0 });
}

fn comparables_section(ctx: &ReportContext, blocks: &mut Vec<Block>) {
    let comparables = &ctx.valuation.comparables;
    if comparables.is_empty() {
        return;
    }

    let columns = vec![
        Column {
            heading: "Object".to_string(),
            width_mm: 48.0,
            align: Align::Left,
        },
        Column {
            heading: "Distance".to_string(),
            width_mm: 20.0,
            align: Align::Right,
        },
        Column {
            heading: "Area".to_string(),
            width_mm: 22.0,
            align: Align::Right,
        },
        Column {
            heading: "Price".to_string(),
            width_mm: 28.0,
            align: Align::Right,
        },
        Column {
            heading: "€/m²".to_string(),
            width_mm: 22.0,
            align: Align::Right,
        },
        Column {
            heading: "Sold".to_string(),
            width_mm: 20.0,
            align: Align::Right,
        },
        Column {
            heading: "Match".to_string(),
            width_mm: 14.0,
            align: Align::Right,
        },
    ];

    let currency = &ctx.valuation.currency;
    let rows = comparables
        .iter()
        .map(|c| {
            vec![
                c.label.clone(),
                c.distance_m.map_or("-".to_string(), |d| format!("{d} m")),
                c.living_area_sqm.map_or("-".to_string(), format_area),
                format_money(currency, c.sale_price),
                c.price_per_sqm
                    .map_or("-".to_string(), |p| format_money(currency, p)),
                c.sold_on.map_or("-".to_string(), format_date),
                c.similarity.map_or("-".to_string(), format_percent),
            ]
        })
        .collect();

    blocks.push(Block::Heading {
        level: 2,
        text: "Comparable sales".to_string(),
    });
    blocks.push(Block::Table { columns, rows });
    blocks.push(Block::Spacer { height_mm: 6.0 });
}

fn methodology_section(ctx: &ReportContext, blocks: &mut Vec<Block>) {
    let v = &ctx.valuation;

    blocks.push(Block::Heading {
        level: 2,
        text: "Methodology".to_string(),
    });

    let text = match v.source {
        ValuationSource::Analysis => format!(
            "This valuation was produced by the local analysis backend using the {} model. \
             The model benchmarks the subject property against recent transactions in the \
             surrounding postal area and adjusts for size, condition, construction year and \
             amenities.",
            v.model
        ),
        ValuationSource::Valora => format!(
            "This valuation was retrieved from the Valora cloud service ({} model). Valora \
             derives its estimates from registered transaction data for the region; the \
             individual comparable objects behind an estimate are not disclosed by the \
             service.",
            v.model
        ),
        ValuationSource::Demo => {
            "This valuation was produced by the built-in demo heuristic. It derives a value \
             from the property attributes alone, without any access to market data."
                .to_string()
        }
    };
    blocks.push(Block::Paragraph { text });

    blocks.push(Block::Paragraph {
        text: format!(
            "The stated confidence for this estimate is {}.",
            format_percent(v.confidence)
        ),
    });

    if v.source == ValuationSource::Demo {
        blocks.push(Block::Notice {
            text: "Demo data: the figures in this report are synthetic and must not be used \
                   for any real decision."
                .to_string(),
        });
    }
    blocks.push(Block::Spacer { height_mm: 6.0 });
}

fn disclaimer(blocks: &mut Vec<Block>) {
    blocks.push(Block::Rule);
    blocks.push(Block::Paragraph {
        text: "This document was generated automatically from the data entered in the \
               appraisal form and from the responses of the selected valuation service. It \
               is an estimate, not a certified appraisal, and does not replace an inspection \
               by a qualified surveyor."
            .to_string(),
    });
}

pub(crate) fn format_money(currency: &str, value: f64) -> String {
    if currency == "EUR" {
        format!("€{}", format_thousands(value))
    } else {
        format!("{currency} {}", format_thousands(value))
    }
}

fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let sign = if rounded < 0 { "-" } else { "" };
    let digits = rounded.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}")
}

pub(crate) fn format_area(value: f64) -> String {
    format!("{} m²", format_count(value))
}

/// Drops the fraction when it is a whole number, keeps one digit otherwise.
fn format_count(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.1}")
    }
}

fn format_percent(fraction: f64) -> String {
    format!("{}%", (fraction * 100.0).round() as i64)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}
