use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
};
use std::sync::LazyLock;

pub static METER: LazyLock<Meter> = LazyLock::new(|| global::meter("valuation-client"));

// --- Valuation Client Metrics ---

pub static VALUATION_OPERATION_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("valuation.client.operation.duration")
        .with_description("Duration of valuation calls in seconds")
        .with_unit("s")
        .build()
});

pub static VALUATION_RETRY_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("valuation.client.retry.count")
        .with_description("Number of valuation call retries")
        .with_unit("{retry}")
        .build()
});

pub static VALUATION_FALLBACK_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("valuation.client.fallback.count")
        .with_description("Number of demo fallback activations")
        .with_unit("{fallback}")
        .build()
});

pub static VALUATION_ERROR_COUNT: LazyLock<Counter<u64>> = LazyLock::new(|| {
    METER
        .u64_counter("valuation.client.error.count")
        .with_description("Number of valuation call errors")
        .with_unit("{error}")
        .build()
});

// --- Report Metrics ---

pub static REPORT_RENDER_DURATION: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.render.duration")
        .with_description("PDF layout and render duration in seconds")
        .with_unit("s")
        .build()
});

pub static REPORT_PAGES: LazyLock<Histogram<f64>> = LazyLock::new(|| {
    METER
        .f64_histogram("report.pages")
        .with_description("Number of pages per rendered report")
        .with_unit("{page}")
        .build()
});
