pub mod analysis;
pub mod client;
pub mod demo;
pub mod streaming;
pub mod valora;

pub use analysis::AnalysisClient;
pub use client::{ValuationClient, ValuationProvider};
pub use demo::demo_valuation;
pub use streaming::{AppraisalEvent, AppraisalStream, collect_stream, collect_stream_with};
pub use valora::ValoraClient;
