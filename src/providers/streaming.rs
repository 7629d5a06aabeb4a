//! Chunked variant of the analysis endpoint. The backend answers with
//! newline-delimited JSON events so long appraisals can report progress
//! and push comparables as they are found.

use std::pin::Pin;

use futures::{Stream, StreamExt};

use super::analysis::{AnalysisClient, backend_error, build_request, envelope_error, map_comparable, map_response};
use crate::error::AppError;
use crate::form::AppraisalForm;
use crate::valuation::{Comparable, Valuation};

/// Progress events from the streaming endpoint, in arrival order. The
/// terminal event carries the same payload as the blocking endpoint.
#[derive(Debug, Clone)]
pub enum AppraisalEvent {
    Queued { position: u32 },
    Progress { stage: String, percent: u8 },
    Comparable(Comparable),
    Completed(Box<Valuation>),
}

pub type AppraisalStream = Pin<Box<dyn Stream<Item = anyhow::Result<AppraisalEvent>> + Send>>;

impl AnalysisClient {
    /// POSTs the appraisal to the streaming endpoint and yields events as
    /// lines arrive. Lines may be split across chunks, so bytes are
    /// buffered until a newline shows up.
    pub async fn stream_appraise(&self, form: &AppraisalForm) -> anyhow::Result<AppraisalStream> {
        let body = build_request(form, self.comparable_limit());

        // No overall deadline on this request: the body stays open for as
        // long as the appraisal runs. Dialing is bounded by the client's
        // connect timeout.
        let response = self
            .http()
            .post(self.stream_url())
            .headers(Self::request_headers())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(envelope_error(status, &error_body));
        }

        let byte_stream = response.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();

            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk?;
                buf.extend_from_slice(&chunk);

                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line = buf.drain(..=pos).collect::<Vec<_>>();
                    if let Some(event) = decode_line(&line)? {
                        yield event;
                    }
                }
            }

            // A well-behaved backend terminates the last event with a
            // newline, but don't lose the line if it doesn't.
            if let Some(event) = decode_line(&buf)? {
                yield event;
            }
        };

        Ok(Box::pin(out))
    }
}

/// One NDJSON line to one event. Blank lines yield nothing, unknown event
/// types are skipped, a wire `error` event becomes a terminal error.
fn decode_line(line: &[u8]) -> anyhow::Result<Option<AppraisalEvent>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| AppError::Decode(format!("stream line is not valid JSON: {e}")))?;

    match value.get("event").and_then(|v| v.as_str()) {
        Some("queued") => {
            let position = value.get("position").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Ok(Some(AppraisalEvent::Queued { position }))
        }
        Some("progress") => {
            let stage = value
                .get("stage")
                .and_then(|v| v.as_str())
                .unwrap_or("working")
                .to_string();
            let percent = value
                .get("percent")
                .and_then(|v| v.as_u64())
                .unwrap_or(0)
                .min(100) as u8;
            Ok(Some(AppraisalEvent::Progress { stage, percent }))
        }
        Some("comparable") => {
            let wire = serde_json::from_value(value["comparable"].clone())
                .map_err(|e| AppError::Decode(format!("bad comparable event: {e}")))?;
            Ok(Some(AppraisalEvent::Comparable(map_comparable(wire))))
        }
        Some("completed") => {
            let wire = serde_json::from_value(value["result"].clone())
                .map_err(|e| AppError::Decode(format!("bad completed event: {e}")))?;
            Ok(Some(AppraisalEvent::Completed(Box::new(map_response(wire)))))
        }
        Some("error") => {
            let code = value.get("code").and_then(|v| v.as_str()).unwrap_or("unknown");
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("appraisal failed");
            Err(backend_error(code, message).into())
        }
        other => {
            tracing::debug!(event = ?other, "skipping unknown stream event");
            Ok(None)
        }
    }
}

/// Folds a full event stream into the final valuation, merging comparables
/// that only arrived as incremental events.
pub async fn collect_stream<S>(stream: S, comparable_limit: usize) -> anyhow::Result<Valuation>
where
    S: Stream<Item = anyhow::Result<AppraisalEvent>>,
{
    collect_stream_with(stream, comparable_limit, |_| {}).await
}

/// Like [`collect_stream`], but hands every event to `on_event` first so a
/// caller can surface progress while the fold runs.
pub async fn collect_stream_with<S, F>(
    stream: S,
    comparable_limit: usize,
    mut on_event: F,
) -> anyhow::Result<Valuation>
where
    S: Stream<Item = anyhow::Result<AppraisalEvent>>,
    F: FnMut(&AppraisalEvent),
{
    futures::pin_mut!(stream);

    let mut streamed: Vec<Comparable> = Vec::new();
    let mut completed: Option<Valuation> = None;

    while let Some(event) = stream.next().await {
        let event = event?;
        on_event(&event);
        match event {
            AppraisalEvent::Comparable(c) => streamed.push(c),
            AppraisalEvent::Completed(v) => completed = Some(*v),
            AppraisalEvent::Queued { .. } | AppraisalEvent::Progress { .. } => {}
        }
    }

    let mut valuation = completed
        .ok_or_else(|| AppError::Backend("stream ended without a completed event".to_string()))?;
    valuation.merge_comparables(streamed, comparable_limit);
    Ok(valuation)
}
