use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

use super::events::{decode_event, SseDecoder};
use super::transport::{EventStream, RecommendationBackend};
use super::types::SimilarityResponse;
use crate::app::BackendConfig;
use crate::constants::{SIMILARITY_SEARCH_PATH, SIMILARITY_SEARCH_STEP, STREAM_ANALYSIS_PATH};
use crate::survey::SurveyInput;
use crate::utils::AnalysisError;

/// Recommendation backend reached over HTTP
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend client from configuration
    pub fn new(config: &BackendConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AnalysisError::StreamConnection(e.to_string()))?;

        Ok(Self::from_client(client, &config.base_url))
    }

    /// Wrap an already configured HTTP client
    pub fn from_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RecommendationBackend for HttpBackend {
    async fn open_analysis_stream(
        &self,
        survey: &SurveyInput,
    ) -> Result<EventStream, AnalysisError> {
        let url = format!("{}{}", self.base_url, STREAM_ANALYSIS_PATH);
        debug!("Opening analysis stream at {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("survey_data", survey.serialize())])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| {
                AnalysisError::StreamConnection(format!(
                    "failed to connect to {}. Is the backend running? ({})",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(AnalysisError::Backend(error_detail(response).await));
        }

        Ok(sse_events(response.bytes_stream().boxed()))
    }

    async fn similarity_search(
        &self,
        survey: &SurveyInput,
    ) -> Result<SimilarityResponse, AnalysisError> {
        let url = format!("{}{}", self.base_url, SIMILARITY_SEARCH_PATH);
        let body = json!({
            "survey_data": survey,
            "step": SIMILARITY_SEARCH_STEP,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Backend(format!("Failed to fetch recommendations: {}", e)))?;

        if !response.status().is_success() {
            return Err(AnalysisError::Backend(error_detail(response).await));
        }

        response
            .json::<SimilarityResponse>()
            .await
            .map_err(|e| AnalysisError::Decode(e.to_string()))
    }
}

/// FastAPI error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Backend-provided error message, or the status line when there is none
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    parse_error_detail(status, &text)
}

fn parse_error_detail(status: reqwest::StatusCode, text: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => body.detail,
        Err(_) if text.trim().is_empty() => format!("Backend returned {}", status),
        Err(_) => format!("Backend returned {}: {}", status, text.trim()),
    }
}

struct SseState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Turn a raw response body into decoded analysis events
fn sse_events(body: BoxStream<'static, reqwest::Result<Bytes>>) -> EventStream {
    let state = SseState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.pending.pop_front() {
                match decode_event(&data) {
                    Ok(event) => return Some((Ok(event), state)),
                    Err(e) => {
                        // A bad message does not end the stream
                        warn!("Skipping malformed analysis event: {}", e);
                        continue;
                    }
                }
            }

            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(AnalysisError::StreamConnection(e.to_string())), state));
                }
                None => {
                    state.done = true;
                    if let Some(data) = state.decoder.finish() {
                        state.pending.push_back(data);
                    }
                }
            }
        }
    })
    .boxed()
}
