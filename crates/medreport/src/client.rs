//! HTTP boundary with the analysis service.
//!
//! One endpoint: POST `{base}/analyze_medical_report` with the prepared image
//! as a multipart field named `image`. The body is streamed in chunks so the
//! caller can observe genuine upload progress on a watch channel; the ten
//! minute deadline is enforced by the client's own timeout and races the
//! terminal response.

use std::time::Duration;

use anyhow::Result;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::debug;

use crate::errors::{AnalysisError, AnalysisResult};
use crate::models::payload::ImagePayload;
use crate::models::report::AnalysisReport;

/// Hard upper bound on one analysis call, transfer and server-side
/// processing included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600); // 10 minutes

const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct AnalysisClient {
    client: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send one report image for analysis. The cumulative fraction of bytes
    /// sent is published on `progress`; 1.0 is always published once the body
    /// has been handed off in full.
    pub async fn analyze(
        &self,
        payload: &ImagePayload,
        progress: watch::Sender<f64>,
    ) -> AnalysisResult<AnalysisReport> {
        let url = format!("{}/analyze_medical_report", self.base_url);
        let total = payload.data.len();
        debug!(%url, bytes = total, "sending analysis request");

        let data = payload.data.clone();
        let body = async_stream::stream! {
            let mut sent = 0usize;
            for chunk in data.chunks(UPLOAD_CHUNK_BYTES) {
                sent += chunk.len();
                let _ = progress.send(sent as f64 / total as f64);
                yield Ok::<_, std::io::Error>(chunk.to_vec());
            }
            let _ = progress.send(1.0);
        };

        let part = Part::stream_with_length(Body::wrap_stream(body), total as u64)
            .file_name(payload.file_name.clone())
            .mime_str(&payload.mime_type)
            .map_err(|e| AnalysisError::Network(e.to_string()))?;
        let form = Form::new().part("image", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body).map_err(|e| AnalysisError::ResponseParse(e.to_string()))
        } else {
            let message = response
                .text()
                .await
                .ok()
                .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
                .map(|body| body.error)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            Err(AnalysisError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }
}
