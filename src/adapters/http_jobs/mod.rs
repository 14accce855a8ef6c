//! HTTP client for the remote generation service
//!
//! `POST {base}/jobs` submits `{prompt, type}` and answers with a job id.
//! `GET {base}/jobs/{id}` returns the job state. Results are fetched from the
//! `result_ref` URL, resolved against the base when relative.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::*;
use crate::error::{SubmitError, TransportError};
use crate::ports::RemoteJobPort;

#[derive(Serialize)]
struct SubmitRequest<'a> {
    prompt: &'a str,
    #[serde(rename = "type")]
    job_type: JobType,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(alias = "job_id")]
    id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(alias = "job_id")]
    id: String,
    status: JobStatus,
    #[serde(default, alias = "result_url")]
    result_ref: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct HttpJobClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpJobClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a result reference
    pub fn resolve(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("{}/{}", self.base_url, reference.trim_start_matches('/'))
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

fn request_error(url: &str, e: reqwest::Error) -> TransportError {
    TransportError::Request {
        url: url.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl RemoteJobPort for HttpJobClient {
    async fn submit(&self, prompt: &str, job_type: JobType) -> Result<RemoteJob, SubmitError> {
        let url = format!("{}/jobs", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(&SubmitRequest { prompt, job_type })
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected(format!("HTTP {}: {}", status, body.trim())));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::Rejected(format!("malformed submission response: {}", e)))?;
        if body.id.trim().is_empty() {
            return Err(SubmitError::Rejected("submission returned an empty job id".to_string()));
        }
        Ok(RemoteJob::queued(body.id))
    }

    async fn get_status(&self, job_id: &str) -> Result<RemoteJob, TransportError> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body: StatusResponse = response.json().await.map_err(|e| TransportError::Malformed {
            url: url.clone(),
            message: e.to_string(),
        })?;
        debug!(job_id = %body.id, status = ?body.status, "Fetched job status");
        Ok(RemoteJob {
            id: body.id,
            status: body.status,
            result_ref: body.result_ref,
            error: body.error,
        })
    }

    async fn fetch_result(&self, result_ref: &str) -> Result<MediaBytes, TransportError> {
        let url = self.resolve(result_ref);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_error(&url, e))?;
        Ok(MediaBytes {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute_refs() {
        let client = HttpJobClient::new("http://gen.local/api/", None, Duration::from_secs(5));
        assert_eq!(client.base_url(), "http://gen.local/api");
        assert_eq!(
            client.resolve("/results/1.png"),
            "http://gen.local/api/results/1.png"
        );
        assert_eq!(
            client.resolve("https://cdn.example/x.mp4"),
            "https://cdn.example/x.mp4"
        );
    }

    #[test]
    fn test_status_body_accepts_aliases() {
        let body: StatusResponse = serde_json::from_str(
            r#"{"job_id":"j1","status":"completed","result_url":"/r/j1"}"#,
        )
        .unwrap();
        assert_eq!(body.id, "j1");
        assert_eq!(body.status, JobStatus::Completed);
        assert_eq!(body.result_ref.as_deref(), Some("/r/j1"));

        let bad = serde_json::from_str::<StatusResponse>(r#"{"id":"j1","status":"exploded"}"#);
        assert!(bad.is_err());
    }
}
