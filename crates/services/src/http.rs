//! `reqwest` implementations of the two backend operations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use shared::types::{AnalysisContext, AnalysisResult, SpreadsheetKind, UploadCandidate};
use tracing::{debug, info};

use crate::error::{remote_error, ServiceError};
use crate::wire::{AnalyzeResponse, ChatResponse};
use crate::{AnalysisService, ChatService};

/// The per-consumer AI pass on the backend can take minutes for a
/// large spreadsheet.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(300);
const CHAT_TIMEOUT: Duration = Duration::from_secs(45);

/// Where the backend lives.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Read `BILLWATCH_API_URL`, defaulting to a local backend.
    pub fn from_env() -> Self {
        let base = std::env::var("BILLWATCH_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());
        Self::new(base)
    }
}

fn mime_for(kind: SpreadsheetKind) -> &'static str {
    match kind {
        SpreadsheetKind::Xlsx => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
        SpreadsheetKind::Xls => "application/vnd.ms-excel",
        SpreadsheetKind::Csv => "text/csv",
    }
}

/// `POST {base}/api/llm/analyze` with a multipart upload.
pub struct HttpAnalysisService {
    http: Client,
    base_url: String,
}

impl HttpAnalysisService {
    pub fn new(config: &ApiConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            http: Client::builder().timeout(ANALYZE_TIMEOUT).build()?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(
        &self,
        candidate: &UploadCandidate,
        area: Option<&str>,
    ) -> Result<AnalysisResult, ServiceError> {
        let url = format!("{}/api/llm/analyze", self.base_url);
        info!(
            file = %candidate.name,
            kind = candidate.kind.as_str(),
            bytes = candidate.data.len(),
            "uploading for analysis"
        );

        let part = Part::bytes(candidate.data.clone())
            .file_name(candidate.name.clone())
            .mime_str(mime_for(candidate.kind))?;
        let mut form = Form::new().part("file", part);
        if let Some(area) = area {
            form = form.text("area_name", area.to_string());
        }

        let resp = self.http.post(&url).multipart(form).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, "analysis request rejected");
            return Err(remote_error(&body));
        }

        let wire: AnalyzeResponse = resp.json().await?;
        Ok(wire.into_result(&candidate.name))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
    context: &'a AnalysisContext,
}

/// `POST {base}/api/llm/chat` with the question and context projection.
pub struct HttpChatService {
    http: Client,
    base_url: String,
}

impl HttpChatService {
    pub fn new(config: &ApiConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            http: Client::builder().timeout(CHAT_TIMEOUT).build()?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn chat(
        &self,
        question: &str,
        context: &AnalysisContext,
    ) -> Result<String, ServiceError> {
        let url = format!("{}/api/llm/chat", self.base_url);
        debug!(question, "sending chat question");

        let resp = self
            .http
            .post(&url)
            .json(&ChatRequest { question, context })
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, "chat request rejected");
            return Err(remote_error(&body));
        }

        let body: ChatResponse = resp.json().await?;
        Ok(body.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = ApiConfig::new("http://localhost:5000///");
        assert_eq!(config.base_url, "http://localhost:5000");
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_for(SpreadsheetKind::Csv), "text/csv");
        assert!(mime_for(SpreadsheetKind::Xlsx).contains("spreadsheetml"));
    }
}
