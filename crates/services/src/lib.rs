//! Remote collaborators for the Billwatch session core.
//!
//! Two operations are consumed: the spreadsheet analysis upload and the
//! follow-up chat. Both are modeled as traits so the session controller
//! can be driven by mocks in tests, with `reqwest`-backed
//! implementations in [`http`] for the real backend.

pub mod error;
pub mod http;
mod wire;

use async_trait::async_trait;
use shared::types::{AnalysisContext, AnalysisResult, UploadCandidate};

pub use error::{ServiceError, GENERIC_TRANSPORT_MESSAGE};
pub use http::{ApiConfig, HttpAnalysisService, HttpChatService};

/// The remote anomaly/spike analysis.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Upload the candidate and wait for the computed result. `area` is
    /// the optional free-text label the user attached to the upload.
    async fn analyze(
        &self,
        candidate: &UploadCandidate,
        area: Option<&str>,
    ) -> Result<AnalysisResult, ServiceError>;
}

/// The remote Q&A over a completed analysis.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Ask one question grounded in the given context projection.
    /// Returns the answer text.
    async fn chat(
        &self,
        question: &str,
        context: &AnalysisContext,
    ) -> Result<String, ServiceError>;
}
