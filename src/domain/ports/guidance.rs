use anyhow::Result;
use async_trait::async_trait;

/// Response from the web-guidance collaborator.
#[derive(Debug, Clone)]
pub struct GuidanceResponse {
    pub success: bool,
    pub insights: Vec<String>,
    /// Message substituted when the lookup produced nothing useful.
    pub fallback_message: Option<String>,
}

impl GuidanceResponse {
    /// A successful response carrying insights.
    pub fn with_insights(insights: Vec<String>) -> Self {
        Self {
            success: true,
            insights,
            fallback_message: None,
        }
    }

    /// An unsuccessful response with a fallback message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            success: false,
            insights: Vec::new(),
            fallback_message: Some(message.into()),
        }
    }
}

/// Port for the regulatory web-guidance collaborator.
#[async_trait]
pub trait GuidanceSource: Send + Sync {
    async fn search_guidance(
        &self,
        query: &str,
        document_type: Option<&str>,
        framework: Option<&str>,
    ) -> Result<GuidanceResponse>;
}

/// A no-op guidance source that reports itself unavailable.
///
/// Use this when regulatory search is disabled; the stage then falls back
/// to its static guidance text.
#[derive(Debug, Clone, Default)]
pub struct NullGuidance;

impl NullGuidance {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GuidanceSource for NullGuidance {
    async fn search_guidance(
        &self,
        _query: &str,
        _document_type: Option<&str>,
        _framework: Option<&str>,
    ) -> Result<GuidanceResponse> {
        Ok(GuidanceResponse::unavailable(
            "Regulatory guidance lookup is not configured.",
        ))
    }
}
