use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockpilot_core::TenantId;

/// One advisory output.
///
/// This is *not* a domain event. It is a suggestion that can be persisted or
/// displayed by higher layers (infra/API) without mutating domain state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    /// Tenant the advice belongs to.
    pub tenant_id: TenantId,

    /// Job kind that produced the advice (e.g. `inventory.reorder`).
    pub job: String,

    /// What the advice is about (stock item id, rule code). `None` for
    /// tenant-wide summaries.
    pub subject: Option<String>,

    /// Primary score (job-specific meaning).
    pub score: f64,

    /// Confidence in \[0, 1\].
    pub confidence: f64,

    /// Human-readable explanation.
    pub summary: Option<String>,

    /// Free-form structured detail (inputs used, computed figures).
    pub details: JsonValue,
}

impl Advice {
    pub fn new(tenant_id: TenantId, job: impl Into<String>, score: f64, confidence: f64) -> Self {
        Self {
            tenant_id,
            job: job.into(),
            subject: None,
            score,
            confidence,
            summary: None,
            details: JsonValue::Null,
        }
    }

    pub fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("invalid job input: {0}")]
    InvalidInput(String),

    #[error("advisory job failed: {0}")]
    Failed(String),

    #[error("internal error: {0}")]
    Internal(String),
}
