//! Document-store contract consumed by the report service.
//!
//! Records cross this seam in their persisted shape: timestamps are
//! `DateTime<Utc>`, enums are raw strings and any field may be missing.
//! Normalization into [`crate::models::Report`] happens in the service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ReportStatus, ReportSubmission};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Could not decode record: {0}")]
    Decode(String),

    #[cfg(test)]
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persisted fields of a report document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub assigned_by: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: String,
    pub priority: String,
    pub category: String,
    pub content: Option<String>,
    pub attachments: Vec<String>,
    pub organization_id: String,
    pub tdp_name: String,
    pub feedback: Option<String>,
    pub submission_history: Vec<ReportSubmission>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub id: String,
    pub document: ReportDocument,
}

/// Predicates the store can evaluate server-side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportQuery {
    pub organization_id: String,
    pub assigned_to: Option<String>,
    pub category: Option<String>,
    pub statuses: Vec<ReportStatus>,
    pub newest_first: bool,
    pub limit: Option<usize>,
}

impl ReportQuery {
    pub fn for_organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            ..Self::default()
        }
    }
}

/// Partial update; `None` leaves the stored field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub status: Option<ReportStatus>,
    pub feedback: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ReportPatch {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.attachments.is_none()
            && self.status.is_none()
            && self.feedback.is_none()
            && self.completed_at.is_none()
    }

    pub fn apply(self, document: &mut ReportDocument) {
        if let Some(content) = self.content {
            document.content = Some(content);
        }
        if let Some(attachments) = self.attachments {
            document.attachments = attachments;
        }
        if let Some(status) = self.status {
            document.status = status.as_str().to_string();
        }
        if let Some(feedback) = self.feedback {
            document.feedback = Some(feedback);
        }
        if let Some(completed_at) = self.completed_at {
            document.completed_at = Some(completed_at);
        }
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn query(&self, query: &ReportQuery) -> Result<Vec<StoredReport>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<StoredReport>, StoreError>;

    /// Insert a new document and return the id the store assigned.
    async fn insert(&self, document: ReportDocument) -> Result<String, StoreError>;

    /// Fails with [`StoreError::NotFound`] when no document has this id.
    async fn update(&self, id: &str, patch: ReportPatch) -> Result<(), StoreError>;

    /// Deleting a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
