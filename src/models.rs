use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REPORT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Submitted,
    Approved,
    Rejected,
    /// Declared for display; aggregation derives overdue from the due date.
    Overdue,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 6] = [
        ReportStatus::Pending,
        ReportStatus::InProgress,
        ReportStatus::Submitted,
        ReportStatus::Approved,
        ReportStatus::Rejected,
        ReportStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Overdue => "overdue",
        }
    }

    /// Statuses that stamp `completed_at` when written.
    pub fn marks_completion(&self) -> bool {
        matches!(self, ReportStatus::Approved | ReportStatus::Submitted)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ReportStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown report status `{value}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl ReportPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPriority::Low => "low",
            ReportPriority::Medium => "medium",
            ReportPriority::High => "high",
            ReportPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for ReportPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportPriority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "low" => Ok(ReportPriority::Low),
            "medium" => Ok(ReportPriority::Medium),
            "high" => Ok(ReportPriority::High),
            "urgent" => Ok(ReportPriority::Urgent),
            other => Err(format!("unknown report priority `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub submitted_at: NaiveDateTime,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub feedback: Option<String>,
    pub status: SubmissionStatus,
}

/// A report as handed to callers, with timestamps already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub assigned_by: Option<String>,
    pub due_date: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub category: String,
    pub content: Option<String>,
    pub attachments: Vec<String>,
    pub organization_id: String,
    pub tdp_name: String,
    pub feedback: Option<String>,
    pub submission_history: Vec<ReportSubmission>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdpInfo {
    pub id: String,
    pub name: String,
    pub leader_id: String,
    pub leader_name: String,
    pub leader_phone: String,
    pub address: String,
    pub households: u32,
    pub population: u32,
    pub organization_id: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackType {
    pub id: u32,
    pub title: String,
    pub order: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportStats {
    pub total_reports: usize,
    pub completed_reports: usize,
    pub pending_reports: usize,
    pub overdue_reports: usize,
    pub completion_rate: f64,
    pub average_completion_time: f64,
    pub monthly_stats: Vec<MonthlyReportStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReportStats {
    /// `YYYY-MM`
    pub month: String,
    pub total_reports: usize,
    pub completed_reports: usize,
    pub completion_rate: f64,
    pub average_completion_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetReportsParams {
    pub organization_id: String,
    pub assigned_to: Option<String>,
    pub status: Vec<ReportStatus>,
    pub category: Option<String>,
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    pub limit: usize,
}

impl GetReportsParams {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            assigned_to: None,
            status: Vec::new(),
            category: None,
            date_from: None,
            date_to: None,
            limit: DEFAULT_REPORT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateReportParams {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub assigned_by: Option<String>,
    pub due_date: NaiveDateTime,
    pub priority: ReportPriority,
    pub category: String,
    pub organization_id: String,
    pub tdp_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReportParams {
    pub id: String,
    pub content: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub status: Option<ReportStatus>,
    pub feedback: Option<String>,
}

#[cfg(test)]
impl UpdateReportParams {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}
