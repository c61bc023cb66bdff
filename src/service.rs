//! Report access layer.
//!
//! Every operation is stateless and fail-soft: store failures are logged and
//! turned into a safe default (empty list, `None`, zeroed stats or `false`).
//! The `fetch_*` variants return an [`Outcome`] so callers that care can still
//! tell "nothing there" apart from "could not ask".

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::models::{
    CreateReportParams, FeedbackType, GetReportsParams, Report, ReportPriority, ReportStats,
    ReportStatus, TdpInfo, UpdateReportParams,
};
use crate::reference::ReferenceCatalog;
use crate::stats;
use crate::store::{ReportDocument, ReportPatch, ReportQuery, ReportStore, StoredReport};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Loaded(T),
    Empty,
    Failed,
}

impl<T> Outcome<T> {
    #[cfg(test)]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Loaded(value) => Some(value),
            Outcome::Empty | Outcome::Failed => None,
        }
    }
}

impl<T: Default> Outcome<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

impl<T> Outcome<Vec<T>> {
    fn from_list(values: Vec<T>) -> Self {
        if values.is_empty() {
            Outcome::Empty
        } else {
            Outcome::Loaded(values)
        }
    }
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    catalog: Arc<dyn ReferenceCatalog>,
    clock: fn() -> DateTime<Utc>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>, catalog: Arc<dyn ReferenceCatalog>) -> Self {
        Self {
            store,
            catalog,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)().naive_utc()
    }

    pub async fn get_reports(&self, params: &GetReportsParams) -> Vec<Report> {
        self.fetch_reports(params).await.unwrap_or_default()
    }

    /// Date bounds are applied after the store has capped the page at
    /// `params.limit`, so they only narrow that page. A limit of 0 means
    /// no cap.
    pub async fn fetch_reports(&self, params: &GetReportsParams) -> Outcome<Vec<Report>> {
        let query = ReportQuery {
            organization_id: params.organization_id.clone(),
            assigned_to: params.assigned_to.clone(),
            category: params.category.clone(),
            statuses: params.status.clone(),
            newest_first: true,
            limit: (params.limit > 0).then_some(params.limit),
        };

        let records = match self.store.query(&query).await {
            Ok(records) => records,
            Err(err) => {
                error!(
                    error = %err,
                    organization_id = %params.organization_id,
                    "failed to load reports"
                );
                return Outcome::Failed;
            }
        };

        let now = self.now();
        let reports: Vec<Report> = records
            .into_iter()
            .map(|record| normalize(record, now))
            .filter(|report| params.date_from.map_or(true, |from| report.created_at >= from))
            .filter(|report| params.date_to.map_or(true, |to| report.created_at <= to))
            .collect();

        debug!(
            organization_id = %params.organization_id,
            count = reports.len(),
            "loaded reports"
        );
        Outcome::from_list(reports)
    }

    pub async fn get_report(&self, id: &str) -> Option<Report> {
        self.fetch_report(id).await.into_option()
    }

    pub async fn fetch_report(&self, id: &str) -> Outcome<Report> {
        match self.store.get(id).await {
            Ok(Some(record)) => Outcome::Loaded(normalize(record, self.now())),
            Ok(None) => {
                debug!(report_id = %id, "report not found");
                Outcome::Empty
            }
            Err(err) => {
                error!(error = %err, report_id = %id, "failed to load report");
                Outcome::Failed
            }
        }
    }

    pub async fn create_report(&self, params: &CreateReportParams) -> bool {
        let document = ReportDocument {
            title: params.title.clone(),
            description: params.description.clone(),
            assigned_to: params.assigned_to.clone(),
            assigned_by: params.assigned_by.clone(),
            due_date: Some(to_store_time(params.due_date)),
            created_at: Some((self.clock)()),
            status: ReportStatus::Pending.as_str().to_string(),
            priority: params.priority.as_str().to_string(),
            category: params.category.clone(),
            organization_id: params.organization_id.clone(),
            tdp_name: params.tdp_name.clone(),
            submission_history: Vec::new(),
            ..ReportDocument::default()
        };

        match self.store.insert(document).await {
            Ok(id) => {
                info!(report_id = %id, organization_id = %params.organization_id, "report created");
                true
            }
            Err(err) => {
                error!(
                    error = %err,
                    organization_id = %params.organization_id,
                    "failed to create report"
                );
                false
            }
        }
    }

    /// Moving to `approved` or `submitted` always stamps `completed_at`.
    pub async fn update_report(&self, params: &UpdateReportParams) -> bool {
        let completed_at = params
            .status
            .filter(ReportStatus::marks_completion)
            .map(|_| (self.clock)());

        let patch = ReportPatch {
            content: params.content.clone(),
            attachments: params.attachments.clone(),
            status: params.status,
            feedback: params.feedback.clone(),
            completed_at,
        };

        match self.store.update(&params.id, patch).await {
            Ok(()) => {
                info!(report_id = %params.id, status = ?params.status, "report updated");
                true
            }
            Err(err) => {
                error!(error = %err, report_id = %params.id, "failed to update report");
                false
            }
        }
    }

    pub async fn delete_report(&self, id: &str) -> bool {
        match self.store.delete(id).await {
            Ok(()) => {
                info!(report_id = %id, "report deleted");
                true
            }
            Err(err) => {
                error!(error = %err, report_id = %id, "failed to delete report");
                false
            }
        }
    }

    pub async fn get_report_stats(&self, organization_id: &str, assigned_to: Option<&str>) -> ReportStats {
        self.fetch_report_stats(organization_id, assigned_to)
            .await
            .unwrap_or_default()
    }

    /// Reads the whole organization (no cap, no ordering) before aggregating.
    pub async fn fetch_report_stats(
        &self,
        organization_id: &str,
        assigned_to: Option<&str>,
    ) -> Outcome<ReportStats> {
        let query = ReportQuery {
            assigned_to: assigned_to.map(str::to_string),
            ..ReportQuery::for_organization(organization_id)
        };

        match self.store.query(&query).await {
            Ok(records) => {
                let now = self.now();
                let reports: Vec<Report> = records
                    .into_iter()
                    .map(|record| normalize(record, now))
                    .collect();
                Outcome::Loaded(stats::compute_stats(&reports, now))
            }
            Err(err) => {
                error!(
                    error = %err,
                    organization_id = %organization_id,
                    assigned_to = ?assigned_to,
                    "failed to compute report stats"
                );
                Outcome::Failed
            }
        }
    }

    pub async fn get_tdp_list(&self, organization_id: &str) -> Vec<TdpInfo> {
        self.fetch_tdp_list(organization_id).await.unwrap_or_default()
    }

    pub async fn fetch_tdp_list(&self, organization_id: &str) -> Outcome<Vec<TdpInfo>> {
        match self.catalog.tdp_units(organization_id).await {
            Ok(units) => Outcome::from_list(units),
            Err(err) => {
                error!(error = %err, organization_id = %organization_id, "failed to load TDP list");
                Outcome::Failed
            }
        }
    }

    pub async fn get_feedback_types(&self, organization_id: &str) -> Vec<FeedbackType> {
        match self.catalog.feedback_types(organization_id).await {
            Ok(types) => types,
            Err(err) => {
                error!(error = %err, organization_id = %organization_id, "failed to load feedback types");
                Vec::new()
            }
        }
    }
}

pub fn to_store_time(at: NaiveDateTime) -> DateTime<Utc> {
    at.and_utc()
}

/// Converts a persisted record into a [`Report`]. Missing `due_date` and
/// `created_at` fall back to `now`; unknown enum values fall back to
/// `pending` and `medium`.
pub fn normalize(record: StoredReport, now: NaiveDateTime) -> Report {
    let StoredReport { id, document } = record;

    let status = document.status.parse::<ReportStatus>().unwrap_or_else(|err| {
        warn!(report_id = %id, error = %err, "falling back to pending status");
        ReportStatus::Pending
    });
    let priority = document
        .priority
        .parse::<ReportPriority>()
        .unwrap_or_default();

    Report {
        id,
        title: document.title,
        description: document.description,
        assigned_to: document.assigned_to,
        assigned_by: document.assigned_by,
        due_date: document.due_date.map_or(now, |at| at.naive_utc()),
        created_at: document.created_at.map_or(now, |at| at.naive_utc()),
        completed_at: document.completed_at.map(|at| at.naive_utc()),
        updated_at: document.updated_at.map(|at| at.naive_utc()),
        status,
        priority,
        category: document.category,
        content: document.content,
        attachments: document.attachments,
        organization_id: document.organization_id,
        tdp_name: document.tdp_name,
        feedback: document.feedback,
        submission_history: document.submission_history,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::memory::MemoryReportStore;
    use crate::reference::StaticCatalog;
    use chrono::{Duration, TimeZone};

    pub(crate) fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    pub(crate) fn service(store: &MemoryReportStore) -> ReportService {
        ReportService::new(Arc::new(store.clone()), Arc::new(StaticCatalog::default()))
            .with_clock(fixed_now)
    }

    pub(crate) fn document(
        organization_id: &str,
        status: ReportStatus,
        created_at: DateTime<Utc>,
    ) -> ReportDocument {
        ReportDocument {
            title: "Monthly security report".to_string(),
            description: "Summarize incidents".to_string(),
            assigned_to: "leader-1".to_string(),
            assigned_by: Some("admin-1".to_string()),
            due_date: Some(created_at + Duration::days(30)),
            created_at: Some(created_at),
            status: status.as_str().to_string(),
            priority: "high".to_string(),
            category: "monthly".to_string(),
            organization_id: organization_id.to_string(),
            tdp_name: "TDP No. 1".to_string(),
            ..ReportDocument::default()
        }
    }

    fn create_params() -> CreateReportParams {
        CreateReportParams {
            title: "Flood readiness".to_string(),
            description: "Check drainage in quarter 2".to_string(),
            assigned_to: "leader-2".to_string(),
            assigned_by: Some("admin-1".to_string()),
            due_date: (fixed_now() + Duration::days(7)).naive_utc(),
            priority: ReportPriority::Urgent,
            category: "special".to_string(),
            organization_id: "org1".to_string(),
            tdp_name: "TDP No. 2".to_string(),
        }
    }

    #[tokio::test]
    async fn status_filter_returns_newest_first() {
        let store = MemoryReportStore::new();
        let base = fixed_now() - Duration::days(10);
        store.put("a", document("org1", ReportStatus::Pending, base));
        store.put("b", document("org1", ReportStatus::Approved, base + Duration::days(1)));
        store.put("c", document("org1", ReportStatus::InProgress, base + Duration::days(2)));
        store.put("d", document("org2", ReportStatus::Pending, base + Duration::days(3)));

        let params = GetReportsParams {
            status: vec![ReportStatus::Pending, ReportStatus::InProgress],
            ..GetReportsParams::new("org1")
        };
        let ids: Vec<String> = service(&store)
            .get_reports(&params)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn date_bounds_apply_within_limited_page() {
        let store = MemoryReportStore::new();
        let base = fixed_now() - Duration::days(10);
        for day in 0..5 {
            store.put(
                &format!("r{day}"),
                document("org1", ReportStatus::Pending, base + Duration::days(day)),
            );
        }

        let params = GetReportsParams {
            date_from: Some((base + Duration::days(1)).naive_utc()),
            date_to: Some((base + Duration::days(3)).naive_utc()),
            ..GetReportsParams::new("org1")
        };
        let ids: Vec<String> = service(&store)
            .get_reports(&params)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r3", "r2", "r1"]);

        let capped = GetReportsParams { limit: 2, ..params };
        let ids: Vec<String> = service(&store)
            .get_reports(&capped)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r3"]);
    }

    #[tokio::test]
    async fn zero_limit_returns_every_match() {
        let store = MemoryReportStore::new();
        let base = fixed_now() - Duration::days(10);
        for day in 0..3 {
            store.put(
                &format!("r{day}"),
                document("org1", ReportStatus::Pending, base + Duration::days(day)),
            );
        }
        store.put("other", document("org2", ReportStatus::Pending, base));

        let params = GetReportsParams {
            limit: 0,
            ..GetReportsParams::new("org1")
        };
        let ids: Vec<String> = service(&store)
            .get_reports(&params)
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r2", "r1", "r0"]);
    }

    #[tokio::test]
    async fn missing_timestamps_default_to_now() {
        let store = MemoryReportStore::new();
        let mut doc = document("org1", ReportStatus::Pending, fixed_now());
        doc.created_at = None;
        doc.due_date = None;
        doc.status = "archived".to_string();
        store.put("r1", doc);

        let report = service(&store).get_report("r1").await.unwrap();
        assert_eq!(report.created_at, fixed_now().naive_utc());
        assert_eq!(report.due_date, fixed_now().naive_utc());
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.completed_at, None);
    }

    #[tokio::test]
    async fn read_failures_degrade_to_defaults() {
        let store = MemoryReportStore::new();
        store.put("r1", document("org1", ReportStatus::Pending, fixed_now()));
        store.set_fail_reads(true);
        let service = service(&store);

        assert!(service.get_reports(&GetReportsParams::new("org1")).await.is_empty());
        assert!(service.fetch_reports(&GetReportsParams::new("org1")).await.is_failed());
        assert_eq!(service.get_report("r1").await, None);

        let stats = service.get_report_stats("org1", None).await;
        assert_eq!(stats, ReportStats::default());
        assert!(stats.monthly_stats.is_empty());
    }

    #[tokio::test]
    async fn missing_report_is_empty_not_failed() {
        let store = MemoryReportStore::new();
        assert_eq!(service(&store).fetch_report("nope").await, Outcome::Empty);
    }

    #[tokio::test]
    async fn create_forces_pending_and_stamps_creation() {
        let store = MemoryReportStore::new();
        assert!(service(&store).create_report(&create_params()).await);

        let doc = store.document("mem-1").unwrap();
        assert_eq!(doc.status, "pending");
        assert_eq!(doc.priority, "urgent");
        assert_eq!(doc.created_at, Some(fixed_now()));
        assert_eq!(doc.due_date, Some(fixed_now() + Duration::days(7)));
        assert!(doc.submission_history.is_empty());
    }

    #[tokio::test]
    async fn create_failure_returns_false() {
        let store = MemoryReportStore::new();
        store.set_fail_writes(true);
        assert!(!service(&store).create_report(&create_params()).await);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn approval_always_stamps_completion() {
        let store = MemoryReportStore::new();
        store.put("r1", document("org1", ReportStatus::Submitted, fixed_now() - Duration::days(4)));
        let service = service(&store);

        let params = UpdateReportParams {
            status: Some(ReportStatus::Approved),
            feedback: Some("Looks good".to_string()),
            ..UpdateReportParams::new("r1")
        };
        assert!(service.update_report(&params).await);

        let report = service.get_report("r1").await.unwrap();
        assert_eq!(report.status, ReportStatus::Approved);
        assert_eq!(report.completed_at, Some(fixed_now().naive_utc()));
        assert_eq!(report.feedback.as_deref(), Some("Looks good"));
    }

    #[tokio::test]
    async fn content_only_update_leaves_completion_unset() {
        let store = MemoryReportStore::new();
        store.put("r1", document("org1", ReportStatus::InProgress, fixed_now()));
        let service = service(&store);

        let params = UpdateReportParams {
            content: Some("halfway".to_string()),
            ..UpdateReportParams::new("r1")
        };
        assert!(service.update_report(&params).await);
        assert_eq!(store.document("r1").unwrap().completed_at, None);
    }

    #[tokio::test]
    async fn update_of_unknown_report_fails_softly() {
        let store = MemoryReportStore::new();
        let params = UpdateReportParams {
            status: Some(ReportStatus::Rejected),
            ..UpdateReportParams::new("ghost")
        };
        assert!(!service(&store).update_report(&params).await);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = MemoryReportStore::new();
        store.put("r1", document("org1", ReportStatus::Pending, fixed_now()));
        assert!(service(&store).delete_report("r1").await);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn stats_scenario_for_single_organization() {
        let store = MemoryReportStore::new();
        let created = fixed_now() - Duration::days(10);

        let mut quick = document("org1", ReportStatus::Approved, created);
        quick.completed_at = Some(created + Duration::days(3));
        let mut slow = document("org1", ReportStatus::Approved, created);
        slow.completed_at = Some(created + Duration::days(5));
        let mut late = document("org1", ReportStatus::InProgress, created);
        late.due_date = Some(fixed_now() - Duration::days(1));

        store.put("r1", quick);
        store.put("r2", slow);
        store.put("r3", document("org1", ReportStatus::Pending, created));
        store.put("r4", late);
        store.put("other", document("org2", ReportStatus::Approved, created));

        let service = service(&store);
        let stats = service.get_report_stats("org1", None).await;
        assert_eq!(stats.total_reports, 4);
        assert_eq!(stats.completed_reports, 2);
        assert_eq!(stats.pending_reports, 2);
        assert_eq!(stats.overdue_reports, 1);
        assert_eq!(stats.completion_rate, 50.0);
        assert_eq!(stats.average_completion_time, 4.0);
        assert_eq!(stats.monthly_stats.len(), 6);
        assert_eq!(stats.monthly_stats[5].month, "2026-05");

        assert_eq!(service.get_report_stats("org1", None).await, stats);
    }

    #[tokio::test]
    async fn stats_can_be_narrowed_to_one_assignee() {
        let store = MemoryReportStore::new();
        let mut other = document("org1", ReportStatus::Pending, fixed_now());
        other.assigned_to = "leader-9".to_string();
        store.put("r1", document("org1", ReportStatus::Pending, fixed_now()));
        store.put("r2", other);

        let stats = service(&store).get_report_stats("org1", Some("leader-9")).await;
        assert_eq!(stats.total_reports, 1);
    }

    #[tokio::test]
    async fn tdp_list_comes_from_injected_catalog() {
        let store = MemoryReportStore::new();
        let catalog = StaticCatalog {
            units: Vec::new(),
            feedback_types: Vec::new(),
        };
        let service = ReportService::new(Arc::new(store), Arc::new(catalog));
        assert_eq!(service.fetch_tdp_list("org1").await, Outcome::Empty);
        assert!(service.get_feedback_types("org1").await.is_empty());
    }
}
