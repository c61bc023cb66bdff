//! Cached report state with optimistic local mutation.
//!
//! Two cache strategies coexist on purpose: `create_report` invalidates and
//! re-fetches, while `update_report` patches the cached record locally and
//! does not reconcile server-computed fields such as `completed_at` until the
//! next full fetch.

use tracing::{debug, warn};

use crate::models::{
    CreateReportParams, GetReportsParams, Report, ReportStats, ReportStatus, TdpInfo,
    UpdateReportParams,
};
use crate::service::{Outcome, ReportService};
use crate::stats;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportState {
    pub reports: Vec<Report>,
    pub loading_reports: bool,
    pub report_stats: Option<ReportStats>,
    pub loading_stats: bool,
    pub tdp_list: Vec<TdpInfo>,
    pub loading_tdp: bool,
    pub selected_report: Option<Report>,
}

pub struct ReportSlice {
    service: ReportService,
    state: ReportState,
}

impl ReportSlice {
    pub fn new(service: ReportService) -> Self {
        Self {
            service,
            state: ReportState::default(),
        }
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    /// Replaces the whole cache; a failed read keeps the previous reports.
    pub async fn get_reports(&mut self, params: &GetReportsParams) {
        self.state.loading_reports = true;
        match self.service.fetch_reports(params).await {
            Outcome::Loaded(reports) => self.state.reports = reports,
            Outcome::Empty => self.state.reports.clear(),
            Outcome::Failed => {
                warn!(
                    organization_id = %params.organization_id,
                    cached = self.state.reports.len(),
                    "keeping cached reports after failed fetch"
                );
            }
        }
        self.state.loading_reports = false;
    }

    pub async fn create_report(&mut self, params: &CreateReportParams) -> bool {
        let created = self.service.create_report(params).await;
        if created && !self.state.reports.is_empty() {
            let refresh = GetReportsParams::new(params.organization_id.clone());
            self.get_reports(&refresh).await;
        }
        created
    }

    pub async fn update_report(&mut self, params: &UpdateReportParams) -> bool {
        let updated = self.service.update_report(params).await;
        if updated {
            let patched_at = self.service.now();
            if let Some(report) = self.state.reports.iter_mut().find(|r| r.id == params.id) {
                if let Some(content) = &params.content {
                    report.content = Some(content.clone());
                }
                if let Some(attachments) = &params.attachments {
                    report.attachments = attachments.clone();
                }
                if let Some(status) = params.status {
                    report.status = status;
                }
                if let Some(feedback) = &params.feedback {
                    report.feedback = Some(feedback.clone());
                }
                report.updated_at = Some(patched_at);
            } else {
                debug!(report_id = %params.id, "updated report is not cached");
            }
        }
        updated
    }

    pub async fn delete_report(&mut self, id: &str) -> bool {
        let deleted = self.service.delete_report(id).await;
        if deleted {
            self.state.reports.retain(|report| report.id != id);
        }
        deleted
    }

    pub async fn get_report_stats(&mut self, organization_id: &str, assigned_to: Option<&str>) {
        self.state.loading_stats = true;
        match self
            .service
            .fetch_report_stats(organization_id, assigned_to)
            .await
        {
            Outcome::Loaded(stats) => self.state.report_stats = Some(stats),
            Outcome::Empty => self.state.report_stats = Some(ReportStats::default()),
            Outcome::Failed => {
                warn!(organization_id = %organization_id, "keeping cached stats after failed fetch");
            }
        }
        self.state.loading_stats = false;
    }

    pub async fn get_tdp_list(&mut self, organization_id: &str) {
        self.state.loading_tdp = true;
        match self.service.fetch_tdp_list(organization_id).await {
            Outcome::Loaded(units) => self.state.tdp_list = units,
            Outcome::Empty => self.state.tdp_list.clear(),
            Outcome::Failed => {
                warn!(organization_id = %organization_id, "keeping cached TDP list after failed fetch");
            }
        }
        self.state.loading_tdp = false;
    }

    pub fn set_selected_report(&mut self, report: Option<Report>) {
        self.state.selected_report = report;
    }

    /// Counts `pending` and `in_progress`; `submitted` is awaiting review and
    /// is left out here even though the aggregate counts it as pending.
    pub fn pending_reports_count(&self, assigned_to: Option<&str>) -> usize {
        self.cached_for(assigned_to)
            .filter(|r| matches!(r.status, ReportStatus::Pending | ReportStatus::InProgress))
            .count()
    }

    /// Evaluated against the service clock, the same instant the aggregate uses.
    pub fn overdue_reports_count(&self, assigned_to: Option<&str>) -> usize {
        let now = self.service.now();
        self.cached_for(assigned_to)
            .filter(|r| stats::is_overdue(r, now))
            .count()
    }

    pub fn reports_by_status(&self, status: ReportStatus, assigned_to: Option<&str>) -> Vec<Report> {
        self.cached_for(assigned_to)
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    fn cached_for<'a>(&'a self, assigned_to: Option<&'a str>) -> impl Iterator<Item = &'a Report> + 'a {
        self.state
            .reports
            .iter()
            .filter(move |r| assigned_to.map_or(true, |assignee| r.assigned_to == assignee))
    }
}
