use chrono::{Datelike, NaiveDateTime};

use crate::models::{MonthlyReportStats, Report, ReportStats, ReportStatus};

pub const TREND_MONTHS: i32 = 6;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub fn compute_stats(reports: &[Report], now: NaiveDateTime) -> ReportStats {
    let total_reports = reports.len();
    let completed_reports = reports.iter().filter(|r| is_completed(r)).count();
    let pending_reports = reports.iter().filter(|r| is_pending(r)).count();
    let overdue_reports = reports.iter().filter(|r| is_overdue(r, now)).count();

    ReportStats {
        total_reports,
        completed_reports,
        pending_reports,
        overdue_reports,
        completion_rate: completion_rate(completed_reports, total_reports),
        average_completion_time: average_completion_time(reports.iter()),
        monthly_stats: monthly_stats(reports, now),
    }
}

/// Six `YYYY-MM` buckets ending at the month of `now`, oldest first.
pub fn monthly_stats(reports: &[Report], now: NaiveDateTime) -> Vec<MonthlyReportStats> {
    let anchor = month_index(now);

    (0..TREND_MONTHS)
        .rev()
        .map(|offset| {
            let index = anchor - offset;
            let in_month: Vec<&Report> = reports
                .iter()
                .filter(|report| month_index(report.created_at) == index)
                .collect();
            let total_reports = in_month.len();
            let completed_reports = in_month.iter().filter(|r| is_completed(r)).count();

            MonthlyReportStats {
                month: month_key(index),
                total_reports,
                completed_reports,
                completion_rate: completion_rate(completed_reports, total_reports),
                average_completion_time: average_completion_time(in_month.into_iter()),
            }
        })
        .collect()
}

pub fn is_completed(report: &Report) -> bool {
    report.status == ReportStatus::Approved
}

pub fn is_pending(report: &Report) -> bool {
    matches!(
        report.status,
        ReportStatus::Pending | ReportStatus::InProgress | ReportStatus::Submitted
    )
}

pub fn is_overdue(report: &Report, now: NaiveDateTime) -> bool {
    report.due_date < now && report.status != ReportStatus::Approved
}

pub fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}

/// Whole days from creation to completion, rounded up.
pub fn completion_days(report: &Report) -> Option<i64> {
    let completed_at = report.completed_at?;
    let millis = (completed_at - report.created_at).num_milliseconds();
    Some((millis as f64 / MILLIS_PER_DAY).ceil() as i64)
}

pub fn average_completion_time<'a>(reports: impl Iterator<Item = &'a Report>) -> f64 {
    let (sum, count) = reports
        .filter_map(completion_days)
        .fold((0i64, 0usize), |(sum, count), days| (sum + days, count + 1));

    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

fn month_index(at: NaiveDateTime) -> i32 {
    at.year() * 12 + at.month0() as i32
}

fn month_key(index: i32) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}
