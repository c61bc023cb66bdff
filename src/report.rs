use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{Report, ReportStats};
use crate::stats;

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    pub completed: usize,
}

pub fn summarize_by_category(reports: &[Report]) -> Vec<CategorySummary> {
    let mut map: std::collections::HashMap<String, (usize, usize)> =
        std::collections::HashMap::new();

    for report in reports {
        let entry = map.entry(report.category.clone()).or_insert((0, 0));
        entry.0 += 1;
        if stats::is_completed(report) {
            entry.1 += 1;
        }
    }

    let mut summaries: Vec<CategorySummary> = map
        .into_iter()
        .map(|(category, (count, completed))| CategorySummary {
            category,
            count,
            completed,
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    summaries
}

pub fn build_report(
    scope: &str,
    assignee: Option<&str>,
    now: NaiveDateTime,
    report_stats: &ReportStats,
    reports: &[Report],
) -> String {
    let summaries = summarize_by_category(reports);

    let mut output = String::new();
    let scope_label = match assignee {
        Some(assignee) => format!("{scope} / {assignee}"),
        None => scope.to_string(),
    };

    let _ = writeln!(output, "# TDP Report Summary");
    let _ = writeln!(
        output,
        "Generated for {} at {}",
        scope_label,
        now.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total reports: {}", report_stats.total_reports);
    let _ = writeln!(output, "- Approved: {}", report_stats.completed_reports);
    let _ = writeln!(output, "- Pending: {}", report_stats.pending_reports);
    let _ = writeln!(output, "- Overdue: {}", report_stats.overdue_reports);
    let _ = writeln!(output, "- Completion rate: {:.1}%", report_stats.completion_rate);
    let _ = writeln!(
        output,
        "- Average completion time: {:.1} days",
        report_stats.average_completion_time
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");

    if report_stats.monthly_stats.is_empty() {
        let _ = writeln!(output, "No trend data available.");
    } else {
        let _ = writeln!(output, "| Month | Reports | Approved | Rate | Avg days |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for month in report_stats.monthly_stats.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {:.1}% | {:.1} |",
                month.month,
                month.total_reports,
                month.completed_reports,
                month.completion_rate,
                month.average_completion_time
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No reports recorded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} reports ({} approved)",
                summary.category, summary.count, summary.completed
            );
        }
    }

    let mut overdue: Vec<&Report> = reports
        .iter()
        .filter(|report| stats::is_overdue(report, now))
        .collect();
    overdue.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overdue Reports");

    if overdue.is_empty() {
        let _ = writeln!(output, "Nothing overdue.");
    } else {
        for report in overdue.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}, {}) due {} [{}]",
                report.title,
                report.tdp_name,
                report.assigned_to,
                report.due_date.format("%Y-%m-%d"),
                report.status
            );
        }
    }

    output
}
