use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod config;
mod db;
#[cfg(test)]
mod memory;
mod models;
mod reference;
mod report;
mod service;
mod slice;
mod stats;
mod store;

use crate::models::{
    CreateReportParams, GetReportsParams, Report, ReportPriority, ReportStatus, UpdateReportParams,
};
use crate::reference::StaticCatalog;
use crate::service::ReportService;
use crate::slice::ReportSlice;

#[derive(Parser)]
#[command(name = "civic-report-tracker")]
#[command(about = "Track TDP leader reports, completion and overdue trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import reports from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List reports for an organization, newest first
    List {
        #[arg(long)]
        org: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, value_delimiter = ',')]
        status: Vec<ReportStatus>,
        #[arg(long)]
        category: Option<String>,
        /// Inclusive lower bound on creation date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive upper bound on creation date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a single report
    Show {
        #[arg(long)]
        id: String,
    },
    /// Assign a new report to a TDP leader
    Create {
        #[arg(long)]
        org: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        assignee: String,
        #[arg(long)]
        assigned_by: Option<String>,
        #[arg(long)]
        due: NaiveDate,
        #[arg(long, default_value_t = ReportPriority::Medium)]
        priority: ReportPriority,
        #[arg(long, default_value = "monthly")]
        category: String,
        #[arg(long)]
        tdp: String,
    },
    /// Update content, status or feedback of a report
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long = "attachment")]
        attachments: Vec<String>,
        #[arg(long)]
        status: Option<ReportStatus>,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Delete a report
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Aggregate completion statistics
    Stats {
        #[arg(long)]
        org: String,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// List reporting units of an organization
    Tdp {
        #[arg(long)]
        org: String,
    },
    /// List feedback categories citizens can choose from
    FeedbackTypes {
        #[arg(long)]
        org: String,
    },
    /// Load the cached dashboard state and print its counters
    Dashboard {
        #[arg(long)]
        org: String,
        #[arg(long)]
        assignee: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        org: String,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, default_value_t = 500)]
        limit: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn end_of_day(date: NaiveDate) -> anyhow::Result<NaiveDateTime> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .context("invalid date")
}

fn print_report_line(report: &Report) {
    println!(
        "- {} [{}] {} ({}, {}) due {} priority {}",
        report.id,
        report.status,
        report.title,
        report.tdp_name,
        report.assigned_to,
        report.due_date.format("%Y-%m-%d"),
        report.priority
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let catalog = match &config.catalog_path {
        Some(path) => StaticCatalog::from_json_file(path)?,
        None => StaticCatalog::default(),
    };
    let store = db::PgReportStore::new(pool.clone());
    let service = ReportService::new(Arc::new(store.clone()), Arc::new(catalog));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&store).await?;
            println!("Inserted {inserted} seed reports.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&store, &csv).await?;
            println!("Inserted {inserted} reports from {}.", csv.display());
        }
        Commands::List {
            org,
            assignee,
            status,
            category,
            from,
            to,
            limit,
        } => {
            let params = GetReportsParams {
                assigned_to: assignee,
                status,
                category,
                date_from: from.map(start_of_day),
                date_to: to.map(end_of_day).transpose()?,
                limit: limit.unwrap_or(config.default_limit),
                ..GetReportsParams::new(org)
            };
            let reports = service.get_reports(&params).await;

            if reports.is_empty() {
                println!("No reports found.");
                return Ok(());
            }

            println!("Reports for {}:", params.organization_id);
            for report in reports.iter() {
                print_report_line(report);
            }
        }
        Commands::Show { id } => match service.get_report(&id).await {
            Some(report) => {
                print_report_line(&report);
                println!("  {}", report.description);
                if let Some(content) = &report.content {
                    println!("  content: {content}");
                }
                if let Some(completed_at) = report.completed_at {
                    println!("  completed: {}", completed_at.format("%Y-%m-%d %H:%M"));
                }
                if let Some(feedback) = &report.feedback {
                    println!("  feedback: {feedback}");
                }
                for attachment in report.attachments.iter() {
                    println!("  attachment: {attachment}");
                }
                println!("  submissions: {}", report.submission_history.len());
            }
            None => println!("Report {id} not found."),
        },
        Commands::Create {
            org,
            title,
            description,
            assignee,
            assigned_by,
            due,
            priority,
            category,
            tdp,
        } => {
            let params = CreateReportParams {
                title,
                description,
                assigned_to: assignee,
                assigned_by,
                due_date: end_of_day(due)?,
                priority,
                category,
                organization_id: org,
                tdp_name: tdp,
            };
            if service.create_report(&params).await {
                println!("Report created.");
            } else {
                println!("Report could not be created.");
            }
        }
        Commands::Update {
            id,
            content,
            attachments,
            status,
            feedback,
        } => {
            let params = UpdateReportParams {
                id,
                content,
                attachments: (!attachments.is_empty()).then_some(attachments),
                status,
                feedback,
            };
            if service.update_report(&params).await {
                println!("Report {} updated.", params.id);
            } else {
                println!("Report {} could not be updated.", params.id);
            }
        }
        Commands::Delete { id } => {
            if service.delete_report(&id).await {
                println!("Report {id} deleted.");
            } else {
                println!("Report {id} could not be deleted.");
            }
        }
        Commands::Stats { org, assignee } => {
            let stats = service.get_report_stats(&org, assignee.as_deref()).await;
            println!(
                "{} reports: {} approved, {} pending, {} overdue",
                stats.total_reports,
                stats.completed_reports,
                stats.pending_reports,
                stats.overdue_reports
            );
            println!(
                "Completion rate {:.1}%, average completion {:.1} days",
                stats.completion_rate, stats.average_completion_time
            );
            for month in stats.monthly_stats.iter() {
                println!(
                    "- {}: {} reports, {} approved ({:.1}%), {:.1} days",
                    month.month,
                    month.total_reports,
                    month.completed_reports,
                    month.completion_rate,
                    month.average_completion_time
                );
            }
        }
        Commands::Tdp { org } => {
            let units = service.get_tdp_list(&org).await;
            for unit in units.iter() {
                println!(
                    "- {} ({}): leader {} {}, {} households, {} residents{}",
                    unit.name,
                    unit.id,
                    unit.leader_name,
                    unit.leader_phone,
                    unit.households,
                    unit.population,
                    if unit.is_active { "" } else { " [inactive]" }
                );
            }
        }
        Commands::FeedbackTypes { org } => {
            for feedback_type in service.get_feedback_types(&org).await.iter() {
                println!("{}. {}", feedback_type.order, feedback_type.title);
            }
        }
        Commands::Dashboard { org, assignee } => {
            let mut slice = ReportSlice::new(service);
            let params = GetReportsParams {
                assigned_to: assignee.clone(),
                limit: config.default_limit,
                ..GetReportsParams::new(org.clone())
            };
            slice.get_reports(&params).await;
            slice.get_report_stats(&org, assignee.as_deref()).await;
            slice.get_tdp_list(&org).await;

            let state = slice.state();
            println!(
                "Cached {} reports across {} units.",
                state.reports.len(),
                state.tdp_list.len()
            );
            println!(
                "Open: {}  Overdue: {}  Awaiting review: {}",
                slice.pending_reports_count(assignee.as_deref()),
                slice.overdue_reports_count(assignee.as_deref()),
                slice
                    .reports_by_status(ReportStatus::Submitted, assignee.as_deref())
                    .len()
            );
            if let Some(stats) = &state.report_stats {
                println!(
                    "Organization-wide completion {:.1}% over {} reports.",
                    stats.completion_rate, stats.total_reports
                );
            }
        }
        Commands::Report {
            org,
            assignee,
            limit,
            out,
        } => {
            let stats = service.get_report_stats(&org, assignee.as_deref()).await;
            let params = GetReportsParams {
                assigned_to: assignee.clone(),
                limit,
                ..GetReportsParams::new(org.clone())
            };
            let reports = service.get_reports(&params).await;
            let report = report::build_report(
                &org,
                assignee.as_deref(),
                service.now(),
                &stats,
                &reports,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
