use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{ReportSubmission, SubmissionStatus};
use crate::store::{ReportDocument, ReportPatch, ReportQuery, ReportStore, StoreError, StoredReport};

const REPORT_COLUMNS: &str = "id, title, description, assigned_to, assigned_by, due_date, \
     created_at, completed_at, updated_at, status, priority, category, content, attachments, \
     organization_id, tdp_name, feedback, submission_history";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_row(row: &PgRow) -> Result<StoredReport, StoreError> {
    let decode = |err: sqlx::Error| StoreError::Decode(err.to_string());
    let history: Json<Vec<ReportSubmission>> = row.try_get("submission_history").map_err(decode)?;

    Ok(StoredReport {
        id: row.try_get("id").map_err(decode)?,
        document: ReportDocument {
            title: row.try_get("title").map_err(decode)?,
            description: row.try_get("description").map_err(decode)?,
            assigned_to: row.try_get("assigned_to").map_err(decode)?,
            assigned_by: row.try_get("assigned_by").map_err(decode)?,
            due_date: row.try_get("due_date").map_err(decode)?,
            created_at: row.try_get("created_at").map_err(decode)?,
            completed_at: row.try_get("completed_at").map_err(decode)?,
            updated_at: row.try_get("updated_at").map_err(decode)?,
            status: row.try_get("status").map_err(decode)?,
            priority: row.try_get("priority").map_err(decode)?,
            category: row.try_get("category").map_err(decode)?,
            content: row.try_get("content").map_err(decode)?,
            attachments: row.try_get("attachments").map_err(decode)?,
            organization_id: row.try_get("organization_id").map_err(decode)?,
            tdp_name: row.try_get("tdp_name").map_err(decode)?,
            feedback: row.try_get("feedback").map_err(decode)?,
            submission_history: history.0,
        },
    })
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn query(&self, query: &ReportQuery) -> Result<Vec<StoredReport>, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {REPORT_COLUMNS} FROM civic_reports.reports WHERE organization_id = "
        ));
        builder.push_bind(&query.organization_id);

        if let Some(assignee) = &query.assigned_to {
            builder.push(" AND assigned_to = ").push_bind(assignee);
        }
        if let Some(category) = &query.category {
            builder.push(" AND category = ").push_bind(category);
        }
        if !query.statuses.is_empty() {
            let statuses: Vec<String> = query
                .statuses
                .iter()
                .map(|status| status.as_str().to_string())
                .collect();
            builder.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if query.newest_first {
            builder.push(" ORDER BY created_at DESC NULLS LAST");
        }
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<StoredReport>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM civic_reports.reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn insert(&self, document: ReportDocument) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO civic_reports.reports
            (id, title, description, assigned_to, assigned_by, due_date, created_at,
             completed_at, updated_at, status, priority, category, content, attachments,
             organization_id, tdp_name, feedback, submission_history)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(&id)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.assigned_to)
        .bind(&document.assigned_by)
        .bind(document.due_date)
        .bind(document.created_at)
        .bind(document.completed_at)
        .bind(document.updated_at)
        .bind(&document.status)
        .bind(&document.priority)
        .bind(&document.category)
        .bind(&document.content)
        .bind(&document.attachments)
        .bind(&document.organization_id)
        .bind(&document.tdp_name)
        .bind(&document.feedback)
        .bind(Json(&document.submission_history))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update(&self, id: &str, patch: ReportPatch) -> Result<(), StoreError> {
        if patch.is_empty() {
            return match self.get(id).await? {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound(id.to_string())),
            };
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE civic_reports.reports SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(content) = patch.content {
                set.push("content = ").push_bind_unseparated(content);
            }
            if let Some(attachments) = patch.attachments {
                set.push("attachments = ").push_bind_unseparated(attachments);
            }
            if let Some(status) = patch.status {
                set.push("status = ")
                    .push_bind_unseparated(status.as_str().to_string());
            }
            if let Some(feedback) = patch.feedback {
                set.push("feedback = ").push_bind_unseparated(feedback);
            }
            if let Some(completed_at) = patch.completed_at {
                set.push("completed_at = ").push_bind_unseparated(completed_at);
            }
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM civic_reports.reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub async fn seed(store: &PgReportStore) -> anyhow::Result<usize> {
    let now = Utc::now();
    let reports = vec![
        (
            "Monthly security summary",
            "leader-tdp-1",
            "TDP No. 1",
            "monthly",
            "approved",
            "medium",
            now - Duration::days(40),
            Some(now - Duration::days(36)),
        ),
        (
            "Household census update",
            "leader-tdp-2",
            "TDP No. 2",
            "monthly",
            "submitted",
            "high",
            now - Duration::days(12),
            Some(now - Duration::days(2)),
        ),
        (
            "Storm damage assessment",
            "leader-tdp-1",
            "TDP No. 1",
            "urgent",
            "in_progress",
            "urgent",
            now - Duration::days(9),
            None,
        ),
        (
            "Street lighting survey",
            "leader-tdp-2",
            "TDP No. 2",
            "special",
            "pending",
            "low",
            now - Duration::days(3),
            None,
        ),
    ];

    let mut inserted = 0usize;
    for (title, assignee, tdp_name, category, status, priority, created_at, completed_at) in reports {
        let history = match completed_at {
            Some(submitted_at) => vec![ReportSubmission {
                submitted_at: submitted_at.naive_utc(),
                content: format!("{title}: completed"),
                attachments: Vec::new(),
                feedback: None,
                status: if status == "approved" {
                    SubmissionStatus::Approved
                } else {
                    SubmissionStatus::Submitted
                },
            }],
            None => Vec::new(),
        };

        store
            .insert(ReportDocument {
                title: title.to_string(),
                description: format!("{title} for {tdp_name}"),
                assigned_to: assignee.to_string(),
                assigned_by: Some("admin-ward".to_string()),
                due_date: Some(created_at + Duration::days(7)),
                created_at: Some(created_at),
                completed_at,
                status: status.to_string(),
                priority: priority.to_string(),
                category: category.to_string(),
                content: completed_at.map(|_| format!("{title}: completed")),
                organization_id: "ward-ha-huy-tap".to_string(),
                tdp_name: tdp_name.to_string(),
                submission_history: history,
                ..ReportDocument::default()
            })
            .await
            .context("failed to insert seed report")?;
        inserted += 1;
    }

    Ok(inserted)
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    title: String,
    description: String,
    assigned_to: String,
    assigned_by: Option<String>,
    organization_id: String,
    tdp_name: String,
    category: String,
    priority: String,
    status: String,
    due_date: NaiveDate,
    created_at: Option<NaiveDate>,
    completed_at: Option<NaiveDate>,
}

impl CsvRow {
    fn into_document(self) -> ReportDocument {
        ReportDocument {
            title: self.title,
            description: self.description,
            assigned_to: self.assigned_to,
            assigned_by: self.assigned_by.filter(|value| !value.is_empty()),
            due_date: Some(start_of_day(self.due_date)),
            created_at: self.created_at.map(start_of_day),
            completed_at: self.completed_at.map(start_of_day),
            status: self.status,
            priority: self.priority,
            category: self.category,
            organization_id: self.organization_id,
            tdp_name: self.tdp_name,
            ..ReportDocument::default()
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

pub async fn import_csv(store: &dyn ReportStore, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        store
            .insert(row.into_document())
            .await
            .with_context(|| format!("failed to insert CSV row {}", line + 1))?;
        inserted += 1;
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryReportStore;
    use std::io::Write;

    #[test]
    fn csv_row_keeps_raw_enums_and_optional_dates() {
        let row = CsvRow {
            title: "Census".to_string(),
            description: "Count households".to_string(),
            assigned_to: "leader-1".to_string(),
            assigned_by: Some(String::new()),
            organization_id: "org1".to_string(),
            tdp_name: "TDP No. 1".to_string(),
            category: "monthly".to_string(),
            priority: "high".to_string(),
            status: "approved".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            created_at: None,
            completed_at: NaiveDate::from_ymd_opt(2026, 3, 20),
        };

        let doc = row.into_document();
        assert_eq!(doc.assigned_by, None);
        assert_eq!(doc.created_at, None);
        assert_eq!(doc.status, "approved");
        assert_eq!(
            doc.completed_at.map(|at| at.date_naive()),
            NaiveDate::from_ymd_opt(2026, 3, 20)
        );
    }

    #[tokio::test]
    async fn import_inserts_every_row() {
        let path = std::env::temp_dir().join(format!("reports-{}.csv", Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(
                file,
                "title,description,assigned_to,assigned_by,organization_id,tdp_name,category,priority,status,due_date,created_at,completed_at"
            )
            .unwrap();
            writeln!(
                file,
                "Census,Count households,leader-1,admin-1,org1,TDP No. 1,monthly,high,approved,2026-03-31,2026-03-01,2026-03-20"
            )
            .unwrap();
            writeln!(
                file,
                "Lighting,Survey lamps,leader-2,,org1,TDP No. 2,special,low,pending,2026-04-30,,"
            )
            .unwrap();
        }

        let store = MemoryReportStore::new();
        let inserted = import_csv(&store, &path).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(inserted, 2);
        assert_eq!(store.document("mem-2").unwrap().status, "pending");
    }
}
