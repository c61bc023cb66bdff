//! In-memory report store used by the test suite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::store::{ReportDocument, ReportPatch, ReportQuery, ReportStore, StoreError, StoredReport};

/// Evaluates the predicates a document store applies server-side.
pub fn query_matches(query: &ReportQuery, document: &ReportDocument) -> bool {
    document.organization_id == query.organization_id
        && query
            .assigned_to
            .as_ref()
            .map_or(true, |assignee| &document.assigned_to == assignee)
        && query
            .category
            .as_ref()
            .map_or(true, |category| &document.category == category)
        && (query.statuses.is_empty()
            || query
                .statuses
                .iter()
                .any(|status| status.as_str() == document.status))
}

#[derive(Clone, Default)]
pub struct MemoryReportStore {
    records: Arc<Mutex<Vec<StoredReport>>>,
    next_id: Arc<Mutex<u64>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record under a caller-chosen id, bypassing the service.
    pub fn put(&self, id: &str, document: ReportDocument) {
        self.records.lock().unwrap().push(StoredReport {
            id: id.to_string(),
            document,
        });
    }

    pub fn document(&self, id: &str) -> Option<ReportDocument> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.document.clone())
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn query(&self, query: &ReportQuery) -> Result<Vec<StoredReport>, StoreError> {
        self.check_reads()?;
        let mut matches: Vec<StoredReport> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| query_matches(query, &record.document))
            .cloned()
            .collect();

        if query.newest_first {
            // Records without a creation stamp sort last, like NULLS LAST.
            matches.sort_by(|a, b| b.document.created_at.cmp(&a.document.created_at));
        }
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredReport>, StoreError> {
        self.check_reads()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn insert(&self, document: ReportDocument) -> Result<String, StoreError> {
        self.check_writes()?;
        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            format!("mem-{next_id}")
        };
        self.put(&id, document);
        Ok(id)
    }

    async fn update(&self, id: &str, patch: ReportPatch) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(&mut record.document);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.check_writes()?;
        self.records.lock().unwrap().retain(|record| record.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStatus;

    fn document(organization_id: &str, assigned_to: &str, status: &str) -> ReportDocument {
        ReportDocument {
            organization_id: organization_id.to_string(),
            assigned_to: assigned_to.to_string(),
            status: status.to_string(),
            category: "monthly".to_string(),
            ..ReportDocument::default()
        }
    }

    #[test]
    fn query_always_filters_by_organization() {
        let query = ReportQuery::for_organization("org1");
        assert!(query_matches(&query, &document("org1", "leader-1", "pending")));
        assert!(!query_matches(&query, &document("org2", "leader-1", "pending")));
    }

    #[test]
    fn query_status_set_is_membership() {
        let query = ReportQuery {
            statuses: vec![ReportStatus::Pending, ReportStatus::InProgress],
            ..ReportQuery::for_organization("org1")
        };
        assert!(query_matches(&query, &document("org1", "leader-1", "in_progress")));
        assert!(!query_matches(&query, &document("org1", "leader-1", "approved")));
    }

    #[test]
    fn query_combines_assignee_and_category() {
        let query = ReportQuery {
            assigned_to: Some("leader-1".to_string()),
            category: Some("special".to_string()),
            ..ReportQuery::for_organization("org1")
        };
        let mut matching = document("org1", "leader-1", "pending");
        matching.category = "special".to_string();
        assert!(query_matches(&query, &matching));
        assert!(!query_matches(&query, &document("org1", "leader-1", "pending")));
        assert!(!query_matches(&query, &document("org1", "leader-2", "pending")));
    }

    #[tokio::test]
    async fn unset_limit_returns_every_match_newest_first() {
        let store = MemoryReportStore::new();
        for (id, day) in [("a", 1), ("b", 3), ("c", 2)] {
            let mut doc = document("org1", "leader-1", "pending");
            doc.created_at = chrono::DateTime::from_timestamp(day * 86_400, 0);
            store.put(id, doc);
        }
        let query = ReportQuery {
            newest_first: true,
            ..ReportQuery::for_organization("org1")
        };
        let ids: Vec<String> = store
            .query(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }
}
