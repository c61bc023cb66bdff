//! Organization-scoped reference data: reporting units and feedback types.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{FeedbackType, TdpInfo};

#[async_trait]
pub trait ReferenceCatalog: Send + Sync {
    async fn tdp_units(&self, organization_id: &str) -> anyhow::Result<Vec<TdpInfo>>;

    async fn feedback_types(&self, organization_id: &str) -> anyhow::Result<Vec<FeedbackType>>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TdpEntry {
    pub id: String,
    pub name: String,
    pub leader_id: String,
    pub leader_name: String,
    pub leader_phone: String,
    pub address: String,
    pub households: u32,
    pub population: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Catalog held in memory; every organization sees the same entries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StaticCatalog {
    #[serde(default)]
    pub units: Vec<TdpEntry>,
    #[serde(default)]
    pub feedback_types: Vec<FeedbackType>,
}

impl StaticCatalog {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalog {}", path.display()))
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self {
            units: vec![
                TdpEntry {
                    id: "tdp-1".to_string(),
                    name: "TDP No. 1".to_string(),
                    leader_id: "leader-tdp-1".to_string(),
                    leader_name: "Nguyen Van A".to_string(),
                    leader_phone: "0123456789".to_string(),
                    address: "Quarter 1, Ha Huy Tap ward".to_string(),
                    households: 120,
                    population: 350,
                    is_active: true,
                },
                TdpEntry {
                    id: "tdp-2".to_string(),
                    name: "TDP No. 2".to_string(),
                    leader_id: "leader-tdp-2".to_string(),
                    leader_name: "Tran Thi B".to_string(),
                    leader_phone: "0123456788".to_string(),
                    address: "Quarter 2, Ha Huy Tap ward".to_string(),
                    households: 95,
                    population: 280,
                    is_active: true,
                },
            ],
            feedback_types: vec![
                feedback_type(1, "Public order and security"),
                feedback_type(2, "Culture and society"),
                feedback_type(3, "Land, construction, business and urban affairs"),
                feedback_type(4, "Other"),
            ],
        }
    }
}

fn feedback_type(id: u32, title: &str) -> FeedbackType {
    FeedbackType {
        id,
        title: title.to_string(),
        order: id,
    }
}

#[async_trait]
impl ReferenceCatalog for StaticCatalog {
    async fn tdp_units(&self, organization_id: &str) -> anyhow::Result<Vec<TdpInfo>> {
        Ok(self
            .units
            .iter()
            .map(|entry| TdpInfo {
                id: entry.id.clone(),
                name: entry.name.clone(),
                leader_id: entry.leader_id.clone(),
                leader_name: entry.leader_name.clone(),
                leader_phone: entry.leader_phone.clone(),
                address: entry.address.clone(),
                households: entry.households,
                population: entry.population,
                organization_id: organization_id.to_string(),
                is_active: entry.is_active,
            })
            .collect())
    }

    async fn feedback_types(&self, _organization_id: &str) -> anyhow::Result<Vec<FeedbackType>> {
        let mut types = self.feedback_types.clone();
        types.sort_by_key(|t| t.order);
        Ok(types)
    }
}
