use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::models::DEFAULT_REPORT_LIMIT;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub catalog_path: Option<PathBuf>,
    pub default_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => val
                .parse()
                .context("Failed to parse DATABASE_MAX_CONNECTIONS")?,
            Err(_) => 5,
        };

        let default_limit = match env::var("REPORT_DEFAULT_LIMIT") {
            Ok(val) => val.parse().context("Failed to parse REPORT_DEFAULT_LIMIT")?,
            Err(_) => DEFAULT_REPORT_LIMIT,
        };

        let catalog_path = env::var("REPORT_CATALOG_PATH").ok().map(PathBuf::from);

        Ok(Config {
            database_url,
            max_connections,
            catalog_path,
            default_limit,
        })
    }
}
