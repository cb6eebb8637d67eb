use crate::config::WordPress;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::fmt;
use tokio::process::Command;
use tracing::debug;

/// Cap on stderr text carried into query errors.
const ERR_TEXT_MAX: usize = 200;

/// A queryable metadata store returning rows of tab-separated columns.
///
/// `Err` means the query itself failed (spawn failure or non-zero exit);
/// `Ok` with an empty vec means the query ran and matched nothing. Callers
/// decide which of the two they tolerate.
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>>;
}

/// Metadata store backed by the `mysql` command-line client.
#[derive(Clone)]
pub struct MysqlCli {
    host: String,
    user: String,
    password: String,
    database: String,
}

impl fmt::Debug for MysqlCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlCli")
            .field("host", &self.host)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl MysqlCli {
    pub fn from_config(cfg: &WordPress) -> Self {
        Self {
            host: cfg.host.clone(),
            user: cfg.user.clone(),
            password: cfg.password.clone(),
            database: cfg.database.clone(),
        }
    }
}

#[async_trait]
impl MetaStore for MysqlCli {
    async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        debug!(host = %self.host, db = %self.database, "running mysql query");
        let output = Command::new("mysql")
            .arg("-h")
            .arg(&self.host)
            .arg("-u")
            .arg(&self.user)
            .arg(format!("-p{}", self.password))
            .arg(&self.database)
            .arg("--batch")
            .arg("--skip-column-names")
            .arg("-e")
            .arg(sql)
            .kill_on_drop(true)
            .output()
            .await
            .context("failed to spawn mysql client")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "mysql exited with {}: {}",
                output.status,
                truncate(&stderr, ERR_TEXT_MAX)
            ));
        }

        Ok(parse_rows(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Split `mysql --batch` stdout into rows of columns. Blank lines are dropped.
pub fn parse_rows(stdout: &str) -> Vec<Vec<String>> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
