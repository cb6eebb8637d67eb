use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    about = "Apply generated book_media UPDATE statements to the application Postgres database in batched transactions."
)]
struct Args {
    /// Path to the generated SQL file
    #[arg(long, default_value = "/tmp/correct_image_updates.sql")]
    sql: PathBuf,

    /// Statements per transaction
    #[arg(long, default_value_t = 500)]
    batch: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let content = tokio::fs::read_to_string(&args.sql)
        .await
        .with_context(|| format!("failed to read SQL file: {}", args.sql.display()))?;
    let statements: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("UPDATE"))
        .collect();
    info!(total = statements.len(), "loaded statements");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let batch_size = args.batch.max(1);
    let mut changed: u64 = 0;
    let mut errors = 0usize;
    let mut applied = 0usize;

    for (batch_no, chunk) in statements.chunks(batch_size).enumerate() {
        match apply_batch(&pool, chunk).await {
            Ok(rows) => changed += rows,
            Err(err) => {
                errors += 1;
                let text = err.to_string();
                error!(
                    batch = batch_no + 1,
                    error = truncate(&text, 100),
                    "batch failed; rolled back"
                );
            }
        }
        applied += chunk.len();
        if batch_no % 10 == 0 {
            info!(applied, total = statements.len(), changed, "progress");
        }
    }

    println!(
        "DONE. {} statements, {} rows changed, {} errors.",
        statements.len(),
        changed,
        errors
    );
    Ok(())
}

/// Run one batch inside a transaction. Any statement error drops the
/// transaction, rolling the whole batch back.
async fn apply_batch(pool: &PgPool, statements: &[&str]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut changed = 0u64;
    for stmt in statements {
        let res = sqlx::query(stmt).execute(&mut *tx).await?;
        changed += res.rows_affected();
    }
    tx.commit().await?;
    Ok(changed)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
