use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use wp_media_reconcile::{config, mysql::MysqlCli, pipeline};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Generate corrective book_media imageUrl UPDATE statements from WordPress attachment metadata."
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries only the final DONE line.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let store = MysqlCli::from_config(&cfg.wordpress);
    let summary = pipeline::run(&cfg, &store).await?;

    println!("DONE: {} statements", summary.updates);
    Ok(())
}
