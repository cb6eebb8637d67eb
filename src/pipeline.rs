//! End-to-end reconciliation run: load, group, resolve, emit.
use crate::config::Config;
use crate::emit;
use crate::model::{MediaRow, ReconcileSummary};
use crate::mysql::MetaStore;
use crate::wordpress;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Run the full pipeline against `store`, writing the SQL file named in the
/// config. Load and write failures are fatal; query failures degrade to
/// missing data and surface only in the skip count.
pub async fn run(cfg: &Config, store: &dyn MetaStore) -> Result<ReconcileSummary> {
    info!(path = %cfg.paths.media_map, "loading media map");
    let rows = load_media_map(&cfg.paths.media_map).await?;
    let groups = emit::group_by_post(&rows);
    let post_ids: Vec<i64> = groups.keys().copied().collect();
    info!(rows = rows.len(), posts = post_ids.len(), "grouped media rows by wp_post_id");

    let attachments =
        wordpress::fetch_attachment_lists(store, &post_ids, cfg.wordpress.batch_size).await;
    let attachment_ids: Vec<i64> = attachments
        .values()
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    info!(
        posts_resolved = attachments.len(),
        attachment_ids = attachment_ids.len(),
        "resolved attachment lists"
    );

    let paths =
        wordpress::fetch_attachment_paths(store, &attachment_ids, cfg.wordpress.batch_size).await;
    info!(paths_found = paths.len(), "resolved attachment file paths");

    let (updates, skipped) =
        emit::build_updates(&groups, &attachments, &paths, &cfg.wordpress.base_url);
    write_sql(&cfg.paths.sql_out, &updates).await?;
    info!(
        updates = updates.len(),
        skipped,
        out = %cfg.paths.sql_out,
        "wrote update statements"
    );

    Ok(ReconcileSummary {
        updates: updates.len(),
        skipped,
    })
}

/// Load the precomputed media-to-post mapping. Missing file or malformed
/// JSON is fatal for the run.
pub async fn load_media_map(path: impl AsRef<Path>) -> Result<Vec<MediaRow>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read media map: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("media map is not valid JSON: {}", path.display()))
}

/// Write the statements newline-joined with a trailing newline.
pub async fn write_sql(path: impl AsRef<Path>, statements: &[String]) -> Result<()> {
    let path = path.as_ref();
    let body = statements.join("\n") + "\n";
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write SQL file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn load_media_map_missing_file_is_fatal() {
        let td = tempdir().unwrap();
        let err = load_media_map(td.path().join("absent.json")).await.unwrap_err();
        assert!(err.to_string().contains("failed to read media map"));
    }

    #[tokio::test]
    async fn load_media_map_rejects_malformed_json() {
        let td = tempdir().unwrap();
        let p = td.path().join("map.json");
        tokio::fs::write(&p, "[{\"wp_post_id\": }").await.unwrap();
        let err = load_media_map(&p).await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[tokio::test]
    async fn write_sql_joins_with_trailing_newline() {
        let td = tempdir().unwrap();
        let p = td.path().join("out.sql");
        write_sql(&p, &["a;".to_string(), "b;".to_string()]).await.unwrap();
        let body = tokio::fs::read_to_string(&p).await.unwrap();
        assert_eq!(body, "a;\nb;\n");
    }
}
