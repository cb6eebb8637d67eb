//! Batched lookups against the WordPress `wp_postmeta` table.
use crate::mysql::MetaStore;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

pub const META_THUMBNAIL_ID: &str = "_thumbnail_id";
pub const META_PRODUCT_GALLERY: &str = "_product_image_gallery";
pub const META_ATTACHED_FILE: &str = "_wp_attached_file";

/// For each post id, resolve the ordered list of attachment ids: featured
/// image first, then gallery ids in stored order, deduplicated. Posts that
/// resolve to an empty list get no entry.
///
/// A failed batch is logged and treated as returning zero rows; resolution
/// continues with the next batch.
pub async fn fetch_attachment_lists(
    store: &dyn MetaStore,
    post_ids: &[i64],
    batch_size: usize,
) -> HashMap<i64, Vec<i64>> {
    let mut lists: HashMap<i64, Vec<i64>> = HashMap::new();
    let total_batches = batch_count(post_ids.len(), batch_size);

    for (idx, chunk) in post_ids.chunks(batch_size).enumerate() {
        let sql = format!(
            "SELECT post_id, meta_key, meta_value FROM wp_postmeta \
             WHERE post_id IN ({}) \
             AND meta_key IN ('{META_THUMBNAIL_ID}', '{META_PRODUCT_GALLERY}')",
            join_ids(chunk)
        );
        let rows = match store.query(&sql).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(batch = idx + 1, error = %err, "postmeta query failed; treating batch as empty");
                Vec::new()
            }
        };

        // Collect thumbnail and gallery values per post before building lists.
        let mut meta: HashMap<i64, (Option<String>, Option<String>)> = HashMap::new();
        for row in rows {
            let Ok([post_id, meta_key, meta_value]) = <[String; 3]>::try_from(row) else {
                continue;
            };
            let Ok(post_id) = post_id.parse::<i64>() else {
                continue;
            };
            let entry = meta.entry(post_id).or_default();
            match meta_key.as_str() {
                META_THUMBNAIL_ID => entry.0 = Some(meta_value),
                META_PRODUCT_GALLERY => entry.1 = Some(meta_value),
                _ => {}
            }
        }
        for (post_id, (thumbnail, gallery)) in meta {
            let attachments = build_attachment_list(thumbnail.as_deref(), gallery.as_deref());
            if !attachments.is_empty() {
                lists.insert(post_id, attachments);
            }
        }

        info!(batch = idx + 1, total = total_batches, "processed postmeta batch");
    }

    lists
}

/// Resolve each attachment id to its relative file path via
/// `_wp_attached_file`. Ids with no (or an empty) path get no entry.
pub async fn fetch_attachment_paths(
    store: &dyn MetaStore,
    attachment_ids: &[i64],
    batch_size: usize,
) -> HashMap<i64, String> {
    let mut paths: HashMap<i64, String> = HashMap::new();
    let total_batches = batch_count(attachment_ids.len(), batch_size);

    for (idx, chunk) in attachment_ids.chunks(batch_size).enumerate() {
        let sql = format!(
            "SELECT post_id, meta_value FROM wp_postmeta \
             WHERE post_id IN ({}) \
             AND meta_key = '{META_ATTACHED_FILE}'",
            join_ids(chunk)
        );
        let rows = match store.query(&sql).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(batch = idx + 1, error = %err, "attached-file query failed; treating batch as empty");
                Vec::new()
            }
        };
        for row in rows {
            let Ok([attachment_id, path]) = <[String; 2]>::try_from(row) else {
                continue;
            };
            let Ok(attachment_id) = attachment_id.parse::<i64>() else {
                continue;
            };
            if !path.is_empty() {
                paths.insert(attachment_id, path);
            }
        }

        info!(batch = idx + 1, total = total_batches, "processed file-path batch");
    }

    paths
}

/// Build a post's ordered attachment-id list from its raw metadata values:
/// thumbnail first, then gallery ids, skipping empties, non-numeric tokens
/// and anything already listed.
pub fn build_attachment_list(thumbnail: Option<&str>, gallery: Option<&str>) -> Vec<i64> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    if let Some(id) = thumbnail
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
    {
        seen.insert(id);
        ids.push(id);
    }
    if let Some(gallery) = gallery {
        for token in gallery.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let Ok(id) = token.parse::<i64>() else {
                continue;
            };
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }

    ids
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn batch_count(total: usize, batch_size: usize) -> usize {
    (total + batch_size - 1) / batch_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a scripted sequence of query results; records the SQL it saw.
    struct ScriptedStore {
        responses: Mutex<VecDeque<Result<Vec<Vec<String>>>>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn new(responses: Vec<Result<Vec<Vec<String>>>>) -> Self {
            Self {
                responses: Mutex::new(VecDeque::from(responses)),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetaStore for ScriptedStore {
        async fn query(&self, sql: &str) -> Result<Vec<Vec<String>>> {
            self.queries.lock().unwrap().push(sql.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn row(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn attachment_list_thumbnail_first_then_gallery() {
        assert_eq!(
            build_attachment_list(Some("99"), Some("7, 8")),
            vec![99, 7, 8]
        );
    }

    #[test]
    fn attachment_list_dedupes_thumbnail_and_repeats() {
        assert_eq!(build_attachment_list(Some("7"), Some("7,8,7")), vec![7, 8]);
    }

    #[test]
    fn attachment_list_skips_empty_and_junk_tokens() {
        assert_eq!(
            build_attachment_list(Some(" "), Some("3,,abc, 4 ")),
            vec![3, 4]
        );
        assert!(build_attachment_list(None, None).is_empty());
    }

    #[tokio::test]
    async fn fetch_lists_groups_meta_per_post() {
        let store = ScriptedStore::new(vec![Ok(vec![
            row(&["10", "_thumbnail_id", "99"]),
            row(&["10", "_product_image_gallery", "7,99,8"]),
            row(&["11", "_product_image_gallery", "5"]),
            row(&["12", "_thumbnail_id", ""]),
            row(&["bogus"]),
        ])]);

        let lists = fetch_attachment_lists(&store, &[10, 11, 12], 2000).await;
        assert_eq!(lists.get(&10), Some(&vec![99, 7, 8]));
        assert_eq!(lists.get(&11), Some(&vec![5]));
        // Empty thumbnail and no gallery: post contributes nothing.
        assert!(!lists.contains_key(&12));

        let queries = store.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("post_id IN (10,11,12)"));
        assert!(queries[0].contains("'_thumbnail_id', '_product_image_gallery'"));
    }

    #[tokio::test]
    async fn fetch_lists_batches_by_configured_size() {
        let store = ScriptedStore::new(vec![
            Ok(vec![row(&["1", "_thumbnail_id", "100"])]),
            Ok(vec![row(&["3", "_thumbnail_id", "300"])]),
        ]);

        let lists = fetch_attachment_lists(&store, &[1, 2, 3], 2).await;
        assert_eq!(lists.len(), 2);

        let queries = store.queries();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("IN (1,2)"));
        assert!(queries[1].contains("IN (3)"));
    }

    #[tokio::test]
    async fn failed_batch_degrades_to_empty_and_continues() {
        let store = ScriptedStore::new(vec![
            Err(anyhow!("mysql exited with exit status: 1: gone")),
            Ok(vec![row(&["3", "_thumbnail_id", "300"])]),
        ]);

        let lists = fetch_attachment_lists(&store, &[1, 2, 3], 2).await;
        assert_eq!(lists.get(&3), Some(&vec![300]));
        assert!(!lists.contains_key(&1));
    }

    #[tokio::test]
    async fn fetch_paths_skips_empty_and_malformed() {
        let store = ScriptedStore::new(vec![Ok(vec![
            row(&["99", "2020/01/cover.jpg"]),
            row(&["7", ""]),
            row(&["not-a-number", "x.jpg"]),
            row(&["8"]),
        ])]);

        let paths = fetch_attachment_paths(&store, &[7, 8, 99], 2000).await;
        assert_eq!(paths.get(&99).map(String::as_str), Some("2020/01/cover.jpg"));
        assert!(!paths.contains_key(&7));
        assert!(!paths.contains_key(&8));

        let queries = store.queries();
        assert!(queries[0].contains("meta_key = '_wp_attached_file'"));
    }
}
