//! Grouping of media rows and rendering of corrective UPDATE statements.
use crate::model::MediaRow;
use std::collections::{BTreeMap, HashMap};

/// Group media rows by their WordPress post id. BTreeMap keeps output order
/// deterministic across runs.
pub fn group_by_post(rows: &[MediaRow]) -> BTreeMap<i64, Vec<MediaRow>> {
    let mut groups: BTreeMap<i64, Vec<MediaRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.wp_post_id).or_default().push(row.clone());
    }
    groups
}

/// Render one UPDATE statement. Single quotes in the URL are doubled; nothing
/// else is escaped.
pub fn render_update(media_id: i64, image_url: &str) -> String {
    let escaped = image_url.replace('\'', "''");
    format!(
        "UPDATE book_media SET \"imageUrl\"='{escaped}', \"thumbnailUrl\"=NULL WHERE id={media_id};"
    )
}

/// Walk each post's rows (sorted by display order, stable) against its
/// attachment list by position and render an UPDATE per resolvable row.
///
/// A row is skipped when its post has no attachment list, its index is beyond
/// the list, or the attachment has no known file path. Each skipped row
/// counts once, so `updates.len() + skipped` equals the total row count.
pub fn build_updates(
    groups: &BTreeMap<i64, Vec<MediaRow>>,
    attachments: &HashMap<i64, Vec<i64>>,
    paths: &HashMap<i64, String>,
    base_url: &str,
) -> (Vec<String>, usize) {
    let mut updates = Vec::new();
    let mut skipped = 0usize;

    for (post_id, rows) in groups {
        let mut rows = rows.clone();
        rows.sort_by_key(|r| r.display_order);
        let list = attachments.get(post_id);

        for (idx, row) in rows.iter().enumerate() {
            let Some(attachment_id) = list.and_then(|l| l.get(idx)) else {
                skipped += 1;
                continue;
            };
            let Some(path) = paths.get(attachment_id) else {
                skipped += 1;
                continue;
            };
            updates.push(render_update(row.media_id, &format!("{base_url}{path}")));
        }
    }

    (updates, skipped)
}
