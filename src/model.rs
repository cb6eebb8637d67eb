use serde::{Deserialize, Serialize};

/// One image row from the application's `book_media` table, pre-joined to the
/// WordPress product post that owns its attachments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaRow {
    pub wp_post_id: i64,
    pub media_id: i64,
    #[serde(rename = "displayOrder")]
    pub display_order: i64,
    #[serde(rename = "isPrimary")]
    pub is_primary: bool,
}

/// Outcome of one reconciliation run. Every input row ends up in exactly one
/// of the two buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub updates: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_row_deserializes_camel_case_fields() {
        let row: MediaRow = serde_json::from_str(
            r#"{"wp_post_id": 10, "media_id": 5, "displayOrder": 0, "isPrimary": true}"#,
        )
        .unwrap();
        assert_eq!(row.wp_post_id, 10);
        assert_eq!(row.media_id, 5);
        assert_eq!(row.display_order, 0);
        assert!(row.is_primary);
    }
}
