// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-space sync cursors and inactive-space markers.

use chrono::{DateTime, Utc};
use forumbridge_core::SyncError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, format_timestamp, map_tr_err, now_timestamp, parse_timestamp};

/// Read the cursor for a space. `None` means the space was never synced.
pub async fn get_cursor(db: &Database, space_id: &str) -> Result<Option<DateTime<Utc>>, SyncError> {
    let space_id = space_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT cursor FROM sync_cursors WHERE space_id = ?1",
                    params![space_id],
                    |row| row.get(0),
                )
                .optional()?;
            raw.as_deref().map(parse_timestamp).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Move a space's cursor forward. Older values are ignored in SQL, so the
/// cursor never goes backwards even under concurrent writers.
pub async fn advance_cursor(
    db: &Database,
    space_id: &str,
    to: DateTime<Utc>,
) -> Result<(), SyncError> {
    let space_id = space_id.to_string();
    let cursor = format_timestamp(&to);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO sync_cursors (space_id, cursor, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(space_id) DO UPDATE
                 SET cursor = excluded.cursor, updated_at = excluded.updated_at
                 WHERE excluded.cursor > sync_cursors.cursor",
                params![space_id, cursor, now_timestamp()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record that a space no longer exists on the origin.
pub async fn mark_space_inactive(
    db: &Database,
    space_id: &str,
    reason: &str,
) -> Result<(), SyncError> {
    let space_id = space_id.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO inactive_spaces (space_id, reason, detected_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(space_id) DO UPDATE SET reason = excluded.reason",
                params![space_id, reason, now_timestamp()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn is_space_inactive(db: &Database, space_id: &str) -> Result<bool, SyncError> {
    let space_id = space_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM inactive_spaces WHERE space_id = ?1)",
                params![space_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn cursor_starts_empty_and_advances() {
        let (_dir, db) = test_db().await;
        assert!(get_cursor(&db, "spaces/A").await.unwrap().is_none());

        let t1 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        advance_cursor(&db, "spaces/A", t1).await.unwrap();
        assert_eq!(get_cursor(&db, "spaces/A").await.unwrap(), Some(t1));
    }

    #[tokio::test]
    async fn cursor_never_moves_backwards() {
        let (_dir, db) = test_db().await;
        let later = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();

        advance_cursor(&db, "spaces/A", later).await.unwrap();
        advance_cursor(&db, "spaces/A", earlier).await.unwrap();
        assert_eq!(get_cursor(&db, "spaces/A").await.unwrap(), Some(later));

        // Other spaces are unaffected.
        assert!(get_cursor(&db, "spaces/B").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inactive_marker_round_trip() {
        let (_dir, db) = test_db().await;
        assert!(!is_space_inactive(&db, "spaces/gone").await.unwrap());
        mark_space_inactive(&db, "spaces/gone", "404 from origin").await.unwrap();
        mark_space_inactive(&db, "spaces/gone", "still 404").await.unwrap();
        assert!(is_space_inactive(&db, "spaces/gone").await.unwrap());
    }
}
