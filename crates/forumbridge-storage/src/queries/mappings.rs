// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping table operations.
//!
//! Table names come from [`MappingKind::table`] and are never user input.

use forumbridge_core::{MappingKind, MappingRecord, SyncError, UserRecord};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, now_timestamp};

/// Look up the destination ID for an origin ID.
pub async fn get_destination(
    db: &Database,
    kind: MappingKind,
    origin_id: &str,
) -> Result<Option<String>, SyncError> {
    let origin_id = origin_id.to_string();
    let sql = format!(
        "SELECT destination_id FROM {} WHERE origin_id = ?1",
        kind.table()
    );
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(&sql, params![origin_id], |row| row.get(0))
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Reverse lookup by destination ID. The oldest matching row wins.
pub async fn get_by_destination(
    db: &Database,
    kind: MappingKind,
    destination_id: &str,
) -> Result<Option<MappingRecord>, SyncError> {
    let destination_id = destination_id.to_string();
    let sql = format!(
        "SELECT origin_id, destination_id, origin_parent_id, created_at
         FROM {} WHERE destination_id = ?1
         ORDER BY created_at ASC, rowid ASC LIMIT 1",
        kind.table()
    );
    db.connection()
        .call(move |conn| -> Result<Option<MappingRecord>, rusqlite::Error> {
            conn.query_row(&sql, params![destination_id], |row| {
                Ok(MappingRecord {
                    kind,
                    origin_id: row.get(0)?,
                    destination_id: row.get(1)?,
                    origin_parent_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a mapping atomically.
///
/// Returns `MappingConflict` with the stored destination ID if the origin ID
/// is already mapped. The check and insert happen in one statement, so
/// concurrent callers cannot both succeed.
pub async fn insert_mapping(
    db: &Database,
    kind: MappingKind,
    origin_id: &str,
    destination_id: &str,
    origin_parent_id: Option<&str>,
) -> Result<(), SyncError> {
    let owned_origin = origin_id.to_string();
    let destination_id = destination_id.to_string();
    let origin_parent_id = origin_parent_id.map(str::to_string);
    let table = kind.table();
    let existing = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let inserted = conn.execute(
                &format!(
                    "INSERT INTO {table} (origin_id, destination_id, origin_parent_id, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(origin_id) DO NOTHING"
                ),
                params![owned_origin, destination_id, origin_parent_id, now_timestamp()],
            )?;
            if inserted == 1 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT destination_id FROM {table} WHERE origin_id = ?1"),
                params![owned_origin],
                |row| row.get(0),
            )
            .map(Some)
        })
        .await
        .map_err(map_tr_err)?;

    match existing {
        None => Ok(()),
        Some(existing) => Err(SyncError::MappingConflict {
            kind,
            origin_id: origin_id.to_string(),
            existing,
        }),
    }
}

/// Record a new topic and its opening post in one transaction.
///
/// Both rows commit together, so a thread is never mapped without its
/// opening message. If the thread is already mapped, the opening message is
/// still recorded and `MappingConflict` carries the stored topic ID.
pub async fn insert_topic(
    db: &Database,
    thread: (&str, &str),
    opening: (&str, &str),
    space_id: &str,
) -> Result<(), SyncError> {
    let (thread_id, topic_id) = (thread.0.to_string(), thread.1.to_string());
    let (message_id, post_id) = (opening.0.to_string(), opening.1.to_string());
    let space_id = space_id.to_string();
    let owned_thread = thread_id.clone();
    let existing = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let now = now_timestamp();
            let inserted = tx.execute(
                "INSERT INTO thread_topic (origin_id, destination_id, origin_parent_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(origin_id) DO NOTHING",
                params![owned_thread, topic_id, space_id, now],
            )?;
            let existing = if inserted == 1 {
                None
            } else {
                Some(tx.query_row(
                    "SELECT destination_id FROM thread_topic WHERE origin_id = ?1",
                    params![owned_thread],
                    |row| row.get(0),
                )?)
            };
            tx.execute(
                "INSERT INTO message_post (origin_id, destination_id, origin_parent_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(origin_id) DO NOTHING",
                params![message_id, post_id, owned_thread, now],
            )?;
            tx.commit()?;
            Ok(existing)
        })
        .await
        .map_err(map_tr_err)?;

    match existing {
        None => Ok(()),
        Some(existing) => Err(SyncError::MappingConflict {
            kind: MappingKind::ThreadTopic,
            origin_id: thread_id,
            existing,
        }),
    }
}

/// Insert a user mapping with display details.
pub async fn record_user(db: &Database, user: &UserRecord) -> Result<(), SyncError> {
    let record = user.clone();
    let existing = db
        .connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO user_mapping (origin_id, destination_id, display_name, email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(origin_id) DO NOTHING",
                params![
                    record.origin_id,
                    record.handle,
                    record.display_name,
                    record.email,
                    now_timestamp(),
                ],
            )?;
            if inserted == 1 {
                return Ok(None);
            }
            conn.query_row(
                "SELECT destination_id FROM user_mapping WHERE origin_id = ?1",
                params![record.origin_id],
                |row| row.get(0),
            )
            .map(Some)
        })
        .await
        .map_err(map_tr_err)?;

    match existing {
        None => Ok(()),
        Some(existing) => Err(SyncError::MappingConflict {
            kind: MappingKind::User,
            origin_id: user.origin_id.clone(),
            existing,
        }),
    }
}

/// Fetch a user mapping with its display details.
pub async fn get_user(db: &Database, origin_id: &str) -> Result<Option<UserRecord>, SyncError> {
    let origin_id = origin_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<UserRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT origin_id, destination_id, display_name, email
                 FROM user_mapping WHERE origin_id = ?1",
                params![origin_id],
                |row| {
                    Ok(UserRecord {
                        origin_id: row.get(0)?,
                        handle: row.get(1)?,
                        display_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        email: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List mappings of one kind, or of every kind when `kind` is `None`.
pub async fn list_mappings(
    db: &Database,
    kind: Option<MappingKind>,
) -> Result<Vec<MappingRecord>, SyncError> {
    let kinds: Vec<MappingKind> = match kind {
        Some(kind) => vec![kind],
        None => MappingKind::ALL.to_vec(),
    };
    db.connection()
        .call(move |conn| -> Result<Vec<MappingRecord>, rusqlite::Error> {
            let mut records = Vec::new();
            for kind in kinds {
                let mut stmt = conn.prepare(&format!(
                    "SELECT origin_id, destination_id, origin_parent_id, created_at
                     FROM {} ORDER BY created_at ASC, rowid ASC",
                    kind.table()
                ))?;
                let rows = stmt.query_map([], |row| {
                    Ok(MappingRecord {
                        kind,
                        origin_id: row.get(0)?,
                        destination_id: row.get(1)?,
                        origin_parent_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?;
                for row in rows {
                    records.push(row?);
                }
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}
