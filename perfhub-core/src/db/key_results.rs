use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::{opt_to_string, opt_uuid_at, timestamp_at, uuid_at, Database};
use crate::error::{Error, Result};
use crate::models::{
    Actor, CreateKeyResultInput, KeyResult, KeyResultNode, UpdateKeyResultInput,
};
use crate::progress::ProgressTree;

const KEY_RESULT_COLUMNS: &str = "id, okr_id, parent_key_result_id, title, progress, weight, \
     created_at, created_by, updated_at, updated_by";

impl Database {
    /// Creates a key result under `okr_id`. When it has a parent, the parent
    /// and every further ancestor are recomputed in the same transaction.
    pub fn create_key_result(
        &self,
        okr_id: Uuid,
        input: CreateKeyResultInput,
        actor: &Actor,
    ) -> Result<KeyResult> {
        input.validate()?;

        self.with_transaction(|tx| {
            if !super::okrs::okr_exists(tx, okr_id)? {
                return Err(Error::okr_not_found(okr_id));
            }

            if let Some(parent_id) = input.parent_key_result_id {
                let parent = find_key_result(tx, parent_id)?
                    .ok_or_else(|| Error::key_result_not_found(parent_id))?;
                if parent.okr_id != okr_id {
                    return Err(Error::InvalidParent(format!(
                        "key result {} belongs to OKR {}, not {}",
                        parent_id, parent.okr_id, okr_id
                    )));
                }
            }

            let now = Utc::now();
            let key_result = KeyResult {
                id: Uuid::new_v4(),
                okr_id,
                parent_key_result_id: input.parent_key_result_id,
                title: input.title.trim().to_string(),
                progress: input.progress.unwrap_or(0.0),
                weight: input.weight.unwrap_or(0.0),
                created_at: now,
                created_by: actor.user_id,
                updated_at: now,
                updated_by: actor.user_id,
            };

            tx.execute(
                &format!(
                    "INSERT INTO key_results ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    KEY_RESULT_COLUMNS
                ),
                params![
                    key_result.id.to_string(),
                    key_result.okr_id.to_string(),
                    opt_to_string(key_result.parent_key_result_id),
                    key_result.title,
                    key_result.progress,
                    key_result.weight,
                    key_result.created_at.to_rfc3339(),
                    key_result.created_by.to_string(),
                    key_result.updated_at.to_rfc3339(),
                    key_result.updated_by.to_string(),
                ],
            )?;

            if let Some(parent_id) = key_result.parent_key_result_id {
                propagate(tx, okr_id, parent_id, actor, now)?;
            }

            info!(
                "Created key result: {} ({}) in OKR {}",
                key_result.title, key_result.id, okr_id
            );
            Ok(key_result)
        })
    }

    pub fn get_key_result(&self, id: Uuid) -> Result<KeyResult> {
        self.with_connection(|conn| {
            find_key_result(conn, id)?.ok_or_else(|| Error::key_result_not_found(id))
        })
    }

    /// All key results of an OKR, most recently created first.
    pub fn list_key_results_for_okr(&self, okr_id: Uuid) -> Result<Vec<KeyResult>> {
        self.with_connection(|conn| {
            if !super::okrs::okr_exists(conn, okr_id)? {
                return Err(Error::okr_not_found(okr_id));
            }
            list_for_okr(conn, okr_id)
        })
    }

    /// Updates title and/or progress. A progress change is propagated from
    /// the key result's parent up to its root.
    pub fn update_key_result(
        &self,
        id: Uuid,
        input: UpdateKeyResultInput,
        actor: &Actor,
    ) -> Result<KeyResult> {
        input.validate()?;

        self.with_transaction(|tx| {
            let mut key_result =
                find_key_result(tx, id)?.ok_or_else(|| Error::key_result_not_found(id))?;

            if input.progress.is_some() && has_children(tx, id)? {
                return Err(Error::Validation(format!(
                    "progress of key result {} is derived from its children",
                    id
                )));
            }

            let now = Utc::now();
            if let Some(title) = &input.title {
                key_result.title = title.trim().to_string();
            }
            if let Some(progress) = input.progress {
                key_result.progress = progress;
            }
            key_result.updated_at = now;
            key_result.updated_by = actor.user_id;

            tx.execute(
                "UPDATE key_results SET title = ?1, progress = ?2, updated_at = ?3, updated_by = ?4 WHERE id = ?5",
                params![
                    key_result.title,
                    key_result.progress,
                    key_result.updated_at.to_rfc3339(),
                    key_result.updated_by.to_string(),
                    id.to_string(),
                ],
            )?;

            if input.progress.is_some() {
                if let Some(parent_id) = key_result.parent_key_result_id {
                    propagate(tx, key_result.okr_id, parent_id, actor, now)?;
                }
            }

            info!("Updated key result: {} ({})", key_result.title, key_result.id);
            Ok(key_result)
        })
    }

    /// Deletes a key result and its descendants.
    ///
    /// The former parent keeps its stored aggregate; it is refreshed by the
    /// next progress change under it. OKR-level progress is always computed
    /// on read and is not affected.
    pub fn delete_key_result(&self, id: Uuid) -> Result<()> {
        self.with_connection(|conn| {
            let deleted = conn.execute(
                "DELETE FROM key_results WHERE id = ?1",
                params![id.to_string()],
            )?;
            if deleted == 0 {
                return Err(Error::key_result_not_found(id));
            }
            info!("Deleted key result: {}", id);
            Ok(())
        })
    }

    /// Nested view of an OKR's key results with effective progress per node.
    pub fn key_result_tree(&self, okr_id: Uuid) -> Result<Vec<KeyResultNode>> {
        let key_results = self.list_key_results_for_okr(okr_id)?;
        ProgressTree::build(&key_results).nodes()
    }
}

/// Recomputes `start_id` and each of its ancestors, nearest first, from one
/// read of the OKR's key results.
fn propagate(
    conn: &Connection,
    okr_id: Uuid,
    start_id: Uuid,
    actor: &Actor,
    at: DateTime<Utc>,
) -> Result<()> {
    let key_results = list_for_okr(conn, okr_id)?;
    let tree = ProgressTree::build(&key_results);

    let mut chain = vec![start_id];
    chain.extend(tree.ancestors(start_id)?);

    for id in chain {
        let progress = f64::from(tree.key_result_progress(id)?);
        conn.execute(
            "UPDATE key_results SET progress = ?1, updated_at = ?2, updated_by = ?3 WHERE id = ?4",
            params![
                progress,
                at.to_rfc3339(),
                actor.user_id.to_string(),
                id.to_string()
            ],
        )?;
        debug!("Recomputed key result {} progress to {}", id, progress);
    }

    Ok(())
}

pub(crate) fn find_key_result(conn: &Connection, id: Uuid) -> Result<Option<KeyResult>> {
    let key_result = conn
        .query_row(
            &format!("SELECT {} FROM key_results WHERE id = ?1", KEY_RESULT_COLUMNS),
            params![id.to_string()],
            row_to_key_result,
        )
        .optional()?;
    Ok(key_result)
}

pub(crate) fn list_for_okr(conn: &Connection, okr_id: Uuid) -> Result<Vec<KeyResult>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM key_results WHERE okr_id = ?1 ORDER BY rowid DESC",
        KEY_RESULT_COLUMNS
    ))?;
    let key_results = stmt
        .query_map(params![okr_id.to_string()], row_to_key_result)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(key_results)
}

fn has_children(conn: &Connection, id: Uuid) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM key_results WHERE parent_key_result_id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn row_to_key_result(row: &Row) -> rusqlite::Result<KeyResult> {
    Ok(KeyResult {
        id: uuid_at(row, 0)?,
        okr_id: uuid_at(row, 1)?,
        parent_key_result_id: opt_uuid_at(row, 2)?,
        title: row.get(3)?,
        progress: row.get(4)?,
        weight: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
        created_by: uuid_at(row, 7)?,
        updated_at: timestamp_at(row, 8)?,
        updated_by: uuid_at(row, 9)?,
    })
}
