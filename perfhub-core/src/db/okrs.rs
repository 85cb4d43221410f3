use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{info, warn};
use uuid::Uuid;

use super::key_results::list_for_okr;
use super::{date_at, opt_to_string, opt_uuid_at, timestamp_at, uuid_at, Database};
use crate::error::{Error, Result};
use crate::models::{
    dedup_assignees, validate_period, validate_title, Actor, CreateOkrInput, Okr, OkrFilter,
    OkrWithProgress, UpdateOkrInput,
};
use crate::progress;

const OKR_COLUMNS: &str = "id, title, description, user_id, company_id, department_id, \
     parent_okr_id, start_date, due_date, created_at, updated_at, updated_by";

impl Database {
    /// Creates an OKR owned by `actor` with its initial assignees and no key
    /// results.
    pub fn create_okr(&self, input: CreateOkrInput, actor: &Actor) -> Result<Okr> {
        input.validate()?;

        self.with_transaction(|tx| {
            if let Some(parent_id) = input.parent_okr_id {
                if !okr_exists(tx, parent_id)? {
                    return Err(Error::okr_not_found(parent_id));
                }
            }

            let now = Utc::now();
            let okr = Okr {
                id: Uuid::new_v4(),
                title: input.title.trim().to_string(),
                description: input.description,
                user_id: actor.user_id,
                company_id: input.company_id,
                department_id: input.department_id,
                parent_okr_id: input.parent_okr_id,
                start_date: input.start_date,
                due_date: input.due_date,
                assignees: dedup_assignees(&input.assignees),
                created_at: now,
                updated_at: now,
                updated_by: actor.user_id,
            };

            tx.execute(
                &format!(
                    "INSERT INTO okrs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    OKR_COLUMNS
                ),
                params![
                    okr.id.to_string(),
                    okr.title,
                    okr.description,
                    okr.user_id.to_string(),
                    okr.company_id.to_string(),
                    opt_to_string(okr.department_id),
                    opt_to_string(okr.parent_okr_id),
                    okr.start_date.to_string(),
                    okr.due_date.to_string(),
                    okr.created_at.to_rfc3339(),
                    okr.updated_at.to_rfc3339(),
                    okr.updated_by.to_string(),
                ],
            )?;
            insert_assignees(tx, okr.id, &okr.assignees)?;

            info!("Created OKR: {} ({})", okr.title, okr.id);
            Ok(okr)
        })
    }

    pub fn get_okr(&self, id: Uuid) -> Result<Okr> {
        self.with_connection(|conn| find_okr(conn, id)?.ok_or_else(|| Error::okr_not_found(id)))
    }

    /// The OKR with its key results and the progress rolled up from them.
    pub fn get_okr_with_computed_progress(&self, id: Uuid) -> Result<OkrWithProgress> {
        self.with_connection(|conn| {
            let okr = find_okr(conn, id)?.ok_or_else(|| Error::okr_not_found(id))?;
            with_progress(conn, okr)
        })
    }

    /// OKRs matching every set field of `filter`, most recently created first.
    ///
    /// An OKR whose key-result tree contains a cycle is logged and left out
    /// instead of failing the whole listing. Reading it directly still
    /// reports [`Error::CycleDetected`].
    pub fn list_okrs(&self, filter: &OkrFilter) -> Result<Vec<OkrWithProgress>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(company_id) = filter.company_id {
            clauses.push("company_id = ?");
            values.push(company_id.to_string());
        }
        if let Some(department_id) = filter.department_id {
            clauses.push("department_id = ?");
            values.push(department_id.to_string());
        }
        if let Some(assignee_id) = filter.assignee_id {
            clauses.push("id IN (SELECT okr_id FROM okr_assignees WHERE user_id = ?)");
            values.push(assignee_id.to_string());
        }

        let mut sql = format!("SELECT {} FROM okrs", OKR_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY rowid DESC");

        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), row_to_okr)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut listed = Vec::with_capacity(rows.len());
            for mut okr in rows {
                let okr_id = okr.id;
                okr.assignees = list_assignees(conn, okr_id)?;
                match with_progress(conn, okr) {
                    Ok(okr) => listed.push(okr),
                    Err(Error::CycleDetected(key_result_id)) => warn!(
                        "Skipping OKR {} in listing: key result {} is part of a cycle",
                        okr_id, key_result_id
                    ),
                    Err(e) => return Err(e),
                }
            }
            Ok(listed)
        })
    }

    pub fn update_okr(&self, id: Uuid, input: UpdateOkrInput, actor: &Actor) -> Result<Okr> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }

        self.with_transaction(|tx| {
            let mut okr = find_okr(tx, id)?.ok_or_else(|| Error::okr_not_found(id))?;

            if let Some(title) = input.title {
                okr.title = title.trim().to_string();
            }
            if let Some(description) = input.description {
                okr.description = Some(description);
            }
            if let Some(department_id) = input.department_id {
                okr.department_id = Some(department_id);
            }
            if let Some(start_date) = input.start_date {
                okr.start_date = start_date;
            }
            if let Some(due_date) = input.due_date {
                okr.due_date = due_date;
            }
            validate_period(okr.start_date, okr.due_date)?;
            okr.updated_at = Utc::now();
            okr.updated_by = actor.user_id;

            tx.execute(
                "UPDATE okrs SET title = ?1, description = ?2, department_id = ?3, start_date = ?4, \
                 due_date = ?5, updated_at = ?6, updated_by = ?7 WHERE id = ?8",
                params![
                    okr.title,
                    okr.description,
                    opt_to_string(okr.department_id),
                    okr.start_date.to_string(),
                    okr.due_date.to_string(),
                    okr.updated_at.to_rfc3339(),
                    okr.updated_by.to_string(),
                    id.to_string(),
                ],
            )?;

            info!("Updated OKR: {} ({}) by {}", okr.title, okr.id, actor.user_id);
            Ok(okr)
        })
    }

    /// Replaces the assignee set of an OKR.
    pub fn set_okr_assignees(&self, id: Uuid, assignees: &[Uuid], actor: &Actor) -> Result<Okr> {
        self.with_transaction(|tx| {
            let touched = tx.execute(
                "UPDATE okrs SET updated_at = ?1, updated_by = ?2 WHERE id = ?3",
                params![
                    Utc::now().to_rfc3339(),
                    actor.user_id.to_string(),
                    id.to_string()
                ],
            )?;
            if touched == 0 {
                return Err(Error::okr_not_found(id));
            }

            tx.execute(
                "DELETE FROM okr_assignees WHERE okr_id = ?1",
                params![id.to_string()],
            )?;
            insert_assignees(tx, id, &dedup_assignees(assignees))?;
            info!("Replaced assignees of OKR {} by {}", id, actor.user_id);

            find_okr(tx, id)?.ok_or_else(|| Error::okr_not_found(id))
        })
    }

    /// Deletes an OKR together with its key results and assignees.
    pub fn delete_okr(&self, id: Uuid) -> Result<()> {
        self.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM okrs WHERE id = ?1", params![id.to_string()])?;
            if deleted == 0 {
                return Err(Error::okr_not_found(id));
            }
            info!("Deleted OKR: {}", id);
            Ok(())
        })
    }
}

pub(crate) fn okr_exists(conn: &Connection, id: Uuid) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM okrs WHERE id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn find_okr(conn: &Connection, id: Uuid) -> Result<Option<Okr>> {
    let okr = conn
        .query_row(
            &format!("SELECT {} FROM okrs WHERE id = ?1", OKR_COLUMNS),
            params![id.to_string()],
            row_to_okr,
        )
        .optional()?;

    match okr {
        Some(mut okr) => {
            okr.assignees = list_assignees(conn, id)?;
            Ok(Some(okr))
        }
        None => Ok(None),
    }
}

fn with_progress(conn: &Connection, okr: Okr) -> Result<OkrWithProgress> {
    let key_results = list_for_okr(conn, okr.id)?;
    let progress = progress::okr_progress(&key_results)?;
    Ok(OkrWithProgress {
        okr,
        key_results,
        progress,
    })
}

fn list_assignees(conn: &Connection, okr_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt =
        conn.prepare("SELECT user_id FROM okr_assignees WHERE okr_id = ?1 ORDER BY rowid")?;
    let assignees = stmt
        .query_map(params![okr_id.to_string()], |row| uuid_at(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(assignees)
}

fn insert_assignees(conn: &Connection, okr_id: Uuid, assignees: &[Uuid]) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let mut stmt = conn
        .prepare("INSERT INTO okr_assignees (okr_id, user_id, created_at) VALUES (?1, ?2, ?3)")?;
    for user_id in assignees {
        stmt.execute(params![okr_id.to_string(), user_id.to_string(), now])?;
    }
    Ok(())
}

fn row_to_okr(row: &Row) -> rusqlite::Result<Okr> {
    Ok(Okr {
        id: uuid_at(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        user_id: uuid_at(row, 3)?,
        company_id: uuid_at(row, 4)?,
        department_id: opt_uuid_at(row, 5)?,
        parent_okr_id: opt_uuid_at(row, 6)?,
        start_date: date_at(row, 7)?,
        due_date: date_at(row, 8)?,
        assignees: Vec::new(),
        created_at: timestamp_at(row, 9)?,
        updated_at: timestamp_at(row, 10)?,
        updated_by: uuid_at(row, 11)?,
    })
}
