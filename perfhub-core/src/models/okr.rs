use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_title, KeyResult};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Okr {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Owner and creator.
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub department_id: Option<Uuid>,
    pub parent_okr_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub assignees: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last user to change the OKR or its assignees.
    pub updated_by: Uuid,
}

/// An OKR as served to readers: progress is computed, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkrWithProgress {
    #[serde(flatten)]
    pub okr: Okr,
    pub key_results: Vec<KeyResult>,
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOkrInput {
    pub title: String,
    pub description: Option<String>,
    pub company_id: Uuid,
    pub department_id: Option<Uuid>,
    pub parent_okr_id: Option<Uuid>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub assignees: Vec<Uuid>,
}

impl CreateOkrInput {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_period(self.start_date, self.due_date)
    }
}

/// Partial update of an OKR. A `None` field is left unchanged, so
/// `description` and `department_id` can be replaced but not cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOkrInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub department_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAssigneesInput {
    pub assignees: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OkrFilter {
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
}

pub(crate) fn validate_period(start_date: NaiveDate, due_date: NaiveDate) -> Result<()> {
    if due_date < start_date {
        return Err(Error::Validation(format!(
            "due_date {} is before start_date {}",
            due_date, start_date
        )));
    }
    Ok(())
}

/// Drops duplicate ids, keeping first-seen order.
pub(crate) fn dedup_assignees(assignees: &[Uuid]) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(assignees.len());
    for id in assignees {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    unique
}
