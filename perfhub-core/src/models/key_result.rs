use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{validate_percent, validate_title};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyResult {
    pub id: Uuid,
    pub okr_id: Uuid,
    pub parent_key_result_id: Option<Uuid>,
    pub title: String,
    /// Caller-supplied for leaves, derived from the children otherwise.
    pub progress: f64,
    /// Relative share among siblings.
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateKeyResultInput {
    pub parent_key_result_id: Option<Uuid>,
    pub title: String,
    pub progress: Option<f64>,
    pub weight: Option<f64>,
}

impl CreateKeyResultInput {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if let Some(progress) = self.progress {
            validate_percent("progress", progress)?;
        }
        if let Some(weight) = self.weight {
            validate_percent("weight", weight)?;
        }
        Ok(())
    }
}

/// Partial update of a key result.
///
/// Moving a key result to another parent is not supported; a
/// `parent_key_result_id` in the payload is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateKeyResultInput {
    pub title: Option<String>,
    pub progress: Option<f64>,
}

impl UpdateKeyResultInput {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(progress) = self.progress {
            validate_percent("progress", progress)?;
        }
        Ok(())
    }
}

/// A key result with its effective progress and nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResultNode {
    #[serde(flatten)]
    pub key_result: KeyResult,
    pub effective_progress: u8,
    pub children: Vec<KeyResultNode>,
}
