use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated user performing an operation.
///
/// Authentication happens outside this crate; the id is recorded as audit
/// metadata on every row the operation writes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}
