use serde::{Deserialize, Serialize};

use super::repo::SubtaskRow;
use crate::{error::ApiError, wire::RecordId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubtaskRequest {
    pub todo_id: RecordId,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSubtaskRequest {
    pub id: RecordId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtaskResponse {
    pub id: i64,
    pub title: String,
    pub completed: bool,
}

impl From<SubtaskRow> for SubtaskResponse {
    fn from(r: SubtaskRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            completed: r.completed,
        }
    }
}

/// Trimmed, non-blank subtask title.
pub fn subtask_title(raw: &str) -> Result<String, ApiError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("subtask title is required".into()));
    }
    Ok(title.to_string())
}
