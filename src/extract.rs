use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    wire::RecordId,
};

/// `axum::Json` whose rejection is the failure envelope (400).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` whose rejection is the failure envelope (400).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// `{"id": ...}` request body.
#[derive(Debug, Deserialize)]
pub struct IdBody {
    pub id: RecordId,
}

/// `?id=...` query string.
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    pub id: Option<RecordId>,
}

/// Deletes accept the id in the query string or as a JSON body; the query
/// wins when both are present.
pub fn id_from_query_or_body(query: IdQuery, body: &[u8]) -> ApiResult<RecordId> {
    if let Some(id) = query.id {
        return Ok(id);
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("missing id".into()));
    }
    serde_json::from_slice::<IdBody>(body)
        .map(|b| b.id)
        .map_err(|e| ApiError::BadRequest(format!("invalid json: {e}")))
}
