use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use tracing::{info, instrument};

use super::{
    dto::{subtask_title, CreateSubtaskRequest, RenameSubtaskRequest, SubtaskResponse},
    repo,
};
use crate::{
    auth::AuthUser,
    error::{method_not_allowed, ApiError, ApiResult},
    extract::{id_from_query_or_body, IdBody, IdQuery, JsonBody, QueryParams},
    response::Envelope,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/subtasks",
        post(create_subtask)
            .put(rename_subtask)
            .patch(toggle_subtask)
            .delete(delete_subtask)
            .fallback(method_not_allowed),
    )
}

fn not_found() -> ApiError {
    ApiError::NotFound("subtask not found".into())
}

#[instrument(skip(state, body), fields(user_id = auth.user_id))]
pub async fn create_subtask(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<CreateSubtaskRequest>,
) -> ApiResult<Json<Envelope<SubtaskResponse>>> {
    let title = subtask_title(&body.title)?;
    let db = state.db.pool().await?;

    let row = repo::create(&db, auth.user_id, body.todo_id.get(), &title)
        .await?
        .ok_or_else(|| ApiError::NotFound("todo not found".into()))?;

    info!(subtask_id = row.id, todo_id = row.todo_id, "subtask created");
    Ok(Json(Envelope::data(row.into())))
}

#[instrument(skip(state, body), fields(user_id = auth.user_id))]
pub async fn rename_subtask(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<RenameSubtaskRequest>,
) -> ApiResult<Json<Envelope<SubtaskResponse>>> {
    let title = subtask_title(&body.title)?;
    let db = state.db.pool().await?;

    let row = repo::rename(&db, auth.user_id, body.id.get(), &title)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(Envelope::data(row.into())))
}

#[instrument(skip(state, body), fields(user_id = auth.user_id))]
pub async fn toggle_subtask(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<IdBody>,
) -> ApiResult<Json<Envelope<SubtaskResponse>>> {
    let db = state.db.pool().await?;
    let row = repo::toggle(&db, auth.user_id, body.id.get())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(Envelope::data(row.into())))
}

#[instrument(skip(state, query, body), fields(user_id = auth.user_id))]
pub async fn delete_subtask(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<IdQuery>,
    body: Bytes,
) -> ApiResult<Json<Envelope<()>>> {
    let id = id_from_query_or_body(query, &body)?;
    let db = state.db.pool().await?;

    if !repo::delete(&db, auth.user_id, id.get()).await? {
        return Err(not_found());
    }
    info!(subtask_id = id.get(), "subtask deleted");
    Ok(Json(Envelope::ok()))
}
