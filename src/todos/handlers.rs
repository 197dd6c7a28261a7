use axum::{body::Bytes, extract::State, routing::get, Json, Router};
use tracing::{info, instrument};

use super::{
    dto::{with_subtasks, CreateTodoRequest, DateQuery, TodoResponse, ToggleResponse, UpdateTodoRequest},
    repo,
};
use crate::{
    auth::AuthUser,
    error::{method_not_allowed, ApiError, ApiResult},
    extract::{id_from_query_or_body, IdBody, IdQuery, JsonBody, QueryParams},
    response::Envelope,
    state::AppState,
    subtasks::repo::list_for_todos,
};

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/todos",
        get(list_todos)
            .post(create_todo)
            .put(update_todo)
            .patch(toggle_todo)
            .delete(delete_todo)
            .fallback(method_not_allowed),
    )
}

fn not_found() -> ApiError {
    ApiError::NotFound("todo not found".into())
}

#[instrument(skip(state, query), fields(user_id = auth.user_id))]
pub async fn list_todos(
    State(state): State<AppState>,
    auth: AuthUser,
    QueryParams(query): QueryParams<DateQuery>,
) -> ApiResult<Json<Envelope<Vec<TodoResponse>>>> {
    let date = query
        .date
        .ok_or_else(|| ApiError::BadRequest("date is required (YYYY-MM-DD)".into()))?;
    let db = state.db.pool().await?;

    let todos = repo::list_by_date(&db, auth.user_id, date).await?;
    let ids: Vec<i64> = todos.iter().map(|t| t.id).collect();
    let subtasks = list_for_todos(&db, &ids).await?;

    Ok(Json(Envelope::data(with_subtasks(todos, subtasks))))
}

#[instrument(skip(state, body), fields(user_id = auth.user_id))]
pub async fn create_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<CreateTodoRequest>,
) -> ApiResult<Json<Envelope<TodoResponse>>> {
    let new = body.validate()?;
    let db = state.db.pool().await?;

    let (todo, subtasks) = repo::create(&db, auth.user_id, &new).await?;
    info!(todo_id = todo.id, subtasks = subtasks.len(), "todo created");

    let subtasks = subtasks.into_iter().map(Into::into).collect();
    Ok(Json(Envelope::data(TodoResponse::new(todo, subtasks))))
}

#[instrument(skip(state, body), fields(user_id = auth.user_id))]
pub async fn update_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<UpdateTodoRequest>,
) -> ApiResult<Json<Envelope<TodoResponse>>> {
    let (id, changes) = body.validate()?;
    let db = state.db.pool().await?;

    let todo = repo::update(&db, auth.user_id, id.get(), &changes)
        .await?
        .ok_or_else(not_found)?;
    let subtasks = list_for_todos(&db, &[todo.id]).await?;

    let subtasks = subtasks.into_iter().map(Into::into).collect();
    Ok(Json(Envelope::data(TodoResponse::new(todo, subtasks))))
}

#[instrument(skip(state, body), fields(user_id = auth.user_id))]
pub async fn toggle_todo(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<IdBody>,
) -> ApiResult<Json<Envelope<ToggleResponse>>> {
    let db = state.db.pool().await?;
    let (id, completed) = repo::toggle(&db, auth.user_id, body.id.get())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(Envelope::data(ToggleResponse { id, completed })))
}

#[instrument(skip(state, query, body), fields(user_id = auth.user_id))]
pub async fn delete_todo(
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
    info!(todo_id = id.get(), "todo deleted");
    Ok(Json(Envelope::ok()))
}
