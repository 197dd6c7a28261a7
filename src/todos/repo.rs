use sqlx::{FromRow, PgPool};
use time::Date;

use crate::subtasks::repo::{self as subtasks_repo, SubtaskRow};

#[derive(Debug, Clone, FromRow)]
pub struct TodoRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: Date,
    pub time: Option<String>,
    pub group_id: String,
    pub completed: bool,
}

/// Validated input for a new todo.
#[derive(Debug)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub date: Date,
    pub time: Option<String>,
    pub group_id: String,
    pub subtasks: Vec<(String, bool)>,
}

/// Partial update. `None` keeps the stored value; `time: Some(None)` and an
/// empty `description` clear the column.
#[derive(Debug, Default)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<Date>,
    pub time: Option<Option<String>>,
    pub group_id: Option<String>,
    pub completed: Option<bool>,
}

pub async fn list_by_date(db: &PgPool, user_id: i64, date: Date) -> Result<Vec<TodoRow>, sqlx::Error> {
    sqlx::query_as::<_, TodoRow>(
        r#"
        SELECT id, title, description, date, time, group_id, completed
          FROM todos
         WHERE user_id = $1 AND date = $2
         ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_all(db)
    .await
}

/// Inserts the todo and its initial subtasks in one transaction.
pub async fn create(
    db: &PgPool,
    user_id: i64,
    new: &NewTodo,
) -> Result<(TodoRow, Vec<SubtaskRow>), sqlx::Error> {
    let mut tx = db.begin().await?;

    let todo = sqlx::query_as::<_, TodoRow>(
        r#"
        INSERT INTO todos (user_id, title, description, date, time, group_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, title, description, date, time, group_id, completed
        "#,
    )
    .bind(user_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.date)
    .bind(&new.time)
    .bind(&new.group_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut subtasks = Vec::with_capacity(new.subtasks.len());
    for (title, completed) in &new.subtasks {
        subtasks.push(subtasks_repo::insert_tx(&mut tx, todo.id, title, *completed).await?);
    }

    tx.commit().await?;
    Ok((todo, subtasks))
}

pub async fn update(
    db: &PgPool,
    user_id: i64,
    id: i64,
    changes: &TodoChanges,
) -> Result<Option<TodoRow>, sqlx::Error> {
    let (time_set, time) = match &changes.time {
        Some(t) => (true, t.clone()),
        None => (false, None),
    };

    sqlx::query_as::<_, TodoRow>(
        r#"
        UPDATE todos
           SET title       = COALESCE($3::text, title),
               description = CASE WHEN $4::text IS NULL THEN description ELSE NULLIF($4::text, '') END,
               date        = COALESCE($5::date, date),
               time        = CASE WHEN $6::boolean THEN $7::text ELSE time END,
               group_id    = COALESCE($8::text, group_id),
               completed   = COALESCE($9::boolean, completed)
         WHERE id = $1 AND user_id = $2
        RETURNING id, title, description, date, time, group_id, completed
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&changes.title)
    .bind(&changes.description)
    .bind(changes.date)
    .bind(time_set)
    .bind(time)
    .bind(&changes.group_id)
    .bind(changes.completed)
    .fetch_optional(db)
    .await
}

pub async fn toggle(db: &PgPool, user_id: i64, id: i64) -> Result<Option<(i64, bool)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, bool)>(
        r#"
        UPDATE todos
           SET completed = NOT completed
         WHERE id = $1 AND user_id = $2
        RETURNING id, completed
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Subtasks go with the todo through `ON DELETE CASCADE`.
pub async fn delete(db: &PgPool, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
