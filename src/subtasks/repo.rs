use sqlx::{FromRow, PgPool, Postgres, Transaction};

/// Subtask row. Every mutation joins `todos` so only the owner of the parent
/// todo can touch it.
#[derive(Debug, Clone, FromRow)]
pub struct SubtaskRow {
    pub id: i64,
    pub todo_id: i64,
    pub title: String,
    pub completed: bool,
}

pub async fn list_for_todos(db: &PgPool, todo_ids: &[i64]) -> Result<Vec<SubtaskRow>, sqlx::Error> {
    if todo_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, SubtaskRow>(
        r#"
        SELECT id, todo_id, title, completed
          FROM subtasks
         WHERE todo_id = ANY($1)
         ORDER BY id ASC
        "#,
    )
    .bind(todo_ids)
    .fetch_all(db)
    .await
}

/// Insert within the transaction that created the parent todo.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    todo_id: i64,
    title: &str,
    completed: bool,
) -> Result<SubtaskRow, sqlx::Error> {
    sqlx::query_as::<_, SubtaskRow>(
        r#"
        INSERT INTO subtasks (todo_id, title, completed)
        VALUES ($1, $2, $3)
        RETURNING id, todo_id, title, completed
        "#,
    )
    .bind(todo_id)
    .bind(title)
    .bind(completed)
    .fetch_one(&mut **tx)
    .await
}

/// `None` when the todo does not exist or belongs to someone else.
pub async fn create(
    db: &PgPool,
    user_id: i64,
    todo_id: i64,
    title: &str,
) -> Result<Option<SubtaskRow>, sqlx::Error> {
    sqlx::query_as::<_, SubtaskRow>(
        r#"
        INSERT INTO subtasks (todo_id, title)
        SELECT t.id, $3
          FROM todos t
         WHERE t.id = $1 AND t.user_id = $2
        RETURNING id, todo_id, title, completed
        "#,
    )
    .bind(todo_id)
    .bind(user_id)
    .bind(title)
    .fetch_optional(db)
    .await
}

pub async fn rename(
    db: &PgPool,
    user_id: i64,
    id: i64,
    title: &str,
) -> Result<Option<SubtaskRow>, sqlx::Error> {
    sqlx::query_as::<_, SubtaskRow>(
        r#"
        UPDATE subtasks s
           SET title = $3
          FROM todos t
         WHERE s.id = $1 AND s.todo_id = t.id AND t.user_id = $2
        RETURNING s.id, s.todo_id, s.title, s.completed
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .fetch_optional(db)
    .await
}

pub async fn toggle(db: &PgPool, user_id: i64, id: i64) -> Result<Option<SubtaskRow>, sqlx::Error> {
    sqlx::query_as::<_, SubtaskRow>(
        r#"
        UPDATE subtasks s
           SET completed = NOT s.completed
          FROM todos t
         WHERE s.id = $1 AND s.todo_id = t.id AND t.user_id = $2
        RETURNING s.id, s.todo_id, s.title, s.completed
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// Returns whether a row was deleted.
pub async fn delete(db: &PgPool, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM subtasks s
         USING todos t
         WHERE s.id = $1 AND s.todo_id = t.id AND t.user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
