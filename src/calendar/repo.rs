use sqlx::{FromRow, PgPool};
use time::Date;

#[derive(Debug, Clone, FromRow)]
pub struct DayCounts {
    pub date: Date,
    pub pending: i64,
    pub completed: i64,
}

/// Per-day counts for `[from, until)`. Days without todos are absent.
pub async fn day_counts(
    db: &PgPool,
    user_id: i64,
    from: Date,
    until: Date,
) -> Result<Vec<DayCounts>, sqlx::Error> {
    sqlx::query_as::<_, DayCounts>(
        r#"
        SELECT date,
               COUNT(*) FILTER (WHERE NOT completed) AS pending,
               COUNT(*) FILTER (WHERE completed)     AS completed
          FROM todos
         WHERE user_id = $1 AND date >= $2 AND date < $3
         GROUP BY date
         ORDER BY date
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(until)
    .fetch_all(db)
    .await
}
