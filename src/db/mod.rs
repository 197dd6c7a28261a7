pub mod pool;
pub mod schema;

pub use pool::Database;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// No usable connection string in the environment.
    #[error("database not configured: {0}")]
    Configuration(String),

    /// DDL failed over both the pooled and the direct connection.
    #[error("schema provisioning failed: {0}")]
    Schema(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
