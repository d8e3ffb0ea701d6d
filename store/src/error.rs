use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Constraint violations on upsert are treated as success — the
    /// competing write is authoritative. Callers check this
    /// before propagating a `sqlx::Error::Database` with a unique-
    /// violation code, though in practice every write here goes through
    /// `ON CONFLICT DO UPDATE` and never reaches this path.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::Query(msg) if msg.contains("duplicate key"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}
