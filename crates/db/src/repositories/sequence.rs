use async_trait::async_trait;
use sqlx::Row;

use quote_request_core::errors::QuoteRequestError;
use quote_request_core::ports::{SequenceNumberGenerator, SequenceNumberSettings};

use super::RepositoryError;
use crate::DbPool;

/// Counters kept in the `sequence_number` table; each call claims the next
/// value for `settings.name` in a single statement.
pub struct SqlSequenceNumberGenerator {
    pool: DbPool,
}

impl SqlSequenceNumberGenerator {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn next_value(&self, name: &str) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO sequence_number (name, current_value)
             VALUES (?, 1)
             ON CONFLICT(name) DO UPDATE SET current_value = current_value + 1
             RETURNING current_value",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("current_value")?)
    }
}

#[async_trait]
impl SequenceNumberGenerator for SqlSequenceNumberGenerator {
    async fn generate(&self, settings: &SequenceNumberSettings) -> Result<String, QuoteRequestError> {
        let value = self.next_value(&settings.name).await?;
        Ok(format_sequence(settings, value))
    }
}

pub(crate) fn format_sequence(settings: &SequenceNumberSettings, value: i64) -> String {
    format!(
        "{}{value:0width$}",
        settings.prefix.as_deref().unwrap_or_default(),
        width = settings.padding
    )
}
