use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use tracing::debug;

use quote_request_core::domain::quote::Quote;
use quote_request_core::domain::quote_request::{
    CompanyUser, CompanyUserId, Customer, QuoteRequest, QuoteRequestCriteria,
};
use quote_request_core::domain::status::QuoteRequestStatus;
use quote_request_core::domain::version::{QuoteRequestVersion, QuoteRequestVersionMetadata};
use quote_request_core::errors::QuoteRequestError;
use quote_request_core::ports::{QuoteRequestEntityManager, QuoteRequestRepository};

use super::RepositoryError;
use crate::DbPool;

const SELECT_QUOTE_REQUEST: &str = "SELECT
        id_quote_request,
        quote_request_reference,
        status,
        id_company_user,
        customer_reference,
        valid_until,
        is_latest_version_hidden,
        state_version
     FROM quote_request";

const SELECT_QUOTE_REQUEST_VERSION: &str = "SELECT
        id_quote_request_version,
        version,
        version_reference,
        quote_json,
        metadata_json
     FROM quote_request_version";

/// Sqlite-backed repository and entity manager. Root updates are guarded by
/// `state_version`, so a writer acting on a stale load fails instead of
/// overwriting a concurrent transition. Root and version writes that belong
/// to one transition share a transaction.
pub struct SqlQuoteRequestStore {
    pool: DbPool,
}

impl SqlQuoteRequestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find(
        &self,
        reference: &str,
        id_company_user: Option<&CompanyUserId>,
    ) -> Result<Option<QuoteRequest>, RepositoryError> {
        let row = match id_company_user {
            Some(id_company_user) => {
                sqlx::query(&format!(
                    "{SELECT_QUOTE_REQUEST} WHERE quote_request_reference = ? AND id_company_user = ?"
                ))
                .bind(reference)
                .bind(&id_company_user.0)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_QUOTE_REQUEST} WHERE quote_request_reference = ?"))
                    .bind(reference)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        match row {
            Some(row) => self.attach_latest_version(quote_request_from_row(row)?).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id_quote_request: i64) -> Result<QuoteRequest, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_QUOTE_REQUEST} WHERE id_quote_request = ?"))
            .bind(id_quote_request)
            .fetch_one(&self.pool)
            .await?;

        self.attach_latest_version(quote_request_from_row(row)?).await
    }

    async fn attach_latest_version(
        &self,
        mut quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, RepositoryError> {
        let row = sqlx::query(&format!(
            "{SELECT_QUOTE_REQUEST_VERSION} WHERE id_quote_request = ? ORDER BY version DESC LIMIT 1"
        ))
        .bind(quote_request.id_quote_request)
        .fetch_optional(&self.pool)
        .await?;

        quote_request.latest_version = row.map(version_from_row).transpose()?;
        Ok(quote_request)
    }

    async fn create_with_version(
        &self,
        quote_request: &QuoteRequest,
        version: &QuoteRequestVersion,
    ) -> Result<i64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let id_quote_request = insert(&mut tx, quote_request).await?;
        insert_version(&mut tx, id_quote_request, version).await?;
        tx.commit().await?;
        Ok(id_quote_request)
    }

    async fn update_with_version(
        &self,
        quote_request: &QuoteRequest,
        version: &QuoteRequestVersion,
    ) -> Result<i64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let id_quote_request = update(&mut tx, quote_request).await?;
        insert_version(&mut tx, id_quote_request, version).await?;
        tx.commit().await?;
        Ok(id_quote_request)
    }

    /// Every version of a request, oldest first.
    pub async fn list_versions(
        &self,
        id_quote_request: i64,
    ) -> Result<Vec<QuoteRequestVersion>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_QUOTE_REQUEST_VERSION} WHERE id_quote_request = ? ORDER BY version ASC"
        ))
        .bind(id_quote_request)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(version_from_row).collect()
    }
}

#[async_trait]
impl QuoteRequestRepository for SqlQuoteRequestStore {
    async fn find_by_reference(
        &self,
        reference: &str,
        company_user: Option<&CompanyUserId>,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError> {
        Ok(self.find(reference, company_user).await?)
    }

    async fn find_by_criteria(
        &self,
        criteria: &QuoteRequestCriteria,
    ) -> Result<Option<QuoteRequest>, QuoteRequestError> {
        let Some(reference) = criteria.reference() else {
            return Ok(None);
        };
        Ok(self.find(reference, criteria.id_company_user.as_ref()).await?)
    }
}

#[async_trait]
impl QuoteRequestEntityManager for SqlQuoteRequestStore {
    async fn create_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let id_quote_request = insert(&mut conn, &quote_request).await?;
        drop(conn);
        debug!(
            event_name = "db.quote_request.created",
            id_quote_request,
            quote_request_reference = quote_request.reference().unwrap_or("unknown"),
            "quote request row inserted"
        );
        Ok(self.find_by_id(id_quote_request).await?)
    }

    async fn update_quote_request(
        &self,
        quote_request: QuoteRequest,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let id_quote_request = update(&mut conn, &quote_request).await?;
        drop(conn);
        debug!(
            event_name = "db.quote_request.updated",
            id_quote_request,
            state_version = quote_request.state_version + 1,
            "quote request row updated"
        );
        Ok(self.find_by_id(id_quote_request).await?)
    }

    async fn create_quote_request_version(
        &self,
        id_quote_request: i64,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let id = insert_version(&mut conn, id_quote_request, &version).await?;
        Ok(QuoteRequestVersion { id_quote_request_version: Some(id), ..version })
    }

    async fn update_quote_request_version(
        &self,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequestVersion, QuoteRequestError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        update_version_metadata(&mut conn, &version).await?;
        Ok(version)
    }

    async fn create_quote_request_with_version(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let id_quote_request = self.create_with_version(&quote_request, &version).await?;
        debug!(
            event_name = "db.quote_request.created",
            id_quote_request,
            quote_request_reference = quote_request.reference().unwrap_or("unknown"),
            "quote request row inserted with its first version"
        );
        Ok(self.find_by_id(id_quote_request).await?)
    }

    async fn revise_quote_request(
        &self,
        quote_request: QuoteRequest,
        version: QuoteRequestVersion,
    ) -> Result<QuoteRequest, QuoteRequestError> {
        let id_quote_request = self.update_with_version(&quote_request, &version).await?;
        debug!(
            event_name = "db.quote_request.revised",
            id_quote_request,
            state_version = quote_request.state_version + 1,
            version = version.version,
            "quote request row updated with a new version"
        );
        Ok(self.find_by_id(id_quote_request).await?)
    }
}

async fn insert(
    conn: &mut SqliteConnection,
    quote_request: &QuoteRequest,
) -> Result<i64, RepositoryError> {
    let reference = required_reference(quote_request)?;
    let status = quote_request
        .status
        .ok_or(RepositoryError::MissingField { field: "quote_request.status" })?;
    let company_user = quote_request
        .company_user
        .as_ref()
        .ok_or(RepositoryError::MissingField { field: "quote_request.company_user" })?;
    let id_company_user = company_user
        .id_company_user
        .as_ref()
        .filter(|id| !id.is_blank())
        .ok_or(RepositoryError::MissingField {
            field: "quote_request.company_user.id_company_user",
        })?;
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "INSERT INTO quote_request (
            quote_request_reference,
            status,
            id_company_user,
            customer_reference,
            valid_until,
            is_latest_version_hidden,
            state_version,
            created_at,
            updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(reference)
    .bind(status.as_str())
    .bind(&id_company_user.0)
    .bind(company_user.customer_reference())
    .bind(quote_request.valid_until.map(|valid_until| valid_until.to_rfc3339()))
    .bind(quote_request.is_latest_version_hidden)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await
    .map_err(|error| unique_violation_as_conflict(error, reference))?;

    Ok(result.last_insert_rowid())
}

async fn update(
    conn: &mut SqliteConnection,
    quote_request: &QuoteRequest,
) -> Result<i64, RepositoryError> {
    let id_quote_request = quote_request
        .id_quote_request
        .ok_or(RepositoryError::MissingField { field: "quote_request.id_quote_request" })?;
    let status = quote_request
        .status
        .ok_or(RepositoryError::MissingField { field: "quote_request.status" })?;

    let result = sqlx::query(
        "UPDATE quote_request
         SET status = ?,
             valid_until = ?,
             is_latest_version_hidden = ?,
             state_version = state_version + 1,
             updated_at = ?
         WHERE id_quote_request = ? AND state_version = ?",
    )
    .bind(status.as_str())
    .bind(quote_request.valid_until.map(|valid_until| valid_until.to_rfc3339()))
    .bind(quote_request.is_latest_version_hidden)
    .bind(Utc::now().to_rfc3339())
    .bind(id_quote_request)
    .bind(i64::from(quote_request.state_version))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict {
            reference: quote_request
                .reference()
                .map_or_else(|| id_quote_request.to_string(), str::to_owned),
        });
    }
    Ok(id_quote_request)
}

async fn insert_version(
    conn: &mut SqliteConnection,
    id_quote_request: i64,
    version: &QuoteRequestVersion,
) -> Result<i64, RepositoryError> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO quote_request_version (
            id_quote_request,
            version,
            version_reference,
            quote_json,
            metadata_json,
            created_at,
            updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id_quote_request)
    .bind(i64::from(version.version))
    .bind(version.version_reference.as_deref())
    .bind(version.quote.as_ref().map(serde_json::to_string).transpose()?)
    .bind(version.metadata.as_ref().map(serde_json::to_string).transpose()?)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await
    .map_err(|error| {
        let reference = version.version_reference.as_deref().unwrap_or_default();
        unique_violation_as_conflict(error, reference)
    })?;

    Ok(result.last_insert_rowid())
}

/// Only metadata is writable; the quote snapshot stays as it was inserted.
async fn update_version_metadata(
    conn: &mut SqliteConnection,
    version: &QuoteRequestVersion,
) -> Result<(), RepositoryError> {
    let id = version.id_quote_request_version.ok_or(RepositoryError::MissingField {
        field: "quote_request_version.id_quote_request_version",
    })?;

    let result = sqlx::query(
        "UPDATE quote_request_version
         SET metadata_json = ?, updated_at = ?
         WHERE id_quote_request_version = ?",
    )
    .bind(version.metadata.as_ref().map(serde_json::to_string).transpose()?)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Decode(format!("quote request version {id} not found")));
    }
    Ok(())
}

fn required_reference(quote_request: &QuoteRequest) -> Result<&str, RepositoryError> {
    quote_request
        .reference()
        .ok_or(RepositoryError::MissingField { field: "quote_request.quote_request_reference" })
}

fn unique_violation_as_conflict(error: sqlx::Error, reference: &str) -> RepositoryError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.is_unique_violation() {
            return RepositoryError::Conflict { reference: reference.to_owned() };
        }
    }
    RepositoryError::Database(error)
}

fn quote_request_from_row(row: SqliteRow) -> Result<QuoteRequest, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = QuoteRequestStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown quote request status `{status_raw}`"))
    })?;
    let customer_reference = row.try_get::<Option<String>, _>("customer_reference")?;

    Ok(QuoteRequest {
        id_quote_request: Some(row.try_get("id_quote_request")?),
        quote_request_reference: Some(row.try_get("quote_request_reference")?),
        status: Some(status),
        company_user: Some(CompanyUser {
            id_company_user: Some(CompanyUserId(row.try_get("id_company_user")?)),
            customer: customer_reference
                .map(|reference| Customer { customer_reference: Some(reference) }),
        }),
        valid_until: parse_optional_timestamp("valid_until", row.try_get("valid_until")?)?,
        latest_version: None,
        is_latest_version_hidden: row.try_get("is_latest_version_hidden")?,
        state_version: parse_u32("state_version", row.try_get("state_version")?)?,
    })
}

fn version_from_row(row: SqliteRow) -> Result<QuoteRequestVersion, RepositoryError> {
    let quote = row
        .try_get::<Option<String>, _>("quote_json")?
        .map(|json| serde_json::from_str::<Quote>(&json))
        .transpose()?;
    let metadata = row
        .try_get::<Option<String>, _>("metadata_json")?
        .map(|json| serde_json::from_str::<QuoteRequestVersionMetadata>(&json))
        .transpose()?;

    Ok(QuoteRequestVersion {
        id_quote_request_version: Some(row.try_get("id_quote_request_version")?),
        version: parse_u32("version", row.try_get("version")?)?,
        version_reference: row.try_get("version_reference")?,
        quote,
        metadata,
    })
}

fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value
        .map(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|error| {
                    RepositoryError::Decode(format!(
                        "invalid timestamp in `{column}`: `{value}` ({error})"
                    ))
                })
        })
        .transpose()
}
