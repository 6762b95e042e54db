pub mod recipes;
pub mod search;
pub mod users;

use std::future::Future;

use sqlx::postgres::PgQueryResult;
use sqlx::{Pool, Postgres, Transaction};

use super::error::QueryError;

/// Runs one row-producing unit of work, normalizing any storage failure into
/// a `QueryError` (logged in full, redacted for the caller).
pub async fn fetch_rows<T, F>(query: F) -> Result<Vec<T>, QueryError>
where
    F: Future<Output = Result<Vec<T>, sqlx::Error>>,
{
    query.await.map_err(QueryError::from)
}

/// Like `fetch_rows`, but for exactly one row: an empty result set becomes
/// `QueryError::NotFound` instead of a storage error.
pub async fn fetch_single_row<T, F>(query: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<Option<T>, sqlx::Error>>,
{
    match query.await {
        Ok(Some(row)) => Ok(row),
        Ok(None) => Err(QueryError::NotFound),
        Err(e) => Err(QueryError::from(e)),
    }
}

/// Runs one statement for its side effect and reports the affected row count.
pub async fn execute_query<F>(query: F) -> Result<u64, QueryError>
where
    F: Future<Output = Result<PgQueryResult, sqlx::Error>>,
{
    query
        .await
        .map(|result| result.rows_affected())
        .map_err(QueryError::from)
}

pub(crate) async fn begin_transaction(
    pool: &Pool<Postgres>,
) -> Result<Transaction<'static, Postgres>, QueryError> {
    pool.begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))
}

pub(crate) async fn commit_transaction(tr: Transaction<'_, Postgres>) -> Result<(), QueryError> {
    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_single_row_maps_empty_to_not_found() {
        let result: Result<i32, QueryError> = fetch_single_row(async { Ok(None) }).await;
        assert!(matches!(result, Err(QueryError::NotFound)));
    }

    #[tokio::test]
    async fn fetch_single_row_returns_the_row() {
        let result: Result<i32, QueryError> = fetch_single_row(async { Ok(Some(7)) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn fetch_rows_redacts_storage_errors() {
        let result: Result<Vec<i32>, QueryError> =
            fetch_rows(async { Err(sqlx::Error::PoolClosed) }).await;

        match result.unwrap_err() {
            QueryError::Internal { message, details } => {
                assert_eq!(message, "Database query failed.");
                assert_eq!(details.as_deref(), Some("Pool closed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
