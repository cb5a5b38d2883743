//! Postgres-backed numbering counters.
//!
//! One row per `(company_id, document_type, financial_year)` scope. Drawing a
//! number is a single upsert that increments and returns the counter, so the
//! database row lock serializes concurrent draws for a scope:
//!
//! ```sql
//! INSERT ... VALUES (..., 1)
//! ON CONFLICT (company_id, document_type, financial_year)
//! DO UPDATE SET last_value = document_number_counters.last_value + 1
//! RETURNING last_value
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx error | CounterError |
//! |------------|--------------|
//! | Database (check constraint `23514`) | `Exhausted` |
//! | Database (other) | `Unavailable` |
//! | PoolClosed / Io / other | `Unavailable` |

use anyhow::Context;
use sqlx::{PgPool, Row};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{Span, instrument};

use factoryerp_numbering::{CounterError, CounterStore, SequenceScope};

#[derive(Debug, Clone)]
pub struct PostgresCounterStore {
    pool: PgPool,
}

impl PostgresCounterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the counters table if it does not exist yet.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS document_number_counters (
                company_id      UUID NOT NULL,
                document_type   TEXT NOT NULL,
                financial_year  TEXT NOT NULL,
                last_value      BIGINT NOT NULL CHECK (last_value > 0),
                updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (company_id, document_type, financial_year)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to create document_number_counters table")?;
        Ok(())
    }

    /// Atomically increment and return the counter of `scope`.
    #[instrument(skip(self), fields(scope = %scope.key(), sequence = tracing::field::Empty), err)]
    pub async fn next_sequence_async(&self, scope: &SequenceScope) -> Result<u64, CounterError> {
        let row = sqlx::query(
            r#"
            INSERT INTO document_number_counters (company_id, document_type, financial_year, last_value)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (company_id, document_type, financial_year)
            DO UPDATE SET
                last_value = document_number_counters.last_value + 1,
                updated_at = NOW()
            RETURNING last_value
            "#,
        )
        .bind(scope.company_id.as_uuid())
        .bind(scope.document_type.as_str())
        .bind(scope.financial_year.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("next_sequence", e))?;

        let value: i64 = row
            .try_get("last_value")
            .map_err(|e| CounterError::Unavailable(format!("failed to read last_value: {e}")))?;
        let sequence = u64::try_from(value)
            .map_err(|_| CounterError::Unavailable(format!("negative counter value {value}")))?;

        Span::current().record("sequence", sequence);
        Ok(sequence)
    }

    /// Raise the counter of `scope` to at least `last` (never lowers it).
    ///
    /// Used when numbering continues from records migrated out of another system.
    #[instrument(skip(self), fields(scope = %scope.key()), err)]
    pub async fn seed(&self, scope: &SequenceScope, last: u64) -> Result<(), CounterError> {
        let last = i64::try_from(last).map_err(|_| CounterError::Exhausted(scope.key()))?;
        sqlx::query(
            r#"
            INSERT INTO document_number_counters (company_id, document_type, financial_year, last_value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (company_id, document_type, financial_year)
            DO UPDATE SET
                last_value = GREATEST(document_number_counters.last_value, EXCLUDED.last_value),
                updated_at = NOW()
            "#,
        )
        .bind(scope.company_id.as_uuid())
        .bind(scope.document_type.as_str())
        .bind(scope.financial_year.to_string())
        .bind(last)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("seed", e))?;
        Ok(())
    }
}

impl CounterStore for PostgresCounterStore {
    fn next_sequence(&self, scope: &SequenceScope) -> Result<u64, CounterError> {
        // The trait is synchronous; park this worker thread while the query runs.
        let handle = Handle::try_current().map_err(|_| {
            CounterError::Unavailable(
                "PostgresCounterStore requires a tokio runtime; call it from within one".to_string(),
            )
        })?;
        // block_in_place panics on a current-thread runtime
        if handle.runtime_flavor() != RuntimeFlavor::MultiThread {
            return Err(CounterError::Unavailable(
                "PostgresCounterStore needs a multi-threaded tokio runtime for synchronous draws".to_string(),
            ));
        }

        tokio::task::block_in_place(|| handle.block_on(self.next_sequence_async(scope)))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> CounterError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                // last_value > 0 violated: BIGINT overflowed into the check
                Some("23514") => CounterError::Exhausted(msg),
                _ => CounterError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => CounterError::Unavailable(format!("connection pool closed in {operation}")),
        other => CounterError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factoryerp_core::{CompanyId, DomainError};
    use factoryerp_documents::{DocumentType, FinancialYear};
    use factoryerp_numbering::DocumentNumberGenerator;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn closed_pool_maps_to_unavailable() {
        let err = map_sqlx_error("next_sequence", sqlx::Error::PoolClosed);
        assert_eq!(
            err,
            CounterError::Unavailable("connection pool closed in next_sequence".to_string())
        );
    }

    #[tokio::test]
    async fn current_thread_runtime_fails_closed() {
        let pool = PgPool::connect_lazy("postgres://erp@localhost:1/erp").unwrap();
        let store = PostgresCounterStore::new(pool);
        let scope = SequenceScope::new(CompanyId::new(), DocumentType::Invoice, FinancialYear::starting(2024));

        let err = store.next_sequence(&scope).unwrap_err();
        assert!(matches!(err, CounterError::Unavailable(msg) if msg.contains("multi-threaded")));

        let generator = DocumentNumberGenerator::new(store);
        let err = generator
            .next_number(scope.company_id, scope.document_type, scope.financial_year)
            .unwrap_err();
        assert!(matches!(err, DomainError::NumberGenerationFailed(_)));
    }

    #[test]
    fn draws_outside_a_runtime_are_unavailable() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let pool = runtime.block_on(async { PgPool::connect_lazy("postgres://erp@localhost:1/erp").unwrap() });
        let store = PostgresCounterStore::new(pool);
        let scope = SequenceScope::new(CompanyId::new(), DocumentType::Quotation, FinancialYear::starting(2024));

        let err = store.next_sequence(&scope).unwrap_err();
        assert!(matches!(err, CounterError::Unavailable(msg) if msg.contains("requires a tokio runtime")));
    }

    /// Runs only when DATABASE_URL points at a disposable Postgres.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_draws_against_postgres_are_distinct() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = PgPool::connect(&url).await.unwrap();
        let store = Arc::new(PostgresCounterStore::new(pool));
        store.ensure_schema().await.unwrap();

        let scope = SequenceScope::new(CompanyId::new(), DocumentType::Invoice, FinancialYear::starting(2024));
        store.seed(&scope, 100).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.next_sequence_async(&scope).await.unwrap() }));
        }
        let mut drawn = HashSet::new();
        for task in tasks {
            drawn.insert(task.await.unwrap());
        }

        assert_eq!(drawn.len(), 20);
        assert_eq!(drawn.iter().max(), Some(&120));
        // sync path through the trait
        assert_eq!(store.next_sequence(&scope).unwrap(), 121);
    }
}
