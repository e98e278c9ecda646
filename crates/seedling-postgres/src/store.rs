//! Relational store boundary.
//!
//! The loader only needs transactions that run plain SQL and return the
//! `RETURNING` projections. [`PgStore`] implements this over a sqlx pool;
//! tests substitute an in-memory recorder.

use async_trait::async_trait;
use seedling_fixtures::BoxError;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Executor, PgConnection, Postgres, Transaction};

/// Opens transactions against a relational store.
#[async_trait]
pub trait RelationalStore: Send + Sync {
	/// Begins a new transaction.
	async fn begin(&self) -> Result<Box<dyn RelationalTransaction>, BoxError>;
}

/// A transaction owned by a single load.
#[async_trait]
pub trait RelationalTransaction: Send {
	/// Executes a statement that returns no rows, returning the affected row count.
	async fn execute(&mut self, sql: &str) -> Result<u64, BoxError>;

	/// Runs a statement whose single column is a JSON object per row.
	async fn fetch_json(&mut self, sql: &str) -> Result<Vec<Value>, BoxError>;

	/// Commits the transaction.
	async fn commit(self: Box<Self>) -> Result<(), BoxError>;

	/// Rolls the transaction back.
	async fn rollback(self: Box<Self>) -> Result<(), BoxError>;
}

/// PostgreSQL store backed by a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	/// Wraps an existing pool.
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	/// Connects a small pool to `url`.
	pub async fn connect(url: &str) -> Result<Self, BoxError> {
		let pool = PgPoolOptions::new().max_connections(2).connect(url).await?;
		Ok(Self::new(pool))
	}

	/// Underlying pool.
	pub fn pool(&self) -> &PgPool {
		&self.pool
	}
}

#[async_trait]
impl RelationalStore for PgStore {
	async fn begin(&self) -> Result<Box<dyn RelationalTransaction>, BoxError> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(PgTransaction { tx }))
	}
}

struct PgTransaction {
	tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl RelationalTransaction for PgTransaction {
	async fn execute(&mut self, sql: &str) -> Result<u64, BoxError> {
		let conn: &mut PgConnection = &mut self.tx;
		let result = conn.execute(sqlx::raw_sql(sql)).await?;
		Ok(result.rows_affected())
	}

	async fn fetch_json(&mut self, sql: &str) -> Result<Vec<Value>, BoxError> {
		let rows = sqlx::query_scalar::<_, Value>(sql)
			.fetch_all(&mut *self.tx)
			.await?;
		Ok(rows)
	}

	async fn commit(self: Box<Self>) -> Result<(), BoxError> {
		self.tx.commit().await?;
		Ok(())
	}

	async fn rollback(self: Box<Self>) -> Result<(), BoxError> {
		self.tx.rollback().await?;
		Ok(())
	}
}
