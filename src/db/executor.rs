use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::MapperError;

/// Owns the process-wide connection pool and runs parameterized statements.
///
/// Every statement acquires a connection from the pool, runs, and releases
/// it; no caller holds a connection across statements.
#[derive(Clone)]
pub struct Executor {
    pool: PgPool,
}

impl Executor {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, MapperError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .max_connections(config.connection_limit)
            .max_lifetime(Duration::from_secs(60))
            .connect_with(options)
            .await?;

        info!("created database pool for: {}", config.database);
        Ok(Self { pool })
    }

    /// Run a statement and collect all result rows.
    pub async fn fetch(&self, sql: &str, params: &[Value]) -> Result<Vec<PgRow>, MapperError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Run a statement and report the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, MapperError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_param(query, param);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Connectivity probe for the health endpoint.
    pub async fn ping(&self) -> Result<(), MapperError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("closed database pool");
    }
}

fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => match coerce_number(n) {
            NumParam::Int(i) => q.bind(i),
            NumParam::Float(f) => q.bind(f),
            NumParam::Text(s) => q.bind(s),
        },
        Value::String(s) => q.bind(s.as_str()),
        // Arrays and objects land as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[derive(Debug, PartialEq)]
enum NumParam {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Postgres has no u64 column type; integers that do not fit i64 are
/// bound as text rather than wrapped or rounded.
fn coerce_number(n: &serde_json::Number) -> NumParam {
    if let Some(i) = n.as_i64() {
        NumParam::Int(i)
    } else if let Some(u) = n.as_u64() {
        match i64::try_from(u) {
            Ok(i) => NumParam::Int(i),
            Err(_) => NumParam::Text(n.to_string()),
        }
    } else if let Some(f) = n.as_f64() {
        NumParam::Float(f)
    } else {
        NumParam::Text(n.to_string())
    }
}
