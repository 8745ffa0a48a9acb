//! Database access for the SQL assistants

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::agents::config::DatabaseConfig;
use crate::agents::domain::{ColumnSchema, DatabaseSchema, QueryTable, TableSchema};
use crate::agents::error::{AgentError, AgentResult};

/// Databases the SQL assistants can explore and query
#[async_trait]
pub trait DatabaseCatalog: Send + Sync {
    async fn list_databases(&self) -> AgentResult<Vec<String>>;

    async fn fetch_schema(&self, database: &str) -> AgentResult<DatabaseSchema>;

    async fn execute_query(&self, database: &str, sql: &str) -> AgentResult<QueryTable>;
}

/// Configured SQLite databases, each opened lazily on first use
pub struct SqliteCatalog {
    databases: Vec<DatabaseConfig>,
    pools: Mutex<HashMap<String, SqlitePool>>,
    connect_timeout: Duration,
}

impl SqliteCatalog {
    pub fn new(databases: Vec<DatabaseConfig>) -> Self {
        Self {
            databases,
            pools: Mutex::new(HashMap::new()),
            connect_timeout: Duration::from_secs(10),
        }
    }

    async fn pool(&self, database: &str) -> AgentResult<SqlitePool> {
        let config = self
            .databases
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(database))
            .ok_or_else(|| AgentError::Database(format!("Unknown database: {}", database)))?;

        let key = config.name.to_lowercase();
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(&key) {
            return Ok(pool.clone());
        }

        info!(database = %config.name, "Connecting to SQLite database");
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(self.connect_timeout)
            .connect(&config.url)
            .await?;
        pools.insert(key, pool.clone());
        Ok(pool)
    }

    /// Close every opened pool
    pub async fn close(&self) {
        for (_, pool) in self.pools.lock().await.drain() {
            pool.close().await;
        }
    }
}

#[async_trait]
impl DatabaseCatalog for SqliteCatalog {
    async fn list_databases(&self) -> AgentResult<Vec<String>> {
        Ok(self.databases.iter().map(|d| d.name.clone()).collect())
    }

    async fn fetch_schema(&self, database: &str) -> AgentResult<DatabaseSchema> {
        let pool = self.pool(database).await?;

        let table_names: Vec<String> = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await?
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<Result<_, _>>()?;

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let columns = sqlx::query("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
                .bind(&name)
                .fetch_all(&pool)
                .await?
                .iter()
                .map(|row| -> Result<ColumnSchema, sqlx::Error> {
                    Ok(ColumnSchema {
                        name: row.try_get("name")?,
                        data_type: row.try_get("type")?,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            tables.push(TableSchema {
                schema: "main".to_string(),
                name,
                columns,
            });
        }

        debug!(database, tables = tables.len(), "Fetched database schema");
        Ok(DatabaseSchema {
            database: database.to_string(),
            tables,
        })
    }

    async fn execute_query(&self, database: &str, sql: &str) -> AgentResult<QueryTable> {
        let pool = self.pool(database).await?;
        info!(database, sql, "Executing query");

        let rows = sqlx::query(sql).fetch_all(&pool).await?;
        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = rows.iter().map(row_cells).collect();

        Ok(QueryTable { columns, rows })
    }
}

/// Render every cell of a row as text, whatever its storage class
fn row_cells(row: &SqliteRow) -> Vec<String> {
    (0..row.len())
        .map(|idx| {
            if let Ok(value) = row.try_get::<Option<i64>, _>(idx) {
                return value.map(|v| v.to_string()).unwrap_or_default();
            }
            if let Ok(value) = row.try_get::<Option<f64>, _>(idx) {
                return value.map(|v| v.to_string()).unwrap_or_default();
            }
            if let Ok(value) = row.try_get::<Option<String>, _>(idx) {
                return value.unwrap_or_default();
            }
            match row.try_get::<Option<Vec<u8>>, _>(idx) {
                Ok(Some(bytes)) => format!("<{} bytes>", bytes.len()),
                _ => String::new(),
            }
        })
        .collect()
}
