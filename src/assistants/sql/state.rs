//! State shared by the SQL sub-assistants

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::catalog::DatabaseCatalog;
use crate::agents::domain::{DatabaseSchema, QueryTable};
use crate::agents::error::AgentResult;

#[derive(Debug, Default)]
struct Snapshot {
    databases: Option<Vec<String>>,
    /// Keyed by lowercase database name
    schemas: HashMap<String, DatabaseSchema>,
    current_database: Option<String>,
    last_query: Option<QueryTable>,
}

/// Database list, schema cache, chosen database and last query result
///
/// Fetches go through the catalog at most once per key. The lock is held
/// across a fetch, so a dropped fetch leaves the cache untouched.
pub struct SqlSharedState {
    catalog: Arc<dyn DatabaseCatalog>,
    inner: Mutex<Snapshot>,
}

impl SqlSharedState {
    pub fn new(catalog: Arc<dyn DatabaseCatalog>) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            inner: Mutex::new(Snapshot::default()),
        })
    }

    pub fn catalog(&self) -> &Arc<dyn DatabaseCatalog> {
        &self.catalog
    }

    /// Cached database list, if already fetched
    pub async fn databases(&self) -> Option<Vec<String>> {
        self.inner.lock().await.databases.clone()
    }

    pub async fn has_database_list(&self) -> bool {
        self.inner.lock().await.databases.is_some()
    }

    pub async fn get_or_fetch_databases(&self) -> AgentResult<Vec<String>> {
        let mut inner = self.inner.lock().await;
        if let Some(databases) = &inner.databases {
            return Ok(databases.clone());
        }

        let databases = self.catalog.list_databases().await?;
        info!(count = databases.len(), "Database list cached");
        inner.databases = Some(databases.clone());
        Ok(databases)
    }

    pub async fn cached_schema(&self, database: &str) -> Option<DatabaseSchema> {
        self.inner.lock().await.schemas.get(&database.to_lowercase()).cloned()
    }

    pub async fn get_or_fetch_schema(&self, database: &str) -> AgentResult<DatabaseSchema> {
        let key = database.to_lowercase();
        let mut inner = self.inner.lock().await;
        if let Some(schema) = inner.schemas.get(&key) {
            debug!(database, "Schema served from cache");
            return Ok(schema.clone());
        }

        let schema = self.catalog.fetch_schema(database).await?;
        info!(database, tables = schema.tables.len(), "Schema cached");
        inner.schemas.insert(key, schema.clone());
        Ok(schema)
    }

    /// True when the list is known, non-empty, and every schema is cached
    pub async fn all_schemas_retrieved(&self) -> bool {
        let inner = self.inner.lock().await;
        Self::all_retrieved(&inner)
    }

    fn all_retrieved(inner: &Snapshot) -> bool {
        match &inner.databases {
            Some(databases) => !inner.schemas.is_empty() && inner.schemas.len() == databases.len(),
            None => false,
        }
    }

    pub async fn current_database(&self) -> Option<String> {
        self.inner.lock().await.current_database.clone()
    }

    pub async fn set_current_database(&self, database: impl Into<String>) {
        self.inner.lock().await.current_database = Some(database.into());
    }

    pub async fn last_query(&self) -> Option<QueryTable> {
        self.inner.lock().await.last_query.clone()
    }

    pub async fn set_last_query(&self, table: QueryTable) {
        self.inner.lock().await.last_query = Some(table);
    }

    /// Metadata facts; schema bodies are never included
    pub async fn to_fact_text(&self) -> String {
        let inner = self.inner.lock().await;
        let mut out = String::new();

        if let Some(databases) = &inner.databases {
            out.push_str("Database list:\n");
            for database in databases {
                let retrieved = inner.schemas.contains_key(&database.to_lowercase());
                out.push_str(&format!(
                    "{}: schema {} retrieved\n",
                    database,
                    if retrieved { "IS" } else { "NOT" }
                ));
            }
        }
        if Self::all_retrieved(&inner) {
            out.push_str("All database schema are retrieved\n");
        }
        if let Some(table) = &inner.last_query {
            out.push_str(&format!(
                "Last query returned {} rows, result is in property queryresult\n",
                table.rows.len()
            ));
        }
        if let Some(database) = &inner.current_database {
            out.push_str(&format!("User choose to work with database is {}\n", database));
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agents::domain::{ColumnSchema, TableSchema};
    use crate::agents::error::AgentError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory catalog counting every fetch
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub databases: Vec<String>,
        pub list_calls: AtomicUsize,
        pub schema_calls: AtomicUsize,
        pub queries: std::sync::Mutex<Vec<(String, String)>>,
    }

    impl FakeCatalog {
        pub(crate) fn with_databases(names: &[&str]) -> Self {
            Self {
                databases: names.iter().map(|n| n.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl DatabaseCatalog for FakeCatalog {
        async fn list_databases(&self) -> AgentResult<Vec<String>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.databases.clone())
        }

        async fn fetch_schema(&self, database: &str) -> AgentResult<DatabaseSchema> {
            self.schema_calls.fetch_add(1, Ordering::SeqCst);
            if !self.databases.iter().any(|d| d.eq_ignore_ascii_case(database)) {
                return Err(AgentError::Database(format!("Unknown database: {}", database)));
            }
            Ok(DatabaseSchema {
                database: database.to_string(),
                tables: vec![TableSchema {
                    schema: "main".to_string(),
                    name: "orders".to_string(),
                    columns: vec![ColumnSchema {
                        name: "total".to_string(),
                        data_type: "REAL".to_string(),
                    }],
                }],
            })
        }

        async fn execute_query(&self, database: &str, sql: &str) -> AgentResult<QueryTable> {
            if let Ok(mut queries) = self.queries.lock() {
                queries.push((database.to_string(), sql.to_string()));
            }
            Ok(QueryTable {
                columns: vec!["total".to_string()],
                rows: vec![vec!["12.5".to_string()]],
            })
        }
    }

    #[tokio::test]
    async fn test_schema_fetched_once() {
        let catalog = Arc::new(FakeCatalog::with_databases(&["sales"]));
        let state = SqlSharedState::new(catalog.clone());

        state.get_or_fetch_schema("sales").await.unwrap();
        state.get_or_fetch_schema("SALES").await.unwrap();

        assert_eq!(catalog.schema_calls.load(Ordering::SeqCst), 1);
        assert!(state.cached_schema("Sales").await.is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let catalog = Arc::new(FakeCatalog::with_databases(&["sales"]));
        let state = SqlSharedState::new(catalog.clone());

        assert!(state.get_or_fetch_schema("hr").await.is_err());
        assert!(state.cached_schema("hr").await.is_none());
    }

    #[tokio::test]
    async fn test_all_schemas_retrieved() {
        let state = SqlSharedState::new(Arc::new(FakeCatalog::with_databases(&["sales", "hr"])));
        assert!(!state.all_schemas_retrieved().await);

        state.get_or_fetch_databases().await.unwrap();
        assert!(!state.all_schemas_retrieved().await);

        state.get_or_fetch_schema("sales").await.unwrap();
        assert!(!state.all_schemas_retrieved().await);

        state.get_or_fetch_schema("hr").await.unwrap();
        assert!(state.all_schemas_retrieved().await);
    }

    #[tokio::test]
    async fn test_empty_database_list_is_never_complete() {
        let state = SqlSharedState::new(Arc::new(FakeCatalog::default()));
        state.get_or_fetch_databases().await.unwrap();

        assert!(!state.all_schemas_retrieved().await);
        assert!(!state.to_fact_text().await.contains("All database schema are retrieved"));
    }

    #[tokio::test]
    async fn test_fact_text_has_metadata_only() {
        let state = SqlSharedState::new(Arc::new(FakeCatalog::with_databases(&["sales", "hr"])));
        state.get_or_fetch_databases().await.unwrap();
        state.get_or_fetch_schema("sales").await.unwrap();
        state.set_current_database("sales").await;

        let facts = state.to_fact_text().await;

        assert!(facts.starts_with("Database list:\nsales: schema IS retrieved\nhr: schema NOT retrieved\n"));
        assert!(facts.contains("User choose to work with database is sales"));
        assert!(!facts.contains("orders"));
    }
}
