//! Results produced by assistant functions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of executing an assistant function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantResponse {
    /// Text shown to the model or returned to the caller
    pub text: String,
    /// Typed payload describing what the function produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ResponseState>,
    /// Ends the orchestration cycle even if the function is not terminal
    #[serde(default)]
    pub terminate_cycle: bool,
}

impl AssistantResponse {
    /// Create a plain text response that lets the cycle continue
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: None,
            terminate_cycle: false,
        }
    }

    /// Create a response carrying a typed payload
    pub fn with_state(text: impl Into<String>, state: ResponseState) -> Self {
        Self {
            text: text.into(),
            state: Some(state),
            terminate_cycle: false,
        }
    }

    /// Create a response that ends the cycle
    pub fn terminal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: None,
            terminate_cycle: true,
        }
    }

    /// Mark this response as ending the cycle
    pub fn terminating(mut self) -> Self {
        self.terminate_cycle = true;
        self
    }
}

/// Closed set of payloads assistants can attach to a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseState {
    Expression(ExpressionResult),
    DatabaseList { databases: Vec<String> },
    Schema(DatabaseSchema),
    Query(QueryTable),
    Media(MediaOperation),
}

/// An evaluated arithmetic expression stored in a global property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionResult {
    pub property_name: String,
    pub expression: String,
    pub result: f64,
}

impl ExpressionResult {
    pub fn to_fact(&self) -> String {
        format!(
            "Result of {} is in property {} and it is equal to {}",
            self.expression, self.property_name, self.result
        )
    }

    pub fn to_assistant_message(&self) -> String {
        format!("Result of {} is {}", self.expression, self.result)
    }
}

/// Column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

/// Table with its columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Every table of a database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database: String,
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    /// Render the schema as prompt text
    pub fn to_prompt(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            let qualified = table.qualified_name();
            out.push_str(&format!("Table {}\n", qualified));
            for column in &table.columns {
                out.push_str(&format!("- {} : {}\n", column.name, column.data_type));
            }
            out.push_str(&format!("End schema of table {}\n", qualified));
        }
        out
    }
}

/// Tabular query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryTable {
    /// Render as a markdown table, escaping pipes inside cells
    pub fn to_markdown(&self) -> String {
        fn escape(cell: &str) -> String {
            cell.replace('|', "\\|")
        }

        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|c| escape(c)).collect();
        out.push_str(&format!("| {} |\n", header.join(" | ")));
        out.push_str(&format!("|{}\n", "---|".repeat(self.columns.len())));
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        out
    }
}

/// Kind of media processing performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaOperationKind {
    AudioExtraction,
    Transcription,
}

/// A completed media processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaOperation {
    pub kind: MediaOperationKind,
    pub source: PathBuf,
    /// Output file for extractions, transcript text for transcriptions
    pub output: String,
}
