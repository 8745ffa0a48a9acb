//! # Assistant orchestrator
//!
//! Answers a user question by letting a model call functions exposed by a set
//! of assistants. Each round the orchestrator sends the accumulated facts and
//! the eligible functions, runs the requested calls, and stops on a terminal
//! result or a plain text answer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use assistant_orchestrator::agents::{create_provider, LlmProviderConfig, Orchestrator};
//! use assistant_orchestrator::assistants::{AnswerAssistant, MathAssistant};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = create_provider(&LlmProviderConfig::default())?;
//!     let mut orchestrator = Orchestrator::new(provider);
//!     orchestrator.add_assistant(Arc::new(MathAssistant::new()))?;
//!     orchestrator.add_assistant(Arc::new(AnswerAssistant::new()))?;
//!
//!     let answer = orchestrator.ask("What is 3 * 7 + 2?").await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! - **agents**: orchestration loop, sessions, providers and conversation memory
//! - **assistants**: ready-made assistants (math, answer, summary, media, SQL)
//! - **config**: settings loading and validation

pub mod agents;
pub mod assistants;
pub mod cli;
pub mod config;
