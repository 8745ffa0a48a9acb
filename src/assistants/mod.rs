//! Ready-made assistants
//!
//! - [`MathAssistant`] evaluates arithmetic and stores results as properties
//! - [`AnswerAssistant`] returns a stored property as the final answer
//! - [`SummaryAssistant`] summarizes the text of a property
//! - [`AudioVideoAssistant`] extracts and transcribes audio
//! - [`SqlAssistant`] explores and queries databases through its own cycle

pub mod answer;
pub mod audio_video;
pub mod math;
pub mod sql;
pub mod summary;

pub use answer::AnswerAssistant;
pub use audio_video::{AudioVideoAssistant, CommandLineMediaToolkit, MediaToolkit};
pub use math::MathAssistant;
pub use sql::{DatabaseCatalog, SqlAssistant, SqlProviders, SqliteCatalog};
pub use summary::SummaryAssistant;
