//! Token counting for conversation limits

mod counter;

pub use counter::TokenCounter;
