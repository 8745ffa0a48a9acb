//! Questions asked to the human user during a cycle

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::agents::error::{AgentError, AgentResult};

/// Interactive prompts used by assistants that need a human decision
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Let the user pick one of `options`; returns the chosen option
    async fn ask_for_selection(&self, prompt: &str, options: &[String]) -> AgentResult<String>;

    /// Ask a free-form question
    async fn ask_question(&self, prompt: &str) -> AgentResult<String>;
}

/// Reads answers from stdin
#[derive(Debug, Default)]
pub struct ConsoleUserInteraction;

impl ConsoleUserInteraction {
    pub fn new() -> Self {
        Self
    }

    async fn read_line(prompt: &str) -> AgentResult<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        if read == 0 {
            return Err(AgentError::Cancelled);
        }
        Ok(line.trim().to_string())
    }
}

#[async_trait]
impl UserInteraction for ConsoleUserInteraction {
    async fn ask_for_selection(&self, prompt: &str, options: &[String]) -> AgentResult<String> {
        if options.is_empty() {
            return Err(AgentError::Configuration(format!("No options to choose from for: {}", prompt)));
        }

        let mut menu = format!("{}\n", prompt);
        for (idx, option) in options.iter().enumerate() {
            menu.push_str(&format!("  {}. {}\n", idx + 1, option));
        }

        loop {
            let answer = Self::read_line(&format!("{}> ", menu)).await?;
            if let Ok(idx) = answer.parse::<usize>() {
                if (1..=options.len()).contains(&idx) {
                    return Ok(options[idx - 1].clone());
                }
            }
            if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(&answer)) {
                return Ok(option.clone());
            }
            menu = format!("Invalid choice '{}'. {}\n", answer, prompt);
        }
    }

    async fn ask_question(&self, prompt: &str) -> AgentResult<String> {
        Self::read_line(&format!("{} ", prompt)).await
    }
}

/// Replays queued answers; selections must match one of the options
#[derive(Debug, Default)]
pub struct ScriptedUserInteraction {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedUserInteraction {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts shown so far
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    async fn next(&self, prompt: &str) -> AgentResult<String> {
        self.prompts.lock().await.push(prompt.to_string());
        self.answers
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AgentError::Internal(format!("No scripted answer for: {}", prompt)))
    }
}

#[async_trait]
impl UserInteraction for ScriptedUserInteraction {
    async fn ask_for_selection(&self, prompt: &str, options: &[String]) -> AgentResult<String> {
        let answer = self.next(prompt).await?;
        options
            .iter()
            .find(|o| o.eq_ignore_ascii_case(&answer))
            .cloned()
            .ok_or_else(|| AgentError::Validation(format!("'{}' is not one of {:?}", answer, options)))
    }

    async fn ask_question(&self, prompt: &str) -> AgentResult<String> {
        self.next(prompt).await
    }
}
