//! Audio extraction and transcription through external tools

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::assistant::{Assistant, AssistantContext, FunctionDescriptor, FunctionRegistry};
use crate::agents::config::MediaConfig;
use crate::agents::domain::{AssistantResponse, ChatHistory, MediaOperation, MediaOperationKind, ResponseState};
use crate::agents::error::{AgentError, AgentResult};

pub const AUDIO_VIDEO_ASSISTANT: &str = "AudioVideoAssistant";

/// Local and global property holding the last transcript
pub const TRANSCRIPTION_PROPERTY: &str = "transcription";

/// External media tools
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Extract the audio track of `video` to a wav file and return its path
    async fn extract_audio(&self, video: &Path) -> AgentResult<PathBuf>;

    /// Transcribe `audio`; `None` when the tool produced no transcript
    async fn transcribe(&self, audio: &Path) -> AgentResult<Option<String>>;
}

/// ffmpeg and whisper run as child processes
#[derive(Debug, Clone)]
pub struct CommandLineMediaToolkit {
    config: MediaConfig,
}

impl CommandLineMediaToolkit {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    async fn run(program: &Path, command: &mut Command) -> AgentResult<Output> {
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AgentError::Media(format!("Failed to start {}: {}", program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("\n");
            return Err(AgentError::Media(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                tail
            )));
        }
        Ok(output)
    }

    async fn first_transcript(dir: &Path) -> AgentResult<Option<String>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("txt")) {
                return Ok(Some(tokio::fs::read_to_string(&path).await?));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl MediaToolkit for CommandLineMediaToolkit {
    async fn extract_audio(&self, video: &Path) -> AgentResult<PathBuf> {
        let audio = video.with_extension("wav");
        if tokio::fs::try_exists(&audio).await? {
            tokio::fs::remove_file(&audio).await?;
        }

        info!(video = %video.display(), audio = %audio.display(), "Extracting audio");
        Self::run(
            &self.config.ffmpeg,
            Command::new(&self.config.ffmpeg)
                .arg("-i")
                .arg(video)
                .args(["-vn", "-acodec", "pcm_s16le", "-ar", "44100", "-ac", "2"])
                .arg(&audio),
        )
        .await?;
        Ok(audio)
    }

    async fn transcribe(&self, audio: &Path) -> AgentResult<Option<String>> {
        let dir = self.config.output_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;

        info!(audio = %audio.display(), model = %self.config.whisper_model, "Transcribing audio");
        let result = async {
            Self::run(
                &self.config.whisper,
                Command::new(&self.config.whisper)
                    .arg(audio)
                    .args(["--task", "transcribe", "--output_format", "txt", "--output_dir"])
                    .arg(&dir)
                    .arg("--model")
                    .arg(&self.config.whisper_model),
            )
            .await?;
            Self::first_transcript(&dir).await
        }
        .await;

        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            warn!(dir = %dir.display(), error = %e, "Failed to remove transcription directory");
        }
        result
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractAudioArgs {
    /// Full path to the mp4 file
    pub videofile: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TranscribeArgs {
    /// Full path to the audio file
    pub audiofile: String,
}

pub struct AudioVideoAssistant {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl AudioVideoAssistant {
    pub fn new(toolkit: Arc<dyn MediaToolkit>) -> Self {
        let context = AssistantContext::new(AUDIO_VIDEO_ASSISTANT);
        let mut registry = FunctionRegistry::new(AUDIO_VIDEO_ASSISTANT);

        let extract_toolkit = toolkit.clone();
        registry.register(FunctionDescriptor::typed(
            "ExtractAudio",
            "extract audio in wav format from an mp4 file",
            move |args: ExtractAudioArgs, _ctx| {
                let toolkit = extract_toolkit.clone();
                async move {
                    let video = PathBuf::from(&args.videofile);
                    let audio = toolkit.extract_audio(&video).await?;
                    let output = audio.display().to_string();
                    Ok(AssistantResponse::with_state(
                        output.clone(),
                        ResponseState::Media(MediaOperation {
                            kind: MediaOperationKind::AudioExtraction,
                            source: video,
                            output,
                        }),
                    ))
                }
            },
        ));

        let transcribe_ctx = context.clone();
        registry.register(FunctionDescriptor::typed(
            "Transcribe",
            "Transcribe text from audio file",
            move |args: TranscribeArgs, _ctx| {
                let context = transcribe_ctx.clone();
                let toolkit = toolkit.clone();
                async move {
                    let audio = PathBuf::from(&args.audiofile);
                    let Some(transcription) = toolkit.transcribe(&audio).await? else {
                        warn!(audio = %audio.display(), "No transcript produced");
                        return Ok(AssistantResponse::new("Unable to transcript the audio"));
                    };

                    context.set_local_property(TRANSCRIPTION_PROPERTY, transcription.clone());
                    context.set_global_property(TRANSCRIPTION_PROPERTY, transcription.clone())?;
                    Ok(AssistantResponse::with_state(
                        "transcription done",
                        ResponseState::Media(MediaOperation {
                            kind: MediaOperationKind::Transcription,
                            source: audio,
                            output: transcription,
                        }),
                    ))
                }
            },
        ));

        Self { context, registry }
    }
}

impl Assistant for AudioVideoAssistant {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    fn format_result_as_fact(&self, response: &AssistantResponse) -> String {
        match &response.state {
            Some(ResponseState::Media(op)) => match op.kind {
                MediaOperationKind::AudioExtraction => format!(
                    "Audio was extracted from video {} to file {}",
                    op.source.display(),
                    op.output
                ),
                MediaOperationKind::Transcription => format!(
                    "agent {} has transcription of file {}, in {} property",
                    AUDIO_VIDEO_ASSISTANT,
                    op.source.display(),
                    TRANSCRIPTION_PROPERTY
                ),
            },
            _ => response.text.clone(),
        }
    }

    fn append_result_to_history(&self, history: &mut ChatHistory, response: &AssistantResponse) {
        let message = match &response.state {
            Some(ResponseState::Media(op)) if op.kind == MediaOperationKind::AudioExtraction => format!(
                "Audio extracted from video {} to file {}",
                op.source.display(),
                op.output
            ),
            _ => self.format_result_as_fact(response),
        };
        history.add_assistant(message);
    }
}
