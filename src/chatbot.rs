//! # Remote Chatbot API Client
//!
//! The conversation and transcription logic lives behind a remote HTTP API.
//! This client speaks its two routes:
//!
//! - `POST /audio/transcribe`: multipart upload (`audio` file + `language`),
//!   answers `{"text": "..."}` or `{"error": "..."}`
//! - `POST /chat`: JSON `{"message", "conversation_id"?}`, answers
//!   `{"reply"?, "conversation_id"?}`
//!
//! The gateway never stores conversations; the widget carries
//! `conversation_id` between requests.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// File name the transcription endpoint sees for every upload.
pub const UPLOAD_FILE_NAME: &str = "voice-input.wav";

/// Chat request body sent to the remote API.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
}

/// Chat response from the remote API. Both fields are optional upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the remote chatbot API.
#[derive(Debug, Clone)]
pub struct ChatbotClient {
    http: Client,
    chat_url: String,
    transcribe_url: String,
}

impl ChatbotClient {
    /// Build a client for the API described by `config.remote`.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.remote.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            chat_url: config.endpoint("/chat"),
            transcribe_url: config.endpoint("/audio/transcribe"),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Upload a WAV file and return the trimmed transcript.
    ///
    /// ## Errors:
    /// - **Upstream**: network failure, non-2xx status, missing or blank `text`.
    ///   The remote `error` message is passed through when one is present.
    pub async fn transcribe(&self, wav: Vec<u8>, language: &str) -> AppResult<String> {
        let wav_len = wav.len();
        let audio = Part::bytes(wav)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("audio/wav")?;
        let form = Form::new()
            .part("audio", audio)
            .text("language", language.to_string());

        debug!(url = %self.transcribe_url, bytes = wav_len, language, "Uploading recording");

        let response = self.http.post(&self.transcribe_url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body).unwrap_or_default();

        let text = match parsed.text {
            Some(text) if status.is_success() => text,
            _ => {
                warn!(status = %status, "Transcription request rejected");
                return Err(AppError::Upstream(parsed.error.unwrap_or_else(|| {
                    format!("Transcription service could not understand the audio (HTTP {})", status)
                })));
            }
        };

        let transcript = text.trim();
        if transcript.is_empty() {
            return Err(AppError::Upstream(
                "Transcription service returned an empty transcript".to_string(),
            ));
        }

        Ok(transcript.to_string())
    }

    /// Send one user message and return the remote reply.
    pub async fn chat(&self, message: &str, conversation_id: Option<&str>) -> AppResult<ChatReply> {
        let request = ChatRequest {
            message,
            conversation_id,
        };

        debug!(url = %self.chat_url, has_conversation = conversation_id.is_some(), "Sending chat message");

        let response = self.http.post(&self.chat_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Chat request rejected");
            return Err(AppError::Upstream(format!("Chat service returned HTTP {}", status)));
        }

        Ok(response.json::<ChatReply>().await?)
    }
}
