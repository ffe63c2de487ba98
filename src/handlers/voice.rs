//! # Voice Message Handlers
//!
//! The widget records the user, then uploads the recorder chunks as
//! multipart form data. Every `audio` field chunk is pushed into a capture
//! session in arrival order; the end of the upload stops the session.
//!
//! ## Endpoints:
//! - `POST /api/v1/audio/convert`: returns the canonical WAV (useful for
//!   checking what the transcription service will receive)
//! - `POST /api/v1/voice`: converts, transcribes, and sends the transcript
//!   through the chat API in one round trip
//!
//! ## Form Fields:
//! - **audio** (repeatable): WAV container bytes, in order
//! - **language** (optional): overrides `remote.language` for transcription
//! - **conversation_id** (optional): continues an existing conversation

use crate::audio::capture::{CaptureSession, Recording};
use crate::audio::pipeline::{convert_recording, ConvertedAudio};
use crate::chatbot::UPLOAD_FILE_NAME;
use crate::config::AudioConfig;
use crate::{error::AppError, state::AppState};
use actix_multipart::{Field, Multipart};
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde_json::json;
use tracing::{debug, info};

/// Longest accepted value for the short text fields.
const MAX_TEXT_FIELD_BYTES: usize = 256;

struct VoiceUpload {
    recording: Recording,
    language: Option<String>,
    conversation_id: Option<String>,
}

pub async fn convert_audio(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let _session = state.begin_session();
    let config = state.get_config();

    let upload = read_upload(payload, config.audio.max_upload_bytes).await?;
    let converted = convert(&state, upload.recording, &config.audio).await?;

    Ok(HttpResponse::Ok()
        .content_type("audio/wav")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(UPLOAD_FILE_NAME.to_string())],
        })
        .insert_header(("X-Source-Sample-Rate", converted.source_sample_rate.to_string()))
        .insert_header(("X-Sample-Rate", converted.target_sample_rate.to_string()))
        .insert_header(("X-Sample-Count", converted.sample_count.to_string()))
        .body(converted.wav))
}

pub async fn voice_message(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let _session = state.begin_session();
    let config = state.get_config();

    let upload = read_upload(payload, config.audio.max_upload_bytes).await?;
    let session_id = upload.recording.session_id;
    let chunk_count = upload.recording.chunk_count;
    let capture_ms = (upload.recording.finished_at - upload.recording.started_at).num_milliseconds();
    let converted = convert(&state, upload.recording, &config.audio).await?;

    let audio_info = json!({
        "source_sample_rate": converted.source_sample_rate,
        "source_channels": converted.source_channels,
        "sample_rate": converted.target_sample_rate,
        "sample_count": converted.sample_count,
        "duration_seconds": converted.duration_seconds(),
        "chunks": chunk_count,
        "capture_ms": capture_ms
    });

    let language = upload.language.unwrap_or(config.remote.language);
    let chatbot = state.chatbot()?;
    let transcript = chatbot.transcribe(converted.wav, &language).await?;
    let reply = chatbot
        .chat(&transcript, upload.conversation_id.as_deref())
        .await?;

    let conversation_id = reply.conversation_id.or(upload.conversation_id);
    let reply = reply
        .reply
        .ok_or_else(|| AppError::Upstream("Chat service returned no reply".to_string()))?;

    info!(
        session_id = %session_id,
        language = %language,
        transcript_chars = transcript.chars().count(),
        "Voice message answered"
    );

    Ok(HttpResponse::Ok().json(json!({
        "session_id": session_id,
        "transcript": transcript,
        "reply": reply,
        "conversation_id": conversation_id,
        "audio": audio_info,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Run the pipeline on the blocking pool and count the result.
async fn convert(
    state: &AppState,
    recording: Recording,
    audio: &AudioConfig,
) -> Result<ConvertedAudio, AppError> {
    let bytes = recording.bytes;
    let (target_rate, max_output_bytes) = (audio.target_sample_rate, audio.max_output_bytes);
    let converted =
        web::block(move || convert_recording(&bytes, target_rate, max_output_bytes)).await??;
    state.record_conversion(converted.duration_seconds());
    Ok(converted)
}

/// Stream the multipart body into a capture session.
async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<VoiceUpload, AppError> {
    let (handle, session) = CaptureSession::start(max_bytes);
    debug!(session_id = %session.id(), "Reading voice upload");
    let mut language = None;
    let mut conversation_id = None;

    'fields: while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?;
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "audio" => {
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
                    if handle.push(chunk).await.is_err() {
                        // The session gave up; finish() reports why.
                        break 'fields;
                    }
                }
            }
            "language" => language = read_text_field(&mut field).await?,
            "conversation_id" => conversation_id = read_text_field(&mut field).await?,
            other => {
                debug!(field = other, "Ignoring unknown form field");
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
                }
            }
        }
    }

    handle.stop().await;
    let recording = session.finish().await?;

    Ok(VoiceUpload {
        recording,
        language,
        conversation_id,
    })
}

/// Read a short UTF-8 field; blank values count as absent.
async fn read_text_field(field: &mut Field) -> Result<Option<String>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
        if bytes.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::ValidationError(format!(
                "Form field '{}' is longer than {} bytes",
                field.name().unwrap_or_default(),
                MAX_TEXT_FIELD_BYTES
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::ValidationError("Form fields must be UTF-8".to_string()))?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}
