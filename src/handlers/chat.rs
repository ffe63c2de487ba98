//! Text chat: forward one typed message to the remote chatbot API.
//!
//! ## Endpoint: `POST /api/v1/chat`
//!
//! ## Request:
//! ```json
//! { "message": "The street light on my road is broken", "conversation_id": "c-42" }
//! ```
//!
//! ## Response:
//! ```json
//! { "reply": "...", "conversation_id": "c-42", "timestamp": "..." }
//! ```

use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

pub async fn send_message(
    state: web::Data<AppState>,
    body: web::Json<ChatMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let message = request.message.trim();
    if message.is_empty() {
        return Err(AppError::ValidationError("Message cannot be empty".to_string()));
    }

    let chatbot = state.chatbot()?;
    let reply = chatbot
        .chat(message, request.conversation_id.as_deref())
        .await?;

    // Keep the caller's conversation when the API does not hand back a new one.
    let conversation_id = reply.conversation_id.or(request.conversation_id);
    let reply = reply
        .reply
        .ok_or_else(|| AppError::Upstream("Chat service returned no reply".to_string()))?;

    info!(
        conversation_id = conversation_id.as_deref().unwrap_or("-"),
        message_chars = message.chars().count(),
        "Chat message answered"
    );

    Ok(HttpResponse::Ok().json(json!({
        "reply": reply,
        "conversation_id": conversation_id,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
