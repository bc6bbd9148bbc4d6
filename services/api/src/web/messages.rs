//! services/api/src/web/messages.rs
//!
//! Direct messages between two users. Each pair shares one conversation,
//! opened by the first message either of them sends.

use crate::web::middleware::AuthUser;
use crate::web::rest::{port_failure, reject, ErrorBody, HandlerResult, MessageResponse, PathId};
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soundwave_core::{Message, NewMessage, PortError};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema, Debug)]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message_text: Option<String>,
    pub photo_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            message_text: m.text,
            photo_url: m.photo_url,
            timestamp: m.sent_at,
        }
    }
}

/// At least one of the two fields must be non-empty.
#[derive(Deserialize, ToSchema, Default)]
pub struct SendMessageRequest {
    pub message_text: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageSentResponse {
    pub message: String,
    pub data: MessageDto,
}

#[derive(Serialize, ToSchema)]
pub struct ConversationResponse {
    /// `null` when the two users have never exchanged a message.
    pub conversation_id: Option<Uuid>,
    pub messages: Vec<MessageDto>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Send a text or photo message to another user.
#[utoipa::path(
    post,
    path = "/messages/send/{receiver_id}",
    params(("receiver_id" = Uuid, Path, description = "The user to message.")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message stored", body = MessageSentResponse),
        (status = 400, description = "Empty message", body = ErrorBody),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(sender_id)): Extension<AuthUser>,
    PathId(receiver_id): PathId,
    Json(payload): Json<SendMessageRequest>,
) -> HandlerResult<Json<MessageSentResponse>> {
    let text = non_empty(payload.message_text);
    let photo_url = non_empty(payload.photo_url).map(|u| u.trim().to_string());
    if text.is_none() && photo_url.is_none() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Either message_text or photo_url is required",
        ));
    }

    let message = state
        .db
        .send_message(NewMessage {
            sender_id,
            receiver_id,
            text,
            photo_url,
        })
        .await
        .map_err(|e| port_failure("send message", e))?;
    info!(%sender_id, %receiver_id, message_id = %message.id, "Message sent");

    Ok(Json(MessageSentResponse {
        message: "Message sent successfully".to_string(),
        data: message.into(),
    }))
}

/// Every message between the caller and another user, oldest first.
#[utoipa::path(
    get,
    path = "/messages/conversation/{receiver_id}",
    params(("receiver_id" = Uuid, Path, description = "The other participant.")),
    responses(
        (status = 200, description = "The conversation", body = ConversationResponse),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(other_id): PathId,
) -> HandlerResult<Json<ConversationResponse>> {
    let conversation = state
        .db
        .find_conversation(user_id, other_id)
        .await
        .map_err(|e| port_failure("retrieve conversation", e))?;
    let Some(conversation) = conversation else {
        return Ok(Json(ConversationResponse {
            conversation_id: None,
            messages: Vec::new(),
        }));
    };

    let messages = state
        .db
        .conversation_messages(conversation.id)
        .await
        .map_err(|e| port_failure("retrieve messages", e))?;
    Ok(Json(ConversationResponse {
        conversation_id: Some(conversation.id),
        messages: messages.into_iter().map(MessageDto::from).collect(),
    }))
}

/// Delete a message. Only its sender may do so.
#[utoipa::path(
    delete,
    path = "/messages/delete/{message_id}",
    params(("message_id" = Uuid, Path, description = "The message to delete.")),
    responses(
        (status = 200, description = "Message deleted", body = MessageResponse),
        (status = 403, description = "Sent by someone else", body = ErrorBody),
        (status = 404, description = "No such message", body = ErrorBody)
    )
)]
pub async fn delete_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(message_id): PathId,
) -> HandlerResult<Json<MessageResponse>> {
    let not_found = |e: PortError| match e {
        PortError::NotFound(_) => reject(StatusCode::NOT_FOUND, "Message not found"),
        e => port_failure("delete message", e),
    };
    let message = state.db.get_message(message_id).await.map_err(not_found)?;
    if message.sender_id != user_id {
        return Err(reject(
            StatusCode::FORBIDDEN,
            "You can only delete messages you sent",
        ));
    }
    state.db.delete_message(message_id).await.map_err(not_found)?;
    info!(%user_id, %message_id, "Message deleted");
    Ok(MessageResponse::new("Message deleted successfully"))
}
