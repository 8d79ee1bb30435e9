//! Chat handlers

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::upload::MultipartForm;
use crate::handlers::json::AppJson;
use crate::middleware::CurrentUser;
use crate::services::chat::{
    CreateConversationInput, OpenedConversation, SendMessageBody, SendMessageInput,
};
use crate::services::ChatService;
use crate::AppState;
use shared::models::{ChatMessage, ConversationSummary};

pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<ConversationSummary>>> {
    let service = ChatService::new(state.db.clone());
    Ok(Json(service.get_conversations(user.user_id).await?))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreateConversationInput>,
) -> AppResult<(StatusCode, Json<OpenedConversation>)> {
    let service = ChatService::new(state.db.clone());
    let conversation = service.create_or_get(user.user_id, body.other_user_id).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let service = ChatService::new(state.db.clone());
    Ok(Json(service.get_messages(conversation_id, user.user_id).await?))
}

/// Send a message as JSON, or as multipart with a `media` file
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(conversation_id): Path<Uuid>,
    request: Request,
) -> AppResult<(StatusCode, Json<ChatMessage>)> {
    let input = read_message(&state, request).await?;

    let service = ChatService::new(state.db.clone());
    let message = service
        .send_message(conversation_id, user.user_id, input, &state.storage)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn read_message(state: &AppState, request: Request) -> AppResult<SendMessageInput> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| unreadable_body(e.body_text()))?;
        let mut form = MultipartForm::read(multipart).await?;

        return Ok(SendMessageInput {
            content: form.fields.remove("content"),
            media_type: form
                .fields
                .remove("media_type")
                .or_else(|| form.fields.remove("mediaType")),
            media: form.files.remove("media"),
        });
    }

    let AppJson(body) = AppJson::<SendMessageBody>::from_request(request, state).await?;
    Ok(body.into())
}

fn unreadable_body(reason: String) -> AppError {
    tracing::debug!("Rejected message body: {}", reason);
    AppError::validation(
        "content",
        "The message body could not be read.",
        "Le contenu du message est illisible.",
    )
}
