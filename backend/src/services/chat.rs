//! Chat service: two-party conversations with polled messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::storage::{StorageService, UploadedFile};
use crate::services::UserService;
use shared::models::{
    mark_seen_by, ChatMessage, ChatParticipant, ConversationPair, ConversationSummary,
    LastMessage, Role,
};
use shared::types::MediaType;
use shared::validation::validate_message_content;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, sender_name, content, media_type, media_url, seen, created_at";

#[derive(Debug, Deserialize)]
pub struct CreateConversationInput {
    #[serde(alias = "otherUserId")]
    pub other_user_id: Uuid,
}

/// A message to send, decoded from JSON or multipart
#[derive(Debug, Default)]
pub struct SendMessageInput {
    pub content: Option<String>,
    pub media_type: Option<String>,
    pub media: Option<UploadedFile>,
}

/// JSON body of a text message
#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "mediaType")]
    pub media_type: Option<String>,
}

impl From<SendMessageBody> for SendMessageInput {
    fn from(body: SendMessageBody) -> Self {
        Self {
            content: body.content,
            media_type: body.media_type,
            media: None,
        }
    }
}

/// Participant summary returned when opening a conversation
#[derive(Debug, Serialize)]
pub struct ConversationPeer {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OpenedConversation {
    pub id: Uuid,
    pub other_user: ConversationPeer,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    sender_name: String,
    content: String,
    media_type: String,
    media_url: Option<String>,
    seen: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = AppError;

    fn try_from(row: MessageRow) -> AppResult<Self> {
        let media_type = MediaType::parse(&row.media_type)
            .ok_or_else(|| AppError::Internal(format!("Unknown media type: {}", row.media_type)))?;

        Ok(ChatMessage {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            content: row.content,
            media_type,
            media_url: row.media_url,
            seen: row.seen,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    updated_at: DateTime<Utc>,
    other_id: Uuid,
    other_name: String,
    other_role: String,
    other_company_name: Option<String>,
    other_responsible_name: Option<String>,
    other_avatar: Option<String>,
    other_phone: String,
    last_content: Option<String>,
    last_created_at: Option<DateTime<Utc>>,
    last_sender_id: Option<Uuid>,
    unread_count: i64,
}

impl TryFrom<ConversationRow> for ConversationSummary {
    type Error = AppError;

    fn try_from(row: ConversationRow) -> AppResult<Self> {
        let role = Role::parse(&row.other_role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role stored: {}", row.other_role)))?;

        let last_message = match (row.last_content, row.last_created_at, row.last_sender_id) {
            (Some(content), Some(created_at), Some(sender_id)) => Some(LastMessage {
                content,
                created_at,
                sender_id,
            }),
            _ => None,
        };

        Ok(ConversationSummary {
            id: row.id,
            other_user: ChatParticipant {
                id: row.other_id,
                name: row.other_name,
                role,
                company_name: row.other_company_name,
                responsible_name: row.other_responsible_name,
                avatar: row.other_avatar,
                phone: Some(row.other_phone),
            },
            last_message,
            unread_count: row.unread_count,
            updated_at: row.updated_at,
        })
    }
}

/// Pick the stored media type of a message.
///
/// Without an attachment the message is text whatever was requested. An
/// attachment without an explicit image/audio type is classified by its
/// extension.
fn resolve_media_type(requested: Option<&str>, media_ext: Option<&str>) -> AppResult<MediaType> {
    let requested = match requested {
        Some(value) => Some(MediaType::parse(value).ok_or_else(|| {
            AppError::validation(
                "media_type",
                "The selected media type is invalid",
                "Le type de média choisi est invalide",
            )
        })?),
        None => None,
    };

    Ok(match (requested, media_ext) {
        (_, None) => MediaType::Text,
        (Some(MediaType::Text) | None, Some(ext)) => match ext {
            "mp3" | "wav" | "ogg" | "webm" => MediaType::Audio,
            _ => MediaType::Image,
        },
        (Some(media_type), Some(_)) => media_type,
    })
}

/// Chat service
#[derive(Clone)]
pub struct ChatService {
    db: PgPool,
}

impl ChatService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Conversations of a user, most recently active first
    pub async fn get_conversations(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT
                c.id, c.updated_at,
                u.id AS other_id, u.name AS other_name, u.role AS other_role,
                u.company_name AS other_company_name,
                u.responsible_name AS other_responsible_name,
                u.avatar AS other_avatar, u.phone AS other_phone,
                lm.content AS last_content, lm.created_at AS last_created_at,
                lm.sender_id AS last_sender_id,
                (
                    SELECT COUNT(*) FROM chat_messages m
                    WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND NOT m.seen
                ) AS unread_count
            FROM conversations c
            JOIN users u
              ON u.id = CASE WHEN c.user1_id = $1 THEN c.user2_id ELSE c.user1_id END
            LEFT JOIN LATERAL (
                SELECT content, created_at, sender_id
                FROM chat_messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC
                LIMIT 1
            ) lm ON TRUE
            WHERE c.user1_id = $1 OR c.user2_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(ConversationSummary::try_from).collect()
    }

    /// Load a conversation the user takes part in; strangers get 404
    async fn find_pair(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<ConversationPair> {
        let (user1, user2) = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT user1_id, user2_id FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation".to_string()))?;

        let pair = ConversationPair::new(user1, user2)?;
        if !pair.contains(user_id) {
            return Err(AppError::NotFound("Conversation".to_string()));
        }
        Ok(pair)
    }

    /// Full history, oldest first; marks the other party's messages as seen
    pub async fn get_messages(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<Vec<ChatMessage>> {
        self.find_pair(conversation_id, user_id).await?;

        let mut tx = self.db.begin().await?;

        let query = format!(
            "SELECT {} FROM chat_messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
            MESSAGE_COLUMNS
        );
        let rows = sqlx::query_as::<_, MessageRow>(&query)
            .bind(conversation_id)
            .fetch_all(&mut *tx)
            .await?;

        let mut messages = rows
            .into_iter()
            .map(ChatMessage::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let seen_ids = mark_seen_by(&mut messages, user_id);
        if !seen_ids.is_empty() {
            sqlx::query(
                "UPDATE chat_messages SET seen = TRUE, updated_at = NOW() WHERE id = ANY($1)",
            )
            .bind(&seen_ids)
            .execute(&mut *tx)
            .await?;
            tracing::debug!(
                "Marked {} messages seen in conversation {}",
                seen_ids.len(),
                conversation_id
            );
        }

        tx.commit().await?;
        Ok(messages)
    }

    /// Append a message. Attachments are checked before anything is written
    /// and removed again if the message cannot be saved.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        input: SendMessageInput,
        storage: &StorageService,
    ) -> AppResult<ChatMessage> {
        self.find_pair(conversation_id, sender_id).await?;

        let content = input.content.unwrap_or_default();
        validate_message_content(&content)?;

        if content.trim().is_empty() && input.media.is_none() {
            return Err(AppError::validation(
                "content",
                "A message needs text or an attachment",
                "Un message doit contenir du texte ou une pièce jointe",
            ));
        }

        let media_ext = input
            .media
            .as_ref()
            .map(|file| storage.check_chat_media(file))
            .transpose()?;
        let media_type = resolve_media_type(input.media_type.as_deref(), media_ext.as_deref())?;

        let sender_name = UserService::new(self.db.clone())
            .get_profile(sender_id)
            .await?
            .name;

        let stored = match (&input.media, &media_ext) {
            (Some(file), Some(ext)) => Some(storage.store_chat_media(file, ext).await?),
            _ => None,
        };
        let media_url = stored.as_ref().map(|file| file.url.as_str());

        let row = match self
            .insert_message(conversation_id, sender_id, &sender_name, &content, media_type, media_url)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                if let Some(file) = &stored {
                    storage.remove(&file.path).await;
                }
                return Err(e);
            }
        };

        tracing::debug!("Message {} sent in conversation {}", row.id, conversation_id);
        row.try_into()
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        content: &str,
        media_type: MediaType,
        media_url: Option<&str>,
    ) -> AppResult<MessageRow> {
        let mut tx = self.db.begin().await?;

        let query = format!(
            r#"
            INSERT INTO chat_messages (conversation_id, sender_id, sender_name, content, media_type, media_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        );
        let row = sqlx::query_as::<_, MessageRow>(&query)
            .bind(conversation_id)
            .bind(sender_id)
            .bind(sender_name)
            .bind(content)
            .bind(media_type.as_str())
            .bind(media_url)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Open the conversation between two users, creating it on first use
    pub async fn create_or_get(&self, user_id: Uuid, other_user_id: Uuid) -> AppResult<OpenedConversation> {
        let pair = ConversationPair::new(user_id, other_user_id)?;

        let other = sqlx::query_as::<_, (Uuid, String, String, Option<String>)>(
            "SELECT id, name, role, company_name FROM users WHERE id = $1",
        )
        .bind(other_user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::validation(
                "other_user_id",
                "The selected user does not exist",
                "L'utilisateur sélectionné n'existe pas",
            )
        })?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO conversations (user1_id, user2_id)
            VALUES ($1, $2)
            ON CONFLICT (user1_id, user2_id) DO NOTHING
            "#,
        )
        .bind(pair.first())
        .bind(pair.second())
        .execute(&self.db)
        .await?;

        let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT id, created_at FROM conversations WHERE user1_id = $1 AND user2_id = $2",
        )
        .bind(pair.first())
        .bind(pair.second())
        .fetch_one(&self.db)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!("Conversation {} opened between {} and {}", id, user_id, other_user_id);
        }

        let role = Role::parse(&other.2)
            .ok_or_else(|| AppError::Internal(format!("Unknown role stored: {}", other.2)))?;

        Ok(OpenedConversation {
            id,
            other_user: ConversationPeer {
                id: other.0,
                name: other.1,
                role,
                company_name: other.3,
            },
            created_at,
        })
    }
}
