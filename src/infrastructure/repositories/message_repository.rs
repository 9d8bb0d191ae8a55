use super::traits::{AppendOutcome, MessageRepository};
use crate::domain::{next_sent_at, Conversation, Message};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const CONVERSATION_COLUMNS: &str = "id, participant_a, participant_b, unread_a, unread_b, \
     last_message_id, last_message_sender_id, last_message_preview, last_message_at, \
     created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, message_type, content, \
     file_url, file_name, file_type, client_message_id, sent_at, is_read";

pub struct MessageRepositoryImpl {
    pool: PgPool,
}

impl MessageRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for MessageRepositoryImpl {
    async fn upsert_conversation(
        &self,
        participant_a: Uuid,
        participant_b: Uuid,
    ) -> AppResult<Conversation> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            INSERT INTO conversations (id, participant_a, participant_b, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            ON CONFLICT ON CONSTRAINT conversations_participant_pair_key
            DO UPDATE SET participant_a = EXCLUDED.participant_a
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(participant_a)
        .bind(participant_b)
        .fetch_one(&self.pool)
        .await?;
        Ok(conversation)
    }

    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(conversation)
    }

    async fn find_user_conversations(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS}
            FROM conversations
            WHERE participant_a = $1 OR participant_b = $1
            ORDER BY last_message_at DESC NULLS LAST, updated_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(conversations)
    }

    async fn append_message(&self, message: &Message) -> AppResult<AppendOutcome> {
        let mut tx = self.pool.begin().await?;

        let last_message_at: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            "SELECT last_message_at FROM conversations WHERE id = $1 FOR UPDATE",
        )
        .bind(message.conversation_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(last_message_at) = last_message_at else {
            return Err(AppError::NotFound("conversation not found".to_string()));
        };

        if let Some(client_message_id) = message.client_message_id {
            let existing = sqlx::query_as::<_, Message>(&format!(
                r#"
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE conversation_id = $1 AND sender_id = $2 AND client_message_id = $3
                "#
            ))
            .bind(message.conversation_id)
            .bind(message.sender_id)
            .bind(client_message_id)
            .fetch_optional(&mut *tx)
            .await?;
            if let Some(existing) = existing {
                tx.commit().await?;
                return Ok(AppendOutcome::Duplicate(existing));
            }
        }

        let sent_at = next_sent_at(last_message_at, message.sent_at);
        let created = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, message_type, content,
                                  file_url, file_name, file_type, client_message_id, sent_at, is_read)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.message_type)
        .bind(&message.content)
        .bind(&message.file_url)
        .bind(&message.file_name)
        .bind(&message.file_type)
        .bind(message.client_message_id)
        .bind(sent_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_id = $2,
                last_message_sender_id = $3,
                last_message_preview = $4,
                last_message_at = $5,
                unread_a = unread_a + CASE WHEN participant_a = $3 THEN 0 ELSE 1 END,
                unread_b = unread_b + CASE WHEN participant_b = $3 THEN 0 ELSE 1 END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(created.conversation_id)
        .bind(created.id)
        .bind(created.sender_id)
        .bind(created.preview())
        .bind(created.sent_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(AppendOutcome::Created(created))
    }

    async fn find_messages(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM (
                SELECT {MESSAGE_COLUMNS}
                FROM messages
                WHERE conversation_id = $1
                ORDER BY sent_at DESC, id DESC
                LIMIT $2 OFFSET $3
            ) page
            ORDER BY sent_at ASC, id ASC
            "#
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;

        // Serializes with appends so the counter and the flags move together.
        sqlx::query("SELECT id FROM conversations WHERE id = $1 FOR UPDATE")
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("conversation not found".to_string()))?;

        let message_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            WITH flipped AS (
                UPDATE messages
                SET is_read = TRUE
                WHERE conversation_id = $1 AND sender_id <> $2 AND is_read = FALSE
                RETURNING id, sent_at
            )
            SELECT id FROM flipped ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .fetch_all(&mut *tx)
        .await?;

        if !message_ids.is_empty() {
            let flipped = i32::try_from(message_ids.len()).unwrap_or(i32::MAX);
            sqlx::query(
                r#"
                UPDATE conversations
                SET unread_a = CASE WHEN participant_a = $2 THEN GREATEST(unread_a - $3, 0) ELSE unread_a END,
                    unread_b = CASE WHEN participant_b = $2 THEN GREATEST(unread_b - $3, 0) ELSE unread_b END,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(conversation_id)
            .bind(reader_id)
            .bind(flipped)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(message_ids)
    }

    async fn total_unread(&self, user_id: Uuid) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE WHEN participant_a = $1 THEN unread_a ELSE unread_b END), 0)::BIGINT
            FROM conversations
            WHERE participant_a = $1 OR participant_b = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}
