use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::models::ChatRole;

use super::{Store, StoreError};

#[derive(Debug, Clone)]
pub struct NewChatTurn<'a> {
    pub user_id: Uuid,
    pub session_id: &'a str,
    pub assistant_config_id: Option<Uuid>,
    pub role: ChatRole,
    pub content: &'a str,
    pub tokens_used: i32,
    pub model: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ChatTurnRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub assistant_config_id: Option<Uuid>,
    pub role: ChatRole,
    pub content: String,
    pub tokens_used: i32,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub async fn insert_chat_turn(
        &self,
        turn: NewChatTurn<'_>,
    ) -> Result<ChatTurnRecord, StoreError> {
        let row = sqlx::query(
            "INSERT INTO chat_turns (
                id, user_id, session_id, assistant_config_id, role, content,
                tokens_used, model, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, user_id, session_id, assistant_config_id, role, content,
                       tokens_used, model, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(turn.user_id)
        .bind(turn.session_id)
        .bind(turn.assistant_config_id)
        .bind(role_to_db(turn.role))
        .bind(turn.content)
        .bind(turn.tokens_used)
        .bind(turn.model)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row_to_turn(&row)
    }

    /// The most recent `limit` turns of a session, returned oldest-first.
    pub async fn recent_session_turns(
        &self,
        user_id: Uuid,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatTurnRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, session_id, assistant_config_id, role, content,
                    tokens_used, model, created_at
             FROM chat_turns
             WHERE user_id = $1 AND session_id = $2
             ORDER BY created_at DESC, id DESC
             LIMIT $3",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut turns = rows
            .iter()
            .map(row_to_turn)
            .collect::<Result<Vec<_>, _>>()?;
        turns.reverse();
        Ok(turns)
    }

    pub async fn session_history(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Vec<ChatTurnRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, session_id, assistant_config_id, role, content,
                    tokens_used, model, created_at
             FROM chat_turns
             WHERE user_id = $1 AND session_id = $2
             ORDER BY created_at ASC, id ASC",
        )
        .bind(user_id)
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_turn).collect()
    }

    pub async fn list_session_ids(&self, user_id: Uuid) -> Result<Vec<String>, StoreError> {
        let session_ids = sqlx::query_scalar(
            "SELECT session_id
             FROM chat_turns
             WHERE user_id = $1
             GROUP BY session_id
             ORDER BY MAX(created_at) DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(session_ids)
    }
}

fn role_to_db(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
    }
}

fn role_from_db(value: &str) -> Result<ChatRole, StoreError> {
    match value {
        "user" => Ok(ChatRole::User),
        "assistant" => Ok(ChatRole::Assistant),
        "system" => Ok(ChatRole::System),
        _ => Err(StoreError::InvalidData(format!(
            "unknown chat role persisted: {value}"
        ))),
    }
}

fn row_to_turn(row: &PgRow) -> Result<ChatTurnRecord, StoreError> {
    let role_raw: String = row.try_get("role")?;

    Ok(ChatTurnRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        session_id: row.try_get("session_id")?,
        assistant_config_id: row.try_get("assistant_config_id")?,
        role: role_from_db(&role_raw)?,
        content: row.try_get("content")?,
        tokens_used: row.try_get("tokens_used")?,
        model: row.try_get("model")?,
        created_at: row.try_get("created_at")?,
    })
}
