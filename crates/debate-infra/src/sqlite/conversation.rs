//! SQLite conversation store.
//!
//! Implements `ConversationStore` from `debate-core` over two tables:
//! `conversations` holds metadata plus a denormalized message count and
//! title, `messages` holds one row per message ordered by `position`.
//! Raw queries, private Row structs, split reader/writer pool usage.

use chrono::{DateTime, SecondsFormat, Utc};
use debate_core::context::RequestContext;
use debate_core::repository::conversation::ConversationStore;
use debate_types::conversation::{
    new_conversation_id, Conversation, ConversationSummary, Message, MessageRole, Stance,
};
use debate_types::error::StoreError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Open (creating and migrating if needed) the database at `database_url`.
    pub async fn open(database_url: &str) -> Result<Self, StoreError> {
        let pool = DatabasePool::new(database_url)
            .await
            .map_err(unavailable("open database"))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: String,
    topic_name: String,
    bot_stance: String,
    title: String,
    message_count: i64,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            topic_name: row.try_get("topic_name")?,
            bot_stance: row.try_get("bot_stance")?,
            title: row.try_get("title")?,
            message_count: row.try_get("message_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn stance(&self) -> Result<Stance, StoreError> {
        self.bot_stance.parse().map_err(StoreError::Invalid)
    }

    fn into_conversation(self, messages: Vec<Message>) -> Result<Conversation, StoreError> {
        let stance = self.stance()?;
        Ok(Conversation::restore(self.id, self.topic_name, stance, messages))
    }

    fn into_summary(self) -> Result<ConversationSummary, StoreError> {
        let stance = self.stance()?;
        Ok(ConversationSummary {
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            message_count: u32::try_from(self.message_count).unwrap_or(0),
            id: self.id,
            topic: self.topic_name,
            stance,
            title: self.title,
        })
    }
}

struct MessageRow {
    role: String,
    content: String,
    created_at: i64,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, StoreError> {
        let role: MessageRole = self.role.parse().map_err(StoreError::Invalid)?;
        Ok(Message {
            role,
            text: self.content,
            timestamp: self.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Log the driver error and hand back only the operation name.
fn unavailable(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |e| {
        tracing::warn!(backend = "sqlite", operation, error = %e, "sqlite operation failed");
        StoreError::Unavailable(operation.to_string())
    }
}

fn invalid(e: sqlx::Error) -> StoreError {
    StoreError::Invalid(format!("unreadable row: {e}"))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Invalid(format!("invalid timestamp: {e}")))
}

fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// Queries (run inside the caller's context)
// ---------------------------------------------------------------------------

impl SqliteConversationStore {
    async fn load(&self, id: &str) -> Result<Conversation, StoreError> {
        const OP: &str = "get conversation";

        // One read transaction so metadata and messages come from one snapshot.
        let mut tx = self.pool.reader.begin().await.map_err(unavailable(OP))?;

        let row = sqlx::query(
            "SELECT id, topic_name, bot_stance, title, message_count, created_at, updated_at
             FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable(OP))?;

        let Some(row) = row else {
            tracing::debug!(conversation_id = %id, "conversation not found");
            return Err(StoreError::NotFound);
        };
        let conversation_row = ConversationRow::from_row(&row).map_err(invalid)?;

        let message_rows = sqlx::query(
            "SELECT role, content, created_at FROM messages
             WHERE conversation_id = ? ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .map_err(unavailable(OP))?;

        tx.commit().await.map_err(unavailable(OP))?;

        let mut messages = Vec::with_capacity(message_rows.len());
        for row in &message_rows {
            messages.push(MessageRow::from_row(row).map_err(invalid)?.into_message()?);
        }

        conversation_row.into_conversation(messages)
    }

    async fn persist(&self, conversation: &Conversation) -> Result<(), StoreError> {
        const OP: &str = "save conversation";

        let now = format_timestamp(&Utc::now());
        let mut tx = self.pool.writer.begin().await.map_err(unavailable(OP))?;

        sqlx::query(
            r#"INSERT INTO conversations (id, topic_name, bot_stance, title, message_count, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   topic_name = excluded.topic_name,
                   bot_stance = excluded.bot_stance,
                   title = excluded.title,
                   message_count = excluded.message_count,
                   updated_at = excluded.updated_at"#,
        )
        .bind(conversation.id())
        .bind(conversation.topic())
        .bind(conversation.stance().to_string())
        .bind(conversation.title())
        .bind(to_sql_count(conversation.message_count()))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(unavailable(OP))?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation.id())
            .execute(&mut *tx)
            .await
            .map_err(unavailable(OP))?;

        for (position, message) in conversation.messages().iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO messages (conversation_id, position, role, content, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(conversation.id())
            .bind(to_sql_count(position))
            .bind(message.role.to_string())
            .bind(&message.text)
            .bind(message.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(unavailable(OP))?;
        }

        // Dropping the transaction on any error above rolls it back.
        tx.commit().await.map_err(unavailable(OP))?;

        tracing::debug!(
            conversation_id = %conversation.id(),
            messages = conversation.message_count(),
            "saved conversation"
        );
        Ok(())
    }

    async fn summaries(&self, limit: usize, offset: usize) -> Result<Vec<ConversationSummary>, StoreError> {
        const OP: &str = "list conversations";

        let rows = sqlx::query(
            "SELECT id, topic_name, bot_stance, title, message_count, created_at, updated_at
             FROM conversations ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(to_sql_count(limit))
        .bind(to_sql_count(offset))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(unavailable(OP))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            summaries.push(ConversationRow::from_row(row).map_err(invalid)?.into_summary()?);
        }
        Ok(summaries)
    }

    async fn topics(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        const OP: &str = "popular topics";

        let rows = sqlx::query(
            "SELECT topic_name, COUNT(*) AS cnt FROM conversations
             GROUP BY topic_name ORDER BY cnt DESC, topic_name ASC LIMIT ?",
        )
        .bind(to_sql_count(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(unavailable(OP))?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("topic_name").map_err(invalid))
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool.reader)
            .await
            .map_err(unavailable("health check"))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ConversationStore implementation
// ---------------------------------------------------------------------------

impl ConversationStore for SqliteConversationStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Conversation, StoreError> {
        ctx.run(self.load(id)).await?
    }

    async fn save(&self, ctx: &RequestContext, conversation: &Conversation) -> Result<(), StoreError> {
        ctx.run(self.persist(conversation)).await?
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        topic: &str,
        stance: Stance,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new(new_conversation_id(), topic, stance);
        ctx.run(self.persist(&conversation)).await??;
        Ok(conversation)
    }

    async fn list_summaries(
        &self,
        ctx: &RequestContext,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        ctx.run(self.summaries(limit, offset)).await?
    }

    async fn popular_topics(&self, ctx: &RequestContext, limit: usize) -> Result<Vec<String>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        ctx.run(self.topics(limit)).await?
    }

    async fn health_check(&self, ctx: &RequestContext) -> Result<(), StoreError> {
        ctx.run(self.ping()).await?
    }
}
