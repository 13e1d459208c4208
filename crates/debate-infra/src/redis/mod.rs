//! Redis conversation store.
//!
//! Each conversation is one JSON document `{id, topic, stance, messages}`
//! stored under `{prefix}{id}` with an expiry. Listing and topic ranking
//! scan the key space, so they cost O(keys) and are meant for small
//! deployments.

use std::time::Duration;

use chrono::Utc;
use debate_core::context::RequestContext;
use debate_core::repository::conversation::ConversationStore;
use debate_core::repository::rank_topics;
use debate_types::conversation::{new_conversation_id, Conversation, ConversationSummary, Stance};
use debate_types::error::StoreError;
use redis::aio::{ConnectionLike, ConnectionManager};

/// Default key prefix for conversation documents.
pub const DEFAULT_KEY_PREFIX: &str = "convo:";

/// Default document lifetime (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 100;

/// Redis-backed implementation of `ConversationStore`.
///
/// Generic over the async connection so tests can substitute a scripted one.
#[derive(Clone)]
pub struct RedisConversationStore<C = ConnectionManager> {
    conn: C,
    key_prefix: String,
    ttl: Duration,
}

impl RedisConversationStore<ConnectionManager> {
    /// Connect to the server at `url`.
    ///
    /// The connection manager reconnects on its own after transient
    /// failures; this call fails only if the first connection cannot be made.
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(unavailable("open redis client"))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(unavailable("connect to redis"))?;

        Ok(Self::with_connection(conn, key_prefix, ttl))
    }
}

impl<C> RedisConversationStore<C>
where
    C: ConnectionLike + Clone + Send + Sync,
{
    /// Wrap an already established connection.
    pub fn with_connection(conn: C, key_prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    fn key(&self, id: &str) -> String {
        conversation_key(&self.key_prefix, id)
    }

    async fn fetch(&self, id: &str) -> Result<Conversation, StoreError> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(self.key(id))
            .query_async(&mut conn)
            .await
            .map_err(unavailable("get conversation"))?;

        match payload {
            Some(payload) => decode_conversation(&payload),
            None => {
                tracing::debug!(conversation_id = %id, "conversation not found");
                Err(StoreError::NotFound)
            }
        }
    }

    async fn put(&self, conversation: &Conversation) -> Result<(), StoreError> {
        let payload = encode_conversation(conversation)?;
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(self.key(conversation.id()))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(unavailable("save conversation"))?;
        Ok(())
    }

    /// Every key under the prefix, newest generated ids first.
    async fn scan_keys(&self, operation: &'static str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.key_prefix);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(unavailable(operation))?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once.
        keys.sort_unstable_by(|a, b| b.cmp(a));
        keys.dedup();
        Ok(keys)
    }

    /// Load the documents stored under `keys`, skipping expired or corrupt ones.
    async fn load_many(
        &self,
        keys: &[String],
        operation: &'static str,
    ) -> Result<Vec<Conversation>, StoreError> {
        let mut conn = self.conn.clone();
        let mut conversations = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(SCAN_BATCH) {
            let payloads: Vec<Option<String>> = redis::cmd("MGET")
                .arg(chunk)
                .query_async(&mut conn)
                .await
                .map_err(unavailable(operation))?;

            for (key, payload) in chunk.iter().zip(payloads) {
                let Some(payload) = payload else {
                    // Expired between SCAN and MGET.
                    continue;
                };
                match decode_conversation(&payload) {
                    Ok(conversation) => conversations.push(conversation),
                    Err(e) => {
                        tracing::warn!(backend = "redis", key = %key, error = %e, "skipping corrupt conversation");
                    }
                }
            }
        }

        Ok(conversations)
    }

    async fn summaries(&self, limit: usize, offset: usize) -> Result<Vec<ConversationSummary>, StoreError> {
        const OP: &str = "list conversations";

        let keys = self.scan_keys(OP).await?;
        let page: Vec<String> = keys.into_iter().skip(offset).take(limit).collect();
        if page.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        Ok(self
            .load_many(&page, OP)
            .await?
            .iter()
            .map(|conversation| conversation.summary(now, now))
            .collect())
    }

    async fn topics(&self, limit: usize) -> Result<Vec<String>, StoreError> {
        const OP: &str = "popular topics";

        let keys = self.scan_keys(OP).await?;
        let conversations = self.load_many(&keys, OP).await?;
        Ok(rank_topics(conversations.iter().map(|c| c.topic()), limit))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable("health check"))?;
        Ok(())
    }
}

impl<C> std::fmt::Debug for RedisConversationStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConversationStore")
            .field("key_prefix", &self.key_prefix)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<C> ConversationStore for RedisConversationStore<C>
where
    C: ConnectionLike + Clone + Send + Sync,
{
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Conversation, StoreError> {
        ctx.run(self.fetch(id)).await?
    }

    async fn save(&self, ctx: &RequestContext, conversation: &Conversation) -> Result<(), StoreError> {
        ctx.run(self.put(conversation)).await?
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        topic: &str,
        stance: Stance,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new(new_conversation_id(), topic, stance);
        ctx.run(self.put(&conversation)).await??;
        Ok(conversation)
    }

    /// Newest generated ids first. Timestamps are the time of the call.
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

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn conversation_key(prefix: &str, id: &str) -> String {
    format!("{prefix}{id}")
}

/// Log the driver error and hand back only the operation name.
fn unavailable(operation: &'static str) -> impl FnOnce(redis::RedisError) -> StoreError {
    move |e| {
        tracing::warn!(backend = "redis", operation, error = %e, "redis operation failed");
        StoreError::Unavailable(operation.to_string())
    }
}

fn encode_conversation(conversation: &Conversation) -> Result<String, StoreError> {
    serde_json::to_string(conversation)
        .map_err(|e| StoreError::Invalid(format!("unencodable conversation: {e}")))
}

fn decode_conversation(payload: &str) -> Result<Conversation, StoreError> {
    serde_json::from_str(payload)
        .map_err(|e| StoreError::Invalid(format!("malformed conversation payload: {e}")))
}
