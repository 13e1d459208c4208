//! In-process conversation store.
//!
//! A single `HashMap` behind one reader/writer lock for the whole backend.
//! Reads share the lock, writes take it exclusively. Conversations go in and
//! come out as owned clones, so nothing a caller does to its copy can reach
//! the stored state. Entries live for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use debate_types::conversation::{
    new_conversation_id, Conversation, ConversationSummary, Stance,
};
use debate_types::error::StoreError;
use tokio::sync::RwLock;

use super::conversation::ConversationStore;
use super::rank_topics;
use crate::context::RequestContext;

/// Map-backed implementation of `ConversationStore`.
///
/// Cloning yields another handle to the same map.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Conversation, StoreError> {
        let conversations = ctx.run(self.conversations.read()).await?;
        conversations.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn save(
        &self,
        ctx: &RequestContext,
        conversation: &Conversation,
    ) -> Result<(), StoreError> {
        let mut conversations = ctx.run(self.conversations.write()).await?;
        conversations.insert(conversation.id().to_string(), conversation.clone());
        Ok(())
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        topic: &str,
        stance: Stance,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation::new(new_conversation_id(), topic, stance);
        self.save(ctx, &conversation).await?;

        tracing::debug!(conversation_id = %conversation.id(), "created conversation");
        Ok(conversation)
    }

    /// Newest generated ids first. Timestamps are the time of the call.
    async fn list_summaries(
        &self,
        ctx: &RequestContext,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let conversations = ctx.run(self.conversations.read()).await?;

        let mut ids: Vec<&String> = conversations.keys().collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let now = Utc::now();
        Ok(ids
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| conversations.get(id))
            .map(|conversation| conversation.summary(now, now))
            .collect())
    }

    async fn popular_topics(
        &self,
        ctx: &RequestContext,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let conversations = ctx.run(self.conversations.read()).await?;
        Ok(rank_topics(
            conversations.values().map(|c| c.topic()),
            limit,
        ))
    }

    async fn health_check(&self, ctx: &RequestContext) -> Result<(), StoreError> {
        ctx.check()?;
        Ok(())
    }
}
