//! ConversationStore trait definition.
//!
//! The storage contract every backend satisfies identically. Implementations
//! live in this crate (`InMemoryConversationStore`) and in debate-infra
//! (`SqliteConversationStore`, `RedisConversationStore`).

use debate_types::conversation::{Conversation, ConversationSummary, Stance};
use debate_types::error::StoreError;

use crate::context::RequestContext;

/// Repository trait for conversation persistence.
///
/// Every method takes the caller's [`RequestContext`]; suspension points
/// honor its deadline and cancellation. Values cross the boundary as owned
/// data: `get` returns a fresh `Conversation`, `save` copies what it needs.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). For runtime
/// backend selection wrap an implementation in
/// [`BoxConversationStore`](super::box_store::BoxConversationStore).
pub trait ConversationStore: Send + Sync {
    /// Short backend name for logs (`memory`, `redis`, `sqlite`).
    fn backend_name(&self) -> &'static str;

    /// Load a conversation. An unknown id is `StoreError::NotFound`.
    fn get(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Conversation, StoreError>> + Send;

    /// Replace whatever is stored under the conversation's id.
    ///
    /// Full overwrite, not a merge. A failed save leaves the previously
    /// stored version intact.
    fn save(
        &self,
        ctx: &RequestContext,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Allocate a new id, persist an empty conversation, and return it.
    fn create(
        &self,
        ctx: &RequestContext,
        topic: &str,
        stance: Stance,
    ) -> impl std::future::Future<Output = Result<Conversation, StoreError>> + Send;

    /// Page through conversation summaries.
    fn list_summaries(
        &self,
        ctx: &RequestContext,
        limit: usize,
        offset: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationSummary>, StoreError>> + Send;

    /// Distinct topics ranked by number of conversations, most popular first.
    fn popular_topics(
        &self,
        ctx: &RequestContext,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Liveness probe bounded by the context deadline.
    fn health_check(
        &self,
        ctx: &RequestContext,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
