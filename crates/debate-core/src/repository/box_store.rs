//! BoxConversationStore -- object-safe dynamic dispatch wrapper for ConversationStore.
//!
//! Follows the blanket-impl pattern used for the secret fetcher:
//! 1. Define an object-safe `ConversationStoreDyn` trait with boxed futures
//! 2. Blanket-impl `ConversationStoreDyn` for all `T: ConversationStore`
//! 3. `BoxConversationStore` wraps `Arc<dyn ConversationStoreDyn>` and delegates

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use debate_types::conversation::{Conversation, ConversationSummary, Stance};
use debate_types::error::StoreError;

use super::conversation::ConversationStore;
use crate::context::RequestContext;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`ConversationStore`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch. A blanket
/// implementation is provided for all types implementing `ConversationStore`.
pub trait ConversationStoreDyn: Send + Sync {
    fn backend_name_dyn(&self) -> &'static str;

    fn get_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>>;

    fn save_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        conversation: &'a Conversation,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    fn create_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        topic: &'a str,
        stance: Stance,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>>;

    fn list_summaries_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        limit: usize,
        offset: usize,
    ) -> BoxFuture<'a, Result<Vec<ConversationSummary>, StoreError>>;

    fn popular_topics_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, StoreError>>;

    fn health_check_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Blanket implementation: any `ConversationStore` automatically implements `ConversationStoreDyn`.
impl<T: ConversationStore> ConversationStoreDyn for T {
    fn backend_name_dyn(&self) -> &'static str {
        self.backend_name()
    }

    fn get_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>> {
        Box::pin(self.get(ctx, id))
    }

    fn save_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        conversation: &'a Conversation,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.save(ctx, conversation))
    }

    fn create_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        topic: &'a str,
        stance: Stance,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>> {
        Box::pin(self.create(ctx, topic, stance))
    }

    fn list_summaries_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        limit: usize,
        offset: usize,
    ) -> BoxFuture<'a, Result<Vec<ConversationSummary>, StoreError>> {
        Box::pin(self.list_summaries(ctx, limit, offset))
    }

    fn popular_topics_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
        Box::pin(self.popular_topics(ctx, limit))
    }

    fn health_check_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.health_check(ctx))
    }
}

/// Type-erased conversation store for startup backend selection.
///
/// Since `ConversationStore` uses RPITIT it cannot be a trait object
/// directly. `BoxConversationStore` is cheap to clone and itself implements
/// `ConversationStore`, so services generic over the trait accept it.
#[derive(Clone)]
pub struct BoxConversationStore {
    inner: Arc<dyn ConversationStoreDyn>,
}

impl BoxConversationStore {
    /// Wrap a concrete store in a type-erased handle.
    pub fn new<T: ConversationStore + 'static>(store: T) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl std::fmt::Debug for BoxConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxConversationStore")
            .field("backend", &self.inner.backend_name_dyn())
            .finish()
    }
}

impl ConversationStore for BoxConversationStore {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name_dyn()
    }

    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Conversation, StoreError> {
        self.inner.get_boxed(ctx, id).await
    }

    async fn save(
        &self,
        ctx: &RequestContext,
        conversation: &Conversation,
    ) -> Result<(), StoreError> {
        self.inner.save_boxed(ctx, conversation).await
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        topic: &str,
        stance: Stance,
    ) -> Result<Conversation, StoreError> {
        self.inner.create_boxed(ctx, topic, stance).await
    }

    async fn list_summaries(
        &self,
        ctx: &RequestContext,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        self.inner.list_summaries_boxed(ctx, limit, offset).await
    }

    async fn popular_topics(
        &self,
        ctx: &RequestContext,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.popular_topics_boxed(ctx, limit).await
    }

    async fn health_check(&self, ctx: &RequestContext) -> Result<(), StoreError> {
        self.inner.health_check_boxed(ctx).await
    }
}
