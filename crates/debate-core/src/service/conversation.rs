//! Conversation turn orchestration.
//!
//! One turn: resolve (or start) the conversation, record the user's message,
//! ask a [`ReplyEngine`] for the bot's answer, record that too, persist, and
//! hand back the recent window of messages.
//!
//! This is the seam for a chat front end. No transport or reply generator
//! ships in this workspace; embedders supply their own [`ReplyEngine`], and
//! the `debate` binary only reaches the store through [`ConversationService::store`].

use std::future::Future;
use std::time::Duration;

use debate_types::conversation::{new_conversation_id, Conversation, Message, MessageRole, Stance};
use debate_types::error::{EngineError, ServiceError, StoreError};

use crate::context::RequestContext;
use crate::repository::conversation::ConversationStore;

/// Messages returned to the caller after each turn.
pub const REPLY_WINDOW: usize = 10;

/// Budget for one whole turn, reply generation included.
pub const TURN_TIMEOUT: Duration = Duration::from_secs(25);

/// Produces the bot's next message.
pub trait ReplyEngine: Send + Sync {
    /// `history` holds the messages exchanged before `user_message`.
    fn generate(
        &self,
        ctx: &RequestContext,
        topic: &str,
        stance: Stance,
        history: &[Message],
        user_message: &str,
    ) -> impl Future<Output = Result<String, EngineError>> + Send;
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Turn {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

/// Conversation workflow over any [`ConversationStore`].
pub struct ConversationService<S: ConversationStore> {
    store: S,
}

impl<S: ConversationStore> ConversationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the conversation named by `id`, or start a new one.
    ///
    /// Without an id a fresh one is generated. An id the store does not know
    /// starts a new conversation under that id. `classify` picks the topic
    /// and stance for new conversations only. Nothing is persisted here.
    pub async fn get_or_create<C>(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        classify: C,
    ) -> Result<Conversation, StoreError>
    where
        C: FnOnce() -> (String, Stance),
    {
        let id = match id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let (topic, stance) = classify();
                return Ok(Conversation::new(new_conversation_id(), topic, stance));
            }
        };

        match self.store.get(ctx, id).await {
            Ok(conversation) => Ok(conversation),
            Err(StoreError::NotFound) => {
                tracing::debug!(conversation_id = %id, "unknown conversation id, starting new");
                let (topic, stance) = classify();
                Ok(Conversation::new(id, topic, stance))
            }
            Err(e) => Err(e),
        }
    }

    /// Run one exchange and return the latest messages.
    ///
    /// A failed save is logged and the turn still succeeds; the reply was
    /// already produced.
    pub async fn take_turn<E, C>(
        &self,
        ctx: &RequestContext,
        id: Option<&str>,
        user_message: &str,
        engine: &E,
        classify: C,
    ) -> Result<Turn, ServiceError>
    where
        E: ReplyEngine,
        C: FnOnce() -> (String, Stance),
    {
        let mut conversation = self.get_or_create(ctx, id, classify).await?;

        let history = conversation.messages().to_vec();
        conversation.append(MessageRole::User, user_message);

        let reply = ctx
            .run(engine.generate(
                ctx,
                conversation.topic(),
                conversation.stance(),
                &history,
                user_message,
            ))
            .await
            .map_err(EngineError::from)??;
        conversation.append(MessageRole::Bot, reply);

        if let Err(e) = self.store.save(ctx, &conversation).await {
            tracing::warn!(
                conversation_id = %conversation.id(),
                backend = self.store.backend_name(),
                error = %e,
                "failed to persist conversation turn"
            );
        }

        Ok(Turn {
            conversation_id: conversation.id().to_string(),
            messages: conversation.last_n(REPLY_WINDOW),
        })
    }
}
