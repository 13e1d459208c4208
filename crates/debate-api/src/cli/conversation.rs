//! Conversation CLI commands: create, show, list, topics.

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use serde::Serialize;

use debate_core::repository::conversation::ConversationStore;
use debate_types::conversation::{ConversationSummary, MessageRole, Stance};
use debate_types::error::StoreError;

use super::{page_limit, page_offset, DEFAULT_LIST_LIMIT, DEFAULT_TOPICS_LIMIT, MAX_LIST_LIMIT, MAX_TOPICS_LIMIT};
use crate::state::AppState;

/// One page of conversation summaries as reported by `list --json`.
#[derive(Debug, Serialize)]
pub struct ConversationPage {
    pub conversations: Vec<ConversationSummary>,
    /// Lower bound on the number of stored conversations.
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl ConversationPage {
    pub fn new(conversations: Vec<ConversationSummary>, limit: usize, offset: usize) -> Self {
        let returned = conversations.len();
        // A full page hints that at least one more conversation exists.
        let total = offset + returned + usize::from(returned == limit);
        Self {
            conversations,
            total,
            page: offset / limit + 1,
            limit,
        }
    }
}

/// Start an empty conversation and print its id.
pub async fn create_conversation(state: &AppState, topic: &str, stance: Stance, json: bool) -> Result<()> {
    let topic = topic.trim();
    anyhow::ensure!(!topic.is_empty(), "Topic must not be empty");

    let ctx = state.request_context();
    let conv = state
        .conversations
        .store()
        .create(&ctx, topic, stance)
        .await
        .context("Failed to create conversation")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conv)?);
        return Ok(());
    }

    println!();
    println!("  {} Started {}", style("✓").green().bold(), style(conv.title()).cyan());
    println!("  ID: {}", style(conv.id()).dim());
    println!();

    Ok(())
}

/// Show a conversation and its message log.
pub async fn show_conversation(state: &AppState, id: &str, json: bool) -> Result<()> {
    let ctx = state.request_context();
    let conv = match state.conversations.store().get(&ctx, id).await {
        Ok(conv) => conv,
        Err(StoreError::NotFound) => anyhow::bail!("Conversation '{id}' not found"),
        Err(err) => return Err(err).context("Failed to load conversation"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&conv)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(conv.title()).bold());
    println!("  ID: {}  Messages: {}", style(conv.id()).dim(), conv.message_count());
    println!();

    for message in conv.messages() {
        let speaker = match message.role {
            MessageRole::User => style("you").green().bold(),
            MessageRole::Bot => style("bot").cyan().bold(),
        };
        let when = chrono::DateTime::from_timestamp_millis(message.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("  {speaker} {}", style(when).dim());
        for line in message.text.lines() {
            println!("    {line}");
        }
        println!();
    }

    Ok(())
}

/// List conversations, most recent first.
pub async fn list_conversations(state: &AppState, limit: i64, offset: i64, json: bool) -> Result<()> {
    let limit = page_limit(limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = page_offset(offset);

    let ctx = state.request_context();
    let summaries = state
        .conversations
        .store()
        .list_summaries(&ctx, limit, offset)
        .await
        .context("Failed to list conversations")?;

    let page = ConversationPage::new(summaries, limit, offset);

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.conversations.is_empty() {
        println!();
        println!("  No conversations yet. Start one with:");
        println!();
        println!("    {}", style("debate create --topic \"...\" --stance PRO").cyan());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "TOPIC", "STANCE", "MESSAGES", "UPDATED"]);

    for summary in &page.conversations {
        let stance_color = match summary.stance {
            Stance::Pro => Color::Green,
            Stance::Con => Color::Red,
        };
        table.add_row(vec![
            Cell::new(&summary.id).fg(Color::DarkGrey),
            Cell::new(&summary.topic).fg(Color::Cyan),
            Cell::new(summary.stance).fg(stance_color),
            Cell::new(summary.message_count),
            Cell::new(summary.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    println!("{table}");
    println!(
        "  {}",
        style(format!("Page {} ({} per page)", page.page, page.limit)).dim()
    );

    Ok(())
}

/// Print the most debated topics.
pub async fn popular_topics(state: &AppState, limit: i64, json: bool) -> Result<()> {
    let limit = page_limit(limit, DEFAULT_TOPICS_LIMIT, MAX_TOPICS_LIMIT);

    let ctx = state.request_context();
    let topics = state
        .conversations
        .store()
        .popular_topics(&ctx, limit)
        .await
        .context("Failed to load popular topics")?;

    if json {
        let body = serde_json::json!({ "topics": topics });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    if topics.is_empty() {
        println!("  No topics yet.");
        return Ok(());
    }

    println!();
    for (rank, topic) in topics.iter().enumerate() {
        println!("  {:>2}. {}", style(rank + 1).dim(), topic);
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use debate_types::conversation::Conversation;

    fn summaries(n: usize) -> Vec<ConversationSummary> {
        let now = Utc::now();
        (0..n)
            .map(|i| Conversation::new(format!("c{i}"), "AI", Stance::Pro).summary(now, now))
            .collect()
    }

    #[test]
    fn test_full_page_reports_one_more() {
        let page = ConversationPage::new(summaries(20), 20, 40);
        assert_eq!(page.total, 61);
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 20);
    }

    #[test]
    fn test_partial_page_total_is_exact() {
        let page = ConversationPage::new(summaries(3), 20, 0);
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_page_json_shape() {
        let page = ConversationPage::new(summaries(1), 10, 0);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["conversations"][0]["topic_name"], "AI");
        assert_eq!(value["conversations"][0]["bot_stance"], "PRO");
    }
}
