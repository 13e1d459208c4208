//! Repository traits for persistence and secret retrieval.
//!
//! Traits are defined here in core; implementations live in debate-infra.
//! The in-memory conversation store is the exception: it has no external
//! dependencies, so it lives next to the trait.

pub mod box_store;
pub mod conversation;
pub mod memory;
pub mod secret;

use std::collections::HashMap;

/// Rank topics by occurrence count, most frequent first. Ties break on topic
/// text so the order is stable across calls.
pub fn rank_topics<'a, I>(topics: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    for topic in topics {
        *counts.entry(topic).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(topic, _)| topic.to_string())
        .collect()
}
