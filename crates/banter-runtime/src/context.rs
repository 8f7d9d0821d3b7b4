//! Context Assembler.
//!
//! Builds the short plain-text context block that precedes a reply prompt.
//! Sections, in order, each omitted entirely when it has no data:
//!
//! 1. the most recent window entries with minutes elapsed (text cut to 80
//!    characters, `📷` for attachments);
//! 2. the author's profile summary;
//! 3. semantic-recall hits with days elapsed (text cut to 60 characters).

use std::sync::Arc;

use banter_memory::{RecencyWindow, StoreError};
use banter_types::{AuthorId, Event, Profile, Trait};
use chrono::{DateTime, Utc};

use crate::profile::ProfileEvolution;
use crate::recall::SemanticRecall;

const RECENT_TEXT_CHARS: usize = 80;
const RECALLED_TEXT_CHARS: usize = 60;
const ATTACHMENT_MARKER: &str = " 📷";

/// Read-only view over the three memory sources.
pub struct ContextAssembler<'a> {
    window: &'a RecencyWindow,
    recall: &'a SemanticRecall,
    profiles: &'a ProfileEvolution,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(window: &'a RecencyWindow, recall: &'a SemanticRecall, profiles: &'a ProfileEvolution) -> Self {
        Self {
            window,
            recall,
            profiles,
        }
    }

    /// Context for a reply to `author_id` about `query`.
    pub async fn assemble(
        &self,
        author_id: AuthorId,
        query: &str,
        recency_limit: usize,
        similarity_limit: usize,
    ) -> Result<String, StoreError> {
        let recent = self.window.snapshot(recency_limit);
        let profile = self.profiles.get(author_id)?;
        let similar = self.recall.search(query, similarity_limit).await;
        Ok(render_context(Utc::now(), &recent, profile.as_ref(), &similar))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn trait_label(t: Trait) -> &'static str {
    match t {
        Trait::Aggression => "агрессивность",
        Trait::Friendliness => "дружелюбность",
        Trait::Humor => "юмор",
    }
}

fn event_line(event: &Event, age: String, max_chars: usize) -> String {
    let mut text = truncate(&event.text, max_chars);
    if event.has_attachment {
        text.push_str(ATTACHMENT_MARKER);
    }
    format!("[{}] ({}): {}", event.display_name, age, text)
}

/// Deterministic rendering of the context sections as of `now`.
pub fn render_context(
    now: DateTime<Utc>,
    recent: &[Arc<Event>],
    profile: Option<&Profile>,
    similar: &[Arc<Event>],
) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !recent.is_empty() {
        let mut lines = vec!["Недавние сообщения:".to_string()];
        for event in recent {
            let minutes = (now - event.timestamp).num_minutes().max(0);
            lines.push(event_line(event, format!("{minutes}м назад"), RECENT_TEXT_CHARS));
        }
        sections.push(lines.join("\n"));
    }

    if let Some(p) = profile {
        let traits = p
            .traits
            .iter()
            .map(|(t, v)| format!("{}: {:.1}", trait_label(*t), v))
            .collect::<Vec<_>>()
            .join(", ");
        let interests = if p.interests.is_empty() {
            "не определены".to_string()
        } else {
            p.top_interests(3).join(", ")
        };
        sections.push(format!(
            "{} ({}, {} сообщений)\n   Характер: {}\n   Интересы: {}",
            p.display_name,
            p.tier.label(),
            p.interaction_count,
            traits,
            interests
        ));
    }

    if !similar.is_empty() {
        let mut lines = vec!["Релевантные воспоминания:".to_string()];
        for event in similar {
            let days = (now - event.timestamp).num_days().max(0);
            lines.push(event_line(event, format!("{days}д назад"), RECALLED_TEXT_CHARS));
        }
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEmbedder;
    use banter_memory::{MessageStore, VectorIndex};
    use banter_types::{InboundMessage, RelationshipTier, Sentiment};
    use chrono::Duration;

    fn event_at(name: &str, text: &str, ts: DateTime<Utc>) -> Arc<Event> {
        Arc::new(Event::from_inbound(
            &InboundMessage::new(1, name, text).sent_at(ts),
            Sentiment::Neutral,
            0.5,
        ))
    }

    #[test]
    fn empty_inputs_render_nothing() {
        assert_eq!(render_context(Utc::now(), &[], None, &[]), "");
    }

    #[test]
    fn recent_section_has_age_truncation_and_marker() {
        let now = Utc::now();
        let long = "д".repeat(120);
        let mut with_pic = InboundMessage::new(2, "Петя", "смотри").sent_at(now - Duration::minutes(3));
        with_pic = with_pic.with_attachment(None);
        let recent = vec![
            event_at("Вася", &long, now - Duration::minutes(12)),
            Arc::new(Event::from_inbound(&with_pic, Sentiment::Neutral, 0.8)),
        ];
        let out = render_context(now, &recent, None, &[]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Недавние сообщения:");
        assert_eq!(lines[1], format!("[Вася] (12м назад): {}", "д".repeat(80)));
        assert_eq!(lines[2], "[Петя] (3м назад): смотри 📷");
    }

    #[test]
    fn profile_section_formats_traits_and_interests() {
        let mut p = Profile::new(1, "Оля", Utc::now());
        p.interaction_count = 25;
        p.tier = RelationshipTier::Friend;
        p.traits.insert(Trait::Humor, 0.7345);
        let out = render_context(Utc::now(), &[], Some(&p), &[]);
        assert!(out.starts_with("Оля (приятель, 25 сообщений)"));
        assert!(out.contains("агрессивность: 0.5, дружелюбность: 0.5, юмор: 0.7"));
        assert!(out.contains("Интересы: не определены"));
    }

    #[test]
    fn similar_section_uses_days_and_shorter_cut() {
        let now = Utc::now();
        let old = event_at("Гоша", &"я".repeat(100), now - Duration::days(4));
        let out = render_context(now, &[], None, &[old]);
        assert_eq!(out, format!("Релевантные воспоминания:\n[Гоша] (4д назад): {}", "я".repeat(60)));
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let now = Utc::now();
        let e = event_at("a", "x", now);
        let p = Profile::new(1, "a", now);
        let out = render_context(now, &[e.clone()], Some(&p), &[e]);
        let recent = out.find("Недавние сообщения:").unwrap();
        let profile = out.find("Характер:").unwrap();
        let similar = out.find("Релевантные воспоминания:").unwrap();
        assert!(recent < profile && profile < similar);
    }

    #[tokio::test]
    async fn assemble_reads_all_sources() {
        let store = Arc::new(MessageStore::open_in_memory().unwrap());
        let profiles = ProfileEvolution::new(Arc::clone(&store));
        let window = RecencyWindow::new(10);
        let recall = SemanticRecall::new(
            Arc::new(HashEmbedder::default()),
            VectorIndex::default(),
            std::time::Duration::from_secs(1),
        );

        let e = event_at("Вася", "деплой сломался", Utc::now());
        window.push(Arc::clone(&e));
        recall.add(Arc::clone(&e)).await;
        profiles.update(&e).unwrap();

        let ctx = ContextAssembler::new(&window, &recall, &profiles)
            .assemble(1, "деплой сломался", 5, 3)
            .await
            .unwrap();
        assert!(ctx.contains("Недавние сообщения:"));
        assert!(ctx.contains("Вася (незнакомец, 1 сообщений)"));
        assert!(ctx.contains("Релевантные воспоминания:"));
    }
}
