//! `banter-types` – shared vocabulary of the conversational memory engine.
//!
//! Every crate in the workspace speaks in terms of these types: the raw
//! [`InboundMessage`] handed over by a messaging gateway, the immutable
//! [`Event`] produced by ingestion, the evolving per-author [`Profile`], and
//! the [`Decision`] explaining why the engine chose to answer (or not).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a message author as assigned by the messaging gateway.
pub type AuthorId = i64;

/// Interest tag recorded for authors who share attachments.
pub const MEDIA_INTEREST_TAG: &str = "мемы";

/// Starting intensity of every personality trait.
pub const INITIAL_TRAIT_INTENSITY: f64 = 0.5;

// ─────────────────────────────────────────────────────────────────────────────
// Sentiment
// ─────────────────────────────────────────────────────────────────────────────

/// Coarse keyword-derived tone of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RelationshipTier
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered familiarity level derived purely from an author's interaction count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipTier {
    #[default]
    Stranger,
    Acquaintance,
    Friend,
    CloseFriend,
}

impl RelationshipTier {
    /// Every tier, lowest first.
    pub const ALL: [RelationshipTier; 4] = [
        RelationshipTier::Stranger,
        RelationshipTier::Acquaintance,
        RelationshipTier::Friend,
        RelationshipTier::CloseFriend,
    ];

    /// Map an interaction count onto its tier (`>50`, `>20`, `>5`).
    pub fn from_interactions(count: u64) -> Self {
        if count > 50 {
            RelationshipTier::CloseFriend
        } else if count > 20 {
            RelationshipTier::Friend
        } else if count > 5 {
            RelationshipTier::Acquaintance
        } else {
            RelationshipTier::Stranger
        }
    }

    /// Extra probability added to the randomised reply branches.
    pub fn reply_bonus(&self) -> f64 {
        match self {
            RelationshipTier::CloseFriend => 0.3,
            RelationshipTier::Friend => 0.2,
            RelationshipTier::Acquaintance => 0.1,
            RelationshipTier::Stranger => 0.0,
        }
    }

    /// Multiplier applied to the base per-author reply cooldown.
    pub fn cooldown_factor(&self) -> f64 {
        match self {
            RelationshipTier::CloseFriend => 0.5,
            RelationshipTier::Friend => 0.7,
            _ => 1.0,
        }
    }

    /// Stable identifier used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipTier::Stranger => "stranger",
            RelationshipTier::Acquaintance => "acquaintance",
            RelationshipTier::Friend => "friend",
            RelationshipTier::CloseFriend => "close_friend",
        }
    }

    /// How the persona refers to this tier inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipTier::Stranger => "незнакомец",
            RelationshipTier::Acquaintance => "знакомый",
            RelationshipTier::Friend => "приятель",
            RelationshipTier::CloseFriend => "братан",
        }
    }
}

impl fmt::Display for RelationshipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Personality traits
// ─────────────────────────────────────────────────────────────────────────────

/// Named behavioural trait tracked per author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    Aggression,
    Friendliness,
    Humor,
}

impl Trait {
    pub const ALL: [Trait; 3] = [Trait::Aggression, Trait::Friendliness, Trait::Humor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trait::Aggression => "aggression",
            Trait::Friendliness => "friendliness",
            Trait::Humor => "humor",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InboundMessage
// ─────────────────────────────────────────────────────────────────────────────

/// A message as delivered by the messaging gateway, before any derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub author_id: AuthorId,
    pub display_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub conversation_id: i64,
    /// Forum thread the message belongs to, when the platform has threads.
    pub thread_id: Option<i64>,
    pub sequence_id: i64,
    /// `true` for one-to-one conversations with the engine.
    pub is_direct: bool,
    pub reply_to: Option<String>,
    pub has_attachment: bool,
    pub attachment_description: Option<String>,
}

impl InboundMessage {
    /// A plain group-conversation text message stamped with the current time.
    pub fn new(author_id: AuthorId, display_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author_id,
            display_name: display_name.into(),
            text: text.into(),
            sent_at: Utc::now(),
            conversation_id: 0,
            thread_id: None,
            sequence_id: 0,
            is_direct: false,
            reply_to: None,
            has_attachment: false,
            attachment_description: None,
        }
    }

    pub fn direct(mut self) -> Self {
        self.is_direct = true;
        self
    }

    pub fn in_conversation(mut self, conversation_id: i64, thread_id: Option<i64>) -> Self {
        self.conversation_id = conversation_id;
        self.thread_id = thread_id;
        self
    }

    pub fn with_attachment(mut self, description: Option<String>) -> Self {
        self.has_attachment = true;
        self.attachment_description = description;
        self
    }

    pub fn sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = sent_at;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event
// ─────────────────────────────────────────────────────────────────────────────

/// One ingested message together with its derived sentiment and importance.
///
/// Built exactly once by the ingestion path and never mutated afterwards;
/// the in-memory structures share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub author_id: AuthorId,
    pub display_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: i64,
    pub sequence_id: i64,
    pub is_reply: bool,
    pub reply_to: Option<String>,
    pub sentiment: Sentiment,
    /// Always within `[0.0, 1.0]`.
    pub importance: f64,
    pub has_attachment: bool,
    pub attachment_description: Option<String>,
}

impl Event {
    /// Derive an event from an inbound message and its precomputed scores.
    pub fn from_inbound(inbound: &InboundMessage, sentiment: Sentiment, importance: f64) -> Self {
        Self {
            author_id: inbound.author_id,
            display_name: inbound.display_name.clone(),
            text: inbound.text.clone(),
            timestamp: inbound.sent_at,
            conversation_id: inbound.conversation_id,
            sequence_id: inbound.sequence_id,
            is_reply: inbound.reply_to.is_some(),
            reply_to: inbound.reply_to.clone(),
            sentiment,
            importance: importance.clamp(0.0, 1.0),
            has_attachment: inbound.has_attachment,
            attachment_description: inbound.attachment_description.clone(),
        }
    }

    /// Text fed to the embedding service: the message plus any attachment
    /// description.
    pub fn embedding_text(&self) -> String {
        match &self.attachment_description {
            Some(desc) if !desc.is_empty() => format!("{} [КАРТИНКА: {}]", self.text, desc),
            _ => self.text.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile
// ─────────────────────────────────────────────────────────────────────────────

/// Evolving behavioural summary of a single author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub author_id: AuthorId,
    /// Display name as of the most recent event.
    pub display_name: String,
    pub traits: BTreeMap<Trait, f64>,
    pub interests: Vec<String>,
    pub interaction_count: u64,
    pub last_seen: DateTime<Utc>,
    pub tier: RelationshipTier,
}

impl Profile {
    /// A fresh profile with neutral traits and no interactions.
    pub fn new(author_id: AuthorId, display_name: impl Into<String>, seen_at: DateTime<Utc>) -> Self {
        Self {
            author_id,
            display_name: display_name.into(),
            traits: Trait::ALL
                .iter()
                .map(|t| (*t, INITIAL_TRAIT_INTENSITY))
                .collect(),
            interests: Vec::new(),
            interaction_count: 0,
            last_seen: seen_at,
            tier: RelationshipTier::Stranger,
        }
    }

    /// Current intensity of `t`, or `0.0` if it was never recorded.
    pub fn trait_value(&self, t: Trait) -> f64 {
        self.traits.get(&t).copied().unwrap_or(0.0)
    }

    pub fn top_interests(&self, n: usize) -> &[String] {
        &self.interests[..self.interests.len().min(n)]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision
// ─────────────────────────────────────────────────────────────────────────────

/// Why the response policy did or did not trigger a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    DirectChannel,
    DirectMention,
    TechQuestion,
    QuestionToChat,
    Greeting,
    LongPost,
    ActiveUser,
    RandomResponse,
    None,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::DirectChannel => "direct_channel",
            DecisionReason::DirectMention => "direct_mention",
            DecisionReason::TechQuestion => "tech_question",
            DecisionReason::QuestionToChat => "question_to_chat",
            DecisionReason::Greeting => "greeting",
            DecisionReason::LongPost => "long_post",
            DecisionReason::ActiveUser => "active_user",
            DecisionReason::RandomResponse => "random_response",
            DecisionReason::None => "none",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the response policy for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub respond: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn respond(reason: DecisionReason) -> Self {
        Self { respond: true, reason }
    }

    pub fn silent() -> Self {
        Self {
            respond: false,
            reason: DecisionReason::None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures the engine surfaces to its callers.
///
/// External-service failures never appear here: they are recovered locally
/// with fallback values.
#[derive(Error, Debug)]
pub enum BanterError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds_match_bands() {
        assert_eq!(RelationshipTier::from_interactions(0), RelationshipTier::Stranger);
        assert_eq!(RelationshipTier::from_interactions(5), RelationshipTier::Stranger);
        assert_eq!(RelationshipTier::from_interactions(6), RelationshipTier::Acquaintance);
        assert_eq!(RelationshipTier::from_interactions(20), RelationshipTier::Acquaintance);
        assert_eq!(RelationshipTier::from_interactions(21), RelationshipTier::Friend);
        assert_eq!(RelationshipTier::from_interactions(50), RelationshipTier::Friend);
        assert_eq!(RelationshipTier::from_interactions(51), RelationshipTier::CloseFriend);
    }

    #[test]
    fn tier_never_decreases_as_count_grows() {
        let mut previous = RelationshipTier::from_interactions(0);
        for count in 1..200 {
            let tier = RelationshipTier::from_interactions(count);
            assert!(tier >= previous, "tier dropped at count {count}");
            previous = tier;
        }
    }

    #[test]
    fn tier_bonus_and_cooldown_follow_order() {
        assert_eq!(RelationshipTier::Stranger.reply_bonus(), 0.0);
        assert!((RelationshipTier::CloseFriend.reply_bonus() - 0.3).abs() < 1e-9);
        assert!((RelationshipTier::Friend.cooldown_factor() - 0.7).abs() < 1e-9);
        assert!((RelationshipTier::Acquaintance.cooldown_factor() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn new_profile_has_neutral_traits() {
        let p = Profile::new(7, "Вася", Utc::now());
        assert_eq!(p.traits.len(), 3);
        for t in Trait::ALL {
            assert!((p.trait_value(t) - INITIAL_TRAIT_INTENSITY).abs() < 1e-9);
        }
        assert_eq!(p.interaction_count, 0);
        assert_eq!(p.tier, RelationshipTier::Stranger);
    }

    #[test]
    fn traits_serialize_with_readable_keys() {
        let p = Profile::new(1, "a", Utc::now());
        let json = serde_json::to_string(&p.traits).unwrap();
        assert_eq!(json, r#"{"aggression":0.5,"friendliness":0.5,"humor":0.5}"#);
        let back: BTreeMap<Trait, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p.traits);
    }

    #[test]
    fn event_clamps_importance_and_tracks_reply() {
        let mut inbound = InboundMessage::new(1, "a", "text");
        inbound.reply_to = Some("b".into());
        let event = Event::from_inbound(&inbound, Sentiment::Neutral, 1.7);
        assert_eq!(event.importance, 1.0);
        assert!(event.is_reply);
    }

    #[test]
    fn embedding_text_includes_attachment_description() {
        let inbound = InboundMessage::new(1, "a", "смотри").with_attachment(Some("кот".into()));
        let event = Event::from_inbound(&inbound, Sentiment::Neutral, 0.5);
        assert_eq!(event.embedding_text(), "смотри [КАРТИНКА: кот]");

        let plain = Event::from_inbound(&InboundMessage::new(1, "a", "текст"), Sentiment::Neutral, 0.5);
        assert_eq!(plain.embedding_text(), "текст");
    }

    #[test]
    fn sentiment_parse_roundtrip() {
        for s in [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral] {
            assert_eq!(Sentiment::parse(s.as_str()), Some(s));
        }
        assert_eq!(Sentiment::parse("angry"), None);
    }

    #[test]
    fn banter_error_display() {
        let err = BanterError::Storage("disk full".into());
        assert!(err.to_string().contains("disk full"));
    }
}
