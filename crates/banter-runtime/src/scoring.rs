//! Keyword heuristics shared by ingestion and the response policy.
//!
//! All matching is a case-insensitive substring test against fixed keyword
//! sets.  These are deliberately coarse classifiers; they only need to be
//! cheap and predictable.

use banter_types::Sentiment;

/// Tokens that address the engine directly.
pub const BOT_ADDRESS: &[&str] = &["бот", "bot", "димон", "@"];

/// Address tokens that raise importance; unlike [`BOT_ADDRESS`], no `@`.
pub const IMPORTANCE_ADDRESS: &[&str] = &["бот", "bot", "димон"];

/// Technical vocabulary that raises importance.
pub const IMPORTANCE_TECH: &[&str] = &["код", "программ", "баг", "сервер", "база", "api"];

/// Technical vocabulary.
pub const TECH_KEYWORDS: &[&str] = &[
    "код", "программ", "баг", "сервер", "база", "api", "фронт", "бэк", "js", "python",
];

/// Tokens that suggest the author is asking something.
pub const QUESTION_INDICATORS: &[&str] = &[
    "?", "как", "что", "где", "когда", "почему", "зачем", "можешь", "помоги",
];

pub const GREETINGS: &[&str] = &["привет", "здарова", "салам", "хай", "hello", "дарова"];

pub const POSITIVE_KEYWORDS: &[&str] = &[
    "круто", "отлично", "спасибо", "класс", "зачёт", "топ", "ржака", "смешно",
];

pub const NEGATIVE_KEYWORDS: &[&str] = &["плохо", "тупо", "бред", "отстой", "дерьмо", "говно"];

pub const HUMOR_MARKERS: &[&str] = &["хаха", "лол", "ржака"];

/// Baseline importance of any message.
pub const BASE_IMPORTANCE: f64 = 0.5;

/// `true` when `text` contains any of `keywords`, ignoring case.
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Number of characters (not bytes) in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Importance of a message in `[0.0, 1.0]`.
///
/// | Condition                      | Bonus |
/// |--------------------------------|-------|
/// | longer than 100 characters     | +0.2  |
/// | contains `?`                   | +0.1  |
/// | addresses the engine           | +0.3  |
/// | technical vocabulary           | +0.2  |
/// | carries an attachment          | +0.3  |
pub fn score_importance(text: &str, has_attachment: bool) -> f64 {
    let lower = text.to_lowercase();
    let mut score = BASE_IMPORTANCE;

    if char_len(text) > 100 {
        score += 0.2;
    }
    if lower.contains('?') {
        score += 0.1;
    }
    if IMPORTANCE_ADDRESS.iter().any(|k| lower.contains(k)) {
        score += 0.3;
    }
    if IMPORTANCE_TECH.iter().any(|k| lower.contains(k)) {
        score += 0.2;
    }
    if has_attachment {
        score += 0.3;
    }
    score.min(1.0)
}

/// Sentiment by the number of distinct keywords present on each side;
/// repeats do not count.  Ties (including no matches) are neutral.
pub fn score_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let positive = count_matches(&lower, POSITIVE_KEYWORDS);
    let negative = count_matches(&lower, NEGATIVE_KEYWORDS);

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

pub fn has_humor_marker(text: &str) -> bool {
    contains_any(text, HUMOR_MARKERS)
}

fn count_matches(lower: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| lower.contains(*k)).count()
}
