//! Response Decision Policy.
//!
//! Decides whether an event deserves a reply and why.  Rules are evaluated in
//! a fixed precedence order and the first match wins:
//!
//! | # | Condition                                   | Reason             |
//! |---|---------------------------------------------|--------------------|
//! | 1 | one-to-one conversation                     | `direct_channel`   |
//! | 2 | bot-address keyword                         | `direct_mention`   |
//! | 3 | technical keyword                           | `tech_question`    |
//! | 4 | question indicator                          | `question_to_chat` |
//! | 5 | greeting                                    | `greeting`         |
//! | 6 | longer than 200 characters                  | `long_post`        |
//! | 7 | > 10 interactions, draw < 0.15 + tier bonus | `active_user`      |
//! | 8 | draw < 0.08 + tier bonus                    | `random_response`  |
//!
//! Rules 7 and 8 each consume their own draw from the injected
//! [`RandomSource`], so a failed rule 7 still gets a fresh chance at rule 8.

use banter_types::{Decision, DecisionReason, Event, Profile};

use crate::scoring::{BOT_ADDRESS, GREETINGS, QUESTION_INDICATORS, TECH_KEYWORDS, char_len, contains_any};

/// Texts longer than this (in characters) always get a reply.
pub const LONG_POST_CHARS: usize = 200;

/// Interaction count above which an author is considered active.
pub const ACTIVE_USER_INTERACTIONS: u64 = 10;

pub const ACTIVE_USER_PROBABILITY: f64 = 0.15;
pub const RANDOM_RESPONSE_PROBABILITY: f64 = 0.08;

/// Uniform `[0, 1)` source, injected so tests can pin outcomes.
pub trait RandomSource: Send + Sync {
    fn draw(&self) -> f64;
}

/// Thread-local generator backed by `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Apply the precedence rules to `event`.
pub fn decide(event: &Event, profile: Option<&Profile>, is_direct: bool, random: &dyn RandomSource) -> Decision {
    if is_direct {
        return Decision::respond(DecisionReason::DirectChannel);
    }

    let text = event.text.as_str();
    if contains_any(text, BOT_ADDRESS) {
        return Decision::respond(DecisionReason::DirectMention);
    }
    if contains_any(text, TECH_KEYWORDS) {
        return Decision::respond(DecisionReason::TechQuestion);
    }
    if contains_any(text, QUESTION_INDICATORS) {
        return Decision::respond(DecisionReason::QuestionToChat);
    }
    if contains_any(text, GREETINGS) {
        return Decision::respond(DecisionReason::Greeting);
    }
    if char_len(text) > LONG_POST_CHARS {
        return Decision::respond(DecisionReason::LongPost);
    }

    let bonus = profile.map(|p| p.tier.reply_bonus()).unwrap_or(0.0);

    let active = profile.is_some_and(|p| p.interaction_count > ACTIVE_USER_INTERACTIONS);
    if active && random.draw() < ACTIVE_USER_PROBABILITY + bonus {
        return Decision::respond(DecisionReason::ActiveUser);
    }
    if random.draw() < RANDOM_RESPONSE_PROBABILITY + bonus {
        return Decision::respond(DecisionReason::RandomResponse);
    }
    Decision::silent()
}
