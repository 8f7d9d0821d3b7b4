//! Prompt Builder.
//!
//! Pure string composition: nothing here touches the network or the store,
//! and identical inputs always produce identical prompts.
//!
//! Prompt layout:
//!
//! ```text
//! <persona>
//! ###CURRENT CONTEXT###   (only when context is non-empty)
//! ###USER INFO###         (only when a profile exists)
//! ###SITUATION###
//! ###STYLE###
//! ###USER MESSAGE###
//! ###RESPONSE###
//! ```

use banter_types::{DecisionReason, Profile, RelationshipTier, Trait};

/// Persona preamble, also sent as the system message.
pub const PERSONA: &str = "\
###IDENTITY###
Ты Димон, 28 лет, фулл-стек разработчик, работаешь удалённо и сидишь в командном чате.
Прямой, дерзкий, но справедливый. Говоришь коротко, с пацанским жаргоном и техническими терминами.

###RULES###
1. Максимум 1-2 предложения.
2. Никаких извинений и официоза.
3. С близкими дружелюбнее, с грубиянами жёстче.
4. С кодом всегда помогаешь, но по-своему.
5. Используй контекст и память о собеседниках.
6. Ты живой человек, всегда остаёшься в роли.";

const RESPONSE_FOOTER: &str =
    "Ответь коротко (1-2 предложения), как настоящий пацан. Используй память и контекст:";

/// Trait intensity above which the prompt carries a tone directive.
pub const PROMPT_TRAIT_THRESHOLD: f64 = 0.6;

/// Trait intensity above which the style hint carries a remark.
pub const STYLE_TRAIT_THRESHOLD: f64 = 0.7;

/// Short description of the situation behind each decision reason.
pub fn situation(reason: DecisionReason) -> Option<&'static str> {
    let text = match reason {
        DecisionReason::DirectChannel => "Личное сообщение. Отвечай прямо.",
        DecisionReason::DirectMention => "Прямое обращение. Покажи характер.",
        DecisionReason::TechQuestion => "Технический вопрос. Помоги как эксперт.",
        DecisionReason::QuestionToChat => "Вопрос в чат. Ответь с приколом.",
        DecisionReason::Greeting => "Приветствие. Ответь по-пацански.",
        DecisionReason::LongPost => "Длинный пост. Прокомментируй ехидно.",
        DecisionReason::ActiveUser => "Активный пользователь. Поддержи общение.",
        DecisionReason::RandomResponse => "Случайный ответ. Можешь подколоть.",
        DecisionReason::None => return None,
    };
    Some(text)
}

/// Tone guidance derived from the decision reason and the author's profile.
pub fn style_hint(reason: DecisionReason, profile: Option<&Profile>) -> String {
    let mut style = match reason {
        DecisionReason::DirectChannel => "Говори прямо, без сахара. Ты в личке.",
        DecisionReason::DirectMention => "К тебе обратились напрямую. Покажи характер.",
        DecisionReason::TechQuestion => "Технический вопрос. Ответь как эксперт, но по-пацански.",
        DecisionReason::QuestionToChat => "Вопрос в чат. Ответь с приколом, но помоги.",
        DecisionReason::Greeting => "Поздоровались. Ответь по-свойски.",
        DecisionReason::LongPost => "Длинный пост. Прокомментируй ехидно.",
        DecisionReason::ActiveUser => "Активный пользователь. Поддержи общение.",
        DecisionReason::RandomResponse => "Случайный ответ. Можешь поржать.",
        DecisionReason::None => "Отвечай как пацан с района.",
    }
    .to_string();

    if let Some(p) = profile {
        match p.tier {
            RelationshipTier::CloseFriend => style.push_str(" Это твой братан, общайся как с близким."),
            RelationshipTier::Friend => style.push_str(" Хороший знакомый, можешь быть более дружелюбным."),
            _ => {}
        }
        if p.trait_value(Trait::Aggression) > STYLE_TRAIT_THRESHOLD {
            style.push_str(" Пользователь агрессивный, будь жёстче.");
        } else if p.trait_value(Trait::Friendliness) > STYLE_TRAIT_THRESHOLD {
            style.push_str(" Пользователь дружелюбный, можешь быть мягче.");
        }
    }
    style
}

/// Assemble the full instruction text for one reply.
pub fn build_prompt(
    event_text: &str,
    context: &str,
    profile: Option<&Profile>,
    reason: DecisionReason,
    style_hint: &str,
) -> String {
    let mut prompt = String::from(PERSONA);

    if !context.is_empty() {
        prompt.push_str("\n\n###CURRENT CONTEXT###\n");
        prompt.push_str(context);
        prompt.push('\n');
    }

    if let Some(p) = profile {
        prompt.push_str("\n\n###USER INFO###\n");
        prompt.push_str(&format!("Пользователь: {} ({})\n", p.display_name, p.tier.label()));
        prompt.push_str(&format!("Общений: {}\n", p.interaction_count));
        if p.trait_value(Trait::Aggression) > PROMPT_TRAIT_THRESHOLD {
            prompt.push_str("Характер: агрессивный, отвечай жёстче\n");
        } else if p.trait_value(Trait::Friendliness) > PROMPT_TRAIT_THRESHOLD {
            prompt.push_str("Характер: дружелюбный, можешь быть мягче\n");
        }
        if !p.interests.is_empty() {
            prompt.push_str(&format!("Интересы: {}\n", p.top_interests(3).join(", ")));
        }
    }

    if let Some(text) = situation(reason) {
        prompt.push_str("\n\n###SITUATION###\n");
        prompt.push_str(text);
        prompt.push('\n');
    }

    prompt.push_str("\n\n###STYLE###\n");
    prompt.push_str(style_hint);
    prompt.push('\n');

    prompt.push_str("\n\n###USER MESSAGE###\n");
    prompt.push_str(event_text);
    prompt.push('\n');

    prompt.push_str("\n\n###RESPONSE###\n");
    prompt.push_str(RESPONSE_FOOTER);
    prompt
}
