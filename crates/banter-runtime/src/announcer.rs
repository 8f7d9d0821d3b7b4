//! Scheduled Announcer.
//!
//! Two daily slots (morning and evening), each with a one-hour window that
//! starts at a configured local time.  A slot fires at most once per calendar
//! day, only on weekdays (Mon–Fri).  State is the last local date a slot was
//! sent, so it resets implicitly at local midnight and is lost on restart.
//!
//! ```text
//!   pending-today ──(weekday ∧ in window ∧ date ≠ last_sent)──▶ sent-today
//!        ▲                                                          │
//!        └──────────────────── next local date ─────────────────────┘
//! ```
//!
//! A slot is marked sent as soon as it fires.  If generation fails the
//! canned message for that slot and weekday goes out instead, so a failing
//! model never causes repeated attempts within the same window.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Weekday};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::inference::InferencePool;
use crate::llm_driver::InferenceRequest;
use crate::prompt::PERSONA;

/// Which daily announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Morning,
    Evening,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Evening => "evening",
        }
    }
}

/// A produced announcement, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub slot: Slot,
    pub text: String,
    /// `false` when the canned fallback was used.
    pub generated: bool,
}

/// Parse a `"HH:MM"` slot start.
pub fn parse_slot_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

#[derive(Debug, Default)]
struct SlotState {
    last_morning: Option<NaiveDate>,
    last_evening: Option<NaiveDate>,
}

pub struct Announcer {
    clock: Arc<dyn Clock>,
    morning_start: NaiveTime,
    evening_start: NaiveTime,
    max_tokens: u32,
    state: Mutex<SlotState>,
}

impl Announcer {
    pub fn new(clock: Arc<dyn Clock>, morning_start: NaiveTime, evening_start: NaiveTime, max_tokens: u32) -> Self {
        Self {
            clock,
            morning_start,
            evening_start,
            max_tokens,
            state: Mutex::new(SlotState::default()),
        }
    }

    fn start_of(&self, slot: Slot) -> NaiveTime {
        match slot {
            Slot::Morning => self.morning_start,
            Slot::Evening => self.evening_start,
        }
    }

    /// Slots that fire at `now`; each returned slot is marked sent for the day.
    pub fn claim_due(&self, now: DateTime<FixedOffset>) -> Vec<Slot> {
        if !is_workday(now.weekday()) {
            return Vec::new();
        }
        let today = now.date_naive();
        let time = now.time();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let mut due = Vec::new();
        for slot in [Slot::Morning, Slot::Evening] {
            if !in_window(self.start_of(slot), time) {
                continue;
            }
            let last = match slot {
                Slot::Morning => &mut state.last_morning,
                Slot::Evening => &mut state.last_evening,
            };
            if *last != Some(today) {
                *last = Some(today);
                due.push(slot);
            }
        }
        due
    }

    /// Fire any due slot, generating its text through `pool`.
    pub async fn tick(&self, pool: &InferencePool) -> Vec<Announcement> {
        let now = self.clock.now();
        let mut out = Vec::new();
        for slot in self.claim_due(now) {
            let weekday = now.weekday();
            let request = InferenceRequest::new(PERSONA, slot_prompt(slot, weekday), self.max_tokens);
            let announcement = match pool.try_generate(&request).await {
                Ok(text) => Announcement {
                    slot,
                    text,
                    generated: true,
                },
                Err(e) => {
                    warn!(slot = slot.as_str(), error = %e, "announcement generation failed, using canned text");
                    Announcement {
                        slot,
                        text: canned_announcement(slot, weekday).to_string(),
                        generated: false,
                    }
                }
            };
            info!(slot = slot.as_str(), generated = announcement.generated, "announcement ready");
            out.push(announcement);
        }
        out
    }
}

fn is_workday(day: Weekday) -> bool {
    day.num_days_from_monday() < 5
}

/// `start <= time < start + 1h`, never wrapping past midnight.
fn in_window(start: NaiveTime, time: NaiveTime) -> bool {
    let start_secs = start.num_seconds_from_midnight();
    let secs = time.num_seconds_from_midnight();
    secs >= start_secs && secs < start_secs + 3600
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "понедельник",
        Weekday::Tue => "вторник",
        Weekday::Wed => "среда",
        Weekday::Thu => "четверг",
        Weekday::Fri => "пятница",
        Weekday::Sat => "суббота",
        Weekday::Sun => "воскресенье",
    }
}

/// Generation prompt for `slot` on `day`; Friday gets its own wording.
pub fn slot_prompt(slot: Slot, day: Weekday) -> String {
    match (slot, day) {
        (Slot::Morning, Weekday::Fri) => "\
Ты Димон, работаешь удалённо в команде. Сегодня пятница, утро.
Напиши пятничное приветствие команде в рабочий чат.
Стиль: по-пацански, но без мата; порадуйся пятнице и близким выходным; 1-2 предложения, можно смайлик."
            .to_string(),
        (Slot::Morning, day) => format!(
            "Ты Димон, работаешь удалённо в команде. Сегодня {}, утро.
Напиши обычное утреннее приветствие команде в рабочий чат.
Стиль: по-пацански, но корректно; настрой на рабочий день; 1-2 предложения.",
            day_name(day)
        ),
        (Slot::Evening, Weekday::Fri) => "\
Ты Димон, работаешь удалённо в команде. Сегодня пятница, рабочий день закончен.
Напиши пятничное прощание команде в рабочий чат.
Стиль: по-пацански, но корректно; радость от выходных и пожелание хорошо отдохнуть; 1-2 предложения."
            .to_string(),
        (Slot::Evening, _) => "\
Ты Димон, работаешь удалённо в команде. Сегодня будний день, рабочий день закончен.
Напиши обычное вечернее прощание команде до завтра.
Стиль: по-пацански, но корректно; пожелай хорошего вечера; 1-2 предложения."
            .to_string(),
    }
}

/// Fixed text sent when generation fails.
pub fn canned_announcement(slot: Slot, day: Weekday) -> &'static str {
    match (slot, day == Weekday::Fri) {
        (Slot::Morning, true) => "Салам пацаны! Пятничка подъехала, скоро на выходные 🔥",
        (Slot::Morning, false) => "Доброе утро, команда! Погнали работать 💪",
        (Slot::Evening, true) => "Всё, пацаны, выходные! Отдыхайте нормально 🍻",
        (Slot::Evening, false) => "До завтра, команда! Хорошего вечера 👋",
    }
}
