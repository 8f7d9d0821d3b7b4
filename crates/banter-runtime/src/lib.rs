//! `banter-runtime` – decision, generation and scheduling.
//!
//! # Modules
//!
//! - [`engine`] – [`Engine`][engine::Engine]: the explicitly constructed
//!   orchestrator wiring memory, policy, prompt building, inference and the
//!   announcer together.
//! - [`scoring`] – keyword heuristics for importance and sentiment.
//! - [`profile`] – [`ProfileEvolution`][profile::ProfileEvolution]: per-author
//!   profile updates under a per-author lock.
//! - [`context`] – [`ContextAssembler`][context::ContextAssembler]: the short
//!   context block preceding each prompt.
//! - [`decision`] – the precedence-ordered response policy with an injected
//!   [`RandomSource`][decision::RandomSource].
//! - [`prompt`] – persona, style hints and prompt composition.
//! - [`announcer`] – the morning/evening [`Announcer`][announcer::Announcer]
//!   state machine driven by a [`Clock`][clock::Clock].
//! - [`cooldown`] – [`CooldownGate`][cooldown::CooldownGate]: tier-aware
//!   per-author reply throttle.
//! - [`llm_driver`] / [`inference`] – OpenAI-compatible inference client and
//!   the semaphore-bounded, timed [`InferencePool`][inference::InferencePool].
//! - [`embedder`] / [`recall`] – embedding client and semantic recall over the
//!   vector index.
//! - [`gateway`] – the outbound [`MessagingGateway`][gateway::MessagingGateway]
//!   seam.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP export.

pub mod announcer;
pub mod clock;
pub mod context;
pub mod cooldown;
pub mod decision;
pub mod embedder;
pub mod engine;
pub mod gateway;
pub mod inference;
pub mod llm_driver;
pub mod profile;
pub mod prompt;
pub mod recall;
pub mod scoring;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use announcer::{Announcement, Announcer, Slot, parse_slot_time};
pub use clock::{Clock, FixedOffsetClock, ZonedClock, clock_for_timezone};
pub use decision::{RandomSource, ThreadRandom, decide};
pub use embedder::{EmbedError, EmbeddingService, HttpEmbedder};
pub use engine::{Engine, EngineConfig, EngineServices, Outcome, StatusSnapshot, SweepReport};
pub use gateway::{GatewayError, MessagingGateway, OutboundMessage};
pub use inference::InferencePool;
pub use llm_driver::{InferenceRequest, InferenceService, LlmDriver, LlmError};
pub use telemetry::{TracerProviderGuard, init_tracing};
