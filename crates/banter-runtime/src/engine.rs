//! [`Engine`] – the conversational memory engine.
//!
//! One explicitly constructed object owns every piece of state and is shared
//! by reference (usually behind an `Arc`) with every entry point.  Per
//! inbound message:
//!
//! 1. **Ingest** – score sentiment and importance, build the immutable
//!    [`Event`], push it into the [`RecencyWindow`], embed it into semantic
//!    recall, queue the durable write, and evolve the author's profile.
//! 2. **Throttle** – the author's [`CooldownGate`] must be open.
//! 3. **Decide** – [`decide`] picks whether to answer and why.
//! 4. **Generate** – assemble context, build the prompt, and run it through
//!    the bounded [`InferencePool`].  Failures become canned replies.
//!
//! The announcer and the retention sweep are driven by external timers via
//! [`Engine::announce`] and [`Engine::sweep`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use banter_memory::MessageStore;
//! use banter_runtime::engine::{Engine, EngineConfig, EngineServices};
//! use banter_runtime::{HttpEmbedder, LlmDriver, ThreadRandom, clock_for_timezone};
//! use banter_types::InboundMessage;
//!
//! # async fn demo() -> Result<(), banter_types::BanterError> {
//! let config = EngineConfig::default();
//! let services = EngineServices {
//!     store: Arc::new(MessageStore::open_in_memory().map_err(|e| banter_types::BanterError::Storage(e.to_string()))?),
//!     inference: Arc::new(LlmDriver::new("http://localhost:1234", "local-model")),
//!     embedder: Arc::new(HttpEmbedder::new("http://localhost:1234", "embedder")),
//!     random: Arc::new(ThreadRandom),
//!     clock: clock_for_timezone("Europe/Moscow"),
//! };
//! let engine = Engine::new(config, services);
//! let outcome = engine.handle(&InboundMessage::new(1, "Вася", "бот, привет")).await?;
//! println!("{:?}", outcome.reply);
//! # Ok(()) }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use banter_memory::{MessageStore, RecencyWindow, StoreError, VectorIndex};
use banter_types::{AuthorId, BanterError, Decision, DecisionReason, Event, InboundMessage, Profile, RelationshipTier};
use chrono::{NaiveTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::announcer::Announcer;
use crate::clock::Clock;
use crate::context::ContextAssembler;
use crate::cooldown::CooldownGate;
use crate::decision::{RandomSource, decide};
use crate::embedder::EmbeddingService;
use crate::gateway::{MessagingGateway, OutboundMessage};
use crate::inference::InferencePool;
use crate::llm_driver::{InferenceRequest, InferenceService};
use crate::profile::ProfileEvolution;
use crate::prompt::{PERSONA, build_prompt, style_hint};
use crate::recall::SemanticRecall;
use crate::scoring::{score_importance, score_sentiment};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables of the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Group conversation announcements go to.
    pub conversation_id: i64,
    /// Thread within the group conversation, when the platform has threads.
    pub thread_id: Option<i64>,
    /// Capacity of the recency window (and size of the warm start).
    pub context_window: usize,
    /// Recent entries shown in the reply context.
    pub recency_limit: usize,
    /// Recall hits shown in the reply context.
    pub similarity_limit: usize,
    pub max_tokens: u32,
    pub inference_timeout: Duration,
    pub embedding_timeout: Duration,
    /// Cap on simultaneous inference calls.
    pub max_parallel: usize,
    /// Base per-author reply interval.
    pub cooldown: Duration,
    /// Cooldown entries idle longer than this are pruned by the sweep.
    pub idle_horizon: Duration,
    pub retention_days: u32,
    pub vector_capacity: usize,
    pub similarity_threshold: f32,
    pub enable_schedule: bool,
    pub morning_start: NaiveTime,
    pub evening_start: NaiveTime,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            conversation_id: 0,
            thread_id: None,
            context_window: banter_memory::recency::DEFAULT_WINDOW,
            recency_limit: 5,
            similarity_limit: 3,
            max_tokens: 2048,
            inference_timeout: Duration::from_secs(45),
            embedding_timeout: Duration::from_secs(30),
            max_parallel: 4,
            cooldown: Duration::from_secs(2),
            idle_horizon: Duration::from_secs(7200),
            retention_days: 30,
            vector_capacity: banter_memory::vector::DEFAULT_CAPACITY,
            similarity_threshold: banter_memory::vector::DEFAULT_THRESHOLD,
            enable_schedule: true,
            morning_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            evening_start: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// External collaborators injected into the engine.
pub struct EngineServices {
    pub store: Arc<MessageStore>,
    pub inference: Arc<dyn InferenceService>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub random: Arc<dyn RandomSource>,
    pub clock: Arc<dyn Clock>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to one inbound message.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub event: Arc<Event>,
    /// Author profile after this event.
    pub profile: Profile,
    pub decision: Decision,
    /// `true` when the author's cooldown suppressed the decision.
    pub throttled: bool,
    pub reply: Option<String>,
}

/// Result of one retention sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub purged_events: usize,
    pub pruned_cooldowns: usize,
}

/// Point-in-time view of the in-memory state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub window_len: usize,
    pub window_capacity: usize,
    pub window_attachments: usize,
    pub indexed: usize,
    pub profiles: usize,
    pub active_last_hour: usize,
    pub tiers: BTreeMap<RelationshipTier, usize>,
    pub tracked_cooldowns: usize,
    pub pending_writes: usize,
}

fn storage(e: StoreError) -> BanterError {
    BanterError::Storage(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

pub struct Engine {
    config: EngineConfig,
    store: Arc<MessageStore>,
    window: RecencyWindow,
    recall: SemanticRecall,
    profiles: Arc<ProfileEvolution>,
    cooldown: CooldownGate,
    random: Arc<dyn RandomSource>,
    inference: InferencePool,
    announcer: Option<Announcer>,
    pending_writes: Mutex<JoinSet<()>>,
}

impl Engine {
    pub fn new(config: EngineConfig, services: EngineServices) -> Self {
        let index = VectorIndex::new(config.vector_capacity, config.similarity_threshold);
        let announcer = config.enable_schedule.then(|| {
            Announcer::new(
                services.clock,
                config.morning_start,
                config.evening_start,
                config.max_tokens,
            )
        });

        Self {
            window: RecencyWindow::new(config.context_window),
            recall: SemanticRecall::new(services.embedder, index, config.embedding_timeout),
            profiles: Arc::new(ProfileEvolution::new(Arc::clone(&services.store))),
            cooldown: CooldownGate::new(config.cooldown),
            random: services.random,
            inference: InferencePool::new(services.inference, config.max_parallel, config.inference_timeout),
            store: services.store,
            announcer,
            pending_writes: Mutex::new(JoinSet::new()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn pending(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.pending_writes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rebuild the in-memory structures from the store.
    ///
    /// Loads every stored profile and the most recent `context_window`
    /// events, which are pushed into the window and re-embedded for recall.
    pub async fn warm_start(&self) -> Result<usize, BanterError> {
        self.profiles.warm().map_err(storage)?;
        let events = self.store.load_recent(self.window.capacity()).map_err(storage)?;
        let loaded = events.len();
        for event in events {
            let event = Arc::new(event);
            self.window.push(Arc::clone(&event));
            self.recall.add(event).await;
        }
        info!(loaded, indexed = self.recall.len(), "warm start complete");
        Ok(loaded)
    }

    // ── Ingestion ────────────────────────────────────────────────────────────

    /// Turn `inbound` into an [`Event`] and feed every memory structure.
    ///
    /// Must be called exactly once per inbound message: the profile update
    /// counts interactions.
    pub async fn ingest(&self, inbound: &InboundMessage) -> Result<(Arc<Event>, Profile), BanterError> {
        let sentiment = score_sentiment(&inbound.text);
        let importance = score_importance(&inbound.text, inbound.has_attachment);
        let event = Arc::new(Event::from_inbound(inbound, sentiment, importance));
        debug!(
            author_id = event.author_id,
            sentiment = event.sentiment.as_str(),
            importance = event.importance,
            "event ingested"
        );

        self.window.push(Arc::clone(&event));
        let vector = self.recall.add(Arc::clone(&event)).await;
        self.persist_deferred(Arc::clone(&event), vector);

        let profiles = Arc::clone(&self.profiles);
        let observed = Arc::clone(&event);
        let profile = tokio::task::spawn_blocking(move || profiles.update(&observed))
            .await
            .map_err(|e| {
                error!(author_id = event.author_id, error = %e, "profile update task aborted");
                BanterError::Storage(e.to_string())
            })?
            .map_err(|e| {
                error!(author_id = event.author_id, error = %e, "profile update failed");
                storage(e)
            })?;
        Ok((event, profile))
    }

    /// Queue the durable write on the blocking pool.  Finished writes are
    /// reaped here; [`Engine::flush`] awaits the rest.
    fn persist_deferred(&self, event: Arc<Event>, vector: Option<Vec<f32>>) {
        let store = Arc::clone(&self.store);
        let mut pending = self.pending();
        while let Some(done) = pending.try_join_next() {
            if let Err(e) = done {
                error!(error = %e, "store write task aborted");
            }
        }
        pending.spawn_blocking(move || {
            if let Err(e) = store.append(&event, vector.as_deref()) {
                error!(author_id = event.author_id, error = %e, "failed to persist event");
            }
        });
    }

    /// Wait for every queued store write.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending());
        let mut flushed = 0usize;
        while let Some(done) = pending.join_next().await {
            match done {
                Ok(()) => flushed += 1,
                Err(e) => error!(error = %e, "store write task aborted"),
            }
        }
        debug!(flushed, "pending writes flushed");
    }

    // ── Reply path ───────────────────────────────────────────────────────────

    /// Ingest `inbound`, decide, and generate a reply when warranted.
    pub async fn handle(&self, inbound: &InboundMessage) -> Result<Outcome, BanterError> {
        let (event, profile) = self.ingest(inbound).await?;

        if !self.cooldown.try_acquire(event.author_id, profile.tier, Instant::now()) {
            debug!(author_id = event.author_id, "author cooling down");
            return Ok(Outcome {
                event,
                profile,
                decision: Decision::silent(),
                throttled: true,
                reply: None,
            });
        }

        let decision = decide(&event, Some(&profile), inbound.is_direct, self.random.as_ref());
        if !decision.respond {
            return Ok(Outcome {
                event,
                profile,
                decision,
                throttled: false,
                reply: None,
            });
        }

        info!(author_id = event.author_id, reason = %decision.reason, "responding");
        let reply = self.generate_reply(&event, &profile, decision.reason).await?;
        Ok(Outcome {
            event,
            profile,
            decision,
            throttled: false,
            reply: Some(reply),
        })
    }

    async fn generate_reply(&self, event: &Event, profile: &Profile, reason: DecisionReason) -> Result<String, BanterError> {
        let context = ContextAssembler::new(&self.window, &self.recall, &self.profiles)
            .assemble(
                event.author_id,
                &event.text,
                self.config.recency_limit,
                self.config.similarity_limit,
            )
            .await
            .map_err(storage)?;
        let style = style_hint(reason, Some(profile));
        let prompt = build_prompt(&event.text, &context, Some(profile), reason, &style);
        let request = InferenceRequest::new(PERSONA, prompt, self.config.max_tokens);
        Ok(self.inference.generate_or_fallback(&request).await)
    }

    /// [`handle`](Self::handle) and deliver any reply through `gateway`.
    pub async fn respond(&self, inbound: &InboundMessage, gateway: &dyn MessagingGateway) -> Result<Outcome, BanterError> {
        let outcome = self.handle(inbound).await?;
        if let Some(text) = &outcome.reply {
            let thread_id = if inbound.is_direct {
                inbound.thread_id
            } else {
                inbound.thread_id.or(self.config.thread_id)
            };
            gateway
                .send(OutboundMessage {
                    conversation_id: inbound.conversation_id,
                    thread_id,
                    reply_to_sequence: inbound.is_direct.then_some(inbound.sequence_id),
                    text: text.clone(),
                })
                .await
                .map_err(|e| BanterError::Gateway(e.to_string()))?;
        }
        Ok(outcome)
    }

    // ── Periodic jobs ────────────────────────────────────────────────────────

    /// Run one announcer tick and deliver whatever fired.
    pub async fn announce(&self, gateway: &dyn MessagingGateway) -> Result<usize, BanterError> {
        let Some(announcer) = &self.announcer else {
            return Ok(0);
        };
        let announcements = announcer.tick(&self.inference).await;
        let sent = announcements.len();
        for a in announcements {
            gateway
                .send(OutboundMessage {
                    conversation_id: self.config.conversation_id,
                    thread_id: self.config.thread_id,
                    reply_to_sequence: None,
                    text: a.text,
                })
                .await
                .map_err(|e| BanterError::Gateway(e.to_string()))?;
        }
        Ok(sent)
    }

    /// Purge events past the retention horizon and prune idle cooldowns.
    pub fn sweep(&self) -> Result<SweepReport, BanterError> {
        let purged_events = self
            .store
            .purge_older_than(self.config.retention_days)
            .map_err(storage)?;
        let pruned_cooldowns = self.cooldown.prune_idle(self.config.idle_horizon, Instant::now());
        let status = self.status();
        info!(
            purged_events,
            pruned_cooldowns,
            window = status.window_len,
            profiles = status.profiles,
            active_last_hour = status.active_last_hour,
            "sweep complete"
        );
        Ok(SweepReport {
            purged_events,
            pruned_cooldowns,
        })
    }

    // ── Introspection ────────────────────────────────────────────────────────

    pub fn status(&self) -> StatusSnapshot {
        let profiles = self.profiles.snapshot();
        let hour_ago = Utc::now() - chrono::Duration::hours(1);
        let mut tiers: BTreeMap<RelationshipTier, usize> =
            RelationshipTier::ALL.iter().map(|t| (*t, 0)).collect();
        for p in &profiles {
            *tiers.entry(p.tier).or_default() += 1;
        }
        StatusSnapshot {
            window_len: self.window.len(),
            window_capacity: self.window.capacity(),
            window_attachments: self.window.attachment_count(),
            indexed: self.recall.len(),
            profiles: profiles.len(),
            active_last_hour: profiles.iter().filter(|p| p.last_seen > hour_ago).count(),
            tiers,
            tracked_cooldowns: self.cooldown.tracked(),
            pending_writes: self.pending().len(),
        }
    }

    /// Stored events of `author_id`, newest first.
    pub fn author_history(&self, author_id: AuthorId, limit: usize) -> Result<Vec<Event>, BanterError> {
        self.store.recent_for_author(author_id, limit).map_err(|e| {
            warn!(author_id, error = %e, "history lookup failed");
            storage(e)
        })
    }

    pub fn profile(&self, author_id: AuthorId) -> Result<Option<Profile>, BanterError> {
        self.profiles.get(author_id).map_err(storage)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
