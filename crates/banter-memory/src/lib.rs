//! `banter-memory` – The Knowledge Base.
//!
//! Long- and short-term memory of the conversational engine.
//!
//! # Modules
//!
//! - [`store`] – [`MessageStore`][store::MessageStore]: the durable SQLite
//!   message log plus one profile row per author.  Survives restarts and
//!   migrates stores created before attachment columns existed.
//! - [`vector`] – [`VectorIndex`][vector::VectorIndex]: a capacity-bounded,
//!   recency-biased dot-product similarity cache over embedded events.
//! - [`recency`] – [`RecencyWindow`][recency::RecencyWindow]: the bounded
//!   FIFO buffer of the most recent events.

pub mod recency;
pub mod store;
pub mod vector;

pub use recency::RecencyWindow;
pub use store::{MessageStore, StoreError};
pub use vector::VectorIndex;
