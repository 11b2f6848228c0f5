//! # TCR Processor
//!
//! Event dispatch and aggregation engine for the token-curated registry
//! indexer.
//!
//! One ordered stream of contract log events is routed across six domain
//! sub-processors (registry governance, voting, parameter governance,
//! content registry, token, multisig), each of which decodes its events at
//! the family boundary, enforces idempotency and state-machine legality
//! against previously persisted aggregates, and projects the result
//! through the persistence ports.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Engine::process(&[Event])                   │
//! │                                              │
//! │  ┌────────┐   (kind, name)   ┌────────────┐  │
//! │  │ Router │ ───────────────► │ sub-       │  │
//! │  │  O(1)  │                  │ processor  │  │
//! │  └────────┘                  └─────┬──────┘  │
//! │                                    │ patches │
//! │                              ┌─────▼──────┐  │
//! │                              │ store ports│  │
//! │                              └────────────┘  │
//! │  registry events ──► publisher port          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Batch semantics are best-effort: a failing event is logged and skipped,
//! and the error of the last failure is returned once the whole batch has
//! been attempted.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod memory;
pub mod persistence;
pub mod processors;
pub mod publisher;
pub mod scraper;
pub mod watermark;

pub use engine::{BatchSummary, Engine, Router};
pub use error::{EngineError, ProcessorError};
pub use event::{Event, EventPayload, PayloadValue};
pub use persistence::{optional, StoreError};
pub use watermark::Watermark;
