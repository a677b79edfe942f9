//! # Concierge
//!
//! Retrieval-augmented question answering for a guesthouse CMS.
//!
//! Concierge indexes the localized page content and hotel listings the CMS
//! materializes into SQLite, embeds them into a vector store, and answers
//! visitor questions with a grounded chat-completion call. Embedding and
//! generation both carry fallbacks, so a single upstream outage never takes
//! the whole query path down.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ CMS content │──▶│   Indexer     │──▶│  Qdrant   │
//! │  (SQLite)   │   │ Flatten+Chunk│   │ (cosine)  │
//! └─────────────┘   │    +Embed    │   └────┬─────┘
//!                   └──────────────┘        │
//!                                           ▼
//!                   ┌──────────────┐   ┌──────────┐
//!                   │  Generator   │◀──│ Retrieval │◀── POST /ask
//!                   │ (chat model) │   │  (2-tier) │
//!                   └──────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! concierge init                  # create the content schema
//! concierge index                 # chunk + embed + upsert everything
//! concierge ask "Is there a sea view room?" --locale en
//! concierge serve                 # start the HTTP query server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and deterministic point ids |
//! | [`chunk`] | Content flattening and overlapping chunking |
//! | [`embedding`] | Local hashing embedder + remote provider fallback |
//! | [`store`] | Vector store trait, Qdrant client, in-memory backend |
//! | [`content`] | Reading CMS content into SourceDocuments |
//! | [`index`] | Offline batch indexing job |
//! | [`locale`] | Locale detection and canned per-locale messages |
//! | [`ask`] | Online retrieval orchestration |
//! | [`generate`] | Grounded answer generation with model-tier fallback |
//! | [`server`] | HTTP query server |

pub mod ask;
pub mod chunk;
pub mod config;
pub mod content;
pub mod db;
pub mod embedding;
pub mod generate;
pub mod index;
pub mod locale;
pub mod migrate;
pub mod models;
pub mod server;
pub mod store;
