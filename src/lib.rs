//! Wikingest: streaming Wikipedia dump ingestion into a search index
//!
//! This crate turns a MediaWiki XML dump into one structured document per
//! article and writes those documents to an Elasticsearch-compatible index:
//!
//! 1. **Tokenizing** -- The dump (plain or BZ2) is read as a stream of element
//!    start, element end and text events; nothing larger than one page is held
//! 2. **Context tracking** -- An explicit stack of open elements decides which
//!    text belongs to the page title, the page id and the wikitext body
//! 3. **Line classification** -- Each body line becomes a redirect marker, short
//!    description, coordinates, category, markup noise or plain content
//! 4. **Assembly** -- Classified lines fold into a [`models::Document`];
//!    redirect pages produce nothing
//! 5. **Paced submission** -- Documents are written one at a time with a fixed
//!    cooldown every N writes, after a one-time index setup
//!
//! # Failure Model
//!
//! Only configuration problems and an unreadable dump stop a run. Index setup
//! failures and per-document write failures are logged and counted, and the
//! pipeline moves on to the next page. Malformed nesting in the dump is
//! tolerated without error.
//!
//! # Key Modules
//!
//! - [`parser`] -- Streaming XML tokenizer with BZ2 decompression
//! - [`context`] -- Element stack, per-page state and text accumulation
//! - [`classify`] -- Wikitext line classifier
//! - [`assemble`] -- Record assembly from classified lines
//! - [`pacer`] -- Index setup and throttled document submission
//! - [`store`] -- Search store trait and Elasticsearch HTTP client
//! - [`ingest`] -- Pipeline driver, cancellation and inspect mode
//! - [`checkpoint`] -- Resumable progress
//! - [`stats`] -- Run counters
//! - [`config`] -- Defaults and configuration records
//! - [`models`] -- Core data types
//!
//! # Example Usage
//!
//! ```bash
//! # Index a dump, pausing 3s after every 3000 documents
//! wikingest ingest -i enwiki-latest-pages-articles.xml.bz2 --mapping mapping.json
//!
//! # Print assembled documents as JSON lines without a search store
//! wikingest inspect -i enwiki-latest-pages-articles.xml.bz2 --limit 100
//! ```

pub mod assemble;
pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod context;
pub mod ingest;
pub mod models;
pub mod pacer;
pub mod parser;
pub mod stats;
pub mod store;
