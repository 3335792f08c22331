//! # Repository Lens
//!
//! Ask natural-language questions about an unknown source repository.
//!
//! Repository Lens never downloads a whole tree. It probes conventional
//! locations through a [`fetcher::ContentFetcher`], learns which paths hold
//! code, extracts comments, functions, exports, routes, jobs and text into an
//! in-memory knowledge store, and answers questions by keyword overlap with
//! optional model-assisted synthesis.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │   Fetchers   │──▶│   Explorer   │──▶│   Processor   │
//! │ GitHub/Local │   │  candidates  │   │ fetch+extract │
//! └──────────────┘   └──────────────┘   └───────┬───────┘
//!                                               ▼
//!                    ┌──────────────┐   ┌───────────────┐
//!                    │  Synthesizer │◀──│    Session    │
//!                    │ answer+visual│   │ store+search  │
//!                    └──────────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lens explore                         # scan and print statistics
//! lens search "subscription webhook"
//! lens ask "How do payments work?"
//! lens chat                            # one session, many questions
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed fetch and per-file errors |
//! | [`fetcher`] | Repository access abstraction |
//! | [`connector_github`] | GitHub contents API fetcher |
//! | [`connector_fs`] | Local checkout fetcher |
//! | [`filter`] | Source, exclusion and interest path rules |
//! | [`explorer`] | Candidate path exploration |
//! | [`processor`] | File and module processing |
//! | [`extract`] | Pluggable content extraction |
//! | [`keywords`] | Keyword derivation |
//! | [`entry`] | Knowledge entry construction |
//! | [`store`] | In-memory knowledge store |
//! | [`search`] | Keyword-overlap scoring |
//! | [`session`] | Session state and lifecycle |
//! | [`fallback`] | Built-in sample dataset |
//! | [`generation`] | Answer generation providers |
//! | [`answer`] | Answer synthesis |
//! | [`visual`] | Diagram suggestions |
//! | [`history`] | Version-control author and date lookup |
//! | [`progress`] | Scan progress snapshot and reporters |
//! | [`stats`] | Session statistics output |

pub mod answer;
pub mod config;
pub mod connector_fs;
pub mod connector_github;
pub mod entry;
pub mod error;
pub mod explorer;
pub mod extract;
pub mod fallback;
pub mod fetcher;
pub mod filter;
pub mod generation;
pub mod history;
pub mod keywords;
pub mod models;
pub mod processor;
pub mod progress;
pub mod search;
pub mod session;
pub mod stats;
pub mod store;
pub mod visual;
