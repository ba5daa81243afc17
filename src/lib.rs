//! # Finsight
//!
//! A finance-insight chat assistant grounded in a personal knowledge base of
//! analyzed YouTube videos stored in a Google spreadsheet, with answers
//! generated by the Gemini API.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌─────────┐
//! │  Sheets   │──▶│  Keyword  │──▶│  Context  │──▶│ Gemini  │
//! │  (cache)  │   │  filter   │   │  block    │   │  API    │
//! └───────────┘   └───────────┘   └───────────┘   └────┬────┘
//!                                                      │
//!                                    ┌─────────────────┤
//!                                    ▼                 ▼
//!                               ┌─────────┐      ┌──────────┐
//!                               │   CLI   │      │   HTTP   │
//!                               │(finsight)│     │  (chat)  │
//!                               └─────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export SHEETS_API_TOKEN=...       # OAuth bearer token for the Sheets API
//! export GOOGLE_API_KEY=...         # Gemini API key
//! finsight ask "What is the outlook for the won-dollar rate?"
//! finsight append --file analyses.json
//! finsight serve                    # start the web chat surface
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | The [`models::Record`] schema and JSON paste parsing |
//! | [`sheets`] | Spreadsheet service client (read, append, header repair) |
//! | [`cache`] | TTL-memoized sheet snapshot |
//! | [`search`] | Keyword filter with recent-N fallback |
//! | [`prompt`] | Context block formatting and prompt templates |
//! | [`genai`] | Gemini completion client |
//! | [`chat`] | Ask/critique orchestration and session state |
//! | [`server`] | HTTP chat surface |

pub mod cache;
pub mod chat;
pub mod config;
pub mod genai;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod search;
pub mod server;
pub mod sheets;
