//! # pdfqa
//!
//! A PDF-grounded retrieval-augmented question answering server.
//!
//! pdfqa ingests PDF documents from a folder, chunks and embeds their text
//! into a persistent vector index, and answers questions over a websocket
//! channel by retrieving the most similar chunks and conditioning a
//! text-generation model on them. An HTTP endpoint accepts new PDF uploads
//! and extends the index incrementally.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────────┐   ┌───────────┐
//! │ PDF dir  │──▶│ Extract + Chunk │──▶│  SQLite    │
//! │ /upload  │   │    + Embed      │   │ vector idx │
//! └──────────┘   └─────────────────┘   └─────┬─────┘
//!                                            │ top-k
//!                    ┌───────────┐   ┌───────▼──────┐
//!       websocket ──▶│ QA engine │──▶│ LLM (Gemini  │
//!       question     │  (prompt) │   │  or Ollama)  │
//!                    └───────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pdfqa --config ./config/pdfqa.toml init    # build the index
//! pdfqa --config ./config/pdfqa.toml ask "what is chapter 2 about?"
//! pdfqa --config ./config/pdfqa.toml serve   # start the server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Persistent vector index (SQLite) |
//! | [`generate`] | Answer generator abstraction (Gemini / Ollama) |
//! | [`ingest`] | Index build and incremental update pipeline |
//! | [`qa`] | Retrieval-augmented QA orchestration |
//! | [`server`] | HTTP upload endpoint + websocket question channel |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod models;
pub mod qa;
pub mod server;
pub mod store;
