//! Daily tarot fortunes over HTTP.
//!
//! Given a card and its orientation, the service looks up the closest texts in
//! a small reference corpus and asks a hosted LLM for a warm four-part reading
//! (overall fortune, work/study, relationships, closing encouragement) in
//! Traditional Chinese.
//!
//! # Architecture
//!
//! - **Corpus**: hand-written texts, one per card and orientation
//! - **Index**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec),
//!   built offline by `tarot build-index` and opened read-only by the server
//! - **Embeddings**: Gemini, any OpenAI-compatible endpoint, or a local
//!   all-MiniLM-L6-v2 ONNX model
//! - **Generation**: Gemini or any OpenAI-compatible chat endpoint
//! - **HTTP**: axum; `GET /`, `GET /health`, `POST /api/tarot`
//!
//! # Modules
//!
//! - [`config`]: TOML config file plus environment overrides and credentials
//! - [`corpus`]: orientation, reference entries, queries and readings
//! - [`index`]: build and search the similarity index
//! - [`embedding`]: text-to-vector providers
//! - [`generation`]: LLM answer providers
//! - [`pipeline`]: retrieval + prompt + generation for one reading
//! - [`remote`]: shared HTTP client and base URLs for hosted providers
//! - [`server`]: axum router, handlers and startup readiness

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod pipeline;
pub mod remote;
pub mod server;
