//! External collaborator interfaces and clients
//!
//! The engine consumes five collaborators, all modeled as injected trait
//! objects so callers can supply production clients or test doubles:
//! - Embedding provider (text -> vector)
//! - Vector store (nearest-neighbor lookup with a similarity floor)
//! - Keyword store (literal match in native relevance order)
//! - Rerank provider (LLM relevance judgment, 0-100 per record)
//! - Cache store (key/value with per-entry expiry)
//!
//! OpenAI-compatible HTTP clients are provided for the embedding and
//! rerank providers; the stores are backed by whatever the host system
//! uses (pgvector, SQL `ILIKE`, ...).

mod http;
mod traits;

pub use http::*;
pub use traits::*;
