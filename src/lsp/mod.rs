//! LSP Protocol Implementation
//!
//! Thin front-end: every open document gets its own validation worker,
//! whose results are published as LSP diagnostics.

pub mod backend;
pub mod document;
pub mod server;
pub mod sink;

pub use backend::Backend;
pub use document::DocumentStore;
pub use sink::LspSink;
