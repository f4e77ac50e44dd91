//
// lib.rs
//
// Library crate: the analysis engine and the language server, shared by the
// binary, the integration tests and the benchmarks.
//

pub mod analysis;
pub mod backend;
pub mod completion_context;
pub mod config;
pub mod edit_notifier;
pub mod handlers;
pub mod namespace_insertion;
pub mod namespaces;
pub mod parser;
pub mod perf;
pub mod prefixes;
pub mod state;
pub mod token_index;
pub mod utf16;
pub mod workspace_index;
