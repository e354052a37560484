//! Request Handlers (spec §4.10): the LSP-facing operations built on top of
//! [`crate::indexer::Indexer`]. Each handler owns its own state (e.g. the
//! definition handler's LRU) — per spec §5, "per-handler caches are not
//! shared".

pub mod definition;
pub mod hover;
pub mod references;
pub mod rename;
pub mod workspace_symbol;

pub use definition::DefinitionHandler;
pub use hover::hover;
pub use references::{find_references, Confidence as ReferenceConfidence};
pub use rename::{apply_rename, prepare_rename, PrepareRenameResult, TextEdit};
pub use workspace_symbol::workspace_symbol;
