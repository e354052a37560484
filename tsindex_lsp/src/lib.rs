//! Language Server Protocol adapter for tsindex.
//!
//! Wires the core indexing pipeline and request handlers onto a
//! `tower-lsp` `Backend`.

use tower_lsp::{LspService, Server};

mod backend;
mod convert;

pub use backend::Backend;

/// Run the LSP server over stdio.
pub async fn run_server() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
