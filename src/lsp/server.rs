use anyhow::Result;
use tokio::io::{stdin, stdout};
use tower_lsp::{LspService, Server};

use crate::lsp::backend::Backend;
use crate::Config;

/// Start the LSP server on stdio
pub async fn serve(config: Config) -> Result<()> {
    log::info!(
        "Checking with {} (interval {:?}, warnings {})",
        config.interpreter.path.display(),
        config.interval,
        config.warnings
    );

    let (service, socket) = LspService::build(move |client| Backend::new(client, config)).finish();

    Server::new(stdin(), stdout(), socket).serve(service).await;

    Ok(())
}
