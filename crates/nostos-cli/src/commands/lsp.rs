//! `nostos lsp`

use super::CliResult;

pub async fn run() -> CliResult {
    nostos_lsp::run_stdio().await.map_err(Into::into)
}
