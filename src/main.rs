use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;

use ragbot::core::config::AppPaths;
use ragbot::core::logging;
use ragbot::repl::run_repl;
use ragbot::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::load(paths)
        .await
        .context("Failed to start RAGbot")?;

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_repl(state.pipeline.as_ref(), stdin, stdout)
        .await
        .context("Console I/O failed")?;

    tracing::info!("Session ended");
    Ok(())
}
