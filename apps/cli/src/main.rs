//! Draftmill CLI — turn AI-generated prose into structured CMS documents.
//!
//! Creates generation jobs, drives them through the pipeline, and inspects
//! job and document state in the local store.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
