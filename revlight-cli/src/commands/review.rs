//! Review command - submit a file once and print the annotated result

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use revlight_client::ReviewClient;
use revlight_core::{Config, ReviewCoordinator};

use crate::terminal::TerminalBuffer;

/// Arguments for the review command
#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// File to review
    #[arg(required = true)]
    pub file: PathBuf,

    /// Print the feedback as JSON instead of an annotated listing
    #[arg(long)]
    pub json: bool,
}

impl ReviewArgs {
    /// Execute the review command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let text = tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;

        if verbose {
            tracing::info!(
                file = %self.file.display(),
                backend = %config.backend.url,
                bytes = text.len(),
                "Starting review"
            );
        }

        let client = ReviewClient::from_config(config)?;
        let coordinator = ReviewCoordinator::with_palette(client, config.highlight.clone());
        let mut buffer = TerminalBuffer::open(&self.file, &text);

        let outcome = tokio::select! {
            outcome = coordinator.review(&mut buffer, text) => outcome?,
            _ = tokio::signal::ctrl_c() => anyhow::bail!("Interrupted"),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome.feedback)?);
        } else {
            buffer.print_report();
            println!(
                "Submission {} reviewed at {}",
                outcome.submission_id,
                outcome.completed_at.format("%H:%M:%S")
            );
        }

        Ok(())
    }
}
