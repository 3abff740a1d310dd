//! Watch command - review a file every time it is saved

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use clap::Args;
use revlight_client::ReviewClient;
use revlight_core::{Config, EditorBuffer, ReviewCoordinator};

use crate::terminal::TerminalBuffer;

/// Arguments for the watch command
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// File to watch
    #[arg(required = true)]
    pub file: PathBuf,

    /// How often to check the file for changes
    #[arg(long, default_value = "500ms", value_parser = humantime::parse_duration)]
    pub check_interval: Duration,

    /// Skip the review of the file's current contents on startup
    #[arg(long)]
    pub no_initial: bool,
}

impl WatchArgs {
    /// Execute the watch command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let text = read_file(&self.file).await?;
        let mut last_modified = modified(&self.file).await?;

        let client = ReviewClient::from_config(config)?;
        let coordinator = Arc::new(ReviewCoordinator::with_palette(
            client,
            config.highlight.clone(),
        ));
        let mut buffer = TerminalBuffer::open(&self.file, &text);
        let saved = buffer.id();

        println!(
            "Watching {} (Ctrl-C to stop)",
            self.file.display()
        );

        if !self.no_initial {
            spawn_review(&coordinator, &buffer);
        }

        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                _ = ticker.tick() => {}
            }

            let current = match modified(&self.file).await {
                Ok(current) => current,
                Err(e) => {
                    tracing::warn!(file = %self.file.display(), error = %e, "Cannot stat watched file");
                    continue;
                }
            };
            if current == last_modified {
                continue;
            }
            last_modified = current;

            match read_file(&self.file).await {
                Ok(text) => buffer.reload(&text),
                Err(e) => {
                    tracing::warn!(file = %self.file.display(), error = %e, "Cannot read watched file");
                    continue;
                }
            }

            if verbose {
                tracing::info!(file = %saved, "File saved, starting review");
            }
            spawn_review(&coordinator, &buffer);
        }

        coordinator.close_buffer(&mut buffer);
        buffer.close();
        println!("Stopped watching {}", self.file.display());
        Ok(())
    }
}

/// Run the save hook in the background so a newer save can supersede it
fn spawn_review(coordinator: &Arc<ReviewCoordinator<ReviewClient>>, buffer: &TerminalBuffer) {
    let coordinator = Arc::clone(coordinator);
    let mut handle = buffer.clone();
    let saved = handle.id();

    tokio::spawn(async move {
        coordinator.on_save(&saved, &mut handle).await;
        if handle.take_rendered() && !coordinator.is_reviewing(&saved) {
            handle.print_report();
        }
    });
}

async fn read_file(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn modified(path: &Path) -> anyhow::Result<SystemTime> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    Ok(metadata.modified()?)
}
