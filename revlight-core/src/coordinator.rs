//! Review coordinator: drives submit → poll → render for editor buffers
//!
//! Each buffer has at most one review sequence in flight. Starting a new one
//! (manual trigger or save) cancels the previous sequence for that buffer, and
//! a cancelled sequence never paints. Each buffer also owns its own
//! [`StyleRegistry`], created on first render and torn down by
//! [`ReviewCoordinator::close_buffer`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::{BufferId, EditorBuffer, NotifyLevel};
use crate::config::HighlightConfig;
use crate::render::{render, StyleRegistry};
use crate::{Error, FeedbackItem, Result, SubmissionId};

/// Remote service that reviews code asynchronously
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewBackend: Send + Sync {
    /// Send code for review, returning the backend's handle for it
    async fn submit(&self, code: &str) -> Result<SubmissionId>;

    /// Wait until feedback for `id` is ready
    ///
    /// Implementations must return [`Error::Cancelled`] promptly once
    /// `cancel` fires.
    async fn await_feedback(
        &self,
        id: SubmissionId,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedbackItem>>;
}

#[async_trait]
impl<T: ReviewBackend + ?Sized> ReviewBackend for Arc<T> {
    async fn submit(&self, code: &str) -> Result<SubmissionId> {
        (**self).submit(code).await
    }

    async fn await_feedback(
        &self,
        id: SubmissionId,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedbackItem>> {
        (**self).await_feedback(id, cancel).await
    }
}

/// Result of a completed review sequence
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// Backend handle of the submission
    pub submission_id: SubmissionId,
    /// Feedback returned by the backend
    pub feedback: Vec<FeedbackItem>,
    /// Number of highlights drawn on the buffer
    pub highlights: usize,
    /// When rendering finished
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Sequence {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct BufferState {
    sequence: Option<Sequence>,
    styles: StyleRegistry,
}

/// Coordinates review sequences across editor buffers
pub struct ReviewCoordinator<R> {
    backend: R,
    palette: HighlightConfig,
    buffers: Mutex<HashMap<BufferId, BufferState>>,
    generations: AtomicU64,
}

impl<R> std::fmt::Debug for ReviewCoordinator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewCoordinator")
            .field("palette", &self.palette)
            .field(
                "buffers",
                &self.buffers.lock().map(|b| b.len()).unwrap_or_default(),
            )
            .finish_non_exhaustive()
    }
}

impl<R: ReviewBackend> ReviewCoordinator<R> {
    /// Create a coordinator using `backend` and default highlight colors
    pub fn new(backend: R) -> Self {
        Self::with_palette(backend, HighlightConfig::default())
    }

    /// Create a coordinator with custom highlight colors
    pub fn with_palette(backend: R, palette: HighlightConfig) -> Self {
        Self {
            backend,
            palette,
            buffers: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Get the backend
    pub fn backend(&self) -> &R {
        &self.backend
    }

    fn buffers(&self) -> MutexGuard<'_, HashMap<BufferId, BufferState>> {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Manual review command
    ///
    /// Submits the buffer's current text and paints the feedback. Failures are
    /// reported to the user through the buffer; nothing is returned.
    pub async fn trigger<B: EditorBuffer>(&self, buffer: &mut B) {
        let code = buffer.text();
        match self.review(buffer, code).await {
            Ok(outcome) => {
                debug!(
                    buffer = %buffer.id(),
                    submission_id = %outcome.submission_id,
                    highlights = outcome.highlights,
                    "Review sequence finished"
                );
            }
            Err(e) if e.is_cancelled() => {
                debug!(buffer = %buffer.id(), "Review sequence superseded");
            }
            Err(Error::EmptySubmission) => {
                buffer.notify(NotifyLevel::Warning, "Nothing to review: the document is empty");
            }
            Err(e) => {
                warn!(buffer = %buffer.id(), error = %e, "Review failed");
                buffer.notify(NotifyLevel::Error, &format!("Code review failed: {}", e));
            }
        }
    }

    /// Save hook
    ///
    /// Runs [`trigger`](Self::trigger) only when `saved` is the document shown
    /// in `buffer`.
    pub async fn on_save<B: EditorBuffer>(&self, saved: &BufferId, buffer: &mut B) {
        if buffer.id() != *saved {
            debug!(saved = %saved, buffer = %buffer.id(), "Saved document is not the active buffer");
            return;
        }
        self.trigger(buffer).await;
    }

    /// Run one submit → poll → render sequence for `buffer`
    ///
    /// Any sequence already in flight for the same buffer is cancelled first,
    /// even when `code` is empty and nothing new is submitted.
    pub async fn review<B: EditorBuffer>(
        &self,
        buffer: &mut B,
        code: String,
    ) -> Result<ReviewOutcome> {
        let buffer_id = buffer.id();
        if code.is_empty() {
            self.cancel(&buffer_id);
            {
                let mut buffers = self.buffers();
                if let Some(state) = buffers.get_mut(&buffer_id) {
                    render(buffer, &mut state.styles, &[]);
                }
            }
            return Err(Error::EmptySubmission);
        }

        let (generation, cancel) = self.begin(&buffer_id);
        let result = self.run(buffer, &code, generation, &cancel).await;
        self.finish(&buffer_id, generation);
        result
    }

    async fn run<B: EditorBuffer>(
        &self,
        buffer: &mut B,
        code: &str,
        generation: u64,
        cancel: &CancellationToken,
    ) -> Result<ReviewOutcome> {
        let submission_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            id = self.backend.submit(code) => id?,
        };

        info!(buffer = %buffer.id(), submission_id = %submission_id, "Code submitted for review");
        buffer.notify(
            NotifyLevel::Info,
            &format!("Code submitted for review (ID: {})", submission_id),
        );

        let feedback = self.backend.await_feedback(submission_id, cancel).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let highlights = self.paint(buffer, generation, &feedback)?;

        info!(
            buffer = %buffer.id(),
            submission_id = %submission_id,
            items = feedback.len(),
            highlights,
            "Feedback rendered"
        );

        Ok(ReviewOutcome {
            submission_id,
            feedback,
            highlights,
            completed_at: Utc::now(),
        })
    }

    /// Render feedback if `generation` is still the buffer's current sequence
    fn paint<B: EditorBuffer>(
        &self,
        buffer: &mut B,
        generation: u64,
        feedback: &[FeedbackItem],
    ) -> Result<usize> {
        let mut buffers = self.buffers();
        let state = buffers
            .get_mut(&buffer.id())
            .filter(|state| {
                state
                    .sequence
                    .as_ref()
                    .is_some_and(|s| s.generation == generation)
            })
            .ok_or(Error::Cancelled)?;
        Ok(render(buffer, &mut state.styles, feedback))
    }

    fn begin(&self, buffer_id: &BufferId) -> (u64, CancellationToken) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();

        let mut buffers = self.buffers();
        let state = buffers
            .entry(buffer_id.clone())
            .or_insert_with(|| BufferState {
                sequence: None,
                styles: StyleRegistry::new(self.palette.clone()),
            });

        if let Some(previous) = state.sequence.replace(Sequence {
            generation,
            cancel: cancel.clone(),
        }) {
            debug!(
                buffer = %buffer_id,
                superseded = previous.generation,
                generation,
                "Cancelling in-flight review"
            );
            previous.cancel.cancel();
        }

        (generation, cancel)
    }

    fn finish(&self, buffer_id: &BufferId, generation: u64) {
        let mut buffers = self.buffers();
        if let Some(state) = buffers.get_mut(buffer_id) {
            if state
                .sequence
                .as_ref()
                .is_some_and(|s| s.generation == generation)
            {
                state.sequence = None;
            }
        }
    }

    /// Whether a review is in flight for the buffer
    pub fn is_reviewing(&self, buffer_id: &BufferId) -> bool {
        self.buffers()
            .get(buffer_id)
            .is_some_and(|state| state.sequence.is_some())
    }

    /// Cancel the in-flight review for a buffer, if any
    pub fn cancel(&self, buffer_id: &BufferId) -> bool {
        let mut buffers = self.buffers();
        match buffers.get_mut(buffer_id).and_then(|s| s.sequence.take()) {
            Some(sequence) => {
                sequence.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Tear down everything held for a buffer
    ///
    /// Cancels any in-flight review and removes the buffer's highlights if it
    /// is still open.
    pub fn close_buffer<B: EditorBuffer>(&self, buffer: &mut B) {
        let removed = self.buffers().remove(&buffer.id());
        if let Some(mut state) = removed {
            if let Some(sequence) = state.sequence.take() {
                sequence.cancel.cancel();
            }
            state.styles.clear(buffer);
            debug!(buffer = %buffer.id(), "Released buffer state");
        }
    }
}
