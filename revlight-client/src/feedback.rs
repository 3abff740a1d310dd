//! Feedback polling
//!
//! The backend answers `GET /get-feedback/{id}` with `"done"` and the feedback
//! once the review is finished, and with some other status (`"pending"`,
//! `"processing"`) before that. Waiting is bounded by the client's
//! [`PollPolicy`](revlight_core::PollPolicy) and stops as soon as the
//! cancellation token fires.

use std::time::Instant;

use crate::client::{check_status, read_json};
use crate::{Error, ReviewClient, Result};
use revlight_core::{parse_feedback, FeedbackItem, SubmissionId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Answer to a single feedback query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackStatus {
    /// Review not finished; carries the backend's status string
    Pending(String),
    /// Review finished
    Done(Vec<FeedbackItem>),
}

impl FeedbackStatus {
    /// Whether the review is finished
    pub fn is_done(&self) -> bool {
        matches!(self, FeedbackStatus::Done(_))
    }
}

impl ReviewClient {
    /// Query feedback status once
    pub async fn get_feedback(&self, id: SubmissionId) -> Result<FeedbackStatus> {
        let url = self.endpoint(&format!("get-feedback/{}", id))?;

        let response = self.http().get(url).send().await?;
        let body = read_json(check_status(response).await?).await?;

        parse_feedback_response(id, &body)
    }

    /// Poll until feedback for `id` is ready
    ///
    /// Returns the feedback from the first `"done"` answer. Any request or
    /// protocol error ends the loop immediately; only pending answers are
    /// retried.
    pub async fn wait_for_feedback(
        &self,
        id: SubmissionId,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedbackItem>> {
        let policy = self.poll_policy();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            attempt += 1;
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                status = self.get_feedback(id) => status?,
            };

            match status {
                FeedbackStatus::Done(items) => {
                    info!(submission_id = %id, attempt, items = items.len(), "Feedback ready");
                    return Ok(items);
                }
                FeedbackStatus::Pending(state) => {
                    debug!(submission_id = %id, attempt, state = %state, "Feedback pending");
                }
            }

            let elapsed = started.elapsed();
            if !policy.allows_another(attempt, elapsed) {
                return Err(Error::Timeout {
                    attempts: attempt,
                    elapsed,
                });
            }

            let delay = policy.delay_within(attempt, started.elapsed());
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn parse_feedback_response(id: SubmissionId, body: &Value) -> Result<FeedbackStatus> {
    let status = match body.get("status") {
        Some(Value::String(status)) => status.as_str(),
        Some(other) => {
            return Err(Error::Protocol(format!(
                "status is not a string: {}",
                other
            )))
        }
        None => return Err(Error::Protocol("response has no status".to_string())),
    };

    if status != "done" {
        return Ok(FeedbackStatus::Pending(status.to_string()));
    }

    if let Some(echoed) = body.get("submission_id").filter(|v| !v.is_null()) {
        if echoed.as_u64() != Some(id.get()) {
            return Err(Error::Protocol(format!(
                "feedback is for submission {}, expected {}",
                echoed, id
            )));
        }
    }

    let items = parse_feedback(body.get("feedback").unwrap_or(&Value::Null))?;
    Ok(FeedbackStatus::Done(items))
}
