//! [`ReviewBackend`] implementation over HTTP

use async_trait::async_trait;
use revlight_core::{FeedbackItem, ReviewBackend, SubmissionId};
use tokio_util::sync::CancellationToken;

use crate::ReviewClient;

#[async_trait]
impl ReviewBackend for ReviewClient {
    async fn submit(&self, code: &str) -> revlight_core::Result<SubmissionId> {
        Ok(self.submit_code(code).await?)
    }

    async fn await_feedback(
        &self,
        id: SubmissionId,
        cancel: &CancellationToken,
    ) -> revlight_core::Result<Vec<FeedbackItem>> {
        Ok(self.wait_for_feedback(id, cancel).await?)
    }
}
