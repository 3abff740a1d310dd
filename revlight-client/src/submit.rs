//! Code submission

use crate::client::{check_status, read_json};
use crate::{Error, ReviewClient, Result};
use revlight_core::SubmissionId;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Body of `POST /submit-code`
#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    code: &'a str,
}

impl ReviewClient {
    /// Submit code for review
    ///
    /// Makes a single attempt; failures are returned to the caller without
    /// retrying.
    pub async fn submit_code(&self, code: &str) -> Result<SubmissionId> {
        if code.is_empty() {
            return Err(Error::EmptySubmission);
        }

        let url = self.endpoint("submit-code")?;
        debug!(url = %url, bytes = code.len(), "Submitting code");

        let response = self
            .http()
            .post(url)
            .json(&SubmitRequest { code })
            .send()
            .await?;
        let body = read_json(check_status(response).await?).await?;

        let submission_id = parse_submission_id(&body)?;
        let status = body.get("status").and_then(Value::as_str).unwrap_or("unknown");
        info!(
            submission_id = %submission_id,
            status,
            "Code submitted"
        );

        Ok(submission_id)
    }
}

fn parse_submission_id(body: &Value) -> Result<SubmissionId> {
    match body.get("submission_id") {
        Some(Value::Number(n)) => n.as_u64().map(SubmissionId).ok_or_else(|| {
            Error::Protocol(format!("submission_id is not a non-negative integer: {}", n))
        }),
        Some(other) => Err(Error::Protocol(format!(
            "submission_id is not an integer: {}",
            other
        ))),
        None => Err(Error::Protocol(
            "response has no submission_id".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_submission_id() {
        let id = parse_submission_id(&json!({"submission_id": 12, "status": "queued"})).unwrap();
        assert_eq!(id, SubmissionId(12));
    }

    #[test]
    fn test_parse_submission_id_rejects_bad_values() {
        for body in [
            json!({}),
            json!({"submission_id": null}),
            json!({"submission_id": "12"}),
            json!({"submission_id": -1}),
            json!({"submission_id": 1.5}),
            json!([12]),
        ] {
            let err = parse_submission_id(&body).unwrap_err();
            assert!(matches!(err, Error::Protocol(_)), "{}", body);
        }
    }

    #[tokio::test]
    async fn test_submit_empty_code_sends_nothing() {
        // Nothing listens on this port; an attempted request would fail with Http
        let client = ReviewClient::new("http://127.0.0.1:9").unwrap();
        let err = client.submit_code("").await.unwrap_err();
        assert!(matches!(err, Error::EmptySubmission));
    }
}
