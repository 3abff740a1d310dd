//! Poll policy for waiting on asynchronous backend results
//!
//! The backend answers "not yet" until the review is finished. A policy caps
//! how long a client keeps asking: a per-attempt delay (fixed or growing), an
//! attempt budget and an optional wall-clock deadline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay between polls evolves
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// Delay multiplied by `factor` after each pending answer, capped
    Exponential {
        factor: f64,
        #[serde(with = "humantime_serde")]
        max_interval: Duration,
    },
}

/// Bounds and pacing for a poll loop
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay after the first pending answer
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Delay growth between attempts
    pub backoff: Backoff,

    /// Give up after this many status queries (`None` for no limit)
    pub max_attempts: Option<u32>,

    /// Give up once this much time has passed since the first query
    #[serde(with = "humantime_serde")]
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            backoff: Backoff::Fixed,
            max_attempts: Some(300),
            max_wait: None,
        }
    }
}

impl PollPolicy {
    /// Create the default policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base delay
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the delay growth
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the wall-clock deadline
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Like [`delay_after`](Self::delay_after), but never sleeps past `max_wait`
    pub fn delay_within(&self, attempt: u32, elapsed: Duration) -> Duration {
        let delay = self.delay_after(attempt);
        match self.max_wait {
            Some(max) => delay.min(max.saturating_sub(elapsed)),
            None => delay,
        }
    }

    /// Delay to wait after `attempt` (1-based) came back pending
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match &self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let exponent = attempt.saturating_sub(1).min(32) as i32;
                let scaled = self.interval.as_secs_f64() * factor.max(1.0).powi(exponent);
                let capped = scaled.min(max_interval.as_secs_f64()).max(0.0);
                Duration::from_secs_f64(capped)
            }
        }
    }

    /// Whether another query is allowed after `attempts` queries over `elapsed`
    pub fn allows_another(&self, attempts: u32, elapsed: Duration) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return false;
        }
        if self.max_wait.is_some_and(|max| elapsed >= max) {
            return false;
        }
        true
    }

    /// Check the policy is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() {
            return Err("poll interval must be greater than zero".to_string());
        }
        if self.max_attempts == Some(0) {
            return Err("poll max_attempts must be at least 1".to_string());
        }
        if let Backoff::Exponential { factor, .. } = &self.backoff {
            if !factor.is_finite() || *factor < 1.0 {
                return Err(format!("backoff factor must be >= 1.0, got {}", factor));
            }
        }
        Ok(())
    }
}
