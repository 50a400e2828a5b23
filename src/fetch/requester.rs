//! Retrying requester
//!
//! One logical fetch is up to `max_retries` attempts. Every attempt, the first
//! included, is preceded by a jittered delay and gets a freshly drawn user
//! agent. Failed attempt `i` is followed by a linear backoff of
//! `(i + 1) * backoff_unit` unless it was the last one.

use crate::config::FetchConfig;
use crate::fetch::transport::{Headers, RawResponse, Transport};
use crate::FetchError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Per-call request options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Headers layered over the requester's base headers
    pub headers: Headers,
}

/// Issues single logical fetches with bounded retries
///
/// Holds no cross-call state besides its configuration and its own random
/// generator, so each platform owning one instance never shares jitter or
/// header selection with another.
pub struct RetryingRequester {
    transport: Arc<dyn Transport>,
    config: FetchConfig,
    base_headers: Headers,
    rng: Mutex<StdRng>,
}

impl RetryingRequester {
    /// Creates a requester seeded from the operating system
    pub fn new(transport: Arc<dyn Transport>, config: FetchConfig, base_headers: Headers) -> Self {
        Self::with_rng(transport, config, base_headers, StdRng::from_os_rng())
    }

    /// Creates a requester with a fixed seed (reproducible jitter and rotation)
    pub fn with_seed(
        transport: Arc<dyn Transport>,
        config: FetchConfig,
        base_headers: Headers,
        seed: u64,
    ) -> Self {
        Self::with_rng(transport, config, base_headers, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        transport: Arc<dyn Transport>,
        config: FetchConfig,
        base_headers: Headers,
        rng: StdRng,
    ) -> Self {
        Self {
            transport,
            config,
            base_headers,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `url`, retrying until a 200 response or until retries run out
    ///
    /// # Returns
    ///
    /// * `Ok(RawResponse)` - Some attempt answered with status 200
    /// * `Err(FetchError)` - All `max_retries` attempts failed
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawResponse, FetchError> {
        let max_retries = self.config.max_retries.max(1);
        let mut last_cause = String::new();

        for attempt in 0..max_retries {
            let (delay, user_agent) = self.draw_attempt_params();
            tokio::time::sleep(delay).await;

            let headers = self.attempt_headers(options, user_agent);

            match self.transport.get(url, &headers).await {
                Ok(response) if response.status == 200 => {
                    tracing::info!("Fetched {}", url);
                    return Ok(response);
                }
                Ok(response) => {
                    tracing::warn!(
                        "Request failed with HTTP {} (attempt {}/{}): {}",
                        response.status,
                        attempt + 1,
                        max_retries,
                        url
                    );
                    last_cause = format!("HTTP status {}", response.status);
                }
                Err(e) => {
                    tracing::warn!(
                        "Request error (attempt {}/{}): {}: {}",
                        attempt + 1,
                        max_retries,
                        url,
                        e
                    );
                    last_cause = e.to_string();
                }
            }

            if attempt + 1 < max_retries {
                let wait = self.backoff(attempt);
                tracing::debug!("Waiting {:?} before retrying {}", wait, url);
                tokio::time::sleep(wait).await;
            }
        }

        tracing::error!("Giving up on {} after {} attempts", url, max_retries);
        Err(FetchError {
            url: url.to_string(),
            attempts: max_retries,
            cause: last_cause,
        })
    }

    /// Backoff inserted after failed attempt `attempt` (zero-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.config.backoff_unit() * (attempt + 1)
    }

    /// Draws the jitter delay and the user agent for the next attempt
    fn draw_attempt_params(&self) -> (Duration, Option<String>) {
        // A poisoned lock only means another attempt panicked mid-draw; the
        // generator state is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let (min, max) = (self.config.delay_min_ms, self.config.delay_max_ms);
        let delay_ms = if min >= max {
            min
        } else {
            rng.random_range(min..=max)
        };

        let agents = &self.config.user_agents;
        let user_agent = if agents.is_empty() {
            None
        } else {
            Some(agents[rng.random_range(0..agents.len())].clone())
        };

        (Duration::from_millis(delay_ms), user_agent)
    }

    fn attempt_headers(&self, options: &FetchOptions, user_agent: Option<String>) -> Headers {
        let mut headers = self.base_headers.clone();
        headers.extend(
            options
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if let Some(ua) = user_agent {
            headers.insert("User-Agent".to_string(), ua);
        }
        headers
    }
}
