//! Document retrieval with a bounded retry budget.
//!
//! The extractors only need a `fetch(url) -> raw document` capability. This
//! one is a blocking GET with browser-like headers, rotating the advertised
//! identity between attempts. Bot challenges and 5xx responses are retried
//! with increasing backoff; other non-success statuses end the attempt loop
//! early since repeating them changes nothing.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::error::PipelineError;

const REQUEST_TIMEOUT_SECS: u64 = 25;
const BACKOFF_STEP_MS: u64 = 500;
const BACKOFF_JITTER_MS: u64 = 250;

pub const DEFAULT_ATTEMPTS: u32 = 3;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// Markers that show up in interstitial bot-challenge pages instead of the
/// content we asked for.
const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "cf-chl",
    "challenge-platform",
    "Attention Required",
    "Access denied",
];

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Attempt budget, at least 1.
    pub attempts: u32,
    /// Keep the raw body length around for diagnostics payloads.
    pub debug: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            debug: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawDocument {
    pub body: String,
    pub status: u16,
    /// Attempts consumed, 1-based.
    pub attempts: u32,
}

pub fn is_blocked(body: &str) -> bool {
    BLOCK_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Retrieve `url`, retrying retryable failures up to the attempt budget.
pub fn fetch_document(url: &str, opts: &FetchOptions) -> Result<RawDocument, PipelineError> {
    let budget = opts.attempts.max(1);
    let client = match http_client() {
        Ok(client) => client,
        Err(err) => {
            return Err(PipelineError::Transport {
                attempts: 0,
                reason: format!("{err:#}"),
            });
        }
    };

    let mut last_reason = String::new();
    for attempt in 1..=budget {
        if attempt > 1 {
            backoff(attempt);
        }

        let agent = USER_AGENTS[((attempt - 1) as usize) % USER_AGENTS.len()];
        let sent = client
            .get(url)
            .header(USER_AGENT, agent)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "sv-SE,sv;q=0.9,en;q=0.5")
            .send();

        let resp = match sent {
            Ok(resp) => resp,
            Err(err) => {
                last_reason = format!("nätverksfel: {err}");
                continue;
            }
        };

        let status = resp.status();
        let body = match resp.text() {
            Ok(body) => body,
            Err(err) => {
                last_reason = format!("kunde inte läsa svaret: {err}");
                continue;
            }
        };

        if status.is_success() {
            if is_blocked(&body) {
                last_reason = "bot-skydd upptäckt".to_string();
                continue;
            }
            return Ok(RawDocument {
                body,
                status: status.as_u16(),
                attempts: attempt,
            });
        }

        last_reason = format!("status {status}");
        if !status.is_server_error() {
            // 4xx and friends: deterministic, retrying is pointless.
            return Err(PipelineError::Transport {
                attempts: attempt,
                reason: last_reason,
            });
        }
    }

    Err(PipelineError::Transport {
        attempts: budget,
        reason: last_reason,
    })
}

fn backoff(attempt: u32) {
    let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
    let millis = BACKOFF_STEP_MS * (attempt as u64 - 1) + jitter;
    thread::sleep(Duration::from_millis(millis));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_markers_are_detected() {
        assert!(is_blocked("<html><body>please solve this captcha</body></html>"));
        assert!(is_blocked("cf-chl-widget-xyz"));
        assert!(!is_blocked("<html><body>Odds 2,30</body></html>"));
    }

    #[test]
    fn attempt_budget_has_floor() {
        let opts = FetchOptions {
            attempts: 0,
            ..FetchOptions::default()
        };
        // An unroutable scheme fails on every attempt without sleeping long.
        let err = fetch_document("http://127.0.0.1:1/unreachable", &opts).unwrap_err();
        match err {
            PipelineError::Transport { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
