//! The outage-retrieval state machine.
//!
//! One crawl is a short session-stateful protocol against the portal:
//!
//! 1. Acquire a view state token and field prefix from the listing page
//! 2. Fetch and solve the session's captcha image
//! 3. Submit the lookup form with the answer, the echoed token, and the
//!    prefix-qualified field names
//! 4. Parse the outage table out of the response
//!
//! Steps 2-4 loop under a bounded attempt limit: when the portal rejects the
//! challenge answer it re-renders its form instead of the results, which
//! surfaces as [`ProtocolError::MissingTable`]. The token stays valid across
//! rejected answers, so retries reuse the acquisition from step 1 rather
//! than restarting the session.
//!
//! # Architecture
//!
//! The module uses a trait-based design for testability:
//! - [`Portal`]: the protocol surface the state machine drives
//! - [`retrieve_outages`]: the retry loop, generic over any [`Portal`]
//!
//! The production implementation lives in [`crate::session::PortalSession`].
//!
//! # Retry Strategy
//!
//! - Captcha rejection: bounded retries (default 5), fixed short backoff
//!   plus random jitter (0-250ms), same token and prefix each attempt
//! - Transport faults: never retried, escalate immediately
//! - Acquisition faults: terminal, the run fails without a retry

use crate::errors::{AlertError, ProtocolError};
use crate::extract::extract_outages;
use crate::models::{OutageRecord, SessionForm};
use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Default bound on captcha attempts within one acquired session.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// The portal protocol surface driven by [`retrieve_outages`].
///
/// Implementors own whatever session state the three calls share (cookies,
/// base URL, recognizer). The trait exists so the retry loop can be
/// exercised against stubs without a network.
pub trait Portal {
    /// Fetch the listing page and extract the session form credentials.
    async fn acquire(&mut self) -> Result<SessionForm, AlertError>;

    /// Fetch a fresh challenge image through the session and produce a
    /// best-effort answer. An empty answer is legal; it will simply be
    /// rejected on submit.
    async fn solve_challenge(&mut self) -> Result<String, AlertError>;

    /// Submit the lookup form and return the raw response markup.
    async fn submit(&mut self, form: &SessionForm, answer: &str) -> Result<String, AlertError>;
}

/// Run the full retrieval protocol against a portal.
///
/// Acquires the session form once, then drives the solve/submit/parse loop
/// until the portal accepts a submission or `max_attempts` answers have
/// been rejected. A present-but-empty outage table is a success ("no
/// outages currently scheduled"), not a rejection.
///
/// # Errors
///
/// - [`AlertError::Transport`] from any step, immediately (never retried)
/// - [`AlertError::Protocol`] when acquisition finds malformed markup
/// - [`AlertError::CaptchaExhausted`] when every attempt was rejected
#[instrument(level = "info", skip(portal, retry_backoff))]
pub async fn retrieve_outages<P: Portal>(
    portal: &mut P,
    max_attempts: usize,
    retry_backoff: Duration,
) -> Result<Vec<OutageRecord>, AlertError> {
    let form = portal.acquire().await?;
    info!(field_prefix = %form.field_prefix, "Acquired portal session");

    for attempt in 1..=max_attempts {
        let answer = portal.solve_challenge().await?;
        let markup = portal.submit(&form, &answer).await?;

        match extract_outages(&markup) {
            Ok(outages) => {
                info!(attempt, count = outages.len(), "Portal accepted submission");
                return Ok(outages);
            }
            Err(ProtocolError::MissingTable) => {
                warn!(
                    attempt,
                    max_attempts, "Challenge answer rejected; portal re-rendered its form"
                );
                if attempt == max_attempts {
                    break;
                }
                // backoff calc
                let jitter_ms: u64 = rng().random_range(0..=250);
                sleep(retry_backoff + Duration::from_millis(jitter_ms)).await;
            }
            Err(other) => return Err(other.into()),
        }
    }

    Err(AlertError::CaptchaExhausted {
        attempts: max_attempts,
    })
}
