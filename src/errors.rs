//! Error types for the outage crawler.
//!
//! The taxonomy separates two very different failure families:
//! - [`ProtocolError`]: the portal answered, but the markup did not contain
//!   what the protocol step expected. [`ProtocolError::MissingTable`] doubles
//!   as the captcha-rejection signal during the submit loop; the other two
//!   only occur during token acquisition and are never retried.
//! - [`AlertError`]: everything a whole run can fail with, including
//!   transport faults (never retried), exhausted captcha attempts, and
//!   notification delivery failures.

use thiserror::Error;

/// The portal's response did not match the expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The listing page carried no view state token input.
    #[error("view state token not found in portal response")]
    MissingToken,

    /// The listing page carried no input to derive the form field prefix from.
    #[error("form field prefix not found in portal response")]
    MissingFieldPrefix,

    /// The submit response carried no outage table. During the submit loop
    /// this means the portal rejected the challenge answer and re-rendered
    /// its form.
    #[error("outage table not found in portal response")]
    MissingTable,
}

/// Top-level failure of a crawler run.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Malformed portal response outside the retryable captcha-rejection case.
    #[error("portal response malformed: {0}")]
    Protocol(#[from] ProtocolError),

    /// Network/transport fault (timeout, connection failure, non-2xx status).
    /// Escalates immediately; the retry loop never retries these.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Every bounded captcha attempt was consumed without an accepted submit.
    #[error("captcha rejected after {attempts} attempts")]
    CaptchaExhausted {
        /// Number of submit attempts made before giving up.
        attempts: usize,
    },

    /// The notification channel rejected or failed to accept a message.
    #[error("delivery to notification channel failed: {0}")]
    Delivery(String),
}
