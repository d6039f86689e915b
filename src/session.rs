//! The stateful HTTP session against the portal.
//!
//! [`PortalSession`] owns one `reqwest` client with a persistent cookie jar
//! for the lifetime of a single crawl. Every call of the protocol (listing
//! page, captcha image, form submit) must ride the same cookies, so the
//! session value is created fresh per run and never shared.
//!
//! Payload construction is kept in pure functions ([`field_key`],
//! [`submit_payload`]) because the portal names its form fields dynamically:
//! every key except the view state is qualified by the per-session prefix
//! discovered during acquisition.

use crate::captcha::{self, TextRecognizer};
use crate::crawler::Portal;
use crate::errors::AlertError;
use crate::extract;
use crate::models::SessionForm;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Fixed name of the hidden view state input.
const VIEWSTATE_FIELD: &str = "javax.faces.ViewState";
/// Challenge image path, relative to the listing page.
const CHALLENGE_PATH: &str = "captcha.jpg";
/// Query string that makes the portal bypass its response cache, so every
/// fetch yields the image the server currently expects an answer for.
const CHALLENGE_CACHE_BUSTER: &str = "pfdrid_c=true";

/// The portal serves an empty page to clients without a browser UA.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Build a prefix-qualified form field name.
pub fn field_key(prefix: &str, suffix: &str) -> String {
    format!("{prefix}:{suffix}")
}

/// Build the submit payload for one lookup attempt.
///
/// The shape is fixed; only the prefix, token, answer, and account code
/// vary. Order matches what the portal's own form serializes.
pub fn submit_payload(
    form: &SessionForm,
    answer: &str,
    account_code: &str,
) -> Vec<(String, String)> {
    let prefix = &form.field_prefix;
    vec![
        (prefix.clone(), prefix.clone()),
        (field_key(prefix, "appcat_focus"), String::new()),
        (field_key(prefix, "appcat_input"), account_code.to_string()),
        (field_key(prefix, "cap"), answer.to_string()),
        (field_key(prefix, "submit3"), String::new()),
        (VIEWSTATE_FIELD.to_string(), form.token.clone()),
    ]
}

/// One crawl's HTTP session: cookie jar, base URL, account code, recognizer.
#[derive(Debug)]
pub struct PortalSession<R> {
    http: reqwest::Client,
    listing_url: Url,
    challenge_url: Url,
    account_code: String,
    recognizer: R,
}

impl<R: TextRecognizer> PortalSession<R> {
    /// Create a fresh session against the portal's listing page.
    ///
    /// The challenge URL is derived from the listing URL by swapping the
    /// final path segment and appending the cache-busting query.
    pub fn new(
        listing_url: Url,
        account_code: String,
        recognizer: R,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        let mut challenge_url = listing_url.join(CHALLENGE_PATH)?;
        challenge_url.set_query(Some(CHALLENGE_CACHE_BUSTER));

        Ok(Self {
            http,
            listing_url,
            challenge_url,
            account_code,
            recognizer,
        })
    }
}

impl<R: TextRecognizer> Portal for PortalSession<R> {
    #[instrument(level = "info", skip_all)]
    async fn acquire(&mut self) -> Result<SessionForm, AlertError> {
        let markup = self
            .http
            .get(self.listing_url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract::extract_session(&markup)?)
    }

    #[instrument(level = "info", skip_all)]
    async fn solve_challenge(&mut self) -> Result<String, AlertError> {
        let image = self
            .http
            .get(self.challenge_url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!(bytes = image.len(), "Fetched challenge image");
        Ok(captcha::solve(&self.recognizer, &image).await)
    }

    #[instrument(level = "info", skip_all)]
    async fn submit(&mut self, form: &SessionForm, answer: &str) -> Result<String, AlertError> {
        let payload = submit_payload(form, answer, &self.account_code);
        let markup = self
            .http
            .post(self.listing_url.clone())
            .form(&payload)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        info!(bytes = markup.len(), "Submitted lookup form");
        Ok(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key() {
        assert_eq!(field_key("frm1", "cap"), "frm1:cap");
        assert_eq!(field_key("j_idt6", "appcat_input"), "j_idt6:appcat_input");
    }

    #[test]
    fn test_submit_payload_shape() {
        let form = SessionForm {
            token: "-716243:99021".into(),
            field_prefix: "frm1".into(),
        };
        let payload = submit_payload(&form, "7K2QX", "090");

        assert_eq!(
            payload,
            vec![
                ("frm1".to_string(), "frm1".to_string()),
                ("frm1:appcat_focus".to_string(), String::new()),
                ("frm1:appcat_input".to_string(), "090".to_string()),
                ("frm1:cap".to_string(), "7K2QX".to_string()),
                ("frm1:submit3".to_string(), String::new()),
                ("javax.faces.ViewState".to_string(), "-716243:99021".to_string()),
            ]
        );
    }

    #[test]
    fn test_challenge_url_derivation() {
        let listing = Url::parse("https://www.tnebltd.gov.in/outages/viewshutdown.xhtml").unwrap();
        let mut challenge = listing.join(CHALLENGE_PATH).unwrap();
        challenge.set_query(Some(CHALLENGE_CACHE_BUSTER));
        assert_eq!(
            challenge.as_str(),
            "https://www.tnebltd.gov.in/outages/captcha.jpg?pfdrid_c=true"
        );
    }
}
