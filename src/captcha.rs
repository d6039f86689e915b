//! Challenge image recognition.
//!
//! The portal gates its outage lookup behind a distorted-text image. This
//! module treats recognition as an opaque capability behind the
//! [`TextRecognizer`] trait and normalizes whatever comes back to the
//! portal's answer alphabet. Accuracy is explicitly best-effort: a wrong or
//! empty answer is not an error here, it surfaces later as a rejected
//! submit that the crawler retries.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Characters the portal accepts in a challenge answer.
pub const CHALLENGE_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static NON_ALPHABET: Lazy<Regex> = Lazy::new(|| Regex::new("[^A-Z0-9]+").unwrap());

/// Opaque image-to-text recognition capability.
///
/// Implementors turn raw challenge image bytes into a best-effort text
/// reading. There is no accuracy contract; callers must tolerate wrong
/// answers.
pub trait TextRecognizer {
    /// Read the text out of a challenge image.
    async fn recognize(&self, image: &[u8]) -> io::Result<String>;
}

/// [`TextRecognizer`] backed by the `tesseract` command-line tool.
///
/// Runs `tesseract stdin stdout` in single-word mode with the character
/// whitelist pinned to [`CHALLENGE_ALPHABET`], piping the image bytes on
/// stdin. The binary name is configurable for hosts where tesseract is not
/// on the default path.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: String,
}

impl TesseractRecognizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    #[instrument(level = "debug", skip_all, fields(bytes = image.len()))]
    async fn recognize(&self, image: &[u8]) -> io::Result<String> {
        let whitelist = format!("tessedit_char_whitelist={CHALLENGE_ALPHABET}");
        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "--psm", "8", "-c", &whitelist])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "tesseract exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Normalize a raw recognition result to the portal's answer alphabet.
///
/// Uppercases the reading and strips everything outside `[A-Z0-9]` --
/// tesseract tends to append newlines and the odd stray punctuation mark
/// even with a whitelist in place. An empty result is a legitimate outcome
/// (the submit will simply be rejected and retried).
pub fn normalize_answer(raw: &str) -> String {
    let upper = raw.to_uppercase();
    NON_ALPHABET.replace_all(&upper, "").into_owned()
}

/// Run a recognizer over challenge image bytes, tolerating failure.
///
/// Recognition faults (missing binary, crashed process) degrade to an empty
/// answer with a warning rather than failing the run; the crawler's retry
/// loop handles the resulting rejection the same way as a misread.
pub async fn solve<R: TextRecognizer>(recognizer: &R, image: &[u8]) -> String {
    let answer = match recognizer.recognize(image).await {
        Ok(raw) => normalize_answer(&raw),
        Err(e) => {
            warn!(error = %e, "Challenge recognition failed; submitting empty answer");
            String::new()
        }
    };
    debug!(%answer, "Challenge answer");
    answer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_whitespace_and_punctuation() {
        assert_eq!(normalize_answer(" 7K2QX \n"), "7K2QX");
        assert_eq!(normalize_answer("A-B.C D"), "ABCD");
    }

    #[test]
    fn test_normalize_uppercases() {
        assert_eq!(normalize_answer("x9fj2"), "X9FJ2");
    }

    #[test]
    fn test_normalize_unusable_reading_is_empty() {
        assert_eq!(normalize_answer("?!\n\n"), "");
        assert_eq!(normalize_answer(""), "");
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        async fn recognize(&self, _image: &[u8]) -> io::Result<String> {
            Err(io::Error::other("no such binary"))
        }
    }

    #[tokio::test]
    async fn test_solve_degrades_to_empty_answer() {
        assert_eq!(solve(&FailingRecognizer, b"img").await, "");
    }
}
