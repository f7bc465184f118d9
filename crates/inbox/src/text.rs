//! Email body cleanup.

use pigeon_core::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

/// Mail clients place this line above the quoted earlier messages.
pub const QUOTE_MARKER: &str = "________________________________";

/// Drop the quoted thread history below [`QUOTE_MARKER`].
pub fn strip_quoted(body: &str) -> &str {
    match body.find(QUOTE_MARKER) {
        Some(start) => &body[..start],
        None => body,
    }
}

static HTML_TAG: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"<[^>]*>"));

/// Replace HTML tags with spaces, leaving the text.
pub fn strip_html(body: &str) -> AppResult<String> {
    let tags = HTML_TAG
        .as_ref()
        .map_err(|e| AppError::Other(format!("Regex error: {}", e)))?;
    Ok(tags.replace_all(body, " ").into_owned())
}
