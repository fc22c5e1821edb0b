//! Attendance link parsing.
//!
//! QR codes encode `https://<host>/attendance` (static) or
//! `https://<host>/attendance?token=<jwt>` (dynamic).

use url::Url;

use crate::error::CoreError;

const ATTENDANCE_SEGMENT: &str = "attendance";

/// Extract the QR token from an attendance link.
///
/// Returns `Ok(None)` for the static link. A blank `token` parameter
/// counts as no token.
pub fn token_from_entry_url(url: &Url) -> Result<Option<String>, CoreError> {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()));

    if last_segment != Some(ATTENDANCE_SEGMENT) {
        return Err(CoreError::InvalidEntryUrl {
            url: url.to_string(),
            reason: "path must end in /attendance".into(),
        });
    }

    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.trim().to_owned())
        .filter(|token| !token.is_empty()))
}

/// Parse `input` as an attendance link and extract its token.
pub fn parse_entry(input: &str) -> Result<Option<String>, CoreError> {
    let url = Url::parse(input.trim()).map_err(|e| CoreError::InvalidEntryUrl {
        url: input.to_owned(),
        reason: e.to_string(),
    })?;
    token_from_entry_url(&url)
}
