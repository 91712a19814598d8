//! Utility functions for time arithmetic and message formatting.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// `now + timeout`, saturating at the far future.
#[must_use]
pub fn deadline_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Escape text for Telegram HTML messages.
///
/// # Examples
///
/// ```
/// use inline_limiter_core::utils::escape_html;
/// assert_eq!(escape_html("<b>&"), "&lt;b&gt;&amp;");
/// ```
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Clickable mention of a user by id.
///
/// # Examples
///
/// ```
/// use inline_limiter_core::utils::mention_html;
/// assert_eq!(
///     mention_html(42, "Ann <3"),
///     "<a href=\"tg://user?id=42\">Ann &lt;3</a>"
/// );
/// ```
#[must_use]
pub fn mention_html(user_id: i64, name: &str) -> String {
    format!("<a href=\"tg://user?id={user_id}\">{}</a>", escape_html(name))
}
