// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Heuristic input sanitization.
//!
//! This is a denylist, not a parser. Markup and quote characters are removed
//! outright, and any message that mentions one of the SQL verbs in
//! [`SUSPICIOUS_KEYWORDS`] anywhere (including inside longer words such as
//! "selected" or "updated") is rejected. Those false positives are expected
//! behavior.

/// Characters removed from every message.
pub const STRIPPED_CHARS: [char; 4] = ['<', '>', '"', '\''];

/// Case-insensitive substrings that cause a message to be rejected.
pub const SUSPICIOUS_KEYWORDS: [&str; 4] = ["drop", "delete", "select", "update"];

/// Validate and sanitize user input.
///
/// Returns the input with [`STRIPPED_CHARS`] removed, or `None` if the
/// stripped text contains a suspicious keyword.
///
/// ```
/// use agentguard::security::sanitize;
///
/// assert_eq!(sanitize("Hello <b>world</b>").as_deref(), Some("Hello bworld/b"));
/// assert_eq!(sanitize("What is DROP TABLE?"), None);
/// ```
pub fn sanitize(raw: &str) -> Option<String> {
    let sanitized: String = raw.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();

    let lowered = sanitized.to_lowercase();
    if let Some(keyword) = SUSPICIOUS_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
        tracing::warn!(
            target: "agentguard::sanitizer",
            keyword = %keyword,
            "Suspicious input detected: {}",
            sanitized
        );
        return None;
    }

    Some(sanitized)
}

/// Sanitize raw bytes. Input that is not valid UTF-8 text is rejected.
pub fn sanitize_bytes(raw: &[u8]) -> Option<String> {
    match std::str::from_utf8(raw) {
        Ok(text) => sanitize(text),
        Err(e) => {
            tracing::warn!(
                target: "agentguard::sanitizer",
                valid_up_to = e.valid_up_to(),
                "Rejected non-text input"
            );
            None
        }
    }
}
