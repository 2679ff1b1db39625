// ABOUTME: Phone number normalization and masking
// ABOUTME: Canonicalizes Indian numbers to +91 international format before hashing or encryption
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gatewarden Contributors

//! Phone normalization.
//!
//! Every phone number is canonicalized before it touches the codec, so that
//! `98765 43210`, `+91-9876543210`, and `919876543210` all produce the same
//! lookup hash. Normalization failure is a validation error at the call
//! sites, never silently ignored.

/// Normalize a raw phone number to canonical `+91` international format.
///
/// Accepts a bare 10-digit subscriber number or a 12-digit number already
/// carrying the `91` country code, with any separators. Returns `None` for
/// anything else.
#[must_use]
pub fn normalize(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    match digits.len() {
        10 => Some(format!("+91{digits}")),
        12 if digits.starts_with("91") => Some(format!("+{digits}")),
        _ => None,
    }
}

/// Mask a phone number for user-facing hints, e.g. `******3210`
#[must_use]
pub fn mask(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let start = digits.len().saturating_sub(4);
    let last4: String = digits[start..].iter().collect();
    format!("******{last4}")
}
