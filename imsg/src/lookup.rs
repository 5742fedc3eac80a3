//! Display-name lookup for chat participants.
//!
//! Chat databases store participants as raw handles (`+1 (555) 123-4567`,
//! `mailto:Ann@Example.com`) or as chat identifiers such as
//! `iMessage;-;+15551234567`. [`ContactLookup`] reduces those to one key per
//! person, resolves the keys in a single batch, and labels handles with the
//! contact name when one is known.

use std::collections::{HashMap, HashSet};

use imsg_ffi::handle::{phone_digits, strip_prefix_ci};

use crate::contacts::{auth_status, request_access, resolve};
use crate::types::AuthStatus;

/// Batch name lookup over the contacts directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactLookup;

impl ContactLookup {
    /// The handle part of a value: the last `;`-separated segment, trimmed.
    #[must_use]
    pub fn candidate(value: &str) -> &str {
        let raw = value.trim();
        raw.rsplit(';').next().map_or(raw, str::trim)
    }

    /// Lookup key for a value. Emails are lowercased, URI schemes are stripped, and
    /// phone-like values keep only digits (and a leading `+`). Anything with no
    /// digits is returned as-is.
    #[must_use]
    pub fn normalize(value: &str) -> String {
        let item = Self::candidate(value);

        if let Some(rest) = strip_prefix_ci(item, "mailto:") {
            return rest.to_lowercase();
        }
        if let Some(rest) = ["tel:", "sms:", "imessage:"]
            .iter()
            .find_map(|scheme| strip_prefix_ci(item, scheme))
        {
            return rest.to_owned();
        }
        if item.contains('@') {
            return item.to_lowercase();
        }

        let digits = phone_digits(item);
        if digits.is_empty() { item.to_owned() } else { digits }
    }

    /// Resolve display names for `values`, keyed by [`normalize`](Self::normalize)d
    /// value. Asks for access when it has not been decided. Returns an empty map when
    /// access is not granted or the lookup fails; unknown handles are simply absent.
    #[must_use]
    pub fn resolve<S: AsRef<str>>(values: &[S]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let keys: Vec<String> = values
            .iter()
            .map(|v| Self::normalize(v.as_ref()))
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .collect();
        if keys.is_empty() {
            return HashMap::new();
        }

        let status = match auth_status() {
            Ok(AuthStatus::NotDetermined) => request_access(),
            other => other,
        };
        if !matches!(status, Ok(AuthStatus::Authorized)) {
            return HashMap::new();
        }

        let Ok(resolution) = resolve(&keys) else {
            return HashMap::new();
        };
        resolution
            .iter()
            .filter_map(Result::ok)
            .filter(|r| r.found)
            .filter_map(|r| Some((r.input, r.name?)))
            .collect()
    }

    /// Label for `value`: the contact name if known, else its normalized key, else
    /// the value unchanged.
    #[must_use]
    pub fn label(value: &str, names: &HashMap<String, String>) -> String {
        let key = Self::normalize(value);
        if key.is_empty() {
            return value.to_owned();
        }
        names.get(&key).cloned().unwrap_or(key)
    }
}
