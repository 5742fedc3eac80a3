//! Matching a single handle against a [`ContactStore`].

use std::ops::ControlFlow;

use crate::handle::{MatchKind, canonicalize, classify};
use crate::store::{Contact, ContactStore, StoreError};

/// Outcome of resolving one handle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// The handle exactly as supplied.
    pub input: String,
    /// Display name of the first matching contact.
    pub name: Option<String>,
    /// Identifier of the first matching contact.
    pub contact_id: Option<String>,
    /// Canonical form of the handle; present only when found.
    pub canonical: Option<String>,
    /// Whether any contact matched.
    pub found: bool,
    /// Whether more than one contact matched.
    pub ambiguous: bool,
    /// Identifier type the handle was classified as.
    pub kind: MatchKind,
}

impl Record {
    fn unresolved(input: &str, kind: MatchKind) -> Self {
        Self {
            input: input.to_owned(),
            kind,
            ..Self::default()
        }
    }
}

/// Scan for the first contact with an email equal to `canonical`.
fn first_by_email(store: &dyn ContactStore, canonical: &str) -> Result<Vec<Contact>, StoreError> {
    let mut hit = Vec::new();
    store.for_each_contact(&mut |c: &Contact| {
        if c.has_email(canonical) {
            hit.push(c.clone());
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    })?;
    Ok(hit)
}

/// Scan for the first contact whose phone digits equal `canonical`'s, or where either
/// is a suffix of the other (national vs. international forms).
fn first_by_phone(store: &dyn ContactStore, canonical: &str) -> Result<Vec<Contact>, StoreError> {
    let target = canonical.replace('+', "");
    let mut hit = Vec::new();
    if target.is_empty() {
        return Ok(hit);
    }
    store.for_each_contact(&mut |c: &Contact| {
        let matched = c
            .phone_digit_strings()
            .any(|d| d == target || d.ends_with(&target) || target.ends_with(&d));
        if matched {
            hit.push(c.clone());
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    })?;
    Ok(hit)
}

/// Resolve one raw handle.
///
/// The store's own predicate is tried first; when it finds nothing a linear scan
/// stops at the first loose match. IM and blank handles are never looked up.
///
/// # Errors
///
/// Returns [`StoreError`] if the store fails a query.
pub fn resolve_handle(store: &dyn ContactStore, raw: &str) -> Result<Record, StoreError> {
    let kind = classify(raw);
    let canonical = canonicalize(raw, kind);

    let matches = match kind {
        MatchKind::Email => {
            let found = store.contacts_matching_email(&canonical)?;
            if found.is_empty() {
                first_by_email(store, &canonical)?
            } else {
                found
            }
        }
        MatchKind::Phone => {
            let found = store.contacts_matching_phone(&canonical)?;
            if found.is_empty() {
                first_by_phone(store, &canonical)?
            } else {
                found
            }
        }
        MatchKind::InstantMessage | MatchKind::None => Vec::new(),
    };

    let Some(first) = matches.first() else {
        tracing::trace!(?kind, "handle not found");
        return Ok(Record::unresolved(raw, kind));
    };

    Ok(Record {
        input: raw.to_owned(),
        name: Some(first.display_name()),
        contact_id: Some(first.id.clone()),
        canonical: Some(canonical),
        found: true,
        ambiguous: matches.len() > 1,
        kind,
    })
}
