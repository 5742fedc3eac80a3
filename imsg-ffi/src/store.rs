//! Contacts directory: the [`ContactStore`] seam, the in-memory directory, and the
//! process-wide store used by the C ABI.

use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::handle::phone_digits;

/// Environment variable naming a directory file to load on first use.
pub const DIRECTORY_ENV: &str = "IMSG_CONTACTS_DIRECTORY";

/// Whether the caller may read the contacts directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum AuthStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined = 0,
    /// Access was refused or is restricted.
    Denied = 1,
    /// Access was granted.
    Authorized = 2,
}

impl AuthStatus {
    /// Value exposed across the C ABI.
    #[must_use]
    pub const fn to_ffi(self) -> i32 {
        self as i32
    }
}

/// Errors raised while loading or querying a directory.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The directory file could not be read.
    #[error("read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The directory document is not valid JSON of the expected shape.
    #[error("parse directory: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backing service refused or failed the query.
    #[error("contacts store unavailable: {0}")]
    Unavailable(String),
}

/// A single contact card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    /// Stable identifier.
    pub id: String,
    /// Given (first) name.
    pub given_name: String,
    /// Middle name.
    pub middle_name: String,
    /// Family (last) name.
    pub family_name: String,
    /// Company or organization.
    pub organization: String,
    /// Nickname.
    pub nickname: String,
    /// Phone numbers as entered.
    pub phones: Vec<String>,
    /// Email addresses as entered.
    pub emails: Vec<String>,
}

impl Contact {
    /// Full name from the non-empty name parts, in `given middle family` order.
    #[must_use]
    pub fn full_name(&self) -> String {
        [&self.given_name, &self.middle_name, &self.family_name]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Name to show for this contact: full name, then organization, then nickname,
    /// then the identifier.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = self.full_name();
        if !full.is_empty() {
            return full;
        }
        [&self.organization, &self.nickname]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or(&self.id)
            .clone()
    }

    /// Whether any stored email equals `canonical` once trimmed and lowercased.
    #[must_use]
    pub fn has_email(&self, canonical: &str) -> bool {
        self.emails
            .iter()
            .any(|e| e.trim().to_lowercase() == canonical)
    }

    /// Stored phone numbers as bare digit strings (no `+`), skipping empty ones.
    pub fn phone_digit_strings(&self) -> impl Iterator<Item = String> + '_ {
        self.phones
            .iter()
            .map(|p| phone_digits(p).replace('+', ""))
            .filter(|d| !d.is_empty())
    }
}

/// Backend owning authorization and contact data.
///
/// The two `contacts_matching_*` queries are the store's own predicates and may be
/// smarter than plain equality; the resolver falls back to [`for_each_contact`]
/// when they come back empty.
///
/// [`for_each_contact`]: ContactStore::for_each_contact
pub trait ContactStore: Send + Sync {
    /// Current authorization, without side effects.
    fn authorization_status(&self) -> AuthStatus;

    /// Ask for access and block until an answer is known.
    fn request_access(&self) -> AuthStatus;

    /// Visit every contact until `visit` breaks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be enumerated.
    fn for_each_contact(
        &self,
        visit: &mut dyn FnMut(&Contact) -> ControlFlow<()>,
    ) -> Result<(), StoreError>;

    /// All contacts carrying `canonical` (already lowercased) as an email address.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be queried.
    fn contacts_matching_email(&self, canonical: &str) -> Result<Vec<Contact>, StoreError> {
        let mut out = Vec::new();
        self.for_each_contact(&mut |c: &Contact| {
            if c.has_email(canonical) {
                out.push(c.clone());
            }
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }

    /// All contacts with a phone number whose digits equal those of `canonical`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be queried.
    fn contacts_matching_phone(&self, canonical: &str) -> Result<Vec<Contact>, StoreError> {
        let target = canonical.replace('+', "");
        if target.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        self.for_each_contact(&mut |c: &Contact| {
            if c.phone_digit_strings().any(|d| d == target) {
                out.push(c.clone());
            }
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }
}

/// On-disk directory document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directory {
    /// Authorization status before any request.
    pub authorization: AuthStatus,
    /// Outcome of an access request while the status is not determined.
    pub grant_on_request: bool,
    /// Contact cards.
    pub contacts: Vec<Contact>,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            authorization: AuthStatus::NotDetermined,
            grant_on_request: true,
            contacts: Vec::new(),
        }
    }
}

impl Directory {
    /// Parse a directory from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`] on malformed input.
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a directory file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read, or
    /// [`StoreError::Parse`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Contacts held in memory, with a simulated permission decision.
#[derive(Debug)]
pub struct MemoryStore {
    status: RwLock<AuthStatus>,
    grant_on_request: bool,
    contacts: Vec<Contact>,
}

impl MemoryStore {
    /// Store with the given starting status and contacts; access requests succeed.
    #[must_use]
    pub fn new(status: AuthStatus, contacts: Vec<Contact>) -> Self {
        Self::from(Directory {
            authorization: status,
            grant_on_request: true,
            contacts,
        })
    }

    /// Set what an access request answers while the status is not determined.
    #[must_use]
    pub fn grant_on_request(mut self, grant: bool) -> Self {
        self.grant_on_request = grant;
        self
    }

    /// Number of contacts held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the store holds no contacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from(Directory::default())
    }
}

impl From<Directory> for MemoryStore {
    fn from(d: Directory) -> Self {
        Self {
            status: RwLock::new(d.authorization),
            grant_on_request: d.grant_on_request,
            contacts: d.contacts,
        }
    }
}

impl ContactStore for MemoryStore {
    fn authorization_status(&self) -> AuthStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_access(&self) -> AuthStatus {
        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        if *status == AuthStatus::NotDetermined {
            *status = if self.grant_on_request {
                AuthStatus::Authorized
            } else {
                AuthStatus::Denied
            };
            tracing::info!(status = ?*status, "contacts access decided");
        }
        *status
    }

    fn for_each_contact(
        &self,
        visit: &mut dyn FnMut(&Contact) -> ControlFlow<()>,
    ) -> Result<(), StoreError> {
        for contact in &self.contacts {
            if visit(contact).is_break() {
                break;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Process-wide store
// ---------------------------------------------------------------------------

static STORE: OnceLock<RwLock<Arc<dyn ContactStore>>> = OnceLock::new();

fn initial_store() -> Arc<dyn ContactStore> {
    let Some(path) = std::env::var_os(DIRECTORY_ENV) else {
        return Arc::new(MemoryStore::default());
    };
    let path = PathBuf::from(path);
    match Directory::load(&path) {
        Ok(dir) => {
            tracing::info!(path = %path.display(), contacts = dir.contacts.len(), "loaded contacts directory");
            Arc::new(MemoryStore::from(dir))
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load contacts directory; access denied");
            Arc::new(MemoryStore::new(AuthStatus::Denied, Vec::new()))
        }
    }
}

fn slot() -> &'static RwLock<Arc<dyn ContactStore>> {
    STORE.get_or_init(|| RwLock::new(initial_store()))
}

/// Snapshot of the store currently serving the C ABI.
#[must_use]
pub fn current() -> Arc<dyn ContactStore> {
    Arc::clone(&slot().read().unwrap_or_else(PoisonError::into_inner))
}

/// Replace the store serving the C ABI. Results already handed out are unaffected.
pub fn install(store: Arc<dyn ContactStore>) {
    *slot().write().unwrap_or_else(PoisonError::into_inner) = store;
}

#[cfg(test)]
pub(crate) static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(id: &str) -> Contact {
        Contact {
            id: id.into(),
            ..Contact::default()
        }
    }

    #[test]
    fn display_name_falls_back_in_order() {
        let mut c = contact("C-1");
        assert_eq!(c.display_name(), "C-1");
        c.nickname = "Nick".into();
        assert_eq!(c.display_name(), "Nick");
        c.organization = "Acme".into();
        assert_eq!(c.display_name(), "Acme");
        c.family_name = "Doe".into();
        assert_eq!(c.display_name(), "Doe");
        c.given_name = "Jane".into();
        c.middle_name = " Q ".into();
        assert_eq!(c.display_name(), "Jane Q Doe");
    }

    #[test]
    fn request_access_only_decides_once() {
        let store = MemoryStore::default().grant_on_request(false);
        assert_eq!(store.authorization_status(), AuthStatus::NotDetermined);
        assert_eq!(store.request_access(), AuthStatus::Denied);
        assert_eq!(store.authorization_status(), AuthStatus::Denied);

        let store = MemoryStore::new(AuthStatus::Denied, Vec::new());
        assert_eq!(store.request_access(), AuthStatus::Denied);

        let store = MemoryStore::default();
        assert_eq!(store.request_access(), AuthStatus::Authorized);
    }

    #[test]
    fn directory_json_defaults() {
        let dir = Directory::from_json("{}").unwrap();
        assert_eq!(dir, Directory::default());

        let dir = Directory::from_json(
            r#"{
                "authorization": "authorized",
                "grant_on_request": false,
                "contacts": [{"id": "1", "given_name": "Ann", "phones": ["+1 555 0100"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(dir.authorization, AuthStatus::Authorized);
        assert!(!dir.grant_on_request);
        assert_eq!(dir.contacts[0].phones, ["+1 555 0100"]);
        assert!(dir.contacts[0].emails.is_empty());

        assert!(matches!(
            Directory::from_json(r#"{"authorization": "maybe"}"#),
            Err(StoreError::Parse(_))
        ));
    }

    #[test]
    fn directory_load_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.json");
        let err = Directory::load(&missing).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.to_string().contains("nope.json"));

        let path = tmp.path().join("dir.json");
        fs::write(&path, r#"{"contacts": [{"id": "x"}]}"#).unwrap();
        assert_eq!(Directory::load(&path).unwrap().contacts.len(), 1);
    }

    #[test]
    fn default_predicates_match_all_contacts() {
        let mut a = contact("a");
        a.emails = vec![" Ann@Example.com ".into()];
        a.phones = vec!["+1 (555) 010-0100".into()];
        let mut b = contact("b");
        b.emails = vec!["ann@example.com".into()];
        let store = MemoryStore::new(AuthStatus::Authorized, vec![a, b]);

        let hits = store.contacts_matching_email("ann@example.com").unwrap();
        assert_eq!(hits.len(), 2);

        let hits = store.contacts_matching_phone("+15550100100").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
        assert!(store.contacts_matching_phone("+").unwrap().is_empty());
    }

    #[test]
    fn phone_digit_strings_skip_numbers_without_digits() {
        let mut c = contact("c");
        c.phones = vec!["ext.".into(), "+".into(), "+44 (20) 7946".into(), String::new()];
        assert_eq!(c.phone_digit_strings().collect::<Vec<_>>(), ["44207946"]);

        let store = MemoryStore::new(AuthStatus::Authorized, vec![contact("none")]);
        assert!(store.contacts_matching_phone("+15551234567").unwrap().is_empty());
    }
}
