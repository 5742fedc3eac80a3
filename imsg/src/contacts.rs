#![allow(unsafe_code)]
//! Contacts authorization, resolution, and directory configuration.

use std::path::Path;
use std::ptr;

use imsg_ffi::ImsgContactsResult;
use imsg_ffi::contacts as sys;

use crate::error::{self, Error, Result};
use crate::ffi::{OwnedHandle, read_borrowed, take_c_string, to_c_string, to_c_string_array};
use crate::types::{AuthStatus, MatchKind};

fn auth_from_ffi(v: i32) -> Result<AuthStatus> {
    AuthStatus::from_ffi(v).ok_or_else(|| Error::Ffi {
        code: v,
        message: "unknown authorization status".into(),
    })
}

/// Current contacts authorization, without prompting.
///
/// # Errors
///
/// Returns [`Error::Ffi`] if the native library reports an unknown status.
pub fn auth_status() -> Result<AuthStatus> {
    auth_from_ffi(sys::imsg_contacts_auth_status())
}

/// Ask for contacts access if it has not been decided yet. Blocks until answered.
///
/// # Errors
///
/// Returns [`Error::Ffi`] if the native library reports an unknown status.
pub fn request_access() -> Result<AuthStatus> {
    auth_from_ffi(sys::imsg_contacts_request_access())
}

/// Replace the contacts directory with a JSON file.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a path that is not UTF-8 or contains a
/// NUL, and [`Error::Store`] if the file cannot be read or parsed. The previous
/// directory stays in place on error.
pub fn load_directory(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = path
        .to_str()
        .ok_or_else(|| Error::InvalidArgument(format!("non UTF-8 path: {}", path.display())))?;
    let c = to_c_string(text)?;
    error::check(unsafe { sys::imsg_contacts_load_directory(c.as_ptr()) })
}

/// Replace the contacts directory with one parsed from JSON text.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `json` contains a NUL, and
/// [`Error::Store`] if it does not parse.
pub fn load_directory_json(json: &str) -> Result<()> {
    let c = to_c_string(json)?;
    error::check(unsafe { sys::imsg_contacts_load_directory_json(c.as_ptr()) })
}

/// Initialize the native tracing logger. Only the first call has an effect.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `level` contains a NUL.
pub fn init_logger(level: Option<&str>) -> Result<()> {
    let c = level.map(to_c_string).transpose()?;
    error::check(unsafe {
        imsg_ffi::imsg_init_logger(c.as_ref().map_or(ptr::null(), |s| s.as_ptr()))
    })
}

/// Version of the native library.
///
/// # Errors
///
/// Returns [`Error::NullPointer`] or [`Error::InvalidUtf8`] if the native string
/// is unusable.
pub fn version() -> Result<String> {
    unsafe { take_c_string(imsg_ffi::imsg_version()) }
}

/// Resolve handles to contacts, one [`Record`] per handle in input order.
///
/// # Errors
///
/// Returns [`Error::NotAuthorized`] unless access has been granted,
/// [`Error::InvalidArgument`] if a handle contains a NUL, and [`Error::Store`] if
/// the directory fails a query.
pub fn resolve<S: AsRef<str>>(handles: &[S]) -> Result<Resolution> {
    resolve_with_flags(handles, 0)
}

/// Like [`resolve`], passing a reserved `flags` word through to the native call.
///
/// # Errors
///
/// Same as [`resolve`], plus [`Error::InvalidArgument`] for more than
/// `u32::MAX` handles.
pub fn resolve_with_flags<S: AsRef<str>>(handles: &[S], flags: u32) -> Result<Resolution> {
    let count = u32::try_from(handles.len())
        .map_err(|_| Error::InvalidArgument("too many handles".into()))?;
    let (_owned, ptrs) = to_c_string_array(handles)?;
    let mut out: *mut ImsgContactsResult = ptr::null_mut();
    error::check(unsafe { sys::imsg_contacts_resolve(ptrs.as_ptr(), count, flags, &mut out) })?;
    let handle = OwnedHandle::new(out, sys::imsg_contacts_result_free)?;
    let len = unsafe { sys::imsg_contacts_result_count(handle.as_ptr()) };
    Ok(Resolution { handle, len })
}

/// One resolved handle, copied out of a [`Resolution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The handle exactly as passed in.
    pub input: String,
    /// Display name of the matched contact.
    pub name: Option<String>,
    /// Identifier of the matched contact.
    pub contact_id: Option<String>,
    /// Canonical form of a matched handle.
    pub canonical: Option<String>,
    /// Whether a contact matched.
    pub found: bool,
    /// Whether more than one contact matched.
    pub ambiguous: bool,
    /// How the handle was classified.
    pub kind: MatchKind,
}

/// Owned result of a resolve call. The native result is freed on drop.
#[derive(Debug)]
pub struct Resolution {
    handle: OwnedHandle<ImsgContactsResult>,
    len: u32,
}

impl Resolution {
    /// Number of records; always equals the number of handles passed in.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether no handles were resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Record for the handle at `index`, or `None` if out of range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NullPointer`], [`Error::InvalidUtf8`] or [`Error::Ffi`] if
    /// the native row cannot be read.
    pub fn get(&self, index: usize) -> Result<Option<Record>> {
        let Ok(i) = u32::try_from(index) else {
            return Ok(None);
        };
        if i >= self.len {
            return Ok(None);
        }
        let p = self.handle.as_ptr();
        let input = unsafe { read_borrowed(sys::imsg_contacts_result_input(p, i))? }
            .ok_or(Error::NullPointer)?;
        let raw_kind = unsafe { sys::imsg_contacts_result_match_kind(p, i) };
        Ok(Some(Record {
            input,
            name: unsafe { read_borrowed(sys::imsg_contacts_result_name(p, i))? },
            contact_id: unsafe { read_borrowed(sys::imsg_contacts_result_contact_id(p, i))? },
            canonical: unsafe { read_borrowed(sys::imsg_contacts_result_canonical(p, i))? },
            found: unsafe { sys::imsg_contacts_result_found(p, i) } != 0,
            ambiguous: unsafe { sys::imsg_contacts_result_ambiguous(p, i) } != 0,
            kind: MatchKind::from_ffi(raw_kind).ok_or_else(|| Error::Ffi {
                code: i32::from(raw_kind),
                message: "unknown match kind".into(),
            })?,
        }))
    }

    /// Iterate over all records in input order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Record>> + '_ {
        (0..self.len()).filter_map(|i| self.get(i).transpose())
    }

    /// Copy every record out.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`get`](Self::get).
    pub fn records(&self) -> Result<Vec<Record>> {
        self.iter().collect()
    }
}
