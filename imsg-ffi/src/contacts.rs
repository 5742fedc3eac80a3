//! Contacts authorization, handle resolution, and result accessors.

use std::ffi::{CString, c_char};
use std::path::PathBuf;
use std::ptr;
use std::sync::Arc;

use crate::ffi::*;
use crate::resolve::{Record, resolve_handle};
use crate::store::{self, AuthStatus, Directory, MemoryStore};

// ---------------------------------------------------------------------------
// Opaque result
// ---------------------------------------------------------------------------

/// One resolved handle with its strings held as C strings, so accessors can lend
/// pointers that live as long as the result.
#[derive(Debug)]
struct Row {
    input: CString,
    name: Option<CString>,
    contact_id: Option<CString>,
    canonical: Option<CString>,
    found: u8,
    ambiguous: u8,
    kind: u8,
}

impl From<Record> for Row {
    fn from(r: Record) -> Self {
        Self {
            input: owned_c_string(&r.input),
            name: r.name.as_deref().map(owned_c_string),
            contact_id: r.contact_id.as_deref().map(owned_c_string),
            canonical: r.canonical.as_deref().map(owned_c_string),
            found: u8::from(r.found),
            ambiguous: u8::from(r.ambiguous),
            kind: r.kind.to_ffi(),
        }
    }
}

/// Opaque resolve result: one row per input handle, in input order.
/// Free with [`imsg_contacts_result_free`].
#[derive(Debug)]
pub struct ImsgContactsResult {
    rows: Vec<Row>,
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Current contacts authorization: 0 = not determined, 1 = denied, 2 = authorized.
#[unsafe(no_mangle)]
pub extern "C" fn imsg_contacts_auth_status() -> i32 {
    store::current().authorization_status().to_ffi()
}

/// Ask for contacts access if it has not been decided yet, blocking until the
/// answer is known. Returns the resulting status (same encoding as
/// [`imsg_contacts_auth_status`]).
#[unsafe(no_mangle)]
pub extern "C" fn imsg_contacts_request_access() -> i32 {
    let store = store::current();
    let status = store.authorization_status();
    if status != AuthStatus::NotDetermined {
        return status.to_ffi();
    }
    tracing::debug!("requesting contacts access");
    store.request_access().to_ffi()
}

// ---------------------------------------------------------------------------
// Directory configuration
// ---------------------------------------------------------------------------

fn install_directory(dir: Directory) {
    tracing::info!(
        contacts = dir.contacts.len(),
        authorization = ?dir.authorization,
        "installed contacts directory"
    );
    store::install(Arc::new(MemoryStore::from(dir)));
}

/// Replace the contacts directory with the JSON file at `path`.
/// Returns 0 on success, -1 on a bad argument, -3 if the file cannot be loaded.
///
/// # Safety
///
/// `path` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_load_directory(path: *const c_char) -> i32 {
    catch(|| {
        let path = PathBuf::from(unsafe { c_str_to_string(path)? });
        install_directory(Directory::load(&path)?);
        Ok(())
    })
}

/// Replace the contacts directory with one parsed from JSON text.
/// Returns 0 on success, -1 on a bad argument, -3 if the text does not parse.
///
/// # Safety
///
/// `json` must be a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_load_directory_json(json: *const c_char) -> i32 {
    catch(|| {
        let text = unsafe { c_str_to_string(json)? };
        install_directory(Directory::from_json(&text)?);
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

/// Resolve `count` handles to contacts. On success writes a new result to `out`
/// (free with [`imsg_contacts_result_free`]) holding exactly `count` rows in input
/// order, and returns 0.
///
/// `flags` is reserved; it is accepted and passed through without effect.
///
/// Handles that are not valid UTF-8 are decoded lossily and still get a row.
///
/// Errors: -1 for a null `out`, null `handles` with `count > 0`, or a null
/// handle; -2 when contacts access is not authorized; -3 when the directory fails
/// a query or panics. `*out` is null after any error.
///
/// # Safety
///
/// `handles` must point to `count` NUL-terminated strings and `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_resolve(
    handles: *const *const c_char,
    count: u32,
    flags: u32,
    out: *mut *mut ImsgContactsResult,
) -> i32 {
    catch(|| {
        if out.is_null() {
            return Err(FfiError::invalid("null output pointer"));
        }
        unsafe { *out = ptr::null_mut() };

        let store = store::current();
        if store.authorization_status() != AuthStatus::Authorized {
            return Err(FfiError::not_authorized());
        }

        let inputs = unsafe { collect_strings(handles, count)? };
        tracing::debug!(count, flags, "resolving handles");

        let rows = inputs
            .iter()
            .map(|raw| resolve_handle(store.as_ref(), raw).map(Row::from))
            .collect::<Result<Vec<_>, _>>()?;

        let found = rows.iter().filter(|r| r.found != 0).count();
        tracing::debug!(count, found, "resolved handles");
        unsafe { write_out(out, ImsgContactsResult { rows }) }
    })
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

unsafe fn row_at<'a>(result: *const ImsgContactsResult, index: u32) -> Option<&'a Row> {
    let r = unsafe { ref_from(result)? };
    r.rows.get(index as usize)
}

/// Number of rows in a result. Returns 0 for null.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_count(result: *const ImsgContactsResult) -> u32 {
    unsafe { ref_from(result) }.map_or(0, |r| u32::try_from(r.rows.len()).unwrap_or(u32::MAX))
}

fn opt_ptr(s: Option<&CString>) -> *const c_char {
    s.map_or(ptr::null(), |c| c.as_ptr())
}

/// The handle at `index` exactly as passed to resolve. The pointer is owned by the
/// result; null if `index` is out of range.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_input(
    result: *const ImsgContactsResult,
    index: u32,
) -> *const c_char {
    unsafe { row_at(result, index) }.map_or(ptr::null(), |row| row.input.as_ptr())
}

/// Display name of the matched contact. Null when not found or out of range.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_name(
    result: *const ImsgContactsResult,
    index: u32,
) -> *const c_char {
    unsafe { row_at(result, index) }.map_or(ptr::null(), |row| opt_ptr(row.name.as_ref()))
}

/// Identifier of the matched contact. Null when not found or out of range.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_contact_id(
    result: *const ImsgContactsResult,
    index: u32,
) -> *const c_char {
    unsafe { row_at(result, index) }.map_or(ptr::null(), |row| opt_ptr(row.contact_id.as_ref()))
}

/// Canonical form of a matched handle. Null when not found or out of range.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_canonical(
    result: *const ImsgContactsResult,
    index: u32,
) -> *const c_char {
    unsafe { row_at(result, index) }.map_or(ptr::null(), |row| opt_ptr(row.canonical.as_ref()))
}

/// 1 if a contact matched the handle at `index`, else 0.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_found(
    result: *const ImsgContactsResult,
    index: u32,
) -> u8 {
    unsafe { row_at(result, index) }.map_or(0, |row| row.found)
}

/// 1 if more than one contact matched the handle at `index`, else 0.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_ambiguous(
    result: *const ImsgContactsResult,
    index: u32,
) -> u8 {
    unsafe { row_at(result, index) }.map_or(0, |row| row.ambiguous)
}

/// Handle classification: 0 = none, 1 = phone, 2 = email, 3 = instant message.
/// 0 for a null result or out-of-range index.
///
/// # Safety
///
/// `result` must be null or a live result from [`imsg_contacts_resolve`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_match_kind(
    result: *const ImsgContactsResult,
    index: u32,
) -> u8 {
    unsafe { row_at(result, index) }.map_or(0, |row| row.kind)
}

/// Release a result and every string borrowed from it. Null is a no-op.
///
/// # Safety
///
/// `result` must be null or come from [`imsg_contacts_resolve`] and not have been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_contacts_result_free(result: *mut ImsgContactsResult) {
    if !result.is_null() {
        drop(unsafe { Box::from_raw(result) });
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;
    use crate::store::{Contact, TEST_LOCK};

    fn lock() -> std::sync::MutexGuard<'static, ()> {
        TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn authorized_with(contacts: Vec<Contact>) {
        store::install(Arc::new(MemoryStore::new(AuthStatus::Authorized, contacts)));
    }

    fn ann() -> Contact {
        Contact {
            id: "ANN-1".into(),
            given_name: "Ann".into(),
            family_name: "Lee".into(),
            phones: vec!["+1 555 123 4567".into()],
            ..Contact::default()
        }
    }

    unsafe fn text(p: *const c_char) -> Option<String> {
        (!p.is_null()).then(|| unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_owned())
    }

    fn resolve(handles: &[&str]) -> (i32, *mut ImsgContactsResult) {
        let owned: Vec<CString> = handles.iter().map(|h| CString::new(*h).unwrap()).collect();
        let ptrs: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();
        let mut out = ptr::null_mut();
        let rc = unsafe {
            imsg_contacts_resolve(ptrs.as_ptr(), u32::try_from(ptrs.len()).unwrap(), 0, &mut out)
        };
        (rc, out)
    }

    #[test]
    fn single_handle_round_trip() {
        let _g = lock();
        authorized_with(vec![ann()]);

        let (rc, res) = resolve(&["+15551234567"]);
        assert_eq!(rc, IMSG_OK);
        unsafe {
            assert_eq!(imsg_contacts_result_count(res), 1);
            assert_eq!(text(imsg_contacts_result_input(res, 0)).as_deref(), Some("+15551234567"));
            assert_eq!(text(imsg_contacts_result_name(res, 0)).as_deref(), Some("Ann Lee"));
            assert_eq!(text(imsg_contacts_result_contact_id(res, 0)).as_deref(), Some("ANN-1"));
            assert_eq!(text(imsg_contacts_result_canonical(res, 0)).as_deref(), Some("+15551234567"));
            assert_eq!(imsg_contacts_result_found(res, 0), 1);
            assert_eq!(imsg_contacts_result_ambiguous(res, 0), 0);
            assert_eq!(imsg_contacts_result_match_kind(res, 0), 1);
            imsg_contacts_result_free(res);
        }
    }

    #[test]
    fn rows_follow_input_order_and_unfound_fields_are_null() {
        let _g = lock();
        authorized_with(vec![ann()]);

        let inputs = ["someone@else.org", "+1 555 123 4567", "gamer_tag", ""];
        let (rc, res) = resolve(&inputs);
        assert_eq!(rc, IMSG_OK);
        unsafe {
            assert_eq!(imsg_contacts_result_count(res), 4);
            for (i, input) in inputs.iter().enumerate() {
                let i = u32::try_from(i).unwrap();
                assert_eq!(text(imsg_contacts_result_input(res, i)).as_deref(), Some(*input));
                if imsg_contacts_result_found(res, i) == 0 {
                    assert!(imsg_contacts_result_name(res, i).is_null());
                    assert!(imsg_contacts_result_contact_id(res, i).is_null());
                    assert!(imsg_contacts_result_canonical(res, i).is_null());
                }
            }
            assert_eq!(imsg_contacts_result_found(res, 1), 1);
            assert_eq!(imsg_contacts_result_match_kind(res, 0), 2);
            assert_eq!(imsg_contacts_result_match_kind(res, 2), 3);
            assert_eq!(imsg_contacts_result_match_kind(res, 3), 0);
            imsg_contacts_result_free(res);
        }
    }

    #[test]
    fn out_of_range_and_null_results_are_inert() {
        let _g = lock();
        authorized_with(Vec::new());

        let (rc, res) = resolve(&[]);
        assert_eq!(rc, IMSG_OK);
        assert!(!res.is_null());
        unsafe {
            assert_eq!(imsg_contacts_result_count(res), 0);
            assert!(imsg_contacts_result_input(res, 0).is_null());
            assert_eq!(imsg_contacts_result_found(res, 7), 0);
            imsg_contacts_result_free(res);

            assert_eq!(imsg_contacts_result_count(ptr::null()), 0);
            assert!(imsg_contacts_result_name(ptr::null(), 0).is_null());
            assert_eq!(imsg_contacts_result_match_kind(ptr::null(), 0), 0);
            imsg_contacts_result_free(ptr::null_mut());
        }
    }

    #[test]
    fn invalid_arguments() {
        let _g = lock();
        authorized_with(Vec::new());

        let rc = unsafe { imsg_contacts_resolve(ptr::null(), 0, 0, ptr::null_mut()) };
        assert_eq!(rc, IMSG_ERR_INVALID_ARGUMENT);

        let mut out = ptr::null_mut();
        let rc = unsafe { imsg_contacts_resolve(ptr::null(), 2, 0, &mut out) };
        assert_eq!(rc, IMSG_ERR_INVALID_ARGUMENT);
        assert!(out.is_null());
        assert!(imsg_last_error_length() > 0);

        let a = CString::new("a@b.c").unwrap();
        let ptrs = [a.as_ptr(), ptr::null()];
        let rc = unsafe { imsg_contacts_resolve(ptrs.as_ptr(), 2, 0, &mut out) };
        assert_eq!(rc, IMSG_ERR_INVALID_ARGUMENT);
        assert!(out.is_null());
    }

    #[test]
    fn non_utf8_handles_still_get_rows() {
        let _g = lock();
        authorized_with(vec![ann()]);

        let good = CString::new("+15551234567").unwrap();
        let latin1: [c_char; 6] = [
            b'J' as c_char,
            b'o' as c_char,
            0xE9_u8 as c_char,
            b'_' as c_char,
            b'x' as c_char,
            0,
        ];
        let ptrs = [good.as_ptr(), latin1.as_ptr()];
        let mut out = ptr::null_mut();
        let rc = unsafe { imsg_contacts_resolve(ptrs.as_ptr(), 2, 0, &mut out) };
        assert_eq!(rc, IMSG_OK);
        unsafe {
            assert_eq!(imsg_contacts_result_count(out), 2);
            assert_eq!(imsg_contacts_result_found(out, 0), 1);
            assert_eq!(text(imsg_contacts_result_name(out, 0)).as_deref(), Some("Ann Lee"));
            assert_eq!(text(imsg_contacts_result_input(out, 1)).as_deref(), Some("Jo\u{FFFD}_x"));
            assert_eq!(imsg_contacts_result_found(out, 1), 0);
            assert_eq!(imsg_contacts_result_match_kind(out, 1), 3);
            imsg_contacts_result_free(out);
        }
    }

    struct Exploding;

    impl store::ContactStore for Exploding {
        fn authorization_status(&self) -> AuthStatus {
            AuthStatus::Authorized
        }

        fn request_access(&self) -> AuthStatus {
            AuthStatus::Authorized
        }

        fn for_each_contact(
            &self,
            _visit: &mut dyn FnMut(&Contact) -> std::ops::ControlFlow<()>,
        ) -> Result<(), store::StoreError> {
            panic!("contacts backend crashed");
        }
    }

    #[test]
    fn panicking_store_reports_store_error() {
        let _g = lock();
        store::install(Arc::new(Exploding));

        let (rc, res) = resolve(&["a@b.c"]);
        assert_eq!(rc, IMSG_ERR_STORE);
        assert!(res.is_null());
        let len = imsg_last_error_length();
        let mut buf = vec![0 as c_char; usize::try_from(len).unwrap()];
        unsafe { imsg_last_error_message(buf.as_mut_ptr(), len) };
        let msg = unsafe { text(buf.as_ptr()) }.unwrap();
        assert!(msg.contains("contacts backend crashed"), "{msg}");

        // The library keeps working afterwards.
        authorized_with(vec![ann()]);
        let (rc, res) = resolve(&["+15551234567"]);
        assert_eq!(rc, IMSG_OK);
        unsafe { imsg_contacts_result_free(res) };
    }

    #[test]
    fn concurrent_resolves_survive_store_swaps() {
        let _g = lock();
        authorized_with(vec![ann()]);

        let inputs = ["+15551234567", "ann@example.com", "gamer_tag", ""];
        std::thread::scope(|s| {
            let resolvers: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        for _ in 0..200 {
                            let (rc, res) = resolve(&inputs);
                            assert_eq!(rc, IMSG_OK);
                            let count = unsafe { imsg_contacts_result_count(res) };
                            unsafe { imsg_contacts_result_free(res) };
                            assert_eq!(count as usize, inputs.len());
                        }
                    })
                })
                .collect();
            s.spawn(|| {
                for i in 0..200 {
                    let contacts = if i % 2 == 0 { vec![ann()] } else { Vec::new() };
                    authorized_with(contacts);
                }
            });
            for r in resolvers {
                r.join().unwrap();
            }
        });
    }

    #[test]
    fn authorization_gates_resolve() {
        let _g = lock();
        store::install(Arc::new(MemoryStore::default().grant_on_request(false)));

        assert_eq!(imsg_contacts_auth_status(), 0);
        let (rc, res) = resolve(&["a@b.c"]);
        assert_eq!(rc, IMSG_ERR_NOT_AUTHORIZED);
        assert!(res.is_null());

        assert_eq!(imsg_contacts_request_access(), 1);
        assert_eq!(imsg_contacts_auth_status(), 1);
        assert_eq!(imsg_contacts_request_access(), 1);

        store::install(Arc::new(MemoryStore::default()));
        assert_eq!(imsg_contacts_request_access(), 2);
        let (rc, res) = resolve(&["a@b.c"]);
        assert_eq!(rc, IMSG_OK);
        unsafe { imsg_contacts_result_free(res) };
    }

    #[test]
    fn load_directory_from_json_and_file() {
        let _g = lock();
        let json = CString::new(
            r#"{"authorization": "authorized", "contacts": [{"id": "z", "nickname": "Zed", "emails": ["z@z.io"]}]}"#,
        )
        .unwrap();
        assert_eq!(unsafe { imsg_contacts_load_directory_json(json.as_ptr()) }, IMSG_OK);
        assert_eq!(imsg_contacts_auth_status(), 2);
        let (_, res) = resolve(&["Z@Z.io"]);
        unsafe {
            assert_eq!(text(imsg_contacts_result_name(res, 0)).as_deref(), Some("Zed"));
            imsg_contacts_result_free(res);
        }

        let bad = CString::new("{not json").unwrap();
        assert_eq!(unsafe { imsg_contacts_load_directory_json(bad.as_ptr()) }, IMSG_ERR_STORE);
        // A failed load keeps the previous directory.
        assert_eq!(imsg_contacts_auth_status(), 2);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("directory.json");
        std::fs::write(&path, r#"{"authorization": "denied"}"#).unwrap();
        let c_path = CString::new(path.to_str().unwrap()).unwrap();
        assert_eq!(unsafe { imsg_contacts_load_directory(c_path.as_ptr()) }, IMSG_OK);
        assert_eq!(imsg_contacts_auth_status(), 1);

        let missing = CString::new(tmp.path().join("gone.json").to_str().unwrap()).unwrap();
        assert_eq!(unsafe { imsg_contacts_load_directory(missing.as_ptr()) }, IMSG_ERR_STORE);
        assert_eq!(unsafe { imsg_contacts_load_directory(ptr::null()) }, IMSG_ERR_INVALID_ARGUMENT);
    }
}
