//! Core FFI infrastructure: error handling, return codes, string and handle helpers, logger.

use std::any::Any;
use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char};
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Return codes
// ---------------------------------------------------------------------------

/// Success.
pub const IMSG_OK: i32 = 0;
/// A pointer argument was null, a string was not UTF-8, or a value was out of range.
pub const IMSG_ERR_INVALID_ARGUMENT: i32 = -1;
/// Contacts access has not been granted.
pub const IMSG_ERR_NOT_AUTHORIZED: i32 = -2;
/// The contacts directory could not be loaded or queried.
pub const IMSG_ERR_STORE: i32 = -3;

/// Error raised inside an FFI body, carrying the code handed back to C.
#[derive(Debug)]
pub(crate) struct FfiError {
    pub(crate) code: i32,
    pub(crate) message: String,
}

impl FfiError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: IMSG_ERR_INVALID_ARGUMENT,
            message: message.into(),
        }
    }

    pub(crate) fn not_authorized() -> Self {
        Self {
            code: IMSG_ERR_NOT_AUTHORIZED,
            message: "contacts access not authorized".into(),
        }
    }
}

impl From<crate::store::StoreError> for FfiError {
    fn from(e: crate::store::StoreError) -> Self {
        Self {
            code: IMSG_ERR_STORE,
            message: e.to_string(),
        }
    }
}

pub(crate) type FfiResult<T> = Result<T, FfiError>;

// ---------------------------------------------------------------------------
// Thread-local error
// ---------------------------------------------------------------------------

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Store an error message for later retrieval.
pub(crate) fn set_last_error(msg: impl Into<String>) {
    LAST_ERROR.with(|e| *e.borrow_mut() = msg.into());
}

/// Clear the stored error message.
pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|e| e.borrow_mut().clear());
}

/// Get the length of the last error message (including NUL terminator).
/// Returns 0 if no error.
#[unsafe(no_mangle)]
pub extern "C" fn imsg_last_error_length() -> i32 {
    LAST_ERROR.with(|e| {
        let s = e.borrow();
        if s.is_empty() {
            0
        } else {
            i32::try_from(s.len() + 1).unwrap_or(i32::MAX)
        }
    })
}

/// Copy the last error message into `buf`. Returns bytes written (excluding NUL),
/// or -1 if `buf` is null or `buf_len` is not positive.
///
/// # Safety
///
/// `buf` must point to at least `buf_len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_last_error_message(buf: *mut c_char, buf_len: i32) -> i32 {
    if buf.is_null() || buf_len <= 0 {
        return -1;
    }
    LAST_ERROR.with(|e| {
        let s = e.borrow();
        let bytes = s.as_bytes();
        let copy_len = bytes.len().min(buf_len.unsigned_abs() as usize - 1);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), copy_len);
            *buf.add(copy_len) = 0;
        }
        i32::try_from(copy_len).unwrap_or(i32::MAX)
    })
}

// ---------------------------------------------------------------------------
// Error-catching wrapper
// ---------------------------------------------------------------------------

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Execute a closure, set thread-local error on failure, return code. A panic in
/// the closure is reported as [`IMSG_ERR_STORE`] instead of unwinding into C.
pub(crate) fn catch<F>(f: F) -> i32
where
    F: FnOnce() -> FfiResult<()>,
{
    let result = panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(FfiError {
            code: IMSG_ERR_STORE,
            message: format!("internal panic: {}", panic_message(payload.as_ref())),
        })
    });
    match result {
        Ok(()) => {
            clear_last_error();
            IMSG_OK
        }
        Err(e) => {
            tracing::debug!(code = e.code, error = %e.message, "ffi call failed");
            set_last_error(e.message);
            e.code
        }
    }
}

// ---------------------------------------------------------------------------
// String helpers
// ---------------------------------------------------------------------------

/// Convert a C string to an owned Rust `String`. Returns `Err` on null or invalid UTF-8.
pub(crate) unsafe fn c_str_to_string(s: *const c_char) -> FfiResult<String> {
    if s.is_null() {
        return Err(FfiError::invalid("null string pointer"));
    }
    unsafe { CStr::from_ptr(s) }
        .to_str()
        .map(str::to_owned)
        .map_err(|e| FfiError::invalid(format!("invalid UTF-8: {e}")))
}

/// Collect an array of `count` C strings into `Vec<String>`. Bytes that are not
/// UTF-8 are replaced with U+FFFD; only null pointers are rejected. A zero count
/// never dereferences `ptrs`.
pub(crate) unsafe fn collect_strings(
    ptrs: *const *const c_char,
    count: u32,
) -> FfiResult<Vec<String>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if ptrs.is_null() {
        return Err(FfiError::invalid("null handle array"));
    }
    (0..count as usize)
        .map(|i| {
            let item = unsafe { *ptrs.add(i) };
            if item.is_null() {
                return Err(FfiError::invalid(format!("null handle at index {i}")));
            }
            Ok(unsafe { CStr::from_ptr(item) }.to_string_lossy().into_owned())
        })
        .collect()
}

/// Build an owned C string, replacing interior NULs so the value is never lost.
pub(crate) fn owned_c_string(s: &str) -> CString {
    CString::new(s).unwrap_or_else(|_| {
        CString::new(s.replace('\0', "")).unwrap_or_default()
    })
}

/// Allocate a new C string from a Rust `&str`. Caller must free with [`imsg_free_string`].
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    owned_c_string(s).into_raw()
}

/// Free a string previously returned by this library.
///
/// # Safety
///
/// `s` must be null or a pointer obtained from this library that has not been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Library version string. Caller must free with [`imsg_free_string`].
#[unsafe(no_mangle)]
pub extern "C" fn imsg_version() -> *mut c_char {
    to_c_string(env!("CARGO_PKG_VERSION"))
}

// ---------------------------------------------------------------------------
// Handle helpers
// ---------------------------------------------------------------------------

/// Validate a pointer and create a reference. Returns `None` on null.
pub(crate) unsafe fn ref_from<'a, T>(ptr: *const T) -> Option<&'a T> {
    unsafe { ptr.as_ref() }
}

/// Box a value and write the raw pointer into an output parameter.
pub(crate) unsafe fn write_out<T>(out: *mut *mut T, val: T) -> FfiResult<()> {
    if out.is_null() {
        return Err(FfiError::invalid("null output pointer"));
    }
    unsafe {
        *out = Box::into_raw(Box::new(val));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Logger initialization
// ---------------------------------------------------------------------------

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the tracing logger. Only the first call has an effect. `level` is an
/// `EnvFilter` directive like "debug", "imsg_ffi=trace" or "off". Pass null for "info".
/// Returns 0 on success.
///
/// # Safety
///
/// `level` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn imsg_init_logger(level: *const c_char) -> i32 {
    let directive = if level.is_null() {
        "info".to_owned()
    } else {
        unsafe { CStr::from_ptr(level) }
            .to_str()
            .unwrap_or("info")
            .to_owned()
    };
    catch(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        LOGGER_INIT.get_or_init(|| {
            let filter = EnvFilter::builder().parse_lossy(&directive);
            // Another subscriber may already be installed by the host.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .try_init();
        });
        Ok(())
    })
}
