#![allow(unsafe_code)]
//! Unified error types for the contacts SDK.

use std::ffi::CStr;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the contacts SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Contacts access has not been granted.
    #[error("contacts access not authorized")]
    NotAuthorized,

    /// An argument was rejected, either here or by the native library.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The contacts directory could not be loaded or queried.
    #[error("contacts store: {0}")]
    Store(String),

    /// Any other failure reported by the native library.
    #[error("imsg ffi ({code}): {message}")]
    Ffi {
        /// Return code from the native call.
        code: i32,
        /// Message read from the native last-error slot.
        message: String,
    },

    /// A returned pointer was unexpectedly null.
    #[error("unexpected null pointer from FFI")]
    NullPointer,

    /// A string received from FFI contained invalid UTF-8.
    #[error("invalid UTF-8 in FFI string")]
    InvalidUtf8,
}

/// Read the last FFI error message from thread-local storage.
pub(crate) fn last_ffi_message() -> String {
    let len = imsg_ffi::imsg_last_error_length();
    if len <= 0 {
        return "unknown FFI error".into();
    }
    let mut buf = vec![0u8; len.unsigned_abs() as usize];
    let written = unsafe { imsg_ffi::imsg_last_error_message(buf.as_mut_ptr().cast(), len) };
    if written < 0 {
        return "failed to read FFI error".into();
    }
    CStr::from_bytes_until_nul(&buf).map_or_else(
        |_| String::from_utf8_lossy(&buf[..written.unsigned_abs() as usize]).into_owned(),
        |cstr| cstr.to_string_lossy().into_owned(),
    )
}

/// Check an FFI return code. `0` = success.
#[inline]
pub(crate) fn check(rc: i32) -> Result<()> {
    match rc {
        imsg_ffi::IMSG_OK => Ok(()),
        imsg_ffi::IMSG_ERR_NOT_AUTHORIZED => Err(Error::NotAuthorized),
        imsg_ffi::IMSG_ERR_INVALID_ARGUMENT => Err(Error::InvalidArgument(last_ffi_message())),
        imsg_ffi::IMSG_ERR_STORE => Err(Error::Store(last_ffi_message())),
        code => Err(Error::Ffi {
            code,
            message: last_ffi_message(),
        }),
    }
}
