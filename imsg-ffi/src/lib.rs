//! `imsg-ffi` — C ABI for resolving messaging handles to contacts.
//!
//! Design principles:
//! - Fallible functions return `i32` (0 = ok, negative = error) unless they return a primitive.
//! - Errors are stored in a thread-local string, retrieved via [`imsg_last_error_message`].
//! - The resolve result is a heap-allocated `Box` behind `*mut T` with an explicit `_free` function.
//! - Strings read out of a result are borrowed from it and stay valid until it is freed.
//! - The contacts directory is a process-wide [`ContactStore`] that callers may replace.

#![allow(unsafe_code)]

mod ffi;

pub mod contacts;
pub mod handle;
pub mod resolve;
pub mod store;

pub use contacts::ImsgContactsResult;
pub use ffi::{
    IMSG_ERR_INVALID_ARGUMENT, IMSG_ERR_NOT_AUTHORIZED, IMSG_ERR_STORE, IMSG_OK, imsg_free_string,
    imsg_init_logger, imsg_last_error_length, imsg_last_error_message, imsg_version,
};
pub use handle::{MatchKind, canonicalize, classify};
pub use resolve::{Record, resolve_handle};
pub use store::{AuthStatus, Contact, ContactStore, Directory, MemoryStore, StoreError};

// Re-export shared helpers so every module can use them without `crate::ffi::` prefix.
#[allow(unused_imports)]
pub(crate) use ffi::*;
