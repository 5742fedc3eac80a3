#![doc = include_str!("../README.md")]
#![allow(unsafe_code)]

pub mod contacts;
pub mod error;
pub mod lookup;
pub mod types;

mod ffi;

// Re-export core public API at crate root.
pub use contacts::{Record, Resolution};
pub use error::{Error, Result};
pub use lookup::ContactLookup;
pub use types::{AuthStatus, MatchKind};

// Re-export standalone functions.
pub use contacts::{
    auth_status, init_logger, load_directory, load_directory_json, request_access, resolve,
    resolve_with_flags, version,
};
