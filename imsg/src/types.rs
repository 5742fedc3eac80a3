//! SDK enumerations mirrored from the C ABI.

macro_rules! ffi_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident : $repr:ident {
        $($(#[$vm:meta])* $variant:ident = $val:expr),* $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr($repr)]
        $vis enum $name { $($(#[$vm])* $variant = $val),* }

        impl $name {
            /// Convert from the FFI value. Returns `None` for unknown values.
            #[must_use]
            pub fn from_ffi(v: $repr) -> Option<Self> {
                match v { $($val => Some(Self::$variant),)* _ => None }
            }
        }
    };
}

ffi_enum! {
    /// Whether the process may read the contacts directory.
    pub enum AuthStatus: i32 {
        /// Not asked yet; [`request_access`](crate::request_access) will decide.
        NotDetermined = 0,
        /// Refused or restricted.
        Denied = 1,
        /// Granted.
        Authorized = 2,
    }
}

ffi_enum! {
    /// Identifier type a handle was classified as.
    pub enum MatchKind: u8 {
        /// Blank handle.
        None = 0,
        /// Phone number.
        Phone = 1,
        /// Email address.
        Email = 2,
        /// Any other messaging identifier.
        InstantMessage = 3,
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotDetermined => "not determined",
            Self::Denied => "denied",
            Self::Authorized => "authorized",
        })
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::InstantMessage => "im",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_ffi_rejects_unknown_values() {
        assert_eq!(AuthStatus::from_ffi(2), Some(AuthStatus::Authorized));
        assert_eq!(AuthStatus::from_ffi(3), None);
        assert_eq!(AuthStatus::from_ffi(-1), None);
        assert_eq!(MatchKind::from_ffi(3), Some(MatchKind::InstantMessage));
        assert_eq!(MatchKind::from_ffi(4), None);
    }
}
