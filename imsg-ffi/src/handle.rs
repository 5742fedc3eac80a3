//! Handle classification and canonical forms.

/// Which identifier type a handle is, and therefore which contact field it can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MatchKind {
    /// Empty handle; nothing to match.
    #[default]
    None = 0,
    /// Phone number.
    Phone = 1,
    /// Email address.
    Email = 2,
    /// Any other messaging identifier.
    InstantMessage = 3,
}

impl MatchKind {
    /// Value exposed across the C ABI.
    #[must_use]
    pub const fn to_ffi(self) -> u8 {
        self as u8
    }
}

const PHONE_SCHEMES: [&str; 3] = ["tel:", "sms:", "imessage:"];
const MAILTO: &str = "mailto:";

/// Case-insensitive ASCII prefix strip.
#[must_use]
pub fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | ' ' | '(' | ')' | '-' | '.')
}

/// Classify a raw handle.
///
/// Email wins over phone: `mailto:` or any `@` makes an email. A `tel:`, `sms:` or
/// `imessage:` scheme makes a phone, as does a value made only of digits and dial
/// punctuation. Blank input is [`MatchKind::None`]; everything else is an IM handle.
#[must_use]
pub fn classify(raw: &str) -> MatchKind {
    if strip_prefix_ci(raw, MAILTO).is_some() || raw.contains('@') {
        return MatchKind::Email;
    }
    if PHONE_SCHEMES
        .iter()
        .any(|scheme| strip_prefix_ci(raw, scheme).is_some())
    {
        return MatchKind::Phone;
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        MatchKind::None
    } else if trimmed.chars().all(is_phone_char) {
        MatchKind::Phone
    } else {
        MatchKind::InstantMessage
    }
}

/// Reduce a phone number to its digits, keeping a `+` only in leading position.
#[must_use]
pub fn phone_digits(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c.is_ascii_digit() || (c == '+' && out.is_empty()) {
            out.push(c);
        }
    }
    out
}

/// Canonical form of `raw` for the given kind.
#[must_use]
pub fn canonicalize(raw: &str, kind: MatchKind) -> String {
    let trimmed = raw.trim();
    match kind {
        MatchKind::Email => strip_prefix_ci(trimmed, MAILTO)
            .unwrap_or(trimmed)
            .to_lowercase(),
        MatchKind::Phone => {
            let number = PHONE_SCHEMES
                .iter()
                .find_map(|scheme| strip_prefix_ci(trimmed, scheme))
                .unwrap_or(trimmed);
            phone_digits(number)
        }
        MatchKind::InstantMessage | MatchKind::None => trimmed.to_owned(),
    }
}
