//! Stable per-function identity.
//!
//! A [`FunctionHash`] names a compiled function independently of where it was
//! loaded from, so an allow-list written for one run keeps matching the same
//! functions in the next.

use std::{fmt, str::FromStr};

use sha1::{Digest, Sha1};

use crate::Error;

/// A 32-bit function identity derived from the SHA-1 digest of the function's
/// source text.
///
/// The identity is the first four digest bytes read big-endian, and displays
/// as eight lowercase hex digits.
///
/// # Examples
///
/// ```rust,ignore
/// use dfg_unroll::utils::FunctionHash;
///
/// let hash = FunctionHash::from_source("abc");
/// assert_eq!(hash.to_string(), "a9993e36");
/// assert_eq!("a9993e36".parse::<FunctionHash>().unwrap(), hash);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionHash(u32);

impl FunctionHash {
    /// Computes the identity of a function from its source text.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(source.as_bytes());
        let digest = hasher.finalize();
        FunctionHash(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    /// Wraps a raw identity value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        FunctionHash(value)
    }

    /// Returns the raw identity value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FunctionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl FromStr for FunctionHash {
    type Err = Error;

    /// Parses exactly eight hex digits, either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Config(format!(
                "invalid function hash '{s}': expected 8 hex digits"
            )));
        }
        u32::from_str_radix(s, 16)
            .map(FunctionHash)
            .map_err(|e| Error::Config(format!("invalid function hash '{s}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        // SHA-1("") = da39a3ee..., SHA-1("abc") = a9993e36...
        assert_eq!(FunctionHash::from_source("").value(), 0xda39_a3ee);
        assert_eq!(FunctionHash::from_source("abc").to_string(), "a9993e36");
    }

    #[test]
    fn test_display_pads_to_eight_digits() {
        assert_eq!(FunctionHash::from_raw(0x1f).to_string(), "0000001f");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "DA39A3EE".parse::<FunctionHash>().unwrap(),
            FunctionHash::from_raw(0xda39_a3ee)
        );
        assert!("da39a3e".parse::<FunctionHash>().is_err());
        assert!("da39a3eeff".parse::<FunctionHash>().is_err());
        assert!("+a39a3ee".parse::<FunctionHash>().is_err());
        assert!(matches!(
            "zzzzzzzz".parse::<FunctionHash>(),
            Err(Error::Config(_))
        ));
    }
}
