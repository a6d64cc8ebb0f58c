//! Address helpers
//!
//! Chain addresses are hex strings whose letter case carries no identity
//! (checksummed and lowercase forms name the same account).

/// Canonical lowercase form of an address
pub fn normalize(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Case-insensitive address equality; empty addresses never match
pub fn addresses_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}
