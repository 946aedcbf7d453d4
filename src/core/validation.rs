//! Wallet address validation
//!
//! Addresses are EVM style: `0x` followed by 40 hex digits. Hex digits are
//! accepted in either case; comparisons elsewhere are case-insensitive.

use lazy_regex::regex_is_match;

/// Validates an EVM wallet address.
///
/// Matches exactly `0x` + 40 characters from `[0-9a-fA-F]`. Surrounding
/// whitespace is not tolerated; callers trim user input first.
///
/// # Examples
/// ```
/// use walletlist::core::validation::is_valid_address;
///
/// assert!(is_valid_address("0x1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1"));
/// assert!(!is_valid_address("1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1"));
/// assert!(!is_valid_address(" 0x1aD2B053b8c6b1592cB645DEfadf105F34d8C6e1"));
/// ```
pub fn is_valid_address(s: &str) -> bool {
    regex_is_match!(r"^0x[0-9a-fA-F]{40}$", s)
}

/// Normalizes raw chat input before validation: trims it and lowercases an
/// uppercase `0X` prefix. Hex digits are kept as typed.
pub fn normalize_address_input(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("0X") {
        Some(rest) => format!("0x{}", rest),
        None => trimmed.to_string(),
    }
}

/// Case-insensitive address equality.
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
