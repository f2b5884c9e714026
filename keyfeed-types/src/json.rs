//! Lenient JSON decoding for API responses.
//!
//! Database identifiers on the KeyFeed backend can exceed 15 significant
//! digits. Other consumers of the same payloads lose precision on them, so
//! the wire convention is to quote them before parsing: any object value that
//! is a bare integer of 16 or more digits becomes a string. Identifier types
//! in [`crate::ids`] accept both forms.
//!
//! If the rewrite produces text that no longer parses, the original text is
//! parsed as-is.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Minimum digit count for an integer to be quoted.
pub const LARGE_INT_DIGITS: usize = 16;

/// Quote object values that are integers with [`LARGE_INT_DIGITS`] or more
/// digits.
///
/// Only values directly following a `:` and terminated by `,`, `}` or `]`
/// (optionally after whitespace) are rewritten. String contents are left
/// untouched.
pub fn quote_large_integers(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;
    let mut copied = 0;
    let mut in_string = false;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        match b {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b':' => {
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                let start = j;
                if j < bytes.len() && bytes[j] == b'-' {
                    j += 1;
                }
                let digits_start = j;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                let digit_count = j - digits_start;
                let mut k = j;
                while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                let terminated = k < bytes.len() && matches!(bytes[k], b',' | b'}' | b']');

                if digit_count >= LARGE_INT_DIGITS && terminated {
                    out.push_str(&text[copied..start]);
                    out.push('"');
                    out.push_str(&text[start..j]);
                    out.push('"');
                    copied = j;
                }
                i = j.max(i + 1);
            }
            _ => i += 1,
        }
    }

    out.push_str(&text[copied..]);
    out
}

/// Parse `text` into a [`Value`], quoting large integers first.
pub fn parse_value(text: &str) -> Result<Value, serde_json::Error> {
    let sanitized = quote_large_integers(text);
    match serde_json::from_str(&sanitized) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_str(text),
    }
}

/// Parse `text` into `T`, quoting large integers first.
///
/// Falls back to parsing the original text when the rewritten text does not
/// deserialize.
pub fn from_str_lenient<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let sanitized = quote_large_integers(text);
    match serde_json::from_str(&sanitized) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_str(text),
    }
}
