//! Numeric and character literal decoding.
//!
//! Token slices keep their source spelling (prefix and suffix included);
//! these helpers turn them into values for the evaluators. Malformed or
//! overflowing literals decode to 0 — the lexer has already diagnosed
//! anything worth diagnosing.

/// Decode a decimal, hex (`0x`), or octal (leading `0`) integer literal,
/// ignoring any trailing suffix letters (`u`, `l`, `ull`, ...).
pub fn parse_int_literal(text: &str) -> i64 {
    let bytes = text.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' && (bytes[1] | 0x20) == b'x' {
        let digits: String = text[2..]
            .chars()
            .take_while(char::is_ascii_hexdigit)
            .collect();
        u64::from_str_radix(&digits, 16).map(|v| v as i64).unwrap_or(0)
    } else if bytes.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit() {
        let digits: String = text[1..]
            .chars()
            .take_while(|c| ('0'..='7').contains(c))
            .collect();
        u64::from_str_radix(&digits, 8).map(|v| v as i64).unwrap_or(0)
    } else {
        let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u64>().map(|v| v as i64).unwrap_or(0)
    }
}

/// Decode a character literal (quotes included in the slice) to its
/// integer value. Handles the common escapes; unknown escapes decode to
/// the escaped byte itself.
pub fn parse_char_literal(text: &str) -> i64 {
    let inner = text.strip_prefix('\'').unwrap_or(text);
    let inner = inner.strip_suffix('\'').unwrap_or(inner);
    let mut chars = inner.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some('n') => 10,
            Some('t') => 9,
            Some('r') => 13,
            Some('0') => 0,
            Some('\\') => 92,
            Some('\'') => 39,
            Some('"') => 34,
            Some('x') => {
                let digits: String = chars.take_while(char::is_ascii_hexdigit).collect();
                i64::from_str_radix(&digits, 16).unwrap_or(0)
            }
            Some(c) => c as i64,
            None => 0,
        },
        Some(c) => c as i64,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_with_suffix() {
        assert_eq!(parse_int_literal("42"), 42);
        assert_eq!(parse_int_literal("42ull"), 42);
        assert_eq!(parse_int_literal("0"), 0);
    }

    #[test]
    fn hex_and_octal() {
        assert_eq!(parse_int_literal("0x1F"), 31);
        assert_eq!(parse_int_literal("0XffUL"), 255);
        assert_eq!(parse_int_literal("0777"), 511);
    }

    #[test]
    fn malformed_decodes_to_zero() {
        assert_eq!(parse_int_literal(""), 0);
        assert_eq!(parse_int_literal("0x"), 0);
    }

    #[test]
    fn char_literals() {
        assert_eq!(parse_char_literal("'a'"), 97);
        assert_eq!(parse_char_literal("'\\n'"), 10);
        assert_eq!(parse_char_literal("'\\0'"), 0);
        assert_eq!(parse_char_literal("'\\x41'"), 65);
    }
}
