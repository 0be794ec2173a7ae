/// Trim surrounding whitespace from a field.
pub fn clean_field(raw: &str) -> String {
    raw.trim().to_string()
}

/// Uppercase and keep only `A-Z0-9`. Used for VINs and typed keys.
pub fn clean_vin(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Trailing `n` characters of an ASCII string (the whole string if shorter).
pub fn trailing(s: &str, n: usize) -> &str {
    let start = s.len().saturating_sub(n);
    &s[start..]
}

/// Renders a count with thousands separators, e.g. `12345` -> `12,345`.
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
