pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// `XXX-XX-XXXX` when the input holds exactly nine digits, else unchanged.
pub fn format_ssn(raw: &str) -> String {
    let d = digits(raw);
    if d.len() == 9 {
        format!("{}-{}-{}", &d[0..3], &d[3..5], &d[5..9])
    } else {
        raw.to_string()
    }
}

/// `XX-XXXXXXX` when the input holds exactly nine digits, else unchanged.
pub fn format_ein(raw: &str) -> String {
    let d = digits(raw);
    if d.len() == 9 {
        format!("{}-{}", &d[0..2], &d[2..9])
    } else {
        raw.to_string()
    }
}

/// Two decimals with `$` and thousands separators removed; unparseable
/// amounts are returned unchanged.
pub fn format_currency(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => format!("{:.2}", amount),
        _ => raw.to_string(),
    }
}
