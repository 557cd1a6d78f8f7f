//! Payload decoding and weight extraction
//!
//! The scale emits compact ASCII payloads such as `RTW:0.650 kg` or
//! `1.282KG`. [`decode_payload`] turns raw packet bytes into trimmed
//! text; [`extract_weight`] scans that text for a weight token. Both are
//! pure and total: garbage input yields `None`, never a panic.

/// Decode raw payload bytes into trimmed text
///
/// Bytes are read up to the first embedded NUL terminator and decoded
/// lossily as UTF-8. Returns `None` when nothing remains after trimming
/// surrounding whitespace; readings are never constructed from empty
/// payloads.
pub fn decode_payload(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text = String::from_utf8_lossy(&bytes[..end]);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Extract the weight digits from a payload
///
/// Scans anywhere in `text` for a decimal number followed by an optional
/// run of whitespace and a case-insensitive `kg` suffix; the optional
/// `RTW:` protocol tag needs no special handling since the number is
/// matched directly. Returns the matched digit sequence (digits with at
/// most one interior dot), leaving numeric conversion to the caller.
///
/// `extract_weight("RTW:0.650 kg")` is `Some("0.650")`;
/// `extract_weight("1.282KG")` is `Some("1.282")`;
/// anything without a recognizable token is `None`.
pub fn extract_weight(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        // Integer part
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }

        // Optional fraction: a dot only counts with digits after it
        let mut end = i;
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            end = i;
        }

        // Optional whitespace, then the unit suffix
        let mut j = end;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j + 1 < bytes.len()
            && bytes[j].eq_ignore_ascii_case(&b'k')
            && bytes[j + 1].eq_ignore_ascii_case(&b'g')
        {
            return Some(&text[start..end]);
        }

        // No suffix after this number; resume scanning past it
    }

    None
}
