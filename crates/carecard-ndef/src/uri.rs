//! URI record payloads: one prefix-code byte followed by the remainder.

/// URI prefix table, indexed by the first payload byte.
///
/// Only the first five NFC Forum codes are understood; anything else decodes
/// with an empty prefix.
pub const URI_PREFIXES: [&str; 5] = ["", "http://www.", "https://www.", "http://", "https://"];

/// Build a URI payload, abbreviating the longest matching prefix.
pub fn encode_payload(uri: &str) -> Vec<u8> {
    let (code, prefix) = URI_PREFIXES
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, prefix)| uri.starts_with(*prefix))
        .max_by_key(|(_, prefix)| prefix.len())
        .map(|(code, prefix)| (code as u8, *prefix))
        .unwrap_or((0, ""));

    let rest = &uri[prefix.len()..];
    let mut payload = Vec::with_capacity(1 + rest.len());
    payload.push(code);
    payload.extend_from_slice(rest.as_bytes());
    payload
}

/// Expand a URI payload back into the full URI.
pub fn decode_payload(payload: &[u8]) -> String {
    let Some((&code, rest)) = payload.split_first() else {
        return String::new();
    };
    let prefix = URI_PREFIXES.get(code as usize).copied().unwrap_or("");
    let mut uri = String::with_capacity(prefix.len() + rest.len());
    uri.push_str(prefix);
    uri.push_str(&String::from_utf8_lossy(rest));
    uri
}
