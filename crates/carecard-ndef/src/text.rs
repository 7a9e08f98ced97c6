//! Well-known Text record payloads.

/// Language written into every text record we produce.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Status byte mask for the language code length.
const LANGUAGE_LEN_MASK: u8 = 0x3F;

/// Build a UTF-8 text payload: status byte, language code, text.
pub fn encode_payload(text: &str) -> Vec<u8> {
    let lang = DEFAULT_LANGUAGE.as_bytes();
    let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
    payload.push(lang.len() as u8 & LANGUAGE_LEN_MASK);
    payload.extend_from_slice(lang);
    payload.extend_from_slice(text.as_bytes());
    payload
}

/// Extract the text from a text payload, skipping the language code.
///
/// The encoding bit is ignored and the body is always read as UTF-8.
pub fn decode_payload(payload: &[u8]) -> String {
    let Some(&status) = payload.first() else {
        return String::new();
    };
    let start = 1 + (status & LANGUAGE_LEN_MASK) as usize;
    payload
        .get(start..)
        .map(|body| String::from_utf8_lossy(body).into_owned())
        .unwrap_or_default()
}

/// The language code of a text payload.
pub fn language(payload: &[u8]) -> Option<String> {
    let status = *payload.first()?;
    let end = 1 + (status & LANGUAGE_LEN_MASK) as usize;
    payload
        .get(1..end)
        .map(|lang| String::from_utf8_lossy(lang).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_layout() {
        let payload = encode_payload("Hello");
        assert_eq!(payload, b"\x02enHello");
        assert_eq!(language(&payload).as_deref(), Some("en"));
    }

    #[test]
    fn decode_skips_language() {
        assert_eq!(decode_payload(b"\x02enHello"), "Hello");
        assert_eq!(decode_payload(b"\x05en-USHowdy"), "Howdy");
        // UTF-16 bit set, still read as UTF-8
        assert_eq!(decode_payload(b"\x82enHi"), "Hi");
    }

    #[test]
    fn multiline_text_survives() {
        let text = "EMERGENCY CONTACT INFORMATION\n\nName: Ravi";
        assert_eq!(decode_payload(&encode_payload(text)), text);
    }

    #[test]
    fn short_payloads_decode_empty() {
        assert_eq!(decode_payload(&[]), "");
        assert_eq!(decode_payload(b"\x02e"), "");
        assert_eq!(language(b"\x02e"), None);
    }
}
