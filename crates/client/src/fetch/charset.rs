//! Response text decoding.
//!
//! Encoding is chosen in order: the `charset` parameter of `Content-Type`,
//! then a `<meta>` charset declaration near the top of the body, then UTF-8
//! if the body is valid UTF-8, and otherwise a guess from the body bytes.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// How many leading body bytes are searched for a `<meta>` charset.
const SNIFF_LEN: usize = 1024;

/// `charset` parameter of a `Content-Type` header value, if any.
pub fn declared_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(['"', '\'']);
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Charset label from `<meta charset=..>` or `<meta http-equiv content="..; charset=..">`.
pub fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&body[..body.len().min(SNIFF_LEN)]).to_ascii_lowercase();

    head.match_indices("<meta").find_map(|(start, _)| {
        let tag = &head[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
        let rest = &tag[tag.find("charset")? + "charset".len()..];
        let rest = rest.trim_start().strip_prefix('=')?.trim_start();
        let label: String = rest
            .trim_start_matches(['"', '\''])
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
            .collect();
        (!label.is_empty()).then_some(label)
    })
}

/// Decode `bytes` using `label`, falling back to UTF-8 for a missing or unknown label.
///
/// A byte-order mark overrides the label. Returns the text and the name of
/// the encoding actually used.
pub fn decode(bytes: &[u8], label: Option<&str>) -> (String, &'static str) {
    let encoding = label
        .and_then(|l| Encoding::for_label(l.as_bytes()))
        .unwrap_or(UTF_8);
    decode_with(bytes, encoding)
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> (String, &'static str) {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("malformed {} sequences replaced while decoding", used.name());
    }
    (text.into_owned(), used.name())
}

/// Best guess at the encoding of undeclared, non-UTF-8 `bytes`.
pub fn guess_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, false)
}

/// Decode a response body given its `Content-Type` header.
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> (String, &'static str) {
    let label = content_type
        .and_then(declared_charset)
        .or_else(|| sniff_meta_charset(bytes));

    match label {
        Some(label) => decode(bytes, Some(&label)),
        None if std::str::from_utf8(bytes).is_ok() => decode_with(bytes, UTF_8),
        None => {
            let guessed = guess_encoding(bytes);
            tracing::debug!("no declared charset, guessed {}", guessed.name());
            decode_with(bytes, guessed)
        }
    }
}
