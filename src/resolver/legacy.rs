//! Offline decoder for the aggregator's legacy redirect identifiers.
//!
//! Older identifiers are a base64 blob wrapping the publisher URL in a tiny
//! length-prefixed frame:
//!
//! ```text
//! 08 13 22 | len (1 or 2 bytes) | url bytes ... | d2 01 00
//! ```
//!
//! The format is undocumented, so decoding is a best-effort heuristic that
//! fails closed: anything unexpected yields `None`, which tells the caller the
//! newer signed scheme is in use.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::debug;

const FRAME_PREFIX: [u8; 3] = [0x08, 0x13, 0x22];
const FRAME_SUFFIX: [u8; 3] = [0xd2, 0x01, 0x00];

/// Identifiers arrive url-safe and unpadded, but tolerate either.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a legacy article identifier into the publisher URL it wraps.
///
/// Returns `None` for malformed input or for identifiers that use the
/// signed scheme. Never panics.
pub fn decode_legacy(article_id: &str) -> Option<String> {
    let raw = decode_base64(article_id)?;
    let payload = unframe(&raw)?;

    if payload.starts_with(b"http://") || payload.starts_with(b"https://") {
        // Bytes map 1:1 onto chars, same as a latin-1 read.
        let url: String = payload.iter().map(|&b| char::from(b)).collect();
        debug!(%url, "Legacy identifier decoded");
        Some(url)
    } else {
        None
    }
}

/// Base64-decode accepting both the standard and url-safe alphabets.
fn decode_base64(article_id: &str) -> Option<Vec<u8>> {
    let normalized: String = article_id
        .trim()
        .chars()
        .filter(|c| *c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    if normalized.is_empty() {
        return None;
    }
    LENIENT_URL_SAFE.decode(normalized.as_bytes()).ok()
}

/// Strip the frame and slice out the length-prefixed payload.
fn unframe(raw: &[u8]) -> Option<&[u8]> {
    let mut bytes = raw.strip_prefix(&FRAME_PREFIX[..]).unwrap_or(raw);
    bytes = bytes.strip_suffix(&FRAME_SUFFIX[..]).unwrap_or(bytes);

    let &len_byte = bytes.first()?;
    let (start, end) = if len_byte >= 0x80 {
        (2, usize::from(len_byte - 0x80) + 2)
    } else {
        (1, usize::from(len_byte) + 1)
    };

    // A length that overruns the blob means the identifier was cut short.
    if end > bytes.len() {
        return None;
    }
    bytes.get(start..end)
}
