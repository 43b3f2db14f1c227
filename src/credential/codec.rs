// src/credential/codec.rs
//! Wire codec for the signed credential payload.
//!
//! The payload is a self-contained, QR-friendly ASCII string:
//!
//! ```text
//! JRS:<student_id>:<expiry YYYYMMDD>:<name_b64url>:<tag_hex>
//! ```
//!
//! The display name is URL-safe base64 without padding so that spaces and
//! accented characters survive inclusion in a colon-delimited string. The
//! trailing tag binds the other three fields; computing and checking it is
//! the [`Signer`](crate::credential::signer::Signer)'s job — this module only
//! deals with structure.

use thiserror::Error;

/// Prefix identifying the signed payload format.
pub const PAYLOAD_PREFIX: &str = "JRS:";

/// Number of colon-delimited fields after the prefix.
const FIELD_COUNT: usize = 4;

/// Structural fields of a payload, before any trust decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPayload {
    pub student_id: String,
    /// Raw 8-digit expiry exactly as embedded; parsed later so that the tag
    /// check covers the original bytes.
    pub expiry: String,
    pub name_b64: String,
    pub tag: String,
}

/// Result of attempting to parse a raw scan code as a signed payload.
///
/// A tagged result instead of a bare `Option` so callers can distinguish
/// "fall back to the legacy code path" from "reject outright":
/// - [`NotSigned`](PayloadParse::NotSigned): the code does not carry the
///   signed prefix at all; it may be a legacy credential.
/// - [`Malformed`](PayloadParse::Malformed): the code claimed the signed
///   format but its structure is wrong; it is untrusted input, never a
///   legacy candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadParse {
    Signed(ParsedPayload),
    Malformed,
    NotSigned,
}

/// Error decoding an embedded display name.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("name is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encodes a display name as URL-safe base64 with padding stripped.
pub fn encode_name(name: &str) -> String {
    base64::encode_config(name.as_bytes(), base64::URL_SAFE_NO_PAD)
}

/// Decodes a display name produced by [`encode_name`].
///
/// Padding was stripped at encode time, so it is re-added here (input length
/// modulo 4 determines how many `=` to append) before decoding.
pub fn decode_name(encoded: &str) -> Result<String, DecodeError> {
    let mut padded = encoded.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = base64::decode_config(&padded, base64::URL_SAFE)?;
    Ok(String::from_utf8(bytes)?)
}

/// Splits a raw scan code into payload fields.
///
/// Stripping the prefix must leave exactly [`FIELD_COUNT`] colon-delimited
/// parts; any other count is `Malformed`. No field content is validated
/// here — a structurally sound payload with a forged tag still parses.
pub fn parse(code: &str) -> PayloadParse {
    let rest = match code.strip_prefix(PAYLOAD_PREFIX) {
        Some(rest) => rest,
        None => return PayloadParse::NotSigned,
    };

    let parts: Vec<&str> = rest.split(':').collect();
    if parts.len() != FIELD_COUNT {
        return PayloadParse::Malformed;
    }

    PayloadParse::Signed(ParsedPayload {
        student_id: parts[0].to_string(),
        expiry: parts[1].to_string(),
        name_b64: parts[2].to_string(),
        tag: parts[3].to_string(),
    })
}
