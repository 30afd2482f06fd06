//! `X-Signature-256` header parsing.
//!
//! The form backend signs the raw request body with the shared secret and
//! sends the result as `sha256=<hex>`. The header is parsed before the body
//! is looked at; the body is only parsed once the signature matched.

use thiserror::Error;

/// The only algorithm tag accepted in the signature header.
pub const SIGNATURE_ALGORITHM: &str = "sha256";

/// Reasons a signature header cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureHeaderError {
    #[error("signature header is not of the form <algorithm>=<hex>")]
    Malformed,

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature is not valid hex")]
    InvalidHex,
}

/// Parses a header value such as `sha256=1f2e...` into the raw digest bytes.
///
/// Never panics.
pub fn parse_signature_header(value: &str) -> Result<Vec<u8>, SignatureHeaderError> {
    let (algorithm, digest) = value
        .trim()
        .split_once('=')
        .ok_or(SignatureHeaderError::Malformed)?;

    if algorithm.is_empty() || digest.is_empty() {
        return Err(SignatureHeaderError::Malformed);
    }

    if !algorithm.eq_ignore_ascii_case(SIGNATURE_ALGORITHM) {
        return Err(SignatureHeaderError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    hex::decode(digest).map_err(|_| SignatureHeaderError::InvalidHex)
}

/// Formats a digest as a header value (`sha256=<hex>`).
#[must_use]
pub fn format_signature_header(digest: &[u8]) -> String {
    format!("{SIGNATURE_ALGORITHM}={}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(
            parse_signature_header("sha256=1234abcd"),
            Ok(vec![0x12, 0x34, 0xab, 0xcd])
        );
    }

    #[test]
    fn test_parse_accepts_uppercase() {
        assert_eq!(
            parse_signature_header("SHA256=ABCD1234"),
            Ok(vec![0xab, 0xcd, 0x12, 0x34])
        );
    }

    #[test]
    fn test_parse_missing_separator() {
        assert_eq!(
            parse_signature_header("1234abcd"),
            Err(SignatureHeaderError::Malformed)
        );
        assert_eq!(parse_signature_header(""), Err(SignatureHeaderError::Malformed));
    }

    #[test]
    fn test_parse_empty_parts() {
        assert_eq!(
            parse_signature_header("sha256="),
            Err(SignatureHeaderError::Malformed)
        );
        assert_eq!(
            parse_signature_header("=abcd"),
            Err(SignatureHeaderError::Malformed)
        );
    }

    #[test]
    fn test_parse_wrong_algorithm() {
        assert_eq!(
            parse_signature_header("sha1=abcd"),
            Err(SignatureHeaderError::UnsupportedAlgorithm("sha1".to_owned()))
        );
    }

    #[test]
    fn test_parse_bad_hex() {
        assert_eq!(
            parse_signature_header("sha256=xyz1"),
            Err(SignatureHeaderError::InvalidHex)
        );
        assert_eq!(
            parse_signature_header("sha256=abc"),
            Err(SignatureHeaderError::InvalidHex)
        );
    }

    #[test]
    fn test_format() {
        assert_eq!(format_signature_header(&[0x12, 0x34, 0xab, 0xcd]), "sha256=1234abcd");
    }

    proptest! {
        #[test]
        fn prop_format_parse_roundtrip(digest: [u8; 32]) {
            prop_assert_eq!(parse_signature_header(&format_signature_header(&digest)), Ok(digest.to_vec()));
        }

        #[test]
        fn prop_never_panics(header: String) {
            let _ = parse_signature_header(&header);
        }
    }
}
