//! Reversible obscuring of cookie values.
//!
//! Each round XORs the data with the repeating key, zlib-compresses the
//! result and encodes it as url-safe base64. This hides values from casual
//! inspection only. It is NOT encryption: anyone holding the scheme can
//! brute-force short keys, and nothing authenticates the value.

use std::io::{Read, Write};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

/// Rounds used when callers do not pick their own.
pub const DEFAULT_ROUNDS: usize = 3;
const MIN_ROUNDS: usize = 2;

/// Encodes with padding, decodes with or without it.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    PAD.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum ObscureError {
    #[error("obscuring key must not be empty")]
    EmptyKey,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("zlib error: {0}")]
    Zlib(#[from] std::io::Error),
}

fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(d, k)| d ^ k)
        .collect()
}

fn obscure_round(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ObscureError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&xor_with_key(data, key))?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE_LENIENT.encode(compressed).into_bytes())
}

fn reveal_round(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ObscureError> {
    let compressed = URL_SAFE_LENIENT.decode(data)?;
    let mut cipher = Vec::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut cipher)?;
    Ok(xor_with_key(&cipher, key))
}

/// Obscure `plaintext` with `key`. Fewer than two rounds are raised to two.
pub fn encrypt(key: &[u8], plaintext: &[u8], rounds: usize) -> Result<String, ObscureError> {
    if key.is_empty() {
        return Err(ObscureError::EmptyKey);
    }
    let mut data = plaintext.to_vec();
    for _ in 0..rounds.max(MIN_ROUNDS) {
        data = obscure_round(key, &data)?;
    }
    // base64 output is always ASCII
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Reverse [`encrypt`]. `key` and `rounds` must match.
pub fn decrypt(key: &[u8], obscured: &str, rounds: usize) -> Result<Vec<u8>, ObscureError> {
    if key.is_empty() {
        return Err(ObscureError::EmptyKey);
    }
    let mut data = obscured.as_bytes().to_vec();
    for _ in 0..rounds.max(MIN_ROUNDS) {
        data = reveal_round(key, &data)?;
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversible() {
        let key = b"IamASecret";
        let text = b"Santa Claus is coming to town!";
        let hidden = encrypt(key, text, DEFAULT_ROUNDS).unwrap();
        assert_ne!(hidden.as_bytes(), text);
        assert!(hidden
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_=".contains(&b)));
        assert_eq!(decrypt(key, &hidden, DEFAULT_ROUNDS).unwrap(), text);
    }

    #[test]
    fn test_minimum_rounds() {
        let hidden = encrypt(b"k", b"value", 0).unwrap();
        assert_eq!(hidden, encrypt(b"k", b"value", 2).unwrap());
        assert_eq!(decrypt(b"k", &hidden, 1).unwrap(), b"value");
    }

    #[test]
    fn test_wrong_key_does_not_reveal() {
        let hidden = encrypt(b"right", b"secret value", DEFAULT_ROUNDS).unwrap();
        let revealed = decrypt(b"wrong", &hidden, DEFAULT_ROUNDS);
        assert!(revealed.map(|v| v != b"secret value").unwrap_or(true));
    }

    #[test]
    fn test_garbage_input() {
        assert!(decrypt(b"k", "!!not base64!!", DEFAULT_ROUNDS).is_err());
        assert!(decrypt(b"k", "aGVsbG8", DEFAULT_ROUNDS).is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(encrypt(b"", b"x", 3), Err(ObscureError::EmptyKey)));
        assert!(matches!(decrypt(b"", "x", 3), Err(ObscureError::EmptyKey)));
    }
}
