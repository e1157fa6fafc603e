//! Player identity obfuscation.
//!
//! Player URLs carry a token instead of the player's name: the UTF-8 bytes of
//! the name XORed with a repeating key, then URL-safe base64. This keeps names
//! out of casual view and nothing more. The key is static and the token has no
//! integrity check, so a well-formed token that we never issued still decodes
//! to *some* name. Never use it for access control.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

/// Accepts tokens with or without trailing `=` padding.
const TOKEN_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid obfuscated id format")]
    InvalidToken,
    #[error("obfuscation key must not be empty")]
    EmptyKey,
}

#[derive(Debug, Clone)]
pub struct IdCodec {
    key: Vec<u8>,
}

impl IdCodec {
    pub fn new(key: impl Into<Vec<u8>>) -> Result<Self, CodecError> {
        let key = key.into();
        if key.is_empty() {
            return Err(CodecError::EmptyKey);
        }
        Ok(Self { key })
    }

    /// Turn a player name into its URL token. Deterministic for a given key.
    pub fn obfuscate(&self, name: &str) -> String {
        let mut bytes = name.as_bytes().to_vec();
        self.xor(&mut bytes);
        general_purpose::URL_SAFE.encode(bytes)
    }

    /// Recover the player name from a token.
    ///
    /// Only malformed base64 is rejected. Bytes that are not UTF-8 after the
    /// XOR are replaced with U+FFFD.
    pub fn deobfuscate(&self, token: &str) -> Result<String, CodecError> {
        let mut bytes = TOKEN_DECODER
            .decode(token)
            .map_err(|_| CodecError::InvalidToken)?;
        self.xor(&mut bytes);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn xor(&self, bytes: &mut [u8]) {
        for (b, k) in bytes.iter_mut().zip(self.key.iter().cycle()) {
            *b ^= k;
        }
    }
}

/// Shareable page URL for a player token.
pub fn player_url(base: &str, token: &str) -> String {
    format!("{}/player/{}", base.trim_end_matches('/'), token)
}
