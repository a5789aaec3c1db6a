use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use subtle::ConstantTimeEq;

/// Length of a site's public key, which forms its URL prefix
pub const PUBLIC_KEY_LENGTH: usize = 20;

const PUBLIC_KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SECRET_KEY_BYTES: usize = 32;

pub fn new_public_key() -> String {
    let mut rng = rand::rng();
    (0..PUBLIC_KEY_LENGTH)
        .map(|_| PUBLIC_KEY_ALPHABET[rng.random_range(0..PUBLIC_KEY_ALPHABET.len())] as char)
        .collect()
}

pub fn new_secret_key() -> String {
    let mut raw = [0u8; SECRET_KEY_BYTES];
    rand::rng().fill(&mut raw[..]);
    URL_SAFE_NO_PAD.encode(raw)
}

pub fn is_public_key(candidate: &str) -> bool {
    candidate.len() == PUBLIC_KEY_LENGTH
        && candidate
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Constant-time comparison of a presented secret with the stored one.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
