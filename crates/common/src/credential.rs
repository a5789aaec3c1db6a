//! Stateless proof-of-work credentials for site creation.
//!
//! A token is valid iff the SHA-256 digest of its bytes, read as a
//!  big-endian 256-bit integer, is strictly below a public threshold.
//!  Nothing is stored: every replica reaches the same verdict from the
//!  token bytes alone, while minting a token costs roughly
//!  `2^(256 - bits)` hash evaluations.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Default threshold exponent: tokens must hash below `2^234`.
pub const DEFAULT_THRESHOLD_BITS: u32 = 234;

/// Number of random bytes sampled per token candidate.
pub const TOKEN_LENGTH: usize = 50;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("token is not valid base64")]
    Encoding,
    #[error("token is empty")]
    Empty,
}

/// A power-of-two threshold `2^bits` over 256-bit digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    bits: u32,
    // big-endian `2^bits`, unused when bits >= 256
    bound: [u8; 32],
}

impl Threshold {
    pub fn new(bits: u32) -> Self {
        let mut bound = [0u8; 32];
        if bits < 256 {
            let byte = 31 - (bits / 8) as usize;
            bound[byte] = 1 << (bits % 8);
        }
        Self { bits, bound }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// `int_be(digest) < 2^bits`
    pub fn admits(&self, digest: &[u8; 32]) -> bool {
        if self.bits >= 256 {
            return true;
        }
        // lexicographic order of equal-length big-endian arrays is numeric order
        digest < &self.bound
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_BITS)
    }
}

fn digest(token: &[u8]) -> [u8; 32] {
    Sha256::digest(token).into()
}

/// Pure validity check over raw token bytes.
pub fn is_valid(token: &[u8], threshold: &Threshold) -> bool {
    threshold.admits(&digest(token))
}

/// Decode the transport form of a token (base64, either alphabet,
///  padding optional) into its raw bytes.
pub fn decode_token(encoded: &str) -> Result<Vec<u8>, CredentialError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(CredentialError::Empty);
    }
    STANDARD_LENIENT
        .decode(encoded)
        .or_else(|_| URL_SAFE_LENIENT.decode(encoded))
        .map_err(|_| CredentialError::Encoding)
}

/// Result of a token search.
#[derive(Debug, Clone)]
pub struct GeneratedToken {
    /// Standard base64 without padding, ready for the `Authorisation` header
    pub token: String,
    pub attempts: u64,
}

/// Search for a valid token by sampling random byte strings.
///
/// `on_attempt` is called with the running attempt count after each
///  failed candidate so callers can report progress.
pub fn generate_token(threshold: &Threshold, mut on_attempt: impl FnMut(u64)) -> GeneratedToken {
    let mut rng = rand::rng();
    let mut candidate = [0u8; TOKEN_LENGTH];
    let mut attempts: u64 = 0;
    loop {
        attempts += 1;
        rng.fill(&mut candidate[..]);
        if is_valid(&candidate, threshold) {
            return GeneratedToken {
                token: STANDARD_NO_PAD.encode(candidate),
                attempts,
            };
        }
        on_attempt(attempts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_bound_layout() {
        let t = Threshold::new(234);
        // 2^234 = byte 2 (from the left) holds 1 << 2
        assert_eq!(t.bound[2], 0b100);
        assert!(t.bound.iter().enumerate().all(|(i, b)| i == 2 || *b == 0));

        let t = Threshold::new(0);
        assert_eq!(t.bound[31], 1);
    }

    #[test]
    fn test_admits_is_strict() {
        let t = Threshold::new(248);
        let mut below = [0u8; 32];
        below[0] = 0x00;
        below[1] = 0xff;
        assert!(t.admits(&below));

        let mut equal = [0u8; 32];
        equal[0] = 0x01;
        assert!(!t.admits(&equal));

        let mut above = equal;
        above[31] = 1;
        assert!(!t.admits(&above));
    }

    #[test]
    fn test_wide_threshold_admits_everything() {
        let t = Threshold::new(260);
        assert!(t.admits(&[0xff; 32]));
        assert!(is_valid(b"abcd", &t));
    }

    #[test]
    fn test_is_valid_matches_digest_comparison() {
        let t = Threshold::default();
        for token in [&b""[..], b"abcd", b"smokeshow", &[0u8; 50]] {
            let d = digest(token);
            // digest < 2^234 iff the top 22 bits are zero
            let expected = d[0] == 0 && d[1] == 0 && d[2] < 0b100;
            assert_eq!(is_valid(token, &t), expected);
            assert_eq!(is_valid(token, &t), is_valid(token, &t));
        }
    }

    #[test]
    fn test_decode_token_accepts_both_alphabets() {
        assert_eq!(decode_token("YWJjZA").unwrap(), b"abcd");
        assert_eq!(decode_token("YWJjZA==").unwrap(), b"abcd");
        // 0xfb 0xff encodes to "+/8" / "-_8"
        assert_eq!(decode_token("+/8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_token("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_token_rejects_garbage() {
        assert_eq!(decode_token("   "), Err(CredentialError::Empty));
        assert_eq!(decode_token("not base64!"), Err(CredentialError::Encoding));
    }

    #[test]
    fn test_generate_token_produces_valid_token() {
        let t = Threshold::new(250);
        let mut reported = 0;
        let generated = generate_token(&t, |n| reported = n);

        assert_eq!(reported + 1, generated.attempts);
        let raw = decode_token(&generated.token).unwrap();
        assert_eq!(raw.len(), TOKEN_LENGTH);
        assert!(is_valid(&raw, &t));
    }
}
