use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;

const LINK_TOKEN_BYTES: usize = 32;

/// Opaque single-use secret bridging a logged-in session to the browser
/// extension. URL-safe so it survives copy/paste and query strings.
pub fn generate_link_token() -> String {
    let mut bytes = [0u8; LINK_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_url_safe_and_unpadded() {
        let token = generate_link_token();
        // 32 bytes -> 43 base64url chars, no padding
        assert_eq!(token.len(), 43);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_do_not_repeat() {
        assert_ne!(generate_link_token(), generate_link_token());
    }
}
