use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

use crate::types::OAuthState;

/// Generates a cryptographically random `state` parameter for `OAuth2`.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
/// `rand::rng()` is the thread-local CSPRNG, reseeded from the OS.
#[must_use]
pub fn generate_state() -> OAuthState {
    let random_bytes: [u8; 16] = rand::rng().random();
    OAuthState::from(URL_SAFE_NO_PAD.encode(random_bytes))
}
