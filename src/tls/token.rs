//! The authentication token hidden inside the ClientHello.
//!
//! The token has two parts, both bound to the current replay window (`unix_time / window`):
//! - The ClientHello's random field: a fresh 16-byte salt followed by the first 16 bytes of
//!   `SHA-256(key || window_index || salt)`. The server recomputes the digest to authenticate us,
//!   and a digest computed for another window does not match.
//! - The session ticket: an HMAC-SHA256 keystream over the per-process opaque value and the
//!   window index. It stays the same for the whole window, the way a real resumption ticket would,
//!   and changes when the window rolls over.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ring::{digest, hmac};

/// The length of the derived key.
pub const KEY_LEN: usize = 32;

/// The length of the per-process opaque value.
pub const OPAQUE_LEN: usize = 32;

/// The length of a ClientHello's random field.
pub const RANDOM_FIELD_LEN: usize = 32;

/// The length of the salt at the start of the random field.
pub const RANDOM_SALT_LEN: usize = 16;

/// The length of the session ticket sent in the session_ticket extension.
pub const SESSION_TICKET_LEN: usize = 192;

/// Derives the key material from the shared secret.
pub fn derive_key(secret: &str) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(digest::digest(&digest::SHA256, secret.as_bytes()).as_ref());
    key
}

/// Gets the index of the replay window `now` falls in.
///
/// Times before the unix epoch are treated as the epoch itself.
pub fn window_index(now: SystemTime, window: Duration) -> u64 {
    let secs = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    secs / window.as_secs().max(1)
}

fn random_field_digest(key: &[u8; KEY_LEN], window_index: u64, salt: &[u8; RANDOM_SALT_LEN]) -> digest::Digest {
    let mut context = digest::Context::new(&digest::SHA256);
    context.update(key);
    context.update(&window_index.to_be_bytes());
    context.update(salt);
    context.finish()
}

/// Builds the ClientHello random field for the given window index and salt.
pub fn make_random_field(key: &[u8; KEY_LEN], window_index: u64, salt: &[u8; RANDOM_SALT_LEN]) -> [u8; RANDOM_FIELD_LEN] {
    let digest = random_field_digest(key, window_index, salt);

    let mut field = [0u8; RANDOM_FIELD_LEN];
    field[..RANDOM_SALT_LEN].copy_from_slice(salt);
    field[RANDOM_SALT_LEN..].copy_from_slice(&digest.as_ref()[..RANDOM_FIELD_LEN - RANDOM_SALT_LEN]);
    field
}

/// Builds the session ticket for the given opaque value and window index.
pub fn make_session_ticket(key: &[u8; KEY_LEN], opaque: &[u8; OPAQUE_LEN], window_index: u64) -> [u8; SESSION_TICKET_LEN] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key);
    let mut ticket = [0u8; SESSION_TICKET_LEN];

    for (counter, chunk) in ticket.chunks_mut(digest::SHA256_OUTPUT_LEN).enumerate() {
        let mut context = hmac::Context::with_key(&key);
        context.update(opaque);
        context.update(&window_index.to_be_bytes());
        context.update(&[counter as u8]);
        let tag = context.sign();
        chunk.copy_from_slice(&tag.as_ref()[..chunk.len()]);
    }

    ticket
}
