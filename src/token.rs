use rand::{distributions::Alphanumeric, Rng};

pub const MIN_LENGTH: usize = 4;
pub const MAX_LENGTH: usize = 8;

/// A random `[A-Za-z0-9]` token for an RSVP link.
pub fn generate(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length.clamp(MIN_LENGTH, MAX_LENGTH))
        .map(char::from)
        .collect()
}
