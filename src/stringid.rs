//! Random identifiers used by the layer store and the overlay2 driver.
//!
//! Cache IDs are 64 lowercase hex characters, generated from 32 random bytes.
//! Link IDs are 26 characters from the base32 alphabet and are what the
//! driver puts under `l/` to keep mount option strings short.

/// Length of a cache ID in characters.
pub const CACHE_ID_LENGTH: usize = 64;

/// Length of an overlay2 link ID in characters.
pub const LINK_ID_LENGTH: usize = 26;

/// Errors from [`validate_id`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid ID length: expected 64, got {0}")]
    InvalidLength(usize),
    #[error("invalid character {c:?} at offset {index} in ID")]
    InvalidCharacter { c: char, index: usize },
}

/// Checks that `id` has the format of a runtime-generated random ID.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.len() != CACHE_ID_LENGTH {
        return Err(IdError::InvalidLength(id.len()));
    }
    match id
        .char_indices()
        .find(|(_, c)| !matches!(c, '0'..='9' | 'a'..='f'))
    {
        Some((index, c)) => Err(IdError::InvalidCharacter { c, index }),
        None => Ok(()),
    }
}

/// Generators for IDs in the runtime's formats, for building test stores.
#[cfg(test)]
pub(crate) mod generate {
    use rand::RngCore;

    use super::{CACHE_ID_LENGTH, LINK_ID_LENGTH};

    /// Length of the truncated form the runtime shows to users.
    pub(crate) const SHORT_ID_LENGTH: usize = 12;

    pub(crate) const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    /// Generates a new random cache ID.
    ///
    /// IDs whose short form would be all digits are skipped, since those get
    /// mistaken for numbers when used as hostnames.
    pub(crate) fn generate_random_id() -> String {
        let mut rng = rand::rng();
        let mut bytes = [0u8; CACHE_ID_LENGTH / 2];
        loop {
            rng.fill_bytes(&mut bytes);
            let id = hex::encode(bytes);
            if !id[..SHORT_ID_LENGTH].bytes().all(|b| b.is_ascii_digit()) {
                return id;
            }
        }
    }

    /// Generates a new random link ID.
    pub(crate) fn generate_link_id() -> String {
        let mut bytes = [0u8; LINK_ID_LENGTH];
        rand::rng().fill_bytes(&mut bytes);
        bytes
            .iter()
            .map(|b| BASE32_ALPHABET[usize::from(b % 32)] as char)
            .collect()
    }
}
