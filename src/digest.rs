//! Content digests of the form `<algorithm>:<hex>`.
//!
//! The layer store names layer directories after their chain ID and keeps
//! diff IDs and parent chain IDs as digest strings.  Parsing is strict: the
//! algorithm must be one we know, and the encoded part must be lowercase hex
//! of exactly the algorithm's output length.  Trailing newlines or other
//! whitespace are rejected, matching how the runtime writes these files.

use core::{fmt, str::FromStr};

use sha2::{Digest as _, Sha256, Sha384, Sha512};

/// Errors from [`Digest::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// No `algorithm:` prefix, or nothing after it.
    #[error("invalid digest format")]
    InvalidFormat,

    /// The algorithm prefix names something we don't support.
    #[error("unsupported digest algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    /// The encoded part has the wrong number of characters.
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The encoded part contains something other than `[0-9a-f]`.
    #[error("invalid character {c:?} at offset {index} in digest")]
    InvalidEncoding { c: char, index: usize },
}

/// A hash algorithm that can appear in a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    /// The canonical name, as used in the digest prefix and in `layerdb/<name>`.
    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded digest.
    pub const fn encoded_len(self) -> usize {
        match self {
            Algorithm::Sha256 => 64,
            Algorithm::Sha384 => 96,
            Algorithm::Sha512 => 128,
        }
    }

    /// Checks that `encoded` is a valid hex digest for this algorithm.
    pub fn validate(self, encoded: &str) -> Result<(), DigestError> {
        if encoded.len() != self.encoded_len() {
            return Err(DigestError::InvalidLength {
                expected: self.encoded_len(),
                actual: encoded.len(),
            });
        }
        // hex::decode accepts uppercase, the store never contains it
        if let Some((index, c)) = encoded
            .char_indices()
            .find(|(_, c)| !matches!(c, '0'..='9' | 'a'..='f'))
        {
            return Err(DigestError::InvalidEncoding { c, index });
        }
        Ok(())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Algorithm::Sha256),
            "sha384" => Ok(Algorithm::Sha384),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(DigestError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// A validated content digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    algorithm: Algorithm,
    encoded: String,
}

impl Digest {
    /// Parses a digest string such as `sha256:2c26b4...`.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let Some((algorithm, encoded)) = s.split_once(':') else {
            return Err(DigestError::InvalidFormat);
        };
        if algorithm.is_empty() || encoded.is_empty() {
            return Err(DigestError::InvalidFormat);
        }
        let algorithm: Algorithm = algorithm.parse()?;
        algorithm.validate(encoded)?;
        Ok(Digest {
            algorithm,
            encoded: encoded.to_string(),
        })
    }

    /// Builds a digest from an algorithm and a bare encoded part, as found in
    /// a layer directory name.
    pub fn from_encoded(algorithm: Algorithm, encoded: &str) -> Result<Self, DigestError> {
        algorithm.validate(encoded)?;
        Ok(Digest {
            algorithm,
            encoded: encoded.to_string(),
        })
    }

    /// Hashes `data` with `algorithm`.
    pub fn from_bytes(algorithm: Algorithm, data: &[u8]) -> Self {
        let encoded = match algorithm {
            Algorithm::Sha256 => hex::encode(Sha256::digest(data)),
            Algorithm::Sha384 => hex::encode(Sha384::digest(data)),
            Algorithm::Sha512 => hex::encode(Sha512::digest(data)),
        };
        Digest { algorithm, encoded }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The hex part without the algorithm prefix.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.encoded)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    const FOO_BAR: &str = "fbc1a9f858ea9e177916964bd88c3d37b91a1e84412765e29950777f265c4b75";

    #[test]
    fn test_parse_valid() {
        let digest = Digest::parse(&format!("sha256:{FOO_BAR}")).unwrap();
        assert_eq!(digest.algorithm(), Algorithm::Sha256);
        assert_eq!(digest.encoded(), FOO_BAR);
        assert_eq!(digest.to_string(), format!("sha256:{FOO_BAR}"));
    }

    #[test]
    fn test_from_bytes() {
        let digest = Digest::from_bytes(Algorithm::Sha256, b"foo bar");
        assert_eq!(digest.encoded(), FOO_BAR);
        let digest = Digest::from_bytes(Algorithm::Sha512, b"foo bar");
        assert_eq!(digest.encoded().len(), 128);
        assert_eq!(Digest::parse(&digest.to_string()).unwrap(), digest);
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(Digest::parse(FOO_BAR), Err(DigestError::InvalidFormat));
        assert_eq!(Digest::parse("sha256:"), Err(DigestError::InvalidFormat));
        assert_eq!(
            Digest::parse(&format!(":{FOO_BAR}")),
            Err(DigestError::InvalidFormat)
        );
        assert_eq!(
            Digest::parse(&format!("md5:{FOO_BAR}")),
            Err(DigestError::UnsupportedAlgorithm("md5".to_string()))
        );
        assert_eq!(
            Digest::parse("sha256:foobar123"),
            Err(DigestError::InvalidLength {
                expected: 64,
                actual: 9
            })
        );
        assert_eq!(
            Digest::parse(&format!("sha256:{}", FOO_BAR.to_uppercase())),
            Err(DigestError::InvalidEncoding { c: 'F', index: 0 })
        );
        assert!(Digest::parse(&format!("sha256:{FOO_BAR}\n")).is_err());
    }

    #[test]
    fn test_from_encoded() {
        let digest = Digest::from_encoded(Algorithm::Sha256, FOO_BAR).unwrap();
        assert_eq!(digest.to_string(), format!("sha256:{FOO_BAR}"));
        assert!(Digest::from_encoded(Algorithm::Sha256, "foobar").is_err());
        assert!(Digest::from_encoded(Algorithm::Sha512, FOO_BAR).is_err());
    }
}
