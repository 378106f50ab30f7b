//! Parsing and validation of layer metadata directories.
//!
//! The layer store keeps one directory per layer, named after the layer's
//! chain ID:
//!
//! ```text
//! image/overlay2/layerdb/sha256/<chain-id>/
//! +-- cache-id              # Random ID of the overlay2 snapshot
//! +-- diff                  # Diff ID, "sha256:<hex>"
//! +-- size                  # Size of the diff in bytes
//! +-- parent                # Parent chain ID, absent for base layers
//! ```
//!
//! [`parse_layer`] checks these files in a fixed order and stops at the first
//! problem, then follows the cache ID into the graph driver directory.

use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
};

use crate::{
    digest::{Algorithm, Digest, DigestError},
    error::{LayerError, OverlayError},
    fs::StoreFs,
    overlay::{validate_overlay, OverlaySnapshot},
    stringid::validate_id,
};

pub const CACHE_ID_FILE: &str = "cache-id";
pub const DIFF_FILE: &str = "diff";
pub const SIZE_FILE: &str = "size";
pub const PARENT_FILE: &str = "parent";

/// The algorithm layer directory names are encoded with.
pub const LAYERDB_ALGORITHM: Algorithm = Algorithm::Sha256;

/// A layer whose metadata and overlay snapshot are both valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    /// The layer metadata directory.
    pub dir: PathBuf,
    pub chain_id: Digest,
    pub cache_id: String,
    pub diff_id: Digest,
    /// Size of the uncompressed diff in bytes.
    pub size: u64,
    /// `None` for base layers.
    pub parent: Option<Digest>,
    pub overlay: OverlaySnapshot,
}

impl Layer {
    pub fn is_base(&self) -> bool {
        self.parent.is_none()
    }
}

/// What is known about a layer that failed validation.
#[derive(Debug)]
pub struct BrokenLayer {
    /// Name of the metadata directory.
    pub name: OsString,

    /// The layer metadata directory.
    pub dir: PathBuf,

    /// Set if the directory name was a valid chain ID.
    pub chain_id: Option<Digest>,

    /// The overlay snapshot directory.  Set once the cache ID is known to be
    /// valid, whether or not the directory exists, and cleared again if its
    /// existence can't be determined.
    pub snapshot_dir: Option<PathBuf>,

    pub error: LayerError,
}

impl BrokenLayer {
    /// Deletes the metadata directory and then the snapshot directory, if
    /// its path is known.  Stops at the first failure.
    pub fn remove(&self, fs: &impl StoreFs) -> io::Result<()> {
        fs.remove_all(&self.dir)?;
        if let Some(snapshot_dir) = &self.snapshot_dir {
            fs.remove_all(snapshot_dir)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Partial {
    chain_id: Option<Digest>,
    snapshot_dir: Option<PathBuf>,
}

/// Parses and validates the layer directory `layers_dir/name`.
///
/// On failure the returned [`BrokenLayer`] carries everything learned before
/// the failing check.
pub fn parse_layer(
    fs: &impl StoreFs,
    layers_dir: &Path,
    name: &OsStr,
    graph_driver_dir: &Path,
) -> Result<Layer, BrokenLayer> {
    let dir = layers_dir.join(name);
    let mut partial = Partial::default();

    parse_layer_dir(fs, &dir, name, graph_driver_dir, &mut partial).map_err(|error| BrokenLayer {
        name: name.to_os_string(),
        dir: dir.clone(),
        chain_id: partial.chain_id,
        snapshot_dir: partial.snapshot_dir,
        error,
    })
}

fn parse_layer_dir(
    fs: &impl StoreFs,
    dir: &Path,
    name: &OsStr,
    graph_driver_dir: &Path,
    partial: &mut Partial,
) -> Result<Layer, LayerError> {
    let chain_id = name
        .to_str()
        .ok_or(DigestError::InvalidFormat)
        .and_then(|encoded| Digest::from_encoded(LAYERDB_ALGORITHM, encoded))
        .map_err(|source| LayerError::InvalidChainId {
            name: name.to_string_lossy().into_owned(),
            source,
        })?;
    partial.chain_id = Some(chain_id.clone());

    // the cache ID becomes a path component, so validate it before using it
    let path = dir.join(CACHE_ID_FILE);
    let cache_id = read_string(fs, &path).map_err(|source| LayerError::MissingCacheId {
        path: path.clone(),
        source,
    })?;
    if let Err(source) = validate_id(&cache_id) {
        return Err(LayerError::InvalidCacheId {
            path,
            value: cache_id,
            source,
        });
    }
    partial.snapshot_dir = Some(graph_driver_dir.join(&cache_id));

    let path = dir.join(DIFF_FILE);
    let diff_id = read_string(fs, &path).map_err(|source| LayerError::MissingDiffId {
        path: path.clone(),
        source,
    })?;
    let diff_id =
        Digest::parse(&diff_id).map_err(|source| LayerError::InvalidDiffId { path, source })?;

    let path = dir.join(SIZE_FILE);
    let size = read_string(fs, &path).map_err(|source| LayerError::MissingSize {
        path: path.clone(),
        source,
    })?;
    let Some(size) = parse_size(&size) else {
        return Err(LayerError::InvalidSize { path, value: size });
    };

    let path = dir.join(PARENT_FILE);
    let parent = match fs.try_exists(&path) {
        Ok(false) => None,
        Ok(true) => {
            let parent = read_string(fs, &path).map_err(|source| LayerError::Io {
                path: path.clone(),
                source,
            })?;
            let parent = Digest::parse(&parent)
                .map_err(|source| LayerError::InvalidParent { path, source })?;
            Some(parent)
        }
        Err(source) => return Err(LayerError::Io { path, source }),
    };

    let overlay =
        validate_overlay(fs, graph_driver_dir, &cache_id, parent.is_none()).map_err(|err| {
            // the snapshot's state is unknown, so leave it alone
            if matches!(err, OverlayError::Io { .. }) {
                partial.snapshot_dir = None;
            }
            err
        })?;

    Ok(Layer {
        dir: dir.to_path_buf(),
        chain_id,
        cache_id,
        diff_id,
        size,
        parent,
        overlay,
    })
}

/// Reads a metadata file.  Invalid UTF-8 is replaced rather than rejected so
/// that it fails the format check of whatever field it's in.
fn read_string(fs: &impl StoreFs, path: &Path) -> io::Result<String> {
    let content = fs.read(path)?;
    Ok(String::from_utf8_lossy(&content).into_owned())
}

/// Parses the content of a size file.
///
/// Besides plain decimal this accepts `0x`, `0o` and `0b` prefixes, a leading
/// `0` for octal, and `_` between digits, as the runtime's integer parser
/// does.  Whitespace and signs are rejected.
pub fn parse_size(s: &str) -> Option<u64> {
    let lower = s.get(..2).map(str::to_ascii_lowercase);
    let (digits, radix) = match lower.as_deref() {
        Some("0x") => (&s[2..], 16),
        Some("0o") => (&s[2..], 8),
        Some("0b") => (&s[2..], 2),
        _ if s.len() > 1 && s.starts_with('0') => (&s[1..], 8),
        _ => (s, 10),
    };

    if digits.contains('_') && !underscores_ok(s) {
        return None;
    }
    let digits = digits.replace('_', "");
    // from_str_radix would accept a leading '+'
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    u64::from_str_radix(&digits, radix).ok()
}

/// Underscores may only separate digits, or follow a base prefix.
fn underscores_ok(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    // true if the previous character was a digit or base prefix
    let mut after_digit = false;

    if bytes.len() >= 2 && bytes[0] == b'0' && matches!(bytes[1] | 0x20, b'x' | b'o' | b'b') {
        i = 2;
        after_digit = true;
    }

    for &b in &bytes[i..] {
        if b == b'_' {
            if !after_digit {
                return false;
            }
            after_digit = false;
        } else {
            after_digit = true;
        }
    }
    after_digit
}
