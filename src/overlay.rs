//! Validation of overlay2 snapshot directories.
//!
//! Each layer in the layer store has a matching directory under the graph
//! driver root, named after the layer's cache ID:
//!
//! ```text
//! overlay2/<cache-id>/
//! +-- diff/                 # Layer file contents
//! +-- link                  # Short link ID (26 chars)
//! +-- lower                 # Parent references: "l/<link-id>:l/<link-id>:..."
//! ```
//!
//! Base layers have no `lower` file.  We only check that the metadata is
//! present and well-formed; whether the snapshot actually mounts is not
//! checked.

use std::path::{Path, PathBuf};

use crate::{error::OverlayError, fs::StoreFs, stringid::LINK_ID_LENGTH};

pub const LINK_FILE: &str = "link";
pub const LOWER_FILE: &str = "lower";

/// A validated overlay2 snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySnapshot {
    /// `<graph-driver-dir>/<cache-id>`.
    pub dir: PathBuf,

    /// Short link identifier from the link file.
    pub link_id: String,

    /// Raw content of the lower file.  `None` for base layers.
    pub lower: Option<String>,
}

impl OverlaySnapshot {
    /// The link IDs of the lower layers, top-most first.
    pub fn lower_links(&self) -> Vec<&str> {
        match &self.lower {
            // Format is "l/<link-id>:l/<link-id>:..."
            Some(lower) => lower
                .trim()
                .split(':')
                .filter_map(|s| s.strip_prefix("l/"))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Validates the snapshot directory of the layer with `cache_id`.
///
/// `cache_id` must already have been validated, since it becomes a path
/// component.  `base_layer` says whether the layer has no parent, in which
/// case the lower file is not required.
pub fn validate_overlay(
    fs: &impl StoreFs,
    graph_driver_dir: &Path,
    cache_id: &str,
    base_layer: bool,
) -> Result<OverlaySnapshot, OverlayError> {
    let dir = graph_driver_dir.join(cache_id);

    match fs.try_exists(&dir) {
        Ok(true) => {}
        Ok(false) => return Err(OverlayError::Missing { path: dir }),
        Err(source) => return Err(OverlayError::Io { path: dir, source }),
    }

    let path = dir.join(LINK_FILE);
    let link = fs
        .read(&path)
        .map_err(|source| OverlayError::MissingLink {
            path: path.clone(),
            source,
        })?;
    if link.len() != LINK_ID_LENGTH {
        return Err(OverlayError::InvalidLinkId {
            path,
            len: link.len(),
        });
    }
    let link_id = String::from_utf8(link).map_err(|e| OverlayError::InvalidLinkId {
        path,
        len: e.as_bytes().len(),
    })?;

    let lower = if base_layer {
        None
    } else {
        let path = dir.join(LOWER_FILE);
        let lower = fs
            .read(&path)
            .map_err(|source| OverlayError::MissingLower {
                path: path.clone(),
                source,
            })?;
        // must hold at least one link reference
        if lower.len() < LINK_ID_LENGTH {
            return Err(OverlayError::InvalidLower {
                path,
                len: lower.len(),
            });
        }
        Some(String::from_utf8_lossy(&lower).into_owned())
    };

    Ok(OverlaySnapshot {
        dir,
        link_id,
        lower,
    })
}
