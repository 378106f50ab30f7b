//! Error types for the layer store checker.
//!
//! Errors fall into two groups:
//!
//! - **Per-layer validation errors**: [`LayerError`] and [`OverlayError`].
//!   These never abort a check; they mark the layer they belong to as broken.
//! - **Check errors**: [`FsckError`].  These abort the check (failing to list
//!   the layers or to remove image metadata) or summarize failed removals.

use std::{io, path::PathBuf};

use crate::{digest::DigestError, stringid::IdError};

/// Result type alias for operations that may return an [`FsckError`].
pub type Result<T> = std::result::Result<T, FsckError>;

/// Why a layer metadata directory is considered broken.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// The directory name is not a valid chain ID.
    #[error("invalid chain ID {name:?}: {source}")]
    InvalidChainId { name: String, source: DigestError },

    #[error("failed to read cache ID {}: {source}", path.display())]
    MissingCacheId { path: PathBuf, source: io::Error },

    #[error("invalid cache ID {value:?} in {}: {source}", path.display())]
    InvalidCacheId {
        path: PathBuf,
        value: String,
        source: IdError,
    },

    #[error("failed to read diff ID {}: {source}", path.display())]
    MissingDiffId { path: PathBuf, source: io::Error },

    #[error("invalid diff ID in {}: {source}", path.display())]
    InvalidDiffId { path: PathBuf, source: DigestError },

    #[error("failed to read size {}: {source}", path.display())]
    MissingSize { path: PathBuf, source: io::Error },

    #[error("invalid size {value:?} in {}", path.display())]
    InvalidSize { path: PathBuf, value: String },

    #[error("invalid parent in {}: {source}", path.display())]
    InvalidParent { path: PathBuf, source: DigestError },

    /// Checking for or reading the optional parent file failed for a reason
    /// other than its absence.
    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

/// Why a layer's overlay2 snapshot directory is considered broken.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("layer's overlay dir doesn't exist: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to stat overlay dir {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to read link file {}: {source}", path.display())]
    MissingLink { path: PathBuf, source: io::Error },

    #[error("a link ID file contains an invalid content/ID ({len} bytes): {}", path.display())]
    InvalidLinkId { path: PathBuf, len: usize },

    #[error("failed to read lower file {}: {source}", path.display())]
    MissingLower { path: PathBuf, source: io::Error },

    #[error("incorrect lower file ({len} bytes): {}", path.display())]
    InvalidLower { path: PathBuf, len: usize },
}

/// Errors that fail a store check.
#[derive(Debug, thiserror::Error)]
pub enum FsckError {
    #[error("failed to read layers directory {}: {source}", path.display())]
    ReadLayers { path: PathBuf, source: io::Error },

    #[error("failed to remove metadata of images {}: {source}", path.display())]
    RemoveImageMetadata { path: PathBuf, source: io::Error },

    /// One or more broken layers could not be removed.  Only the last
    /// failure is kept.
    #[error("failed to remove {failed} broken layer(s); last failure: {}: {source}", path.display())]
    RemoveLayers {
        failed: usize,
        path: PathBuf,
        source: io::Error,
    },
}
