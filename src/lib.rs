//! Offline checker for the Docker overlay2 layer store.
//!
//! A crash or a partial write can leave layer metadata directories with
//! missing or malformed files, or pointing at snapshot directories that don't
//! exist.  The daemon then fails in confusing ways when it touches those
//! layers.  This crate finds such layers and can remove them, together with
//! the image metadata that may reference them, so that the affected images
//! can be pulled again.
//!
//! ```no_run
//! use layerdb_fsck::{fsck::check_store, store::DockerStore};
//!
//! let store = DockerStore::new("/var/lib/docker");
//! let report = check_store(&store, false)?;
//! println!("{} broken layers", report.broken_count());
//! # Ok::<(), layerdb_fsck::error::FsckError>(())
//! ```
//!
//! The daemon must be stopped while checking: nothing here locks the store.

pub mod config;
pub mod digest;
pub mod error;
pub mod fs;
pub mod fsck;
pub mod layer;
pub mod overlay;
pub mod store;
pub mod stringid;

pub use error::{FsckError, LayerError, OverlayError};
pub use fsck::{check_store, Report};
pub use layer::{BrokenLayer, Layer};
pub use overlay::OverlaySnapshot;
pub use store::DockerStore;
