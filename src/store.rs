//! Locations inside a Docker data root.
//!
//! # Store Structure
//!
//! ```text
//! /var/lib/docker/
//! +-- image/overlay2/
//! |   +-- imagedb/                  # Image metadata, removed wholesale on repair
//! |   +-- layerdb/sha256/
//! |       +-- <chain-id>/           # Layer metadata directories
//! +-- overlay2/
//!     +-- <cache-id>/               # Snapshot directories
//! ```
//!
//! [`DockerStore`] only computes paths; nothing is checked when it is
//! created, and every path may be missing.

use std::{
    ffi::{OsStr, OsString},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    error::{FsckError, Result},
    fs::{HostFs, StoreFs},
    layer::{parse_layer, BrokenLayer, Layer, LAYERDB_ALGORITHM},
};

/// The graph driver the store layout and snapshot checks are written for.
pub const DEFAULT_GRAPH_DRIVER: &str = "overlay2";

/// Where the runtime keeps its data unless configured otherwise.
pub const DEFAULT_DATA_ROOT: &str = "/var/lib/docker";

const IMAGEDB_DIR: &str = "imagedb";

/// Path layout of a Docker data root.
#[derive(Debug, Clone)]
pub struct DockerStore<F: StoreFs = HostFs> {
    fs: F,
    root: PathBuf,
    graph_driver: String,
    images_dir: PathBuf,
    layers_dir: PathBuf,
    graph_driver_dir: PathBuf,
}

impl DockerStore<HostFs> {
    /// Opens the store at `root` using the default graph driver.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_fs(HostFs, root, DEFAULT_GRAPH_DRIVER)
    }
}

impl<F: StoreFs> DockerStore<F> {
    pub fn with_fs(fs: F, root: impl AsRef<Path>, graph_driver: &str) -> Self {
        let root = root.as_ref().to_path_buf();
        let images_dir = root.join("image").join(graph_driver);
        let layers_dir = images_dir.join("layerdb").join(LAYERDB_ALGORITHM.name());
        let graph_driver_dir = root.join(graph_driver);

        DockerStore {
            fs,
            root,
            graph_driver: graph_driver.to_string(),
            images_dir,
            layers_dir,
            graph_driver_dir,
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn graph_driver(&self) -> &str {
        &self.graph_driver
    }

    /// `<root>/image/<driver>`
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// `<root>/image/<driver>/layerdb/sha256`
    pub fn layers_dir(&self) -> &Path {
        &self.layers_dir
    }

    /// `<root>/<driver>`
    pub fn graph_driver_dir(&self) -> &Path {
        &self.graph_driver_dir
    }

    /// `<root>/image/<driver>/imagedb`
    pub fn image_metadata_dir(&self) -> PathBuf {
        self.images_dir.join(IMAGEDB_DIR)
    }

    /// Lists the names in the layers directory, sorted.
    ///
    /// A missing layers directory is an empty store.
    pub fn read_layers_dir(&self) -> Result<Vec<OsString>> {
        match self.fs.read_dir_names(&self.layers_dir) {
            Ok(mut names) => {
                names.sort();
                Ok(names)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(FsckError::ReadLayers {
                path: self.layers_dir.clone(),
                source,
            }),
        }
    }

    /// Parses the layer directory called `name`.
    pub fn parse_layer_dir(&self, name: &OsStr) -> std::result::Result<Layer, BrokenLayer> {
        parse_layer(&self.fs, &self.layers_dir, name, &self.graph_driver_dir)
    }

    /// Recursively removes the image metadata directory.  Succeeds if it is
    /// already gone.
    pub fn remove_image_metadata(&self) -> Result<()> {
        let path = self.image_metadata_dir();
        self.fs
            .remove_all(&path)
            .map_err(|source| FsckError::RemoveImageMetadata { path, source })
    }
}
