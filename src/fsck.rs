//! Checking and repairing the layer store.
//!
//! [`check_store`] walks every layer metadata directory, sorts layers into
//! valid and broken, and, when asked to repair, deletes the broken ones.
//! Repair deletes the whole image metadata directory before touching any
//! layer, so no image is left referencing a removed layer.
//!
//! The store must not be in use while this runs.

use std::{collections::BTreeMap, ffi::OsString};

use log::{debug, error, info, warn};

use crate::{
    error::{FsckError, Result},
    fs::StoreFs,
    layer::BrokenLayer,
    store::DockerStore,
};

/// Outcome of a store check that didn't fail.
#[derive(Debug, Default)]
pub struct Report {
    /// Number of layers that passed every check.
    pub valid: usize,
    /// Layers that failed a check, keyed by metadata directory name.
    pub broken: BTreeMap<OsString, BrokenLayer>,
    /// Whether the broken layers (and the image metadata) were removed.
    pub repaired: bool,
}

impl Report {
    pub fn broken_count(&self) -> usize {
        self.broken.len()
    }
}

/// The number of broken layers found by a check, or -1 if it failed.
pub fn broken_count(result: &Result<Report>) -> i64 {
    match result {
        Ok(report) => i64::try_from(report.broken_count()).unwrap_or(i64::MAX),
        Err(_) => -1,
    }
}

/// Checks every layer in `store`, and removes broken ones if `repair` is set.
///
/// Broken layers are keyed by directory name rather than chain ID, since
/// layers whose name isn't a valid chain ID have none.
pub fn check_store<F: StoreFs>(store: &DockerStore<F>, repair: bool) -> Result<Report> {
    let names = store.read_layers_dir()?;

    let mut report = Report::default();
    for name in names {
        match store.parse_layer_dir(&name) {
            Ok(layer) => {
                // chain and mount consistency are not checked
                debug!("layer ok: {}", layer.dir.display());
                report.valid += 1;
            }
            Err(broken) => {
                warn!(
                    "layer parse error; dir: {}, err: {}",
                    broken.dir.display(),
                    broken.error
                );
                report.broken.insert(name, broken);
            }
        }
    }

    info!("found {} broken layers", report.broken.len());

    if report.broken.is_empty() {
        return Ok(report);
    }
    if !repair {
        info!("skip broken layers removal");
        return Ok(report);
    }

    remove_broken_layers(store, &report.broken)?;
    report.repaired = true;
    Ok(report)
}

fn remove_broken_layers<F: StoreFs>(
    store: &DockerStore<F>,
    broken: &BTreeMap<OsString, BrokenLayer>,
) -> Result<()> {
    // must complete before any layer goes away
    store.remove_image_metadata()?;

    let mut failed = 0;
    let mut last_error = None;
    for layer in broken.values() {
        info!("removing layer: {}", layer.dir.display());
        if let Err(e) = layer.remove(store.fs()) {
            error!("failed to remove layer: {}; err: {e}", layer.dir.display());
            failed += 1;
            last_error = Some((layer.dir.clone(), e));
        }
    }

    match last_error {
        Some((path, source)) => Err(FsckError::RemoveLayers {
            failed,
            path,
            source,
        }),
        None => Ok(()),
    }
}
