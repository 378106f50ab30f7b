//! Filesystem access used by the checker.
//!
//! Everything the checker does to the store goes through [`StoreFs`]: listing
//! a directory, reading a small metadata file, checking whether a path exists
//! and removing a tree.  [`HostFs`] is the real implementation; tests also
//! run the checker against an in-memory tree with injectable failures.

use std::{
    ffi::OsString,
    io::{ErrorKind, Result},
    path::Path,
};

/// The filesystem operations the checker needs.
pub trait StoreFs {
    /// Lists the names of the entries of a directory, in no particular order.
    fn read_dir_names(&self, path: &Path) -> Result<Vec<OsString>>;

    /// Reads the whole content of a file.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Returns `Ok(false)` if the path does not exist, and an error if that
    /// can't be determined.
    fn try_exists(&self, path: &Path) -> Result<bool>;

    /// Removes a path and everything below it.  Removing a path that doesn't
    /// exist succeeds.
    fn remove_all(&self, path: &Path) -> Result<()>;
}

/// [`StoreFs`] backed by the host filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFs;

impl StoreFs for HostFs {
    fn read_dir_names(&self, path: &Path) -> Result<Vec<OsString>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn try_exists(&self, path: &Path) -> Result<bool> {
        path.try_exists()
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        // don't follow symlinks: a link to a directory is removed, not its target
        match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() => match std::fs::remove_dir_all(path) {
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                other => other,
            },
            Ok(_) => std::fs::remove_file(path),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<T: StoreFs + ?Sized> StoreFs for &T {
    fn read_dir_names(&self, path: &Path) -> Result<Vec<OsString>> {
        (**self).read_dir_names(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read(path)
    }

    fn try_exists(&self, path: &Path) -> Result<bool> {
        (**self).try_exists(path)
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        (**self).remove_all(path)
    }
}

#[cfg(test)]
pub(crate) mod mem {
    use std::{
        cell::RefCell,
        collections::{BTreeMap, HashMap},
        ffi::OsString,
        io::{Error, ErrorKind, Result},
        path::{Path, PathBuf},
    };

    use super::StoreFs;

    #[derive(Debug, Clone)]
    enum Node {
        Dir,
        File(Vec<u8>),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) enum Op {
        ReadDir,
        Read,
        Exists,
        Remove,
    }

    /// An in-memory tree of absolute paths.  Creating a file or directory
    /// creates its parents.  Any operation on a given path can be made to fail.
    #[derive(Debug, Default)]
    pub(crate) struct MemFs {
        nodes: RefCell<BTreeMap<PathBuf, Node>>,
        faults: RefCell<HashMap<(PathBuf, Op), ErrorKind>>,
    }

    impl MemFs {
        pub(crate) fn new() -> Self {
            let fs = Self::default();
            fs.nodes.borrow_mut().insert(PathBuf::from("/"), Node::Dir);
            fs
        }

        pub(crate) fn mkdir_all(&self, path: impl AsRef<Path>) {
            let mut nodes = self.nodes.borrow_mut();
            for ancestor in path.as_ref().ancestors() {
                nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
            }
        }

        pub(crate) fn write(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
            let path = path.as_ref();
            if let Some(parent) = path.parent() {
                self.mkdir_all(parent);
            }
            self.nodes
                .borrow_mut()
                .insert(path.to_path_buf(), Node::File(content.as_ref().to_vec()));
        }

        pub(crate) fn fail(&self, path: impl AsRef<Path>, op: Op, kind: ErrorKind) {
            self.faults
                .borrow_mut()
                .insert((path.as_ref().to_path_buf(), op), kind);
        }

        pub(crate) fn exists(&self, path: impl AsRef<Path>) -> bool {
            self.nodes.borrow().contains_key(path.as_ref())
        }

        fn check(&self, path: &Path, op: Op) -> Result<()> {
            match self.faults.borrow().get(&(path.to_path_buf(), op)) {
                Some(kind) => Err(Error::from(*kind)),
                None => Ok(()),
            }
        }
    }

    impl StoreFs for MemFs {
        fn read_dir_names(&self, path: &Path) -> Result<Vec<OsString>> {
            self.check(path, Op::ReadDir)?;
            let nodes = self.nodes.borrow();
            match nodes.get(path) {
                Some(Node::Dir) => Ok(nodes
                    .keys()
                    .filter(|p| p.parent() == Some(path))
                    .filter_map(|p| p.file_name().map(|n| n.to_os_string()))
                    .collect()),
                Some(Node::File(_)) => Err(Error::other("not a directory")),
                None => Err(ErrorKind::NotFound.into()),
            }
        }

        fn read(&self, path: &Path) -> Result<Vec<u8>> {
            self.check(path, Op::Read)?;
            match self.nodes.borrow().get(path) {
                Some(Node::File(content)) => Ok(content.clone()),
                Some(Node::Dir) => Err(Error::other("is a directory")),
                None => Err(ErrorKind::NotFound.into()),
            }
        }

        fn try_exists(&self, path: &Path) -> Result<bool> {
            self.check(path, Op::Exists)?;
            Ok(self.exists(path))
        }

        fn remove_all(&self, path: &Path) -> Result<()> {
            self.check(path, Op::Remove)?;
            self.nodes
                .borrow_mut()
                .retain(|p, _| !p.starts_with(path));
            Ok(())
        }
    }
}
