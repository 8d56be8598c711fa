//! Existence checks for density-specific sibling files.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Capability used by the expander to ask whether a candidate file exists.
pub trait ResourceProbe {
  /// Returns `Ok(true)` when `path` names a regular file.
  ///
  /// A path that does not exist is `Ok(false)`; any other failure is returned as an error.
  fn is_file(&self, path: &Path) -> io::Result<bool>;
}

impl<P: ResourceProbe + ?Sized> ResourceProbe for &P {
  fn is_file(&self, path: &Path) -> io::Result<bool> {
    (**self).is_file(path)
  }
}

/// Probe backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl ResourceProbe for FsProbe {
  fn is_file(&self, path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
      Ok(metadata) => Ok(metadata.is_file()),
      Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
        Ok(false)
      }
      Err(err) => Err(err),
    }
  }
}

/// Probe answering from a fixed set of paths, useful for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryProbe {
  files: BTreeSet<PathBuf>,
}

impl MemoryProbe {
  /// Create a probe that reports every path in `files` as present.
  pub fn new<I, P>(files: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
  {
    Self {
      files: files.into_iter().map(Into::into).collect(),
    }
  }

  /// Register another file.
  pub fn insert(&mut self, path: impl Into<PathBuf>) {
    self.files.insert(path.into());
  }
}

impl ResourceProbe for MemoryProbe {
  fn is_file(&self, path: &Path) -> io::Result<bool> {
    Ok(self.files.contains(path))
  }
}
