//! Density-aware rewriting of CSS image declarations.
//!
//! Rewriting runs in two phases over a text payload. Existing `-webkit-image-set` values
//! are pruned down to the supported densities first, then single `url(...)` image
//! declarations are expanded into image sets listing every density variant that exists
//! next to the base image. Anything the patterns do not recognise is copied through
//! verbatim, so the rewrite is safe to apply to arbitrary HTML, CSS or JavaScript.

mod expand;
mod patterns;
mod probe;
mod prune;

use std::path::{Path, PathBuf};

use log::debug;

use crate::density::ScaleFactors;
use crate::inline::RewriteHook;

pub use expand::{
  DEFAULT_THEME_SCHEME, DIST_SUBSTR, ImageSetExpander, expand_image_sets, is_theme_source,
};
pub use probe::{FsProbe, MemoryProbe, ResourceProbe};
pub use prune::prune_image_sets;

/// Errors raised while rewriting image declarations.
#[derive(Debug, thiserror::Error)]
pub enum ImageSetError {
  /// A density variant could not be checked for a reason other than it being absent.
  #[error("failed to probe {}: {source}", path.display())]
  Probe {
    /// Candidate path that was being checked.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },
}

/// Configured image-set rewrite, usable directly or as an inliner [`RewriteHook`].
#[derive(Debug, Clone)]
pub struct ImageSetRewriter<P = FsProbe> {
  scale_factors: ScaleFactors,
  theme_scheme: String,
  probe: P,
}

impl ImageSetRewriter {
  /// Rewriter probing the local filesystem.
  pub fn new(scale_factors: ScaleFactors) -> Self {
    Self::with_probe(scale_factors, FsProbe)
  }
}

impl<P: ResourceProbe> ImageSetRewriter<P> {
  /// Rewriter answering existence checks through `probe`.
  pub fn with_probe(scale_factors: ScaleFactors, probe: P) -> Self {
    Self {
      scale_factors,
      theme_scheme: DEFAULT_THEME_SCHEME.to_string(),
      probe,
    }
  }

  /// Override the theme resource scheme.
  pub fn with_theme_scheme(mut self, scheme: impl Into<String>) -> Self {
    self.theme_scheme = scheme.into();
    self
  }

  /// Prune unsupported densities, then expand single images found in `text`.
  ///
  /// `base_dir` is the directory the text was read from; relative image paths are
  /// resolved against it.
  pub fn process(
    &self,
    base_dir: &Path,
    text: &str,
    distribution: &str,
  ) -> Result<String, ImageSetError> {
    let supported = self.scale_factors.with_base();
    let pruned = prune_image_sets(text, &supported);

    debug!(
      "expanding image sets under {} for [{}]",
      base_dir.display(),
      self.scale_factors
    );
    ImageSetExpander::new(base_dir, &self.scale_factors, distribution, &self.probe)
      .with_theme_scheme(&self.theme_scheme)
      .expand(&pruned)
  }
}

impl<P: ResourceProbe> RewriteHook for ImageSetRewriter<P> {
  fn rewrite(&self, base_dir: &Path, text: &str, distribution: &str) -> anyhow::Result<String> {
    Ok(self.process(base_dir, text, distribution)?)
  }
}

/// Add references to available high density images and remove unsupported ones.
///
/// Equivalent to [`ImageSetRewriter::process`] with the filesystem probe.
pub fn process_image_sets(
  base_dir: &Path,
  text: &str,
  scale_factors: &ScaleFactors,
  distribution: &str,
) -> Result<String, ImageSetError> {
  ImageSetRewriter::new(scale_factors.clone()).process(base_dir, text, distribution)
}
