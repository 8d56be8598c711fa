//! Expansion of single `url(...)` image declarations into `-webkit-image-set` values.

use std::path::{Path, PathBuf};

use log::{debug, trace};
use regex::Captures;

use super::ImageSetError;
use super::patterns::{css_image_url, try_replace_all};
use super::probe::ResourceProbe;
use crate::density::{BASE_DENSITY, ScaleFactors};

/// Literal placeholder in resource paths that is replaced with the distribution name.
pub const DIST_SUBSTR: &str = "%DISTRIBUTION%";

/// URL scheme served by the runtime theme source when none is configured.
pub const DEFAULT_THEME_SCHEME: &str = "chrome";

/// Rewrites single-image declarations, probing for density-specific siblings.
#[derive(Debug, Clone)]
pub struct ImageSetExpander<'a, P> {
  base_dir: &'a Path,
  scale_factors: &'a ScaleFactors,
  distribution: &'a str,
  theme_scheme: &'a str,
  probe: P,
}

impl<'a, P: ResourceProbe> ImageSetExpander<'a, P> {
  /// Create an expander resolving relative paths against `base_dir`.
  pub fn new(
    base_dir: &'a Path,
    scale_factors: &'a ScaleFactors,
    distribution: &'a str,
    probe: P,
  ) -> Self {
    Self {
      base_dir,
      scale_factors,
      distribution,
      theme_scheme: DEFAULT_THEME_SCHEME,
      probe,
    }
  }

  /// Use a different scheme for theme resource URLs (`<scheme>://theme/IDR_...`).
  pub fn with_theme_scheme(mut self, scheme: &'a str) -> Self {
    self.theme_scheme = scheme;
    self
  }

  /// Rewrite every single-image declaration in `text`.
  pub fn expand(&self, text: &str) -> Result<String, ImageSetError> {
    try_replace_all(css_image_url(), text, |caps| self.insert_image_set(caps))
  }

  fn insert_image_set(&self, caps: &Captures<'_>) -> Result<String, ImageSetError> {
    let attribute = &caps["attribute"];
    let filename = &caps["filename"];

    if is_theme_source(filename, self.theme_scheme) {
      let mut images = vec![image_entry(filename, BASE_DENSITY)];
      for scale in self.scale_factors.iter() {
        images.push(image_entry(&format!("{filename}@{scale}"), scale.as_str()));
      }
      trace!("theme resource {filename} requested at {} densities", images.len());
      return Ok(render_image_set(attribute, &images));
    }

    if filename.contains(':') {
      return Ok(caps[0].to_string());
    }

    let filename = filename.replace(DIST_SUBSTR, self.distribution);
    let (directory, file) = split_basename(&filename);
    let mut images = vec![image_entry(&filename, BASE_DENSITY)];

    for scale in self.scale_factors.iter() {
      let candidate = self.sibling_path(directory, scale.as_str(), file);
      let exists = self
        .probe
        .is_file(&candidate)
        .map_err(|source| ImageSetError::Probe {
          path: candidate.clone(),
          source,
        })?;

      if exists {
        images.push(image_entry(&format!("{directory}{scale}/{file}"), scale.as_str()));
      } else {
        trace!("no {scale} variant at {}", candidate.display());
      }
    }

    debug!(
      "expanded {filename} into an image set with {} entries",
      images.len()
    );
    Ok(render_image_set(attribute, &images))
  }

  fn sibling_path(&self, directory: &str, scale: &str, file: &str) -> PathBuf {
    let parent = if directory.is_empty() {
      self.base_dir.to_path_buf()
    } else {
      self.base_dir.join(directory)
    };
    parent.join(scale).join(file)
  }
}

/// Expand single-image declarations using the default theme scheme.
pub fn expand_image_sets<P: ResourceProbe>(
  text: &str,
  base_dir: &Path,
  scale_factors: &ScaleFactors,
  distribution: &str,
  probe: P,
) -> Result<String, ImageSetError> {
  ImageSetExpander::new(base_dir, scale_factors, distribution, probe).expand(text)
}

/// Returns `true` when `filename` is served by the theme source for every density.
pub fn is_theme_source(filename: &str, scheme: &str) -> bool {
  filename
    .strip_prefix(scheme)
    .and_then(|rest| rest.strip_prefix("://theme/IDR_"))
    .is_some()
}

/// Split a CSS path into its directory prefix (with trailing `/`) and basename.
fn split_basename(filename: &str) -> (&str, &str) {
  match filename.rfind('/') {
    Some(index) => filename.split_at(index + 1),
    None => ("", filename),
  }
}

fn image_entry(path: &str, scale: &str) -> String {
  format!("url(\"{path}\") {scale}")
}

// The closing parenthesis comes from the original declaration.
fn render_image_set(attribute: &str, images: &[String]) -> String {
  format!("{attribute}: -webkit-image-set({}", images.join(", "))
}
