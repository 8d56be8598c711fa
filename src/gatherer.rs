//! HTML document gatherer producing a single packaged text resource.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::config::GathererConfig;
use crate::image_set::ImageSetRewriter;
use crate::inline::{inline_to_string, resource_filenames};

/// An HTML document processed for packaging.
///
/// When flattening, local resources are inlined and every text payload gets image-set
/// rewriting relative to its own directory. Otherwise only the document itself is
/// rewritten.
#[derive(Debug, Clone)]
pub struct HtmlGatherer {
  resource_id: String,
  input_path: PathBuf,
  config: GathererConfig,
  inlined_text: Option<String>,
}

impl HtmlGatherer {
  /// Create a gatherer for the document at `input_path` with default settings.
  pub fn new(resource_id: impl Into<String>, input_path: impl Into<PathBuf>) -> Self {
    Self {
      resource_id: resource_id.into(),
      input_path: input_path.into(),
      config: GathererConfig::default(),
      inlined_text: None,
    }
  }

  /// Replace the whole configuration.
  pub fn with_config(mut self, config: GathererConfig) -> Self {
    self.config = config;
    self
  }

  /// Apply `allowexternalscript` / `flattenhtml` attributes.
  pub fn set_attributes(&mut self, attributes: &BTreeMap<String, String>) {
    self.config.set_attributes(attributes);
  }

  /// Apply build defines such as `scale_factors`.
  pub fn set_defines(&mut self, defines: &BTreeMap<String, String>) -> Result<()> {
    self.config.set_defines(defines)
  }

  /// Identifiers of the resources this gatherer produces.
  pub fn textual_ids(&self) -> Vec<String> {
    vec![self.resource_id.clone()]
  }

  /// Read and process the document.
  pub fn parse(&mut self) -> Result<()> {
    let path = self.input_path.as_path();
    let distribution = self.config.resolved_distribution();

    let text = if self.config.flatten_html {
      inline_to_string(path, &self.config.inline_options(), self.rewriter())?
    } else {
      let base_dir = parent_dir(path);
      let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
      self
        .rewriter()
        .process(&base_dir, &source, &distribution)
        .with_context(|| format!("failed to rewrite image sets in {}", path.display()))?
    };

    info!(
      "gathered {} ({} bytes, scale factors [{}])",
      path.display(),
      text.len(),
      self.config.scale_factors
    );
    self.inlined_text = Some(text);
    Ok(())
  }

  /// Processed document text; [`HtmlGatherer::parse`] must have succeeded first.
  pub fn text(&self) -> Result<&str> {
    self
      .inlined_text
      .as_deref()
      .ok_or_else(|| anyhow!("{} has not been parsed", self.input_path.display()))
  }

  /// Processed document bytes for the resource pack.
  pub fn data(&self) -> Result<&[u8]> {
    self.text().map(str::as_bytes)
  }

  /// Every file read when flattening the document; empty when not flattening.
  pub fn html_resource_filenames(&self) -> Result<BTreeSet<PathBuf>> {
    if !self.config.flatten_html {
      return Ok(BTreeSet::new());
    }
    resource_filenames(
      &self.input_path,
      &self.config.inline_options(),
      self.rewriter(),
    )
  }

  fn rewriter(&self) -> ImageSetRewriter {
    ImageSetRewriter::new(self.config.scale_factors.clone())
      .with_theme_scheme(self.config.theme_scheme.clone())
  }
}

fn parent_dir(path: &Path) -> PathBuf {
  match path.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  }
}
