//! Gatherer configuration: grit-style attributes and defines plus distribution settings.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;

use crate::density::ScaleFactors;
use crate::image_set::DEFAULT_THEME_SCHEME;
use crate::inline::{InlineOptions, distribution_from_env};

/// File name searched for next to the input document.
pub const DEFAULT_CONFIG_FILE: &str = "gatherer.config.json";

/// Attribute enabling external `<script src>` references.
pub const ATTR_ALLOW_EXTERNAL_SCRIPT: &str = "allowexternalscript";
/// Attribute enabling recursive flattening of the document.
pub const ATTR_FLATTEN_HTML: &str = "flattenhtml";
/// Define listing the supported scale factors, comma separated.
pub const DEFINE_SCALE_FACTORS: &str = "scale_factors";

/// On-disk layout of the configuration file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
  #[serde(default)]
  attributes: BTreeMap<String, String>,
  #[serde(default)]
  defines: BTreeMap<String, String>,
  #[serde(default)]
  distribution: Option<String>,
  #[serde(default)]
  theme_scheme: Option<String>,
}

/// Settings for processing a single HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GathererConfig {
  /// Keep external script references when flattening.
  pub allow_external_script: bool,
  /// Recursively inline referenced files instead of only rewriting image sets.
  pub flatten_html: bool,
  /// Densities to add next to the implicit `1x`.
  pub scale_factors: ScaleFactors,
  /// Explicit distribution name; `None` falls back to the build environment.
  pub distribution: Option<String>,
  /// Scheme of theme resource URLs that serve every density.
  pub theme_scheme: String,
}

impl Default for GathererConfig {
  fn default() -> Self {
    Self {
      allow_external_script: false,
      flatten_html: false,
      scale_factors: ScaleFactors::new(),
      distribution: None,
      theme_scheme: DEFAULT_THEME_SCHEME.to_string(),
    }
  }
}

impl GathererConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing or malformed file yields the defaults so a document can always be processed.
  pub fn discover(dir: &Path) -> Self {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if !candidate.is_file() {
      return Self::default();
    }

    match Self::from_path(&candidate) {
      Ok(config) => config,
      Err(err) => {
        warn!("ignoring {}: {err:#}", candidate.display());
        Self::default()
      }
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content =
      fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file: ConfigFile = serde_json::from_str(&content)
      .with_context(|| format!("failed to parse {}", path.display()))?;

    let mut config = Self::default();
    config.set_attributes(&file.attributes);
    config
      .set_defines(&file.defines)
      .with_context(|| format!("invalid defines in {}", path.display()))?;
    config.distribution = file.distribution;
    if let Some(scheme) = file.theme_scheme {
      config.theme_scheme = scheme;
    }
    Ok(config)
  }

  /// Apply element attributes; only the literal value `"true"` enables a flag.
  pub fn set_attributes(&mut self, attributes: &BTreeMap<String, String>) {
    self.allow_external_script = is_true(attributes.get(ATTR_ALLOW_EXTERNAL_SCRIPT));
    self.flatten_html = is_true(attributes.get(ATTR_FLATTEN_HTML));
  }

  /// Apply build defines, currently only `scale_factors`.
  pub fn set_defines(&mut self, defines: &BTreeMap<String, String>) -> Result<()> {
    if let Some(value) = defines.get(DEFINE_SCALE_FACTORS) {
      self.scale_factors = ScaleFactors::parse_list(value)?;
    }
    Ok(())
  }

  /// Distribution name substituted for `%DISTRIBUTION%`.
  pub fn resolved_distribution(&self) -> String {
    self
      .distribution
      .clone()
      .unwrap_or_else(distribution_from_env)
  }

  /// Options handed to the inliner when flattening.
  pub fn inline_options(&self) -> InlineOptions {
    InlineOptions {
      allow_external_script: self.allow_external_script,
      distribution: self.resolved_distribution(),
    }
  }
}

fn is_true(value: Option<&String>) -> bool {
  value.is_some_and(|value| value == "true")
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
      .iter()
      .map(|(key, value)| (key.to_string(), value.to_string()))
      .collect()
  }

  #[test]
  fn attributes_require_literal_true() {
    let mut config = GathererConfig::default();
    config.set_attributes(&map(&[("flattenhtml", "true"), ("allowexternalscript", "yes")]));

    assert!(config.flatten_html);
    assert!(!config.allow_external_script);
  }

  #[test]
  fn defines_set_scale_factors() {
    let mut config = GathererConfig::default();
    config.set_defines(&map(&[("scale_factors", "2x,1.5x")])).unwrap();
    assert_eq!(config.scale_factors.to_string(), "2x,1.5x");

    config.set_defines(&map(&[("other", "1")])).unwrap();
    assert_eq!(config.scale_factors.to_string(), "2x,1.5x");
  }

  #[test]
  fn rejects_malformed_scale_factors() {
    let mut config = GathererConfig::default();
    assert!(config.set_defines(&map(&[("scale_factors", "2x,big")])).is_err());
  }

  #[test]
  fn discover_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    assert_eq!(GathererConfig::discover(dir.path()), GathererConfig::default());

    fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "{ not json").unwrap();
    assert_eq!(GathererConfig::discover(dir.path()), GathererConfig::default());
  }

  #[test]
  fn reads_configuration_file() {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join(DEFAULT_CONFIG_FILE),
      r#"{
        "attributes": {"flattenhtml": "true"},
        "defines": {"scale_factors": "2x"},
        "distribution": "_google_chrome",
        "theme_scheme": "app"
      }"#,
    )
    .unwrap();

    let config = GathererConfig::discover(dir.path());
    assert!(config.flatten_html);
    assert_eq!(config.scale_factors.to_string(), "2x");
    assert_eq!(config.resolved_distribution(), "_google_chrome");
    assert_eq!(config.theme_scheme, "app");
    assert_eq!(config.inline_options().distribution, "_google_chrome");
  }
}
