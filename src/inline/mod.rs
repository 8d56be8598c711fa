//! Recursive flattening of an HTML document and the files it references.
//!
//! Every text file read while flattening is first passed through a [`RewriteHook`] together
//! with the directory it was read from, so relative references inside the payload resolve
//! next to that file even when it was pulled in from a nested directory.

mod data_uri;

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use log::{debug, trace};
use regex::{Captures, Regex};

use crate::image_set::DIST_SUBSTR;

pub use data_uri::{encode_data_uri, mime_type_for};

/// Environment variable selecting the distribution name.
pub const DIST_ENV_VAR: &str = "CHROMIUM_BUILD";

/// Distribution used when [`DIST_ENV_VAR`] is not set.
pub const DIST_DEFAULT: &str = "chromium";

/// Transformation applied to every text payload read by the inliner.
pub trait RewriteHook {
  /// Rewrite `text`, which was read from a file inside `base_dir`.
  fn rewrite(&self, base_dir: &Path, text: &str, distribution: &str) -> Result<String>;
}

impl<H: RewriteHook + ?Sized> RewriteHook for &H {
  fn rewrite(&self, base_dir: &Path, text: &str, distribution: &str) -> Result<String> {
    (**self).rewrite(base_dir, text, distribution)
  }
}

/// Hook that returns payloads unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl RewriteHook for PassThrough {
  fn rewrite(&self, _base_dir: &Path, text: &str, _distribution: &str) -> Result<String> {
    Ok(text.to_string())
  }
}

/// Options controlling how a document is flattened.
#[derive(Debug, Clone)]
pub struct InlineOptions {
  /// Keep `<script>` tags pointing at external URLs instead of failing.
  pub allow_external_script: bool,
  /// Value substituted for `%DISTRIBUTION%` in referenced paths.
  pub distribution: String,
}

impl Default for InlineOptions {
  fn default() -> Self {
    Self {
      allow_external_script: false,
      distribution: distribution_from_env(),
    }
  }
}

/// Determine the distribution name from the build environment.
///
/// A leading underscore is stripped and the value lowercased; `chromium` is used when the
/// variable is absent.
pub fn distribution_from_env() -> String {
  match env::var(DIST_ENV_VAR) {
    Ok(value) => normalise_distribution(&value),
    Err(_) => DIST_DEFAULT.to_string(),
  }
}

fn normalise_distribution(value: &str) -> String {
  let trimmed = value.trim();
  match trimmed.strip_prefix('_') {
    Some(rest) if !rest.is_empty() => rest.to_lowercase(),
    _ => trimmed.to_string(),
  }
}

/// Flatten the HTML file at `path` into a single string.
pub fn inline_to_string<H: RewriteHook>(
  path: &Path,
  options: &InlineOptions,
  hook: H,
) -> Result<String> {
  let mut inliner = Inliner::new(options, &hook);
  inliner.inline_html(path)
}

/// List every file that would be read while flattening `path`, including `path` itself.
pub fn resource_filenames<H: RewriteHook>(
  path: &Path,
  options: &InlineOptions,
  hook: H,
) -> Result<BTreeSet<PathBuf>> {
  let mut inliner = Inliner::new(options, &hook);
  inliner.inline_html(path)?;
  Ok(inliner.files)
}

fn include_tag() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)<include\s+src=["'](?P<src>[^"']*)["']\s*/?>(?:\s*</include>)?"#)
      .expect("invalid include regex")
  })
}

fn stylesheet_tag() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)<link\b[^>]*\brel=["']stylesheet["'][^>]*>"#)
      .expect("invalid stylesheet regex")
  })
}

fn href_attribute() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?i)\bhref=["'](?P<href>[^"']*)["']"#).expect("invalid href regex")
  })
}

fn script_tag() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r#"(?is)<script\b(?P<before>[^>]*?)\s+src=["'](?P<src>[^"']*)["'](?P<after>[^>]*)>\s*</script>"#,
    )
    .expect("invalid script regex")
  })
}

fn src_attribute() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r#"(?i)(?P<prefix><(?P<tag>[a-z][\w-]*)\b[^>]*?\ssrc=)["'](?P<src>[^"']*)["']"#,
    )
    .expect("invalid src attribute regex")
  })
}

fn css_url() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r#"url\((?:'(?P<single>[^"')(]*)'|"(?P<double>[^"')(]*)"|(?P<bare>[^"')(]*))\)"#,
    )
    .expect("invalid css url regex")
  })
}

/// References the inliner never tries to read from disk.
fn is_external_reference(reference: &str) -> bool {
  let trimmed = reference.trim();
  trimmed.is_empty() || trimmed.contains(':') || trimmed.starts_with('#') || trimmed.starts_with("//")
}

struct Inliner<'a, H> {
  options: &'a InlineOptions,
  hook: &'a H,
  files: BTreeSet<PathBuf>,
  stack: Vec<PathBuf>,
}

impl<'a, H: RewriteHook> Inliner<'a, H> {
  fn new(options: &'a InlineOptions, hook: &'a H) -> Self {
    Self {
      options,
      hook,
      files: BTreeSet::new(),
      stack: Vec::new(),
    }
  }

  fn inline_html(&mut self, path: &Path) -> Result<String> {
    let canonical = self.enter(path)?;
    let (dir, mut text) = self.read_rewritten(path)?;

    // Scripts and includes have their own branches below.
    text = self.replace(src_attribute(), &text, |inliner, caps| {
      let tag = &caps["tag"];
      if tag.eq_ignore_ascii_case("script") || tag.eq_ignore_ascii_case("include") {
        return Ok(caps[0].to_string());
      }
      let src = &caps["src"];
      match inliner.data_uri(&dir, src)? {
        Some(uri) => Ok(format!("{}\"{uri}\"", &caps["prefix"])),
        None => Ok(caps[0].to_string()),
      }
    })?;
    text = self.inline_css_urls(&dir, &text)?;

    text = self.replace(stylesheet_tag(), &text, |inliner, caps| {
      let Some(href) = href_attribute().captures(&caps[0]) else {
        return Ok(caps[0].to_string());
      };
      let href = &href["href"];
      if is_external_reference(href) {
        return Ok(caps[0].to_string());
      }
      let css = inliner.inline_css(&dir.join(inliner.substitute(href)))?;
      Ok(format!("<style>{css}</style>"))
    })?;

    text = self.replace(script_tag(), &text, |inliner, caps| {
      let src = &caps["src"];
      if is_external_reference(src) {
        if src.contains(':') && !inliner.options.allow_external_script {
          bail!("external script {src} is not allowed in {}", path.display());
        }
        return Ok(caps[0].to_string());
      }
      let script = inliner.read_rewritten(&dir.join(inliner.substitute(src)))?.1;
      Ok(format!("<script{}{}>{script}</script>", &caps["before"], &caps["after"]))
    })?;

    text = self.replace(include_tag(), &text, |inliner, caps| {
      let src = &caps["src"];
      if is_external_reference(src) {
        return Ok(caps[0].to_string());
      }
      inliner.inline_html(&dir.join(inliner.substitute(src)))
    })?;

    self.leave(&canonical);
    Ok(text)
  }

  fn inline_css(&mut self, path: &Path) -> Result<String> {
    let canonical = self.enter(path)?;
    let (dir, text) = self.read_rewritten(path)?;
    let text = self.inline_css_urls(&dir, &text)?;
    self.leave(&canonical);
    Ok(text)
  }

  fn inline_css_urls(&mut self, dir: &Path, text: &str) -> Result<String> {
    self.replace(css_url(), text, |inliner, caps| {
      let path = ["single", "double", "bare"]
        .into_iter()
        .find_map(|name| caps.name(name))
        .map_or("", |m| m.as_str());
      match inliner.data_uri(dir, path)? {
        Some(uri) => Ok(format!("url(\"{uri}\")")),
        None => Ok(caps[0].to_string()),
      }
    })
  }

  fn data_uri(&mut self, dir: &Path, reference: &str) -> Result<Option<String>> {
    if is_external_reference(reference) {
      return Ok(None);
    }

    let path = dir.join(self.substitute(reference));
    let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    trace!("embedding {} ({} bytes)", path.display(), bytes.len());
    self.files.insert(path.clone());
    Ok(Some(encode_data_uri(&path, &bytes)))
  }

  fn read_rewritten(&mut self, path: &Path) -> Result<(PathBuf, String)> {
    let text =
      fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    self.files.insert(path.to_path_buf());

    let dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));
    let rewritten = self
      .hook
      .rewrite(&dir, &text, &self.options.distribution)
      .with_context(|| format!("failed to rewrite {}", path.display()))?;
    Ok((dir, rewritten))
  }

  fn enter(&mut self, path: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(path)
      .with_context(|| format!("failed to resolve {}", path.display()))?;
    if self.stack.contains(&canonical) {
      bail!("include cycle detected at {}", path.display());
    }
    debug!("inlining {}", path.display());
    self.stack.push(canonical.clone());
    Ok(canonical)
  }

  fn leave(&mut self, canonical: &Path) {
    if self.stack.last().map(PathBuf::as_path) == Some(canonical) {
      self.stack.pop();
    }
  }

  fn substitute(&self, reference: &str) -> String {
    reference.replace(DIST_SUBSTR, &self.options.distribution)
  }

  fn replace<F>(&mut self, pattern: &Regex, text: &str, mut replace: F) -> Result<String>
  where
    F: FnMut(&mut Self, &Captures<'_>) -> Result<String>,
  {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for caps in pattern.captures_iter(text) {
      let Some(whole) = caps.get(0) else {
        continue;
      };
      output.push_str(&text[last..whole.start()]);
      output.push_str(&replace(self, &caps)?);
      last = whole.end();
    }

    output.push_str(&text[last..]);
    Ok(output)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn options() -> InlineOptions {
    InlineOptions {
      allow_external_script: false,
      distribution: "chromium".into(),
    }
  }

  struct Upper;
  impl RewriteHook for Upper {
    fn rewrite(&self, _base_dir: &Path, text: &str, _distribution: &str) -> Result<String> {
      Ok(text.replace("shout", "SHOUT"))
    }
  }

  #[test]
  fn inlines_stylesheets_scripts_and_images() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("css")).unwrap();
    fs::write(root.join("css/site.css"), "body { background: url('bg.gif'); }").unwrap();
    fs::write(root.join("css/bg.gif"), b"GIF").unwrap();
    fs::write(root.join("app.js"), "console.log(1);").unwrap();
    fs::write(root.join("logo.gif"), b"GIF").unwrap();
    fs::write(
      root.join("index.html"),
      r#"<link rel="stylesheet" href="css/site.css"><script src="app.js"></script><img src="logo.gif">"#,
    )
    .unwrap();

    let result = inline_to_string(&root.join("index.html"), &options(), PassThrough).unwrap();

    assert_eq!(
      result,
      "<style>body { background: url(\"data:image/gif;base64,R0lG\"); }</style>\
<script>console.log(1);</script><img src=\"data:image/gif;base64,R0lG\">"
    );
  }

  #[test]
  fn includes_are_resolved_relative_to_their_file() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("parts/img")).unwrap();
    fs::write(root.join("parts/img/a.gif"), b"GIF").unwrap();
    fs::write(root.join("parts/card.html"), r#"<img src="img/a.gif"> shout"#).unwrap();
    fs::write(root.join("index.html"), r#"<div><include src="parts/card.html"></div>"#).unwrap();

    let result = inline_to_string(&root.join("index.html"), &options(), Upper).unwrap();
    assert_eq!(
      result,
      "<div><img src=\"data:image/gif;base64,R0lG\"> SHOUT</div>"
    );
  }

  #[test]
  fn rejects_external_scripts_unless_allowed() {
    let dir = tempdir().unwrap();
    let index = dir.path().join("index.html");
    fs::write(&index, r#"<script src="https://cdn.example/x.js"></script>"#).unwrap();

    assert!(inline_to_string(&index, &options(), PassThrough).is_err());

    let allowed = InlineOptions {
      allow_external_script: true,
      ..options()
    };
    let result = inline_to_string(&index, &allowed, PassThrough).unwrap();
    assert_eq!(result, r#"<script src="https://cdn.example/x.js"></script>"#);
  }

  #[test]
  fn substitutes_distribution_in_references() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("logo_chromium.gif"), b"GIF").unwrap();
    fs::write(root.join("index.html"), r#"<img src="logo_%DISTRIBUTION%.gif">"#).unwrap();

    let result = inline_to_string(&root.join("index.html"), &options(), PassThrough).unwrap();
    assert_eq!(result, "<img src=\"data:image/gif;base64,R0lG\">");
  }

  #[test]
  fn detects_include_cycles() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.html"), r#"<include src="b.html">"#).unwrap();
    fs::write(root.join("b.html"), r#"<include src="./a.html">"#).unwrap();

    let err = inline_to_string(&root.join("a.html"), &options(), PassThrough).unwrap_err();
    assert!(err.to_string().contains("include cycle"));
  }

  #[test]
  fn missing_resources_name_the_file() {
    let dir = tempdir().unwrap();
    let index = dir.path().join("index.html");
    fs::write(&index, r#"<img src="missing.png">"#).unwrap();

    let err = inline_to_string(&index, &options(), PassThrough).unwrap_err();
    assert!(format!("{err:#}").contains("missing.png"));
  }

  #[test]
  fn lists_every_file_read() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.css"), "p { content: url('dot.gif'); }").unwrap();
    fs::write(root.join("dot.gif"), b"GIF").unwrap();
    fs::write(root.join("index.html"), r#"<link href="a.css" rel="stylesheet">"#).unwrap();

    let files = resource_filenames(&root.join("index.html"), &options(), PassThrough).unwrap();
    let expected: BTreeSet<PathBuf> = [
      root.join("index.html"),
      root.join("a.css"),
      root.join("dot.gif"),
    ]
    .into_iter()
    .collect();
    assert_eq!(files, expected);
  }

  #[test]
  fn inlines_src_on_any_element_except_scripts() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("frame.html"), "<p>hi</p>").unwrap();
    fs::write(root.join("track.vtt"), "WEBVTT").unwrap();
    fs::write(
      root.join("index.html"),
      r#"<iframe src="frame.html"></iframe><embed src="track.vtt"><img data-src="lazy.gif">"#,
    )
    .unwrap();

    let result = inline_to_string(&root.join("index.html"), &options(), PassThrough).unwrap();
    assert_eq!(
      result,
      "<iframe src=\"data:text/html;base64,PHA+aGk8L3A+\"></iframe>\
<embed src=\"data:text/vtt;base64,V0VCVlRU\"><img data-src=\"lazy.gif\">"
    );

    let files = resource_filenames(&root.join("index.html"), &options(), PassThrough).unwrap();
    assert!(files.contains(&root.join("frame.html")));
    assert!(files.contains(&root.join("track.vtt")));
  }

  #[test]
  fn css_urls_need_matching_quotes() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.gif"), b"GIF").unwrap();
    fs::write(
      root.join("a.css"),
      "p { background: url(a.gif); }\nq { background: url('a.gif\"); }",
    )
    .unwrap();
    fs::write(root.join("index.html"), r#"<link rel="stylesheet" href="a.css">"#).unwrap();

    let result = inline_to_string(&root.join("index.html"), &options(), PassThrough).unwrap();
    assert_eq!(
      result,
      "<style>p { background: url(\"data:image/gif;base64,R0lG\"); }\n\
q { background: url('a.gif\"); }</style>"
    );
  }

  #[test]
  fn normalises_distribution_values() {
    assert_eq!(normalise_distribution("_Google_Chrome"), "google_chrome");
    assert_eq!(normalise_distribution("chromium"), "chromium");
    assert_eq!(normalise_distribution("_"), "_");
  }
}
