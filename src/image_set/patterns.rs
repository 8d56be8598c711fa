use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Single-image declaration, `background-image: url('foo.png'`.
///
/// The closing parenthesis is deliberately left out of the match so the replacement can
/// open an image set that the original `)` then closes.
pub(crate) fn css_image_url() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r#"(?P<attribute>content|background|[\w-]*-image):[ ]*url\(['"](?P<filename>[^"')(]*)['"]"#,
    )
    .expect("invalid css image url regex")
  })
}

/// Complete `-webkit-image-set(...)` declaration for an image property.
pub(crate) fn css_image_set() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(
      r#"(?P<attribute>content|background|[\w-]*-image):[ ]*-webkit-image-set\((?P<images>(?:[,\n ]*url\(['"][^"')(]*['"]\)[ ]*[0-9.]*x)*)\)"#,
    )
    .expect("invalid css image set regex")
  })
}

/// One entry of an image set including its leading separator.
pub(crate) fn css_image_set_entry() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"(?P<separator>[,\n ]*)(?P<image>url\(['"][^"')(]*['"]\)[ ]*(?P<scale>[0-9.]*x))"#)
      .expect("invalid css image set entry regex")
  })
}

/// Replace every match of `pattern` in `text` with the output of a fallible closure.
///
/// Text between matches is copied verbatim. The first error aborts the whole rewrite.
pub(crate) fn try_replace_all<E, F>(pattern: &Regex, text: &str, mut replace: F) -> Result<String, E>
where
  F: FnMut(&Captures<'_>) -> Result<String, E>,
{
  let mut output = String::with_capacity(text.len());
  let mut last = 0;

  for caps in pattern.captures_iter(text) {
    let Some(whole) = caps.get(0) else {
      continue;
    };
    output.push_str(&text[last..whole.start()]);
    output.push_str(&replace(&caps)?);
    last = whole.end();
  }

  output.push_str(&text[last..]);
  Ok(output)
}
