//! Removal of unsupported densities from existing `-webkit-image-set` declarations.

use log::trace;
use regex::Captures;

use super::patterns::{css_image_set, css_image_set_entry};

/// Drop every image-set entry whose density token is not listed in `supported`.
///
/// `supported` must already contain `1x`; tokens are compared literally. Text outside
/// recognised image-set declarations is returned untouched.
pub fn prune_image_sets<S: AsRef<str>>(text: &str, supported: &[S]) -> String {
  css_image_set()
    .replace_all(text, |caps: &Captures<'_>| {
      let attribute = &caps["attribute"];
      let images = retain_supported(&caps["images"], supported);
      format!("{attribute}: -webkit-image-set({images})")
    })
    .into_owned()
}

fn retain_supported<S: AsRef<str>>(images: &str, supported: &[S]) -> String {
  let mut retained = String::with_capacity(images.len());
  let mut leading_separator: Option<&str> = None;
  let mut dropped_first = false;

  for (index, caps) in css_image_set_entry().captures_iter(images).enumerate() {
    let separator = caps.name("separator").map_or("", |m| m.as_str());
    if index == 0 {
      leading_separator = Some(separator);
    }

    let scale = &caps["scale"];
    if !supported.iter().any(|token| token.as_ref() == scale) {
      trace!("dropping unsupported {scale} entry from image set");
      if index == 0 {
        dropped_first = true;
      }
      continue;
    }

    // Reuse the dropped first entry's separator so the list never opens with a comma.
    if retained.is_empty() && dropped_first {
      retained.push_str(leading_separator.unwrap_or(""));
    } else {
      retained.push_str(separator);
    }
    retained.push_str(&caps["image"]);
  }

  retained
}
