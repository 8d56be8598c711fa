use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

/// Guess a mime type from the file extension.
pub fn mime_type_for(path: &Path) -> &'static str {
  let extension = path
    .extension()
    .and_then(|value| value.to_str())
    .map(|value| value.to_ascii_lowercase());

  match extension.as_deref() {
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("svg") => "image/svg+xml",
    Some("webp") => "image/webp",
    Some("ico") => "image/x-icon",
    Some("bmp") => "image/bmp",
    Some("css") => "text/css",
    Some("js") => "text/javascript",
    Some("html" | "htm") => "text/html",
    Some("vtt") => "text/vtt",
    Some("woff") => "font/woff",
    Some("woff2") => "font/woff2",
    _ => "application/octet-stream",
  }
}

/// Encode `bytes` as a base64 `data:` URI.
pub fn encode_data_uri(path: &Path, bytes: &[u8]) -> String {
  format!(
    "data:{};base64,{}",
    mime_type_for(path),
    general_purpose::STANDARD.encode(bytes)
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detects_common_image_types() {
    assert_eq!(mime_type_for(Path::new("a/b.PNG")), "image/png");
    assert_eq!(mime_type_for(Path::new("logo.svg")), "image/svg+xml");
    assert_eq!(mime_type_for(Path::new("blob")), "application/octet-stream");
  }

  #[test]
  fn encodes_bytes() {
    assert_eq!(
      encode_data_uri(Path::new("x.gif"), b"GIF"),
      "data:image/gif;base64,R0lG"
    );
  }
}
