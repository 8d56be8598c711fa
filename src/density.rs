//! Display-density tokens and the ordered set of supported scale factors.

use std::fmt;
use std::str::FromStr;

/// Density token that is always supported and never listed explicitly.
pub const BASE_DENSITY: &str = "1x";

/// A display-density multiplier such as `2x` or `1.5x`.
///
/// Tokens compare by their literal text: `2x` and `2.0x` are different tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DensityToken(String);

/// Error returned when a string is not shaped like `<number>x`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid density token `{0}`, expected a value such as `2x`")]
pub struct InvalidDensityToken(pub String);

impl DensityToken {
  /// Borrow the token text.
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Returns `true` for the implicit `1x` token.
  pub fn is_base(&self) -> bool {
    self.0 == BASE_DENSITY
  }
}

impl FromStr for DensityToken {
  type Err = InvalidDensityToken;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    let trimmed = value.trim();
    let Some(number) = trimmed.strip_suffix('x') else {
      return Err(InvalidDensityToken(value.to_string()));
    };

    let has_digit = number.chars().any(|c| c.is_ascii_digit());
    let well_formed = number.chars().all(|c| c.is_ascii_digit() || c == '.')
      && number.matches('.').count() <= 1;
    if !has_digit || !well_formed {
      return Err(InvalidDensityToken(value.to_string()));
    }

    Ok(Self(trimmed.to_string()))
  }
}

impl fmt::Display for DensityToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for DensityToken {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

/// Ordered, duplicate-free list of supported densities, excluding the implicit `1x`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaleFactors(Vec<DensityToken>);

impl ScaleFactors {
  /// Create an empty set; only `1x` is supported.
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse the comma separated `scale_factors` define, e.g. `"2x,3x"`.
  ///
  /// Blank segments are skipped and `1x` is dropped because it is always implied.
  pub fn parse_list(value: &str) -> Result<Self, InvalidDensityToken> {
    let mut factors = Self::new();
    for segment in value.split(',') {
      if segment.trim().is_empty() {
        continue;
      }
      factors.push(segment.parse()?);
    }
    Ok(factors)
  }

  /// Append a token, ignoring `1x` and duplicates.
  pub fn push(&mut self, token: DensityToken) {
    if token.is_base() || self.0.contains(&token) {
      return;
    }
    self.0.push(token);
  }

  /// Iterate over configured densities in declaration order.
  pub fn iter(&self) -> impl Iterator<Item = &DensityToken> {
    self.0.iter()
  }

  /// Returns `true` when only the base density is supported.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// The retain-set used while pruning: `1x` followed by every configured density.
  pub fn with_base(&self) -> Vec<&str> {
    std::iter::once(BASE_DENSITY)
      .chain(self.0.iter().map(DensityToken::as_str))
      .collect()
  }
}

impl FromStr for ScaleFactors {
  type Err = InvalidDensityToken;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    Self::parse_list(value)
  }
}

impl fmt::Display for ScaleFactors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let joined: Vec<&str> = self.0.iter().map(DensityToken::as_str).collect();
    f.write_str(&joined.join(","))
  }
}
