#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod density;
pub mod gatherer;
pub mod image_set;
pub mod inline;

pub use config::GathererConfig;
pub use density::{DensityToken, ScaleFactors};
pub use gatherer::HtmlGatherer;
pub use image_set::{ImageSetError, ImageSetRewriter, process_image_sets};
