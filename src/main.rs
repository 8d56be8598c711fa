//! Command-line entry point for flattening a document and expanding its image sets.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use density_inliner::{GathererConfig, HtmlGatherer, ScaleFactors};

/// Prepare an HTML document for packaging with density-aware CSS images.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
  /// HTML document to process
  #[arg(value_hint = clap::ValueHint::FilePath)]
  input: PathBuf,

  /// Write the result here instead of stdout
  #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
  output: Option<PathBuf>,

  /// Configuration file (default: gatherer.config.json next to the input)
  #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
  config: Option<PathBuf>,

  /// Supported scale factors besides 1x, e.g. `2x,3x`
  #[arg(short, long)]
  scale_factors: Option<ScaleFactors>,

  /// Recursively inline referenced files
  #[arg(long)]
  flatten: bool,

  /// Keep <script> tags that point at external URLs
  #[arg(long)]
  allow_external_script: bool,

  /// Value substituted for %DISTRIBUTION% in resource paths
  #[arg(long)]
  distribution: Option<String>,

  /// Scheme of theme resource URLs that serve every density
  #[arg(long)]
  theme_scheme: Option<String>,

  /// Resource identifier of the gathered document
  #[arg(long, default_value = "IDR_HTML")]
  resource_id: String,

  /// Print the files read while flattening instead of the document
  #[arg(long)]
  list_resources: bool,

  /// Increase logging verbosity (-v debug, -vv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = load_config(&cli)?;
  let mut gatherer = HtmlGatherer::new(cli.resource_id.clone(), &cli.input).with_config(config);

  if cli.list_resources {
    let mut stdout = io::stdout().lock();
    for path in gatherer.html_resource_filenames()? {
      writeln!(stdout, "{}", path.display())?;
    }
    return Ok(());
  }

  gatherer.parse()?;
  let text = gatherer.text()?;

  match &cli.output {
    Some(path) => write_output(path, text),
    None => {
      io::stdout()
        .lock()
        .write_all(text.as_bytes())
        .context("failed to write to stdout")
    }
  }
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };

  env_logger::Builder::new()
    .filter_level(level)
    .parse_default_env()
    .init();
}

fn load_config(cli: &Cli) -> Result<GathererConfig> {
  let mut config = match &cli.config {
    Some(path) => GathererConfig::from_path(path)?,
    None => {
      let dir = cli
        .input
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      GathererConfig::discover(dir)
    }
  };

  if let Some(scale_factors) = &cli.scale_factors {
    config.scale_factors = scale_factors.clone();
  }
  if cli.flatten {
    config.flatten_html = true;
  }
  if cli.allow_external_script {
    config.allow_external_script = true;
  }
  if let Some(distribution) = &cli.distribution {
    config.distribution = Some(distribution.clone());
  }
  if let Some(scheme) = &cli.theme_scheme {
    config.theme_scheme = scheme.clone();
  }

  Ok(config)
}

fn write_output(path: &Path, text: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
  }
  fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}
