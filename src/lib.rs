pub mod config;
pub mod draw;
pub mod error;
pub mod fonts;
pub mod logging;
pub mod matcher;
pub mod overlay;
pub mod parse;

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use tracing::info;

use crate::config::Config;
use crate::draw::{DrawStyle, LopdfCanvas};
use crate::error::{Result, StampError};
use crate::overlay::{apply, resolve_dest, Reporter};
use crate::parse::LopdfExtractor;

/// Stamps the PDF described by `config` and writes it to the resolved
/// destination.
///
/// # Arguments
/// * `config` - A validated configuration
/// * `reporter` - Receives per-instruction outcomes
///
/// # Returns
/// * `Result<PathBuf>` - The path the output was written to, with `{DATE}`
///   replaced by today's date
pub fn stamp_pdf<R: Reporter + ?Sized>(config: &Config, reporter: &mut R) -> Result<PathBuf> {
    // 1. Read the source once and parse it into both handles
    let pdf_bytes = fs::read(&config.src).map_err(|source| StampError::Io {
        path: config.src.clone(),
        source,
    })?;
    let extractor = LopdfExtractor::load_mem(&pdf_bytes)?;
    let mut canvas = LopdfCanvas::load_mem(&pdf_bytes)?;

    // 2. Draw every instruction and serialize
    let style = DrawStyle::new(config.font_size, config.color);
    let output = apply(
        &extractor,
        &mut canvas,
        &style,
        config.page,
        &config.writes,
        reporter,
    )?;

    // 3. Write the single output file
    let dest = PathBuf::from(resolve_dest(&config.dest, Local::now().date_naive()));
    fs::write(&dest, output).map_err(|source| StampError::Io {
        path: dest.clone(),
        source,
    })?;
    info!(dest = %dest.display(), "PDF saved");

    Ok(dest)
}
