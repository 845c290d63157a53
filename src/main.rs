use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use pdf_stamp::config::{Config, WriteInstruction};
use pdf_stamp::draw::DrawOptions;
use pdf_stamp::error::TextNotFound;
use pdf_stamp::logging::init_logging;
use pdf_stamp::overlay::{Reporter, TracingReporter};
use pdf_stamp::stamp_pdf;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Overlay text next to search strings found in a PDF page."
)]
pub struct Args {
    /// Path to the JSON config. Defaults to config.json beside the executable.
    pub config: Option<PathBuf>,

    /// Also write logs to pdf-stamp.log in this directory
    #[clap(long)]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

fn default_config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the executable")?;
    let dir = exe
        .parent()
        .context("executable has no parent directory")?;
    Ok(dir.join("config.json"))
}

/// Prints skipped instructions to stdout and forwards to tracing.
struct ConsoleReporter(TracingReporter);

impl Reporter for ConsoleReporter {
    fn text_drawn(&mut self, write: &WriteInstruction, options: &DrawOptions) {
        self.0.text_drawn(write, options);
    }

    fn text_not_found(&mut self, write: &WriteInstruction, error: &TextNotFound) {
        println!("{}", error);
        self.0.text_not_found(write, error);
    }
}

fn print_summary(config: &Config) {
    println!("src: {}", config.src.display());
    println!("dest: {}", config.dest);
    println!("fontSize: {}", config.font_size);
    println!("writes:");
    println!();

    let pad = config
        .writes
        .iter()
        .map(|write| write.search().chars().count())
        .max()
        .unwrap_or(0);
    for write in &config.writes {
        let (x, y) = write.offset();
        println!(
            "{:<width$} → {} {},{}",
            format!("  {}", write.search()),
            write.draw(),
            x,
            y,
            width = pad + 2
        );
    }
    println!();
}

fn main() -> Result<()> {
    let args = Args::parse_args();

    // Keep the guard alive so the file writer flushes on exit
    let _guard = init_logging(args.log_dir).context("failed to initialize logging")?;

    let path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    println!();
    println!("> Using config {}", path.display());
    println!();
    let config = Config::load(&path)?;
    print_summary(&config);

    println!("> Writing to PDF");
    let dest = stamp_pdf(&config, &mut ConsoleReporter(TracingReporter))?;
    println!("> PDF saved as {}", dest.display());

    Ok(())
}
