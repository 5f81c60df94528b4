//! Command-line front end for TrueType metrics extraction and subsetting.

use std::{collections::BTreeSet, error::Error as StdError, fs, io, path::PathBuf};

use clap::{Parser, Subcommand};
use ttf_subset::{Font, FontMetrics, FontSubset, SfntVersion, SubsetOptions};

/// Extracts metrics from TrueType fonts and subsets them for PDF embedding.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prints font metadata and per-character advance widths.
    Metrics {
        /// Path to the TrueType font.
        font: PathBuf,
        /// Outputs metrics as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Writes a font subset containing the glyphs for the specified characters.
    Subset(SubsetArgs),
}

#[derive(Debug, clap::Args)]
struct SubsetArgs {
    /// Path to the TrueType font.
    font: PathBuf,
    /// Path to write the subset to.
    #[arg(short, long)]
    output: PathBuf,
    /// Text to include in the subset. Characters outside the Basic Multilingual Plane are ignored.
    #[arg(short, long)]
    text: Option<String>,
    /// Comma-separated character codes to include, e.g. `0x41,66`.
    #[arg(short, long, value_delimiter = ',', value_parser = parse_code)]
    codes: Vec<u16>,
    /// Drops trailing equal advances from the `hmtx` table.
    #[arg(long)]
    compress_hmtx: bool,
    /// Writes the Apple `true` sfnt version instead of 0x00010000.
    #[arg(long)]
    apple_header: bool,
}

impl SubsetArgs {
    fn collect_codes(&self) -> BTreeSet<u16> {
        let mut codes: BTreeSet<_> = self.codes.iter().copied().collect();
        if let Some(text) = &self.text {
            for ch in text.chars() {
                if let Ok(code) = u16::try_from(u32::from(ch)) {
                    codes.insert(code);
                } else {
                    log::warn!("skipping {ch:?} outside the Basic Multilingual Plane");
                }
            }
        }
        codes
    }

    fn options(&self) -> SubsetOptions {
        let sfnt_version = if self.apple_header {
            SfntVersion::Apple
        } else {
            SfntVersion::TrueType
        };
        SubsetOptions::default()
            .with_compressed_hmtx(self.compress_hmtx)
            .with_sfnt_version(sfnt_version)
    }

    fn run(&self) -> Result<(), Box<dyn StdError>> {
        let font_bytes = fs::read(&self.font)?;
        let font = Font::new(&font_bytes)?;
        let codes = self.collect_codes();
        log::info!("subsetting {} with {} codes", self.font.display(), codes.len());

        let subset = FontSubset::new(&font, &codes, self.options())?;
        let output = subset.to_truetype();
        fs::write(&self.output, &output)?;
        log::info!(
            "written {} glyphs ({} bytes) to {}",
            subset.glyph_count(),
            output.len(),
            self.output.display()
        );
        Ok(())
    }
}

/// Parses a character code in decimal, `0x`-prefixed hex or `U+` notation.
fn parse_code(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix("U+"))
        .or_else(|| s.strip_prefix("u+"));
    let result = match hex {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    result.map_err(|err| format!("invalid character code `{s}`: {err}"))
}

fn print_metrics(metrics: &FontMetrics, mut out: impl io::Write) -> io::Result<()> {
    let names = &metrics.names;
    writeln!(out, "PostScript name: {}", names.postscript)?;
    writeln!(out, "Family: {} ({})", names.family, names.style)?;
    writeln!(out, "Full name: {}", names.full)?;
    writeln!(out, "Units per em: {}", metrics.units_per_em)?;
    writeln!(out, "Glyphs: {}", metrics.glyph_count)?;
    writeln!(
        out,
        "Ascent / descent / cap height: {} / {} / {}",
        metrics.ascent, metrics.descent, metrics.cap_height
    )?;
    let bbox = &metrics.bbox;
    writeln!(
        out,
        "Bounding box: [{}, {}, {}, {}]",
        bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max
    )?;
    writeln!(out, "Italic angle: {}", metrics.italic_angle)?;
    writeln!(
        out,
        "Underline position / thickness: {} / {}",
        metrics.underline_position, metrics.underline_thickness
    )?;
    writeln!(
        out,
        "Weight class: {} (StemV {})",
        metrics.weight_class, metrics.stem_v
    )?;
    writeln!(out, "Flags: {}", metrics.flags.bits())?;
    writeln!(
        out,
        "Widths: {} codes (default {})",
        metrics.widths.len(),
        metrics.widths.default_width()
    )?;
    for (code, width) in metrics.widths.iter() {
        writeln!(out, "  U+{code:04X}: {width}")?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn StdError>> {
    env_logger::init();

    match Cli::parse().command {
        Command::Metrics { font, json } => {
            let font_bytes = fs::read(&font)?;
            let metrics = Font::new(&font_bytes)?.metrics()?;
            let stdout = io::stdout().lock();
            if json {
                serde_json::to_writer_pretty(stdout, &metrics)?;
                println!();
            } else {
                print_metrics(&metrics, stdout)?;
            }
        }
        Command::Subset(args) => args.run()?,
    }
    Ok(())
}
