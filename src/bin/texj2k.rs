//! texj2k CLI - inspect JPEG 2000 texture headers.
//!
//! Reads image shape the way the decoder's fallback does, without a decode
//! backend.

use clap::{ArgAction, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use texj2k_rs::header::HeaderParser;
use texj2k_rs::jp2::{self, Jp2Reader};
use texj2k_rs::metadata::{self, MetadataSource};

/// Inspect JPEG 2000 codestreams and JP2 files
#[derive(Parser)]
#[command(name = "texj2k")]
#[command(version)]
#[command(about = "JPEG 2000 texture header inspection", long_about = None)]
#[command(after_help = "EXAMPLES:
    texj2k info -i texture.j2c
    texj2k info -i image.jp2 --extended
    texj2k -vv segments -i texture.j2c")]
struct Cli {
    /// Log verbosity: -v for info, -vv for debug, -vvv for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display image dimensions recovered from the header
    ///
    /// Walks the main header first and falls back to fixed SIZ offsets when
    /// the walk cannot find a complete SIZ segment.
    #[command(visible_alias = "i")]
    Info {
        #[arg(short, long, help = "Path to the codestream or JP2 file")]
        input: PathBuf,

        /// Show tile size, coding style and comments
        #[arg(short, long)]
        extended: bool,
    },

    /// List the marker segments visited by the header walk
    #[command(visible_alias = "s")]
    Segments {
        #[arg(short, long, help = "Path to the codestream or JP2 file")]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }

    let result = match cli.command {
        Commands::Info { input, extended } => show_info(&input, extended),
        Commands::Segments { input } => list_segments(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn show_info(input: &PathBuf, extended: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!(
        "Format: {}",
        if Jp2Reader::is_jp2(&data) {
            "JP2 Container (JPEG 2000)"
        } else {
            "JPEG 2000 Codestream"
        }
    );
    println!();

    let recovered = metadata::recover(&data);
    let descriptor = &recovered.descriptor;
    let source = match recovered.source {
        Some(MetadataSource::FullHeader) => "header walk",
        Some(MetadataSource::FastPath) => "fixed SIZ offsets",
        None => return Err("no JPEG 2000 header found".into()),
    };

    println!("  Source:     {}", source);
    println!("  Dimensions: {}x{}", descriptor.width, descriptor.height);
    println!("  Components: {}", descriptor.component_count);
    if descriptor.component_precision_bits > 0 {
        println!("  Bit depth:  {} bits", descriptor.component_precision_bits);
    }

    if extended {
        if let Some(size) = &descriptor.size {
            println!("  Image offset: {}x{}", size.x_origin, size.y_origin);
            println!("  Tile size:    {}x{}", size.tile_width, size.tile_height);
            println!(
                "  Tile offset:  {}x{}",
                size.tile_x_origin, size.tile_y_origin
            );
            for (i, c) in size.components.iter().enumerate() {
                println!(
                    "  Component {}: {} bits{}, subsampling {}x{}",
                    i,
                    c.precision,
                    if c.is_signed { " signed" } else { "" },
                    c.dx,
                    c.dy
                );
            }
        }
        if let Some(cod) = &descriptor.coding_style {
            println!("  DWT levels:  {}", cod.decomposition_levels);
            println!("  Layers:      {}", cod.number_of_layers);
            println!(
                "  Progression: {}",
                match cod.progression_order {
                    0 => "LRCP",
                    1 => "RLCP",
                    2 => "RPCL",
                    3 => "PCRL",
                    4 => "CPRL",
                    _ => "Unknown",
                }
            );
            println!(
                "  Code-block:  {}x{}",
                1u32 << (u32::from(cod.codeblock_width_exp) + 2).min(31),
                1u32 << (u32::from(cod.codeblock_height_exp) + 2).min(31)
            );
            println!(
                "  Wavelet:     {}",
                if cod.transformation == 1 { "5-3 reversible" } else { "9-7 irreversible" }
            );
        }
        for comment in &descriptor.comments {
            println!("  Comment:     {}", comment);
        }
    }

    Ok(())
}

fn list_segments(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let codestream = jp2::codestream(&data);

    let mut count = 0usize;
    let descriptor = HeaderParser::new(codestream).parse_with(|segment| {
        count += 1;
        match segment.length {
            Some(length) => println!(
                "{:>8}  {:04X}  {:<4}  length {}",
                segment.offset,
                segment.code,
                segment.name(),
                length
            ),
            None => println!(
                "{:>8}  {:04X}  {:<4}",
                segment.offset,
                segment.code,
                segment.name()
            ),
        }
    });

    println!();
    println!(
        "{} segments, header {}",
        count,
        if descriptor.valid { "valid" } else { "invalid" }
    );
    Ok(())
}

/// A simple stderr logger.
static LOGGER: StderrLogger = StderrLogger;
struct StderrLogger;
impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let target = if !record.target().is_empty() {
                record.target()
            } else {
                record.module_path().unwrap_or_default()
            };
            let line = record.line().unwrap_or(0);

            match record.level() {
                log::Level::Error => eprintln!("Error (in {}:{}): {}", target, line, record.args()),
                log::Level::Warn => eprintln!("Warning (in {}:{}): {}", target, line, record.args()),
                log::Level::Info => eprintln!("Info (in {}:{}): {}", target, line, record.args()),
                log::Level::Debug => eprintln!("Debug (in {}:{}): {}", target, line, record.args()),
                log::Level::Trace => eprintln!("Trace (in {}:{}): {}", target, line, record.args()),
            }
        }
    }

    fn flush(&self) {}
}
