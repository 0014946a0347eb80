//! metazip-cli - Command-line interface for metazip
//!
//! A command-line tool for compressing and decompressing files with the LZ
//! and DEFLATE metafile stream engines.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use metazip::{
    decompress_bytes, CompressEngine, DecompressEngine, EngineKind, LzParams, StreamReader,
    StreamWriter,
};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

/// Bytes moved per read or write call
const CHUNK_SIZE: usize = 0x10000;

/// Inputs above this size get a progress bar
const PROGRESS_THRESHOLD: u64 = 1024 * 1024;

#[derive(Parser)]
#[command(name = "metazip-cli")]
#[command(about = "A CLI tool for metafile stream compression and decompression")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into a marked region
    Compress {
        /// Input file to compress
        input: PathBuf,

        /// Output compressed file
        output: PathBuf,

        /// Engine coding the region
        #[arg(short, long, value_enum, default_value_t = CliEngine::Lz)]
        engine: CliEngine,

        /// DEFLATE level (0-9)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
        level: u32,

        /// Hash chain entries examined per position (LZ only)
        #[arg(long)]
        max_candidates: Option<usize>,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Decompress a marked region
    Decompress {
        /// Input compressed file
        input: PathBuf,

        /// Output decompressed file
        output: PathBuf,

        /// Force overwrite of output file
        #[arg(short, long)]
        force: bool,
    },

    /// Get information about a compressed file
    Info {
        /// Compressed file to analyze
        input: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum CliEngine {
    /// Hash-chained LZ77 with a primed window
    Lz,
    /// zlib-framed DEFLATE
    Deflate,
}

impl From<CliEngine> for EngineKind {
    fn from(engine: CliEngine) -> Self {
        match engine {
            CliEngine::Lz => EngineKind::Lz,
            CliEngine::Deflate => EngineKind::Deflate,
        }
    }
}

/// Options of the compress subcommand
struct CompressOptions {
    engine: EngineKind,
    level: u32,
    max_candidates: Option<usize>,
    force: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            engine,
            level,
            max_candidates,
            force,
        } => compress_file(
            &input,
            &output,
            &CompressOptions {
                engine: engine.into(),
                level,
                max_candidates,
                force,
            },
            cli.verbose,
            cli.quiet,
        ),
        Commands::Decompress {
            input,
            output,
            force,
        } => decompress_file(&input, &output, force, cli.verbose, cli.quiet),
        Commands::Info { input } => show_file_info(&input, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn check_paths(input: &Path, output: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }
    if output.exists() && !force {
        return Err(format!(
            "Output file '{}' already exists. Use --force to overwrite",
            output.display()
        )
        .into());
    }
    Ok(())
}

fn progress_bar(total: u64, quiet: bool, message: &'static str) -> Result<Option<ProgressBar>, Box<dyn std::error::Error>> {
    if quiet || total <= PROGRESS_THRESHOLD {
        return Ok(None);
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(Some(pb))
}

fn build_writer(
    sink: BufWriter<File>,
    options: &CompressOptions,
) -> Result<StreamWriter<BufWriter<File>>, Box<dyn std::error::Error>> {
    Ok(match options.engine {
        EngineKind::Lz => {
            let params = LzParams {
                max_candidates: options
                    .max_candidates
                    .unwrap_or(LzParams::default().max_candidates),
                ..LzParams::default()
            };
            StreamWriter::with_lz_params(sink, params)?
        }
        EngineKind::Deflate => {
            StreamWriter::with_deflate_level(sink, flate2::Compression::new(options.level))
        }
    })
}

fn compress_file(
    input: &Path,
    output: &Path,
    options: &CompressOptions,
    verbose: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_paths(input, output, options.force)?;

    if verbose {
        println!(
            "Compressing '{}' to '{}'",
            input.display(),
            output.display()
        );
        println!("Engine: {}", options.engine);
    }

    let start_time = Instant::now();
    let input_size = fs::metadata(input)?.len();
    let mut source = BufReader::new(File::open(input)?);
    let mut writer = build_writer(BufWriter::new(File::create(output)?), options)?;
    let progress = progress_bar(input_size, quiet, "Compressing...")?;

    writer.start()?;
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let count = source.read(&mut chunk)?;
        if count == 0 {
            break;
        }
        writer
            .compress(&chunk[..count])
            .map_err(|e| format!("Compression failed: {}", e))?;
        if let Some(ref pb) = progress {
            pb.inc(count as u64);
        }
    }
    writer.stop()?;
    let stats = writer.stats();
    writer.finish()?.flush()?;

    if let Some(ref pb) = progress {
        pb.finish_with_message("Compression complete");
    }

    let compression_time = start_time.elapsed();
    let output_size = fs::metadata(output)?.len();

    if !quiet {
        println!("✓ Compression successful!");
        println!("  Input:  {} bytes", input_size);
        println!("  Output: {} bytes", output_size);
        println!("  Ratio:  {:.1}%", stats.ratio() * 100.0);
        println!("  Time:   {:.2?}", compression_time);

        if options.engine == EngineKind::Lz {
            println!(
                "  Tokens: {} matches (longest {}), {} literal bytes",
                stats.match_count, stats.longest_match, stats.literal_count
            );
        }
        if output_size > input_size {
            println!("  Note: File expanded during compression (common for small/random data)");
        }
    }

    Ok(())
}

fn decompress_file(
    input: &Path,
    output: &Path,
    force: bool,
    verbose: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    check_paths(input, output, force)?;

    if verbose {
        println!(
            "Decompressing '{}' to '{}'",
            input.display(),
            output.display()
        );
    }

    let start_time = Instant::now();
    let input_size = fs::metadata(input)?.len();
    let mut reader = StreamReader::new(BufReader::new(File::open(input)?));
    let mut sink = BufWriter::new(File::create(output)?);

    reader
        .start()
        .map_err(|e| format!("Decompression failed: {}", e))?;
    if verbose {
        if let Some(kind) = reader.kind() {
            println!("Engine: {}", kind);
        }
    }

    let progress = progress_bar(input_size, quiet, "Decompressing...")?;
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut output_size = 0u64;
    loop {
        let count = reader
            .decompress(&mut chunk)
            .map_err(|e| format!("Decompression failed: {}", e))?;
        if count == 0 {
            break;
        }
        sink.write_all(&chunk[..count])?;
        output_size += count as u64;
        if let Some(ref pb) = progress {
            pb.set_position(reader.stats().bytes_out.min(input_size));
        }
    }
    sink.flush()?;

    if let Some(ref pb) = progress {
        pb.finish_with_message("Decompression complete");
    }

    let decompression_time = start_time.elapsed();

    if !quiet {
        println!("✓ Decompression successful!");
        println!("  Input:  {} bytes", input_size);
        println!("  Output: {} bytes", output_size);
        if output_size > 0 {
            println!(
                "  Ratio:  {:.1}%",
                (input_size as f64 / output_size as f64) * 100.0
            );
        }
        println!("  Time:   {:.2?}", decompression_time);
    }

    Ok(())
}

fn show_file_info(input: &Path, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }

    let data = fs::read(input)?;
    let file_size = data.len();

    let marker = match data.first() {
        Some(&marker) => marker,
        None => return Err("File too small to be a valid metazip region".into()),
    };
    let engine_str = match EngineKind::from_marker(marker) {
        Ok(kind) => kind.to_string(),
        Err(_) => "Unknown".to_string(),
    };

    println!("metazip Region Information:");
    println!("  File: {}", input.display());
    println!("  Size: {} bytes", file_size);
    println!("  Engine: {} (marker 0x{:02x})", engine_str, marker);

    if verbose {
        let head: Vec<String> = data.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        println!("  Leading bytes: {}", head.join(" "));
    }

    match decompress_bytes(&data) {
        Ok(decompressed) => {
            let decompressed_size = decompressed.len();
            println!("  Decompressed Size: {} bytes", decompressed_size);
            if decompressed_size > 0 {
                let compression_ratio = (file_size as f64 / decompressed_size as f64) * 100.0;
                println!("  Compression Ratio: {:.1}%", compression_ratio);
            }
            println!("  Status: ✓ Valid metazip region");
        }
        Err(e) => {
            println!("  Status: ✗ Invalid or corrupted metazip region");
            if verbose {
                println!("  Error: {}", e);
            }
        }
    }

    Ok(())
}
