use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;

use media_lens::config::Config;
use media_lens::display::find_category;
use media_lens::export::{
    self, DirectoryTarget, SaveTarget, batch_export_name, export_batch, export_record,
    single_export_name,
};
use media_lens::media::MediaFile;
use media_lens::pipeline::{self, BatchPipeline, FileRecord, MapMarker};

#[derive(Parser, Debug)]
#[command(
    name = "media-lens",
    version,
    about = "Inspect image and video metadata: categorized EXIF, GPS location, JSON export, and metadata stripping"
)]
struct Cli {
    /// Image/video files or directories to inspect
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Print the batch export as JSON instead of the category view
    #[arg(long)]
    json: bool,

    /// Show every field of one category (e.g. "EXIF Data")
    #[arg(long, value_name = "NAME")]
    category: Option<String>,

    /// Write one JSON export for the whole batch
    #[arg(long)]
    export: bool,

    /// Write one JSON export per file
    #[arg(long = "export-each")]
    export_each: bool,

    /// Write metadata-stripped copies (clean_<name>)
    #[arg(long)]
    strip: bool,

    /// Output directory for exports and stripped copies
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Load config, then apply CLI overrides
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.recursive {
        config.scan.recursive = true;
    }
    if let Some(ref dir) = cli.output {
        config.export.output_dir = Some(dir.display().to_string());
    }

    let paths = pipeline::collect_media(&cli.paths, &config.scan);
    if paths.is_empty() {
        anyhow::bail!("No files found in the specified paths.");
    }

    // A path that vanished since collection still gets a (failed) record
    let files: Vec<MediaFile> = paths
        .iter()
        .map(|path| {
            MediaFile::from_path(path).unwrap_or_else(|e| {
                log::warn!("{e:#}");
                MediaFile::unreadable(path)
            })
        })
        .collect();
    log::info!("Found {} file(s) to inspect", files.len());

    // Print each record as soon as it is ready
    let mut pipeline = BatchPipeline::from_config(&config);
    let show = !cli.json;
    let category = cli.category.as_deref();
    let state = pipeline
        .submit(files, |state| {
            if !show {
                return;
            }
            if let Some(record) = state.records().last() {
                print_record(record, category);
            }
        })
        .await;

    if cli.json {
        println!("{}", export::to_json(&export_batch(state), config.export.pretty)?);
    }

    let target = DirectoryTarget::new(config.output_dir());
    let today = Local::now().date_naive();

    if cli.export {
        let json = export::to_json(&export_batch(state), config.export.pretty)?;
        let path = target.save(&batch_export_name(today), json.as_bytes())?;
        log::info!("Batch export written: {}", path.display());
    }

    if cli.export_each {
        for record in state.iter() {
            let json = export::to_json(&export_record(record), config.export.pretty)?;
            let name = single_export_name(&record.file.name, today);
            match target.save(&name, json.as_bytes()) {
                Ok(path) => log::info!("Export written: {}", path.display()),
                Err(e) => log::error!("Failed to export {}: {e:#}", record.file.name),
            }
        }
    }

    if cli.strip {
        for record in state.iter().filter(|r| r.is_ok()) {
            let clean = match export::sanitize(&record.file).await {
                Ok(clean) => clean,
                Err(e) => {
                    log::error!("Failed to strip {}: {e:#}", record.file.name);
                    continue;
                }
            };
            match target.save(&clean.file_name, &clean.bytes) {
                Ok(path) if clean.stripped => log::info!("Stripped copy: {}", path.display()),
                Ok(path) => log::warn!("Copied unchanged (video metadata kept): {}", path.display()),
                Err(e) => log::error!("Failed to save {}: {e:#}", clean.file_name),
            }
        }
    }

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Width of the label column.
const TAG_WIDTH: usize = 28;
/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;

/// Print one record: its category overview, or every field of one category.
fn print_record(record: &FileRecord, category: Option<&str>) {
    println!();
    println!("{BOLD}File:{RESET} {}", record.file.name);
    println!("{DIM}{}{RESET}", "═".repeat(78));

    if let Some(ref err) = record.error {
        println!("  {RED}{err}{RESET}");
        println!();
        return;
    }

    match category {
        Some(name) => {
            let found = record.metadata.as_ref().and_then(|m| find_category(m, name));
            match found {
                Some(cat) => {
                    println!("  {BOLD}{}{RESET} {DIM}({}){RESET}", cat.name, cat.count);
                    println!("  {DIM}{}{RESET}", "─".repeat(76));
                    for (label, value) in cat.rows() {
                        print_row(&label, &value);
                    }
                }
                None => println!("  {DIM}(no \"{name}\" fields){RESET}"),
            }
        }
        None => {
            for cat in record.categories() {
                print_row(&format!("{} ({})", cat.name, cat.count), &cat.preview);
            }
        }
    }

    if let Some(marker) = record.map_marker() {
        println!("  {DIM}{}{RESET}", "─".repeat(76));
        let position = format!("{:.6}, {:.6}", marker.latitude, marker.longitude);
        println!("  {GREEN}{:<TAG_WIDTH$} : {position}{RESET}", "Location");
        print_row("Map", &map_link(&marker));
    }
    println!();
}

/// OpenStreetMap link centered on the marker at zoom 13.
fn map_link(marker: &MapMarker) -> String {
    format!(
        "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map=13/{lat}/{lon}",
        lat = marker.latitude,
        lon = marker.longitude
    )
}

/// Print a single row in the metadata table. Multi-line values keep their lines.
fn print_row(tag: &str, val: &str) {
    let indent = " ".repeat(TAG_WIDTH + 3);
    let mut first = true;
    for source_line in val.lines() {
        for line in wrap_text(source_line, VAL_WIDTH) {
            if first {
                println!("  {tag:<TAG_WIDTH$} : {line}");
                first = false;
            } else {
                println!("  {indent}{line}");
            }
        }
    }
    if first {
        println!("  {tag:<TAG_WIDTH$} :");
    }
}

/// Wrap text at word boundaries to fit within max_width characters.
/// Leading indentation is repeated on every wrapped line.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let lead = &s[..s.len() - s.trim_start().len()];
    let lead_width = lead.chars().count();
    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0;

    for word in s.split_whitespace() {
        let word_width = word.chars().count();
        if current_line.is_empty() {
            current_line = format!("{lead}{word}");
            current_width = lead_width + word_width;
        } else if current_width + 1 + word_width <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = format!("{lead}{word}");
            current_width = lead_width + word_width;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
