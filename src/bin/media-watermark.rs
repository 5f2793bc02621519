//! Media Watermark CLI tool
//!
//! A command-line tool for stamping text watermarks onto videos and PDFs.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use media_watermark::logging::init_cli_logger;
use media_watermark::pdf::extract_metadata;
use media_watermark::settings::DEFAULT_CONFIG_FILE;
use media_watermark::{
    MediaKind, PdfWatermark, Position, SettingsStore, VideoWatermark, WatermarkApplier,
};

/// Media Watermark - stamp a channel tag onto videos and PDFs
#[derive(Parser)]
#[command(name = "media-watermark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Watermark a video using the stored settings
    media-watermark video clip.mp4 -o clip-wm.mp4

    # Watermark a PDF with custom text
    media-watermark pdf handout.pdf -o handout-wm.pdf --text \"@MyChannel\"

    # Watermark everything in a folder, choosing video or PDF by extension
    media-watermark apply \"incoming/*\" --out-dir outgoing

    # Change a stored setting
    media-watermark settings set position top-left")]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Tool configuration shared by the watermarking commands
#[derive(Args)]
struct ToolArgs {
    /// ffmpeg binary (defaults to $WATERMARK_FFMPEG_PATH, then ffmpeg on PATH)
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// TrueType font for video overlays (defaults to $WATERMARK_FONT_PATH)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Seconds to wait for ffmpeg; 0 waits indefinitely
    #[arg(long, default_value_t = 600)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Watermark a video file
    Video {
        /// Input video
        input: PathBuf,

        /// Output video path
        #[arg(short, long)]
        output: PathBuf,

        /// Watermark text (overrides settings)
        #[arg(long)]
        text: Option<String>,

        /// Anchor: top-left, top-right, bottom-left, bottom-right, center
        #[arg(long)]
        position: Option<String>,

        /// Opacity from 0.0 to 1.0
        #[arg(long)]
        opacity: Option<f32>,

        /// Font size in pixels
        #[arg(long)]
        font_size: Option<u32>,

        /// Color name or #RRGGBB
        #[arg(long)]
        color: Option<String>,

        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Watermark a PDF file
    Pdf {
        /// Input PDF
        input: PathBuf,

        /// Output PDF path
        #[arg(short, long)]
        output: PathBuf,

        /// Watermark text (overrides settings)
        #[arg(long)]
        text: Option<String>,

        /// Opacity from 0.0 to 1.0
        #[arg(long)]
        opacity: Option<f32>,

        /// Rotation in degrees
        #[arg(long, allow_negative_numbers = true)]
        angle: Option<f32>,

        /// Font size in points
        #[arg(long)]
        font_size: Option<u32>,
    },

    /// Watermark files using the stored settings, choosing video or PDF by extension
    Apply {
        /// Input files. Supports glob patterns like "*.mp4"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Directory for watermarked copies
        #[arg(long)]
        out_dir: PathBuf,

        /// Appended to each output file stem
        #[arg(long, default_value = "_wm")]
        suffix: String,

        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,

    /// Flip the enabled flag, or set it with --on / --off
    Toggle {
        #[arg(long, conflicts_with = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
    },

    /// Change the watermark text
    SetText { text: String },

    /// Change one watermark setting by key
    Set { key: String, value: String },
}

fn main() {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    let result = match cli.command {
        Commands::Video {
            input,
            output,
            text,
            position,
            opacity,
            font_size,
            color,
            tools,
        } => cmd_video(
            &cli.config,
            input,
            output,
            text,
            position,
            opacity,
            font_size,
            color,
            tools,
        ),
        Commands::Pdf {
            input,
            output,
            text,
            opacity,
            angle,
            font_size,
        } => cmd_pdf(&cli.config, input, output, text, opacity, angle, font_size),
        Commands::Apply {
            inputs,
            out_dir,
            suffix,
            tools,
        } => cmd_apply(&cli.config, inputs, out_dir, suffix, tools),
        Commands::Settings { action } => cmd_settings(&cli.config, action),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn build_applier(tools: ToolArgs) -> WatermarkApplier {
    let mut applier = WatermarkApplier::new().with_timeout(match tools.timeout {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    });
    if let Some(ffmpeg) = tools.ffmpeg {
        applier = applier.with_ffmpeg(ffmpeg);
    }
    if let Some(font) = tools.font {
        applier = applier.with_font(font);
    }
    applier
}

fn open_store(config: &Path) -> Result<SettingsStore> {
    SettingsStore::open(config).with_context(|| format!("loading settings from {}", config.display()))
}

/// Expand glob patterns in input paths
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern)? {
                match entry {
                    Ok(path) if path.is_file() => {
                        paths.push(path);
                        matched = true;
                    }
                    Ok(_) => {}
                    Err(e) => eprintln!("Warning: glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    paths.sort();
    Ok(paths)
}

#[allow(clippy::too_many_arguments)]
fn cmd_video(
    config: &Path,
    input: PathBuf,
    output: PathBuf,
    text: Option<String>,
    position: Option<String>,
    opacity: Option<f32>,
    font_size: Option<u32>,
    color: Option<String>,
    tools: ToolArgs,
) -> Result<()> {
    let settings = open_store(config)?.watermark_status();
    let mut watermark = VideoWatermark::from(&settings);
    if let Some(text) = text {
        watermark.text = text;
    }
    if let Some(position) = position {
        watermark.position = Position::from_name(&position);
    }
    if let Some(opacity) = opacity {
        watermark.opacity = opacity;
    }
    if let Some(font_size) = font_size {
        watermark.font_size = font_size;
    }
    if let Some(color) = color {
        watermark.color = color;
    }

    eprintln!("Watermarking video {}...", input.display());
    build_applier(tools).try_apply_video_watermark(&input, &output, &watermark)?;
    eprintln!("Output: {}", output.display());
    Ok(())
}

fn cmd_pdf(
    config: &Path,
    input: PathBuf,
    output: PathBuf,
    text: Option<String>,
    opacity: Option<f32>,
    angle: Option<f32>,
    font_size: Option<u32>,
) -> Result<()> {
    let settings = open_store(config)?.watermark_status();
    let mut watermark = PdfWatermark::from(&settings);
    if let Some(text) = text {
        watermark.text = text;
    }
    if let Some(opacity) = opacity {
        watermark.opacity = opacity;
    }
    if let Some(angle) = angle {
        watermark.angle = angle;
    }
    if let Some(font_size) = font_size {
        watermark.font_size = font_size;
    }

    eprintln!("Watermarking PDF {}...", input.display());
    let pages = WatermarkApplier::new().try_apply_pdf_watermark(&input, &output, &watermark)?;
    eprintln!("Stamped {} pages: {}", pages, output.display());
    Ok(())
}

fn cmd_apply(
    config: &Path,
    inputs: Vec<String>,
    out_dir: PathBuf,
    suffix: String,
    tools: ToolArgs,
) -> Result<()> {
    let store = open_store(config)?;
    if !store.watermark_status().enabled {
        eprintln!("Watermark is disabled; nothing to do.");
        return Ok(());
    }

    let inputs = expand_globs(inputs)?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let applier = build_applier(tools);

    let mut failed = 0;
    for input in &inputs {
        if MediaKind::from_path(input).is_none() {
            eprintln!("Skipping {}: not a video or PDF", input.display());
            continue;
        }
        let output = output_path(input, &out_dir, &suffix);
        match applier.apply_from_settings(&store, input, &output) {
            Ok(_) => eprintln!("{} -> {}", input.display(), output.display()),
            Err(e) => {
                eprintln!("Failed {}: {}", input.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed", failed, inputs.len());
    }
    Ok(())
}

/// `<out_dir>/<stem><suffix>.<ext>`
fn output_path(input: &Path, out_dir: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let mut name = format!("{}{}", stem, suffix);
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    out_dir.join(name)
}

fn cmd_settings(config: &Path, action: SettingsAction) -> Result<()> {
    let mut store = open_store(config)?;

    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(store.config())?);
        }
        SettingsAction::Toggle { on, off } => {
            let explicit = match (on, off) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let enabled = store.toggle_watermark(explicit)?;
            println!("Watermark {}", if enabled { "enabled" } else { "disabled" });
        }
        SettingsAction::SetText { text } => {
            store.set_watermark_text(text)?;
            println!("Watermark text: {}", store.watermark_status().text);
        }
        SettingsAction::Set { key, value } => {
            if store.update_setting_by_key(&key, &value)? {
                println!("{} = {}", key, value);
            } else {
                eprintln!("Unknown setting '{}', nothing changed", key);
            }
        }
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let metadata = extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);
    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(producer) = metadata.producer {
        println!("Producer: {}", producer);
    }

    Ok(())
}
