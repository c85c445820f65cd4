// ============================================================================
// RasterPad CLI - headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   RasterPad -i photo.png --ops rotate90,invert -o result.png
//   RasterPad -i photo.jpg -o out                       (.png appended)
//   RasterPad -i "*.jpg" --ops flip-h --output-dir processed/ --format png
//   RasterPad -i a.png b.png --ops resize=640x480,undo,redo --output-dir out/
//
// Every input is opened in its own canvas session and the commands run
// through the same undo-aware path an interactive front end uses.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::{info, warn};

use crate::commands::{EditorCommand, parse_command_list};
use crate::io::{self, SaveFormat};
use crate::session::CanvasSession;
use crate::settings::EditorSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// RasterPad headless image editor.
#[derive(Parser, Debug)]
#[command(
    name = "RasterPad",
    about = "RasterPad headless batch image editor",
    long_about = "Apply canvas commands to image files without opening an editor window.\n\
                  Supported formats: PNG, JPEG, BMP, TGA.\n\n\
                  Commands: rotate90, rotate180, rotate270, flip-h, flip-v, invert,\n\
                  clear, undo, redo, resize=WxH\n\n\
                  Example:\n  \
                  RasterPad -i photo.png --ops rotate90,invert -o result.png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Comma-separated commands applied in order to every input.
    #[arg(long, value_name = "CMD,...", default_value = "")]
    pub ops: String,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, bmp, tga.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Undo depth for each session (defaults to the saved setting).
    #[arg(long, value_name = "N")]
    pub history: Option<usize>,

    /// Print per-file timing and history information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &EditorSettings) -> ExitCode {
    match run_batch(&args, settings) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when at least one input failed.
fn run_batch(args: &CliArgs, settings: &EditorSettings) -> anyhow::Result<bool> {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        bail!("no input files matched the given pattern(s)");
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        bail!(
            "{} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
    }

    let commands = parse_command_list(&args.ops).context("invalid --ops")?;
    let save_format = parse_format(args.format.as_deref(), args.output.as_deref())?;

    let mut settings = settings.clone();
    if let Some(depth) = args.history {
        settings.history_capacity = depth;
    }

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("could not create output directory '{}'", dir.display()))?;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut all_ok = true;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            all_ok = false;
            continue;
        };

        match run_one(input_path, &output_path, &commands, save_format, &settings) {
            Ok((written, history_len)) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms, {} history states)",
                        written.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0,
                        history_len
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {:#}", e);
                warn!(input = %input_path.display(), error = %format!("{e:#}"), "batch item failed");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    commands: &[EditorCommand],
    format: SaveFormat,
    settings: &EditorSettings,
) -> anyhow::Result<(PathBuf, usize)> {
    // -- Step 1: Load ----------------------------------------------------
    let image = io::load_image(input).with_context(|| format!("load failed: {}", input.display()))?;
    let mut session = CanvasSession::from_image(image, settings.history_capacity).configured(settings);

    // -- Step 2: Apply commands ------------------------------------------
    for cmd in commands {
        let changed = session
            .execute(cmd.clone())
            .with_context(|| format!("command {:?} failed", cmd))?;
        if !changed {
            info!(input = %input.display(), ?cmd, "command left the canvas unchanged");
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    let written = io::save_image(session.image(), output, Some(format))
        .with_context(|| format!("save failed: {}", output.display()))?;
    Ok((written, session.history().len()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Turn the positional inputs into files to edit. An argument naming an
/// existing file is taken as is; anything else is treated as a glob. Each
/// file appears once, in first-seen order.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    fn add(files: &mut Vec<PathBuf>, path: PathBuf) {
        if !files.contains(&path) {
            files.push(path);
        }
    }

    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let literal = PathBuf::from(pattern);
        if literal.exists() {
            add(&mut files, literal);
            continue;
        }

        let entries = match glob::glob(pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "skipping malformed input pattern");
                continue;
            }
        };
        let before = files.len();
        for path in entries.flatten() {
            add(&mut files, path);
        }
        if files.len() == before {
            warn!(pattern = %pattern, "input pattern added no new images");
        }
    }

    files
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is given.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> anyhow::Result<SaveFormat> {
    if let Some(f) = format_arg {
        return SaveFormat::from_name(f).with_context(|| format!("unknown format '{}'", f));
    }
    Ok(output.and_then(SaveFormat::from_path).unwrap_or_default())
}

/// Compute the output path for a single input file.
///
/// `--output` wins outright. Otherwise the edited image keeps the input's
/// stem with the format's extension, placed in `--output-dir` when given and
/// next to the input when not. An edit is never written over its own
/// source: a clash gets an `_out` suffix on the stem.
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let file_name = |stem: &str| format!("{stem}.{}", format.extension());

    let dir = match output_dir {
        Some(dir) => return Some(dir.join(file_name(&stem))),
        None => input.parent().unwrap_or(Path::new(".")),
    };
    let target = dir.join(file_name(&stem));
    if target == input {
        return Some(dir.join(file_name(&format!("{stem}_out"))));
    }
    Some(target)
}
