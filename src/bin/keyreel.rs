use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use keyreel::{ExportConfig, ExportFormat, FormatKind, capture_plan, is_ffmpeg_on_path};

#[derive(Parser, Debug)]
#[command(name = "keyreel", version)]
struct Cli {
    /// Log verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, global = true, default_value = "warn")]
    log: tracing::Level,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in export formats.
    Formats,
    /// Validate an export configuration and print its frame summary.
    Check(CheckArgs),
    /// Print the frames a format would capture for a configuration.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Export configuration JSON.
    #[arg(long)]
    config: PathBuf,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Export configuration JSON.
    #[arg(long)]
    config: PathBuf,

    /// Export format (`webm`, `mp4`, `png`, `jpeg`, `gif`).
    #[arg(long)]
    format: String,

    /// Print the plan as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Formats => cmd_formats(),
        Command::Check(args) => cmd_check(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn cmd_formats() -> anyhow::Result<()> {
    let ffmpeg = is_ffmpeg_on_path();
    for f in ExportFormat::all() {
        let kind = match f.kind() {
            FormatKind::Stream => "stream",
            FormatKind::ImageSequence => "image-sequence",
        };
        let mut notes = Vec::new();
        if f.supports_sampling() {
            notes.push("sampleInterval");
        }
        if f.is_lossy() {
            notes.push("quality");
        }
        if matches!(f, ExportFormat::Webm | ExportFormat::Mp4) && !ffmpeg {
            notes.push("ffmpeg not found");
        }
        println!("{:<5} {:<16} {:<15} {}", f, f.mime_type(), kind, notes.join(", "));
    }
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let cfg = ExportConfig::from_path(&args.config)
        .with_context(|| format!("load config '{}'", args.config.display()))?;
    let tc = cfg.timecode;
    println!(
        "timecode: {}..{} ms @ {} fps ({} frames)",
        tc.start,
        tc.end,
        tc.framerate,
        tc.frame_count()
    );
    println!(
        "resolution: {}x{}",
        cfg.resolution.width, cfg.resolution.height
    );
    for name in cfg.format_configs.keys() {
        let format = ExportFormat::parse(name)?;
        let frames = capture_plan(&tc, format, &cfg.format_config(format))?.len();
        println!("{format}: {frames} captured frames");
    }
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let cfg = ExportConfig::from_path(&args.config)
        .with_context(|| format!("load config '{}'", args.config.display()))?;
    let format = ExportFormat::parse(&args.format)?;
    let plan = capture_plan(&cfg.timecode, format, &cfg.format_config(format))?;
    tracing::info!(%format, frames = plan.len(), "capture plan computed");

    if args.json {
        let rows: Vec<serde_json::Value> = plan
            .iter()
            .map(|(idx, t)| serde_json::json!({ "frame": idx.0, "timeMs": t }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for (idx, t) in &plan {
            println!("{:>7} {:>12.3}", idx.0, t);
        }
    }
    Ok(())
}
