use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wavecast::viz::config::{parse_color, parse_color_list, parse_positions, parse_thickness};

#[derive(Parser, Debug)]
#[command(name = "wavecast", version)]
struct Cli {
    /// Path to the ffmpeg binary.
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Path to the ffprobe binary.
    #[arg(long, global = true, default_value = "ffprobe")]
    ffprobe: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an audio-reactive waveform video (requires `ffmpeg` on PATH).
    Waveform(WaveformArgs),
    /// Compose avatar, background and waveform into a final MP4.
    Compose(ComposeArgs),
    /// Render a single waveform frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct OutputArgs {
    /// Output file stem; the result is `<outputs-dir>/<name>.mp4`.
    #[arg(long)]
    name: String,

    /// Directory for outputs and the intermediate cache.
    #[arg(long, default_value = "outputs")]
    outputs_dir: PathBuf,

    /// Quality preset: fastest, fast, medium or high.
    #[arg(long, default_value = "fastest")]
    preset: String,

    /// Render frames on a worker pool.
    #[arg(long)]
    parallel: bool,

    /// Worker thread count for `--parallel`.
    #[arg(long)]
    threads: Option<usize>,
}

/// Visualization overrides. Every flag is a free-form string applied over `--config`.
#[derive(Parser, Debug, Default)]
struct VizArgs {
    /// Visualization config JSON; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    style: Option<String>,
    /// `r,g,b`
    #[arg(long)]
    primary_color: Option<String>,
    /// `r,g,b`
    #[arg(long)]
    secondary_color: Option<String>,
    #[arg(long)]
    sensitivity: Option<String>,
    #[arg(long)]
    amplitude_multiplier: Option<String>,
    #[arg(long)]
    render_scale: Option<String>,
    #[arg(long)]
    anti_alias: Option<String>,
    #[arg(long)]
    num_lines: Option<String>,
    /// `8` or `6,4,...`
    #[arg(long)]
    line_thickness: Option<String>,
    /// `r,g,b:r,g,b:...`
    #[arg(long)]
    line_colors: Option<String>,
    /// Comma-separated subset of top,bottom,middle,left,right.
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    orientation: Option<String>,
    #[arg(long)]
    height_percent: Option<String>,
    #[arg(long)]
    width_percent: Option<String>,
    #[arg(long)]
    left_spacing: Option<String>,
    #[arg(long)]
    right_spacing: Option<String>,
    #[arg(long)]
    orientation_offset: Option<String>,
    #[arg(long)]
    rotation: Option<String>,
    #[arg(long)]
    num_instances: Option<String>,
    #[arg(long)]
    instances_offset: Option<String>,
    #[arg(long)]
    instances_intersect: Option<String>,
    #[arg(long)]
    opacity: Option<String>,
    #[arg(long)]
    waveform_style: Option<String>,
    #[arg(long)]
    randomize: bool,
    #[arg(long)]
    seed: Option<String>,
    #[arg(long)]
    chroma_similarity: Option<String>,
}

#[derive(Parser, Debug)]
struct WaveformArgs {
    /// Input audio file.
    #[arg(long)]
    audio: PathBuf,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    viz: VizArgs,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Input audio file.
    #[arg(long)]
    audio: PathBuf,

    /// Talking-head avatar video.
    #[arg(long)]
    avatar: Option<PathBuf>,

    /// Background image.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Render a waveform layer.
    #[arg(long)]
    visualize: bool,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    viz: VizArgs,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input audio file.
    #[arg(long)]
    audio: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    #[command(flatten)]
    viz: VizArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let tools = wavecast::MediaTools::new(&cli.ffmpeg, &cli.ffprobe);
    match cli.cmd {
        Command::Waveform(args) => cmd_waveform(tools, args),
        Command::Compose(args) => cmd_compose(tools, args),
        Command::Frame(args) => cmd_frame(tools, args),
    }
}

fn parse_num<T>(flag: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("--{flag} '{raw}': {e}"))
}

fn parse_bool(flag: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("--{flag} '{raw}': expected true or false"),
    }
}

fn build_config(args: &VizArgs) -> anyhow::Result<wavecast::VisualizationConfig> {
    let mut cfg = match &args.config {
        Some(path) => wavecast::VisualizationConfig::from_path(path)?,
        None => wavecast::VisualizationConfig::default(),
    };

    if let Some(v) = &args.style {
        cfg.style = v.parse()?;
    }
    if let Some(v) = &args.primary_color {
        cfg.primary_color = parse_color(v)?;
    }
    if let Some(v) = &args.secondary_color {
        cfg.secondary_color = parse_color(v)?;
    }
    if let Some(v) = &args.sensitivity {
        cfg.sensitivity = parse_num("sensitivity", v)?;
    }
    if let Some(v) = &args.amplitude_multiplier {
        cfg.amplitude_multiplier = parse_num("amplitude-multiplier", v)?;
    }
    if let Some(v) = &args.render_scale {
        cfg.render_scale = parse_num("render-scale", v)?;
    }
    if let Some(v) = &args.anti_alias {
        cfg.anti_alias = parse_bool("anti-alias", v)?;
    }
    if let Some(v) = &args.num_lines {
        cfg.num_lines = parse_num("num-lines", v)?;
    }
    if let Some(v) = &args.line_thickness {
        cfg.line_thickness = parse_thickness(v)?;
    }
    if let Some(v) = &args.line_colors {
        cfg.line_colors = Some(parse_color_list(v)?);
    }
    if let Some(v) = &args.position {
        let positions = parse_positions(v)?;
        cfg.position = positions
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(",");
    }
    if let Some(v) = &args.orientation {
        cfg.orientation = v.parse()?;
    }
    if let Some(v) = &args.height_percent {
        cfg.height_percent = parse_num("height-percent", v)?;
    }
    if let Some(v) = &args.width_percent {
        cfg.width_percent = parse_num("width-percent", v)?;
    }
    if let Some(v) = &args.left_spacing {
        cfg.left_spacing = parse_num("left-spacing", v)?;
    }
    if let Some(v) = &args.right_spacing {
        cfg.right_spacing = parse_num("right-spacing", v)?;
    }
    if let Some(v) = &args.orientation_offset {
        cfg.orientation_offset = Some(parse_num("orientation-offset", v)?);
    }
    if let Some(v) = &args.rotation {
        cfg.rotation = parse_num("rotation", v)?;
    }
    if let Some(v) = &args.num_instances {
        cfg.num_instances = parse_num("num-instances", v)?;
    }
    if let Some(v) = &args.instances_offset {
        cfg.instances_offset = parse_num("instances-offset", v)?;
    }
    if let Some(v) = &args.instances_intersect {
        cfg.instances_intersect = parse_bool("instances-intersect", v)?;
    }
    if let Some(v) = &args.opacity {
        cfg.opacity = parse_num("opacity", v)?;
    }
    if let Some(v) = &args.waveform_style {
        cfg.waveform_style = v.parse()?;
    }
    if args.randomize {
        cfg.randomize = true;
    }
    if let Some(v) = &args.seed {
        cfg.seed = parse_num("seed", v)?;
    }
    if let Some(v) = &args.chroma_similarity {
        cfg.chroma_similarity = parse_num("chroma-similarity", v)?;
    }
    Ok(cfg)
}

fn make_compositor(tools: wavecast::MediaTools) -> wavecast::Compositor {
    let gpu = wavecast::GpuCapability::cached().clone();
    wavecast::Compositor::new(wavecast::EncoderPipeDriver::new(tools, gpu))
}

fn request_for(
    audio: PathBuf,
    output: &OutputArgs,
) -> anyhow::Result<wavecast::ComposeRequest> {
    let preset: wavecast::QualityPreset = output.preset.parse()?;
    let threading = wavecast::RenderThreading {
        parallel: output.parallel,
        threads: output.threads,
        ..Default::default()
    };
    Ok(
        wavecast::ComposeRequest::new(audio, &output.outputs_dir, output.name.clone())
            .with_preset(preset)
            .with_threading(threading),
    )
}

fn cmd_waveform(tools: wavecast::MediaTools, args: WaveformArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args.viz)?;
    let req = request_for(args.audio, &args.output)?.with_visualization(cfg);
    let outcome = make_compositor(tools).compose(&req)?;
    eprintln!(
        "wrote {} ({} frames, {} bytes)",
        outcome.output.display(),
        outcome.stats.frames_written,
        outcome.stats.output_bytes
    );
    Ok(())
}

fn cmd_compose(tools: wavecast::MediaTools, args: ComposeArgs) -> anyhow::Result<()> {
    let mut req = request_for(args.audio, &args.output)?;
    if let Some(avatar) = args.avatar {
        req = req.with_avatar(avatar);
    }
    if let Some(bg) = args.background {
        req = req.with_background(bg);
    }
    if args.visualize || args.viz.config.is_some() {
        req = req.with_visualization(build_config(&args.viz)?);
    }
    let outcome = make_compositor(tools).compose(&req)?;
    eprintln!("wrote {} ({})", outcome.output.display(), outcome.mode);
    Ok(())
}

fn cmd_frame(tools: wavecast::MediaTools, args: FrameArgs) -> anyhow::Result<()> {
    let mut cfg = build_config(&args.viz)?;
    if let Some(w) = args.width {
        cfg.resolution.width = w;
    }
    if let Some(h) = args.height {
        cfg.resolution.height = h;
    }
    if let Some(fps) = args.fps {
        cfg.fps = fps;
    }
    let cfg = cfg.resolve()?;
    let fps = cfg.fps()?;

    let duration = wavecast::audio::probe::probe_duration_or_fallback(&tools, &args.audio);
    let mut windows = wavecast::audio::frames::iterate(
        &tools,
        &args.audio,
        wavecast::audio::frames::DEFAULT_SAMPLE_RATE,
        fps,
        duration,
    )?;
    let total = windows.total_frames();
    let window = windows.nth(usize::try_from(args.frame)?).with_context(|| {
        format!("frame {} is past the end of the audio ({total} frames)", args.frame)
    })?;

    let mut renderer = wavecast::Renderer::new(cfg)?;
    let frame = renderer.render_frame(&window)?;
    frame.save_png(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
