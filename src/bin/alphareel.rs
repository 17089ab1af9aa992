use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use alphareel::{
    Codec, EncodeEngine, ExportConfig, ExportOpts, ExportOutcome, ExportPhase, Exporter,
    FfmpegEngine, FfmpegEngineOpts, Fps, FrameSource as _, MemoryEngine, Sampler, SvgFrameSource,
    plan_chunks,
};

#[derive(Parser, Debug)]
#[command(name = "alphareel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export an SVG animation to an alpha-preserving QuickTime movie.
    Export(ExportArgs),
    /// Print the chunk plan and sample times of an export as JSON.
    Plan(PlanArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    /// QuickTime Animation, lossless 8-bit ARGB.
    Argb,
    /// ProRes 4444 with alpha.
    Prores4444,
}

impl From<CodecChoice> for Codec {
    fn from(c: CodecChoice) -> Self {
        match c {
            CodecChoice::Argb => Codec::LosslessArgb,
            CodecChoice::Prores4444 => Codec::ProRes4444,
        }
    }
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Export config JSON. Flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Output frame rate (24, 25, 30, 50 or 60).
    #[arg(long)]
    fps: Option<u32>,

    /// Export length in seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Frames rendered and encoded per chunk.
    #[arg(long)]
    chunk_frames: Option<u32>,

    /// Output codec.
    #[arg(long, value_enum)]
    codec: Option<CodecChoice>,

    /// Scale applied to the source before centering it on the canvas.
    #[arg(long)]
    content_scale: Option<f64>,

    /// Source seconds per export second.
    #[arg(long)]
    playback_rate: Option<f64>,
}

impl ConfigArgs {
    /// Config file (or defaults) with flag overrides applied, validated.
    fn resolve(&self, native_size: Option<(u32, u32)>) -> anyhow::Result<ExportConfig> {
        let mut cfg = match &self.config {
            Some(path) => ExportConfig::from_path(path)?,
            None => {
                let (w, h) = match (self.width, self.height, native_size) {
                    (Some(w), Some(h), _) => (w, h),
                    (w, h, Some((nw, nh))) => (w.unwrap_or(nw), h.unwrap_or(nh)),
                    _ => anyhow::bail!("--width and --height are required without --config"),
                };
                let Some(duration) = self.duration else {
                    anyhow::bail!("--duration is required without --config");
                };
                ExportConfig::new(w, h, Fps::Fps30, duration)
            }
        };

        if let Some(w) = self.width {
            cfg.width = w;
        }
        if let Some(h) = self.height {
            cfg.height = h;
        }
        if let Some(fps) = self.fps {
            cfg.fps = Fps::new(fps)?;
        }
        if let Some(d) = self.duration {
            cfg.duration = d;
        }
        if let Some(n) = self.chunk_frames {
            cfg.chunk_frame_count = n;
        }
        if let Some(c) = self.codec {
            cfg.codec = c.into();
        }
        if let Some(s) = self.content_scale {
            cfg.content_scale = s;
        }
        if let Some(r) = self.playback_rate {
            cfg.playback_rate = r;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input SVG.
    #[arg(long)]
    svg: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Seconds per spin loop of the SVG (0 renders it static).
    #[arg(long, default_value_t = 0.0)]
    loop_secs: f64,

    /// Full turns per spin loop.
    #[arg(long, default_value_t = 1.0)]
    turns: f64,

    /// Per-frame render deadline in milliseconds.
    #[arg(long, default_value_t = alphareel::config::DEFAULT_RENDER_TIMEOUT_MS)]
    render_timeout_ms: u64,

    /// ffmpeg binary.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Run the pipeline against the in-memory engine and write nothing.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Directory the movie is written to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Loop length of the source in seconds (0: no looping).
    #[arg(long, default_value_t = 0.0)]
    source_duration: f64,

    /// Include every sample time in the output.
    #[arg(long, default_value_t = false)]
    samples: bool,
}

fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Plan(args) => cmd_plan(args),
    }
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let source = SvgFrameSource::from_path(&args.svg)?.with_spin(args.loop_secs, args.turns);
    let cfg = args
        .config
        .resolve(Some((source.width(), source.height())))?;

    let engine: Box<dyn EncodeEngine> = if args.dry_run {
        Box::new(MemoryEngine::new())
    } else {
        Box::new(FfmpegEngine::with_opts(FfmpegEngineOpts {
            ffmpeg_bin: args.ffmpeg.clone(),
            ..FfmpegEngineOpts::default()
        }))
    };

    let mut last_shown: Option<(ExportPhase, u64)> = None;
    let outcome = Exporter::new(cfg)
        .with_opts(ExportOpts {
            render_timeout_ms: args.render_timeout_ms,
            ..ExportOpts::default()
        })
        .on_progress(move |p| {
            let shown = (p.phase, p.percent.floor() as u64);
            if last_shown == Some(shown) {
                return;
            }
            last_shown = Some(shown);
            let eta = p
                .eta_ms
                .map(|ms| format!(", eta {:.1}s", ms as f64 / 1000.0))
                .unwrap_or_default();
            eprintln!(
                "{:>5.1}% {:?} frame {}/{} chunk {}/{}{eta}",
                p.percent, p.phase, p.current_frame, p.total_frames, p.current_chunk, p.total_chunks
            );
        })
        .run(Box::new(source), engine);

    match outcome {
        ExportOutcome::Done(out) => {
            if args.dry_run {
                eprintln!("dry run: {} ({} bytes)", out.file_name, out.bytes.len());
                return Ok(());
            }
            std::fs::create_dir_all(&args.out_dir)
                .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;
            let path = args.out_dir.join(&out.file_name);
            std::fs::write(&path, &out.bytes)
                .with_context(|| format!("write movie '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        ExportOutcome::Cancelled => anyhow::bail!("export cancelled"),
        ExportOutcome::Failed { phase, error } => {
            Err(anyhow::Error::new(error).context(format!("export failed during {phase:?}")))
        }
    }
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let cfg = args.config.resolve(None)?;
    let chunks = plan_chunks(cfg.total_frames(), cfg.chunk_frame_count)?;
    let sampler = Sampler::new(&cfg, args.source_duration);

    let mut plan = serde_json::json!({
        "output_file_name": cfg.output_file_name(),
        "total_frames": cfg.total_frames(),
        "total_chunks": chunks.len(),
        "chunks": chunks,
    });
    if args.samples {
        let samples: Vec<_> = sampler.all_samples().collect();
        plan["samples"] = serde_json::to_value(samples)?;
    }
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
