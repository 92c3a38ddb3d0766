use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cinestage::{
    Layer, LayerRegistry, LifecycleDeps, ManifestPreloader, PresentationSpec, ProbeLayer,
    Renderer, RendererOpts, RendererState, SilentAudio,
};

#[derive(Parser, Debug)]
#[command(name = "cinestage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a presentation JSON file.
    Validate(ValidateArgs),
    /// Play a presentation headlessly, logging lifecycle events.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input presentation JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Input presentation JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Simulated frame rate of the host tick source.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Stop after this much timeline time, in milliseconds.
    #[arg(long)]
    limit_ms: Option<f64>,

    /// Fail scenes whose assets cannot be found next to the input file.
    #[arg(long, default_value_t = false)]
    strict_assets: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Play(args) => cmd_play(args).await,
    }
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let spec = PresentationSpec::from_path(&args.in_path)?;
    spec.validate()
        .with_context(|| format!("invalid presentation '{}'", args.in_path.display()))?;
    println!(
        "ok: {} scenes, {} ms",
        spec.scenes.len(),
        spec.total_duration()
    );
    Ok(())
}

async fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.fps > 0, "--fps must be > 0");
    let spec = PresentationSpec::from_path(&args.in_path)?;
    let assets_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));

    let mut layers = LayerRegistry::new();
    for kind in spec.layer_kinds() {
        let tag = kind.clone();
        layers.register(kind, move |id, _config| {
            let layer: Box<dyn Layer> = Box::new(ProbeLayer::new(&tag, id));
            Ok(layer)
        });
    }
    let deps = LifecycleDeps::new(layers)
        .with_assets(ManifestPreloader::files(assets_root).fail_on_missing(args.strict_assets))
        .with_audio(SilentAudio);

    let mut renderer = Renderer::new(spec, deps, RendererOpts::default());
    renderer.on_state_change(|from, to| {
        tracing::info!(%from, %to, "renderer state");
        Ok(())
    });

    renderer.initialize().await?;
    renderer.play().await?;

    let delta = 1000.0 / f64::from(args.fps);
    while renderer.state() == RendererState::Playing {
        if args.limit_ms.is_some_and(|limit| renderer.elapsed() >= limit) {
            renderer.stop().await?;
            break;
        }
        renderer.tick(delta).await?;
    }

    let stats = renderer.stats();
    println!(
        "played {} scenes, {} frames, {:.0} ms",
        stats.scenes_entered,
        stats.frames,
        renderer.elapsed()
    );
    renderer.destroy().await?;
    Ok(())
}
