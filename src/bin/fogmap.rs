use std::io::BufRead as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "fogmap", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose one frame of a stored map as a PNG.
    Frame(FrameArgs),
    /// Serve a stored map over HTTP until stdin closes.
    Serve(ServeArgs),
    /// List stored maps.
    List(ListArgs),
}

#[derive(Parser, Debug)]
struct SourceArgs {
    /// Map records JSON file.
    #[arg(long)]
    repo: PathBuf,

    /// Campaign directory that asset paths are relative to.
    #[arg(long)]
    campaign: PathBuf,

    /// Map record name.
    #[arg(long)]
    map: String,

    /// Optional session options JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Player view: binary fog, no markers.
    #[arg(long)]
    player: bool,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Address to bind, e.g. `0.0.0.0:32000`.
    #[arg(long)]
    bind: Option<String>,

    /// Stream frame interval in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Map records JSON file.
    #[arg(long)]
    repo: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Serve(args) => cmd_serve(args),
        Command::List(args) => cmd_list(args),
    }
}

fn load_opts(config: Option<&Path>, campaign: &Path) -> anyhow::Result<fogmap::SessionOpts> {
    let opts = match config {
        Some(path) => fogmap::SessionOpts::from_json_file(path)?,
        None => fogmap::SessionOpts::default(),
    };
    Ok(opts.with_campaign_dir(campaign).with_env_overrides())
}

fn open_session(
    source: &SourceArgs,
    opts: fogmap::SessionOpts,
) -> anyhow::Result<fogmap::MapSession> {
    let repo = Arc::new(fogmap::JsonFileRepository::new(&source.repo));
    let catalog = Arc::new(fogmap::MemoryCatalog::new());
    let mut session = fogmap::MapSession::new(opts, repo, catalog)?;
    session
        .open_map(&source.map)
        .with_context(|| format!("open map '{}'", source.map))?;
    Ok(session)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let opts = load_opts(args.source.config.as_deref(), &args.source.campaign)?;
    let session = open_session(&args.source, opts)?;

    let png = if args.player {
        let snap = session.snapshot();
        let mut compositor = fogmap::Compositor::new(Arc::clone(session.assets()));
        compositor
            .compose(&snap, &snap.viewport, fogmap::RenderMode::Player, None)?
            .encode_png()?
    } else {
        session
            .surface_frame()
            .context("no frame composed")?
            .encode_png()?
    };
    std::fs::write(&args.out, png).with_context(|| format!("write '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut opts = load_opts(args.source.config.as_deref(), &args.source.campaign)?;
    if let Some(bind) = args.bind {
        opts.stream = opts.stream.with_bind(bind);
    }
    if let Some(ms) = args.interval_ms {
        opts.stream = opts.stream.with_interval_ms(ms);
    }
    let mut session = open_session(&args.source, opts)?;
    let addr = session.start_stream()?;
    eprintln!("serving http://{addr}/ (close stdin to stop)");

    for line in std::io::stdin().lock().lines() {
        if line.is_err() {
            break;
        }
    }
    session.close()?;
    Ok(())
}

fn cmd_list(args: ListArgs) -> anyhow::Result<()> {
    let repo = fogmap::JsonFileRepository::new(&args.repo);
    for record in fogmap::ItemRepository::load_items(&repo)? {
        println!("{}\t{}", record.name, record.image);
    }
    Ok(())
}
