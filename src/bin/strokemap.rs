use std::io::{BufWriter, Write as _};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "strokemap", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score every paint trial in an experiment data file (JSON lines out).
    Score(ScoreArgs),
    /// Score a single trial from a strokes JSON file and print its record.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ScoreArgs {
    /// Scoring profile JSON.
    #[arg(long)]
    profile: PathBuf,

    /// Experiment data (JSON array or JSON lines).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Results path, one JSON object per trial.
    #[arg(long)]
    out: PathBuf,

    /// Artifact cache directory for rasters and composites.
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Score trials in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Trial fields forming the trial id, joined with `_` (default: participant id).
    #[arg(long = "id-field")]
    id_fields: Vec<String>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Scoring profile JSON.
    #[arg(long)]
    profile: PathBuf,

    /// File holding the trial's stroke list as JSON.
    #[arg(long)]
    strokes: PathBuf,

    /// Trial id used to name artifacts.
    #[arg(long)]
    id: String,

    /// Artifact cache directory for rasters and composites.
    #[arg(long)]
    artifacts: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Score(args) => cmd_score(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_score(args: ScoreArgs) -> anyhow::Result<()> {
    let profile = strokemap::ScoringProfile::from_path(&args.profile)?;
    let ctx = profile.into_context(args.artifacts)?;

    let ids = if args.id_fields.is_empty() {
        strokemap::TrialIdFields::Participant
    } else {
        strokemap::TrialIdFields::Fields(args.id_fields)
    };
    let trials = strokemap::read_trials(&args.in_path, &ids)?;
    let opts = strokemap::BatchOpts {
        parallel: args.parallel,
        threads: args.threads,
    };
    let outcomes = strokemap::score_trials(&ctx, &trials, &opts)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let file = std::fs::File::create(&args.out)
        .with_context(|| format!("create results '{}'", args.out.display()))?;
    let mut w = BufWriter::new(file);
    for outcome in &outcomes {
        serde_json::to_writer(&mut w, outcome)?;
        w.write_all(b"\n")?;
    }
    w.flush()
        .with_context(|| format!("write results '{}'", args.out.display()))?;

    if let Some(store) = &ctx.artifacts {
        let stats = store.stats();
        tracing::info!(?stats, "artifact cache");
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let profile = strokemap::ScoringProfile::from_path(&args.profile)?;
    let ctx = profile.into_context(args.artifacts)?;

    let json = std::fs::read_to_string(&args.strokes)
        .with_context(|| format!("open strokes '{}'", args.strokes.display()))?;
    let record = strokemap::process_trial(&ctx, &json, &args.id)?;

    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}
