//! vtriage - triage batches of video files for review and sorting.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use directories::ProjectDirs;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use vtriage_core::config::ConfigManager;
use vtriage_core::discovery::{discover, DiscoveryFilter};
use vtriage_core::models::{CollisionMode, TransformResult};
use vtriage_core::probe::FfmpegVolumeProbe;
use vtriage_core::review::{ReviewManifest, ReviewSelection, MANIFEST_FILE_NAME};
use vtriage_core::run::{apply_dispositions, run_transforms, RunContext};
use vtriage_core::tools::{SystemToolRunner, ToolRunner};
use vtriage_core::transform::{NormalizeTransform, ThumbnailTransform, Transform};

#[derive(Parser)]
#[command(name = "vtriage", version, about = "Batch video triage pipeline")]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file path (default: platform config dir)
    #[arg(long, global = true, env = "VTRIAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover files, run transform stages, write the review manifest
    Scan(ScanArgs),
    /// Apply a reviewer's selection: move files into their buckets
    Apply(ApplyArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Input files or directories (directories expand one level)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output root for buckets and the manifest (default: first input dir)
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(long)]
    nproc: Option<usize>,

    /// Case-insensitive file-name pattern
    #[arg(long = "match")]
    name_match: Option<String>,

    /// Cap on discovered items
    #[arg(long)]
    max_items: Option<usize>,

    /// Overwrite same-named files on dispatch instead of suffixing
    #[arg(long)]
    replace: bool,

    /// Run the volume-normalizing re-encode stage
    #[arg(long)]
    normalize: bool,

    /// Run the thumbnail stage (the default when no stage is selected)
    #[arg(long)]
    thumbs: bool,
}

#[derive(Args)]
struct ApplyArgs {
    /// Review manifest written by `scan`
    #[arg(long)]
    manifest: PathBuf,

    /// Reviewer's selection file (JSON id-to-label map)
    #[arg(long)]
    selection: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => default_config_path()?,
    };
    let mut manager = ConfigManager::new(&config_path);
    manager
        .load_or_create()
        .with_context(|| format!("loading config {}", config_path.display()))?;
    manager.ensure_dirs_exist()?;

    match cli.command {
        Command::Scan(args) => scan(manager, args),
        Command::Apply(args) => apply(manager, args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
    Ok(())
}

fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "vtriage")
        .ok_or_else(|| anyhow!("could not determine a config directory"))?;
    Ok(dirs.config_dir().join("config.toml"))
}

fn scan(mut manager: ConfigManager, args: ScanArgs) -> Result<()> {
    // CLI flags override the config file for this run only.
    let settings = manager.settings_mut();
    if let Some(nproc) = args.nproc {
        settings.pool.worker_count = nproc;
    }
    if let Some(max) = args.max_items {
        settings.discovery.max_items = max;
    }
    if args.replace {
        settings.dispatch.collision_mode = CollisionMode::Replace.to_string();
    }
    if let Some(outdir) = &args.outdir {
        settings.paths.output_root = outdir.to_string_lossy().to_string();
    }
    manager.validate()?;
    let settings = manager.settings().clone();

    let mut filter = DiscoveryFilter::for_extension(&settings.discovery.extension)
        .with_max_items(settings.discovery.max_items);
    if let Some(pattern) = &args.name_match {
        filter = filter.with_name_match(pattern)?;
    }

    let found = discover(&args.inputs, &filter);
    if found.is_empty() {
        tracing::info!("Nothing to process");
        return Ok(());
    }

    let first_dir = found
        .first_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let output_root = settings.resolve_output_root(&first_dir);

    let ctx = RunContext::new(
        settings.clone(),
        output_root.join(&settings.paths.logs_folder),
    )?;
    tracing::info!("Run log: {}", ctx.logger.log_path().display());

    let runner: Arc<dyn ToolRunner> = Arc::new(SystemToolRunner);
    let mut results = Vec::new();

    if args.normalize {
        let probe = Arc::new(FfmpegVolumeProbe::new(Arc::clone(&runner)));
        let stage: Arc<dyn Transform> =
            Arc::new(NormalizeTransform::new(probe, Arc::clone(&runner)));
        results = run_transforms(&ctx, stage, found.items.clone())?;
        print_stage_tally("normalize", &results);
    }

    // The thumbnail stage is the default; when both stages run, its
    // results are the ones the reviewer sees.
    if args.thumbs || !args.normalize {
        let stage: Arc<dyn Transform> = Arc::new(ThumbnailTransform::new(Arc::clone(&runner)));
        results = run_transforms(&ctx, stage, found.items.clone())?;
        print_stage_tally("thumbnail", &results);
    }
    let collision_mode = settings
        .dispatch
        .collision_mode()
        .map_err(|e| anyhow!(e))?;
    let manifest = ReviewManifest::from_results(
        &results,
        &settings.dispatch.buckets,
        &output_root,
        collision_mode,
        settings.review.speeds.clone(),
        settings.review.base_url.clone(),
    );

    let manifest_path = output_root.join(MANIFEST_FILE_NAME);
    manifest.write(&manifest_path)?;

    println!("Review manifest: {}", manifest_path.display());
    ctx.finish();
    Ok(())
}

fn print_stage_tally(stage: &str, results: &[TransformResult]) {
    let ok = results.iter().filter(|r| r.is_ok()).count();
    println!(
        "{}: {} item(s), {} ok, {} failed",
        stage,
        results.len(),
        ok,
        results.len() - ok
    );
}

fn apply(manager: ConfigManager, args: ApplyArgs) -> Result<()> {
    let manifest = ReviewManifest::load(&args.manifest)?;
    let selection = ReviewSelection::load(&args.selection)?;

    let settings = manager.settings().clone();
    let ctx = RunContext::new(
        settings.clone(),
        manifest.output_root.join(&settings.paths.logs_folder),
    )?;

    let summary = apply_dispositions(&ctx, &manifest, selection);

    for (bucket, count) in &summary.bucket_counts {
        println!("{}: {} item(s)", bucket, count);
    }
    println!("Moved {} file(s)", summary.moved_files);
    if !summary.is_clean() {
        for (path, reason) in &summary.failures {
            eprintln!("failed: {}: {}", path.display(), reason);
        }
        println!("{} move(s) failed; see run log", summary.failures.len());
    }
    ctx.finish();
    Ok(())
}
