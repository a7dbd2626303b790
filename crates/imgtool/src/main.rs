use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use imgtool_core::config::{ToolConfig, load_config};
use imgtool_core::fetch::HttpFetcher;
use imgtool_core::pipeline::{BatchReport, process_tree, scan_tree};
use imgtool_core::runtime::{
    ResolutionContext, ResolvedRoots, RootOverrides, ensure_search_root, resolve_roots,
};

#[derive(Debug, Parser)]
#[command(
    name = "imgtool",
    version,
    about = "Co-locates images referenced by markdown posts next to the posts themselves"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Tree to search for documents")]
    search_root: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Root against which local image paths resolve (defaults to the search root)"
    )]
    staging_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    search_root: Option<PathBuf>,
    staging_root: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            search_root: cli.search_root.clone(),
            staging_root: cli.staging_root.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Relocate referenced images and rewrite documents in place")]
    Run,
    #[command(about = "Dry run: report planned relocations without touching anything")]
    Scan(ScanArgs),
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(long, help = "Emit the report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Run) => run_batch(&runtime),
        Some(Commands::Scan(args)) => run_scan(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_batch(runtime: &RuntimeOptions) -> Result<()> {
    let (roots, config) = resolve_runtime(runtime)?;
    let fetcher = HttpFetcher::new(&config.user_agent(), config.timeout_ms())?;

    let report = process_tree(
        &roots.search_root,
        &roots.staging_root,
        &config.extensions(),
        &fetcher,
    )?;

    for document in &report.documents {
        println!(
            "{}: {}",
            normalize_path(&document.path),
            if document.changed {
                format!(
                    "rewritten (moved {}, fetched {}, skipped {})",
                    document.moved, document.fetched, document.skipped
                )
            } else {
                "unchanged".to_string()
            }
        );
    }
    for failure in &report.failures {
        println!("{}: FAILED ({})", normalize_path(&failure.path), failure.message);
    }
    print_summary(&report);
    Ok(())
}

fn run_scan(runtime: &RuntimeOptions, args: ScanArgs) -> Result<()> {
    let (roots, config) = resolve_runtime(runtime)?;
    let planned = scan_tree(&roots.search_root, &config.extensions())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    for entry in &planned {
        println!(
            "{}:{} [{}] {} -> {} ({})",
            normalize_path(&entry.document),
            entry.line,
            entry.syntax,
            entry.locator.as_deref().unwrap_or("<no src>"),
            entry.destination.as_deref().unwrap_or("<unchanged>"),
            entry.action,
        );
    }
    println!("planned: {}", planned.len());
    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!("processed: {}", report.processed);
    println!("changed: {}", report.changed);
    println!("failed: {}", report.failures.len());
}

fn resolve_runtime(runtime: &RuntimeOptions) -> Result<(ResolvedRoots, ToolConfig)> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = RootOverrides {
        search_root: runtime.search_root.clone(),
        staging_root: runtime.staging_root.clone(),
        config: runtime.config.clone(),
    };
    let roots = resolve_roots(&context, &overrides)?;
    ensure_search_root(&roots)?;
    if runtime.diagnostics {
        println!("[diagnostics]\n{}", roots.diagnostics());
    }

    let config = load_config(&roots.config_path)?;
    Ok((roots, config))
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
