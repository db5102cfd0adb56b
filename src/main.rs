mod config;
mod dom;
mod enhance;
mod extract;
mod model;
mod render;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use config::SelectorConfig;
use render::{RenderOptions, SortOrder, View};

#[derive(Parser)]
#[command(name = "rethread", about = "Reflow quoted email threads into threaded or chat views")]
struct Cli {
    /// JSON file overriding the selector fallback lists
    #[arg(long, global = true)]
    selectors: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract message records from a quoted-content fragment as JSON
    Extract {
        /// HTML fragment file
        file: PathBuf,
    },
    /// Format one quoted-content fragment
    Render {
        /// HTML fragment file
        file: PathBuf,
        #[arg(long, value_enum, default_value = "thread")]
        view: ViewArg,
        #[arg(long, value_enum, default_value = "newest")]
        sort: SortArg,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Reformat every quoted region of a saved page in place
    Enhance {
        /// Saved page file
        file: PathBuf,
        #[arg(long, value_enum, default_value = "thread")]
        view: ViewArg,
        #[arg(long, value_enum, default_value = "newest")]
        sort: SortArg,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Enhance every .html file in a directory
    Batch {
        /// Directory of saved pages
        dir: PathBuf,
        /// Destination directory for rewritten pages
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, value_enum, default_value = "thread")]
        view: ViewArg,
        #[arg(long, value_enum, default_value = "newest")]
        sort: SortArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ViewArg {
    Thread,
    Chat,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Newest,
    Oldest,
}

fn render_options(view: ViewArg, sort: SortArg) -> RenderOptions {
    RenderOptions {
        view: match view {
            ViewArg::Thread => View::Thread,
            ViewArg::Chat => View::Chat,
        },
        sort: match sort {
            SortArg::Newest => SortOrder::NewestFirst,
            SortArg::Oldest => SortOrder::OldestFirst,
        },
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let cfg = match &cli.selectors {
        Some(path) => SelectorConfig::load(path)?,
        None => SelectorConfig::default(),
    };

    let result = match cli.command {
        Commands::Extract { file } => cmd_extract(&file, &cfg),
        Commands::Render {
            file,
            view,
            sort,
            output,
        } => cmd_render(&file, &cfg, render_options(view, sort), output.as_deref()),
        Commands::Enhance {
            file,
            view,
            sort,
            output,
        } => cmd_enhance(&file, &cfg, render_options(view, sort), output.as_deref()),
        Commands::Batch {
            dir,
            out_dir,
            view,
            sort,
        } => cmd_batch(&dir, &out_dir, &cfg, render_options(view, sort)),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

#[derive(serde::Serialize)]
struct MessageRecord<'a> {
    sender: &'a str,
    timestamp: &'a str,
    content: &'a str,
    side: model::Side,
}

fn cmd_extract(file: &Path, cfg: &SelectorConfig) -> Result<()> {
    let html = read_input(file)?;
    let convo = extract::extract_conversation(&html, cfg);
    if convo.is_empty() {
        println!("[]");
        return Ok(());
    }
    let sides = extract::flow::assign_sides(&convo.messages);
    let records: Vec<MessageRecord> = convo
        .messages
        .iter()
        .zip(&sides)
        .map(|(m, side)| MessageRecord {
            sender: &m.sender,
            timestamp: &m.timestamp,
            content: &m.content,
            side: *side,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn cmd_render(
    file: &Path,
    cfg: &SelectorConfig,
    opts: RenderOptions,
    output: Option<&Path>,
) -> Result<()> {
    let html = read_input(file)?;
    match enhance::format_fragment(&html, cfg, opts) {
        Some(formatted) => write_output(&formatted, output),
        None => {
            println!("Nothing to format (empty or already formatted).");
            Ok(())
        }
    }
}

fn cmd_enhance(
    file: &Path,
    cfg: &SelectorConfig,
    opts: RenderOptions,
    output: Option<&Path>,
) -> Result<()> {
    let html = read_input(file)?;
    match enhance::enhance_document(&html, cfg, opts) {
        Some(page) => write_output(&page, output),
        None => {
            println!("No quoted regions to enhance.");
            Ok(())
        }
    }
}

fn cmd_batch(dir: &Path, out_dir: &Path, cfg: &SelectorConfig, opts: RenderOptions) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
        .collect();
    files.sort();

    if files.is_empty() {
        println!("No .html files in {}", dir.display());
        return Ok(());
    }
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    println!("Enhancing {} pages...", files.len());
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let outcomes: Vec<BatchOutcome> = files
        .par_iter()
        .map(|path| {
            let outcome = enhance_one(path, out_dir, cfg, opts);
            pb.inc(1);
            outcome
        })
        .collect();
    pb.finish_and_clear();

    let enhanced = outcomes
        .iter()
        .filter(|o| matches!(o, BatchOutcome::Enhanced))
        .count();
    let unchanged = outcomes
        .iter()
        .filter(|o| matches!(o, BatchOutcome::Unchanged))
        .count();
    let errors = outcomes.len() - enhanced - unchanged;
    println!("Done: {enhanced} enhanced, {unchanged} unchanged, {errors} errors.");
    Ok(())
}

enum BatchOutcome {
    Enhanced,
    Unchanged,
    Error,
}

fn enhance_one(
    path: &Path,
    out_dir: &Path,
    cfg: &SelectorConfig,
    opts: RenderOptions,
) -> BatchOutcome {
    let Some(name) = path.file_name() else {
        return BatchOutcome::Error;
    };
    let html = match std::fs::read_to_string(path) {
        Ok(html) => html,
        Err(e) => {
            warn!("failed to read {}: {}", path.display(), e);
            return BatchOutcome::Error;
        }
    };
    let (page, outcome) = match enhance::enhance_document(&html, cfg, opts) {
        Some(page) => (page, BatchOutcome::Enhanced),
        // nothing recognized: pass the page through untouched
        None => (html, BatchOutcome::Unchanged),
    };
    if let Err(e) = std::fs::write(out_dir.join(name), page) {
        warn!("failed to write {}: {}", path.display(), e);
        return BatchOutcome::Error;
    }
    outcome
}

fn read_input(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
