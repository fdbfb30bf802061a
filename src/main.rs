use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use seec_scraper::db::{Repository, SqliteRepository};
use seec_scraper::discovery::{self, period_url};
use seec_scraper::fetch::HttpFetcher;
use seec_scraper::ident::ReportId;
use seec_scraper::model::ReportHint;
use seec_scraper::parser::process_report;
use seec_scraper::pipeline::Pipeline;
use seec_scraper::resolver::amendment_chain;
use seec_scraper::settings::Settings;

#[derive(Parser)]
#[command(name = "seec_scraper", about = "Seattle lobbying disclosure scraper")]
struct Cli {
    /// SQLite database (default: SEEC_DB_PATH or data/seec.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the index links on the reports home page
    Links,
    /// Scan index pages and print report identifiers
    Discover {
        /// Period as YYYY-MM (repeatable; default: every period on the home page)
        #[arg(short, long)]
        period: Vec<String>,
    },
    /// Discover, fetch, parse and store new reports
    Run {
        /// Period as YYYY-MM (repeatable; default: every period on the home page)
        #[arg(short, long)]
        period: Vec<String>,
        /// Worker threads (default: SEEC_WORKERS)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Parse a saved report page and print it as JSON
    Parse {
        file: PathBuf,
        /// Identifier the page was fetched under
        #[arg(long)]
        id: String,
        /// Expense report kind, when the header doesn't say
        #[arg(long, value_parser = ["quarterly", "annual"])]
        hint: Option<String>,
    },
    /// Show the stored amendment chain containing a report
    Chain { id: String },
    /// Show database statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;
    let db_path = cli.db.clone().unwrap_or_else(|| settings.db_path.clone());

    let result = match cli.command {
        Commands::Links => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let links = discovery::fetch_index_links(&fetcher, &settings.base_url)?;
            println!("--- Period indexes ({}) ---", links.period.len());
            for url in &links.period {
                println!("  {}", url);
            }
            println!("--- Filer indexes ({}) ---", links.filer.len());
            for url in &links.filer {
                println!("  {}", url);
            }
            Ok(())
        }
        Commands::Discover { period } => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let urls = index_urls(&fetcher, &settings, &period)?;
            let found = discovery::discover(&fetcher, &urls)?;
            let mut ids: Vec<_> = found.ids.iter().collect();
            ids.sort();
            for id in ids {
                let hint = match found.hints.get(id) {
                    Some(ReportHint::Quarterly) => "quarterly",
                    Some(ReportHint::Annual) => "annual",
                    None => "-",
                };
                println!("{}  {}", id, hint);
            }
            println!("\n{} reports across {} index pages", found.ids.len(), urls.len());
            Ok(())
        }
        Commands::Run { period, workers } => {
            let fetcher = HttpFetcher::new(&settings.user_agent, settings.timeout())?;
            let repo = SqliteRepository::open(&db_path)
                .with_context(|| format!("opening {}", db_path.display()))?;
            let urls = index_urls(&fetcher, &settings, &period)?;
            println!("Pipeline: {} index pages -> {}", urls.len(), db_path.display());

            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
                    .progress_chars("#>-"),
            );
            let stats = Pipeline::new(
                &fetcher,
                &repo,
                &settings.base_url,
                workers.unwrap_or(settings.workers),
            )?
            .chunk_size(settings.chunk_size)
            .with_progress(pb)
            .run(&urls)?;

            println!(
                "Discovered {} reports: {} already stored, {} inserted, {} raced, {} failed.",
                stats.discovered,
                stats.skipped_known,
                stats.inserted,
                stats.already_present,
                stats.failed,
            );
            Ok(())
        }
        Commands::Parse { file, id, hint } => {
            let id = parse_id(&id)?;
            let markup = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let hint = match hint.as_deref() {
                Some("quarterly") => Some(ReportHint::Quarterly),
                Some("annual") => Some(ReportHint::Annual),
                _ => None,
            };
            let report = process_report(&id, &settings.base_url, &markup, hint)
                .with_context(|| format!("parsing {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Chain { id } => {
            let id = parse_id(&id)?;
            let repo = SqliteRepository::open(&db_path)?;
            let chain = amendment_chain(&repo, &id)?;
            for (i, member) in chain.ids.iter().enumerate() {
                let filed = match repo.summary(member)? {
                    Some(s) => s.filed_at.to_string(),
                    None => "(not stored)".into(),
                };
                let role = if i == 0 { "original" } else { "amendment" };
                println!("{:>2}. {}  {:<9}  {}", i + 1, member, role, filed);
            }
            Ok(())
        }
        Commands::Stats => {
            let repo = SqliteRepository::open(&db_path)?;
            let s = repo.stats()?;
            println!("Total:      {}", s.total);
            println!("Amendments: {}", s.amendments);
            for (report_type, n) in &s.by_type {
                println!("  {:<30} {}", report_type, n);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Explicit `YYYY-MM` periods, or every period linked from the home page.
fn index_urls(
    fetcher: &HttpFetcher,
    settings: &Settings,
    periods: &[String],
) -> anyhow::Result<Vec<String>> {
    if periods.is_empty() {
        return Ok(discovery::fetch_index_links(fetcher, &settings.base_url)?.period);
    }
    periods
        .iter()
        .map(|p| -> anyhow::Result<String> {
            let (year, month) = p
                .split_once('-')
                .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
                .filter(|(_, m)| (1..=12).contains(m))
                .with_context(|| format!("bad period {p:?}, expected YYYY-MM"))?;
            Ok(period_url(&settings.base_url, year, month))
        })
        .collect()
}

fn parse_id(raw: &str) -> anyhow::Result<ReportId> {
    match ReportId::parse(raw) {
        Some(id) => Ok(id),
        None => bail!("not a report identifier: {raw:?}"),
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
