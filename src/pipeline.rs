use std::collections::HashMap;

use anyhow::Context;
use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::db::{Repository, UpsertResult};
use crate::discovery::{self, Discovered};
use crate::error::ReportError;
use crate::fetch::{fetch_report, Fetch};
use crate::ident::ReportId;
use crate::model::{Report, ReportHint};
use crate::normalize::normalize;
use crate::parser::process_report;
use crate::resolver::resolve;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub discovered: usize,
    pub skipped_known: usize,
    pub inserted: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Discover -> skip known -> fetch/classify/extract in parallel -> resolve ->
/// upsert serially, one chunk at a time.
pub struct Pipeline<'a, F, R> {
    fetch: &'a F,
    repo: &'a R,
    base_url: &'a str,
    chunk_size: usize,
    pool: ThreadPool,
    progress: ProgressBar,
}

impl<'a, F: Fetch, R: Repository> Pipeline<'a, F, R> {
    pub fn new(fetch: &'a F, repo: &'a R, base_url: &'a str, workers: usize) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("seec-worker-{i}"))
            .build()
            .context("building worker pool")?;
        Ok(Self {
            fetch,
            repo,
            base_url,
            chunk_size: 200,
            pool,
            progress: ProgressBar::hidden(),
        })
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    pub fn run(&self, index_urls: &[String]) -> anyhow::Result<RunStats> {
        let discovered =
            discovery::discover(self.fetch, index_urls).context("identifier discovery failed")?;
        self.process(discovered)
    }

    pub fn process(&self, discovered: Discovered) -> anyhow::Result<RunStats> {
        let Discovered { ids, hints } = discovered;
        let known = self
            .repo
            .list_known_identifiers()
            .context("reading known identifiers")?;

        let mut stats = RunStats {
            discovered: ids.len(),
            ..Default::default()
        };
        let mut pending: Vec<ReportId> = ids.into_iter().filter(|id| !known.contains(id)).collect();
        pending.sort();
        stats.skipped_known = stats.discovered - pending.len();
        info!(
            discovered = stats.discovered,
            known = stats.skipped_known,
            pending = pending.len(),
            "Starting report pass"
        );

        self.progress.set_length(pending.len() as u64);
        for chunk in pending.chunks(self.chunk_size) {
            let reports = self.extract_chunk(chunk, &hints, &mut stats);
            self.store(reports, &mut stats)?;
            self.progress.inc(chunk.len() as u64);
        }
        self.progress.finish_and_clear();

        info!(
            inserted = stats.inserted,
            already_present = stats.already_present,
            failed = stats.failed,
            "Report pass complete"
        );
        Ok(stats)
    }

    /// Parallel part: one fetch and parse per identifier. Failures are logged
    /// and dropped here.
    fn extract_chunk(
        &self,
        chunk: &[ReportId],
        hints: &HashMap<ReportId, ReportHint>,
        stats: &mut RunStats,
    ) -> Vec<Report> {
        let fetch = self.fetch;
        let base_url = self.base_url;
        let results: Vec<(&ReportId, Result<Report, ReportError>)> = self.pool.install(|| {
            chunk
                .par_iter()
                .map(|id| {
                    let report = fetch_report(fetch, base_url, id).and_then(|markup| {
                        process_report(id, base_url, &markup, hints.get(id).copied())
                    });
                    (id, report)
                })
                .collect()
        });

        let mut reports = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(r) => reports.push(r),
                Err(e) => {
                    self.skip(id, &e);
                    stats.failed += 1;
                }
            }
        }
        reports
    }

    /// Serial part: resolve lineage, then write each report once.
    fn store(&self, reports: Vec<Report>, stats: &mut RunStats) -> anyhow::Result<()> {
        let resolution = resolve(reports);
        for link in &resolution.links {
            debug!(original = %link.original, amendment = %link.amendment, "amendment link");
        }

        for resolved in &resolution.resolved {
            let id = &resolved.report.id;
            let record = normalize(resolved).with_context(|| format!("encoding report {id}"))?;
            let outcome = self
                .repo
                .upsert(id, &record)
                .with_context(|| format!("storing report {id}"))?;
            match outcome {
                UpsertResult::Inserted => stats.inserted += 1,
                UpsertResult::AlreadyPresent => stats.already_present += 1,
            }
        }
        Ok(())
    }

    fn skip(&self, id: &ReportId, e: &ReportError) {
        warn!(
            id = %id,
            url = id.permalink(self.base_url).as_str(),
            stage = e.stage().as_str(),
            error = %e,
            "Skipping report"
        );
    }
}
