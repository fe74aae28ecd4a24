use crate::assemble::{extract_page, PageOutcome};
use crate::checkpoint::{self, CheckpointManager};
use crate::config::{IngestConfig, PROGRESS_INTERVAL};
use crate::context::{ContextDelta, PageContext, PageState};
use crate::models::ParseEvent;
use crate::pacer::{IndexSetup, SubmissionPacer, SubmitOutcome};
use crate::parser::WikiReader;
use crate::stats::IngestStats;
use crate::store::{load_mapping, SearchStore};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Stop request honoured between pages, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Completed pages from an event stream.
pub struct Pages<I> {
    events: I,
    state: PageState,
}

impl<I> Pages<I>
where
    I: Iterator<Item = Result<ParseEvent>>,
{
    pub fn new(events: I) -> Self {
        Self {
            events,
            state: PageState::new(),
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }
}

impl<I> Iterator for Pages<I>
where
    I: Iterator<Item = Result<ParseEvent>>,
{
    type Item = Result<PageContext>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let event = match self.events.next()? {
                Ok(event) => event,
                Err(e) => return Some(Err(e)),
            };
            let (state, delta) = std::mem::take(&mut self.state).step(&event);
            self.state = state;
            if let ContextDelta::PageComplete(page) = delta {
                return Some(Ok(page));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Stop after this many pages have been handled in this run
    pub limit: Option<u64>,
    /// Pages at the head of the stream already handled by an earlier run
    pub skip_pages: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    Limit,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub stop: StopReason,
    /// Pages handled from the start of the stream, counting those a resumed
    /// run skipped
    pub pages_read: u64,
}

/// Drives pages through classification, assembly and the pacer.
///
/// Tokenizer errors end the run; document write failures and redirects are
/// counted and logged.
pub async fn ingest_pages<I, S>(
    pages: &mut Pages<I>,
    pacer: &mut SubmissionPacer<S>,
    options: &IngestOptions,
    cancel: &CancelFlag,
    stats: &IngestStats,
    mut checkpoint: Option<&mut CheckpointManager>,
) -> Result<IngestOutcome>
where
    I: Iterator<Item = Result<ParseEvent>>,
    S: SearchStore,
{
    let pb = ProgressBar::new_spinner();
    let mut pages_read = 0u64;
    let mut handled = 0u64;

    if options.skip_pages > 0 {
        info!(pages = options.skip_pages, "Skipping pages handled by a previous run");
    }

    while let Some(page) = pages.next() {
        let page = page.with_context(|| format!("Failed to read page {}", pages_read + 1))?;
        pages_read += 1;
        if pages_read <= options.skip_pages {
            if cancel.is_cancelled() {
                pb.finish_and_clear();
                info!(pages_read, "Cancellation requested while skipping resumed pages");
                // The earlier run's frontier still stands; keep it for the next resume.
                return Ok(IngestOutcome {
                    stop: StopReason::Cancelled,
                    pages_read: options.skip_pages,
                });
            }
            continue;
        }

        match extract_page(&page) {
            PageOutcome::Document(doc) => match pacer.submit(doc).await {
                SubmitOutcome::Written => stats.inc_documents(),
                SubmitOutcome::Failed { .. } => stats.inc_failures(),
            },
            PageOutcome::Redirect { title } => {
                info!(title = %title, "Skipping redirect");
                stats.inc_redirects();
            }
        }
        stats.inc_pages();
        handled += 1;

        if pages_read % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!(
                "{} pages, {} documents, {} text elements",
                pages_read,
                stats.documents(),
                pages.state().text_elements_seen()
            ));
            pb.tick();
        }

        if let Some(cp) = checkpoint.as_deref_mut() {
            if let Err(e) = cp.maybe_save(pages_read, stats) {
                warn!(error = %e, "Failed to save checkpoint");
            }
        }

        if options.limit.is_some_and(|limit| handled >= limit) {
            pb.finish_and_clear();
            info!(pages = handled, "Page limit reached");
            return Ok(IngestOutcome {
                stop: StopReason::Limit,
                pages_read,
            });
        }

        if cancel.is_cancelled() {
            pb.finish_and_clear();
            info!(pages_read, "Cancellation requested, stopping at page boundary");
            return Ok(IngestOutcome {
                stop: StopReason::Cancelled,
                pages_read,
            });
        }
    }

    pb.finish_and_clear();
    Ok(IngestOutcome {
        stop: StopReason::EndOfInput,
        pages_read,
    })
}

pub struct IngestSummary {
    pub outcome: IngestOutcome,
    pub index_setup: IndexSetup,
    pub stats: IngestStats,
}

/// Full run: mapping, dump, checkpoint, index setup, then the page loop.
pub async fn run_ingest<S: SearchStore>(
    config: &IngestConfig,
    store: S,
    cancel: &CancelFlag,
) -> Result<IngestSummary> {
    let schema = load_mapping(&config.mapping_path)?;
    let reader = WikiReader::open(&config.input)?;
    let index = config.store.index.as_str();

    let mut checkpoint_mgr = match &config.checkpoint_dir {
        Some(dir) => Some(CheckpointManager::new(
            &config.input,
            dir,
            index,
            config.checkpoint_interval,
        )?),
        None => None,
    };

    let resumed = match (&config.checkpoint_dir, config.resume) {
        (Some(dir), true) => {
            let cp = checkpoint::load_if_valid(&config.input, dir, index)?;
            if cp.is_none() {
                info!("No valid checkpoint found, starting fresh");
            }
            cp
        }
        _ => None,
    };

    let (stats, skip_pages) = match &resumed {
        Some(cp) => {
            info!(
                pages_read = cp.pages_read,
                documents = cp.stats.documents_written,
                "Resuming from checkpoint"
            );
            (IngestStats::from_checkpoint(&cp.stats), cp.pages_read)
        }
        None => (IngestStats::new(), 0),
    };

    let mut pacer = SubmissionPacer::new(store, index, config.pacing);
    let index_setup = pacer.ensure_index(&schema).await;

    let options = IngestOptions {
        limit: config.limit,
        skip_pages,
    };
    let mut pages = Pages::new(reader);
    let outcome = ingest_pages(
        &mut pages,
        &mut pacer,
        &options,
        cancel,
        &stats,
        checkpoint_mgr.as_mut(),
    )
    .await?;

    if let Some(mgr) = checkpoint_mgr.as_mut() {
        let result = match outcome.stop {
            StopReason::EndOfInput => mgr.clear(),
            StopReason::Limit | StopReason::Cancelled => mgr.save(outcome.pages_read, &stats),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to update checkpoint");
        }
    }

    Ok(IngestSummary {
        outcome,
        index_setup,
        stats,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectCounts {
    pub pages: u64,
    pub documents: u64,
    pub redirects: u64,
}

/// Writes every assembled document as one JSON line, without a search store.
pub fn inspect_pages<I, W>(pages: Pages<I>, limit: Option<u64>, mut out: W) -> Result<InspectCounts>
where
    I: Iterator<Item = Result<ParseEvent>>,
    W: Write,
{
    let mut counts = InspectCounts::default();
    for page in pages {
        let page = page.with_context(|| format!("Failed to read page {}", counts.pages + 1))?;
        counts.pages += 1;
        match extract_page(&page) {
            PageOutcome::Document(doc) => {
                serde_json::to_writer(&mut out, &doc).context("Failed to serialize document")?;
                writeln!(out).context("Failed to write output")?;
                counts.documents += 1;
            }
            PageOutcome::Redirect { title } => {
                info!(title = %title, "Skipping redirect");
                counts.redirects += 1;
            }
        }
        if limit.is_some_and(|limit| counts.pages >= limit) {
            break;
        }
    }
    out.flush().context("Failed to flush output")?;
    Ok(counts)
}

pub fn inspect_dump<W: Write>(path: &str, limit: Option<u64>, out: W) -> Result<InspectCounts> {
    let reader = WikiReader::open(path)?;
    inspect_pages(Pages::new(reader), limit, out)
}
