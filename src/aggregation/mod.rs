//! Remote aggregation: paginated listing discovery, batched detail fetches and a single commit.
//!
//! The pipeline runs on the caller's task. Listing pages are fetched one after another until the
//! advertised `count` is reached; detail fetches then run in batches of at most
//! [`AggregationOptions::concurrency`] requests. A [`CancelToken`] is checked before every page
//! and every batch, and an in-flight batch is abandoned as soon as it fires. Rows reach the
//! [`Store`] only once every detail has been fetched.
//!
//! ```no_run
//! use pokemon_research_lab::aggregation::{
//!     AggregationOptions, AggregationOutcome, Aggregator, CancelToken, HttpTransport,
//! };
//! use pokemon_research_lab::store::Store;
//!
//! # async fn demo() -> Result<(), pokemon_research_lab::LabError> {
//! let aggregator = Aggregator::new(HttpTransport::default(), AggregationOptions::default());
//! let mut store = Store::new();
//! match aggregator.run(&mut store, &CancelToken::new()).await? {
//!     AggregationOutcome::Completed(stats) => println!("loaded {} rows", stats.rows),
//!     AggregationOutcome::Cancelled(progress) => println!("stopped at {progress}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod normalize;
pub mod transport;

use std::fmt;
use std::sync::Arc;

use futures_util::future::try_join_all;

use crate::error::LabResult;
use crate::ingestion::observability::{
    IngestionContext, IngestionObserver, IngestionProgress, IngestionSeverity, IngestionSource, IngestionStats,
    Reporter,
};
use crate::store::Store;
use crate::types::{Provenance, Row};

pub use cancel::CancelToken;
pub use normalize::normalize;
pub use transport::{
    DetailPayload, HttpTransport, ItemRef, ListingPage, Transport, TransportError, DEFAULT_BASE_URL,
};

/// Default listing page size.
pub const DEFAULT_PAGE_LIMIT: usize = 200;
/// Default number of detail requests in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 15;

/// Options controlling a remote aggregation.
#[derive(Clone)]
pub struct AggregationOptions {
    /// Items requested per listing page.
    pub page_limit: usize,
    /// Maximum number of detail requests in flight.
    pub concurrency: usize,
    /// Optional observer for progress, logging and alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for AggregationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationOptions")
            .field("page_limit", &self.page_limit)
            .field("concurrency", &self.concurrency)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

/// How an aggregation run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// All rows were fetched and committed.
    Completed(IngestionStats),
    /// The cancel token fired; the store was left untouched. Carries the progress reached.
    Cancelled(IngestionProgress),
}

/// Drives a [`Transport`] through discovery and detail fetching.
#[derive(Debug)]
pub struct Aggregator<T> {
    transport: T,
    options: AggregationOptions,
}

impl<T: Transport> Aggregator<T> {
    pub fn new(transport: T, options: AggregationOptions) -> Self {
        Self { transport, options }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// Fetch everything and replace the store's rows with the result, sorted by id.
    ///
    /// On cancellation or failure the store is not modified.
    pub async fn run(&self, store: &mut Store, cancel: &CancelToken) -> LabResult<AggregationOutcome> {
        let reporter = self.reporter();
        let mut progress = IngestionProgress { rows: 0, total: None };

        let result = match self.collect(cancel, &reporter, &mut progress).await {
            Ok(Some(rows)) => {
                let stats = IngestionStats { rows: rows.len() };
                store.replace_rows(rows, Provenance::Remote);
                Ok(stats)
            }
            Ok(None) => {
                reporter.cancelled(progress.rows, progress.total);
                return Ok(AggregationOutcome::Cancelled(progress));
            }
            Err(e) => Err(e),
        };

        reporter.outcome(&result, |s| s.rows);
        result.map(AggregationOutcome::Completed)
    }

    /// Fetch and normalize every row without touching a store.
    ///
    /// Returns `Ok(None)` when cancelled.
    pub async fn fetch_rows(&self, cancel: &CancelToken) -> LabResult<Option<Vec<Row>>> {
        let reporter = self.reporter();
        let mut progress = IngestionProgress { rows: 0, total: None };
        self.collect(cancel, &reporter, &mut progress).await
    }

    fn reporter(&self) -> Reporter<'_> {
        Reporter {
            observer: self.options.observer.as_ref(),
            alert_at_or_above: self.options.alert_at_or_above,
            ctx: IngestionContext {
                source: IngestionSource::Remote {
                    base_url: self.transport.describe(),
                },
            },
        }
    }

    async fn collect(
        &self,
        cancel: &CancelToken,
        reporter: &Reporter<'_>,
        progress: &mut IngestionProgress,
    ) -> LabResult<Option<Vec<Row>>> {
        let Some((refs, count)) = self.discover(cancel).await? else {
            return Ok(None);
        };
        progress.total = Some(count);

        let mut rows = Vec::with_capacity(refs.len());
        for batch in refs.chunks(self.options.concurrency.max(1)) {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let fetches = batch.iter().map(|item| self.transport.fetch_detail(item, cancel));
            let details = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                res = try_join_all(fetches) => res,
            };
            let Some(details) = settle(details)? else {
                return Ok(None);
            };

            rows.extend(details.iter().map(normalize));
            progress.rows = rows.len();
            reporter.progress(progress.rows, progress.total);
        }

        // The token may have fired while the last batch was resolving.
        if cancel.is_cancelled() {
            return Ok(None);
        }
        rows.sort_by_key(Row::id);
        Ok(Some(rows))
    }

    /// Walk the listing page by page until `count` references are known or a page comes back
    /// empty. Returns the references and the advertised `count`.
    async fn discover(&self, cancel: &CancelToken) -> LabResult<Option<(Vec<ItemRef>, usize)>> {
        let limit = self.options.page_limit.max(1);
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let Some(first) = settle(self.transport.fetch_listing(0, limit).await)? else {
            return Ok(None);
        };

        let count = first.count;
        let mut refs = first.results;
        let mut page_index = 1;
        while refs.len() < count {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let offset = page_index * limit;
            let Some(page) = settle(self.transport.fetch_listing(offset, limit).await)? else {
                return Ok(None);
            };
            if page.results.is_empty() {
                break;
            }
            refs.extend(page.results);
            page_index += 1;
        }
        Ok(Some((refs, count)))
    }
}

/// Split a transport result into success, cancellation (`None`) or a crate error.
fn settle<T>(result: Result<T, TransportError>) -> LabResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) => match e.into_lab_error() {
            None => Ok(None),
            Some(err) => Err(err),
        },
    }
}

/// Run a one-off aggregation with `transport` into `store`.
pub async fn aggregate<T: Transport>(
    store: &mut Store,
    transport: T,
    options: AggregationOptions,
    cancel: &CancelToken,
) -> LabResult<AggregationOutcome> {
    Aggregator::new(transport, options).run(store, cancel).await
}
