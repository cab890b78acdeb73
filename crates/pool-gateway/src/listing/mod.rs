//! Paginated listing with throttling backoff.
//!
//! [`list_all`] walks a provider collection page by page, following
//! continuation cursors until the provider stops returning one. A throttled
//! page call is retried with the *same* cursor after the next delay from a
//! [`BackoffSchedule`]; any other failure stops the traversal at once.
//!
//! The retry policy lives in [`Traversal::advance`], a pure transition that
//! never touches the network or the clock. The async driver only executes
//! the [`Step`] it returns.
//!
//! When a traversal stops early the records gathered so far are returned
//! inside [`IncompleteAggregate`] together with the terminal error.

use crate::observability::metrics::{record_listing_page, record_listing_throttle_retry};
use crate::provider::{ListingRequest, Page, ProviderError};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default wait sequence applied to throttled page calls.
pub const DEFAULT_BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(10),
];

/// Ordered wait durations consumed from the front on each throttled call.
///
/// Delays are never reset within one traversal, even after a page succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: VecDeque<Duration>,
}

impl BackoffSchedule {
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
        }
    }

    /// Take the next delay, or `None` once the schedule is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.delays.pop_front()
    }

    /// Number of retries still available.
    pub fn remaining(&self) -> usize {
        self.delays.len()
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF)
    }
}

/// Why a traversal stopped before exhausting the collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("throttled after {retries} retries, backoff schedule exhausted: {last}")]
    RetriesExhausted { retries: usize, last: ProviderError },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("listing cancelled")]
    Cancelled,
}

/// A traversal that stopped early.
///
/// `partial` holds every record from pages that completed before the
/// failure, in provider order.
#[derive(Debug, Clone)]
pub struct IncompleteAggregate<T> {
    pub partial: Vec<T>,
    pub cause: ListingError,
}

impl<T> fmt::Display for IncompleteAggregate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listing incomplete after {} records: {}",
            self.partial.len(),
            self.cause
        )
    }
}

impl<T: fmt::Debug> std::error::Error for IncompleteAggregate<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// What the driver must do next.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// Issue the next page call with [`Traversal::request`].
    Fetch,
    /// Wait, then repeat the page call with the unchanged cursor.
    Backoff(Duration),
    /// The collection is exhausted.
    Complete,
    /// Stop with the given cause.
    Abort(ListingError),
}

/// State of one traversal.
#[derive(Debug)]
pub struct Traversal<T> {
    request: ListingRequest,
    schedule: BackoffSchedule,
    items: Vec<T>,
    pages: usize,
    retries: usize,
}

impl<T> Traversal<T> {
    /// Start a traversal. An empty initial cursor is treated as absent.
    pub fn new(mut request: ListingRequest, schedule: BackoffSchedule) -> Self {
        request.cursor = request.cursor.filter(|cursor| !cursor.is_empty());
        Self {
            request,
            schedule,
            items: Vec::new(),
            pages: 0,
            retries: 0,
        }
    }

    /// Request for the next page call.
    pub fn request(&self) -> &ListingRequest {
        &self.request
    }

    /// Records gathered so far.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Successful page calls so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Backoff delays consumed so far.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Apply the outcome of one page call.
    pub fn advance(&mut self, outcome: Result<Page<T>, ProviderError>) -> Step {
        match outcome {
            Ok(page) => {
                self.items.extend(page.items);
                self.pages += 1;
                match page.next_cursor {
                    Some(cursor) => {
                        self.request.cursor = Some(cursor);
                        Step::Fetch
                    }
                    None => Step::Complete,
                }
            }
            Err(err) if err.is_retryable() => match self.schedule.next_delay() {
                Some(delay) => {
                    self.retries += 1;
                    Step::Backoff(delay)
                }
                None => Step::Abort(ListingError::RetriesExhausted {
                    retries: self.retries,
                    last: err,
                }),
            },
            Err(err) => Step::Abort(ListingError::Provider(err)),
        }
    }

    /// Consume the traversal, returning every record.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Consume the traversal into an early-stop error.
    pub fn into_incomplete(self, cause: ListingError) -> IncompleteAggregate<T> {
        IncompleteAggregate {
            partial: self.items,
            cause,
        }
    }
}

/// Waits out backoff delays.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Collect every record of a paginated collection.
///
/// `fetch` performs one page call for the given request. It is called with
/// the initial request first, then with each returned cursor. `operation`
/// labels logs and metrics.
///
/// Cancellation is checked before every call and raced against every call
/// and every backoff sleep.
///
/// # Errors
///
/// Returns [`IncompleteAggregate`] with the records gathered so far when a
/// non-throttling error occurs, when throttling outlasts the schedule, or
/// when `cancel` fires.
pub async fn list_all<T, F, Fut>(
    operation: &'static str,
    request: ListingRequest,
    schedule: BackoffSchedule,
    mut fetch: F,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> Result<Vec<T>, IncompleteAggregate<T>>
where
    F: FnMut(ListingRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut traversal = Traversal::new(request, schedule);

    loop {
        if cancel.is_cancelled() {
            return Err(traversal.into_incomplete(ListingError::Cancelled));
        }

        let call = fetch(traversal.request().clone());
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = call => Some(result),
        };
        let Some(outcome) = outcome else {
            return Err(traversal.into_incomplete(ListingError::Cancelled));
        };

        let succeeded = outcome.is_ok();
        let step = traversal.advance(outcome);
        if succeeded {
            record_listing_page(operation);
        }

        match step {
            Step::Fetch => {}
            Step::Complete => {
                tracing::debug!(
                    target: "gw.listing",
                    operation,
                    pages = traversal.pages(),
                    records = traversal.items().len(),
                    retries = traversal.retries(),
                    "Listing complete"
                );
                return Ok(traversal.into_items());
            }
            Step::Backoff(delay) => {
                record_listing_throttle_retry(operation);
                tracing::debug!(
                    target: "gw.listing",
                    operation,
                    delay_ms = delay.as_millis() as u64,
                    retry = traversal.retries(),
                    "Page call throttled, backing off"
                );

                let slept = tokio::select! {
                    biased;
                    () = cancel.cancelled() => false,
                    () = sleeper.sleep(delay) => true,
                };
                if !slept {
                    return Err(traversal.into_incomplete(ListingError::Cancelled));
                }
            }
            Step::Abort(cause) => {
                tracing::debug!(
                    target: "gw.listing",
                    operation,
                    pages = traversal.pages(),
                    records = traversal.items().len(),
                    error = %cause,
                    "Listing stopped early"
                );
                return Err(traversal.into_incomplete(cause));
            }
        }
    }
}
