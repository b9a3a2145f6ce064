//! Rate-limited walk over paged upstream enumerations.
//!
//! The [`Paginator`] owns the cursor, so every page that arrived before a
//! failure is kept. Raw items are mapped through the normalization pipeline
//! as each page arrives; a bad item is dropped with a warning and never
//! stops the walk. Only a failed page request does, and the outcome then
//! carries both the error and the cursor that would have been requested
//! next.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::data_source::{FetchFuture, SourceError};
use crate::normalize::{Normalized, Rejection};
use crate::pacing::Cooldown;
use crate::ProviderId;

/// One page of raw upstream items.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// Opaque cursor for the following page; `None` on the last page.
    pub next: Option<String>,
}

impl<R> Page<R> {
    pub fn new(items: Vec<R>, next: Option<String>) -> Self {
        Self { items, next }
    }

    pub fn last(items: Vec<R>) -> Self {
        Self { items, next: None }
    }
}

/// A paged upstream enumeration.
pub trait PageSource: Send + Sync {
    type Raw: Send;

    /// Fetches the page at `cursor`, or the first page when `cursor` is `None`.
    fn fetch_page<'a>(&'a self, cursor: Option<&'a str>) -> FetchFuture<'a, Page<Self::Raw>>;

    /// Entity name used in log lines.
    fn entity(&self) -> &'static str {
        "record"
    }
}

/// Result of a walk, complete or interrupted.
#[derive(Debug, Clone)]
pub struct PageWalk<T> {
    pub items: Vec<T>,
    pub rejected: Vec<Rejection>,
    /// Pages successfully fetched.
    pub pages: usize,
    /// Error that stopped the walk early.
    pub interrupted: Option<SourceError>,
    /// Cursor of the page that failed. `None` together with `interrupted`
    /// means the very first page failed and a retry starts from scratch.
    pub resume_from: Option<String>,
    /// Set when the walk stopped because `max_items` was reached.
    pub truncated: bool,
}

impl<T> PageWalk<T> {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    /// Accepts partial results for recoverable interruptions; fatal
    /// errors are returned as-is.
    pub fn into_result(self, provider: ProviderId) -> Result<Vec<T>, SourceError> {
        match self.interrupted {
            Some(error) if error.is_fatal() => Err(error),
            Some(error) => {
                error!(
                    provider = %provider,
                    code = error.code(),
                    kept = self.items.len(),
                    pages = self.pages,
                    "enumeration interrupted, returning partial results: {}",
                    error.message()
                );
                Ok(self.items)
            }
            None => Ok(self.items),
        }
    }
}

/// Drives a [`PageSource`] to exhaustion, pausing after every page except
/// an empty last one, so `M > 0` items in pages of `P` cost `ceil(M/P)` pauses.
#[derive(Clone)]
pub struct Paginator {
    provider: ProviderId,
    cooldown: Duration,
    pacer: Arc<dyn Cooldown>,
    max_items: Option<usize>,
}

impl Paginator {
    pub fn new(provider: ProviderId, cooldown: Duration, pacer: Arc<dyn Cooldown>) -> Self {
        Self {
            provider,
            cooldown,
            pacer,
            max_items: None,
        }
    }

    /// Stops the walk once `max_items` valid items have been collected.
    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub async fn walk<S, T, F>(&self, source: &S, map: F) -> PageWalk<T>
    where
        S: PageSource + ?Sized,
        F: FnMut(S::Raw) -> Result<T, Rejection>,
    {
        self.walk_from(source, None, map).await
    }

    /// Continues a walk from a cursor returned in [`PageWalk::resume_from`].
    pub async fn walk_from<S, T, F>(&self, source: &S, start: Option<String>, mut map: F) -> PageWalk<T>
    where
        S: PageSource + ?Sized,
        F: FnMut(S::Raw) -> Result<T, Rejection>,
    {
        let entity = source.entity();
        let mut normalized = Normalized::new(self.provider, entity);
        let mut cursor = start;
        let mut pages = 0usize;
        let mut interrupted = None;
        let mut truncated = false;

        loop {
            let page = match source.fetch_page(cursor.as_deref()).await {
                Ok(page) => page,
                Err(error) => {
                    warn!(
                        provider = %self.provider,
                        page = pages + 1,
                        code = error.code(),
                        "page request failed: {}",
                        error.message()
                    );
                    interrupted = Some(error);
                    break;
                }
            };
            pages += 1;

            let received = page.items.len();
            for raw in page.items {
                normalized.push(map(raw));
                if self.limit_reached(normalized.records.len()) {
                    truncated = true;
                    break;
                }
            }

            info!(
                provider = %self.provider,
                page = pages,
                received,
                total = normalized.records.len(),
                "fetched {entity} page"
            );

            if truncated {
                break;
            }
            // Every request but an empty final one is followed by a pause.
            if received > 0 || page.next.is_some() {
                if !self.cooldown.is_zero() {
                    info!(
                        provider = %self.provider,
                        seconds = self.cooldown.as_secs_f64(),
                        "pausing to respect rate limit"
                    );
                }
                self.pacer.pause(self.cooldown).await;
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => {
                    cursor = None;
                    break;
                }
            }
        }

        PageWalk {
            items: normalized.records,
            rejected: normalized.rejected,
            pages,
            resume_from: if interrupted.is_some() { cursor } else { None },
            interrupted,
            truncated,
        }
    }

    fn limit_reached(&self, collected: usize) -> bool {
        self.max_items.is_some_and(|max| collected >= max)
    }
}
