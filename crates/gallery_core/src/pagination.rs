//! Cursor pagination accumulator
//!
//! Owns the gallery [`Collection`] and is its only writer. Pages are requested
//! through tickets so an event-driven host can run the fetch elsewhere and feed
//! the result back; [`PaginationAccumulator::load_next`] does both halves for
//! async callers.
//!
//! Images merge by `(order, id)` no matter when a page arrives. Cursor,
//! `has_more` and total count follow the highest-sequence page applied, so any
//! completion order ends in the same state as in-order loading.

use crate::error::FetchError;
use crate::model::{Collection, Cursor, MergeStats, PageRequest, PageResponse};
use crate::page_source::{fetch_with_retry, PageSource, RetryPolicy};
use std::collections::BTreeSet;

/// Handle for one outstanding page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    seq: u64,
    generation: u64,
    pub request: PageRequest,
}

impl PageTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What happened to a completed (or refused) load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Page merged into the collection
    Applied(MergeStats),
    /// A load is already in flight
    Busy,
    /// Server reported no more pages
    Exhausted,
    /// Completion arrived after teardown and was ignored
    Stale,
}

pub struct PaginationAccumulator {
    collection: Collection,
    page_size: u32,
    cursor: Option<Cursor>,
    has_more: bool,
    total_count: Option<u64>,
    next_seq: u64,
    /// Sequence number of the page whose pagination block is current
    latest_applied: Option<u64>,
    in_flight: BTreeSet<u64>,
    generation: u64,
    torn_down: bool,
    pages_loaded: usize,
}

impl PaginationAccumulator {
    pub fn new(page_size: u32) -> Self {
        Self {
            collection: Collection::new(),
            page_size: page_size.max(1),
            cursor: None,
            has_more: true,
            total_count: None,
            next_seq: 0,
            latest_applied: None,
            in_flight: BTreeSet::new(),
            generation: 0,
            torn_down: false,
            pages_loaded: 0,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// `true` until a page reports otherwise
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Why `begin_next` would refuse right now, if it would
    pub fn refusal(&self) -> Option<LoadOutcome> {
        if self.torn_down {
            Some(LoadOutcome::Stale)
        } else if self.is_loading() {
            Some(LoadOutcome::Busy)
        } else if !self.has_more {
            Some(LoadOutcome::Exhausted)
        } else {
            None
        }
    }

    /// Start loading the next page from the current cursor.
    ///
    /// Single in-flight: returns `None` while another load is pending, after
    /// the last page, or after teardown.
    pub fn begin_next(&mut self) -> Option<PageTicket> {
        if let Some(reason) = self.refusal() {
            tracing::trace!(?reason, "Next page not requested");
            return None;
        }
        let cursor = self.cursor.clone();
        self.issue(cursor)
    }

    /// Start loading an explicit cursor regardless of other pending loads
    pub fn begin_with_cursor(&mut self, cursor: Option<Cursor>) -> Option<PageTicket> {
        if self.torn_down {
            return None;
        }
        self.issue(cursor)
    }

    fn issue(&mut self, cursor: Option<Cursor>) -> Option<PageTicket> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight.insert(seq);

        tracing::debug!(seq, cursor = ?cursor, "Page requested");
        Some(PageTicket {
            seq,
            generation: self.generation,
            request: PageRequest {
                limit: self.page_size,
                cursor,
            },
        })
    }

    /// Apply the result of a ticket.
    ///
    /// A failure leaves every piece of state as it was before the attempt
    /// (apart from freeing the in-flight slot) and is returned to the caller.
    pub fn complete(
        &mut self,
        ticket: PageTicket,
        result: Result<PageResponse, FetchError>,
    ) -> Result<LoadOutcome, FetchError> {
        if ticket.generation != self.generation {
            tracing::debug!(seq = ticket.seq, "Ignoring page completed after teardown");
            return Ok(LoadOutcome::Stale);
        }
        self.in_flight.remove(&ticket.seq);

        let page = result?;
        let stats = self.collection.merge(page.images);
        self.pages_loaded += 1;

        if self.latest_applied.map_or(true, |latest| ticket.seq > latest) {
            self.latest_applied = Some(ticket.seq);
            self.cursor = page.pagination.next_cursor;
            self.has_more = page.pagination.has_more && self.cursor.is_some();
            self.total_count = Some(page.pagination.total_count);
        }

        tracing::debug!(
            seq = ticket.seq,
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            len = self.collection.len(),
            has_more = self.has_more,
            "Page applied"
        );
        Ok(LoadOutcome::Applied(stats))
    }

    /// Fetch and merge the next page
    pub async fn load_next<S: PageSource + ?Sized>(
        &mut self,
        source: &S,
        retry: &RetryPolicy,
    ) -> Result<LoadOutcome, FetchError> {
        let Some(ticket) = self.begin_next() else {
            return Ok(self.refusal().unwrap_or(LoadOutcome::Busy));
        };
        let result = fetch_with_retry(source, &ticket.request, retry).await;
        self.complete(ticket, result)
    }

    /// Stop issuing tickets and ignore completions of outstanding ones
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.generation += 1;
        self.in_flight.clear();
        tracing::debug!("Pagination torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageId;
    use crate::page_source::tests::{page, ScriptedSource};

    fn ids(acc: &PaginationAccumulator) -> Vec<ImageId> {
        acc.collection().iter().map(|i| i.id).collect()
    }

    fn server_error() -> FetchError {
        FetchError::Http { status: 500, message: "Internal error".into() }
    }

    #[tokio::test]
    async fn test_load_pages_until_exhausted() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&[1, 2], true, Some(20))));
        source.push(Ok(page(&[3, 4], false, None)));
        let retry = RetryPolicy::immediate(3);

        let mut acc = PaginationAccumulator::new(2);
        assert!(acc.has_more());
        acc.load_next(&source, &retry).await.unwrap();
        assert_eq!(acc.cursor(), Some(&Cursor::from(20)));
        acc.load_next(&source, &retry).await.unwrap();

        assert_eq!(ids(&acc), vec![1, 2, 3, 4]);
        assert!(!acc.has_more());
        assert_eq!(acc.load_next(&source, &retry).await, Ok(LoadOutcome::Exhausted));
        assert_eq!(source.calls(), 2);

        let requests = source.requests.lock();
        assert_eq!(requests[0].cursor, None);
        assert_eq!(requests[1].cursor, Some(Cursor::from(20)));
    }

    #[tokio::test]
    async fn test_failed_page_leaves_state_untouched_and_retry_merges() {
        let source = ScriptedSource::default();
        source.push(Ok(page(&[1, 2], true, Some(42))));
        for _ in 0..3 {
            source.push(Err(server_error()));
        }
        source.push(Ok(page(&[5, 6], false, None)));
        let retry = RetryPolicy::immediate(3);

        let mut acc = PaginationAccumulator::new(2);
        acc.load_next(&source, &retry).await.unwrap();

        let err = acc.load_next(&source, &retry).await.unwrap_err();
        assert_eq!(err, server_error());
        assert_eq!(ids(&acc), vec![1, 2]);
        assert!(acc.has_more());
        assert_eq!(acc.cursor(), Some(&Cursor::from(42)));
        assert!(!acc.is_loading());

        acc.load_next(&source, &retry).await.unwrap();
        assert_eq!(ids(&acc), vec![1, 2, 5, 6]);
        assert!(source.requests.lock()[4].cursor == Some(Cursor::from(42)));
    }

    #[test]
    fn test_single_in_flight() {
        let mut acc = PaginationAccumulator::new(10);
        let ticket = acc.begin_next().unwrap();
        assert!(acc.begin_next().is_none());
        assert_eq!(acc.refusal(), Some(LoadOutcome::Busy));

        acc.complete(ticket, Ok(page(&[1], true, Some(10)))).unwrap();
        assert!(acc.begin_next().is_some());
    }

    #[test]
    fn test_out_of_order_completion_matches_in_order() {
        let pages = [
            (None, page(&[1, 2], true, Some(20))),
            (Some(Cursor::from(20)), page(&[3, 4], true, Some(40))),
            (Some(Cursor::from(40)), page(&[5, 6], false, None)),
        ];

        let mut in_order = PaginationAccumulator::new(2);
        for (cursor, p) in pages.iter().cloned() {
            let t = in_order.begin_with_cursor(cursor).unwrap();
            in_order.complete(t, Ok(p)).unwrap();
        }

        for permutation in [[2, 0, 1], [1, 2, 0], [2, 1, 0], [0, 2, 1]] {
            let mut acc = PaginationAccumulator::new(2);
            let tickets: Vec<_> = pages
                .iter()
                .map(|(cursor, _)| acc.begin_with_cursor(cursor.clone()).unwrap())
                .collect();

            for &i in &permutation {
                acc.complete(tickets[i].clone(), Ok(pages[i].1.clone())).unwrap();
            }

            assert_eq!(ids(&acc), ids(&in_order), "permutation {:?}", permutation);
            assert_eq!(acc.has_more(), in_order.has_more());
            assert_eq!(acc.cursor(), in_order.cursor());
        }
    }

    #[test]
    fn test_refetch_is_idempotent() {
        let mut acc = PaginationAccumulator::new(2);
        let t = acc.begin_next().unwrap();
        acc.complete(t, Ok(page(&[1, 2], true, Some(20)))).unwrap();

        let t = acc.begin_with_cursor(None).unwrap();
        let outcome = acc.complete(t, Ok(page(&[1, 2], true, Some(20)))).unwrap();

        assert!(matches!(outcome, LoadOutcome::Applied(s) if s.inserted == 0 && s.duplicates == 2));
        assert_eq!(ids(&acc), vec![1, 2]);
    }

    #[test]
    fn test_completion_after_teardown_is_ignored() {
        let mut acc = PaginationAccumulator::new(2);
        let t = acc.begin_next().unwrap();
        acc.teardown();

        let outcome = acc.complete(t, Ok(page(&[1, 2], true, Some(20)))).unwrap();
        assert_eq!(outcome, LoadOutcome::Stale);
        assert!(acc.collection().is_empty());
        assert!(acc.begin_next().is_none());
    }

    #[test]
    fn test_has_more_without_cursor_stops() {
        let mut acc = PaginationAccumulator::new(2);
        let t = acc.begin_next().unwrap();
        acc.complete(t, Ok(page(&[1], true, None))).unwrap();
        assert!(!acc.has_more());
    }
}
