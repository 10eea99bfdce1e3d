//! Lazy search result stream
//!
//! Turns the page-based search endpoint into an ordered stream of candidates.
//! A page is requested only once the previous page's items are consumed, so a
//! consumer that stops early never triggers requests for later pages.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, BoxStream};
use log::debug;

use super::error::{ApiError, ApiResult};
use super::host::RepositoryHost;
use super::types::{RawCandidate, SearchQuery};

/// Stream of search results in provider order
pub type CandidateStream<'a> = BoxStream<'a, ApiResult<RawCandidate>>;

struct SearchCursor<H: ?Sized> {
    host: Arc<H>,
    query: SearchQuery,
    next_page: u32,
    buffer: VecDeque<RawCandidate>,
    exhausted: bool,
}

impl<H: RepositoryHost + ?Sized> SearchCursor<H> {
    async fn advance(&mut self) -> Option<ApiResult<RawCandidate>> {
        loop {
            if let Some(candidate) = self.buffer.pop_front() {
                return Some(Ok(candidate));
            }
            if self.exhausted {
                return None;
            }

            match self.host.search_page(&self.query, self.next_page).await {
                Ok(items) => {
                    debug!("Search page {} returned {} candidates", self.next_page, items.len());
                    if items.len() < self.host.page_size() {
                        self.exhausted = true;
                    }
                    self.next_page += 1;
                    self.buffer.extend(items);
                }
                // The provider refuses pages past its result cap
                Err(ApiError::Status { status: 422, .. }) if self.next_page > 1 => {
                    debug!("Search result cap reached at page {}", self.next_page);
                    self.exhausted = true;
                }
                // Position is kept; the next poll re-requests the same page
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Open a lazy, ordered stream of candidates matching `query`
pub fn search_candidates<'a, H>(host: Arc<H>, query: SearchQuery) -> CandidateStream<'a>
where
    H: RepositoryHost + ?Sized + 'a,
{
    let cursor = SearchCursor {
        host,
        query,
        next_page: 1,
        buffer: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(stream::unfold(cursor, |mut cursor| async move {
        let item = cursor.advance().await?;
        Some((item, cursor))
    }))
}
