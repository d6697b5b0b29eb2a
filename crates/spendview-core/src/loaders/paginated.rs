//! Paginated loader for the unfiltered transaction listing
//!
//! Every `fetch_all` asks for the page under the cursor and moves the
//! cursor to the returned `nextPage`. The loader only keeps the latest
//! page; accumulating pages into the visible list is the view's job.

use spendview_transport::{Endpoint, Page, PageParams, Transaction};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::fetcher::FetcherRef;

#[derive(Debug, Default)]
struct PagerState {
    data: Option<Page<Transaction>>,
    /// Next page to request; `None` means page 1
    cursor: Option<u32>,
    exhausted: bool,
    /// Bumped by `restart`, invalidates fetches started earlier
    generation: u64,
    in_flight: usize,
}

#[derive(Clone)]
pub struct PaginatedTransactions {
    fetcher: FetcherRef,
    state: Arc<RwLock<PagerState>>,
}

impl PaginatedTransactions {
    pub const FIRST_PAGE: u32 = 1;

    pub fn new(fetcher: FetcherRef) -> Self {
        Self {
            fetcher,
            state: Arc::new(RwLock::new(PagerState::default())),
        }
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` without a request once the listing is exhausted.
    /// A response that lands after `restart` is returned as
    /// `StaleResponse` and leaves the cursor alone.
    pub async fn fetch_all(&self) -> CoreResult<Option<Page<Transaction>>> {
        let (page, generation) = {
            let mut state = self.state.write().await;
            if state.exhausted {
                log::debug!("paginated listing exhausted, nothing to fetch");
                return Ok(None);
            }
            state.in_flight += 1;
            (state.cursor.unwrap_or(Self::FIRST_PAGE), state.generation)
        };

        let result = self
            .fetcher
            .fetch_with_cache::<Page<Transaction>, _>(
                Endpoint::TransactionsForAllEmployees,
                Some(&PageParams { page }),
            )
            .await;

        let mut state = self.state.write().await;
        state.in_flight -= 1;
        let fetched = result?;

        if state.generation != generation {
            return Err(CoreError::StaleResponse {
                action: format!("page {}", page),
                issued: generation,
                current: state.generation,
            });
        }

        log::debug!(
            "page {} loaded: {} transactions, next {:?}",
            page,
            fetched.data.len(),
            fetched.next_page
        );
        state.cursor = fetched.next_page;
        state.exhausted = fetched.is_last();
        state.data = Some(fetched.clone());
        Ok(Some(fetched))
    }

    /// Start over from page 1
    pub async fn restart(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.cursor = None;
        state.exhausted = false;
        state.data = None;
    }

    /// The most recently fetched page
    pub async fn data(&self) -> Option<Page<Transaction>> {
        self.state.read().await.data.clone()
    }

    pub async fn has_next_page(&self) -> bool {
        !self.state.read().await.exhausted
    }

    /// Page the next `fetch_all` will request
    pub async fn cursor(&self) -> u32 {
        self.state.read().await.cursor.unwrap_or(Self::FIRST_PAGE)
    }

    pub async fn loading(&self) -> bool {
        self.state.read().await.in_flight > 0
    }
}
