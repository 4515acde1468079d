//! Stateful, cache-backed views over the news repository.
//!
//! [`NewsStore`] owns the two keyed caches (list pages and detail items) and
//! is cheap to clone; every view created from it shares the same caches.
//! Two views mirror the ways the site consumes news:
//!
//! - [`PagedQuery`]: one page at a time, keeps showing the previous result as
//!   placeholder while a new key or page loads
//! - [`InfiniteQuery`]: pages accumulated in order into one feed, advanced
//!   with [`InfiniteQuery::fetch_next_page`]
//!
//! Both views stamp every request with the generation current at request
//! start. Changing the key bumps the generation, and dropping the view marks
//! it dead; a response that arrives for an older generation or a dead view
//! is discarded without touching state.

use crate::cache::{Cached, KeyedCache, SharedFetch};
use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::http::Transport;
use crate::models::{ListKey, NewsItem, Page};
use crate::repository::NewsRepository;
use crate::utils::page_from_url;
use itertools::Itertools;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub struct NewsStore<T> {
    repo: Arc<NewsRepository<T>>,
    lists: KeyedCache<(ListKey, u32), Page<NewsItem>>,
    details: KeyedCache<u64, NewsItem>,
    gc_time: Duration,
}

impl<T> Clone for NewsStore<T> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            lists: self.lists.clone(),
            details: self.details.clone(),
            gc_time: self.gc_time,
        }
    }
}

impl<T: Transport + 'static> NewsStore<T> {
    pub fn new(repo: NewsRepository<T>, settings: &Settings) -> Self {
        Self::with_times(
            repo,
            settings.list_stale_time(),
            settings.detail_stale_time(),
            settings.cache_gc_time(),
        )
    }

    pub fn with_times(
        repo: NewsRepository<T>,
        list_stale: Duration,
        detail_stale: Duration,
        gc_time: Duration,
    ) -> Self {
        Self {
            repo: Arc::new(repo),
            lists: KeyedCache::new(list_stale),
            details: KeyedCache::new(detail_stale),
            gc_time,
        }
    }

    pub fn repository(&self) -> &NewsRepository<T> {
        &self.repo
    }

    /// Request one list page, joining an identical request already in flight.
    pub fn fetch_page(&self, key: &ListKey, page: u32) -> SharedFetch<Page<NewsItem>> {
        let repo = Arc::clone(&self.repo);
        let params = key.params_for_page(page);
        self.lists.fetch((key.clone(), page), move || async move {
            repo.list(&params).await
        })
    }

    pub fn cached_page(&self, key: &ListKey, page: u32) -> Option<Cached<Page<NewsItem>>> {
        self.lists.peek(&(key.clone(), page))
    }

    /// One list page, served from cache when fresh, revalidated when stale.
    pub async fn page(&self, key: &ListKey, page: u32) -> Result<Page<NewsItem>> {
        let repo = Arc::clone(&self.repo);
        let params = key.params_for_page(page);
        self.lists
            .get((key.clone(), page), move || async move {
                repo.list(&params).await
            })
            .await
    }

    /// One news item by id, with the detail freshness window.
    #[instrument(level = "info", skip(self))]
    pub async fn detail(&self, id: u64) -> Result<NewsItem> {
        let repo = Arc::clone(&self.repo);
        self.details
            .get(id, move || async move { repo.get_by_id(id).await })
            .await
    }

    /// Drop every cached page for `key`.
    pub fn invalidate_list(&self, key: &ListKey) {
        self.lists.invalidate_where(|(k, _)| k == key);
    }

    pub fn collect_garbage(&self) -> usize {
        self.lists.collect_garbage(self.gc_time) + self.details.collect_garbage(self.gc_time)
    }
}

/// What a view exposes to its renderer: data, flags and the last error.
#[derive(Debug, Clone)]
pub struct QueryState<D> {
    pub data: Option<D>,
    /// Nothing to show yet for the current key.
    pub is_loading: bool,
    /// A request for the current key is in flight.
    pub is_fetching: bool,
    /// `data` belongs to the previous key or page.
    pub is_placeholder: bool,
    pub error: Option<FetchError>,
}

fn lock<S>(state: &Mutex<S>) -> MutexGuard<'_, S> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a view's request as abandoned if the awaiting future is dropped
/// before the response is applied.
struct InFlight<S> {
    state: Arc<Mutex<S>>,
    generation: u64,
    abandon: fn(&mut S, u64),
    armed: bool,
}

impl<S> InFlight<S> {
    fn new(state: &Arc<Mutex<S>>, generation: u64, abandon: fn(&mut S, u64)) -> Self {
        Self {
            state: Arc::clone(state),
            generation,
            abandon,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<S> Drop for InFlight<S> {
    fn drop(&mut self) {
        if self.armed {
            (self.abandon)(&mut lock(&self.state), self.generation);
        }
    }
}

#[derive(Debug)]
struct PagedState {
    key: ListKey,
    page: u32,
    generation: u64,
    alive: bool,
    data: Option<Page<NewsItem>>,
    is_placeholder: bool,
    is_fetching: bool,
    error: Option<FetchError>,
}

impl PagedState {
    fn snapshot(&self) -> QueryState<Page<NewsItem>> {
        QueryState {
            data: self.data.clone(),
            is_loading: self.data.is_none() && self.is_fetching,
            is_fetching: self.is_fetching,
            is_placeholder: self.is_placeholder,
            error: self.error.clone(),
        }
    }

    fn abandon(&mut self, generation: u64) {
        if self.generation == generation && self.is_fetching {
            debug!(generation, "Page request abandoned by its caller");
            self.is_fetching = false;
        }
    }

    fn apply(&mut self, generation: u64, result: Result<Page<NewsItem>>) {
        if !self.alive || self.generation != generation {
            warn!(generation, current = self.generation, "Discarding response for superseded page query");
            return;
        }
        self.is_fetching = false;
        match result {
            Ok(page) => {
                self.data = Some(page);
                self.is_placeholder = false;
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
    }
}

/// Page-at-a-time view over one [`ListKey`].
pub struct PagedQuery<T> {
    store: NewsStore<T>,
    state: Arc<Mutex<PagedState>>,
}

impl<T: Transport + 'static> PagedQuery<T> {
    pub fn new(store: NewsStore<T>, key: ListKey) -> Self {
        let state = PagedState {
            key,
            page: 1,
            generation: 0,
            alive: true,
            data: None,
            is_placeholder: false,
            is_fetching: false,
            error: None,
        };
        Self {
            store,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn key(&self) -> ListKey {
        lock(&self.state).key.clone()
    }

    pub fn page(&self) -> u32 {
        lock(&self.state).page
    }

    pub fn state(&self) -> QueryState<Page<NewsItem>> {
        lock(&self.state).snapshot()
    }

    /// Switch to another key and go back to page 1. Call [`Self::load`] next.
    pub fn set_key(&self, key: ListKey) {
        let mut st = lock(&self.state);
        if st.key == key {
            return;
        }
        debug!(?key, "Paged query key changed");
        st.key = key;
        st.page = 1;
        st.generation += 1;
        st.is_fetching = false;
        st.is_placeholder = st.data.is_some();
        st.error = None;
    }

    pub fn set_page(&self, page: u32) {
        let mut st = lock(&self.state);
        let page = page.max(1);
        if st.page == page {
            return;
        }
        st.page = page;
        st.generation += 1;
        st.is_fetching = false;
        st.is_placeholder = st.data.is_some();
        st.error = None;
    }

    /// Bring the current key and page up to date.
    ///
    /// Cached data is applied at once; a stale hit is refreshed in the
    /// background instead of blocking.
    #[instrument(level = "info", skip_all)]
    pub async fn load(&self) -> QueryState<Page<NewsItem>> {
        let (key, page, generation) = {
            let st = lock(&self.state);
            (st.key.clone(), st.page, st.generation)
        };

        if let Some(hit) = self.store.cached_page(&key, page) {
            let mut st = lock(&self.state);
            st.apply(generation, Ok(hit.value));
            if !hit.is_stale {
                return st.snapshot();
            }
            st.is_fetching = true;
            let request = self.store.fetch_page(&key, page);
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let result = request.await;
                lock(&state).apply(generation, result);
            });
            return st.snapshot();
        }

        lock(&self.state).is_fetching = true;
        let in_flight = InFlight::new(&self.state, generation, PagedState::abandon);
        let result = self.store.fetch_page(&key, page).await;
        in_flight.disarm();
        let mut st = lock(&self.state);
        st.apply(generation, result);
        st.snapshot()
    }
}

impl<T> Drop for PagedQuery<T> {
    fn drop(&mut self) {
        lock(&self.state).alive = false;
    }
}

/// Accumulated view of an infinite feed.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    /// All loaded pages flattened in order, de-duplicated by slug.
    pub items: Vec<NewsItem>,
    pub pages_loaded: usize,
    pub total_count: Option<u64>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub is_loading: bool,
    pub is_fetching_next_page: bool,
    pub error: Option<FetchError>,
}

#[derive(Debug)]
struct InfiniteState {
    key: ListKey,
    generation: u64,
    alive: bool,
    pages: Vec<(u32, Page<NewsItem>)>,
    next_page: Option<u32>,
    previous_page: Option<u32>,
    is_fetching: bool,
    error: Option<FetchError>,
}

impl InfiniteState {
    fn new(key: ListKey) -> Self {
        Self {
            key,
            generation: 0,
            alive: true,
            pages: Vec::new(),
            next_page: None,
            previous_page: None,
            is_fetching: false,
            error: None,
        }
    }

    fn reset(&mut self, key: ListKey) {
        let generation = self.generation + 1;
        *self = Self::new(key);
        self.generation = generation;
    }

    fn abandon(&mut self, generation: u64) {
        if self.generation == generation && self.is_fetching {
            debug!(generation, "Next-page request abandoned by its caller");
            self.is_fetching = false;
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        if !self.alive || self.generation != generation {
            warn!(generation, current = self.generation, "Discarding response for superseded feed");
            return false;
        }
        true
    }

    fn snapshot(&self) -> FeedState {
        let items = self
            .pages
            .iter()
            .flat_map(|(_, page)| page.results.iter())
            .unique_by(|item| item.slug.clone())
            .cloned()
            .collect();
        FeedState {
            items,
            pages_loaded: self.pages.len(),
            total_count: self.pages.last().map(|(_, p)| p.count),
            has_next_page: self.next_page.is_some(),
            has_previous_page: self.previous_page.is_some(),
            is_loading: self.pages.is_empty() && self.is_fetching,
            is_fetching_next_page: !self.pages.is_empty() && self.is_fetching,
            error: self.error.clone(),
        }
    }

    fn apply(&mut self, generation: u64, number: u32, result: Result<Page<NewsItem>>) {
        if !self.is_current(generation) {
            return;
        }
        self.is_fetching = false;
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.error = Some(e);
                return;
            }
        };
        self.error = None;

        let returned = page.results.len();
        self.pages.push((number, page));
        self.relink();
        info!(page = number, returned, has_next = self.next_page.is_some(), "Feed page applied");
    }

    /// Derive the continuation pages from the last and first loaded pages.
    fn relink(&mut self) {
        self.next_page = self
            .pages
            .last()
            .and_then(|(number, page)| next_page_after(page, *number));
        self.previous_page = self
            .pages
            .first()
            .and_then(|(_, page)| page.previous.as_deref())
            .and_then(page_from_url);
    }

    /// Replace an already loaded page with a fresher copy.
    fn refresh(&mut self, generation: u64, number: u32, result: Result<Page<NewsItem>>) {
        if !self.is_current(generation) {
            return;
        }
        match result {
            Ok(fresh) => {
                if let Some((_, page)) = self.pages.iter_mut().find(|(n, _)| *n == number) {
                    *page = fresh;
                    self.relink();
                }
            }
            Err(e) => self.error = Some(e),
        }
    }
}

/// The page a `next` token points at, if it moves the feed forward.
fn next_page_after(page: &Page<NewsItem>, number: u32) -> Option<u32> {
    let next = page.next.as_deref()?;
    match page_from_url(next) {
        Some(n) if n > number => Some(n),
        other => {
            warn!(next, parsed = ?other, "Unusable next-page token; feed ends here");
            None
        }
    }
}

/// Infinite, order-preserving feed over one [`ListKey`].
pub struct InfiniteQuery<T> {
    store: NewsStore<T>,
    state: Arc<Mutex<InfiniteState>>,
}

impl<T: Transport + 'static> InfiniteQuery<T> {
    pub fn new(store: NewsStore<T>, key: ListKey) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(InfiniteState::new(key))),
        }
    }

    pub fn key(&self) -> ListKey {
        lock(&self.state).key.clone()
    }

    pub fn state(&self) -> FeedState {
        lock(&self.state).snapshot()
    }

    /// Switch feeds. The accumulated pages are discarded.
    pub fn set_key(&self, key: ListKey) {
        let mut st = lock(&self.state);
        if st.key != key {
            debug!(?key, "Feed key changed; dropping accumulated pages");
            st.reset(key);
        }
    }

    /// Load the first page if nothing is loaded yet.
    pub async fn load(&self) -> FeedState {
        let empty = lock(&self.state).pages.is_empty();
        if empty {
            self.fetch_next_page().await
        } else {
            self.state()
        }
    }

    /// Load the page after the last one loaded.
    ///
    /// No-op while another page of this feed is in flight, or when the last
    /// page carried no usable `next` token.
    #[instrument(level = "info", skip_all)]
    pub async fn fetch_next_page(&self) -> FeedState {
        let (key, number, generation) = {
            let mut st = lock(&self.state);
            if st.is_fetching {
                debug!("Next page already in flight");
                return st.snapshot();
            }
            let number = match (st.pages.last(), st.next_page) {
                (None, _) => 1,
                (Some(_), Some(next)) => next,
                (Some(_), None) => {
                    debug!("Feed has no next page");
                    return st.snapshot();
                }
            };
            st.is_fetching = true;
            (st.key.clone(), number, st.generation)
        };

        if let Some(hit) = self.store.cached_page(&key, number) {
            let mut st = lock(&self.state);
            st.apply(generation, number, Ok(hit.value));
            if hit.is_stale {
                let request = self.store.fetch_page(&key, number);
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    let result = request.await;
                    lock(&state).refresh(generation, number, result);
                });
            }
            return st.snapshot();
        }

        let in_flight = InFlight::new(&self.state, generation, InfiniteState::abandon);
        let result = self.store.fetch_page(&key, number).await;
        in_flight.disarm();
        let mut st = lock(&self.state);
        st.apply(generation, number, result);
        st.snapshot()
    }
}

impl<T> Drop for InfiniteQuery<T> {
    fn drop(&mut self) {
        lock(&self.state).alive = false;
    }
}
