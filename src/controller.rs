//! Headless view controller: search-as-you-type, trending list and the detail
//! panel, driven through a [`MovieSource`] and an [`AnalyticsSink`].
//!
//! Every list fetch takes a sequence number and only the latest one may write
//! its result. Detail fetches are tied to the selection that started them.
use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info};

use crate::appwrite::{AnalyticsSink, TRENDING_LIMIT};
use crate::catalog::MovieSource;
use crate::models::{Movie, MovieSummary, SearchRecord};
use crate::view::{DetailView, MovieCard};

pub const DEBOUNCE: Duration = Duration::from_millis(800);
pub const FETCH_FAILED: &str = "Failed to fetch movies. Please try again later.";

/// Host hook for suspending page scrolling while the detail panel is open.
pub trait ScrollControl: Send + Sync {
    fn set_scroll_locked(&self, locked: bool);
}

pub struct NoopScroll;

impl ScrollControl for NoopScroll {
    fn set_scroll_locked(&self, _locked: bool) {}
}

/// Scroll stays locked for as long as this guard lives.
struct ScrollGuard {
    scroll: Arc<dyn ScrollControl>,
}

impl ScrollGuard {
    fn acquire(scroll: Arc<dyn ScrollControl>) -> Self {
        scroll.set_scroll_locked(true);
        Self { scroll }
    }
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.scroll.set_scroll_locked(false);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsState {
    Idle,
    Loading,
    Loaded(Vec<MovieSummary>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Closed,
    Loading(Movie),
    Ready(Movie),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub search_text: String,
    pub debounced_text: String,
    pub results: ResultsState,
    pub trending: Vec<SearchRecord>,
    pub detail: DetailState,
}

impl ViewSnapshot {
    pub fn is_loading(&self) -> bool {
        matches!(self.results, ResultsState::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.results {
            ResultsState::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    pub fn movies(&self) -> &[MovieSummary] {
        match &self.results {
            ResultsState::Loaded(list) => list.as_slice(),
            _ => &[],
        }
    }

    pub fn cards(&self) -> Vec<MovieCard> {
        self.movies().iter().map(MovieCard::from).collect()
    }

    pub fn selected(&self) -> Option<&Movie> {
        match &self.detail {
            DetailState::Closed => None,
            DetailState::Loading(m) | DetailState::Ready(m) => Some(m),
        }
    }

    pub fn is_detail_open(&self) -> bool {
        !matches!(self.detail, DetailState::Closed)
    }

    pub fn detail_view(&self) -> Option<DetailView> {
        match &self.detail {
            DetailState::Closed => None,
            DetailState::Loading(m) => Some(DetailView::new(m, true)),
            DetailState::Ready(m) => Some(DetailView::new(m, false)),
        }
    }
}

struct ViewState {
    search_text: String,
    debounced_text: String,
    results: ResultsState,
    trending: Vec<SearchRecord>,
    detail: DetailState,
    edit_generation: u64,
    issued_seq: u64,
    selection: u64,
    scroll_guard: Option<ScrollGuard>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            debounced_text: String::new(),
            results: ResultsState::Idle,
            trending: Vec::new(),
            detail: DetailState::Closed,
            edit_generation: 0,
            issued_seq: 0,
            selection: 0,
            scroll_guard: None,
        }
    }
}

pub struct ViewController {
    source: Arc<dyn MovieSource>,
    sink: AnalyticsSink,
    scroll: Arc<dyn ScrollControl>,
    debounce: Duration,
    state: Mutex<ViewState>,
}

impl ViewController {
    pub fn new(source: Arc<dyn MovieSource>, sink: AnalyticsSink) -> Self {
        Self {
            source,
            sink,
            scroll: Arc::new(NoopScroll),
            debounce: DEBOUNCE,
            state: Mutex::new(ViewState::default()),
        }
    }

    pub fn with_scroll_control(mut self, scroll: Arc<dyn ScrollControl>) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let s = self.state.lock().await;
        ViewSnapshot {
            search_text: s.search_text.clone(),
            debounced_text: s.debounced_text.clone(),
            results: s.results.clone(),
            trending: s.trending.clone(),
            detail: s.detail.clone(),
        }
    }

    /// Initial load: trending list and the unfiltered discover list.
    pub async fn mount(&self) {
        tokio::join!(self.load_trending(), self.load_movies(String::new()));
    }

    /// Closes the detail panel, which releases the scroll lock.
    pub async fn unmount(&self) {
        self.close().await;
    }

    /// Records an edit. The list reloads once the text has been stable for the
    /// debounce interval and differs from the last settled text.
    pub async fn set_search_text(self: &Arc<Self>, text: impl Into<String>) -> JoinHandle<()> {
        let text = text.into();
        let generation = {
            let mut s = self.state.lock().await;
            s.search_text = text.clone();
            s.edit_generation += 1;
            s.edit_generation
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.debounce).await;
            this.settle_search_text(generation, text).await;
        })
    }

    async fn settle_search_text(&self, generation: u64, text: String) {
        {
            let mut s = self.state.lock().await;
            if s.edit_generation != generation || s.debounced_text == text {
                return;
            }
            s.debounced_text = text.clone();
        }
        self.load_movies(text).await;
    }

    /// Empty query lists popular titles, anything else searches.
    pub async fn load_movies(&self, query: String) {
        let seq = {
            let mut s = self.state.lock().await;
            s.issued_seq += 1;
            s.results = ResultsState::Loading;
            s.issued_seq
        };

        let outcome = if query.is_empty() {
            self.source.discover_popular().await
        } else {
            self.source.search(&query).await
        };

        let mut s = self.state.lock().await;
        if s.issued_seq != seq {
            debug!("Discarding stale results for '{}' (#{})", query, seq);
            return;
        }

        let page = match outcome {
            Ok(page) => page,
            Err(e) => {
                error!("Error fetching movies: {:#}", e);
                s.results = ResultsState::Failed(FETCH_FAILED.to_string());
                return;
            }
        };
        if let Some(message) = page.failure() {
            info!("Upstream reported failure for '{}': {}", query, message);
            s.results = ResultsState::Failed(message);
            return;
        }

        let first = page.results.first().cloned();
        s.results = ResultsState::Loaded(page.results);
        drop(s);

        if let (false, Some(first)) = (query.is_empty(), first) {
            let sink = self.sink.clone();
            tokio::spawn(async move {
                sink.record_search(&query, &first).await;
            });
        }
    }

    pub async fn load_trending(&self) {
        let trending = self.sink.top_searches(TRENDING_LIMIT).await;
        self.state.lock().await.trending = trending;
    }

    /// Opens the detail panel with the summary right away and fetches the full
    /// record in the background.
    pub async fn select(self: &Arc<Self>, movie: MovieSummary) -> JoinHandle<()> {
        let id = movie.id;
        let token = {
            let mut s = self.state.lock().await;
            s.selection += 1;
            s.detail = DetailState::Loading(Movie::from(movie));
            if s.scroll_guard.is_none() {
                s.scroll_guard = Some(ScrollGuard::acquire(Arc::clone(&self.scroll)));
            }
            s.selection
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.load_detail(token, id).await;
        })
    }

    async fn load_detail(&self, token: u64, id: i64) {
        let detail = self.source.movie_detail(id).await;

        let mut s = self.state.lock().await;
        if s.selection != token {
            debug!("Discarding detail for movie {} (selection changed)", id);
            return;
        }
        let mut movie = match std::mem::replace(&mut s.detail, DetailState::Closed) {
            DetailState::Loading(m) | DetailState::Ready(m) => m,
            DetailState::Closed => return,
        };
        match detail {
            Ok(detail) => movie.merge_detail(detail),
            Err(e) => error!("Error fetching movie details: {:#}", e),
        }
        s.detail = DetailState::Ready(movie);
    }

    pub async fn close(&self) {
        let mut s = self.state.lock().await;
        if matches!(s.detail, DetailState::Closed) {
            return;
        }
        s.detail = DetailState::Closed;
        s.selection += 1;
        s.scroll_guard = None;
    }

    /// Key names follow the DOM `KeyboardEvent.key` values; only `Escape` acts.
    pub async fn handle_key(&self, key: &str) {
        if key == "Escape" {
            self.close().await;
        }
    }
}
