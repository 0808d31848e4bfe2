use serde::Serialize;

use crate::models::{Movie, MovieSummary, SearchRecord};
use crate::utils::{
    language_label, money_label, poster_url, rating_label, runtime_label, year_label,
};

/// One entry in the results grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieCard {
    pub id: i64,
    pub title: String,
    pub poster_url: String,
    pub rating: String,
    pub language: String,
    pub year: String,
}

impl From<&MovieSummary> for MovieCard {
    fn from(movie: &MovieSummary) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            poster_url: poster_url(movie.poster_path.as_deref()),
            rating: rating_label(movie.vote_average),
            language: movie.original_language.clone().unwrap_or_default(),
            year: year_label(movie.release_date.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub title: String,
    pub poster_url: String,
    pub rating: String,
    pub language: String,
    pub year: String,
    pub overview: Option<String>,
    pub genres: Vec<String>,
    pub runtime: Option<String>,
    pub budget: Option<String>,
    pub revenue: Option<String>,
    pub status: Option<String>,
    pub loading: bool,
}

impl DetailView {
    pub fn new(movie: &Movie, loading: bool) -> Self {
        let summary = &movie.summary;
        let extras = movie.extras.as_ref();
        Self {
            title: summary.title.clone(),
            poster_url: poster_url(summary.poster_path.as_deref()),
            rating: rating_label(summary.vote_average),
            language: language_label(summary.original_language.as_deref()),
            year: year_label(summary.release_date.as_deref()),
            overview: extras
                .and_then(|e| e.overview.clone())
                .filter(|o| !o.is_empty()),
            genres: extras
                .map(|e| e.genres.iter().map(|g| g.name.clone()).collect())
                .unwrap_or_default(),
            runtime: runtime_label(extras.and_then(|e| e.runtime)),
            budget: money_label(extras.and_then(|e| e.budget)),
            revenue: money_label(extras.and_then(|e| e.revenue)),
            status: extras
                .and_then(|e| e.status.clone())
                .filter(|s| !s.is_empty()),
            loading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingEntry {
    pub rank: usize,
    pub term: String,
    pub poster_url: String,
}

pub fn trending_entries(records: &[SearchRecord]) -> Vec<TrendingEntry> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| TrendingEntry {
            rank: i + 1,
            term: r.search_term.clone(),
            poster_url: r.poster_url.clone(),
        })
        .collect()
}
