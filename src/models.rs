use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieSummary {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub original_language: Option<String>,
    pub release_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Full record returned by `movie/{id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MovieExtras {
    pub overview: Option<String>,
    pub genres: Vec<Genre>,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub status: Option<String>,
}

/// The selected item: summary data plus whatever the detail fetch added.
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub summary: MovieSummary,
    pub extras: Option<MovieExtras>,
}

impl From<MovieSummary> for Movie {
    fn from(summary: MovieSummary) -> Self {
        Self {
            summary,
            extras: None,
        }
    }
}

impl Movie {
    /// Overlays `detail` onto this movie. Fields the detail payload carries win;
    /// absent ones keep the summary value.
    pub fn merge_detail(&mut self, detail: MovieDetail) {
        let MovieDetail {
            summary,
            overview,
            genres,
            runtime,
            budget,
            revenue,
            status,
        } = detail;

        if !summary.title.is_empty() {
            self.summary.title = summary.title;
        }
        if summary.poster_path.is_some() {
            self.summary.poster_path = summary.poster_path;
        }
        if summary.vote_average.is_some() {
            self.summary.vote_average = summary.vote_average;
        }
        if summary.original_language.is_some() {
            self.summary.original_language = summary.original_language;
        }
        if summary.release_date.is_some() {
            self.summary.release_date = summary.release_date;
        }

        self.extras = Some(MovieExtras {
            overview,
            genres,
            runtime,
            budget,
            revenue,
            status,
        });
    }
}

/// Body of `search/movie` and `discover/movie`. Some upstreams signal a logical
/// failure with `"Response": "False"` and an optional `"Error"` text.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MoviePage {
    #[serde(default)]
    pub results: Vec<MovieSummary>,
    #[serde(rename = "Response")]
    pub response: Option<String>,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl MoviePage {
    pub fn failure(&self) -> Option<String> {
        if self.response.as_deref() != Some("False") {
            return None;
        }
        Some(
            self.error
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Error fetching movies".to_string()),
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: u64,
    pub movie_id: i64,
    pub poster_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewSearchRecord {
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    pub count: u64,
    pub movie_id: i64,
    pub poster_url: String,
}

impl NewSearchRecord {
    pub fn into_record(self, id: String) -> SearchRecord {
        SearchRecord {
            id,
            search_term: self.search_term,
            count: self.count,
            movie_id: self.movie_id,
            poster_url: self.poster_url,
        }
    }
}
